//! Website origin handling.

use crate::core::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A normalized website origin: `scheme://host[:port]`, never a path or query.
///
/// Equality is plain string equality on the normalized form, so
/// `http://a.com` and `https://a.com` are distinct domains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Normalizes a raw website value into its origin.
    ///
    /// - Adds `http://` if the input carries no scheme.
    /// - Drops userinfo, path, query and fragment.
    /// - Lowercases the host (done by the URL parser).
    /// - Keeps a non-default port.
    ///
    /// Returns `Err(AppError::DomainExtraction)` for empty input or input
    /// without a usable host.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::DomainExtraction(
                "Input string is empty".to_string(),
            ));
        }

        let with_scheme = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)?;
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => h,
            _ => {
                return Err(AppError::DomainExtraction(format!(
                    "Could not extract host from '{}'",
                    trimmed
                )))
            }
        };

        let origin = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };
        Ok(Domain(origin))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part without the scheme, e.g. `www.example.com`.
    pub fn host(&self) -> &str {
        self.0
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.0)
    }

    /// URL of the domain root.
    pub fn root_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.0)?)
    }

    /// Resolves an absolute path (e.g. `/contact`) against this origin.
    pub fn join(&self, path: &str) -> Result<Url> {
        Ok(self.root_url()?.join(path)?)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Domain {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Domain::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl std::str::FromStr for Domain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Domain::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Domain::parse("example.com").unwrap().as_str(), "http://example.com");
        assert_eq!(
            Domain::parse("https://www.Example.com/path?query=1#frag").unwrap().as_str(),
            "https://www.example.com"
        );
        assert_eq!(
            Domain::parse(" http://example.com:8080/shop ").unwrap().as_str(),
            "http://example.com:8080"
        );
        assert_eq!(
            Domain::parse("https://example.com:443").unwrap().as_str(),
            "https://example.com"
        );
        assert_eq!(
            Domain::parse("sub.domain.example.co.uk/about").unwrap().as_str(),
            "http://sub.domain.example.co.uk"
        );
        assert_eq!(
            Domain::parse("http://user:pw@example.org/").unwrap().as_str(),
            "http://example.org"
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Domain::parse("").is_err());
        assert!(Domain::parse("   ").is_err());
        assert!(Domain::parse("http://").is_err());
        assert!(Domain::parse("https://").is_err());
    }

    #[test]
    fn test_equality_is_on_normalized_form() {
        assert_eq!(
            Domain::parse("a.com/x").unwrap(),
            Domain::parse("http://A.com").unwrap()
        );
        assert_ne!(
            Domain::parse("http://a.com").unwrap(),
            Domain::parse("https://a.com").unwrap()
        );
    }

    #[test]
    fn test_join_and_host() {
        let domain = Domain::parse("https://www.example.com").unwrap();
        assert_eq!(domain.host(), "www.example.com");
        assert_eq!(
            domain.join("/contact-us").unwrap().as_str(),
            "https://www.example.com/contact-us"
        );
        assert_eq!(domain.root_url().unwrap().as_str(), "https://www.example.com/");
    }

    #[test]
    fn test_serde_round_trip_normalizes() {
        let domain: Domain = serde_json::from_str("\"Example.com/about\"").unwrap();
        assert_eq!(domain.as_str(), "http://example.com");
        assert_eq!(serde_json::to_string(&domain).unwrap(), "\"http://example.com\"");
    }
}
