//! Runtime configuration for the harvester.
//!
//! A [`Config`] starts from built-in defaults, is optionally overlaid with a
//! TOML file ([`ConfigFile`]), then with programmatic overrides collected by
//! [`ConfigBuilder`], and is finally validated.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;

pub(crate) use super::error::Result;

use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Default contact-page paths probed after the domain root.
pub const DEFAULT_CONTACT_PATHS: [&str; 4] = ["/contact-us", "/contact", "/about-us", "/about"];

/// Sender domains whose addresses are error-tracking noise, not contacts.
pub const DEFAULT_EXCLUDED_SENDER_DOMAINS: [&str; 3] = [
    "sentry.io",
    "sentry.wixpress.com",
    "sentry-next.wixpress.com",
];

/// Placeholder addresses that never make it into the output table.
pub const DEFAULT_REJECTED_EMAILS: [&str; 5] = [
    "user@domain.com",
    "email@example.com",
    "user@gmail.com",
    "email@email.com",
    "user@example.com",
];

/// Keywords identifying social/platform sites rather than business websites.
pub const DEFAULT_EXCLUDED_PLATFORMS: [&str; 7] = [
    "google",
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "pinterest",
    "snapchat",
];

/// Effective configuration used by every component.
#[derive(Debug, Clone)]
pub struct Config {
    // Network
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub user_agent: String,

    // Headless fallback
    pub enable_headless: bool,
    pub webdriver_url: String,
    pub page_load_timeout: Duration,

    // Harvest
    pub max_emails: usize,
    pub max_concurrency: usize,
    pub contact_paths: Vec<String>,
    pub excluded_sender_domains: HashSet<String>,
    pub rejected_emails: HashSet<String>,

    // Input handling
    pub domain_column: String,
    pub excluded_platforms: Vec<String>,
    pub split_parts: usize,

    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            user_agent: concat!("email-harvester/", env!("CARGO_PKG_VERSION")).to_string(),

            enable_headless: true,
            webdriver_url: "http://localhost:4444".to_string(),
            page_load_timeout: Duration::from_secs(10),

            max_emails: 4,
            max_concurrency: 30,
            contact_paths: DEFAULT_CONTACT_PATHS.iter().map(|s| s.to_string()).collect(),
            excluded_sender_domains: DEFAULT_EXCLUDED_SENDER_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rejected_emails: DEFAULT_REJECTED_EMAILS
                .iter()
                .map(|s| s.to_string())
                .collect(),

            domain_column: "Website".to_string(),
            excluded_platforms: DEFAULT_EXCLUDED_PLATFORMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            split_parts: 7,

            loaded_config_path: None,
        }
    }
}

/// Shape of the optional TOML configuration file. Every field is optional;
/// absent fields keep whatever value the `Config` already holds.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub headless: HeadlessSection,
    pub harvest: HarvestSection,
    pub input: InputSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// Seconds.
    pub request_timeout: Option<u64>,
    pub max_retries: Option<u32>,
    /// Seconds, fractional allowed.
    pub retry_delay: Option<f64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HeadlessSection {
    pub enable: Option<bool>,
    pub webdriver_url: Option<String>,
    /// Seconds.
    pub page_load_timeout: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestSection {
    pub max_emails: Option<usize>,
    pub max_concurrency: Option<usize>,
    pub contact_paths: Option<Vec<String>>,
    pub excluded_sender_domains: Option<Vec<String>>,
    pub rejected_emails: Option<Vec<String>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub domain_column: Option<String>,
    pub excluded_platforms: Option<Vec<String>>,
    pub split_parts: Option<usize>,
}
