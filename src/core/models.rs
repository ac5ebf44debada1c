//! Data structures shared across the harvesting pipeline.

use crate::utils::domain::Domain;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// One row of the input table, keyed by its normalized domain.
/// `fields` holds every original cell in header order and is never altered
/// by the harvesting core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub domain: Domain,
    pub fields: Vec<String>,
}

/// A record extended with exactly `max_emails` email slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub record: Record,
    pub emails: Vec<Option<String>>,
}

impl EnrichedRecord {
    /// Emails actually present, in column order.
    pub fn present_emails(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().filter_map(|e| e.as_deref())
    }
}

/// The fetch strategy that terminated a domain's harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Lightweight fetch of the domain root.
    RootLight,
    /// Lightweight fetch of a contact path.
    PathsLight { path: String },
    /// Headless browser fetch of a contact path.
    PathsHeavy { path: String },
    /// Every strategy ran and none produced an address.
    Exhausted,
    /// The domain's task failed before completing (panic or error).
    Failed,
    /// Taken from a journal written by an earlier run.
    Journaled,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::RootLight => write!(f, "root (light)"),
            Strategy::PathsLight { path } => write!(f, "{} (light)", path),
            Strategy::PathsHeavy { path } => write!(f, "{} (headless)", path),
            Strategy::Exhausted => write!(f, "exhausted"),
            Strategy::Failed => write!(f, "failed"),
            Strategy::Journaled => write!(f, "journal"),
        }
    }
}

/// Outcome of resolving one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainHarvest {
    pub domain: Domain,
    pub emails: BTreeSet<String>,
    pub strategy: Strategy,
}

impl DomainHarvest {
    pub fn empty(domain: Domain, strategy: Strategy) -> Self {
        Self {
            domain,
            emails: BTreeSet::new(),
            strategy,
        }
    }
}

/// Domain → harvested addresses for one batch. Each domain is written once;
/// later writes for the same domain are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestResult {
    entries: HashMap<Domain, BTreeSet<String>>,
}

impl HarvestResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `emails` for `domain`. Returns `false` if the domain already
    /// had an entry, in which case nothing changes.
    pub fn insert(&mut self, domain: Domain, emails: BTreeSet<String>) -> bool {
        if self.entries.contains_key(&domain) {
            tracing::warn!(target: "coordinator", "Ignoring second result for {}", domain);
            return false;
        }
        self.entries.insert(domain, emails);
        true
    }

    pub fn get(&self, domain: &Domain) -> Option<&BTreeSet<String>> {
        self.entries.get(domain)
    }

    pub fn contains(&self, domain: &Domain) -> bool {
        self.entries.contains_key(domain)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of domains with at least one address.
    pub fn domains_with_emails(&self) -> usize {
        self.entries.values().filter(|e| !e.is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Domain, &BTreeSet<String>)> {
        self.entries.iter()
    }

    pub fn into_inner(self) -> HashMap<Domain, BTreeSet<String>> {
        self.entries
    }
}

impl FromIterator<(Domain, BTreeSet<String>)> for HarvestResult {
    fn from_iter<I: IntoIterator<Item = (Domain, BTreeSet<String>)>>(iter: I) -> Self {
        let mut result = HarvestResult::new();
        for (domain, emails) in iter {
            result.insert(domain, emails);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_result_is_write_once() {
        let domain = Domain::parse("a.com").unwrap();
        let mut result = HarvestResult::new();
        assert!(result.insert(domain.clone(), BTreeSet::from(["x@a.com".to_string()])));
        assert!(!result.insert(domain.clone(), BTreeSet::new()));
        assert_eq!(result.get(&domain).unwrap().len(), 1);
        assert_eq!(result.len(), 1);
        assert_eq!(result.domains_with_emails(), 1);
    }
}
