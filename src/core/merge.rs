//! Joins harvested addresses back onto the input records.

use crate::core::models::{EnrichedRecord, HarvestResult, Record};
use crate::utils::domain::Domain;
use std::collections::{HashMap, HashSet};

/// Builds the enriched output table.
///
/// For every harvested domain the addresses are taken in sorted order, those
/// on `rejected_emails` are removed (case-insensitively), and the remainder is
/// truncated to `max_emails` and padded with `None`. Records are then joined
/// in input order; a record whose domain has no accepted address is dropped.
pub fn merge_results(
    records: &[Record],
    harvest: &HarvestResult,
    max_emails: usize,
    rejected_emails: &HashSet<String>,
) -> Vec<EnrichedRecord> {
    let rejected: HashSet<String> = rejected_emails.iter().map(|e| e.to_lowercase()).collect();

    let mut rows: HashMap<&Domain, Vec<Option<String>>> = HashMap::new();
    let mut suppressed = 0usize;
    for (domain, emails) in harvest.iter() {
        let accepted: Vec<&String> = emails
            .iter()
            .filter(|email| {
                let keep = !rejected.contains(&email.to_lowercase());
                if !keep {
                    suppressed += 1;
                }
                keep
            })
            .collect();
        if accepted.is_empty() {
            continue;
        }

        let mut slots: Vec<Option<String>> = accepted
            .into_iter()
            .take(max_emails)
            .map(|e| Some(e.clone()))
            .collect();
        slots.resize(max_emails, None);
        rows.insert(domain, slots);
    }

    if suppressed > 0 {
        tracing::debug!(target: "merge", "Suppressed {} placeholder address(es).", suppressed);
    }
    if rows.is_empty() {
        tracing::info!(target: "merge", "No accepted emails in harvest; output is empty.");
        return Vec::new();
    }

    let merged: Vec<EnrichedRecord> = records
        .iter()
        .filter_map(|record| {
            rows.get(&record.domain).map(|emails| EnrichedRecord {
                record: record.clone(),
                emails: emails.clone(),
            })
        })
        .collect();

    tracing::info!(target: "merge",
        "Merged emails into {} of {} record(s) ({} domain(s) with emails).",
        merged.len(), records.len(), rows.len()
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_REJECTED_EMAILS;
    use std::collections::BTreeSet;

    fn record(domain: &str, name: &str) -> Record {
        let domain = Domain::parse(domain).unwrap();
        Record {
            fields: vec![name.to_string(), domain.to_string()],
            domain,
        }
    }

    fn emails(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn rejected() -> HashSet<String> {
        DEFAULT_REJECTED_EMAILS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_left_join_keeps_record_order_and_drops_unenriched() {
        let records = vec![
            record("b.com", "Beta"),
            record("a.com", "Alpha"),
            record("c.com", "Gamma"),
            record("b.com", "Beta Two"),
        ];
        let harvest: HarvestResult = [
            (Domain::parse("a.com").unwrap(), emails(&["x@a.com"])),
            (Domain::parse("b.com").unwrap(), emails(&["z@b.com", "m@b.com"])),
            (Domain::parse("c.com").unwrap(), BTreeSet::new()),
        ]
        .into_iter()
        .collect();

        let merged = merge_results(&records, &harvest, 3, &rejected());

        let names: Vec<&str> = merged.iter().map(|m| m.record.fields[0].as_str()).collect();
        assert_eq!(names, vec!["Beta", "Alpha", "Beta Two"]);
        assert_eq!(
            merged[0].emails,
            vec![Some("m@b.com".to_string()), Some("z@b.com".to_string()), None]
        );
        assert_eq!(merged[1].present_emails().collect::<Vec<_>>(), vec!["x@a.com"]);
    }

    #[test]
    fn test_truncates_to_max_emails() {
        let records = vec![record("a.com", "Alpha")];
        let harvest: HarvestResult = [(
            Domain::parse("a.com").unwrap(),
            emails(&["d@a.com", "c@a.com", "b@a.com", "a@a.com"]),
        )]
        .into_iter()
        .collect();

        let merged = merge_results(&records, &harvest, 2, &rejected());
        assert_eq!(
            merged[0].emails,
            vec![Some("a@a.com".to_string()), Some("b@a.com".to_string())]
        );
    }

    #[test]
    fn test_placeholder_addresses_are_suppressed() {
        let records = vec![record("a.com", "Alpha"), record("b.com", "Beta")];
        let harvest: HarvestResult = [
            (Domain::parse("a.com").unwrap(), emails(&["user@example.com", "real@a.com"])),
            (Domain::parse("b.com").unwrap(), emails(&["email@email.com"])),
        ]
        .into_iter()
        .collect();

        let merged = merge_results(&records, &harvest, 2, &rejected());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].emails, vec![Some("real@a.com".to_string()), None]);
    }

    #[test]
    fn test_rejection_is_case_insensitive() {
        let records = vec![record("a.com", "Alpha")];
        let harvest: HarvestResult = [(Domain::parse("a.com").unwrap(), emails(&["user@gmail.com"]))]
            .into_iter()
            .collect();
        let rejected = HashSet::from(["User@Gmail.com".to_string()]);

        assert!(merge_results(&records, &harvest, 4, &rejected).is_empty());
    }

    #[test]
    fn test_empty_harvest_gives_empty_output() {
        let records = vec![record("a.com", "Alpha")];
        let harvest: HarvestResult = [(Domain::parse("a.com").unwrap(), BTreeSet::new())]
            .into_iter()
            .collect();

        assert!(merge_results(&records, &harvest, 4, &rejected()).is_empty());
    }
}
