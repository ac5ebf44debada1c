//! Turns a raw lead table into harvestable records.

use crate::core::error::{AppError, Result};
use crate::core::models::Record;
use crate::utils::domain::Domain;
use crate::utils::table::Table;
use std::collections::BTreeSet;

/// Leads that survived filtering.
#[derive(Debug, Clone)]
pub struct FilteredLeads {
    /// Kept rows, website cell rewritten to the normalized domain.
    pub table: Table,
    /// Same rows keyed by domain, in table order.
    pub records: Vec<Record>,
    /// Distinct domains, sorted.
    pub domains: Vec<Domain>,
    /// Rows skipped for a blank or unparseable website.
    pub skipped_invalid: usize,
    /// Rows dropped because the domain belongs to an excluded platform.
    pub skipped_platform: usize,
}

/// True if the domain contains any of the (lower-case) platform keywords.
pub fn is_excluded_platform(domain: &Domain, excluded_platforms: &[String]) -> bool {
    let value = domain.as_str();
    excluded_platforms
        .iter()
        .any(|keyword| !keyword.is_empty() && value.contains(keyword.as_str()))
}

/// Normalizes the `domain_column` of every row and drops rows that have no
/// usable website or that point at an excluded platform.
pub fn filter_leads(
    table: &Table,
    domain_column: &str,
    excluded_platforms: &[String],
) -> Result<FilteredLeads> {
    let column = table.column_index(domain_column).ok_or_else(|| {
        AppError::Config(format!(
            "Input has no '{}' column (found: {})",
            domain_column,
            table.headers.join(", ")
        ))
    })?;

    let mut kept_rows = Vec::new();
    let mut records = Vec::new();
    let mut domains = BTreeSet::new();
    let mut skipped_invalid = 0;
    let mut skipped_platform = 0;

    for (line, row) in table.rows.iter().enumerate() {
        let website = row.get(column).map(|s| s.trim()).unwrap_or("");
        if website.is_empty() {
            skipped_invalid += 1;
            continue;
        }

        let domain = match Domain::parse(website) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Row {}: skipping unusable website '{}': {}", line + 1, website, e);
                skipped_invalid += 1;
                continue;
            }
        };

        if is_excluded_platform(&domain, excluded_platforms) {
            tracing::debug!("Row {}: skipping platform domain {}", line + 1, domain);
            skipped_platform += 1;
            continue;
        }

        let mut fields = row.clone();
        fields[column] = domain.to_string();
        domains.insert(domain.clone());
        records.push(Record {
            domain,
            fields: fields.clone(),
        });
        kept_rows.push(fields);
    }

    tracing::info!(
        "Lead filter kept {} of {} rows ({} distinct domains; {} invalid, {} platform).",
        kept_rows.len(),
        table.rows.len(),
        domains.len(),
        skipped_invalid,
        skipped_platform
    );

    Ok(FilteredLeads {
        table: Table::new(table.headers.clone(), kept_rows),
        records,
        domains: domains.into_iter().collect(),
        skipped_invalid,
        skipped_platform,
    })
}

/// Builds records from a table whose domain column is already normalized
/// (e.g. a previously filtered file). Rows with an unusable domain are
/// skipped with a warning.
pub fn records_from_table(table: &Table, domain_column: &str) -> Result<Vec<Record>> {
    let column = table.column_index(domain_column).ok_or_else(|| {
        AppError::Config(format!("Input has no '{}' column", domain_column))
    })?;

    let mut records = Vec::with_capacity(table.rows.len());
    for (line, row) in table.rows.iter().enumerate() {
        let raw = row.get(column).map(String::as_str).unwrap_or("");
        match Domain::parse(raw) {
            Ok(domain) => records.push(Record {
                domain,
                fields: row.clone(),
            }),
            Err(e) => {
                tracing::warn!("Row {}: no usable domain '{}': {}", line + 1, raw, e);
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::DEFAULT_EXCLUDED_PLATFORMS;

    fn platforms() -> Vec<String> {
        DEFAULT_EXCLUDED_PLATFORMS.iter().map(|s| s.to_string()).collect()
    }

    fn leads() -> Table {
        Table::new(
            vec!["Business Name".into(), "Rating".into(), "website".into()],
            vec![
                vec!["Acme".into(), "4.5".into(), "acme.com/home".into()],
                vec!["Acme Annex".into(), "4.0".into(), "http://acme.com".into()],
                vec!["Social".into(), "3.0".into(), "https://www.facebook.com/acme".into()],
                vec!["Blank".into(), "1.0".into(), "   ".into()],
                vec!["Bakery".into(), "5.0".into(), "https://bakery.example".into()],
            ],
        )
    }

    #[test]
    fn test_filter_normalizes_and_drops() {
        let filtered = filter_leads(&leads(), "Website", &platforms()).unwrap();

        assert_eq!(filtered.records.len(), 3);
        assert_eq!(filtered.skipped_invalid, 1);
        assert_eq!(filtered.skipped_platform, 1);
        assert_eq!(filtered.table.rows[0][2], "http://acme.com");
        assert_eq!(filtered.table.rows[0][1], "4.5");
        assert_eq!(
            filtered.domains.iter().map(Domain::as_str).collect::<Vec<_>>(),
            vec!["http://acme.com", "https://bakery.example"]
        );
    }

    #[test]
    fn test_filter_missing_column() {
        let result = filter_leads(&leads(), "Homepage", &platforms());
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_platform_match_is_substring() {
        let domain = Domain::parse("https://maps.google.com").unwrap();
        assert!(is_excluded_platform(&domain, &platforms()));
        let domain = Domain::parse("https://plumber.example").unwrap();
        assert!(!is_excluded_platform(&domain, &platforms()));
    }

    #[test]
    fn test_records_from_filtered_table() {
        let filtered = filter_leads(&leads(), "website", &platforms()).unwrap();
        let records = records_from_table(&filtered.table, "website").unwrap();
        assert_eq!(records, filtered.records);
    }
}
