//! # Email Harvester Core Library
//!
//! Discovers public contact email addresses for a batch of business websites
//! and merges them back into the lead table they came from.
//!
//! Every domain is resolved by an escalating ladder of fetch strategies:
//! a plain HTTP fetch of the site root, then of a fixed list of contact
//! paths, and finally the same paths rendered in a headless browser. The
//! first strategy that yields an address wins. Domains are processed
//! concurrently under a configurable ceiling by a [`ScrapeCoordinator`].
//!
//! The library is driven by the `email-harvester` binary, but every stage
//! (lead filtering, harvesting, merging, table I/O) is usable on its own.

mod core;
pub mod fetch;
mod utils;

pub use crate::core::config::{
    Config, ConfigBuilder, ConfigFile, DEFAULT_CONTACT_PATHS, DEFAULT_EXCLUDED_PLATFORMS,
    DEFAULT_EXCLUDED_SENDER_DOMAINS, DEFAULT_REJECTED_EMAILS,
};
pub use crate::core::coordinator::{ProgressCallback, ScrapeCoordinator};
pub use crate::core::error::{AppError, FetchError, Result};
pub use crate::core::harvester::EmailHarvester;
pub use crate::core::journal::HarvestJournal;
pub use crate::core::merge::merge_results;
pub use crate::core::models::{DomainHarvest, EnrichedRecord, HarvestResult, Record, Strategy};
pub use crate::utils::domain::Domain;
pub use crate::utils::extract::{extract_emails, is_email_syntax};
pub use crate::utils::leads::{filter_leads, is_excluded_platform, records_from_table, FilteredLeads};
pub use crate::utils::table::{
    email_columns, split_table, write_chunks, write_domain_list, write_enriched, Table,
};

use std::sync::Arc;

/// Creates an `EmailHarvester` backed by the real HTTP client and, unless
/// disabled in `config`, the WebDriver-based headless fetcher.
pub async fn initialize_harvester(config: Arc<Config>) -> Result<EmailHarvester> {
    EmailHarvester::new(config).await
}

/// Harvests every domain with the default fetchers, using
/// `config.max_concurrency` as the concurrency ceiling.
///
/// # Errors
/// * `AppError::InsufficientInput` if `domains` is empty.
/// * `AppError::Initialization` if the HTTP client cannot be built.
pub async fn harvest_domains(config: Arc<Config>, domains: &[Domain]) -> Result<HarvestResult> {
    let max_concurrency = config.max_concurrency;
    let harvester = initialize_harvester(config).await?;
    ScrapeCoordinator::new(Arc::new(harvester), max_concurrency)
        .run(domains)
        .await
}
