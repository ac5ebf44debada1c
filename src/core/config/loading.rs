//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
/// Internal to the builder logic.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.exists() || !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

fn lowercase_set(values: &[String]) -> std::collections::HashSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Merges the settings present in `file_config` onto `config`.
/// Used both for the TOML file and for builder overrides.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Network
    if let Some(timeout) = file_config.network.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(retries) = file_config.network.max_retries {
        config.max_retries = retries;
    }
    if let Some(delay) = file_config.network.retry_delay {
        if delay.is_finite() && delay >= 0.0 {
            config.retry_delay = Duration::from_secs_f64(delay);
        } else {
            tracing::warn!("Ignoring invalid retry delay: {}", delay);
        }
    }
    if let Some(ref user_agent) = file_config.network.user_agent {
        config.user_agent = user_agent.clone();
    }

    // Headless
    if let Some(enable) = file_config.headless.enable {
        config.enable_headless = enable;
    }
    if let Some(ref url) = file_config.headless.webdriver_url {
        config.webdriver_url = url.trim().to_string();
    }
    if let Some(timeout) = file_config.headless.page_load_timeout {
        config.page_load_timeout = Duration::from_secs(timeout);
    }

    // Harvest
    if let Some(max) = file_config.harvest.max_emails {
        config.max_emails = max;
    }
    if let Some(concurrency) = file_config.harvest.max_concurrency {
        config.max_concurrency = concurrency;
    }
    if let Some(ref paths) = file_config.harvest.contact_paths {
        config.contact_paths = paths.clone();
    }
    if let Some(ref domains) = file_config.harvest.excluded_sender_domains {
        config.excluded_sender_domains = lowercase_set(domains);
    }
    if let Some(ref rejected) = file_config.harvest.rejected_emails {
        config.rejected_emails = lowercase_set(rejected);
    }

    // Input
    if let Some(ref column) = file_config.input.domain_column {
        config.domain_column = column.trim().to_string();
    }
    if let Some(ref platforms) = file_config.input.excluded_platforms {
        config.excluded_platforms = platforms
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
    }
    if let Some(parts) = file_config.input.split_parts {
        config.split_parts = parts;
    }
}
