//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;

/// Validates the configuration settings after loading and potential overrides.
/// Mutates the config to clamp values where a sane fallback exists.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.max_emails == 0 {
        return Err(AppError::Config(
            "max_emails must be at least 1.".to_string(),
        ));
    }
    if config.max_concurrency == 0 {
        tracing::warn!("Max concurrency was set to 0. Setting to 1.");
        config.max_concurrency = 1;
    }
    if config.max_retries == 0 {
        tracing::warn!("Max retries was set to 0. A single attempt will be made.");
        config.max_retries = 1;
    }
    if config.request_timeout.is_zero() {
        return Err(AppError::Config(
            "Request timeout must be greater than zero.".to_string(),
        ));
    }
    if config.page_load_timeout.is_zero() {
        return Err(AppError::Config(
            "Page load timeout must be greater than zero.".to_string(),
        ));
    }
    if config.enable_headless && config.webdriver_url.trim().is_empty() {
        return Err(AppError::Config(
            "WebDriver URL is required when the headless fallback is enabled.".to_string(),
        ));
    }
    if config.enable_headless {
        url::Url::parse(&config.webdriver_url).map_err(|e| {
            AppError::Config(format!(
                "Invalid WebDriver URL '{}': {}",
                config.webdriver_url, e
            ))
        })?;
    }

    let mut paths = Vec::with_capacity(config.contact_paths.len());
    for path in &config.contact_paths {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('/') {
            paths.push(trimmed.to_string());
        } else {
            tracing::debug!("Contact path '{}' lacks a leading slash. Adding one.", trimmed);
            paths.push(format!("/{}", trimmed));
        }
    }
    if paths.is_empty() {
        tracing::warn!("No contact paths configured. Only domain roots will be fetched.");
    }
    config.contact_paths = paths;

    if config.domain_column.is_empty() {
        return Err(AppError::Config(
            "Domain column name cannot be empty.".to_string(),
        ));
    }
    if config.split_parts == 0 {
        return Err(AppError::Config(
            "Split parts must be at least 1.".to_string(),
        ));
    }
    Ok(())
}
