//! Fluent construction of a validated [`Config`].

use super::loading::{apply_file_config, load_config_file};
use super::validation::validate_config;
use super::{Config, ConfigFile, Result};
use crate::AppError;
use std::path::Path;
use std::time::Duration;

/// Collects overrides on top of the defaults and an optional TOML file.
/// Without an explicit file, `./email-harvester.toml` and then
/// `./config.toml` are tried.
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
    config_file_path: Option<String>,
    overrides: ConfigFile,
}

impl ConfigBuilder {
    /// Starts from `Config::default()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// TOML file to load instead of the default locations.
    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file_path = Some(path.into());
        self
    }

    pub fn max_concurrency(mut self, value: usize) -> Self {
        self.overrides.harvest.max_concurrency = Some(value);
        self
    }
    pub fn max_emails(mut self, value: usize) -> Self {
        self.overrides.harvest.max_emails = Some(value);
        self
    }
    pub fn contact_paths(mut self, paths: Vec<String>) -> Self {
        self.overrides.harvest.contact_paths = Some(paths);
        self
    }
    pub fn excluded_sender_domains(mut self, domains: Vec<String>) -> Self {
        self.overrides.harvest.excluded_sender_domains = Some(domains);
        self
    }
    pub fn rejected_emails(mut self, emails: Vec<String>) -> Self {
        self.overrides.harvest.rejected_emails = Some(emails);
        self
    }
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.overrides.network.request_timeout = Some(duration.as_secs());
        self
    }
    pub fn max_retries(mut self, value: u32) -> Self {
        self.overrides.network.max_retries = Some(value);
        self
    }
    pub fn retry_delay(mut self, duration: Duration) -> Self {
        self.overrides.network.retry_delay = Some(duration.as_secs_f64());
        self
    }
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.overrides.network.user_agent = Some(value.into());
        self
    }
    pub fn enable_headless(mut self, enable: bool) -> Self {
        self.overrides.headless.enable = Some(enable);
        self
    }
    pub fn webdriver_url(mut self, url: impl Into<String>) -> Self {
        self.overrides.headless.webdriver_url = Some(url.into());
        self
    }
    pub fn page_load_timeout(mut self, duration: Duration) -> Self {
        self.overrides.headless.page_load_timeout = Some(duration.as_secs());
        self
    }
    pub fn domain_column(mut self, column: impl Into<String>) -> Self {
        self.overrides.input.domain_column = Some(column.into());
        self
    }
    pub fn excluded_platforms(mut self, platforms: Vec<String>) -> Self {
        self.overrides.input.excluded_platforms = Some(platforms);
        self
    }
    pub fn split_parts(mut self, parts: usize) -> Self {
        self.overrides.input.split_parts = Some(parts);
        self
    }

    /// Resolves every layer and validates the result.
    pub fn build(mut self) -> Result<Config> {
        let mut loaded_path: Option<String> = None;

        if let Some(ref path) = self.config_file_path {
            match load_config_file(path) {
                Ok(file_config) => {
                    apply_file_config(&mut self.config, &file_config);
                    loaded_path = Some(path.clone());
                    tracing::info!("Loaded base configuration from specified file: {}", path);
                }
                Err(e) => {
                    tracing::error!("Failed to load specified config file '{}': {}", path, e);
                    return Err(AppError::Config(format!(
                        "Failed to load specified configuration file '{}': {:#}",
                        path, e
                    )));
                }
            }
        } else {
            tracing::debug!("No config file specified, checking default locations.");
            for path_str in ["./email-harvester.toml", "./config.toml"] {
                if Path::new(path_str).exists() {
                    match load_config_file(path_str) {
                        Ok(file_config) => {
                            apply_file_config(&mut self.config, &file_config);
                            loaded_path = Some(path_str.to_string());
                            tracing::info!(
                                "Loaded base configuration from default location: {}",
                                path_str
                            );
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to load or parse default config '{}': {:#}",
                                path_str,
                                e
                            );
                        }
                    }
                }
            }
            if loaded_path.is_none() {
                tracing::debug!("No configuration file found. Using default values and overrides.");
            }
        }

        apply_file_config(&mut self.config, &self.overrides);
        self.config.loaded_config_path = loaded_path;
        validate_config(&mut self.config)?;

        tracing::debug!("Configuration ready (file: {:?}).", self.config.loaded_config_path);
        Ok(self.config)
    }
}
