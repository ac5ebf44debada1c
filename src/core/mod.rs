pub mod config;
pub mod coordinator;
pub mod error;
pub mod harvester;
pub mod journal;
pub mod merge;
pub mod models;

#[cfg(test)]
pub(crate) mod test_support;
