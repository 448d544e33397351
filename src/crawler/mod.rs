//! Crawler module for OData collection harvesting
//!
//! This module contains the core crawling logic, including:
//! - Session establishment and collapsed re-authentication
//! - OData service root and page parsing
//! - Request origins and the crawl report
//! - Overall crawl coordination

mod controller;
pub mod odata;
mod report;
mod request;
mod session;

pub use controller::{Controller, ControllerSettings};
pub use report::CrawlReport;
pub use request::{CrawlRequest, Origin};
pub use session::{Session, SessionManager};

use crate::config::Config;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the transport, cache, frontier and sink from the configuration
/// 2. Authenticate against the identity provider
/// 3. Fetch the service roots and every allowed collection
/// 4. Follow pagination until the frontier is drained
///
/// # Arguments
///
/// * `config` - The harvester configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl reached `Done`
/// * `Err(HarvestError)` - Setup or authentication failed
pub async fn crawl(config: &Config) -> crate::Result<CrawlReport> {
    Controller::from_config(config).await?.run().await
}
