use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;

use crate::declare::{CompanyId, StockRecord};

/// 菲律賓證券交易所 PSE EDGE
pub mod pse;

/// Failures of a single scraping step.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to look up the company id of {symbol}: {reason}")]
    LookupFailed { symbol: String, reason: String },
    #[error("failed to fetch the quote page of company {company_id}: {reason}")]
    FetchFailed { company_id: CompanyId, reason: String },
    #[error("field {label} not found: {reason}")]
    FieldNotFound { label: &'static str, reason: String },
    #[error("field {label} holds '{text}' which is not a number: {reason}")]
    FieldParseError {
        label: &'static str,
        text: String,
        reason: String,
    },
}

/// A symbol could not be scraped; `cause` is the step that failed.
#[derive(Debug, Error)]
#[error("failed to scrape {symbol}: {cause}")]
pub struct ScrapeFailed {
    pub symbol: String,
    #[source]
    pub cause: CrawlError,
}

/// Where quote pages come from: a symbol lookup and a page download.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn resolve_company_id(&self, symbol: &str) -> Result<CompanyId, CrawlError>;
    async fn fetch_document(&self, company_id: CompanyId) -> Result<Html, CrawlError>;
}

/// Turns a symbol into a complete quote record, or fails as a whole.
#[async_trait]
pub trait StockScraper: Send + Sync {
    async fn scrape(&self, symbol: &str) -> Result<StockRecord, ScrapeFailed>;
}
