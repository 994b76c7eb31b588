use async_trait::async_trait;

use crate::{
    crawler::{CrawlError, QuoteSource, ScrapeFailed, StockScraper},
    declare::{FieldValue, Price, StockRecord, Volume},
    util::{
        http::element::{LabeledDocument, Missing},
        text::NumberLocale,
    },
};

/// Quote figures read from the stock data page, in extraction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Close,
    Open,
    High,
    Low,
    Volume,
}

impl Field {
    /// 頁面上的欄位標籤
    pub fn label(&self) -> &'static str {
        match self {
            Field::Close => "Close",
            Field::Open => "Open",
            Field::High => "High",
            Field::Low => "Low",
            Field::Volume => "Volume",
        }
    }
}

/// Number types a field can be parsed into.
pub trait FieldNumber: Sized {
    fn parse_localized(locale: &NumberLocale, text: &str) -> anyhow::Result<Self>;
}

impl FieldNumber for f64 {
    fn parse_localized(locale: &NumberLocale, text: &str) -> anyhow::Result<Self> {
        locale.parse_f64(text)
    }
}

impl FieldNumber for i64 {
    fn parse_localized(locale: &NumberLocale, text: &str) -> anyhow::Result<Self> {
        locale.parse_i64(text)
    }
}

/// Reads the value that follows the `field` label.
///
/// Blank cells are `NotAvailable`; a missing label or value node is
/// `FieldNotFound`; anything else that is not a number is `FieldParseError`.
pub fn extract<T, D>(
    document: &D,
    field: Field,
    locale: &NumberLocale,
) -> Result<FieldValue<T>, CrawlError>
where
    T: FieldNumber,
    D: LabeledDocument + ?Sized,
{
    let label = field.label();
    let text = document.sibling_text(label).map_err(|missing| {
        let reason = match missing {
            Missing::Label => "no element carries the label",
            Missing::Sibling => "the label has no value element after it",
        };
        CrawlError::FieldNotFound {
            label,
            reason: reason.to_string(),
        }
    })?;

    let text = text.trim();
    if text.is_empty() {
        return Ok(FieldValue::NotAvailable);
    }

    T::parse_localized(locale, text)
        .map(FieldValue::Value)
        .map_err(|why| CrawlError::FieldParseError {
            label,
            text: text.to_string(),
            reason: why.to_string(),
        })
}

pub fn extract_price<D: LabeledDocument + ?Sized>(
    document: &D,
    field: Field,
    locale: &NumberLocale,
) -> Result<Price, CrawlError> {
    extract::<f64, D>(document, field, locale)
}

pub fn extract_volume<D: LabeledDocument + ?Sized>(
    document: &D,
    locale: &NumberLocale,
) -> Result<Volume, CrawlError> {
    extract::<i64, D>(document, Field::Volume, locale)
}

/// Builds a `StockRecord` from an already fetched page.
///
/// Fields are read in close, open, high, low, volume order and the first
/// failure ends the extraction.
pub fn read_record<D: LabeledDocument + ?Sized>(
    symbol: &str,
    document: &D,
    locale: &NumberLocale,
) -> Result<StockRecord, CrawlError> {
    Ok(StockRecord {
        stock: symbol.to_string(),
        close: extract_price(document, Field::Close, locale)?,
        open: extract_price(document, Field::Open, locale)?,
        high: extract_price(document, Field::High, locale)?,
        low: extract_price(document, Field::Low, locale)?,
        volume: extract_volume(document, locale)?,
    })
}

/// Scrapes end-of-day quotes: company lookup, page download, five fields.
pub struct QuoteScraper<S> {
    source: S,
    locale: NumberLocale,
}

impl<S: QuoteSource> QuoteScraper<S> {
    pub fn new(source: S, locale: NumberLocale) -> Self {
        QuoteScraper { source, locale }
    }
}

#[async_trait]
impl<S: QuoteSource> StockScraper for QuoteScraper<S> {
    async fn scrape(&self, symbol: &str) -> Result<StockRecord, ScrapeFailed> {
        let failed = |cause: CrawlError| ScrapeFailed {
            symbol: symbol.to_string(),
            cause,
        };

        let company_id = self
            .source
            .resolve_company_id(symbol)
            .await
            .map_err(failed)?;
        let document = self
            .source
            .fetch_document(company_id)
            .await
            .map_err(failed)?;

        read_record(symbol, &document, &self.locale).map_err(failed)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use scraper::Html;

    use super::*;
    use crate::declare::CompanyId;

    /// 以固定內容回應的標籤文件
    struct FakeDocument {
        cells: HashMap<&'static str, Result<&'static str, Missing>>,
        asked: Mutex<Vec<String>>,
    }

    impl FakeDocument {
        fn with_all(text: &'static str) -> Self {
            let cells = FIELDS.iter().map(|f| (f.label(), Ok(text))).collect();
            FakeDocument {
                cells,
                asked: Mutex::new(Vec::new()),
            }
        }

        fn set(mut self, field: Field, cell: Result<&'static str, Missing>) -> Self {
            self.cells.insert(field.label(), cell);
            self
        }
    }

    impl LabeledDocument for FakeDocument {
        fn sibling_text(&self, label: &str) -> Result<String, Missing> {
            self.asked.lock().unwrap().push(label.to_string());
            self.cells
                .get(label)
                .copied()
                .unwrap_or(Err(Missing::Label))
                .map(|s| s.to_string())
        }
    }

    const EN: NumberLocale = NumberLocale::EN_US;
    const FIELDS: [Field; 5] = [Field::Close, Field::Open, Field::High, Field::Low, Field::Volume];

    #[test]
    fn test_extract_grouped_numbers() {
        let document = FakeDocument::with_all("1,000.00");

        for field in [Field::Close, Field::Open, Field::High, Field::Low] {
            assert_eq!(
                extract_price(&document, field, &EN).unwrap(),
                FieldValue::Value(1000.0)
            );
        }

        let document = FakeDocument::with_all(" 1,000 ");
        assert_eq!(
            extract_volume(&document, &EN).unwrap(),
            FieldValue::Value(1000)
        );
    }

    #[test]
    fn test_extract_missing_label_or_sibling() {
        for field in FIELDS {
            for missing in [Missing::Label, Missing::Sibling] {
                let document = FakeDocument::with_all("1").set(field, Err(missing));
                let why = match field {
                    Field::Volume => extract_volume(&document, &EN).map(|_| ()),
                    _ => extract_price(&document, field, &EN).map(|_| ()),
                }
                .unwrap_err();

                assert!(
                    matches!(why, CrawlError::FieldNotFound { label, .. } if label == field.label()),
                    "{:?}",
                    why
                );
            }
        }
    }

    #[test]
    fn test_extract_blank_is_not_available() {
        for blank in ["", "   ", "\n\t"] {
            let document = FakeDocument::with_all(blank);

            for field in [Field::Close, Field::Open, Field::High, Field::Low] {
                assert_eq!(
                    extract_price(&document, field, &EN).unwrap(),
                    FieldValue::NotAvailable
                );
            }
            assert_eq!(
                extract_volume(&document, &EN).unwrap(),
                FieldValue::NotAvailable
            );
        }
    }

    #[test]
    fn test_extract_not_a_number() {
        let document = FakeDocument::with_all("abc");

        for field in [Field::Close, Field::Open, Field::High, Field::Low] {
            let why = extract_price(&document, field, &EN).unwrap_err();
            assert!(matches!(why, CrawlError::FieldParseError { ref text, .. } if text == "abc"));
        }

        let document = FakeDocument::with_all("1,000.50");
        let why = extract_volume(&document, &EN).unwrap_err();
        assert!(matches!(
            why,
            CrawlError::FieldParseError { label: "Volume", .. }
        ));
    }

    #[test]
    fn test_extract_rejects_run_together_digits() {
        let page = Html::parse_document(
            "<table><tr><th>Close</th><td>1 2</td></tr>\
             <tr><th>Open</th><td>3\n4</td></tr>\
             <tr><th>Volume</th><td>1 2</td></tr></table>",
        );

        for field in [Field::Close, Field::Open] {
            let why = extract_price(&page, field, &EN).unwrap_err();
            assert!(
                matches!(why, CrawlError::FieldParseError { label, .. } if label == field.label()),
                "{:?}",
                why
            );
        }

        let why = extract_volume(&page, &EN).unwrap_err();
        assert!(matches!(
            why,
            CrawlError::FieldParseError { label: "Volume", .. }
        ));
    }

    #[test]
    fn test_read_record_order() {
        let document = FakeDocument::with_all("1");
        read_record("XYZ", &document, &EN).unwrap();

        assert_eq!(
            *document.asked.lock().unwrap(),
            vec!["Close", "Open", "High", "Low", "Volume"]
        );
    }

    #[test]
    fn test_read_record_stops_at_first_failure() {
        let document = FakeDocument::with_all("1").set(Field::High, Err(Missing::Label));
        let why = read_record("XYZ", &document, &EN).unwrap_err();

        assert!(matches!(why, CrawlError::FieldNotFound { label: "High", .. }));
        assert_eq!(
            *document.asked.lock().unwrap(),
            vec!["Close", "Open", "High"]
        );
    }

    const PAGE: &str = r#"
        <html><body>
        <table class="view">
          <tr><th>Close</th><td>1.00</td><th>Change</th><td>-0.02</td></tr>
          <tr><th>Open</th><td>2.00</td><th>High</th><td>3.00</td></tr>
          <tr><th>Low</th><td>4.00</td><th>Volume</th><td>5</td></tr>
        </table>
        </body></html>
    "#;

    #[derive(Clone, Default)]
    struct FakeSource {
        page: Option<&'static str>,
        lookup_fails: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl QuoteSource for FakeSource {
        async fn resolve_company_id(&self, symbol: &str) -> Result<CompanyId, CrawlError> {
            self.calls.lock().unwrap().push(format!("lookup {}", symbol));
            if self.lookup_fails {
                return Err(CrawlError::LookupFailed {
                    symbol: symbol.to_string(),
                    reason: "HTTP status server error (500)".to_string(),
                });
            }
            Ok(CompanyId(1234))
        }

        async fn fetch_document(&self, company_id: CompanyId) -> Result<Html, CrawlError> {
            self.calls.lock().unwrap().push(format!("fetch {}", company_id));
            match self.page {
                Some(page) => Ok(Html::parse_document(page)),
                None => Err(CrawlError::FetchFailed {
                    company_id,
                    reason: "HTTP status client error (404)".to_string(),
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_scrape() {
        let source = FakeSource {
            page: Some(PAGE),
            ..Default::default()
        };
        let scraper = QuoteScraper::new(source.clone(), EN);

        let sr = scraper.scrape("XYZ").await.unwrap();

        assert_eq!(
            sr,
            StockRecord {
                stock: "XYZ".to_string(),
                close: FieldValue::Value(1.0),
                open: FieldValue::Value(2.0),
                high: FieldValue::Value(3.0),
                low: FieldValue::Value(4.0),
                volume: FieldValue::Value(5),
            }
        );
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["lookup XYZ", "fetch 1234"]
        );
    }

    #[tokio::test]
    async fn test_scrape_lookup_fails() {
        let source = FakeSource {
            page: Some(PAGE),
            lookup_fails: true,
            ..Default::default()
        };
        let scraper = QuoteScraper::new(source.clone(), EN);

        let why = scraper.scrape("AAPL").await.unwrap_err();

        assert_eq!(why.symbol, "AAPL");
        assert!(matches!(why.cause, CrawlError::LookupFailed { .. }));
        assert_eq!(*source.calls.lock().unwrap(), vec!["lookup AAPL"]);
    }

    #[tokio::test]
    async fn test_scrape_fetch_fails() {
        let scraper = QuoteScraper::new(FakeSource::default(), EN);

        let why = scraper.scrape("AAPL").await.unwrap_err();

        assert!(matches!(why.cause, CrawlError::FetchFailed { .. }));
    }

    #[tokio::test]
    async fn test_scrape_field_fails() {
        let source = FakeSource {
            page: Some("<table><tr><th>Close</th><td>1.00</td></tr></table>"),
            ..Default::default()
        };
        let scraper = QuoteScraper::new(source, EN);

        let why = scraper.scrape("AAPL").await.unwrap_err();

        assert!(matches!(
            why.cause,
            CrawlError::FieldNotFound { label: "Open", .. }
        ));
        assert!(why.to_string().contains("AAPL"));
    }

    #[tokio::test]
    async fn test_scrape_blank_cells() {
        let source = FakeSource {
            page: Some(
                "<table><tr><th>Close</th><td> </td><th>Open</th><td></td>\
                 <th>High</th><td></td><th>Low</th><td></td>\
                 <th>Volume</th><td>\n</td></tr></table>",
            ),
            ..Default::default()
        };
        let scraper = QuoteScraper::new(source, EN);

        let sr = scraper.scrape("DMW").await.unwrap();

        assert_eq!(sr.close, FieldValue::NotAvailable);
        assert_eq!(sr.volume, FieldValue::NotAvailable);
    }
}
