//! # PSE EDGE 採集模組
//!
//! 從菲律賓證券交易所的 EDGE 站點抓取每日收盤資料。
//!
//! - 公司代號查詢：`/autoComplete/searchCompanyNameSymbol.ax`，回傳 JSON 陣列，
//!   取第一筆的 `cmpyId`。
//! - 個股行情頁：`/companyPage/stockData.do`，回傳 HTML，欄位以
//!   「標籤 + 相鄰節點」的方式排列。

use async_trait::async_trait;
use concat_string::concat_string;
use scraper::Html;
use serde_json::Value;

use crate::{
    crawler::{CrawlError, QuoteSource},
    declare::CompanyId,
    util,
};

/// 收盤、開盤、最高、最低、成交量欄位解析
pub mod quote;

/// PSE EDGE 的預設位址
pub const HOST: &str = "https://edge.pse.com.ph";

/// PSE EDGE 採集器
#[derive(Debug, Clone)]
pub struct PseEdge {
    host: String,
}

impl PseEdge {
    pub fn new(host: &str) -> Self {
        PseEdge {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    fn search_url(&self, symbol: &str) -> String {
        concat_string!(
            self.host,
            "/autoComplete/searchCompanyNameSymbol.ax?term=",
            urlencoding::encode(symbol)
        )
    }

    fn stock_data_url(&self, company_id: CompanyId) -> String {
        concat_string!(
            self.host,
            "/companyPage/stockData.do?cmpy_id=",
            company_id.to_string()
        )
    }
}

#[async_trait]
impl QuoteSource for PseEdge {
    async fn resolve_company_id(&self, symbol: &str) -> Result<CompanyId, CrawlError> {
        let lookup_failed = |reason: String| CrawlError::LookupFailed {
            symbol: symbol.to_string(),
            reason,
        };

        let url = self.search_url(symbol);
        let results = util::http::get_json::<Value>(&url)
            .await
            .map_err(|why| lookup_failed(format!("{:?}", why)))?;

        read_company_id(&results).ok_or_else(|| {
            lookup_failed(format!("no cmpyId in the first search result: {}", results))
        })
    }

    async fn fetch_document(&self, company_id: CompanyId) -> Result<Html, CrawlError> {
        let url = self.stock_data_url(company_id);
        let text = util::http::get(&url)
            .await
            .map_err(|why| CrawlError::FetchFailed {
                company_id,
                reason: format!("{:?}", why),
            })?;

        let document = Html::parse_document(&text);
        if document.root_element().text().all(|t| t.trim().is_empty()) {
            return Err(CrawlError::FetchFailed {
                company_id,
                reason: "the quote page has no content".to_string(),
            });
        }

        Ok(document)
    }
}

/// 取出 `[0].cmpyId`，數字或數字字串皆可
fn read_company_id(results: &Value) -> Option<CompanyId> {
    let id = results.get(0)?.get("cmpyId")?;

    let id = match id {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    id.map(CompanyId)
}
