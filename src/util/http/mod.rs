use std::time::Duration;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;

pub mod element;

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

/// 固定使用桌面版瀏覽器的 UA，部分站點會拒絕預設的 reqwest UA
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/133.0.6943.60 Safari/537.36";

/// Returns the reqwest client singleton instance or creates one if it doesn't exist.
fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            // ===== 壓縮 =====
            .brotli(true)
            .gzip(true)
            .zstd(true)
            // ===== 超時設置 =====
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(15))
            // ===== TCP 優化 =====
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            // ===== 連接池 =====
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            // ===== Cookie 和重定向 =====
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            // ===== Headers =====
            .referer(true)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| anyhow!("Failed to create reqwest client: {:?}", e))
    })
}

/// Performs an HTTP GET request and deserializes the JSON response into the specified type.
///
/// A non-2xx status is an error, as is a body that does not match `RES`.
pub async fn get_json<RES: DeserializeOwned>(url: &str) -> Result<RES> {
    get_response(url)
        .await?
        .json::<RES>()
        .await
        .map_err(|e| anyhow!("Error parsing response JSON: {:?}", e))
}

/// Performs an HTTP GET request and returns the response as text.
pub async fn get(url: &str) -> Result<String> {
    get_response(url)
        .await?
        .text()
        .await
        .map_err(|e| anyhow!("Error parsing response text: {:?}", e))
}

async fn get_response(url: &str) -> Result<Response> {
    send(Method::GET, url).await
}

/// Sends a single HTTP request and turns error status codes into errors.
///
/// There is no retry here: a failed request is reported to the caller, which
/// decides whether the whole unit of work is skipped.
async fn send(method: Method, url: &str) -> Result<Response> {
    let client = get_client()?;
    let response = client
        .request(method.clone(), url)
        .send()
        .await
        .map_err(|why| anyhow!("Failed to send {}:{} because {:?}", method, url, why))?;

    response
        .error_for_status()
        .map_err(|why| anyhow!("{}:{} returned an error status: {}", method, url, why))
}
