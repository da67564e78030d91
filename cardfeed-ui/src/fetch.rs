//! One-shot HTTP requests (button action, PDF download)

use bytes::Bytes;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::{Error, Result};

/// GET `url` and decode the body as card fields
pub async fn fetch_payload(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Map<String, Value>> {
    let body = get_checked(http, url, timeout).await?.text().await?;
    Ok(cardfeed_common::events::decode_payload(&body)?)
}

/// GET `url` and return the raw body
pub async fn fetch_bytes(http: &reqwest::Client, url: &str, timeout: Duration) -> Result<Bytes> {
    Ok(get_checked(http, url, timeout).await?.bytes().await?)
}

async fn get_checked(
    http: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<reqwest::Response> {
    let response = http.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::Status(status.as_u16()));
    }

    Ok(response)
}
