use std::time::Duration;

use reqwest::{
    blocking::{
        Client,
        Response,
    },
    header::{
        HeaderMap,
        HeaderValue,
        USER_AGENT,
    },
    StatusCode,
};

use crate::core::TangoError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) compatible; tango vocabulary import";

pub fn http_client(timeout: Duration) -> Result<Client, TangoError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| TangoError::Custom(format!("HTTP client build failed: {e}")))
}

/// GET a page as text. A 404 is reported as `Ok(None)`; every other failure is a fetch error.
pub fn fetch_text(client: &Client, url: &str) -> Result<Option<String>, TangoError> {
    let resp = client
        .get(url)
        .send()
        .map_err(|e| TangoError::Fetch(format!("GET {} failed: {}", url, e)))?;

    if resp.status() == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    ensure_success(&resp)?;

    resp.text()
        .map(Some)
        .map_err(|e| TangoError::Fetch(format!("Failed to read body of {}: {}", url, e)))
}

fn ensure_success(resp: &Response) -> Result<(), TangoError> {
    if !resp.status().is_success() {
        return Err(TangoError::Fetch(format!(
            "HTTP error {} from {}",
            resp.status(),
            resp.url()
        )));
    }
    Ok(())
}
