//! Input acquisition over HTTP.
//!
//! Every pipeline input may be addressed by a URL instead of a local path.
//! The [`HttpClient`] trait keeps the transport swappable; TLC trip data is
//! public, so no authenticating client exists.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response>;
}

/// Plain unauthenticated reqwest client.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new() -> Self {
        Self(reqwest::Client::new())
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}

/// Fetches a URL's body as raw bytes. No retries; a failed fetch aborts the
/// stage that requested it.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    Ok(resp.bytes().await?.to_vec())
}
