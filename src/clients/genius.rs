use std::time::Duration;

use log::debug;
use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::clients::{
    entities::{Credential, Hit, SearchEnvelope},
    errors::{Error, Result},
};

pub const DEFAULT_BASE_URL: &str = "http://api.genius.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can answer a search term with a page of hits.
///
/// [`GeniusClient`] is the real implementation; the batch runner only depends
/// on this trait so it can be driven by canned responses.
#[allow(async_fn_in_trait)]
pub trait SearchApi {
    /// Issue one search request for `term`, asking for up to `per_page` hits.
    async fn search(&self, term: &str, per_page: u32) -> Result<Vec<Hit>>;
}

pub struct GeniusClient {
    http: reqwest::Client,
    base_url: String,
    credential: Credential,
}

impl GeniusClient {
    pub fn new(credential: Credential, base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigurationError(format!("Failed to build HTTP client: {e}")))?;
        Ok(GeniusClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credential,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn search_url(&self, term: &str, per_page: u32) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[
                ("q", term),
                ("access_token", self.credential.as_str()),
                ("per_page", per_page.to_string().as_str()),
            ],
        )
        .map_err(|e| Error::ConfigurationError(format!("Invalid base URL {}: {e}", self.base_url)))
    }
}

impl SearchApi for GeniusClient {
    async fn search(&self, term: &str, per_page: u32) -> Result<Vec<Hit>> {
        let url = self.search_url(term, per_page)?;
        debug!("Searching Genius for {term:?} (per_page={per_page})");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        let hits = parse_search_response(status, &body)?;
        debug!("Genius returned {} hits for {term:?}", hits.len());
        Ok(hits)
    }
}

/// Classify a search response and pull the hit records out of its body.
///
/// 401 and 429 map to [`Error::AuthError`] and [`Error::RateLimitError`];
/// any other non-success status is an [`Error::HttpStatusError`]. A success
/// body must be JSON carrying an array at `response.hits` whose entries each
/// hold an object `result`.
pub fn parse_search_response(status: StatusCode, body: &str) -> Result<Vec<Hit>> {
    match status {
        StatusCode::UNAUTHORIZED => return Err(Error::AuthError),
        StatusCode::TOO_MANY_REQUESTS => return Err(Error::RateLimitError),
        s if !s.is_success() => return Err(Error::HttpStatusError(s.as_u16())),
        _ => {}
    }

    let json: Value = serde_json::from_str(body).map_err(Error::MalformedResponseError)?;
    if !json.pointer("/response/hits").is_some_and(Value::is_array) {
        return Err(Error::SchemaError(
            "expected an array at response.hits".into(),
        ));
    }
    let envelope: SearchEnvelope = serde_json::from_value(json)
        .map_err(|e| Error::SchemaError(format!("invalid hit entry: {e}")))?;

    Ok(envelope
        .response
        .hits
        .into_iter()
        .map(|hit| hit.result)
        .collect())
}
