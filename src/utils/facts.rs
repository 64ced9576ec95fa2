#![forbid(unsafe_code)]

use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use log::debug;
use reqwest::Client;

use crate::utils::errors::Errors;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Fact category requested from the service.
const FACT_CATEGORY : &str = "math";

// ***************************************************************************
//                                 FactSource
// ***************************************************************************
/// A source of trivia about integers.  Lookups are best effort: callers
/// substitute their own text on any error.
pub trait FactSource: Send + Sync {
    /// Fetch a trivia string for `number`.
    fn fetch_fact(&self, number: i64) -> BoxFuture<'_, Result<String, Errors>>;
}

// ---------------------------------------------------------------------------
// fallback_fact:
// ---------------------------------------------------------------------------
/** The text used when no fact source could answer. */
pub fn fallback_fact(number: i64) -> String {
    format!("{} is a number", number)
}

// ***************************************************************************
//                              NumbersApiClient
// ***************************************************************************
/// Fact source backed by a numbersapi.com style service that answers
/// `GET <base_url>/<number>/math` with plain text.
#[derive(Debug, Clone)]
pub struct NumbersApiClient {
    client: Client,
    base_url: String,
}

impl NumbersApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, Errors> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Errors::Internal(format!("Unable to build fact client: {}", e)))?;

        Ok(Self {client, base_url: base_url.trim_end_matches('/').to_string()})
    }

    /// The address queried for `number`.
    pub fn fact_url(&self, number: i64) -> String {
        format!("{}/{}/{}", self.base_url, number, FACT_CATEGORY)
    }

    async fn get_fact(&self, number: i64) -> Result<String, Errors> {
        let url = self.fact_url(number);
        debug!("Requesting fact from {}", url);

        let resp = self.client.get(&url).send().await
            .map_err(|e| Errors::FactLookup(format!("{}: {}", url, e)))?;
        let resp = resp.error_for_status()
            .map_err(|e| Errors::FactLookup(format!("{}: {}", url, e)))?;
        let text = resp.text().await
            .map_err(|e| Errors::FactLookup(format!("{}: {}", url, e)))?;

        // An empty body is as useless as no answer.
        if text.trim().is_empty() {
            return Err(Errors::FactLookup(format!("{}: empty response body", url)));
        }
        Ok(text)
    }
}

impl FactSource for NumbersApiClient {
    fn fetch_fact(&self, number: i64) -> BoxFuture<'_, Result<String, Errors>> {
        self.get_fact(number).boxed()
    }
}
