//! Outbound client for the aggregator's collect-request API

use crate::config::PspConfig;
use crate::error::{PspError, PspResult};
use crate::signer::Signer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A confirmed collection request as returned by the aggregator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectRequest {
    /// Aggregator-assigned collection reference, the join key for all
    /// later settlement activity
    pub collect_request_id: String,

    /// Redirect URL the payer is sent to
    pub collect_request_url: String,

    /// Signature attached by the aggregator
    pub sign: String,
}

/// Body of the outbound create-collect-request call
#[derive(Debug, Serialize)]
struct CreateCollectBody {
    school_id: String,
    amount: String,
    callback_url: String,
    sign: String,
}

/// Client for the aggregator's collection-request API.
///
/// Blocking await-style calls with no retry: a failure here means no order
/// gets persisted and the operator resubmits.
pub struct AggregatorClient {
    http: reqwest::Client,
    config: PspConfig,
    signer: Signer,
}

impl AggregatorClient {
    /// Create a client with injected credentials
    pub fn new(config: PspConfig, signer: Signer) -> Self {
        Self { http: reqwest::Client::new(), config, signer }
    }

    /// Issue a collection request for the given school and amount.
    ///
    /// `amount` must parse as a positive number; it is rejected before any
    /// network I/O otherwise.
    pub async fn create_collect_request(
        &self,
        school_id: &str,
        amount: &str,
    ) -> PspResult<CollectRequest> {
        if school_id.trim().is_empty() {
            return Err(PspError::validation("school_id is required"));
        }
        let parsed: f64 = amount
            .trim()
            .parse()
            .map_err(|_| PspError::validation("amount must be numeric"))?;
        if parsed <= 0.0 {
            return Err(PspError::validation("amount must be positive"));
        }

        let mut payload = BTreeMap::new();
        payload.insert("school_id".to_string(), school_id.to_string());
        payload.insert("amount".to_string(), amount.to_string());
        payload.insert("callback_url".to_string(), self.config.callback_url.clone());
        let sign = self.signer.sign(&payload)?;

        let body = CreateCollectBody {
            school_id: school_id.to_string(),
            amount: amount.to_string(),
            callback_url: self.config.callback_url.clone(),
            sign,
        };

        debug!("Creating collect request for school {}", school_id);

        let response = self
            .http
            .post(format!("{}/create-collect-request", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("Collect request rejected by aggregator: {} {}", status, detail);
            return Err(PspError::upstream(format!(
                "create-collect-request returned {status}"
            )));
        }

        let collect: CollectRequest = response
            .json()
            .await
            .map_err(|e| PspError::MalformedResponse(e.to_string()))?;

        if collect.collect_request_id.is_empty() {
            return Err(PspError::MalformedResponse(
                "missing collect_request_id".to_string(),
            ));
        }

        Ok(collect)
    }

    /// Query the aggregator for the current status of a collection request.
    ///
    /// The response body is passed through to the caller unmodified.
    pub async fn collect_request_status(
        &self,
        collect_reference: &str,
        school_id: &str,
    ) -> PspResult<serde_json::Value> {
        if collect_reference.trim().is_empty() || school_id.trim().is_empty() {
            return Err(PspError::validation(
                "collect_request_id and school_id are required",
            ));
        }

        let mut payload = BTreeMap::new();
        payload.insert("school_id".to_string(), school_id.to_string());
        payload.insert("collect_request_id".to_string(), collect_reference.to_string());
        let sign = self.signer.sign(&payload)?;

        let url = format!(
            "{}/collect-request/{}?school_id={}&sign={}",
            self.config.base_url, collect_reference, school_id, sign
        );

        let response = self.http.get(url).bearer_auth(&self.config.api_key).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Status query rejected by aggregator: {}", status);
            return Err(PspError::upstream(format!("collect-request returned {status}")));
        }

        response.json().await.map_err(|e| PspError::MalformedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AggregatorClient {
        let config = PspConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: "api-key-fixture".to_string(),
            pg_key: "pg-key-fixture".to_string(),
            callback_url: "http://localhost/cb".to_string(),
        };
        let signer = Signer::new(&config.pg_key);
        AggregatorClient::new(config, signer)
    }

    #[tokio::test]
    async fn non_numeric_amount_is_rejected_before_any_call() {
        // base_url points at a closed port, so reaching the network would fail
        // with an Http error instead of the Validation error asserted here
        let err = client().create_collect_request("S1", "five hundred").await.unwrap_err();
        assert!(matches!(err, PspError::Validation(_)));
    }

    #[tokio::test]
    async fn zero_amount_is_rejected() {
        let err = client().create_collect_request("S1", "0").await.unwrap_err();
        assert!(matches!(err, PspError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_school_id_is_rejected() {
        let err = client().create_collect_request("  ", "500").await.unwrap_err();
        assert!(matches!(err, PspError::Validation(_)));
    }

    #[tokio::test]
    async fn status_query_requires_both_parameters() {
        let err = client().collect_request_status("", "S1").await.unwrap_err();
        assert!(matches!(err, PspError::Validation(_)));

        let err = client().collect_request_status("CR1", "").await.unwrap_err();
        assert!(matches!(err, PspError::Validation(_)));
    }
}
