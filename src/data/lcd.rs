use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::data::query::ContractQuerier;
use crate::error::{Boundary, ClientError, Result};

/// Smart-contract queries over a chain's LCD (REST) endpoint.
pub struct LcdQuerier {
    client: Client,
    base_url: String,
    contract_address: String,
}

#[derive(Debug, Deserialize)]
struct SmartQueryResponse {
    data: serde_json::Value,
}

impl LcdQuerier {
    pub fn new(base_url: &str, contract_address: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::network(Boundary::Query, e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            contract_address: contract_address.to_string(),
        })
    }

    /// `{base}/cosmwasm/wasm/v1/contract/{address}/smart/{base64(query)}`
    pub fn smart_query_url(&self, query: &[u8]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|_| ClientError::MisconfiguredClient("network.lcd_url"))?;
        let encoded = STANDARD.encode(query);

        url.path_segments_mut()
            .map_err(|_| ClientError::MisconfiguredClient("network.lcd_url"))?
            .pop_if_empty()
            .extend([
                "cosmwasm",
                "wasm",
                "v1",
                "contract",
                self.contract_address.as_str(),
                "smart",
                encoded.as_str(),
            ]);

        Ok(url)
    }
}

#[async_trait]
impl ContractQuerier for LcdQuerier {
    async fn query_raw(&self, query: &[u8]) -> Result<Vec<u8>> {
        let url = self.smart_query_url(query)?;
        debug!("Smart query: {}", String::from_utf8_lossy(query));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::network(Boundary::Query, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::network(Boundary::Query, e))?;

        if !status.is_success() {
            return Err(ClientError::network(
                Boundary::Query,
                format!("status {}: {}", status, String::from_utf8_lossy(&body)),
            ));
        }

        let envelope: SmartQueryResponse = serde_json::from_slice(&body)
            .map_err(|e| ClientError::DecodeError(format!("invalid query envelope: {}", e)))?;

        serde_json::to_vec(&envelope.data).map_err(|e| ClientError::DecodeError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_query_url() {
        let querier = LcdQuerier::new(
            "https://lcd.example.com/",
            "inj1contract",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = querier.smart_query_url(br#"{"list_events":{}}"#).unwrap();

        assert_eq!(
            url.as_str(),
            "https://lcd.example.com/cosmwasm/wasm/v1/contract/inj1contract/smart/eyJsaXN0X2V2ZW50cyI6e319"
        );
    }

    #[test]
    fn test_smart_query_url_keeps_base_path() {
        let querier = LcdQuerier::new(
            "https://example.com/lcd",
            "inj1contract",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = querier.smart_query_url(b"{}").unwrap();
        assert!(url
            .as_str()
            .starts_with("https://example.com/lcd/cosmwasm/wasm/v1/contract/inj1contract/smart/"));
    }

    #[test]
    fn test_invalid_base_url_is_misconfiguration() {
        let querier = LcdQuerier::new("not a url", "inj1contract", Duration::from_secs(5)).unwrap();

        assert!(matches!(
            querier.smart_query_url(b"{}"),
            Err(ClientError::MisconfiguredClient("network.lcd_url"))
        ));
    }
}
