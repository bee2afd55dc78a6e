use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::data::types::Coin;
use crate::error::{Boundary, ClientError, Result};
use crate::execution::types::{ExecuteMsg, RequestDescriptor, TxResponse};
use crate::wallet::provider::OfflineSigner;

/// Submits signed requests to the ledger.
///
/// Implementations must not retry: a repeated submission can spend the
/// user's funds twice.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(
        &self,
        chain_id: &str,
        request: &RequestDescriptor,
        signer: &dyn OfflineSigner,
    ) -> Result<TxResponse>;
}

/// The document the sender signs. Field order is fixed by the struct.
#[derive(Debug, Serialize)]
pub struct SignDoc<'a> {
    pub chain_id: &'a str,
    pub sender: &'a str,
    pub contract: &'a str,
    pub msg: &'a ExecuteMsg,
    pub funds: &'a [Coin],
}

impl<'a> SignDoc<'a> {
    pub fn new(chain_id: &'a str, request: &'a RequestDescriptor) -> Self {
        Self {
            chain_id,
            sender: &request.sender,
            contract: &request.contract,
            msg: &request.msg,
            funds: &request.funds,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ClientError::DecodeError(e.to_string()))
    }
}

#[derive(Serialize)]
struct SignedRequest<'a> {
    #[serde(flatten)]
    doc: &'a SignDoc<'a>,
    signature: String,
}

#[derive(Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponse,
}

/// Posts signed requests to a broadcast relay over HTTP.
pub struct HttpBroadcaster {
    client: Client,
    url: String,
}

impl HttpBroadcaster {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::network(Boundary::Broadcast, e))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl Broadcaster for HttpBroadcaster {
    async fn broadcast(
        &self,
        chain_id: &str,
        request: &RequestDescriptor,
        signer: &dyn OfflineSigner,
    ) -> Result<TxResponse> {
        let doc = SignDoc::new(chain_id, request);
        let signature = signer.sign(&request.sender, &doc.to_bytes()?).await?;
        let body = SignedRequest {
            doc: &doc,
            signature: STANDARD.encode(signature),
        };

        info!("Broadcasting {} from {}", request.msg.kind(), request.sender);

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::network(Boundary::Broadcast, e))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::network(Boundary::Broadcast, e))?;

        if !status.is_success() {
            warn!("Broadcast relay answered {}", status);
            return Err(ClientError::network(
                Boundary::Broadcast,
                format!("status {}: {}", status, String::from_utf8_lossy(&bytes)),
            ));
        }

        let parsed: BroadcastResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ClientError::network(Boundary::Broadcast, format!("unreadable broadcast response: {}", e))
        })?;

        Ok(parsed.tx_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::{OrderType, Outcome};
    use crate::wallet::provider::AccountData;
    use crate::wallet::session::tests::FakeSigner;

    struct RefusingSigner;

    #[async_trait]
    impl OfflineSigner for RefusingSigner {
        async fn get_accounts(&self) -> Result<Vec<AccountData>> {
            Ok(vec![])
        }

        async fn sign(&self, _signer_address: &str, _payload: &[u8]) -> Result<Vec<u8>> {
            Err(ClientError::network(Boundary::Wallet, "user rejected the request"))
        }
    }

    fn create_event() -> RequestDescriptor {
        RequestDescriptor {
            contract: "inj1exchange".to_string(),
            sender: "inj1alice".to_string(),
            msg: ExecuteMsg::CreateEvent {
                description: "Rain in London".to_string(),
                oracle_addr: None,
                resolution_deadline: None,
            },
            funds: vec![],
        }
    }

    /// URL of a local port with nothing listening on it.
    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{}/broadcast", port)
    }

    #[test]
    fn test_sign_doc_is_canonical() {
        let request = RequestDescriptor {
            contract: "inj1exchange".to_string(),
            sender: "inj1alice".to_string(),
            msg: ExecuteMsg::PlaceOrder {
                event_id: 1,
                order_type: OrderType::Back,
                outcome: Outcome::Yes,
                stake: 5,
                odds: "2".parse().unwrap(),
            },
            funds: vec![Coin::new("inj", 5)],
        };

        let bytes = SignDoc::new("injective-888", &request).to_bytes().unwrap();

        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"chain_id":"injective-888","sender":"inj1alice","contract":"inj1exchange","msg":{"place_order":{"event_id":1,"order_type":"Back","outcome":"Yes","stake":"5","odds":"2"}},"funds":[{"denom":"inj","amount":"5"}]}"#
        );
    }

    #[test]
    fn test_signed_request_flattens_doc() {
        let request = RequestDescriptor {
            contract: "c".to_string(),
            sender: "s".to_string(),
            msg: ExecuteMsg::CreateEvent {
                description: "d".to_string(),
                oracle_addr: None,
                resolution_deadline: None,
            },
            funds: vec![],
        };
        let doc = SignDoc::new("x", &request);
        let body = SignedRequest {
            doc: &doc,
            signature: "c2ln".to_string(),
        };

        let json: serde_json::Value = serde_json::to_value(&body).unwrap();
        assert_eq!(json["chain_id"], "x");
        assert_eq!(json["signature"], "c2ln");
        assert_eq!(json["msg"]["create_event"]["description"], "d");
    }

    #[test]
    fn test_broadcast_response_envelope() {
        let parsed: BroadcastResponse = serde_json::from_str(
            r#"{"tx_response":{"height":"0","code":5,"txhash":"AB12","raw_log":"insufficient funds"}}"#,
        )
        .unwrap();

        assert_eq!(parsed.tx_response.code, 5);
        assert_eq!(parsed.tx_response.raw_log.as_deref(), Some("insufficient funds"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_may_have_submitted() {
        let broadcaster = HttpBroadcaster::new(&closed_port_url(), Duration::from_secs(5)).unwrap();
        let signer = FakeSigner { accounts: vec![] };

        let err = broadcaster
            .broadcast("injective-888", &create_event(), &signer)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::NetworkFailure {
                boundary: Boundary::Broadcast,
                ..
            }
        ));
        assert!(err.may_have_submitted());
    }

    #[tokio::test]
    async fn test_signer_failure_stays_on_wallet_boundary() {
        let broadcaster = HttpBroadcaster::new(&closed_port_url(), Duration::from_secs(5)).unwrap();

        let err = broadcaster
            .broadcast("injective-888", &create_event(), &RefusingSigner)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::NetworkFailure {
                boundary: Boundary::Wallet,
                ..
            }
        ));
        assert!(!err.may_have_submitted());
    }
}
