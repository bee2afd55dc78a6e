use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{Config, EnvConfig};
use crate::data::lcd::LcdQuerier;
use crate::data::query::{self, ContractQuerier, QueryMsg};
use crate::data::types::{ContractConfig, Event, MatchedBet, Order, OrderType, Outcome};
use crate::error::{ClientError, Result};
use crate::execution::broadcaster::{Broadcaster, HttpBroadcaster};
use crate::execution::builder::RequestBuilder;
use crate::execution::liability::{self, LiabilityQuote};
use crate::execution::simulator::DryRunBroadcaster;
use crate::execution::types::{RequestDescriptor, TxResponse};
use crate::monitoring::logger::TxLogger;
use crate::wallet::provider::{LocalKeyProvider, WalletProvider};
use crate::wallet::session::{Session, SessionManager};

const DEFAULT_ADDRESS_PREFIX: &str = "inj";

/// Wallet session, request building, broadcasting and contract queries
/// behind one handle.
///
/// `create_event` and `place_order` take `&self` and keep no in-flight
/// state. Callers must not issue concurrent submissions from the same
/// sender: each would be signed and broadcast independently.
pub struct ExchangeClient {
    config: Arc<Config>,
    sessions: SessionManager,
    builder: RequestBuilder,
    broadcaster: Option<Box<dyn Broadcaster>>,
    querier: Option<Box<dyn ContractQuerier>>,
    tx_log: Option<TxLogger>,
}

impl ExchangeClient {
    pub fn new(
        config: Arc<Config>,
        provider: Option<Arc<dyn WalletProvider>>,
        broadcaster: Box<dyn Broadcaster>,
        querier: Box<dyn ContractQuerier>,
    ) -> Self {
        Self::assemble(config, provider, Some(broadcaster), Some(querier))
    }

    /// Wire up the shipped collaborators from configuration.
    ///
    /// Missing network settings do not fail here; the first operation that
    /// needs them reports `MisconfiguredClient`.
    pub fn from_config(config: Config, env: &EnvConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);
        let timeout = Duration::from_secs(config.network.rpc_timeout_secs);

        let provider: Option<Arc<dyn WalletProvider>> =
            match (env.wallet_private_key.as_deref(), config.chain_id()) {
                (Some(key), Ok(chain_id)) => {
                    let prefix = if env.address_prefix.is_empty() {
                        DEFAULT_ADDRESS_PREFIX
                    } else {
                        env.address_prefix.as_str()
                    };
                    let provider = LocalKeyProvider::from_private_key(key, chain_id, prefix)?;
                    info!("Local wallet loaded: {}", provider.address());
                    Some(Arc::new(provider))
                }
                _ => None,
            };

        let broadcaster: Option<Box<dyn Broadcaster>> = if config.system.dry_run {
            Some(Box::new(DryRunBroadcaster::new()))
        } else {
            match config.broadcast_url() {
                Ok(url) => Some(Box::new(HttpBroadcaster::new(url, timeout)?)),
                Err(_) => None,
            }
        };

        let querier: Option<Box<dyn ContractQuerier>> =
            match (config.lcd_url(), config.contract_address()) {
                (Ok(lcd_url), Ok(address)) => {
                    Some(Box::new(LcdQuerier::new(lcd_url, address, timeout)?))
                }
                _ => None,
            };

        let mut client = Self::assemble(config.clone(), provider, broadcaster, querier);
        if config.monitoring.csv_logging {
            client.tx_log = Some(TxLogger::new(&config.monitoring.csv_log_path)?);
        }
        Ok(client)
    }

    fn assemble(
        config: Arc<Config>,
        provider: Option<Arc<dyn WalletProvider>>,
        broadcaster: Option<Box<dyn Broadcaster>>,
        querier: Option<Box<dyn ContractQuerier>>,
    ) -> Self {
        let chain_id = config.network.chain_id.clone().unwrap_or_default();
        Self {
            sessions: SessionManager::new(provider, chain_id),
            builder: RequestBuilder::new(config.clone()),
            config,
            broadcaster,
            querier,
            tx_log: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn connect(&mut self) -> Result<Session> {
        self.sessions.connect().await
    }

    pub fn disconnect(&mut self) {
        self.sessions.disconnect();
    }

    pub fn session(&self) -> Session {
        self.sessions.snapshot()
    }

    pub fn quote(&self, order_type: OrderType, stake: &str, odds: &str) -> Result<LiabilityQuote> {
        liability::quote(order_type, stake, odds)
    }

    pub async fn create_event(
        &self,
        description: &str,
        oracle_addr: Option<&str>,
        resolution_deadline: Option<&str>,
    ) -> Result<TxResponse> {
        let session = self.sessions.snapshot();
        let request = self.builder.build_create_event_request(
            &session,
            description,
            oracle_addr,
            resolution_deadline,
        )?;
        self.submit(&session, request).await
    }

    pub async fn place_order(
        &self,
        event_id: &str,
        order_type: OrderType,
        outcome: Outcome,
        stake: &str,
        odds: &str,
    ) -> Result<TxResponse> {
        let session = self.sessions.snapshot();
        let request = self.builder.build_place_order_request(
            &session, event_id, order_type, outcome, stake, odds,
        )?;
        self.submit(&session, request).await
    }

    /// Hand a built request to the broadcaster exactly once.
    async fn submit(&self, session: &Session, request: RequestDescriptor) -> Result<TxResponse> {
        let (_, signer) = session.authorization()?;
        let broadcaster = self.broadcaster()?;

        let outcome = broadcaster
            .broadcast(&session.chain_id, &request, &**signer)
            .await;

        if let Some(tx_log) = &self.tx_log {
            if let Err(e) = tx_log.log_attempt(&request, &outcome) {
                warn!("Failed to write transaction log: {:#}", e);
            }
        }

        let tx = outcome.inspect_err(|e| warn!("Broadcast of {} failed: {}", request.msg.kind(), e))?;
        if !tx.is_success() {
            warn!("Transaction {} rejected with code {}", tx.tx_hash, tx.code);
            return Err(ClientError::TransactionRejected {
                code: tx.code,
                tx_hash: tx.tx_hash,
                raw_log: tx.raw_log.unwrap_or_default(),
            });
        }

        info!("{} accepted: {}", request.msg.kind(), tx.tx_hash);
        Ok(tx)
    }

    pub async fn list_events(
        &self,
        start_after: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<Event>> {
        let raw = self.query(&QueryMsg::list_events(start_after, limit)).await?;
        query::parse_events_response(&raw)
    }

    pub async fn get_event(&self, event_id: u64) -> Result<Event> {
        let raw = self.query(&QueryMsg::GetEvent { event_id }).await?;
        query::parse_event_response(&raw)
    }

    pub async fn get_order(&self, order_id: u64) -> Result<Order> {
        let raw = self.query(&QueryMsg::GetOrder { order_id }).await?;
        query::parse_order_response(&raw)
    }

    pub async fn list_orders(
        &self,
        event_id: u64,
        start_after: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>> {
        let msg = QueryMsg::ListOrdersByEvent {
            event_id,
            start_after,
            limit,
            filter_order_type: None,
            filter_outcome: None,
        };
        let raw = self.query(&msg).await?;
        query::parse_orders_response(&raw)
    }

    pub async fn list_matched_bets(
        &self,
        event_id: u64,
        start_after: Option<u64>,
        limit: Option<u32>,
    ) -> Result<Vec<MatchedBet>> {
        let msg = QueryMsg::ListMatchedBetsByEvent {
            event_id,
            start_after,
            limit,
        };
        let raw = self.query(&msg).await?;
        query::parse_matched_bets_response(&raw)
    }

    pub async fn contract_config(&self) -> Result<ContractConfig> {
        let raw = self.query(&QueryMsg::GetConfig {}).await?;
        query::parse_config_response(&raw)
    }

    async fn query(&self, msg: &QueryMsg) -> Result<Vec<u8>> {
        let querier = self.querier()?;
        let bytes = msg.to_bytes()?;
        debug!("Query: {}", String::from_utf8_lossy(&bytes));
        querier.query_raw(&bytes).await
    }

    fn querier(&self) -> Result<&dyn ContractQuerier> {
        match &self.querier {
            Some(querier) => Ok(querier.as_ref()),
            None => {
                self.config.lcd_url()?;
                self.config.contract_address()?;
                Err(ClientError::MisconfiguredClient("network.lcd_url"))
            }
        }
    }

    fn broadcaster(&self) -> Result<&dyn Broadcaster> {
        match &self.broadcaster {
            Some(broadcaster) => Ok(broadcaster.as_ref()),
            None => {
                self.config.broadcast_url()?;
                Err(ClientError::MisconfiguredClient("network.broadcast_url"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Boundary;
    use crate::execution::types::ExecuteMsg;
    use crate::wallet::provider::OfflineSigner;
    use crate::wallet::session::tests::FakeProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct FakeQuerier {
        response: Vec<u8>,
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ContractQuerier for FakeQuerier {
        async fn query_raw(&self, query: &[u8]) -> Result<Vec<u8>> {
            self.seen
                .lock()
                .unwrap()
                .push(String::from_utf8(query.to_vec()).unwrap());
            Ok(self.response.clone())
        }
    }

    #[derive(Clone)]
    struct FakeBroadcaster {
        code: u32,
        fail: bool,
        sent: Arc<Mutex<Vec<RequestDescriptor>>>,
    }

    impl FakeBroadcaster {
        fn answering(code: u32) -> Self {
            Self {
                code,
                fail: false,
                sent: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl Broadcaster for FakeBroadcaster {
        async fn broadcast(
            &self,
            _chain_id: &str,
            request: &RequestDescriptor,
            signer: &dyn OfflineSigner,
        ) -> Result<TxResponse> {
            signer.sign(&request.sender, b"doc").await?;
            self.sent.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(ClientError::network(Boundary::Broadcast, "connection reset"));
            }
            Ok(TxResponse {
                code: self.code,
                tx_hash: "ABCD".to_string(),
                raw_log: (self.code != 0).then(|| "out of gas".to_string()),
            })
        }
    }

    fn config() -> Arc<Config> {
        let mut config = Config::default();
        config.network.chain_id = Some("injective-888".to_string());
        config.contract.address = Some("inj1exchange".to_string());
        config.contract.betting_denom = Some("inj".to_string());
        config.contract.minor_unit_decimals = Some(18);
        Arc::new(config)
    }

    fn client(broadcaster: FakeBroadcaster, querier: FakeQuerier) -> ExchangeClient {
        ExchangeClient::new(
            config(),
            Some(Arc::new(FakeProvider::with_accounts(&["inj1alice"]))),
            Box::new(broadcaster),
            Box::new(querier),
        )
    }

    #[tokio::test]
    async fn test_place_order_broadcasts_funded_request() {
        let broadcaster = FakeBroadcaster::answering(0);
        let mut client = client(broadcaster.clone(), FakeQuerier::default());
        client.connect().await.unwrap();

        let tx = client
            .place_order("7", OrderType::Lay, Outcome::Yes, "10", "2.5")
            .await
            .unwrap();

        assert_eq!(tx.tx_hash, "ABCD");
        let sent = broadcaster.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].sender, "inj1alice");
        assert_eq!(sent[0].funds[0].amount, 15_000_000_000_000_000_000);
        assert!(matches!(sent[0].msg, ExecuteMsg::PlaceOrder { event_id: 7, .. }));
    }

    #[tokio::test]
    async fn test_preview_matches_funded_amount() {
        let broadcaster = FakeBroadcaster::answering(0);
        let mut client = client(broadcaster.clone(), FakeQuerier::default());
        client.connect().await.unwrap();

        let quote = client.quote(OrderType::Lay, "3", "1.75").unwrap();
        client
            .place_order("1", OrderType::Lay, Outcome::No, "3", "1.75")
            .await
            .unwrap();

        assert_eq!(quote.funds_required.to_string(), "2.25");
        assert_eq!(
            broadcaster.sent.lock().unwrap()[0].funds[0].amount,
            2_250_000_000_000_000_000
        );
    }

    #[tokio::test]
    async fn test_rejection_is_surfaced_verbatim() {
        let mut client = client(FakeBroadcaster::answering(11), FakeQuerier::default());
        client.connect().await.unwrap();

        let err = client.create_event("Will it rain?", None, None).await.unwrap_err();

        match &err {
            ClientError::TransactionRejected { code, tx_hash, raw_log } => {
                assert_eq!(*code, 11);
                assert_eq!(tx_hash, "ABCD");
                assert_eq!(raw_log, "out of gas");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.may_have_submitted());
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_not_retried() {
        let broadcaster = FakeBroadcaster {
            fail: true,
            ..FakeBroadcaster::answering(0)
        };
        let mut client = client(broadcaster.clone(), FakeQuerier::default());
        client.connect().await.unwrap();

        let err = client.create_event("Will it rain?", None, None).await.unwrap_err();

        assert!(err.may_have_submitted());
        assert_eq!(broadcaster.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_broadcaster() {
        let broadcaster = FakeBroadcaster::answering(0);
        let mut client = client(broadcaster.clone(), FakeQuerier::default());

        assert!(matches!(
            client.create_event("Will it rain?", None, None).await,
            Err(ClientError::NotConnected)
        ));

        client.connect().await.unwrap();
        assert!(matches!(
            client.place_order("1", OrderType::Back, Outcome::Yes, "0", "2").await,
            Err(ClientError::InvalidStake(_))
        ));
        assert!(matches!(
            client.place_order("", OrderType::Back, Outcome::Yes, "1", "2").await,
            Err(ClientError::MissingEvent(_))
        ));
        assert!(matches!(
            client.create_event("  ", None, None).await,
            Err(ClientError::EmptyDescription)
        ));

        client.disconnect();
        assert!(matches!(
            client.place_order("1", OrderType::Back, Outcome::Yes, "1", "2").await,
            Err(ClientError::NotConnected)
        ));

        assert!(broadcaster.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_events_passes_paging_through() {
        let querier = FakeQuerier {
            response: br#"{"events":[]}"#.to_vec(),
            ..FakeQuerier::default()
        };
        let client = client(FakeBroadcaster::answering(0), querier.clone());

        let events = client.list_events(Some(20), Some(30)).await.unwrap();

        assert!(events.is_empty());
        assert_eq!(
            querier.seen.lock().unwrap().as_slice(),
            [r#"{"list_events":{"start_after":20,"limit":30}}"#]
        );
    }

    #[tokio::test]
    async fn test_contract_config_query() {
        let querier = FakeQuerier {
            response: br#"{"admin":"inj1admin","betting_denom":"inj","next_event_id":4,"next_order_id":9,"next_bet_id":2}"#.to_vec(),
            ..FakeQuerier::default()
        };
        let client = client(FakeBroadcaster::answering(0), querier.clone());

        let config = client.contract_config().await.unwrap();

        assert_eq!(config.admin, "inj1admin");
        assert_eq!(config.next_event_id, 4);
        assert_eq!(querier.seen.lock().unwrap()[0], r#"{"get_config":{}}"#);
    }

    #[tokio::test]
    async fn test_missing_network_settings_fail_at_use() {
        let mut client = ExchangeClient::from_config(Config::default(), &EnvConfig::default()).unwrap();

        assert!(matches!(
            client.list_events(None, None).await,
            Err(ClientError::MisconfiguredClient("network.lcd_url"))
        ));
        assert!(matches!(
            client.connect().await,
            Err(ClientError::MisconfiguredClient("network.chain_id"))
        ));
        assert!(client.quote(OrderType::Back, "1", "2").is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_round_trip() {
        let env = EnvConfig {
            wallet_private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
            ),
            ..EnvConfig::default()
        };
        let mut client = ExchangeClient::from_config((*config()).clone(), &env).unwrap();

        let session = client.connect().await.unwrap();
        let tx = client
            .place_order("3", OrderType::Back, Outcome::No, "1.5", "3")
            .await
            .unwrap();

        assert_eq!(
            session.address.as_deref(),
            Some("inj17w0adeg64ky0daxwd2ugyuneellmjgnxf5vkec")
        );
        assert_eq!(tx.code, 0);
        assert_eq!(tx.tx_hash.len(), 64);
    }
}
