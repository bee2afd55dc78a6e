use async_trait::async_trait;
use ethers::utils::keccak256;
use tracing::info;

use crate::error::Result;
use crate::execution::broadcaster::{Broadcaster, SignDoc};
use crate::execution::types::{RequestDescriptor, TxResponse};
use crate::wallet::provider::OfflineSigner;

/// Signs requests but never sends them anywhere.
///
/// Every request is accepted with code 0 and a hash derived from the signed
/// document, so the same request always yields the same hash.
#[derive(Debug, Default)]
pub struct DryRunBroadcaster;

impl DryRunBroadcaster {
    pub fn new() -> Self {
        info!("Dry run enabled: transactions are signed but not broadcast");
        Self::default()
    }
}

#[async_trait]
impl Broadcaster for DryRunBroadcaster {
    async fn broadcast(
        &self,
        chain_id: &str,
        request: &RequestDescriptor,
        signer: &dyn OfflineSigner,
    ) -> Result<TxResponse> {
        let doc = SignDoc::new(chain_id, request).to_bytes()?;
        signer.sign(&request.sender, &doc).await?;

        let tx_hash: String = keccak256(&doc).iter().map(|b| format!("{:02X}", b)).collect();

        info!(
            "[DRY RUN] {} from {} with funds [{}] -> {}",
            request.msg.kind(),
            request.sender,
            request
                .funds
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            tx_hash
        );

        Ok(TxResponse {
            code: 0,
            tx_hash,
            raw_log: None,
        })
    }
}
