use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Boundary, ClientError, Result};
use crate::wallet::bech32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub address: String,
    pub algo: String,
}

/// Signing capability handed out by a wallet for one chain.
#[async_trait]
pub trait OfflineSigner: Send + Sync {
    async fn get_accounts(&self) -> Result<Vec<AccountData>>;

    async fn sign(&self, signer_address: &str, payload: &[u8]) -> Result<Vec<u8>>;
}

/// External wallet that can authorise this client on a chain.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn enable(&self, chain_id: &str) -> Result<()>;

    fn offline_signer(&self, chain_id: &str) -> Result<Arc<dyn OfflineSigner>>;
}

/// Wallet backed by a locally held secp256k1 key.
///
/// The account address is the bech32 encoding of the key's 20-byte address,
/// which is how Injective derives account addresses from Ethereum-style keys.
pub struct LocalKeyProvider {
    wallet: LocalWallet,
    chain_id: String,
    address: String,
}

impl LocalKeyProvider {
    pub fn from_private_key(key: &str, chain_id: &str, prefix: &str) -> Result<Self> {
        let wallet: LocalWallet = key
            .trim()
            .parse()
            .map_err(|_| ClientError::MisconfiguredClient("WALLET_PRIVATE_KEY"))?;
        let address = bech32::encode(prefix, wallet.address().as_bytes());

        Ok(Self {
            wallet,
            chain_id: chain_id.to_string(),
            address,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn check_chain(&self, chain_id: &str) -> Result<()> {
        if chain_id != self.chain_id {
            return Err(ClientError::network(
                Boundary::Wallet,
                format!("wallet is not set up for chain {}", chain_id),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for LocalKeyProvider {
    async fn enable(&self, chain_id: &str) -> Result<()> {
        self.check_chain(chain_id)?;
        debug!("Local key enabled for {}", chain_id);
        Ok(())
    }

    fn offline_signer(&self, chain_id: &str) -> Result<Arc<dyn OfflineSigner>> {
        self.check_chain(chain_id)?;
        Ok(Arc::new(LocalKeySigner {
            wallet: self.wallet.clone(),
            address: self.address.clone(),
        }))
    }
}

struct LocalKeySigner {
    wallet: LocalWallet,
    address: String,
}

#[async_trait]
impl OfflineSigner for LocalKeySigner {
    async fn get_accounts(&self) -> Result<Vec<AccountData>> {
        Ok(vec![AccountData {
            address: self.address.clone(),
            algo: "eth_secp256k1".to_string(),
        }])
    }

    async fn sign(&self, signer_address: &str, payload: &[u8]) -> Result<Vec<u8>> {
        if signer_address != self.address {
            return Err(ClientError::network(
                Boundary::Wallet,
                format!("no key for {}", signer_address),
            ));
        }

        let signature = self
            .wallet
            .sign_message(payload)
            .await
            .map_err(|e| ClientError::network(Boundary::Wallet, e))?;

        Ok(signature.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first Hardhat account).
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "inj17w0adeg64ky0daxwd2ugyuneellmjgnxf5vkec";

    #[tokio::test]
    async fn test_local_key_account() {
        let provider = LocalKeyProvider::from_private_key(DEV_KEY, "injective-888", "inj").unwrap();
        assert_eq!(provider.address(), DEV_ADDRESS);

        provider.enable("injective-888").await.unwrap();
        let signer = provider.offline_signer("injective-888").unwrap();
        let accounts = signer.get_accounts().await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].address, DEV_ADDRESS);
    }

    #[tokio::test]
    async fn test_wrong_chain_is_refused() {
        let provider = LocalKeyProvider::from_private_key(DEV_KEY, "injective-888", "inj").unwrap();

        assert!(matches!(
            provider.enable("injective-1").await,
            Err(ClientError::NetworkFailure { boundary: Boundary::Wallet, .. })
        ));
        assert!(provider.offline_signer("injective-1").is_err());
    }

    #[tokio::test]
    async fn test_sign_is_deterministic() {
        let provider = LocalKeyProvider::from_private_key(DEV_KEY, "injective-888", "inj").unwrap();
        let signer = provider.offline_signer("injective-888").unwrap();

        let first = signer.sign(DEV_ADDRESS, b"payload").await.unwrap();
        let second = signer.sign(DEV_ADDRESS, b"payload").await.unwrap();

        assert_eq!(first.len(), 65);
        assert_eq!(first, second);
        assert!(signer.sign("inj1someoneelse", b"payload").await.is_err());
    }

    #[test]
    fn test_bad_key_is_misconfiguration() {
        assert!(matches!(
            LocalKeyProvider::from_private_key("not-a-key", "injective-888", "inj"),
            Err(ClientError::MisconfiguredClient("WALLET_PRIVATE_KEY"))
        ));
    }
}
