use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ClientError, Result};
use crate::wallet::provider::{OfflineSigner, WalletProvider};

/// Immutable view of the wallet connection handed to callers.
#[derive(Clone)]
pub struct Session {
    pub address: Option<String>,
    pub signer: Option<Arc<dyn OfflineSigner>>,
    pub connected: bool,
    pub chain_id: String,
}

impl Session {
    pub fn empty(chain_id: impl Into<String>) -> Self {
        Self {
            address: None,
            signer: None,
            connected: false,
            chain_id: chain_id.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.connected && self.address.is_none() && self.signer.is_none()
    }

    /// Sender address and signing capability, or `NotConnected`.
    pub fn authorization(&self) -> Result<(&str, &Arc<dyn OfflineSigner>)> {
        match (self.connected, self.address.as_deref(), self.signer.as_ref()) {
            (true, Some(address), Some(signer)) => Ok((address, signer)),
            _ => Err(ClientError::NotConnected),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("signer", &self.signer.as_ref().map(|_| "<signer>"))
            .field("connected", &self.connected)
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        let same_signer = match (&self.signer, &other.signer) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_signer
            && self.address == other.address
            && self.connected == other.connected
            && self.chain_id == other.chain_id
    }
}

/// Starts empty; only an explicit `connect()` fills it and `disconnect()`
/// empties it. Nothing is persisted.
pub struct SessionManager {
    provider: Option<Arc<dyn WalletProvider>>,
    chain_id: String,
    session: Session,
}

impl SessionManager {
    /// `provider` is `None` when no wallet is installed/configured.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, chain_id: impl Into<String>) -> Self {
        let chain_id = chain_id.into();
        Self {
            provider,
            session: Session::empty(chain_id.clone()),
            chain_id,
        }
    }

    /// Enable the configured chain in the wallet and take its first account.
    ///
    /// On any failure the session is left empty. Never retries.
    pub async fn connect(&mut self) -> Result<Session> {
        self.session = Session::empty(self.chain_id.clone());

        if self.chain_id.trim().is_empty() {
            return Err(ClientError::MisconfiguredClient("network.chain_id"));
        }
        let provider = self.provider.clone().ok_or(ClientError::WalletUnavailable)?;

        provider.enable(&self.chain_id).await.inspect_err(|e| {
            warn!("Wallet refused to enable {}: {}", self.chain_id, e);
        })?;
        let signer = provider.offline_signer(&self.chain_id)?;
        let accounts = signer.get_accounts().await?;
        let account = accounts.into_iter().next().ok_or(ClientError::NoAccounts)?;

        info!("Wallet connected: {} on {}", account.address, self.chain_id);
        self.session = Session {
            address: Some(account.address),
            signer: Some(signer),
            connected: true,
            chain_id: self.chain_id.clone(),
        };
        Ok(self.snapshot())
    }

    /// Clear the session. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if self.session.connected {
            info!("Wallet disconnected");
        }
        self.session = Session::empty(self.chain_id.clone());
    }

    pub fn snapshot(&self) -> Session {
        self.session.clone()
    }
}
