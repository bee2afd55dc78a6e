use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ClientError;
use crate::execution::types::{RequestDescriptor, TxResponse};

const HEADER: &str = "timestamp,kind,sender,funds,tx_hash,code,status";

/// Append-only CSV record of every broadcast attempt.
pub struct TxLogger {
    log_path: PathBuf,
}

impl TxLogger {
    pub fn new(log_path: impl AsRef<Path>) -> Result<Self> {
        let log_path = log_path.as_ref().to_path_buf();

        if !log_path.exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)
                .with_context(|| format!("creating {}", log_path.display()))?;
            writeln!(file, "{}", HEADER)?;
        }

        Ok(Self { log_path })
    }

    pub fn log_attempt(
        &self,
        request: &RequestDescriptor,
        outcome: &Result<TxResponse, ClientError>,
    ) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("opening {}", self.log_path.display()))?;

        let funds = request
            .funds
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(";");

        let (tx_hash, code, status) = match outcome {
            Ok(tx) if tx.is_success() => (tx.tx_hash.as_str(), tx.code.to_string(), "accepted"),
            Ok(tx) => (tx.tx_hash.as_str(), tx.code.to_string(), "rejected"),
            Err(e) if e.may_have_submitted() => ("", String::new(), "unknown"),
            Err(_) => ("", String::new(), "failed"),
        };

        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            Utc::now().to_rfc3339(),
            request.msg.kind(),
            request.sender,
            funds,
            tx_hash,
            code,
            status
        )?;

        Ok(())
    }
}
