use serde::{Deserialize, Serialize};

use crate::data::types::{ledger_time_opt, uint128, Coin, OrderType, Outcome};
use crate::execution::units::UDecimal;

/// Execute message understood by the exchange contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    CreateEvent {
        description: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        oracle_addr: Option<String>,
        /// Unix seconds.
        #[serde(default, with = "ledger_time_opt", skip_serializing_if = "Option::is_none")]
        resolution_deadline: Option<u64>,
    },
    PlaceOrder {
        event_id: u64,
        order_type: OrderType,
        outcome: Outcome,
        /// Backer stake in minor units.
        #[serde(with = "uint128")]
        stake: u128,
        odds: UDecimal,
    },
}

impl ExecuteMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecuteMsg::CreateEvent { .. } => "create_event",
            ExecuteMsg::PlaceOrder { .. } => "place_order",
        }
    }
}

/// A chain-ready request. Building one has no side effect; it only reaches
/// the ledger when handed to a broadcaster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub contract: String,
    pub sender: String,
    pub msg: ExecuteMsg,
    #[serde(default)]
    pub funds: Vec<Coin>,
}

/// Broadcast result. A non-zero `code` is a chain-level rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    pub code: u32,
    #[serde(rename = "txhash")]
    pub tx_hash: String,
    #[serde(default)]
    pub raw_log: Option<String>,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
