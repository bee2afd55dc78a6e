use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::data::types::{ContractConfig, Event, EventStatus, MatchedBet, Order, OrderType, Outcome};
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    GetConfig {},
    GetEvent {
        event_id: u64,
    },
    ListEvents {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_after: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter_status: Option<EventStatus>,
    },
    GetOrder {
        order_id: u64,
    },
    ListOrdersByEvent {
        event_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_after: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter_order_type: Option<OrderType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter_outcome: Option<Outcome>,
    },
    ListMatchedBetsByEvent {
        event_id: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_after: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    },
}

impl QueryMsg {
    pub fn list_events(start_after: Option<u64>, limit: Option<u32>) -> Self {
        QueryMsg::ListEvents {
            start_after,
            limit,
            filter_status: None,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ClientError::DecodeError(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventsResponse {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventResponse {
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersResponse {
    #[serde(default)]
    pub orders: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedBetsResponse {
    #[serde(default)]
    pub matched_bets: Vec<MatchedBet>,
}

/// Sends an encoded query to the contract and returns the encoded result.
#[async_trait]
pub trait ContractQuerier: Send + Sync {
    async fn query_raw(&self, query: &[u8]) -> Result<Vec<u8>>;
}

fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ClientError::DecodeError(format!("response is not UTF-8: {}", e)))?;
    serde_json::from_str(text).map_err(|e| ClientError::DecodeError(e.to_string()))
}

/// Decode a `list_events` result. Zero events is an empty list, not an error.
pub fn parse_events_response(raw: &[u8]) -> Result<Vec<Event>> {
    decode::<EventsResponse>(raw).map(|r| r.events)
}

pub fn parse_event_response(raw: &[u8]) -> Result<Event> {
    decode::<EventResponse>(raw).map(|r| r.event)
}

pub fn parse_orders_response(raw: &[u8]) -> Result<Vec<Order>> {
    decode::<OrdersResponse>(raw).map(|r| r.orders)
}

pub fn parse_order_response(raw: &[u8]) -> Result<Order> {
    decode::<OrderResponse>(raw).map(|r| r.order)
}

pub fn parse_matched_bets_response(raw: &[u8]) -> Result<Vec<MatchedBet>> {
    decode::<MatchedBetsResponse>(raw).map(|r| r.matched_bets)
}

pub fn parse_config_response(raw: &[u8]) -> Result<ContractConfig> {
    decode(raw)
}
