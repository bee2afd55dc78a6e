use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Yes,
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Betting that the outcome happens.
    Back,
    /// Betting against the outcome, covering the backer's winnings.
    Lay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    Open,
    Resolved,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
}

/// An on-ledger amount in the settlement currency's minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "uint128")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub creator: String,
    pub description: String,
    pub oracle: String,
    pub status: EventStatus,
    pub winning_outcome: Option<Outcome>,
    /// Unix seconds.
    #[serde(default, with = "ledger_time_opt")]
    pub resolution_deadline: Option<u64>,
    /// Unix seconds.
    #[serde(with = "ledger_time")]
    pub creation_time: u64,
}

impl Event {
    pub fn is_open(&self) -> bool {
        self.status == EventStatus::Open
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub event_id: u64,
    pub owner: String,
    pub order_type: OrderType,
    pub outcome: Outcome,
    /// For a lay order this is the backer stake the layer offers to match.
    pub initial_backer_stake: Coin,
    pub remaining_backer_stake: Coin,
    pub odds: Decimal,
    #[serde(with = "ledger_time")]
    pub creation_time: u64,
    pub status: OrderStatus,
}

impl Order {
    pub fn is_matchable(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

/// A back order paired with a lay order by the exchange. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedBet {
    pub id: u64,
    pub event_id: u64,
    pub backer_addr: String,
    pub lay_addr: String,
    pub backer_stake: Coin,
    pub layer_liability: Coin,
    pub outcome_backed: Outcome,
    pub odds: Decimal,
    #[serde(with = "ledger_time")]
    pub creation_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractConfig {
    pub admin: String,
    pub betting_denom: String,
    pub next_event_id: u64,
    pub next_order_id: u64,
    pub next_bet_id: u64,
}

macro_rules! display_as_debug {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        })*
    };
}

display_as_debug!(Outcome, OrderType, EventStatus, OrderStatus);

impl FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back" => Ok(OrderType::Back),
            "lay" => Ok(OrderType::Lay),
            other => Err(format!("unknown order type '{}', expected back or lay", other)),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Outcome::Yes),
            "no" => Ok(Outcome::No),
            other => Err(format!("unknown outcome '{}', expected yes or no", other)),
        }
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(EventStatus::Open),
            "resolved" => Ok(EventStatus::Resolved),
            "cancelled" => Ok(EventStatus::Cancelled),
            other => Err(format!("unknown event status '{}'", other)),
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Unsigned 128-bit integers travel as decimal strings.
pub(crate) mod uint128 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(|e| D::Error::custom(format!("invalid uint128 '{}': {}", raw, e)))
    }
}

/// Ledger timestamps are nanosecond strings; the model keeps whole seconds.
pub(crate) mod ledger_time {
    use super::NANOS_PER_SEC;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secs: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&(u128::from(*secs) * NANOS_PER_SEC))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(d)?;
        let nanos: u128 = raw
            .parse()
            .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", raw, e)))?;
        u64::try_from(nanos / NANOS_PER_SEC).map_err(D::Error::custom)
    }
}

pub(crate) mod ledger_time_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secs: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match secs {
            Some(secs) => super::ledger_time::serialize(secs, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::ledger_time")] u64);

        Ok(Option::<Wrapper>::deserialize(d)?.map(|Wrapper(secs)| secs))
    }
}
