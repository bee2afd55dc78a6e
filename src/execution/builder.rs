use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::data::types::{Coin, OrderType, Outcome};
use crate::error::{ClientError, Result};
use crate::execution::liability::{liability, parse_odds, parse_stake};
use crate::execution::types::{ExecuteMsg, RequestDescriptor};
use crate::wallet::session::Session;

/// The ledger's decimal is a `u128` count of 10^-18 units.
const LEDGER_DECIMAL_PLACES: u32 = 18;

/// Deadlines travel as nanoseconds in a `u64`.
const MAX_DEADLINE_SECS: u64 = u64::MAX / 1_000_000_000;

const NAIVE_DEADLINE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Convert a human date/time into whole unix seconds (floored).
///
/// Accepts RFC 3339, naive date-times (read as UTC), a bare date (midnight
/// UTC) or an integer number of seconds.
pub fn parse_deadline(raw: &str) -> Result<u64> {
    let s = raw.trim();
    let invalid = || ClientError::InvalidDeadline(format!("cannot read '{}' as a date/time", raw));

    let out_of_range = || {
        ClientError::InvalidDeadline(format!("'{}' is past the latest representable deadline", raw))
    };

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        let secs: u64 = s.parse().map_err(|_| out_of_range())?;
        if secs > MAX_DEADLINE_SECS {
            return Err(out_of_range());
        }
        return Ok(secs);
    }

    let when: DateTime<Utc> = if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.with_timezone(&Utc)
    } else if let Some(naive) = NAIVE_DEADLINE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
    {
        naive.and_utc()
    } else {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(invalid)?
            .and_utc()
    };

    let secs = u64::try_from(when.timestamp())
        .map_err(|_| ClientError::InvalidDeadline(format!("'{}' is before 1970", raw)))?;
    if secs > MAX_DEADLINE_SECS {
        return Err(out_of_range());
    }
    Ok(secs)
}

pub struct RequestBuilder {
    config: Arc<Config>,
}

impl RequestBuilder {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn build_create_event_request(
        &self,
        session: &Session,
        description: &str,
        oracle_addr: Option<&str>,
        resolution_deadline: Option<&str>,
    ) -> Result<RequestDescriptor> {
        let (sender, _) = session.authorization()?;

        let description = description.trim();
        if description.is_empty() {
            return Err(ClientError::EmptyDescription);
        }

        let oracle_addr = oracle_addr
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_string);
        let resolution_deadline = resolution_deadline
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(parse_deadline)
            .transpose()?;

        let contract = self.config.contract_address()?;

        let request = RequestDescriptor {
            contract: contract.to_string(),
            sender: sender.to_string(),
            msg: ExecuteMsg::CreateEvent {
                description: description.to_string(),
                oracle_addr,
                resolution_deadline,
            },
            funds: Vec::new(),
        };
        debug!("Built create_event request for {}", request.sender);
        Ok(request)
    }

    pub fn build_place_order_request(
        &self,
        session: &Session,
        event_id: &str,
        order_type: OrderType,
        outcome: Outcome,
        stake: &str,
        odds: &str,
    ) -> Result<RequestDescriptor> {
        let (sender, _) = session.authorization()?;

        let event_id = event_id.trim();
        if event_id.is_empty() {
            return Err(ClientError::MissingEvent("no event selected".to_string()));
        }
        let event_id: u64 = event_id
            .parse()
            .map_err(|_| ClientError::MissingEvent(format!("'{}' is not an event id", event_id)))?;

        let odds = parse_odds(odds)?;
        odds.to_minor_units(LEDGER_DECIMAL_PLACES).map_err(|_| {
            ClientError::InvalidOdds(format!(
                "odds must fit the ledger's decimal ({} places)",
                LEDGER_DECIMAL_PLACES
            ))
        })?;
        let stake = parse_stake(stake)?;
        let funds_required = liability(order_type, stake, odds)?;

        let contract = self.config.contract_address()?;
        let denom = self.config.betting_denom()?;
        let decimals = self.config.minor_unit_decimals()?;

        let request = RequestDescriptor {
            contract: contract.to_string(),
            sender: sender.to_string(),
            msg: ExecuteMsg::PlaceOrder {
                event_id,
                order_type,
                outcome,
                stake: stake.to_minor_units(decimals)?,
                odds,
            },
            funds: vec![Coin::new(denom, funds_required.to_minor_units(decimals)?)],
        };
        debug!(
            "Built place_order request: {} {} on event {} funded with {}",
            order_type, outcome, event_id, funds_required
        );
        Ok(request)
    }
}
