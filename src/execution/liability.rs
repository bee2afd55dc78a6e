use tracing::debug;

use crate::data::types::OrderType;
use crate::error::{ClientError, Result};
use crate::execution::units::UDecimal;

/// Stake is always the backer's stake. Back risks the stake, lay risks
/// `(odds - 1) * stake`, rounded half away from zero to this many places.
pub const LIABILITY_DECIMALS: u32 = 6;

pub fn parse_stake(raw: &str) -> Result<UDecimal> {
    let stake: UDecimal = raw.parse().map_err(ClientError::InvalidStake)?;
    if stake.is_zero() {
        return Err(ClientError::InvalidStake("stake must be greater than zero".to_string()));
    }
    Ok(stake)
}

pub fn parse_odds(raw: &str) -> Result<UDecimal> {
    let odds: UDecimal = raw.parse().map_err(ClientError::InvalidOdds)?;
    if odds <= UDecimal::one() {
        return Err(ClientError::InvalidOdds("odds must be greater than 1".to_string()));
    }
    Ok(odds)
}

fn out_of_range(what: &str) -> ClientError {
    ClientError::InvalidStake(format!("{} exceeds the supported range", what))
}

/// `(odds - 1) * stake`, exact.
fn backer_winnings(stake: UDecimal, odds: UDecimal) -> Result<UDecimal> {
    odds.checked_sub(UDecimal::one())
        .ok_or_else(|| ClientError::InvalidOdds("odds must be greater than 1".to_string()))?
        .checked_mul(stake)
        .ok_or_else(|| out_of_range("liability"))
}

/// Funds that must accompany an order, in major units.
///
/// Odds are validated before stake.
pub fn funds_required(order_type: OrderType, stake: &str, odds: &str) -> Result<UDecimal> {
    let odds = parse_odds(odds)?;
    let stake = parse_stake(stake)?;
    liability(order_type, stake, odds)
}

/// Typed form of [`funds_required`] for already parsed values.
pub fn liability(order_type: OrderType, stake: UDecimal, odds: UDecimal) -> Result<UDecimal> {
    if odds <= UDecimal::one() {
        return Err(ClientError::InvalidOdds("odds must be greater than 1".to_string()));
    }
    if stake.is_zero() {
        return Err(ClientError::InvalidStake("stake must be greater than zero".to_string()));
    }

    let funds = match order_type {
        OrderType::Back => stake,
        OrderType::Lay => {
            let rounded = backer_winnings(stake, odds)?.round_dp(LIABILITY_DECIMALS);
            if rounded.is_zero() {
                return Err(ClientError::InvalidStake(format!(
                    "liability rounds to zero at {} decimal places",
                    LIABILITY_DECIMALS
                )));
            }
            rounded
        }
    };

    debug!("{} {} @ {} requires {}", order_type, stake, odds, funds);
    Ok(funds)
}

/// Everything a bet preview shows, derived from the same calculation that
/// funds the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiabilityQuote {
    pub order_type: OrderType,
    pub stake: UDecimal,
    pub odds: UDecimal,
    pub funds_required: UDecimal,
    /// Returned to the backer if the backed outcome wins (stake included).
    pub backer_payout: UDecimal,
    /// Paid by the layer to the backer if the backed outcome wins.
    pub backer_profit: UDecimal,
}

pub fn quote(order_type: OrderType, stake: &str, odds: &str) -> Result<LiabilityQuote> {
    let odds_value = parse_odds(odds)?;
    let stake_value = parse_stake(stake)?;
    let funds_required = liability(order_type, stake_value, odds_value)?;

    let backer_payout = stake_value
        .checked_mul(odds_value)
        .ok_or_else(|| out_of_range("payout"))?
        .round_dp(LIABILITY_DECIMALS);
    let backer_profit = backer_winnings(stake_value, odds_value)?.round_dp(LIABILITY_DECIMALS);

    Ok(LiabilityQuote {
        order_type,
        stake: stake_value,
        odds: odds_value,
        funds_required,
        backer_payout,
        backer_profit,
    })
}
