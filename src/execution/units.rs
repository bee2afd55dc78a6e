use ethers::types::U256;
use regex::Regex;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{ClientError, Result};

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern compiles"));

/// Largest power of ten a `U256` holds.
const MAX_POW10: u32 = 77;

fn pow10(exp: u32) -> Option<U256> {
    if exp > MAX_POW10 {
        return None;
    }
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Non-negative decimal kept exactly as `mantissa / 10^scale`.
///
/// Always stored with trailing fractional zeros stripped, so derived
/// equality is numeric equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UDecimal {
    mantissa: U256,
    scale: u32,
}

impl UDecimal {
    pub const ZERO: UDecimal = UDecimal {
        mantissa: U256([0; 4]),
        scale: 0,
    };

    pub fn one() -> Self {
        Self::new(U256::one(), 0)
    }

    pub fn new(mantissa: U256, scale: u32) -> Self {
        let (mut mantissa, mut scale) = (mantissa, scale);
        let ten = U256::from(10u8);
        while scale > 0 && !mantissa.is_zero() && (mantissa % ten).is_zero() {
            mantissa = mantissa / ten;
            scale -= 1;
        }
        if mantissa.is_zero() {
            scale = 0;
        }
        Self { mantissa, scale }
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Number of fractional digits.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn checked_mul(self, other: Self) -> Option<Self> {
        let mantissa = self.mantissa.checked_mul(other.mantissa)?;
        let scale = self.scale.checked_add(other.scale)?;
        Some(Self::new(mantissa, scale))
    }

    /// `None` when `other > self` or the aligned values do not fit.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let a = self.mantissa.checked_mul(pow10(scale - self.scale)?)?;
        let b = other.mantissa.checked_mul(pow10(scale - other.scale)?)?;
        Some(Self::new(a.checked_sub(b)?, scale))
    }

    /// Round to `dp` fractional digits, half away from zero.
    pub fn round_dp(self, dp: u32) -> Self {
        if self.scale <= dp {
            return self;
        }
        // a divisor above U256::MAX is more than twice any mantissa
        let Some(divisor) = pow10(self.scale - dp) else {
            return Self::ZERO;
        };
        let quotient = self.mantissa / divisor;
        let remainder = self.mantissa % divisor;
        let rounded = if remainder >= divisor - remainder {
            quotient + U256::one()
        } else {
            quotient
        };
        Self::new(rounded, dp)
    }

    /// Exact integer count of minor units. Fails with `InvalidStake` when the
    /// amount is finer than the minor unit or does not fit a `u128`.
    pub fn to_minor_units(self, decimals: u32) -> Result<u128> {
        if self.scale > decimals {
            return Err(ClientError::InvalidStake(format!(
                "{} has more than {} decimal places",
                self, decimals
            )));
        }

        let out_of_range =
            || ClientError::InvalidStake(format!("{} exceeds the ledger's amount range", self));
        let value = pow10(decimals - self.scale)
            .and_then(|factor| self.mantissa.checked_mul(factor))
            .ok_or_else(out_of_range)?;
        if value > U256::from(u128::MAX) {
            return Err(out_of_range());
        }
        Ok(value.as_u128())
    }

    /// Inverse of [`UDecimal::to_minor_units`], for display.
    pub fn from_minor_units(amount: u128, decimals: u32) -> Self {
        Self::new(U256::from(amount), decimals)
    }
}

impl Ord for UDecimal {
    fn cmp(&self, other: &Self) -> Ordering {
        let scale = self.scale.max(other.scale);
        let align = |d: &Self| pow10(scale - d.scale).and_then(|f| d.mantissa.checked_mul(f));
        match (align(self), align(other)) {
            (Some(a), Some(b)) => a.cmp(&b),
            // whichever side overflows is the larger one
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (None, None) => Ordering::Equal,
        }
    }
}

impl PartialOrd for UDecimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parses plain non-negative decimals such as `100`, `2.5`, `.25` or `10.`.
impl FromStr for UDecimal {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if !DECIMAL_RE.is_match(trimmed) {
            return Err(format!("'{}' is not a non-negative decimal number", raw));
        }

        let (int, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        let digits = format!("{}{}", int, frac);
        let scale = u32::try_from(frac.len())
            .map_err(|_| format!("'{}' has too many decimal places", raw))?;
        let mantissa = U256::from_dec_str(&digits)
            .map_err(|_| format!("'{}' is out of the supported range", raw))?;

        Ok(Self::new(mantissa, scale))
    }
}

impl fmt::Display for UDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", int, frac)
    }
}

impl Serialize for UDecimal {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UDecimal {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}
