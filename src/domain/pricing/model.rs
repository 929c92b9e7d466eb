//! Dual-source tariff arithmetic
//!
//! Delivered energy is billed half at the grid (PEA) rate and half at the
//! solar rate. Each component is rounded to satang before summing, so the
//! total always equals the sum of the recorded parts.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Pea,
    Solar,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pea => "pea",
            Self::Solar => "solar",
        }
    }
}

/// Prices per kWh snapshotted at settlement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tariff {
    pub pea_per_kwh: Decimal,
    pub solar_per_kwh: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostBreakdown {
    pub solar_cost: Decimal,
    pub pea_cost: Decimal,
    pub total_cost: Decimal,
}

impl CostBreakdown {
    pub fn calculate(energy_kwh: Decimal, tariff: &Tariff) -> Self {
        let share = energy_kwh / Decimal::TWO;
        let solar_cost = round_money(share * tariff.solar_per_kwh);
        let pea_cost = round_money(share * tariff.pea_per_kwh);
        Self {
            solar_cost,
            pea_cost,
            total_cost: solar_cost + pea_cost,
        }
    }
}

pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Money is persisted as integer satang.
pub fn to_minor_units(amount: Decimal) -> i64 {
    (round_money(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(i64::MAX)
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Meter registers report Wh; transactions record kWh.
pub fn wh_to_kwh(wh: i64) -> Decimal {
    Decimal::new(wh, 3)
}

/// Energy columns are double precision. Meter readings never carry more than
/// Wh resolution, so rounding to three places recovers the exact value.
pub fn kwh_from_f64(kwh: f64) -> Decimal {
    Decimal::from_f64(kwh).unwrap_or_default().round_dp(3)
}

pub fn kwh_to_f64(kwh: Decimal) -> f64 {
    kwh.to_f64().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_tariff() -> Tariff {
        Tariff {
            pea_per_kwh: Decimal::new(450, 2),
            solar_per_kwh: Decimal::new(380, 2),
        }
    }

    #[test]
    fn splits_ten_kwh_at_default_prices() {
        let cost = CostBreakdown::calculate(Decimal::from(10), &default_tariff());
        assert_eq!(cost.solar_cost, Decimal::new(1900, 2));
        assert_eq!(cost.pea_cost, Decimal::new(2250, 2));
        assert_eq!(cost.total_cost, Decimal::new(4150, 2));
    }

    #[test]
    fn components_are_rounded_before_summing() {
        // 0.333 kWh: solar 0.63270 -> 0.63, pea 0.74925 -> 0.75
        let cost = CostBreakdown::calculate(Decimal::new(333, 3), &default_tariff());
        assert_eq!(cost.solar_cost, Decimal::new(63, 2));
        assert_eq!(cost.pea_cost, Decimal::new(75, 2));
        assert_eq!(cost.total_cost, Decimal::new(138, 2));
    }

    #[test]
    fn zero_energy_costs_nothing() {
        let cost = CostBreakdown::calculate(Decimal::ZERO, &default_tariff());
        assert_eq!(cost.total_cost, Decimal::ZERO);
    }

    #[test]
    fn converts_units() {
        assert_eq!(wh_to_kwh(12_345), Decimal::new(12_345, 3));
        assert_eq!(kwh_from_f64(12.345), Decimal::new(12_345, 3));
        assert_eq!(kwh_from_f64(0.1 + 0.2), Decimal::new(300, 3));
        assert_eq!(to_minor_units(Decimal::new(4150, 2)), 4150);
        assert_eq!(from_minor_units(4150), Decimal::new(4150, 2));
    }
}
