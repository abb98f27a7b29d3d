//! Trading fee models.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use simlab_core::types::Liquidity;

use crate::error::ExecutionError;

/// One row of a volume tier schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeTier {
    /// Minimum 30-day traded volume for this tier
    pub min_volume: Decimal,
    pub maker_rate: Decimal,
    pub taker_rate: Decimal,
}

impl FeeTier {
    pub fn new(min_volume: Decimal, maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            min_volume,
            maker_rate,
            taker_rate,
        }
    }
}

/// Fee calculation method. Fees are a rate applied to the fill notional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeModel {
    /// Flat maker/taker rates
    Fixed {
        maker_rate: Decimal,
        taker_rate: Decimal,
    },
    /// Rates picked from a schedule by the account's 30-day volume
    Tiered {
        tiers: Vec<FeeTier>,
        volume_30d: Decimal,
    },
}

impl Default for FeeModel {
    fn default() -> Self {
        FeeModel::Fixed {
            maker_rate: dec!(0.0002),
            taker_rate: dec!(0.0005),
        }
    }
}

impl FeeModel {
    /// No fees at all.
    pub fn zero() -> Self {
        FeeModel::Fixed {
            maker_rate: Decimal::ZERO,
            taker_rate: Decimal::ZERO,
        }
    }

    /// Exchange VIP schedule keyed by 30-day volume.
    pub fn vip(volume_30d: Decimal) -> Self {
        FeeModel::Tiered {
            tiers: vec![
                FeeTier::new(dec!(0), dec!(0.0005), dec!(0.0010)),
                FeeTier::new(dec!(1000000), dec!(0.0004), dec!(0.0008)),
                FeeTier::new(dec!(10000000), dec!(0.0003), dec!(0.0006)),
                FeeTier::new(dec!(50000000), dec!(0.0002), dec!(0.0004)),
                FeeTier::new(dec!(100000000), dec!(0.0001), dec!(0.0002)),
            ],
            volume_30d,
        }
    }

    /// Fee for a fill of `notional`.
    pub fn fee(&self, notional: Decimal, liquidity: Liquidity) -> Decimal {
        notional.abs() * self.rate(liquidity)
    }

    /// Rate applied for the given liquidity flag.
    pub fn rate(&self, liquidity: Liquidity) -> Decimal {
        let (maker, taker) = match self {
            FeeModel::Fixed {
                maker_rate,
                taker_rate,
            } => (*maker_rate, *taker_rate),
            FeeModel::Tiered { tiers, volume_30d } => {
                // Highest tier whose threshold the volume reaches
                match tiers.iter().rev().find(|t| *volume_30d >= t.min_volume) {
                    Some(tier) => (tier.maker_rate, tier.taker_rate),
                    None => tiers
                        .first()
                        .map(|t| (t.maker_rate, t.taker_rate))
                        .unwrap_or_default(),
                }
            }
        };

        match liquidity {
            Liquidity::Maker => maker,
            Liquidity::Taker => taker,
        }
    }

    /// Check rates are non-negative and tiers ascend by volume.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        let check_rate = |rate: Decimal| {
            if rate < Decimal::ZERO {
                Err(ExecutionError::InvalidFeeModel(format!(
                    "fee rate cannot be negative: {}",
                    rate
                )))
            } else {
                Ok(())
            }
        };

        match self {
            FeeModel::Fixed {
                maker_rate,
                taker_rate,
            } => {
                check_rate(*maker_rate)?;
                check_rate(*taker_rate)
            }
            FeeModel::Tiered { tiers, .. } => {
                if tiers.is_empty() {
                    return Err(ExecutionError::InvalidFeeModel(
                        "tier schedule is empty".into(),
                    ));
                }
                for pair in tiers.windows(2) {
                    if pair[1].min_volume <= pair[0].min_volume {
                        return Err(ExecutionError::InvalidFeeModel(
                            "tiers must be sorted by ascending min_volume".into(),
                        ));
                    }
                }
                for tier in tiers {
                    check_rate(tier.maker_rate)?;
                    check_rate(tier.taker_rate)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_fee() {
        let model = FeeModel::default();

        assert_eq!(model.fee(dec!(1000), Liquidity::Taker), dec!(0.5));
        assert_eq!(model.fee(dec!(1000), Liquidity::Maker), dec!(0.2));
        // Sign of the notional does not matter
        assert_eq!(model.fee(dec!(-1000), Liquidity::Taker), dec!(0.5));
    }

    #[test]
    fn test_vip_tiers() {
        assert_eq!(FeeModel::vip(dec!(0)).rate(Liquidity::Taker), dec!(0.0010));
        assert_eq!(FeeModel::vip(dec!(999999)).rate(Liquidity::Maker), dec!(0.0005));
        assert_eq!(FeeModel::vip(dec!(1000000)).rate(Liquidity::Maker), dec!(0.0004));
        assert_eq!(FeeModel::vip(dec!(75000000)).rate(Liquidity::Taker), dec!(0.0004));
        assert_eq!(FeeModel::vip(dec!(500000000)).rate(Liquidity::Taker), dec!(0.0002));
    }

    #[test]
    fn test_fee_is_deterministic() {
        let model = FeeModel::vip(dec!(12000000));
        let a = model.fee(dec!(2500), Liquidity::Taker);
        let b = model.fee(dec!(2500), Liquidity::Taker);
        assert_eq!(a, b);
        assert_eq!(a, dec!(1.5));
    }

    #[test]
    fn test_validate() {
        assert!(FeeModel::default().validate().is_ok());
        assert!(FeeModel::vip(dec!(0)).validate().is_ok());

        let negative = FeeModel::Fixed {
            maker_rate: dec!(-0.0001),
            taker_rate: dec!(0.0005),
        };
        assert!(negative.validate().is_err());

        let unsorted = FeeModel::Tiered {
            tiers: vec![
                FeeTier::new(dec!(100), dec!(0.001), dec!(0.001)),
                FeeTier::new(dec!(0), dec!(0.002), dec!(0.002)),
            ],
            volume_30d: dec!(0),
        };
        assert!(unsorted.validate().is_err());
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::json!({
            "type": "fixed",
            "maker_rate": "0.0001",
            "taker_rate": "0.0003"
        });
        let model: FeeModel = serde_json::from_value(json).unwrap();
        assert_eq!(model.rate(Liquidity::Taker), dec!(0.0003));
    }
}
