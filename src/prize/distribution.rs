use crate::error::{AppError, AppResult};
use crate::models::FundingSource;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Participant-count bracket selecting the tier split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeBracket {
    /// Up to 50 participants: 3 tiers
    Small,
    /// 51 to 200 participants: 5 tiers
    Medium,
    /// More than 200 participants: 6 tiers
    Large,
}

impl PrizeBracket {
    pub const SMALL_MAX: u64 = 50;
    pub const MEDIUM_MAX: u64 = 200;

    pub fn for_participants(participants: u64) -> Self {
        if participants <= Self::SMALL_MAX {
            PrizeBracket::Small
        } else if participants <= Self::MEDIUM_MAX {
            PrizeBracket::Medium
        } else {
            PrizeBracket::Large
        }
    }

    /// Share of the pool per rank, first place first. Always sums to 1.
    pub fn weights(&self) -> Vec<Decimal> {
        let percents: &[i64] = match self {
            PrizeBracket::Small => &[60, 25, 15],
            PrizeBracket::Medium => &[50, 25, 15, 6, 4],
            PrizeBracket::Large => &[40, 20, 15, 8, 8, 8],
        };
        percents.iter().map(|p| Decimal::new(*p, 2)).collect()
    }

    pub fn tier_count(&self) -> usize {
        match self {
            PrizeBracket::Small => 3,
            PrizeBracket::Medium => 5,
            PrizeBracket::Large => 6,
        }
    }
}

/// One ranked payout slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeTier {
    /// 1-based rank
    pub rank: u32,
    /// Fraction of the pool, e.g. 0.25
    pub share: Decimal,
    pub amount: Decimal,
}

impl PrizeTier {
    pub fn amount_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(0.0)
    }
}

/// Total pool and its split over ranked tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub participants: u64,
    pub per_entry: Decimal,
    pub total_pool: Decimal,
    pub bracket: PrizeBracket,
    pub tiers: Vec<PrizeTier>,
}

impl PrizeDistribution {
    pub fn tier(&self, rank: u32) -> Option<&PrizeTier> {
        self.tiers.iter().find(|t| t.rank == rank)
    }

    pub fn amounts(&self) -> Vec<Decimal> {
        self.tiers.iter().map(|t| t.amount).collect()
    }

    /// Sum of all tier amounts; equals `total_pool`
    pub fn distributed(&self) -> Decimal {
        self.tiers.iter().map(|t| t.amount).sum()
    }
}

/// Net contribution of one ticket to the prize pool.
///
/// Ad-funded lotteries credit `ad_value`; paid lotteries credit the entry
/// fee minus the platform fee.
pub fn per_entry_contribution(
    funding: FundingSource,
    entry_fee: Decimal,
    platform_fee: Decimal,
    ad_value: Decimal,
) -> AppResult<Decimal> {
    match funding {
        FundingSource::AdFunded => {
            if ad_value < Decimal::ZERO {
                return Err(AppError::InvalidArgument(format!(
                    "Ad value cannot be negative: {}",
                    ad_value
                )));
            }
            Ok(ad_value)
        }
        FundingSource::Paid => {
            if entry_fee < Decimal::ZERO || platform_fee < Decimal::ZERO {
                return Err(AppError::InvalidArgument(format!(
                    "Fees cannot be negative: entry {}, platform {}",
                    entry_fee, platform_fee
                )));
            }
            if platform_fee > entry_fee {
                return Err(AppError::InvalidArgument(format!(
                    "Platform fee {} exceeds entry fee {}",
                    platform_fee, entry_fee
                )));
            }
            Ok(entry_fee - platform_fee)
        }
    }
}

/// Split the pool formed by `participants` tickets worth `per_entry` each.
///
/// Total over its domain: zero participants yield a zero pool with the
/// three small-bracket tiers all at zero. A pool beyond `Decimal::MAX` is
/// clamped to `Decimal::MAX`; use [`try_compute_prize_distribution`] to
/// get an error instead.
pub fn compute_prize_distribution(participants: u64, per_entry: Decimal) -> PrizeDistribution {
    let total_pool = Decimal::from(participants).saturating_mul(per_entry);
    split_pool(participants, per_entry, total_pool)
}

/// Like [`compute_prize_distribution`], but an overflowing pool is
/// `InvalidArgument`.
pub fn try_compute_prize_distribution(
    participants: u64,
    per_entry: Decimal,
) -> AppResult<PrizeDistribution> {
    let total_pool = Decimal::from(participants)
        .checked_mul(per_entry)
        .ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "Prize pool overflows: {} entries at {}",
                participants, per_entry
            ))
        })?;
    Ok(split_pool(participants, per_entry, total_pool))
}

fn split_pool(participants: u64, per_entry: Decimal, total_pool: Decimal) -> PrizeDistribution {
    let bracket = PrizeBracket::for_participants(participants);

    let tiers = bracket
        .weights()
        .into_iter()
        .enumerate()
        .map(|(i, share)| PrizeTier {
            rank: i as u32 + 1,
            share,
            amount: total_pool * share,
        })
        .collect();

    PrizeDistribution {
        participants,
        per_entry,
        total_pool,
        bracket,
        tiers,
    }
}

/// Raw calculator inputs as they arrive from display code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeInputs {
    pub participants: u64,
    pub funding: FundingSource,
    pub entry_fee: Decimal,
    pub platform_fee: Decimal,
    pub ad_value: Decimal,
}

impl PrizeInputs {
    /// Validate floating-point inputs at the boundary
    pub fn from_f64(
        participants: i64,
        is_ad_funded: bool,
        entry_fee: f64,
        platform_fee: f64,
        ad_value: f64,
    ) -> AppResult<Self> {
        if participants < 0 {
            return Err(AppError::InvalidArgument(format!(
                "Participant count cannot be negative: {}",
                participants
            )));
        }

        let funding = if is_ad_funded {
            FundingSource::AdFunded
        } else {
            FundingSource::Paid
        };

        Ok(Self {
            participants: participants as u64,
            funding,
            entry_fee: money("entry_fee", entry_fee)?,
            platform_fee: money("platform_fee", platform_fee)?,
            ad_value: money("ad_value", ad_value)?,
        })
    }

    pub fn per_entry(&self) -> AppResult<Decimal> {
        per_entry_contribution(self.funding, self.entry_fee, self.platform_fee, self.ad_value)
    }

    pub fn compute(&self) -> AppResult<PrizeDistribution> {
        try_compute_prize_distribution(self.participants, self.per_entry()?)
    }
}

fn money(field: &str, value: f64) -> AppResult<Decimal> {
    if !value.is_finite() {
        return Err(AppError::InvalidArgument(format!("{} must be finite", field)));
    }
    if value < 0.0 {
        return Err(AppError::InvalidArgument(format!(
            "{} cannot be negative: {}",
            field, value
        )));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| AppError::InvalidArgument(format!("{} is out of range: {}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_weights_sum_to_one() {
        for bracket in [PrizeBracket::Small, PrizeBracket::Medium, PrizeBracket::Large] {
            let sum: Decimal = bracket.weights().iter().sum();
            assert_eq!(sum, Decimal::ONE);
            assert_eq!(bracket.weights().len(), bracket.tier_count());
        }
    }

    #[test]
    fn test_tiers_sum_to_pool() {
        for participants in [0u64, 1, 50, 51, 200, 201, 10_000] {
            let dist = compute_prize_distribution(participants, dec("0.9"));
            assert_eq!(dist.distributed(), dist.total_pool, "participants={}", participants);
        }
    }

    #[test]
    fn test_zero_participants() {
        let dist = compute_prize_distribution(0, dec("0.9"));
        assert_eq!(dist.total_pool, Decimal::ZERO);
        assert_eq!(dist.tiers.len(), 3);
        assert!(dist.tiers.iter().all(|t| t.amount.is_zero()));
    }

    #[test]
    fn test_bracket_boundaries() {
        assert_eq!(PrizeBracket::for_participants(50), PrizeBracket::Small);
        assert_eq!(PrizeBracket::for_participants(51), PrizeBracket::Medium);
        assert_eq!(PrizeBracket::for_participants(200), PrizeBracket::Medium);
        assert_eq!(PrizeBracket::for_participants(201), PrizeBracket::Large);
    }

    #[test]
    fn test_ranks_are_contiguous() {
        let dist = compute_prize_distribution(500, Decimal::ONE);
        let ranks: Vec<u32> = dist.tiers.iter().map(|t| t.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(dist.tier(1).unwrap().amount, dec("200"));
        assert!(dist.tier(7).is_none());
    }

    #[test]
    fn test_paid_example() {
        let per_entry = per_entry_contribution(FundingSource::Paid, dec("1.0"), dec("0.1"), Decimal::ZERO).unwrap();
        assert_eq!(per_entry, dec("0.9"));

        let dist = compute_prize_distribution(100, per_entry);
        assert_eq!(dist.total_pool, dec("90"));
        assert_eq!(
            dist.amounts(),
            vec![dec("45"), dec("22.5"), dec("13.5"), dec("5.4"), dec("3.6")]
        );
    }

    #[test]
    fn test_ad_funded_example() {
        let per_entry = per_entry_contribution(FundingSource::AdFunded, dec("1.0"), dec("0.1"), dec("0.001")).unwrap();
        let dist = compute_prize_distribution(300, per_entry);
        assert_eq!(dist.total_pool, dec("0.3"));
        assert_eq!(dist.tiers.len(), 6);
        assert_eq!(dist.distributed(), dec("0.3"));
    }

    #[test]
    fn test_platform_fee_above_entry_fee_rejected() {
        let err = per_entry_contribution(FundingSource::Paid, dec("0.1"), dec("1.0"), Decimal::ZERO).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn test_from_f64_rejects_bad_inputs() {
        assert!(matches!(
            PrizeInputs::from_f64(-1, false, 1.0, 0.1, 0.0),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(PrizeInputs::from_f64(10, false, f64::NAN, 0.1, 0.0).is_err());
        assert!(PrizeInputs::from_f64(10, true, 0.0, 0.0, f64::INFINITY).is_err());
        assert!(PrizeInputs::from_f64(10, true, 0.0, -0.5, 0.001).is_err());
    }

    #[test]
    fn test_overflowing_pool() {
        let clamped = compute_prize_distribution(u64::MAX, Decimal::MAX);
        assert_eq!(clamped.total_pool, Decimal::MAX);
        assert_eq!(clamped.tiers.len(), 6);

        let err = try_compute_prize_distribution(u64::MAX, Decimal::MAX).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let inputs = PrizeInputs {
            participants: u64::MAX,
            funding: FundingSource::AdFunded,
            entry_fee: Decimal::ZERO,
            platform_fee: Decimal::ZERO,
            ad_value: Decimal::MAX,
        };
        assert!(matches!(inputs.compute(), Err(AppError::InvalidArgument(_))));

        let dist = try_compute_prize_distribution(100, dec("0.9")).unwrap();
        assert_eq!(dist, compute_prize_distribution(100, dec("0.9")));
    }

    #[test]
    fn test_from_f64_matches_decimal_path() {
        let dist = PrizeInputs::from_f64(100, false, 1.0, 0.1, 0.0)
            .unwrap()
            .compute()
            .unwrap();
        assert!((dist.total_pool - dec("90")).abs() < dec("0.000001"));
        assert!((dist.tiers[0].amount_f64() - 45.0).abs() < 1e-9);
    }
}
