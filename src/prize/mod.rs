//! Prize pool maths.
//!
//! The pool is `participants * per_entry` and is split over ranked tiers
//! whose shares depend on how many tickets were sold.

pub mod calculator;
pub mod distribution;

pub use calculator::PrizeCalculator;
pub use distribution::{
    compute_prize_distribution, per_entry_contribution, try_compute_prize_distribution,
    PrizeBracket, PrizeDistribution, PrizeInputs, PrizeTier,
};
