//! Domain models for the lottery platform.
//!
//! Lottery types are static reference data loaded from configuration;
//! instances, entries and stats are tracked by the entry store.

pub mod entry;
pub mod lottery_instance;
pub mod lottery_type;
pub mod user_stats;

// Re-export all models for convenient access
pub use entry::{Entry, EntryMethod};
pub use lottery_instance::{InstanceStatus, LotteryInstance};
pub use lottery_type::{FundingSource, LotteryType};
pub use user_stats::UserStats;
