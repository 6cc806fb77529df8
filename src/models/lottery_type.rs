use crate::error::AppResult;
use crate::prize;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How entries into a lottery are funded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingSource {
    /// Users pay the entry fee in Pi
    Paid,
    /// Users watch an ad; the ad value funds the pool
    AdFunded,
}

impl FundingSource {
    /// Convert from config string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "paid" => Ok(FundingSource::Paid),
            "ad_funded" | "ads" => Ok(FundingSource::AdFunded),
            _ => Err(format!("Invalid funding source: {}", s)),
        }
    }

    /// Convert to config string
    pub fn as_str(&self) -> &'static str {
        match self {
            FundingSource::Paid => "paid",
            FundingSource::AdFunded => "ad_funded",
        }
    }
}

/// Static configuration of a kind of lottery (daily, weekly, ad-funded...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LotteryType {
    pub id: String,
    pub name: String,
    pub funding: FundingSource,
    /// Pi charged per paid ticket
    pub entry_fee: Decimal,
    /// Pi kept by the platform per paid ticket
    pub platform_fee: Decimal,
    /// Pi credited to the pool per ad-funded ticket
    pub ad_value: Decimal,
    pub min_participants: u32,
    pub max_tickets_per_user: u32,
    pub draw_interval_hours: u32,
}

impl LotteryType {
    pub fn is_ad_funded(&self) -> bool {
        self.funding == FundingSource::AdFunded
    }

    /// Net contribution of one ticket to the prize pool
    pub fn per_entry_contribution(&self) -> AppResult<Decimal> {
        prize::per_entry_contribution(
            self.funding,
            self.entry_fee,
            self.platform_fee,
            self.ad_value,
        )
    }

    /// Validate the economics and limits of this lottery type
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Lottery type id cannot be empty".to_string());
        }
        if self.max_tickets_per_user == 0 {
            return Err(format!("{}: max_tickets_per_user must be greater than 0", self.id));
        }
        if self.draw_interval_hours == 0 {
            return Err(format!("{}: draw_interval_hours must be greater than 0", self.id));
        }
        self.per_entry_contribution()
            .map(|_| ())
            .map_err(|e| format!("{}: {}", self.id, e))
    }
}
