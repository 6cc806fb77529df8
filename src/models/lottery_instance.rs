use crate::error::{AppError, AppResult};
use crate::models::LotteryType;
use crate::prize::{compute_prize_distribution, PrizeDistribution};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Instance status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Open,
    Closed,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Open => "open",
            InstanceStatus::Closed => "closed",
        }
    }
}

/// One drawing period of a lottery type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryInstance {
    pub id: Uuid,
    pub lottery_type_id: String,
    /// Tickets recorded so far; only grows while open
    participants: u64,
    pub scheduled_draw_time: DateTime<Utc>,
    pub status: InstanceStatus,
    pub created_at: DateTime<Utc>,
}

impl LotteryInstance {
    /// Open a new period for `lottery_type`, drawing one interval after `now`
    pub fn open(lottery_type: &LotteryType, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lottery_type_id: lottery_type.id.clone(),
            participants: 0,
            scheduled_draw_time: now + Duration::hours(i64::from(lottery_type.draw_interval_hours)),
            status: InstanceStatus::Open,
            created_at: now,
        }
    }

    pub fn participants(&self) -> u64 {
        self.participants
    }

    pub fn is_open(&self) -> bool {
        self.status == InstanceStatus::Open
    }

    /// Whether the draw time has been reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.scheduled_draw_time
    }

    /// Whether entries are accepted at `now`
    pub fn accepts_entries(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && !self.is_due(now)
    }

    pub fn has_minimum_participants(&self, lottery_type: &LotteryType) -> bool {
        self.participants >= u64::from(lottery_type.min_participants)
    }

    /// Add `tickets` to the participant count
    pub fn record_entries(&mut self, tickets: u64) -> AppResult<u64> {
        if !self.is_open() {
            return Err(AppError::BusinessLogic(format!(
                "Lottery instance {} is closed",
                self.id
            )));
        }
        self.participants = self
            .participants
            .checked_add(tickets)
            .ok_or_else(|| AppError::InvalidArgument("Participant count overflow".to_string()))?;
        Ok(self.participants)
    }

    pub fn close(&mut self) {
        self.status = InstanceStatus::Closed;
    }

    /// The instance replacing this one once it is drawn
    pub fn next_period(&self, lottery_type: &LotteryType) -> Self {
        let mut next = Self::open(lottery_type, self.scheduled_draw_time);
        next.created_at = Utc::now();
        next
    }

    /// Current prize pool, derived from participants
    pub fn prize_pool(&self, lottery_type: &LotteryType) -> AppResult<Decimal> {
        Ok(self.prize_distribution(lottery_type)?.total_pool)
    }

    pub fn prize_distribution(&self, lottery_type: &LotteryType) -> AppResult<PrizeDistribution> {
        let per_entry = lottery_type.per_entry_contribution()?;
        Ok(compute_prize_distribution(self.participants, per_entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FundingSource;

    fn weekly() -> LotteryType {
        LotteryType {
            id: "weekly_pi".to_string(),
            name: "Weekly Pi Lottery".to_string(),
            funding: FundingSource::Paid,
            entry_fee: Decimal::ONE,
            platform_fee: Decimal::new(1, 1),
            ad_value: Decimal::ZERO,
            min_participants: 2,
            max_tickets_per_user: 10,
            draw_interval_hours: 168,
        }
    }

    #[test]
    fn test_open_schedules_draw() {
        let now = Utc::now();
        let instance = LotteryInstance::open(&weekly(), now);
        assert_eq!(instance.scheduled_draw_time - now, Duration::hours(168));
        assert!(instance.accepts_entries(now));
        assert!(!instance.accepts_entries(now + Duration::hours(168)));
    }

    #[test]
    fn test_participants_only_grow_while_open() {
        let lottery = weekly();
        let mut instance = LotteryInstance::open(&lottery, Utc::now());
        assert!(!instance.has_minimum_participants(&lottery));

        instance.record_entries(1).unwrap();
        assert_eq!(instance.record_entries(2).unwrap(), 3);
        assert!(instance.has_minimum_participants(&lottery));
        assert_eq!(instance.prize_pool(&lottery).unwrap(), Decimal::new(27, 1));

        instance.close();
        assert!(instance.record_entries(1).is_err());
        assert_eq!(instance.participants(), 3);
    }

    #[test]
    fn test_next_period_starts_at_previous_draw() {
        let lottery = weekly();
        let instance = LotteryInstance::open(&lottery, Utc::now());
        let next = instance.next_period(&lottery);
        assert_ne!(next.id, instance.id);
        assert_eq!(next.participants(), 0);
        assert_eq!(
            next.scheduled_draw_time,
            instance.scheduled_draw_time + Duration::hours(168)
        );
    }
}
