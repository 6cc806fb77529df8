//! Derived values for countdowns and Pi amounts shown next to a lottery.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Time left until a draw, clamped at zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimeRemaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl TimeRemaining {
    pub fn is_expired(&self) -> bool {
        *self == TimeRemaining::default()
    }

    pub fn total_seconds(&self) -> i64 {
        ((self.days * 24 + self.hours) * 60 + self.minutes) * 60 + self.seconds
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_expired() {
            write!(f, "Draw in progress")
        } else if self.days > 0 {
            write!(
                f,
                "{}d {:02}h {:02}m {:02}s",
                self.days, self.hours, self.minutes, self.seconds
            )
        } else {
            write!(f, "{:02}h {:02}m {:02}s", self.hours, self.minutes, self.seconds)
        }
    }
}

/// Countdown from `now` to `draw_time`
pub fn time_remaining(draw_time: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
    let total = (draw_time - now).num_seconds().max(0);

    TimeRemaining {
        days: total / 86_400,
        hours: (total % 86_400) / 3_600,
        minutes: (total % 3_600) / 60,
        seconds: total % 60,
    }
}

/// Fixed-decimal Pi amount, e.g. `12.50 π`
pub fn format_pi(amount: Decimal, decimals: u32) -> String {
    let rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*} π", decimals as usize, rounded)
}

/// Short form for large amounts: `950`, `1.2K`, `3.4M`
pub fn abbreviate(amount: Decimal) -> String {
    let thousand = Decimal::from(1_000);
    let million = Decimal::from(1_000_000);
    let abs = amount.abs();

    let (scaled, suffix) = if abs >= million {
        (amount / million, "M")
    } else if abs >= thousand {
        (amount / thousand, "K")
    } else {
        return amount.round_dp(2).normalize().to_string();
    };

    let rounded = scaled
        .round_dp_with_strategy(1, RoundingStrategy::ToZero)
        .normalize();
    format!("{}{}", rounded, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_time_remaining_breakdown() {
        let now = Utc::now();
        let draw = now + Duration::seconds(86_400 + 2 * 3_600 + 3 * 60 + 4);
        let remaining = time_remaining(draw, now);
        assert_eq!(
            remaining,
            TimeRemaining { days: 1, hours: 2, minutes: 3, seconds: 4 }
        );
        assert_eq!(remaining.to_string(), "1d 02h 03m 04s");
    }

    #[test]
    fn test_time_remaining_clamps_after_draw() {
        let now = Utc::now();
        let remaining = time_remaining(now - Duration::minutes(5), now);
        assert!(remaining.is_expired());
        assert_eq!(remaining.total_seconds(), 0);
        assert_eq!(remaining.to_string(), "Draw in progress");
    }

    #[test]
    fn test_format_pi() {
        assert_eq!(format_pi(Decimal::new(125, 1), 2), "12.50 π");
        assert_eq!(format_pi(Decimal::new(3, 1), 3), "0.300 π");
        assert_eq!(format_pi(Decimal::new(45, 1), 0), "5 π");
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(Decimal::new(950, 0)), "950");
        assert_eq!(abbreviate(Decimal::new(1250, 0)), "1.2K");
        assert_eq!(abbreviate(Decimal::new(3_450_000, 0)), "3.4M");
        assert_eq!(abbreviate(Decimal::new(45, 1)), "4.5");
    }
}
