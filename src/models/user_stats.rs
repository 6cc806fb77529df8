use crate::models::{Entry, EntryMethod};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Aggregated participation figures for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: String,
    pub total_tickets: u64,
    pub ad_tickets: u64,
    pub paid_tickets: u64,
    /// Pi paid for tickets, fees included
    pub total_spent: Decimal,
    /// Distinct lottery instances entered
    pub lotteries_entered: u64,
}

impl UserStats {
    /// Fold a user's entries into stats. `price_of` yields the entry fee of a lottery type.
    pub fn from_entries<'a, I, F>(user_id: &str, entries: I, price_of: F) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
        F: Fn(&str) -> Decimal,
    {
        let mut stats = UserStats {
            user_id: user_id.to_string(),
            ..Default::default()
        };
        let mut instances = HashSet::new();

        for entry in entries {
            let tickets = u64::from(entry.ticket_count);
            stats.total_tickets += tickets;
            match entry.method {
                EntryMethod::Ad => stats.ad_tickets += tickets,
                EntryMethod::Payment => {
                    stats.paid_tickets += tickets;
                    stats.total_spent += price_of(&entry.lottery_type_id) * Decimal::from(entry.ticket_count);
                }
            }
            instances.insert(entry.instance_id);
        }

        stats.lotteries_entered = instances.len() as u64;
        stats
    }
}
