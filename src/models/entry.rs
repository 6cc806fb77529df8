use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a ticket was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryMethod {
    /// Earned by watching an ad
    Ad,
    /// Bought with a Pi payment
    Payment,
}

impl EntryMethod {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "ad" => Ok(EntryMethod::Ad),
            "payment" | "pi" => Ok(EntryMethod::Payment),
            _ => Err(format!("Invalid entry method: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMethod::Ad => "ad",
            EntryMethod::Payment => "payment",
        }
    }
}

/// One or more tickets a user holds in a lottery instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub instance_id: Uuid,
    pub lottery_type_id: String,
    pub user_id: String,
    pub method: EntryMethod,
    pub ticket_count: u32,
    /// Ad proof token or payment identifier
    pub proof: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(
        instance_id: Uuid,
        lottery_type_id: String,
        user_id: String,
        method: EntryMethod,
        ticket_count: u32,
        proof: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instance_id,
            lottery_type_id,
            user_id,
            method,
            ticket_count,
            proof,
            created_at: Utc::now(),
        }
    }
}
