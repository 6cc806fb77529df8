use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Entry, EntryMethod, FundingSource, LotteryInstance, LotteryType, UserStats};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Default)]
struct LotteryState {
    /// lottery type id -> current instance
    current: HashMap<String, LotteryInstance>,
    closed: Vec<LotteryInstance>,
    entries: Vec<Entry>,
    redeemed_proofs: HashSet<String>,
    /// (instance id, user id) -> tickets held back for payments in flight
    reserved: HashMap<(Uuid, String), u32>,
}

/// Tickets held for a user while their payment is collected.
///
/// Counts against the per-user limit until redeemed or released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReservation {
    pub instance_id: Uuid,
    pub lottery_type_id: String,
    pub user_id: String,
    pub method: EntryMethod,
    pub ticket_count: u32,
}

/// In-memory store for lottery instances and entries.
///
/// A single lock guards instances and entries so the participant count
/// and the entry list never disagree.
pub struct LotteryRepository {
    lottery_types: HashMap<String, LotteryType>,
    state: RwLock<LotteryState>,
}

impl LotteryRepository {
    /// Create a new LotteryRepository over a lottery catalog
    pub fn new(lottery_types: Vec<LotteryType>) -> Self {
        Self {
            lottery_types: lottery_types.into_iter().map(|t| (t.id.clone(), t)).collect(),
            state: RwLock::new(LotteryState::default()),
        }
    }

    pub fn lottery_type(&self, lottery_type_id: &str) -> RepositoryResult<&LotteryType> {
        self.lottery_types
            .get(lottery_type_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Lottery type {}", lottery_type_id)))
    }

    /// All configured lottery types, sorted by id
    pub fn lottery_types(&self) -> Vec<LotteryType> {
        let mut types: Vec<LotteryType> = self.lottery_types.values().cloned().collect();
        types.sort_by(|a, b| a.id.cmp(&b.id));
        types
    }

    /// Open a drawing period, or return the one already open
    pub async fn open_instance(
        &self,
        lottery_type_id: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<LotteryInstance> {
        let lottery_type = self.lottery_type(lottery_type_id)?;
        let mut state = self.state.write().await;

        if let Some(existing) = state.current.get(lottery_type_id) {
            if existing.is_open() {
                return Ok(existing.clone());
            }
        }

        let instance = LotteryInstance::open(lottery_type, now);
        info!(
            "Opened {} instance {} (draw at {})",
            lottery_type_id, instance.id, instance.scheduled_draw_time
        );
        state.current.insert(lottery_type_id.to_string(), instance.clone());
        Ok(instance)
    }

    pub async fn current_instance(&self, lottery_type_id: &str) -> RepositoryResult<Option<LotteryInstance>> {
        self.lottery_type(lottery_type_id)?;
        Ok(self.state.read().await.current.get(lottery_type_id).cloned())
    }

    /// Find an open or closed instance by id
    pub async fn find_instance(&self, instance_id: Uuid) -> Option<LotteryInstance> {
        let state = self.state.read().await;
        state
            .current
            .values()
            .chain(state.closed.iter())
            .find(|i| i.id == instance_id)
            .cloned()
    }

    /// Tickets `user_id` already holds in the current instance of a lottery
    pub async fn user_ticket_count(&self, lottery_type_id: &str, user_id: &str) -> u32 {
        let state = self.state.read().await;
        match state.current.get(lottery_type_id) {
            Some(instance) => tickets_held(&state.entries, instance.id, user_id),
            None => 0,
        }
    }

    /// Check everything `enter_lottery` checks except the proof
    pub async fn check_entry_allowed(
        &self,
        lottery_type_id: &str,
        user_id: &str,
        method: EntryMethod,
        ticket_count: u32,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let lottery_type = self.lottery_type(lottery_type_id)?;
        let state = self.state.read().await;
        check_rules(&state, lottery_type, user_id, method, ticket_count, now).map(|_| ())
    }

    /// Record `ticket_count` tickets for `user_id` in the current instance
    pub async fn enter_lottery(
        &self,
        lottery_type_id: &str,
        user_id: &str,
        method: EntryMethod,
        ticket_count: u32,
        proof: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<(Entry, LotteryInstance)> {
        let lottery_type = self.lottery_type(lottery_type_id)?;
        let mut state = self.state.write().await;
        record_entry(&mut state, lottery_type, user_id, method, ticket_count, proof, now)
    }

    /// Hold `ticket_count` tickets for `user_id` in the current instance
    pub async fn reserve_tickets(
        &self,
        lottery_type_id: &str,
        user_id: &str,
        method: EntryMethod,
        ticket_count: u32,
        now: DateTime<Utc>,
    ) -> RepositoryResult<TicketReservation> {
        let lottery_type = self.lottery_type(lottery_type_id)?;
        let mut state = self.state.write().await;

        let instance_id = check_rules(&state, lottery_type, user_id, method, ticket_count, now)?;
        *state
            .reserved
            .entry((instance_id, user_id.to_string()))
            .or_insert(0) += ticket_count;

        debug!("Reserved {} x{} for {}", lottery_type_id, ticket_count, user_id);
        Ok(TicketReservation {
            instance_id,
            lottery_type_id: lottery_type_id.to_string(),
            user_id: user_id.to_string(),
            method,
            ticket_count,
        })
    }

    /// Give reserved tickets back without recording an entry
    pub async fn release_reservation(&self, reservation: &TicketReservation) {
        let mut state = self.state.write().await;
        release(&mut state, reservation);
    }

    /// Turn a reservation into an entry.
    ///
    /// The reservation is consumed either way. Fails if its instance is no
    /// longer the open one.
    pub async fn redeem_reservation(
        &self,
        reservation: TicketReservation,
        proof: &str,
        now: DateTime<Utc>,
    ) -> RepositoryResult<(Entry, LotteryInstance)> {
        let lottery_type = self.lottery_type(&reservation.lottery_type_id)?;
        let mut state = self.state.write().await;
        release(&mut state, &reservation);

        let current_id = state.current.get(&reservation.lottery_type_id).map(|i| i.id);
        if current_id != Some(reservation.instance_id) {
            return Err(RepositoryError::BusinessRule(format!(
                "{} instance {} closed before the entry was recorded",
                reservation.lottery_type_id, reservation.instance_id
            )));
        }

        record_entry(
            &mut state,
            lottery_type,
            &reservation.user_id,
            reservation.method,
            reservation.ticket_count,
            proof,
            now,
        )
    }

    /// Tickets currently held back for `user_id` in the open instance
    pub async fn reserved_ticket_count(&self, lottery_type_id: &str, user_id: &str) -> u32 {
        let state = self.state.read().await;
        match state.current.get(lottery_type_id) {
            Some(instance) => reserved_for(&state, instance.id, user_id),
            None => 0,
        }
    }

    pub async fn entries_for_instance(&self, instance_id: Uuid) -> Vec<Entry> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.instance_id == instance_id)
            .cloned()
            .collect()
    }

    pub async fn get_user_stats(&self, user_id: &str) -> UserStats {
        let state = self.state.read().await;
        let entries = state.entries.iter().filter(|e| e.user_id == user_id);
        UserStats::from_entries(user_id, entries, |type_id| {
            self.lottery_types
                .get(type_id)
                .map(|t| t.entry_fee)
                .unwrap_or(Decimal::ZERO)
        })
    }

    /// Open instances that have reached their draw time, by lottery type id
    pub async fn due_instances(&self, now: DateTime<Utc>) -> Vec<LotteryInstance> {
        let state = self.state.read().await;
        let mut due: Vec<LotteryInstance> = state
            .current
            .values()
            .filter(|instance| instance.is_open() && instance.is_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.lottery_type_id.cmp(&b.lottery_type_id));
        due
    }

    /// Close instance `instance_id` and open the next period.
    ///
    /// Returns `(closed, next)`. The next draw is one interval after the
    /// closed one, or after `now` if that is already in the past. Fails with
    /// `NotFound` when `instance_id` is no longer the current instance.
    pub async fn close_instance(
        &self,
        lottery_type_id: &str,
        instance_id: Uuid,
        now: DateTime<Utc>,
    ) -> RepositoryResult<(LotteryInstance, LotteryInstance)> {
        let lottery_type = self.lottery_type(lottery_type_id)?;
        let mut state = self.state.write().await;

        let is_current = state
            .current
            .get(lottery_type_id)
            .map_or(false, |i| i.id == instance_id);
        if !is_current {
            return Err(RepositoryError::NotFound(format!(
                "{} instance {} is not open",
                lottery_type_id, instance_id
            )));
        }
        let mut closed = state
            .current
            .remove(lottery_type_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Open instance for {}", lottery_type_id)))?;
        closed.close();

        if !closed.has_minimum_participants(lottery_type) {
            warn!(
                "{} instance {} closed with {} of {} required participants",
                lottery_type_id,
                closed.id,
                closed.participants(),
                lottery_type.min_participants
            );
        }

        let mut next = closed.next_period(lottery_type);
        if next.is_due(now) {
            next = LotteryInstance::open(lottery_type, now);
        }

        info!(
            "Closed {} instance {}, next draw {}",
            lottery_type_id, closed.id, next.scheduled_draw_time
        );
        state.current.insert(lottery_type_id.to_string(), next.clone());
        state.closed.push(closed.clone());
        Ok((closed, next))
    }
}

fn tickets_held(entries: &[Entry], instance_id: Uuid, user_id: &str) -> u32 {
    entries
        .iter()
        .filter(|e| e.instance_id == instance_id && e.user_id == user_id)
        .map(|e| e.ticket_count)
        .sum()
}

fn reserved_for(state: &LotteryState, instance_id: Uuid, user_id: &str) -> u32 {
    state
        .reserved
        .get(&(instance_id, user_id.to_string()))
        .copied()
        .unwrap_or(0)
}

fn release(state: &mut LotteryState, reservation: &TicketReservation) {
    let key = (reservation.instance_id, reservation.user_id.clone());
    if let Some(held) = state.reserved.get_mut(&key) {
        *held = held.saturating_sub(reservation.ticket_count);
        if *held == 0 {
            state.reserved.remove(&key);
        }
    }
}

fn record_entry(
    state: &mut LotteryState,
    lottery_type: &LotteryType,
    user_id: &str,
    method: EntryMethod,
    ticket_count: u32,
    proof: &str,
    now: DateTime<Utc>,
) -> RepositoryResult<(Entry, LotteryInstance)> {
    if proof.trim().is_empty() {
        return Err(RepositoryError::InvalidInput("Entry proof is required".to_string()));
    }

    let instance_id = check_rules(state, lottery_type, user_id, method, ticket_count, now)?;
    if state.redeemed_proofs.contains(proof) {
        return Err(RepositoryError::Duplicate(format!("Proof {} already redeemed", proof)));
    }

    let instance = state
        .current
        .get_mut(&lottery_type.id)
        .filter(|i| i.id == instance_id)
        .ok_or_else(|| RepositoryError::NotFound(format!("Open instance for {}", lottery_type.id)))?;
    instance
        .record_entries(u64::from(ticket_count))
        .map_err(|e| RepositoryError::BusinessRule(e.to_string()))?;
    let instance = instance.clone();

    let entry = Entry::new(
        instance_id,
        lottery_type.id.clone(),
        user_id.to_string(),
        method,
        ticket_count,
        proof.to_string(),
    );
    state.redeemed_proofs.insert(proof.to_string());
    state.entries.push(entry.clone());

    info!(
        "{} entered {} x{} via {} ({} participants)",
        user_id,
        lottery_type.id,
        ticket_count,
        method.as_str(),
        instance.participants()
    );
    Ok((entry, instance))
}

/// Validate an entry against the current instance; returns its id
fn check_rules(
    state: &LotteryState,
    lottery_type: &LotteryType,
    user_id: &str,
    method: EntryMethod,
    ticket_count: u32,
    now: DateTime<Utc>,
) -> RepositoryResult<Uuid> {
    if user_id.trim().is_empty() {
        return Err(RepositoryError::InvalidInput("User id is required".to_string()));
    }
    if ticket_count == 0 {
        return Err(RepositoryError::InvalidInput("Ticket count must be at least 1".to_string()));
    }

    let method_matches = matches!(
        (lottery_type.funding, method),
        (FundingSource::Paid, EntryMethod::Payment) | (FundingSource::AdFunded, EntryMethod::Ad)
    );
    if !method_matches {
        return Err(RepositoryError::InvalidInput(format!(
            "{} does not accept {} entries",
            lottery_type.id,
            method.as_str()
        )));
    }

    let instance = state
        .current
        .get(&lottery_type.id)
        .ok_or_else(|| RepositoryError::NotFound(format!("Open instance for {}", lottery_type.id)))?;
    if !instance.accepts_entries(now) {
        return Err(RepositoryError::BusinessRule(format!(
            "{} instance {} is no longer accepting entries",
            lottery_type.id, instance.id
        )));
    }

    let held = tickets_held(&state.entries, instance.id, user_id)
        .saturating_add(reserved_for(state, instance.id, user_id));
    if held.saturating_add(ticket_count) > lottery_type.max_tickets_per_user {
        return Err(RepositoryError::BusinessRule(format!(
            "Ticket limit reached: {} holds or awaits {} of {} tickets",
            user_id, held, lottery_type.max_tickets_per_user
        )));
    }

    Ok(instance.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_lottery_types;
    use chrono::Duration;

    #[tokio::test]
    async fn test_open_instance_is_idempotent() {
        let repo = LotteryRepository::new(default_lottery_types());
        let now = Utc::now();
        let first = repo.open_instance("daily_pi", now).await.unwrap();
        let second = repo.open_instance("daily_pi", now).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(repo.open_instance("monthly", now).await.is_err());
    }

    #[tokio::test]
    async fn test_overdue_close_reopens_from_now() {
        let repo = LotteryRepository::new(default_lottery_types());
        let start = Utc::now() - Duration::days(3);
        repo.open_instance("daily_pi", start).await.unwrap();

        let now = Utc::now();
        let due = repo.due_instances(now).await;
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].lottery_type_id, "daily_pi");

        let (closed, next) = repo.close_instance("daily_pi", due[0].id, now).await.unwrap();
        assert!(!closed.is_open());
        assert!(next.scheduled_draw_time > now);
        assert!(repo.find_instance(closed.id).await.is_some());
    }

    #[tokio::test]
    async fn test_close_instance_only_closes_the_expected_one() {
        let repo = LotteryRepository::new(default_lottery_types());
        let start = Utc::now() - Duration::days(3);
        let stale = repo.open_instance("daily_pi", start).await.unwrap();

        let now = Utc::now();
        let (_, next) = repo.close_instance("daily_pi", stale.id, now).await.unwrap();

        // a second close for the same due instance must leave the successor open
        let err = repo.close_instance("daily_pi", stale.id, now).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
        let current = repo.current_instance("daily_pi").await.unwrap().unwrap();
        assert_eq!(current.id, next.id);
        assert!(current.is_open());
    }

    #[tokio::test]
    async fn test_reservations_count_against_ticket_limit() {
        let repo = LotteryRepository::new(default_lottery_types());
        let now = Utc::now();
        repo.open_instance("daily_pi", now).await.unwrap();

        let held = repo
            .reserve_tickets("daily_pi", "zoe", EntryMethod::Payment, 2, now)
            .await
            .unwrap();
        assert_eq!(repo.reserved_ticket_count("daily_pi", "zoe").await, 2);

        let err = repo
            .reserve_tickets("daily_pi", "zoe", EntryMethod::Payment, 2, now)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRule(_)));

        let (entry, instance) = repo.redeem_reservation(held, "pay_abc", now).await.unwrap();
        assert_eq!(entry.ticket_count, 2);
        assert_eq!(instance.participants(), 2);
        assert_eq!(repo.reserved_ticket_count("daily_pi", "zoe").await, 0);
        assert_eq!(repo.user_ticket_count("daily_pi", "zoe").await, 2);
    }

    #[tokio::test]
    async fn test_released_and_stale_reservations() {
        let repo = LotteryRepository::new(default_lottery_types());
        let start = Utc::now() - Duration::days(3);
        let stale = repo.open_instance("daily_pi", start).await.unwrap();

        let released = repo
            .reserve_tickets("daily_pi", "yan", EntryMethod::Payment, 3, start)
            .await
            .unwrap();
        repo.release_reservation(&released).await;
        let held = repo
            .reserve_tickets("daily_pi", "yan", EntryMethod::Payment, 3, start)
            .await
            .unwrap();

        repo.close_instance("daily_pi", stale.id, Utc::now()).await.unwrap();
        let err = repo.redeem_reservation(held, "pay_late", Utc::now()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::BusinessRule(_)));
        assert_eq!(repo.user_ticket_count("daily_pi", "yan").await, 0);
        assert!(repo.entries_for_instance(stale.id).await.is_empty());
    }
}
