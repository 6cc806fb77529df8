use crate::config::AppConfig;
use crate::error::{option_to_result, AppError, AppResult, RepositoryError};
use crate::flows::{AdWatchEvent, AdWatchState, FlowError, PaymentEvent, PaymentState};
use crate::models::{Entry, EntryMethod, LotteryInstance, LotteryType, UserStats};
use crate::prize::{PrizeCalculator, PrizeDistribution};
use crate::realtime::{Notification, NotificationHub};
use crate::repositories::{LotteryRepository, TicketReservation};
use crate::services::ad_verifier::{AdVerifier, VerificationOutcome};
use crate::services::payment_gateway::PaymentGateway;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An ad-watch modal in progress
#[derive(Debug, Clone)]
pub struct AdSession {
    pub id: Uuid,
    pub lottery_type_id: String,
    pub user_id: String,
    pub state: AdWatchState,
    /// Last step taken; idle sessions expire after the configured TTL
    pub updated_at: DateTime<Utc>,
}

/// Outcome of a pay-for-tickets attempt
#[derive(Debug, Clone)]
pub struct PaymentAttempt {
    /// Final step of the payment modal: success, or an error the user can retry
    pub state: PaymentState,
    pub entry: Option<Entry>,
    /// Payment collected without tickets being recorded; due for a refund
    pub refund_payment_id: Option<String>,
}

impl PaymentAttempt {
    fn failed(state: PaymentState) -> Self {
        Self {
            state,
            entry: None,
            refund_payment_id: None,
        }
    }
}

/// Service orchestrating entry flows, the entry store and prize previews
pub struct LotteryService<G, V> {
    config: Arc<AppConfig>,
    repo: Arc<LotteryRepository>,
    gateway: Arc<G>,
    verifier: Arc<V>,
    hub: NotificationHub,
    calculator: PrizeCalculator,
    ad_sessions: RwLock<HashMap<Uuid, AdSession>>,
}

impl<G: PaymentGateway, V: AdVerifier> LotteryService<G, V> {
    pub fn new(
        config: Arc<AppConfig>,
        repo: Arc<LotteryRepository>,
        gateway: Arc<G>,
        verifier: Arc<V>,
        hub: NotificationHub,
    ) -> Self {
        Self {
            config,
            repo,
            gateway,
            verifier,
            hub,
            calculator: PrizeCalculator::default(),
            ad_sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn repository(&self) -> &Arc<LotteryRepository> {
        &self.repo
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Open the current period of every configured lottery
    pub async fn open_all(&self, now: DateTime<Utc>) -> AppResult<Vec<LotteryInstance>> {
        let mut opened = Vec::new();
        for lottery_type in self.repo.lottery_types() {
            let instance = self.repo.open_instance(&lottery_type.id, now).await?;
            self.notify(Notification::DrawScheduled {
                lottery_type_id: lottery_type.id.clone(),
                instance_id: instance.id,
                draw_time: instance.scheduled_draw_time,
            })
            .await;
            opened.push(instance);
        }
        Ok(opened)
    }

    /// Prize breakdown of the current instance
    pub async fn preview_prizes(&self, lottery_type_id: &str) -> AppResult<PrizeDistribution> {
        self.preview_with_additional(lottery_type_id, 0).await
    }

    /// Prize breakdown if `additional` more tickets were sold
    pub async fn preview_with_additional(
        &self,
        lottery_type_id: &str,
        additional: u64,
    ) -> AppResult<PrizeDistribution> {
        let lottery_type = self.repo.lottery_type(lottery_type_id)?;
        let per_entry = lottery_type.per_entry_contribution()?;
        let participants = self
            .repo
            .current_instance(lottery_type_id)
            .await?
            .map(|i| i.participants())
            .unwrap_or(0);

        let participants = participants
            .checked_add(additional)
            .ok_or_else(|| AppError::InvalidArgument("Participant count overflow".to_string()))?;
        Ok(self.calculator.distribution(participants, per_entry))
    }

    pub async fn user_stats(&self, user_id: &str) -> UserStats {
        self.repo.get_user_stats(user_id).await
    }

    // =========================================================================
    // AD-FUNDED ENTRIES
    // =========================================================================

    /// Open the ad modal for one ticket; fails early if the user cannot enter
    pub async fn start_ad_watch(&self, lottery_type_id: &str, user_id: &str) -> AppResult<AdSession> {
        if !self.config.features.ad_entries {
            return Err(AppError::Unauthorized("Ad entries are disabled".to_string()));
        }
        let now = Utc::now();
        self.expire_ad_sessions(now).await;
        self.repo
            .check_entry_allowed(lottery_type_id, user_id, EntryMethod::Ad, 1, now)
            .await?;

        let state = AdWatchState::Instructions.transition(AdWatchEvent::Start {
            required: self.config.ads.watch_seconds,
        })?;
        let session = AdSession {
            id: Uuid::new_v4(),
            lottery_type_id: lottery_type_id.to_string(),
            user_id: user_id.to_string(),
            state,
            updated_at: now,
        };

        info!("{} started ad session {} for {}", user_id, session.id, lottery_type_id);
        self.ad_sessions.write().await.insert(session.id, session.clone());
        Ok(session)
    }

    pub async fn ad_session(&self, session_id: Uuid) -> AppResult<AdSession> {
        let session = self.ad_sessions.read().await.get(&session_id).cloned();
        option_to_result(session, &format!("Ad session {}", session_id))
    }

    async fn apply_ad_event(&self, session_id: Uuid, event: AdWatchEvent) -> AppResult<AdWatchState> {
        let mut sessions = self.ad_sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::NotFound(format!("Ad session {}", session_id)))?;

        let next = session.state.clone().transition(event)?;
        session.state = next.clone();
        session.updated_at = Utc::now();
        Ok(next)
    }

    /// Forget a session here and in the verifier
    async fn drop_ad_session(&self, session_id: Uuid) {
        self.ad_sessions.write().await.remove(&session_id);
        self.verifier.discard_session(session_id).await;
    }

    /// Drop ad sessions idle for longer than the configured TTL
    pub async fn expire_ad_sessions(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.config.ads.session_ttl();
        let expired: Vec<AdSession> = {
            let mut sessions = self.ad_sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.updated_at < cutoff)
                .map(|s| s.id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &expired {
            self.verifier.discard_session(session.id).await;
            if let Some(proof) = session.state.proof() {
                self.verifier.revoke_proof(proof).await;
            }
        }
        if !expired.is_empty() {
            debug!("Expired {} idle ad session(s)", expired.len());
        }
        expired.len()
    }

    pub async fn active_ad_sessions(&self) -> usize {
        self.ad_sessions.read().await.len()
    }

    pub async fn tick_ad_watch(&self, session_id: Uuid, seconds: u32) -> AppResult<AdWatchState> {
        self.apply_ad_event(session_id, AdWatchEvent::Tick(seconds)).await
    }

    /// Ask the verifier for a question once the ad has finished
    pub async fn request_verification(&self, session_id: Uuid) -> AppResult<AdWatchState> {
        let session = self.ad_session(session_id).await?;
        match session.state {
            AdWatchState::Watching { elapsed, required } if elapsed < required => {
                return Err(FlowError::AdNotFinished {
                    watched: elapsed,
                    required,
                }
                .into());
            }
            AdWatchState::Watching { .. } => {}
            other => {
                return Err(FlowError::InvalidTransition {
                    state: other.name().to_string(),
                    event: "request_verification".to_string(),
                }
                .into());
            }
        }

        let question = self.verifier.issue_question(session_id).await?;
        self.apply_ad_event(session_id, AdWatchEvent::QuestionIssued(question)).await
    }

    pub async fn answer_verification(&self, session_id: Uuid, answer: usize) -> AppResult<AdWatchState> {
        let session = self.ad_session(session_id).await?;
        let question_id = match &session.state {
            AdWatchState::Verification { question } => question.id.clone(),
            other => {
                return Err(FlowError::InvalidTransition {
                    state: other.name().to_string(),
                    event: "answer".to_string(),
                }
                .into())
            }
        };

        let event = match self.verifier.check_answer(session_id, &question_id, answer).await? {
            VerificationOutcome::Passed { proof } => AdWatchEvent::Verified(proof),
            VerificationOutcome::Failed { reason } => AdWatchEvent::Rejected(reason),
        };
        self.apply_ad_event(session_id, event).await
    }

    /// Close the modal; the session is gone afterwards
    pub async fn abort_ad_watch(&self, session_id: Uuid, reason: &str) -> AppResult<AdWatchState> {
        warn!("Ad session {} aborted: {}", session_id, reason);
        let state = self
            .apply_ad_event(session_id, AdWatchEvent::Abort(reason.to_string()))
            .await?;
        self.drop_ad_session(session_id).await;
        Ok(state)
    }

    /// "Try Again": back to the instructions, then straight into a new ad
    pub async fn retry_ad_watch(&self, session_id: Uuid) -> AppResult<AdWatchState> {
        self.apply_ad_event(session_id, AdWatchEvent::Retry).await?;
        self.apply_ad_event(
            session_id,
            AdWatchEvent::Start {
                required: self.config.ads.watch_seconds,
            },
        )
        .await
    }

    /// Redeem a verified ad session for one ticket.
    ///
    /// The session and its proof are spent whether or not the entry is
    /// accepted.
    pub async fn enter_with_ad(&self, session_id: Uuid) -> AppResult<Entry> {
        let session = self.ad_session(session_id).await?;
        let proof = session
            .state
            .proof()
            .ok_or_else(|| AppError::Validation(format!("Ad session {} is not verified", session_id)))?
            .to_string();

        let valid = self.verifier.is_valid_proof(&proof).await;
        let entered = if valid {
            self.repo
                .enter_lottery(
                    &session.lottery_type_id,
                    &session.user_id,
                    EntryMethod::Ad,
                    1,
                    &proof,
                    Utc::now(),
                )
                .await
                .map_err(AppError::from)
        } else {
            Err(AppError::Unauthorized("Unknown ad verification proof".to_string()))
        };

        self.verifier.revoke_proof(&proof).await;
        self.drop_ad_session(session_id).await;

        let (entry, instance) = entered?;
        self.announce_entry(&entry, &instance).await?;
        Ok(entry)
    }

    // =========================================================================
    // PAID ENTRIES
    // =========================================================================

    /// Charge the user for `ticket_count` tickets and record them.
    ///
    /// The tickets are reserved before the gateway is called. Gateway
    /// failures end in `PaymentState::Error` so the caller can offer a retry;
    /// rule violations are returned as errors before any charge. A payment
    /// that completes but can no longer be recorded ends in `Error` with
    /// `refund_payment_id` set.
    pub async fn pay_and_enter(
        &self,
        lottery_type_id: &str,
        user_id: &str,
        ticket_count: u32,
    ) -> AppResult<PaymentAttempt> {
        if !self.config.features.paid_entries {
            return Err(AppError::Unauthorized("Paid entries are disabled".to_string()));
        }

        let lottery_type = self.repo.lottery_type(lottery_type_id)?.clone();
        let amount = lottery_type.entry_fee * Decimal::from(ticket_count);
        let state = PaymentState::review(amount, ticket_count);
        self.run_payment(&lottery_type, user_id, state).await
    }

    /// Resume a payment modal from `Error` ("Try Again")
    pub async fn retry_payment(
        &self,
        lottery_type_id: &str,
        user_id: &str,
        failed: PaymentState,
    ) -> AppResult<PaymentAttempt> {
        let lottery_type = self.repo.lottery_type(lottery_type_id)?.clone();
        let state = failed.transition(PaymentEvent::Retry)?;
        self.run_payment(&lottery_type, user_id, state).await
    }

    async fn run_payment(
        &self,
        lottery_type: &LotteryType,
        user_id: &str,
        state: PaymentState,
    ) -> AppResult<PaymentAttempt> {
        let (amount, ticket_count) = match &state {
            PaymentState::Review { amount, ticket_count } => (*amount, *ticket_count),
            other => {
                return Err(FlowError::InvalidTransition {
                    state: other.name().to_string(),
                    event: "pay".to_string(),
                }
                .into())
            }
        };

        let reservation = self
            .repo
            .reserve_tickets(&lottery_type.id, user_id, EntryMethod::Payment, ticket_count, Utc::now())
            .await?;

        let (state, payment_id) = match self
            .collect_payment(lottery_type, user_id, state, amount, ticket_count)
            .await {
            Ok((state, Some(payment_id))) => (state, payment_id),
            Ok((state, None)) => {
                self.repo.release_reservation(&reservation).await;
                return Ok(PaymentAttempt::failed(state));
            }
            Err(e) => {
                self.repo.release_reservation(&reservation).await;
                return Err(e);
            }
        };

        self.redeem_payment(reservation, state, payment_id).await
    }

    /// Create and complete the payment. Returns the processing state and the
    /// payment id once the user has paid, or the error state otherwise.
    async fn collect_payment(
        &self,
        lottery_type: &LotteryType,
        user_id: &str,
        state: PaymentState,
        amount: Decimal,
        ticket_count: u32,
    ) -> AppResult<(PaymentState, Option<String>)> {
        let memo = format!("{} x{} ticket(s)", lottery_type.name, ticket_count);
        let metadata = serde_json::json!({
            "lottery_type_id": lottery_type.id,
            "user_id": user_id,
            "ticket_count": ticket_count,
        });

        let payment = match self.gateway.create_payment(amount, &memo, metadata).await {
            Ok(payment) => payment,
            Err(e) => {
                warn!("Payment creation failed for {}: {}", user_id, e);
                let state = state.transition(PaymentEvent::Failed(e.to_string()))?;
                return Ok((state, None));
            }
        };

        let state = state.transition(PaymentEvent::Confirm(payment.identifier.clone()))?;

        match self.gateway.complete_payment(&payment.identifier).await {
            Ok(_) => Ok((state, Some(payment.identifier))),
            Err(e) => {
                warn!("Payment {} failed: {}", payment.identifier, e);
                let state = state.transition(PaymentEvent::Failed(e.to_string()))?;
                Ok((state, None))
            }
        }
    }

    /// Record the reserved tickets against a completed payment
    async fn redeem_payment(
        &self,
        reservation: TicketReservation,
        state: PaymentState,
        payment_id: String,
    ) -> AppResult<PaymentAttempt> {
        let user_id = reservation.user_id.clone();
        match self.repo.redeem_reservation(reservation, &payment_id, Utc::now()).await {
            Ok((entry, instance)) => {
                let state = state.transition(PaymentEvent::Completed)?;
                self.announce_entry(&entry, &instance).await?;
                Ok(PaymentAttempt {
                    state,
                    entry: Some(entry),
                    refund_payment_id: None,
                })
            }
            Err(e) => {
                error!(
                    "Payment {} from {} completed but no tickets were recorded, refund due: {}",
                    payment_id, user_id, e
                );
                let message = format!("{}. Payment {} will be refunded", e, payment_id);
                let state = state.transition(PaymentEvent::Failed(message))?;
                Ok(PaymentAttempt {
                    state,
                    entry: None,
                    refund_payment_id: Some(payment_id),
                })
            }
        }
    }

    // =========================================================================
    // DRAW PERIODS
    // =========================================================================

    /// Close every instance whose draw time has passed and open its successor
    pub async fn roll_over_due(&self, now: DateTime<Utc>) -> AppResult<Vec<LotteryInstance>> {
        let mut opened = Vec::new();
        for due in self.repo.due_instances(now).await {
            let lottery_type_id = due.lottery_type_id;
            let (closed, next) = match self.repo.close_instance(&lottery_type_id, due.id, now).await {
                Ok(closed_and_next) => closed_and_next,
                Err(RepositoryError::NotFound(_)) => {
                    debug!("{} instance {} already rolled over", lottery_type_id, due.id);
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let lottery_type = self.repo.lottery_type(&lottery_type_id)?;
            let final_prizes = closed.prize_distribution(lottery_type)?;
            info!(
                "{} closed with {} participants, pool {}",
                lottery_type_id, final_prizes.participants, final_prizes.total_pool
            );

            self.notify(Notification::DrawScheduled {
                lottery_type_id: lottery_type_id.clone(),
                instance_id: next.id,
                draw_time: next.scheduled_draw_time,
            })
            .await;
            opened.push(next);
        }
        Ok(opened)
    }

    async fn announce_entry(&self, entry: &Entry, instance: &LotteryInstance) -> AppResult<()> {
        let lottery_type = self.repo.lottery_type(&entry.lottery_type_id)?;
        let prize_pool = instance.prize_pool(lottery_type)?;

        self.notify(Notification::EntryRecorded {
            lottery_type_id: entry.lottery_type_id.clone(),
            instance_id: entry.instance_id,
            user_id: entry.user_id.clone(),
            ticket_count: entry.ticket_count,
        })
        .await;
        self.notify(Notification::PrizePoolUpdated {
            lottery_type_id: entry.lottery_type_id.clone(),
            instance_id: instance.id,
            participants: instance.participants(),
            prize_pool,
        })
        .await;
        Ok(())
    }

    async fn notify(&self, notification: Notification) {
        if self.config.features.realtime {
            self.hub.publish(notification).await;
        }
    }
}
