#![allow(dead_code)]

use chrono::Utc;
use pi_lottery::config::AppConfig;
use pi_lottery::flows::AdWatchState;
use pi_lottery::models::Entry;
use pi_lottery::services::QuizAdVerifier;
use pi_lottery::{AppResult, AppState};
use uuid::Uuid;

/// Config with a short ad so flows can be driven in a few ticks
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.ads.watch_seconds = 5;
    config
}

/// App state with every lottery instance already open
pub async fn open_state(config: AppConfig) -> AppState {
    let state = AppState::new(config);
    state
        .lottery_service
        .open_all(Utc::now())
        .await
        .expect("Failed to open lottery instances");
    state
}

/// Drive an ad session up to a verified proof; returns the session id
pub async fn watch_and_verify(state: &AppState, lottery_type_id: &str, user_id: &str) -> AppResult<Uuid> {
    let service = &state.lottery_service;
    let session = service.start_ad_watch(lottery_type_id, user_id).await?;
    service
        .tick_ad_watch(session.id, state.config.ads.watch_seconds)
        .await?;

    let question = match service.request_verification(session.id).await? {
        AdWatchState::Verification { question } => question,
        other => panic!("expected verification step, got {:?}", other),
    };
    let answer = QuizAdVerifier::correct_answer(&question.id).expect("question from bank");
    service.answer_verification(session.id, answer).await?;
    Ok(session.id)
}

/// Drive an ad session from start to redeemed ticket
pub async fn watch_ad_and_enter(state: &AppState, lottery_type_id: &str, user_id: &str) -> AppResult<Entry> {
    let session_id = watch_and_verify(state, lottery_type_id, user_id).await?;
    state.lottery_service.enter_with_ad(session_id).await
}

/// Config whose sandbox gateway takes `latency_ms` per call
pub fn slow_gateway_config(latency_ms: u64) -> AppConfig {
    let mut config = test_config();
    config.pi.payment_latency_ms = latency_ms;
    config
}
