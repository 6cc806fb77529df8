//! Pi Lottery Library
//!
//! Prize distribution, entry flows and lottery bookkeeping for the Pi
//! Network lottery platform. The binary wires these together; tests and
//! other consumers use them directly.

pub mod config;
pub mod display;
pub mod error;
pub mod flows;
pub mod models;
pub mod prize;
pub mod realtime;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use prize::{compute_prize_distribution, PrizeDistribution};

use realtime::NotificationHub;
use repositories::LotteryRepository;
use services::{LotteryService, QuizAdVerifier, SandboxPaymentGateway};
use std::sync::Arc;

/// Service wired to the sandbox gateway and quiz verifier
pub type SandboxLotteryService = LotteryService<SandboxPaymentGateway, QuizAdVerifier>;

/// Application state shared by the binary and integration tests
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub repo: Arc<LotteryRepository>,
    pub gateway: Arc<SandboxPaymentGateway>,
    pub verifier: Arc<QuizAdVerifier>,
    pub hub: NotificationHub,
    pub lottery_service: Arc<SandboxLotteryService>,
}

impl AppState {
    /// Build the repository and services from configuration
    pub fn new(config: AppConfig) -> Self {
        let config = Arc::new(config);
        let repo = Arc::new(LotteryRepository::new(config.lottery_types.clone()));
        let gateway = Arc::new(SandboxPaymentGateway::new(config.pi.payment_latency()));
        let secret = config
            .pi
            .api_key
            .clone()
            .unwrap_or_else(|| "sandbox".to_string());
        let verifier = Arc::new(QuizAdVerifier::new(secret));
        let hub = NotificationHub::default();

        let lottery_service = Arc::new(LotteryService::new(
            config.clone(),
            repo.clone(),
            gateway.clone(),
            verifier.clone(),
            hub.clone(),
        ));

        Self {
            config,
            repo,
            gateway,
            verifier,
            hub,
            lottery_service,
        }
    }
}
