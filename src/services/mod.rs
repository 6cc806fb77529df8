pub mod ad_verifier;
pub mod lottery_service;
pub mod payment_gateway;

pub use ad_verifier::{AdVerifier, QuizAdVerifier, VerificationOutcome};
pub use lottery_service::{AdSession, LotteryService, PaymentAttempt};
pub use payment_gateway::{Payment, PaymentGateway, PaymentStatus, SandboxPaymentGateway};
