pub mod lottery_repository;

// Re-export all repositories for convenient access
pub use lottery_repository::{LotteryRepository, TicketReservation};
