use crate::flows::{FlowError, FlowResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Steps of the pay-for-tickets modal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PaymentState {
    Review { amount: Decimal, ticket_count: u32 },
    Processing { payment_id: String, amount: Decimal, ticket_count: u32 },
    Success { payment_id: String, ticket_count: u32 },
    Error { message: String, amount: Decimal, ticket_count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEvent {
    /// User confirmed; the gateway created payment `payment_id`
    Confirm(String),
    /// Gateway reported the payment complete
    Completed,
    Failed(String),
    Cancel,
    Retry,
}

impl PaymentState {
    pub fn review(amount: Decimal, ticket_count: u32) -> Self {
        PaymentState::Review { amount, ticket_count }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentState::Review { .. } => "review",
            PaymentState::Processing { .. } => "processing",
            PaymentState::Success { .. } => "success",
            PaymentState::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Success { .. } | PaymentState::Error { .. })
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            PaymentState::Processing { payment_id, .. } | PaymentState::Success { payment_id, .. } => {
                Some(payment_id)
            }
            _ => None,
        }
    }

    pub fn transition(self, event: PaymentEvent) -> FlowResult<PaymentState> {
        use PaymentEvent as E;
        use PaymentState as S;

        match (self, event) {
            (S::Review { amount, ticket_count }, E::Confirm(payment_id)) => Ok(S::Processing {
                payment_id,
                amount,
                ticket_count,
            }),
            (S::Review { amount, ticket_count }, E::Failed(message)) => Ok(S::Error {
                message,
                amount,
                ticket_count,
            }),
            (S::Review { amount, ticket_count }, E::Cancel) => Ok(S::Error {
                message: "Payment cancelled".to_string(),
                amount,
                ticket_count,
            }),

            (S::Processing { payment_id, ticket_count, .. }, E::Completed) => {
                Ok(S::Success { payment_id, ticket_count })
            }
            (S::Processing { amount, ticket_count, .. }, E::Failed(message)) => Ok(S::Error {
                message,
                amount,
                ticket_count,
            }),
            (S::Processing { amount, ticket_count, .. }, E::Cancel) => Ok(S::Error {
                message: "Payment cancelled".to_string(),
                amount,
                ticket_count,
            }),

            (S::Error { amount, ticket_count, .. }, E::Retry) => Ok(S::Review { amount, ticket_count }),

            (state @ S::Success { .. }, event) => Err(FlowError::Finished(format!(
                "{:?} after {}",
                event,
                state.name()
            ))),

            (state, event) => Err(FlowError::InvalidTransition {
                state: state.name().to_string(),
                event: format!("{:?}", event),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_happy_path() {
        let state = PaymentState::review(Decimal::new(2, 0), 2)
            .transition(PaymentEvent::Confirm("pay_123".to_string()))
            .unwrap();
        assert_eq!(state.payment_id(), Some("pay_123"));

        let state = state.transition(PaymentEvent::Completed).unwrap();
        assert_eq!(
            state,
            PaymentState::Success { payment_id: "pay_123".to_string(), ticket_count: 2 }
        );
    }

    #[test]
    fn test_failure_keeps_order_for_retry() {
        let state = PaymentState::review(Decimal::ONE, 1)
            .transition(PaymentEvent::Confirm("pay_1".to_string()))
            .unwrap()
            .transition(PaymentEvent::Failed("Wallet rejected".to_string()))
            .unwrap();
        assert_eq!(state.name(), "error");

        let state = state.transition(PaymentEvent::Retry).unwrap();
        assert_eq!(state, PaymentState::review(Decimal::ONE, 1));
    }

    #[test]
    fn test_complete_without_confirm_is_invalid() {
        let err = PaymentState::review(Decimal::ONE, 1)
            .transition(PaymentEvent::Completed)
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidTransition { .. }));
    }
}
