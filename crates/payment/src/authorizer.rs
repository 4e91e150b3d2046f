use serde::{Deserialize, Serialize};

/// Mock token that always authorizes.
pub const TOKEN_SUCCESS: &str = "tok_mock_success";

/// Mock token that always declines.
pub const TOKEN_FAILURE: &str = "tok_mock_fail";

/// Classification of a payment token.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    /// The gateway accepted the payment.
    Authorized,
    /// The gateway recognized the token but refused the payment.
    Declined,
    /// The token is not recognized at all.
    Invalid,
}

/// Payment authorization contract.
///
/// Implementations must be pure classification: no side effects, no
/// suspension points. The checkout transaction relies on this when it calls
/// the authorizer before touching any store.
pub trait PaymentAuthorizer: Send + Sync {
    fn authorize(&self, token: &str) -> PaymentOutcome;
}

/// Mock gateway with three fixed outcomes.
///
/// Exactly one token authorizes, exactly one declines, everything else is
/// invalid.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockPaymentAuthorizer;

impl MockPaymentAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

impl PaymentAuthorizer for MockPaymentAuthorizer {
    fn authorize(&self, token: &str) -> PaymentOutcome {
        match token {
            TOKEN_SUCCESS => PaymentOutcome::Authorized,
            TOKEN_FAILURE => PaymentOutcome::Declined,
            _ => PaymentOutcome::Invalid,
        }
    }
}
