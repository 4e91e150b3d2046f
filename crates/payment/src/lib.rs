//! Payment authorization boundary.
//!
//! This crate contains the authorizer **contract** plus the mock gateway the
//! engine ships with. A real gateway integration replaces
//! [`MockPaymentAuthorizer`] behind the same trait; nothing in the checkout
//! path changes.

pub mod authorizer;

pub use authorizer::{
    MockPaymentAuthorizer, PaymentAuthorizer, PaymentOutcome, TOKEN_FAILURE, TOKEN_SUCCESS,
};
