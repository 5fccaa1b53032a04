//! Requester domain: errors and id/nonce reservations.

pub mod errors;
pub mod reservation;

pub use errors::{RequesterError, Result};
pub use reservation::{NonceReservation, TokenIdReservation};
