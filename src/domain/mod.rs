//! Domain model for the authentication core

pub mod account;
pub mod clock;
mod error;
pub mod otp;
pub mod session;

pub use clock::{Clock, SystemClock};
pub use error::{sort_team_choices, AuthError, TeamChoice};
