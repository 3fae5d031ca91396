//! One-time-passcode challenges

mod entity;
mod gateway;
mod store;

pub use entity::{ChallengeId, OtpChallenge, OtpChannel};
pub use gateway::OtpGateway;
pub use store::{AuthStore, OtpChallengeRepository};

#[cfg(test)]
pub use gateway::mock;
