//! Authentication service

mod service;

pub use service::{
    AuthService, AuthServiceDeps, AuthenticatedSession, IssuedChallenge, LoginGrant,
    DEFAULT_OTP_TTL_MINUTES,
};
