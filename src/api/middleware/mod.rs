//! API middleware

mod session_auth;

pub use session_auth::{auth_header_value, RequireSession};
