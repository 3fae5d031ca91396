//! Bearer sessions

mod entity;
mod repository;

pub use entity::{NewSession, Session, SessionId};
pub use repository::SessionRepository;
