//! Infrastructure layer - storage, crypto and external services

pub mod account;
pub mod auth;
pub mod gateway;
pub mod logging;
pub mod password;
pub mod store;
pub mod token;
