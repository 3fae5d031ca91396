//! Session/challenge storage backends

mod in_memory;
mod postgres;

pub use in_memory::InMemoryAuthStore;
pub use postgres::PostgresAuthStore;
