//! Session storage.
//!
//! [`SessionStorage`] handles the cookie. Payloads either travel inside the
//! signed cookie or live in a [`SessionRepository`](splatkit_core::session::SessionRepository):
//! - In-memory ([`InMemorySessionRepository`])
//! - SQLite (with `sqlite` feature)

mod inmemory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod storage;

pub use inmemory::InMemorySessionRepository;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSessionRepository;
pub use storage::SessionStorage;

#[cfg(test)]
pub(crate) use storage::cookie_pair;
