//! Durable session storage for the onboarding flow.
//!
//! Holds the phone number, pending registration draft and issued auth token
//! across restarts. The store is the source of truth; in-memory copies held
//! by flow components are caches that re-hydrate from it.

mod error;
mod session;
mod store;

pub use error::StoreError;
pub use session::{Session, SessionKey};
pub use store::{FileStore, MemoryStore, Store};
