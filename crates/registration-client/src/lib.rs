//! Registration authority client.
//!
//! Talks to the remote service that creates accounts, sends one-time codes
//! and issues auth tokens once a code is verified.

mod client;
mod error;
mod types;

pub use client::{RegistrationAuthority, RegistrationClient};
pub use error::ClientError;
pub use types::*;
