//! Shared types for the authenticated client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
