//! Shared types for the headless auth workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
