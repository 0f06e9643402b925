//! Readonly Core - Shared functionality for the readonly guard
//!
//! Everything the guard persists lives in the assistant's home directory,
//! next to the settings document the assistant itself reads.

pub mod paths;

pub use paths::Paths;
