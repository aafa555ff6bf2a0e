//! Shared configuration, identifiers, and errors for the cadence workspace.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
