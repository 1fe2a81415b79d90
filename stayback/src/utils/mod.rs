//! Utility modules for stayback.

pub mod errors;
pub mod logger;

pub use errors::{Result, StaybackError};
