//! Domain model for the language learning core: course catalog,
//! progress tracking, unlock rules, question content, and scoring.
//!
//! Everything here is synchronous and side-effect free. Persistence and
//! anything that touches the network live in the `storage` and
//! `services` crates.

#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod time;
pub mod unlock;

pub use error::Error;
pub use time::Clock;
