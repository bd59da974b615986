//! voicecoach-core: Evaluation model, statistics, and call lifecycle.
//!
//! This crate defines the evaluation data model, the seams to the external
//! backend, the dashboard statistics fold, and the voice-call state machine
//! that the rest of voicecoach builds on.

pub mod aggregator;
pub mod call;
pub mod error;
pub mod model;
pub mod session;
pub mod statistics;
pub mod traits;
