//! Domain Layer - Core streaming types.
//!
//! This layer contains the event types published by the stream sessions
//! and the topic/target model used to address streams. No I/O.

/// Market and account event types, topics and stream targets.
pub mod streaming;
