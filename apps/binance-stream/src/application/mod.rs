//! Application Layer - Port definitions.
//!
//! Interfaces that define how the stream sessions talk to the outside
//! world.

/// Port interfaces for the message socket transport.
pub mod ports;
