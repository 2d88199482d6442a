//! Shared domain types for the ring-relay miner.
//!
//! Everything here is plain data: orders and their mutable fill views, the
//! two-order rings the matcher produces, and the events the relay services
//! exchange over the bus. No I/O lives in this crate.

pub mod common;
pub mod events;
pub mod order;
pub mod ring;

pub use common::*;
pub use events::*;
pub use order::*;
pub use ring::*;
