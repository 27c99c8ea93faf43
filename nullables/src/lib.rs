//! Nullable infrastructure for deterministic testing.
//!
//! The clock, the node RPC boundary and persistence are abstracted behind
//! traits. This crate provides in-memory implementations that return
//! deterministic values, can be scripted from a test, and never touch the
//! filesystem or network.

pub mod clock;
pub mod node;
pub mod store;

pub use clock::NullClock;
pub use node::NullNode;
pub use store::NullStore;
