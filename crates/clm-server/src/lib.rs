//! CLM REST server library: router, handlers, envelope and configuration.
//!
//! The binary in `main.rs` wires these to Postgres; tests wire them to
//! `clm_core::store_memory::MemoryStore`.

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
