//! CLM core: contract domain types, store ports and lifecycle orchestration.
//!
//! Persistence lives behind the traits in [`ports`]; `clm-postgres` provides
//! the production adapters and [`store_memory::MemoryStore`] an in-process one.

pub mod columns;
pub mod contract_number;
pub mod error;
pub mod export;
pub mod milestones;
pub mod ports;
pub mod service;
pub mod store_memory;
pub mod types;

pub use columns::{ContractColumn, ContractPatch, FieldValue};
pub use error::ClmError;
pub use service::ContractService;
