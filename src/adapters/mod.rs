//! Adapters Layer - Concrete Implementations of Port Traits
//!
//! Each adapter implements one or more port traits and handles
//! the actual I/O with external systems:
//!
//! - `chain`: Solana RPC client, market account decoding, signer loading
//! - `index`: PostgREST client for the off-chain market table
//! - `lease`: process-local job lease
//! - `metrics`: Prometheus registry and health probes
//! - `http`: axum trigger server

pub mod chain;
pub mod http;
pub mod index;
pub mod lease;
pub mod metrics;
