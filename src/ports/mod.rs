//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the usecases layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ChainClient` / `ChainConnector`: market program access, one client per run
//! - `IndexRepository`: off-chain market index (query + row patch)
//! - `JobLease`: run-overlap protection keyed by job name
//! - `Clock`: wall-clock source for deadline checks
//! - `RunObserver`: run and candidate outcome telemetry

pub mod chain_client;
pub mod clock;
pub mod index;
pub mod lease;
pub mod observer;
