//! Use Cases Layer - Reconciliation Workflows
//!
//! Orchestrates domain logic with port interfaces. Each stage of the
//! candidate pipeline is a self-contained operation:
//!
//! - `scanner`: index discovery of candidate rows
//! - `guard`: live chain re-validation of each candidate
//! - `orchestrator`: build, submit and confirm the instruction
//! - `writer`: index write-back after confirmation
//! - `runner`: auth, lease, sequencing and failure isolation
//! - `poll`: bounded polling primitive used for confirmation

pub mod guard;
pub mod orchestrator;
pub mod poll;
pub mod runner;
pub mod scanner;
pub mod writer;

pub use runner::{JobRunner, JobSettings, RunnerPorts};
