//! Chain Adapters - Solana Market Program Access
//!
//! Provides on-chain access via `solana-client` for:
//! - Per-run RPC connection and signer loading
//! - Canonical decoding of the Anchor `Market` account
//! - Instruction building, signing, submission and status polling

pub mod connector;
pub mod layout;
pub mod rpc;
pub mod signer;

pub use connector::SolanaConnector;
pub use rpc::SolanaChainClient;
