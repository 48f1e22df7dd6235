//! Index Adapters - Off-chain Market Index
//!
//! PostgREST (Supabase) client implementing `IndexRepository`.

pub mod postgrest;

pub use postgrest::PostgrestIndex;
