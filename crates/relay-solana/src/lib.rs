//! Solana chain adapter for the relay solver.
//!
//! Implements the chain capabilities with Solana semantics: SPL token
//! transfers with associated-token-account handling and a memo carrying
//! the quote id, fee estimation through `getFeeForMessage`,
//! signature-status confirmation watching with blockhash expiry
//! detection, and token balance lookups. Event ingestion has no
//! subscription transport on this family; the capability stays
//! uninstalled and the façade answers `NotImplemented`.

pub mod balance;
pub mod chain;
pub mod gas;
pub mod sender;
pub mod utils;
pub mod validation;
pub mod watcher;

pub use chain::SolanaChain;
pub use utils::{
	associated_token_address, extract_quote_id_from_logs, keypair_from_base58, lamports_to_sol,
	sol_to_lamports,
};
