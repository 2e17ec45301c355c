//! EVM chain adapter for the relay solver.
//!
//! Implements every chain capability for EVM-family chains using the
//! Alloy library: gas estimation (EIP-1559 and legacy, with the Linea
//! custom estimator), asset sending, confirmation watching with
//! stuck-transaction replacement and cancellation, deposit event
//! ingestion over WebSocket subscriptions or HTTP polling, and balance
//! lookups.

pub mod balance;
pub mod chain;
pub mod client;
pub mod gas;
pub mod handler;
pub mod sender;
pub mod signer;
pub mod utils;
pub mod validation;
pub mod watcher;

pub use chain::EvmChain;
pub use signer::EvmSigner;
pub use utils::{event_kind, extract_quote_id_from_tx_data, EventKind, ZERO_ADDRESS};
