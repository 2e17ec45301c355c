//! Common types module for the relay solver system.
//!
//! This module defines the core data types and contracts used throughout
//! the solver library. It provides a centralized location for shared types
//! to ensure consistency across all chain adapters and the persistence
//! layer.

/// Chain configuration, chain families and the capability contracts.
pub mod chain;
/// The closed error taxonomy used at every crate boundary.
pub mod errors;
/// Chain events observed on source chains.
pub mod events;
/// Intents and their durable lifecycle states.
pub mod intent;
/// Quotes and their immutable pricing parameters.
pub mod quote;
/// RPC subscription mode selection.
pub mod subscription;
/// Destination-side transactions and their tri-valued status.
pub mod transaction;
/// Formatting and conversion helpers.
pub mod utils;

pub use chain::{
	BalanceProvider, ChainConfig, ChainType, EventHandler, GasEstimator, TransactionSender,
	TransactionWatcher,
};
pub use errors::RelayError;
pub use events::{ChainEvent, EventMetadata};
pub use intent::{Intent, IntentStatus, SubStatus};
pub use quote::{Parameters, Quote};
pub use subscription::SubscriptionMode;
pub use transaction::{Transaction, TransactionMetadata, TransactionStatus};
pub use utils::{
	current_timestamp, format_token_amount, truncate_id, with_0x_prefix, without_0x_prefix,
};
