//! Chain management for the relay solver.
//!
//! This crate provides the uniform façade over chain-family-specific
//! adapters: a [`Chain`] exposing the capability surface with
//! per-capability locking, a [`ChainBuilder`] that accumulates installed
//! capabilities, the [`ChainFactory`] contract for family-keyed
//! construction and a [`ChainRegistry`] mapping chain ids to live
//! chains.

pub mod builder;
pub mod chain;
pub mod factory;
pub mod registry;

pub use builder::ChainBuilder;
pub use chain::Chain;
pub use factory::ChainFactory;
pub use registry::ChainRegistry;
