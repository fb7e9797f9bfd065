//! Customer records and durable storage for subgate.
//!
//! This crate provides:
//!
//! - [`CustomerRecord`] and friends — the persisted data model, including
//!   the pure override resolver ([`CustomerRecord::effective_node`])
//! - [`RecordStore`] — whole-document YAML persistence behind an exclusive
//!   cross-process file lock with atomic replace-on-write
//! - [`CustomerManager`] — create/update/rotate/override/delete lifecycle
//!   operations, thin orchestration over the store
//! - [`generate_token`] — secret token generation
//! - [`cli`] — the `subgate customers` management CLI

pub mod cli;
mod error;
mod manager;
mod record;
mod store;
mod token;

pub use error::StoreError;
pub use manager::{CustomerManager, NewCustomer, RotatedToken, SubscribeUrls};
pub use record::{
    CustomerPatch, CustomerRecord, Node, NodeGroup, OverrideNodes, RecordCollection, Slot,
};
pub use store::RecordStore;
pub use token::{TOKEN_LENGTH, generate_token, mask_token};
