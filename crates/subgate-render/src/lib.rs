//! Subscription renderers for subgate.
//!
//! Two client-consumable output formats over the same effective-node
//! resolution:
//!
//! - [`render_v2rayn`] — aggregated share links, newline-joined and
//!   base64-encoded as one blob
//! - [`render_clash`] — a structured YAML document listing typed proxies
//!   and one selection group
//!
//! Both render the slots in fixed primary-then-backup order and derive the
//! per-slot remark from the customer's display name plus a fixed suffix.

mod clash;
mod error;
mod v2rayn;

pub use clash::render_clash;
pub use error::RenderError;
pub use v2rayn::render_v2rayn;

use subgate_store::{CustomerRecord, Slot};

/// Fixed remark suffix for a slot.
pub fn slot_suffix(slot: Slot) -> &'static str {
    match slot {
        Slot::Primary => "-primary-accelerated",
        Slot::Backup => "-backup-direct",
    }
}

/// Remark rendered for a slot: display name plus the fixed suffix.
pub(crate) fn slot_remark(record: &CustomerRecord, slot: Slot) -> String {
    format!("{}{}", record.display_name(slot), slot_suffix(slot))
}
