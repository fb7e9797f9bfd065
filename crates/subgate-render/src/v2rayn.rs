//! Aggregated-link subscription rendering (v2rayN format).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use subgate_link::inject_remark;
use subgate_store::{CustomerRecord, Slot};

use crate::slot_remark;

/// Render the aggregated-link subscription body.
///
/// Emits the effective share link of each slot with the customer's remark
/// injected, primary first, joined by a single newline, and base64-encodes
/// the whole blob (standard alphabet, padded, no line wrapping, no trailing
/// newline). Never skips a slot: a share link is renderable even when the
/// codec cannot decode it.
pub fn render_v2rayn(record: &CustomerRecord) -> String {
    let lines: Vec<String> = Slot::ALL
        .into_iter()
        .map(|slot| {
            let node = record.effective_node(slot);
            inject_remark(&node.share, &slot_remark(record, slot))
        })
        .collect();

    STANDARD.encode(lines.join("\n"))
}
