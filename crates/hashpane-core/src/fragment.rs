#![forbid(unsafe_code)]

//! URL fragment codec.
//!
//! The wire protocol is `#embed_<id>` for one pane or `#embed_<id1>,<id2>,...`
//! for several; IDs are three-digit zero-padded numbers. Any other fragment
//! shape means "nothing requested".
//!
//! The codec is capacity-agnostic: it always decodes the full list and leaves
//! the single-vs-multi policy to the reconciliation layer.

use crate::id::PaneId;

/// Marker prefix that distinguishes pane fragments from foreign ones.
pub const MARKER: &str = "embed";

/// Decode a fragment into the ordered list of requested pane IDs.
///
/// Duplicates are dropped, keeping the first occurrence. Tokens that are not
/// three ASCII digits are skipped. A missing marker decodes to the empty list.
/// The leading `#` is optional so callers may pass either the raw location
/// hash or a pre-stripped fragment.
pub fn decode(fragment: &str) -> Vec<PaneId> {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    let Some(ids) = body.strip_prefix(MARKER).and_then(|r| r.strip_prefix('_')) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for token in ids.split(',') {
        if let Ok(id) = PaneId::parse(token)
            && !out.contains(&id)
        {
            out.push(id);
        }
    }
    out
}

/// Encode a list of pane IDs into the canonical fragment form.
///
/// Duplicates are dropped, keeping the first occurrence. An empty list
/// encodes to the empty string, the "clear the fragment" form.
pub fn encode(ids: &[PaneId]) -> String {
    let mut uniq: Vec<PaneId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !uniq.contains(id) {
            uniq.push(*id);
        }
    }
    if uniq.is_empty() {
        return String::new();
    }

    let mut out = format!("#{MARKER}_");
    for (i, id) in uniq.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&id.to_string());
    }
    out
}

/// The single-ID canonical form, used by capacity-one rewrites.
pub fn single(id: PaneId) -> String {
    format!("#{MARKER}_{id}")
}
