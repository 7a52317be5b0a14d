//! Mapping vendor vocabulary onto trailer fields.

use fleetsync_store::TrailerStatus;

const DISCONNECTED: [&str; 3] = ["disconnected", "offline", "inactive"];

/// Map a raw vendor status to a trailer status.
///
/// `disconnected`, `offline` and `inactive` map to `Disconnected`. Everything
/// else, including `stopped`, `active`, `connected`, `online`, unknown and
/// missing statuses, is `Available`.
pub fn map_status(raw: Option<&str>) -> TrailerStatus {
    let Some(raw) = raw.map(str::trim) else {
        return TrailerStatus::Available;
    };

    if DISCONNECTED.iter().any(|s| s.eq_ignore_ascii_case(raw)) {
        TrailerStatus::Disconnected
    } else {
        TrailerStatus::Available
    }
}

/// Unit number for a new trailer: the vendor name with every
/// case-insensitive `trailer` removed, trimmed. Falls back to the external id.
pub fn display_name(name: &str, external_id: &str) -> String {
    const WORD: &str = "trailer";

    let lower = name.to_ascii_lowercase();
    let mut stripped = String::with_capacity(name.len());
    let mut rest = 0;
    while let Some(found) = lower[rest..].find(WORD) {
        let start = rest + found;
        stripped.push_str(&name[rest..start]);
        rest = start + WORD.len();
    }
    stripped.push_str(&name[rest..]);

    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        external_id.trim().to_string()
    } else {
        trimmed.to_string()
    }
}
