// Process-wide flags, set once before any filesystem call.

use core::sync::atomic::{AtomicBool, Ordering};

static CASE_INSENSITIVE_FOPEN: AtomicBool = AtomicBool::new(false);

/// Whether path components are matched case-insensitively on filesystems
/// that are otherwise case-sensitive (Rock Ridge names, LFNs).
pub fn case_insensitive_fopen() -> bool {
    CASE_INSENSITIVE_FOPEN.load(Ordering::Relaxed)
}

pub fn set_case_insensitive_fopen(value: bool) {
    CASE_INSENSITIVE_FOPEN.store(value, Ordering::Relaxed);
}
