//! Shared validation helpers for adapter inputs and the command codec.

/// Returns `true` if every byte of `s` is in the printable ASCII range
/// `0x20..=0x7E` (space through tilde, inclusive).
///
/// Used for WiFi SSIDs, portal form fields, and locker ids.
pub(crate) fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}
