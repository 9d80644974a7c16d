//! Size argument parsing for `size`, `minsize` and `maxsize`.

use thiserror::Error;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// A size argument that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid size '{0}': expected a number optionally followed by k, M or G")]
pub struct SizeParseError(pub String);

/// Parses a byte count with an optional `k`/`M`/`G` suffix (powers of 1024).
///
/// Suffixes are case-insensitive and may be followed by a `b`/`B`
/// (`100kb` == `100k`).
pub fn parse_size(raw: &str) -> Result<u64, SizeParseError> {
    let trimmed = raw.trim();
    let lowered = trimmed.to_ascii_lowercase();
    let without_b = match lowered.strip_suffix('b') {
        Some(rest) if !rest.is_empty() => rest,
        _ => lowered.as_str(),
    };

    let (digits, multiplier) = match without_b.chars().last() {
        Some('k') => (&without_b[..without_b.len() - 1], KB),
        Some('m') => (&without_b[..without_b.len() - 1], MB),
        Some('g') => (&without_b[..without_b.len() - 1], GB),
        _ => (without_b, 1),
    };

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| SizeParseError(trimmed.to_string()))
}
