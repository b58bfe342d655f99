//! Text helpers
//!
//! Word counting for node metadata and validation of caller-supplied node ids.

use regex::Regex;
use std::sync::OnceLock;

// Filename-safe identifiers: leading alphanumeric, then alphanumerics, `_`, `.` or `-`.
// Generated ids (UUID v4) always match.
const NODE_ID_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_.\-]{0,127}$";

/// Count whitespace-delimited tokens in trimmed content
///
/// # Examples
///
/// ```
/// # use nodespace_outline::utils::word_count;
/// assert_eq!(word_count("  hello   world  "), 2);
/// assert_eq!(word_count(""), 0);
/// ```
pub fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

/// Validate a caller-supplied node id
///
/// Ids must be usable as map keys and as file names by the file-backed store.
///
/// ```
/// # use nodespace_outline::utils::is_valid_node_id;
/// assert!(is_valid_node_id("550e8400-e29b-41d4-a716-446655440000"));
/// assert!(is_valid_node_id("unknownId"));
/// assert!(!is_valid_node_id("../etc/passwd"));
/// assert!(!is_valid_node_id(""));
/// ```
pub fn is_valid_node_id(node_id: &str) -> bool {
    static NODE_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NODE_ID_REGEX.get_or_init(|| Regex::new(NODE_ID_PATTERN).unwrap());
    regex.is_match(node_id)
}
