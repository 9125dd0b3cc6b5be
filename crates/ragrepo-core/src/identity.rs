//! Deterministic IDs for files and chunks (C4).
//!
//! `sha1_id` is a byte-for-byte wire contract: re-implementations must
//! match it exactly, because IDs double as the vector store's upsert key
//! (invariant 1, spec §3) -- reindexing the same coordinates must produce
//! the same ID, never a duplicate row.

use sha1::{Digest, Sha1};

/// Compute the deterministic SHA-1 ID for a file or chunk record.
///
/// For file-level IDs, pass `None` for both line numbers -- the line
/// fields become empty strings in the canonical form, not `"0"`.
pub fn sha1_id(repo_id: &str, path: &str, start_line: Option<u32>, end_line: Option<u32>) -> String {
    let start = start_line.map(|n| n.to_string()).unwrap_or_default();
    let end = end_line.map(|n| n.to_string()).unwrap_or_default();
    let canonical = format!("{repo_id}:{path}:{start}:{end}");

    let mut hasher = Sha1::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_uses_empty_line_fields() {
        let with_none = sha1_id("x/y@main", "a/b.py", None, None);
        let with_zero = sha1_id("x/y@main", "a/b.py", Some(0), Some(0));
        assert_ne!(with_none, with_zero);
    }

    #[test]
    fn id_is_stable() {
        let a = sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        let b = sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn different_coordinates_differ() {
        let a = sha1_id("x/y@main", "a/b.py", Some(1), Some(40));
        let b = sha1_id("x/y@main", "a/b.py", Some(1), Some(41));
        assert_ne!(a, b);
    }

    #[test]
    fn different_repo_id_differs() {
        let a = sha1_id("x/y@main", "a/b.py", None, None);
        let b = sha1_id("x/y@dev", "a/b.py", None, None);
        assert_ne!(a, b);
    }
}
