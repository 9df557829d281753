//! Cache key derivation.
//!
//! Keys are derived with the same 31-multiplier rolling hash the original
//! client used, so a cache directory written by an earlier build resolves
//! under this one. The hash runs over UTF-16 code units, wraps in signed
//! 32-bit arithmetic, and renders the absolute value in base 10.
//!
//! This is a fast non-cryptographic hash: distinct URLs can collide on the
//! same 32-bit value. Collisions are detected and logged at registration
//! time (see `DiskObjectCache::put`) rather than prevented.

use crate::content::ContentRef;

/// Derive the cache key for a URL.
///
/// Deterministic and pure: the same URL always yields the same key.
pub fn derive_key(url: &str) -> String {
    let mut h: i32 = 0;
    for c in url.encode_utf16() {
        // h * 31 + c, wrapping in i32 like the original 32-bit accumulator
        h = h.wrapping_shl(5).wrapping_sub(h).wrapping_add(c as i32);
    }
    h.unsigned_abs().to_string()
}

/// Filename for the cached object backing a content reference.
pub fn cache_filename(content: &ContentRef) -> String {
    format!("{}{}", derive_key(&content.url), content.kind.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;

    #[test]
    fn test_derive_key_is_stable() {
        let url = "https://cdn.example.com/content/42/v.mp4";
        assert_eq!(derive_key(url), derive_key(url));
    }

    #[test]
    fn test_derive_key_pinned_vector() {
        // Pinned against the original client's hash. If this changes, the
        // cache directory written by earlier builds becomes unreadable.
        assert_eq!(derive_key("https://x/y.jpg"), "203388186");
    }

    #[test]
    fn test_derive_key_trivial_inputs() {
        assert_eq!(derive_key(""), "0");
        assert_eq!(derive_key("a"), "97");
    }

    #[test]
    fn test_derive_key_distinct_urls() {
        assert_ne!(
            derive_key("https://example.com/a.mp4"),
            derive_key("https://example.com/b.mp4")
        );
    }

    #[test]
    fn test_derive_key_is_decimal() {
        let key = derive_key("https://objectstore.example.com/bucket/item-0.bin");
        assert!(key.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_derive_key_non_ascii_url() {
        // UTF-16 code units, not bytes: multi-byte characters hash the
        // same way the original client hashed them.
        let key = derive_key("https://example.com/ré sumé.pdf");
        assert!(key.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(key, derive_key("https://example.com/ré sumé.pdf"));
    }

    #[test]
    fn test_cache_filename_combines_key_and_extension() {
        let content = ContentRef::new("https://x/y.jpg", ContentKind::Image);
        assert_eq!(cache_filename(&content), "203388186.jpg");
    }
}
