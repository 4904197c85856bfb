//! Fixed-format link extraction from free text.
//!
//! The pack only ever needs a handful of rigid patterns (magnet URIs, http(s)
//! URLs, IMDb ids, BitTorrent info hashes), so these are plain character-class
//! scanners rather than a regex dependency.

const MAGNET_PREFIX: &str = "magnet:?xt=urn:btih:";
const BTIH_MARKER: &str = "btih:";

/// Characters allowed inside an extracted http(s) URL.
fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | '?' | '#' | '&' | '=' | ':' | '%')
}

/// Extract the first magnet URI (`magnet:?xt=urn:btih:...`) from `text`,
/// returned exactly as it appears up to the first whitespace or quote.
pub fn extract_magnet(text: &str) -> Option<String> {
    let start = text.find(MAGNET_PREFIX)?;
    let candidate = &text[start..];
    // The info hash must start with at least one alphanumeric character.
    let after_prefix = &candidate[MAGNET_PREFIX.len()..];
    if !after_prefix
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    let end = candidate
        .find(|c: char| c.is_whitespace() || c == '"')
        .unwrap_or(candidate.len());
    Some(candidate[..end].to_string())
}

/// Extract the first http(s) URL from `text`.
pub fn extract_http_url(text: &str) -> Option<String> {
    let start = match (text.find("http://"), text.find("https://")) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    let candidate = &text[start..];
    let end = candidate
        .find(|c: char| !is_url_char(c))
        .unwrap_or(candidate.len());
    Some(candidate[..end].to_string())
}

/// Extract an IMDb identifier (`tt` followed by 7–8 digits) from free text
/// or a full IMDb URL.
pub fn extract_imdb_id(text: &str) -> Option<String> {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find("tt") {
        let at = offset + pos;
        let digits: String = text[at + 2..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .take(8)
            .collect();
        if digits.len() >= 7 {
            return Some(format!("tt{digits}"));
        }
        offset = at + 2;
    }
    None
}

/// Extract the info hash from a magnet URI (the alphanumeric run after
/// `btih:`).
pub fn extract_info_hash(magnet: &str) -> Option<String> {
    let start = magnet.find(BTIH_MARKER)? + BTIH_MARKER.len();
    let hash: String = magnet[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    if hash.is_empty() {
        None
    } else {
        Some(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_magnet_exact() {
        let input = "magnet:?xt=urn:btih:ABCDEF1234567890";
        assert_eq!(extract_magnet(input).as_deref(), Some(input));
    }

    #[test]
    fn test_extract_magnet_from_surrounding_text() {
        let input = "grab magnet:?xt=urn:btih:abc123&dn=some%20name now";
        assert_eq!(
            extract_magnet(input).as_deref(),
            Some("magnet:?xt=urn:btih:abc123&dn=some%20name")
        );
    }

    #[test]
    fn test_extract_magnet_rejects_empty_hash() {
        assert_eq!(extract_magnet("magnet:?xt=urn:btih:"), None);
        assert_eq!(extract_magnet("no link here"), None);
    }

    #[test]
    fn test_extract_http_url_from_surrounding_text() {
        assert_eq!(
            extract_http_url("check http://example.com/file.zip please").as_deref(),
            Some("http://example.com/file.zip")
        );
        assert_eq!(
            extract_http_url("https://example.com/a?b=c&d=e").as_deref(),
            Some("https://example.com/a?b=c&d=e")
        );
        assert_eq!(extract_http_url("nothing to see"), None);
    }

    #[test]
    fn test_extract_imdb_id() {
        assert_eq!(
            extract_imdb_id("https://www.imdb.com/title/tt1234567/").as_deref(),
            Some("tt1234567")
        );
        assert_eq!(extract_imdb_id("tt12345678").as_deref(), Some("tt12345678"));
        assert_eq!(extract_imdb_id("tt123"), None);
        assert_eq!(extract_imdb_id("the matrix"), None);
    }

    #[test]
    fn test_extract_info_hash() {
        assert_eq!(
            extract_info_hash("magnet:?xt=urn:btih:ABC123&dn=x").as_deref(),
            Some("ABC123")
        );
        assert_eq!(extract_info_hash("magnet:?xt=urn:btih:"), None);
    }
}
