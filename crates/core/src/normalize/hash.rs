//! Info-hash validation and magnet URI helpers.

/// Trackers appended to magnet links generated from a bare info hash.
pub const DEFAULT_TRACKERS: &[&str] = &[
    "udp://tracker.opentrackr.org:1337/announce",
    "udp://tracker.openbittorrent.com:80/announce",
    "udp://tracker.torrent.eu.org:451/announce",
    "udp://open.stealth.si:80/announce",
    "udp://exodus.desync.com:6969/announce",
];

fn is_hex40(s: &str) -> bool {
    s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_base32_32(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'A'..=b'Z' | b'2'..=b'7'))
}

/// Normalize an info hash.
///
/// - 40 hex characters are returned lowercase.
/// - 32 base32 characters are returned uppercase.
/// - Otherwise non-hex characters are stripped and the 40-hex rule retried
///   (handles hashes wrapped in whitespace, dashes or markup residue).
///
/// Returns `None` for any other shape.
pub fn normalize_info_hash(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_hex40(trimmed) {
        return Some(trimmed.to_ascii_lowercase());
    }

    let upper = trimmed.to_ascii_uppercase();
    if is_base32_32(&upper) {
        return Some(upper);
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .collect::<String>()
        .to_ascii_lowercase();
    if is_hex40(&cleaned) {
        return Some(cleaned);
    }

    None
}

/// Extract and normalize the `btih:` segment of a magnet URI.
pub fn info_hash_from_magnet(magnet: &str) -> Option<String> {
    let lower = magnet.to_ascii_lowercase();
    let start = lower.find("urn:btih:")? + "urn:btih:".len();
    let rest = &magnet[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    normalize_info_hash(&rest[..end])
}

/// Build a magnet URI from a normalized hash and a display name.
pub fn build_magnet_uri(info_hash: &str, display_name: &str) -> String {
    let mut uri = format!(
        "magnet:?xt=urn:btih:{}&dn={}",
        info_hash,
        urlencoding::encode(display_name)
    );
    for tracker in DEFAULT_TRACKERS {
        uri.push_str("&tr=");
        uri.push_str(&urlencoding::encode(tracker));
    }
    uri
}
