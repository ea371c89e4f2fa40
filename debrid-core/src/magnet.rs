//! Magnet canonicalization
//!
//! Every magnet handed to a source goes through [`Magnet::new`] so hashes are
//! lowercase hex (32-character base32 hashes are decoded) and links carry the
//! canonical hash. Canonicalization never fails: unusable input simply leaves
//! the corresponding field empty.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

const MAGNET_MARKER: &str = "magnet:?xt=urn:btih:";

// Parameter values are encoded like a URI component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Magnet {
    pub hash: Option<String>,
    pub link: Option<String>,
}

impl Magnet {
    /// Canonicalize a hash/link pair.
    ///
    /// - Hash only: the hash is canonicalized and a link is synthesized.
    /// - Link only: the link is decoded, isolated and rewritten with the
    ///   canonical hash it contains.
    /// - Both: each field is canonicalized independently.
    #[must_use]
    pub fn new(hash: Option<&str>, link: Option<&str>) -> Self {
        Self::with_details(hash, link, None, &[])
    }

    /// Like [`Magnet::new`], with a display name and trackers used when a link
    /// has to be synthesized from the hash.
    #[must_use]
    pub fn with_details(hash: Option<&str>, link: Option<&str>, title: Option<&str>, trackers: &[&str]) -> Self {
        match (hash, link) {
            (Some(hash), None) => {
                let hash = canonical_hash(hash);
                let link = hash.as_deref().map(|h| generate_link(h, title, trackers));
                Self { hash, link }
            }
            (None, Some(link)) => {
                let (link, hash) = parse_link(link);
                Self { hash, link }
            }
            (hash, link) => Self {
                hash: hash.and_then(canonical_hash),
                link: link.and_then(|l| parse_link(l).0),
            },
        }
    }

    #[must_use]
    pub fn from_hash(hash: &str) -> Self {
        Self::new(Some(hash), None)
    }

    #[must_use]
    pub fn from_link(link: &str) -> Self {
        Self::new(None, Some(link))
    }

    /// Display name carried by the link, if any
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        let link = self.link.as_deref()?;
        let query = link.split_once('?')?.1;
        query.split('&').find_map(|pair| {
            let value = pair.strip_prefix("dn=")?;
            percent_decode_str(value).decode_utf8().ok().map(|v| v.replace('+', " "))
        })
    }
}

/// Canonicalize a hash: 32 characters is base32, anything else is hex.
///
/// Returns `None` when a base32 hash does not decode.
#[must_use]
pub fn canonical_hash(raw: &str) -> Option<String> {
    if raw.chars().count() == 32 {
        decode_base32(raw).map(hex::encode)
    } else {
        Some(raw.to_lowercase())
    }
}

/// Build a magnet link for a canonical hash
#[must_use]
pub fn generate_link(hash: &str, title: Option<&str>, trackers: &[&str]) -> String {
    let mut link = format!("{MAGNET_MARKER}{hash}");

    if let Some(title) = title {
        link.push_str("&dn=");
        link.extend(utf8_percent_encode(title, COMPONENT));
    }

    for tracker in trackers {
        if url::Url::parse(tracker).is_ok() {
            link.push_str("&tr=");
            link.extend(utf8_percent_encode(tracker, COMPONENT));
        }
    }

    link
}

fn parse_link(link: &str) -> (Option<String>, Option<String>) {
    let Ok(decoded) = percent_decode_str(link).decode_utf8() else {
        return (None, None);
    };
    let Some(start) = decoded.rfind(MAGNET_MARKER) else {
        return (None, None);
    };

    // The magnet may be wrapped by another scheme (e.g. an app deep link).
    let isolated = &decoded[start..];

    match extract_hash(isolated).and_then(|raw| canonical_hash(raw).map(|hash| (raw, hash))) {
        Some((raw, hash)) => (Some(isolated.replace(raw, &hash)), Some(hash)),
        None => (Some(decoded.to_string()), None),
    }
}

fn extract_hash(link: &str) -> Option<&str> {
    let rest = link.strip_prefix(MAGNET_MARKER)?;
    let token = rest.split('&').next()?;
    (!token.is_empty()).then_some(token)
}

/// RFC 4648 base32, case-insensitive, no padding
fn decode_base32(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0u32;

    for c in input.bytes() {
        let value = match c.to_ascii_uppercase() {
            c @ b'A'..=b'Z' => c - b'A',
            c @ b'2'..=b'7' => c - b'2' + 26,
            _ => return None,
        };
        buffer = (buffer << 5) | u32::from(value);
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            out.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "af1b2c3d4e5f60718293a4b5c6d7e8f901234567";

    #[test]
    fn test_hex_hash_is_lowercased() {
        let magnet = Magnet::from_hash(&HEX.to_uppercase());
        assert_eq!(magnet.hash.as_deref(), Some(HEX));
        assert_eq!(magnet.link, Some(format!("magnet:?xt=urn:btih:{HEX}")));
    }

    #[test]
    fn test_base32_hash_decodes_to_hex() {
        let base32 = "V4NSYPKOL5QHDAUTUS24NV7I7EASGRLH";
        let magnet = Magnet::from_hash(base32);
        let hash = magnet.hash.unwrap();
        assert_eq!(hash.len(), 40);
        assert_eq!(hash, HEX);
        assert_eq!(canonical_hash(&base32.to_lowercase()).as_deref(), Some(HEX));
    }

    #[test]
    fn test_invalid_base32_has_no_hash() {
        let magnet = Magnet::from_hash("0000000000000000000000000000000!");
        assert_eq!(magnet, Magnet::default());
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let first = Magnet::from_link("magnet:?xt=urn:btih:V4NSYPKOL5QHDAUTUS24NV7I7EASGRLH&dn=Some%20Show");
        let second = Magnet::new(first.hash.as_deref(), first.link.as_deref());
        assert_eq!(first, second);
        assert_eq!(Magnet::from_link(first.link.as_deref().unwrap()), first);
    }

    #[test]
    fn test_generated_link_round_trips() {
        let magnet = Magnet::with_details(Some(HEX), None, Some("A Title & More"), &["udp://tracker.example:1337/announce"]);
        let link = magnet.link.clone().unwrap();
        assert!(link.contains("&dn=A%20Title%20%26%20More"));
        assert!(link.contains("&tr=udp%3A%2F%2Ftracker.example%3A1337%2Fannounce"));
        assert_eq!(Magnet::from_link(&link).hash.as_deref(), Some(HEX));
    }

    #[test]
    fn test_invalid_tracker_is_skipped() {
        let link = generate_link(HEX, None, &["not a url"]);
        assert_eq!(link, format!("magnet:?xt=urn:btih:{HEX}"));
    }

    #[test]
    fn test_embedded_link_is_isolated() {
        let wrapped = format!("someapp://open?url=magnet%3A%3Fxt%3Durn%3Abtih%3A{}%26dn%3Dx", HEX.to_uppercase());
        let magnet = Magnet::from_link(&wrapped);
        assert_eq!(magnet.hash.as_deref(), Some(HEX));
        assert_eq!(magnet.link, Some(format!("magnet:?xt=urn:btih:{HEX}&dn=x")));
    }

    #[test]
    fn test_markerless_link_is_unusable() {
        assert_eq!(Magnet::from_link("https://example.com/file.torrent"), Magnet::default());
    }

    #[test]
    fn test_marker_without_hash_keeps_link() {
        let magnet = Magnet::from_link("magnet:?xt=urn:btih:&dn=x");
        assert_eq!(magnet.hash, None);
        assert_eq!(magnet.link.as_deref(), Some("magnet:?xt=urn:btih:&dn=x"));
    }

    #[test]
    fn test_display_name() {
        let magnet = Magnet::from_link(&format!("magnet:?xt=urn:btih:{HEX}&dn=My+Show&tr=x"));
        assert_eq!(magnet.display_name().as_deref(), Some("My Show"));
    }
}
