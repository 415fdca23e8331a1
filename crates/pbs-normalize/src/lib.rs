//! Builder and proposer name normalization.
//!
//! `extra_data` is attacker-controlled and arrives as raw bytes: builders
//! pack it with arbitrary branding, version strings, and occasional
//! emoji. [`normalize_builder_name`] reduces that to a small, stable set
//! of canonical names so the same builder reports under one name across
//! its whole history, with everything unrecognized folding into
//! `"unknown"` rather than spawning a new entity per typo or version
//! bump.

mod table;

use alloy_primitives::{Address, Bytes};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static VERSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/?v?\d+\.\d+(\.\d+)*").expect("static regex"));

static CANONICAL_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| table::CANONICAL_BUILDERS.iter().copied().collect());

static PROPOSER_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| table::PROPOSER_REGISTRY.iter().copied().collect());

/// Normalizes a block's raw `extra_data` into a canonical builder name.
///
/// 1. Decodes as UTF-8, replacing malformed byte sequences.
/// 2. Strips non-printable and non-ASCII characters, including emoji.
/// 3. Strips known version suffixes (`/v?\d+\.\d+[\.\d+]*`).
/// 4. Extracts a candidate domain or leftmost token.
/// 5. Looks the token up in the canonical table; on miss, returns
///    `"unknown"` for recognized client-version noise, else the cleaned
///    token verbatim.
pub fn normalize_builder_name(extra_data: &Bytes) -> String {
    normalize_str(&String::from_utf8_lossy(extra_data))
}

fn normalize_str(raw: &str) -> String {
    let printable: String = raw
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect();

    let stripped = VERSION_SUFFIX.replace_all(&printable, "");
    let token = leftmost_token(stripped.trim());

    let key = token.to_ascii_lowercase();
    if let Some(canonical) = CANONICAL_LOOKUP.get(key.as_str()) {
        return (*canonical).to_string();
    }
    if token.is_empty() || is_unknown_marker(&key) {
        return "unknown".to_string();
    }
    token.to_string()
}

/// `extra_data` commonly carries a `domain/extra bits` shape (e.g.
/// `beaverbuild.org`, `titanbuilder.xyz (titan1)`). The candidate
/// identity is whatever precedes the first `/` or whitespace run.
fn leftmost_token(s: &str) -> &str {
    let cut = s.find(['/', ' ']).unwrap_or(s.len());
    s[..cut].trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.' && c != '-')
}

fn is_unknown_marker(key: &str) -> bool {
    table::UNKNOWN_MARKERS
        .iter()
        .any(|marker| !marker.is_empty() && key.starts_with(marker))
}

/// Looks a proposer up by fee-recipient address in the flat
/// address→entity table. `candidates` carries any additional names a
/// caller has independently associated with this address (e.g. from a
/// relay's own proposer metadata); a collision between the table and the
/// candidates — never expected in practice — breaks deterministically on
/// the lexicographically smallest name, so repeated calls with the same
/// inputs always agree.
pub fn resolve_proposer_name(address: &Address, candidates: &[String]) -> String {
    let key = address.to_string().to_ascii_lowercase();
    let mut names: Vec<String> = candidates.to_vec();
    if let Some(canonical) = PROPOSER_LOOKUP.get(key.as_str()) {
        names.push((*canonical).to_string());
    }
    names.into_iter().min().unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"beaverbuild.org", "beaverbuild")]
    #[case(b"rsync-builder.xyz", "rsync-builder")]
    fn known_builders_normalize_to_canonical(#[case] raw: &[u8], #[case] expected: &str) {
        let extra_data = Bytes::from(raw.to_vec());
        assert_eq!(normalize_builder_name(&extra_data), expected);
    }

    #[test]
    fn geth_version_string_is_unknown() {
        let extra_data = Bytes::from(b"geth/v1.13.5-stable/linux-amd64/go1.21.1".to_vec());
        assert_eq!(normalize_builder_name(&extra_data), "unknown");
    }

    #[test]
    fn empty_extra_data_is_unknown() {
        assert_eq!(normalize_builder_name(&Bytes::new()), "unknown");
    }

    #[test]
    fn emoji_and_control_bytes_are_stripped() {
        let extra_data = Bytes::from("titanbuilder.xyz \u{1F680}\u{0001}".as_bytes().to_vec());
        assert_eq!(normalize_builder_name(&extra_data), "TitanBuilder");
    }

    #[test]
    fn version_suffix_does_not_change_the_match() {
        let a = Bytes::from(b"flashbots".to_vec());
        let b = Bytes::from(b"flashbots/v1.2.3".to_vec());
        assert_eq!(normalize_builder_name(&a), normalize_builder_name(&b));
    }

    #[test]
    fn unrecognized_token_passes_through_cleaned() {
        let extra_data = Bytes::from(b"brandnewbuilder99".to_vec());
        assert_eq!(normalize_builder_name(&extra_data), "brandnewbuilder99");
    }

    /// `normalize(canonical_name) = canonical_name` for every entry in
    /// the table: feeding a canonical display name back through as raw
    /// `extra_data` either matches itself or a lowercase-equivalent key,
    /// it never drifts to a different canonical name or to "unknown".
    #[test]
    fn canonical_names_round_trip() {
        for (_, canonical) in table::CANONICAL_BUILDERS {
            let extra_data = Bytes::from(canonical.as_bytes().to_vec());
            let normalized = normalize_builder_name(&extra_data);
            assert_eq!(normalized, *canonical, "{canonical} normalized to {normalized}");
        }
    }

    #[test]
    fn proposer_tie_break_is_deterministic() {
        let addr = Address::ZERO;
        let candidates = vec!["Zeta".to_string(), "Alpha".to_string(), "Mid".to_string()];
        assert_eq!(resolve_proposer_name(&addr, &candidates), "Alpha");
    }
}
