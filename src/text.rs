// 🔤 Text Resolver - pull a subdivision out of free-form address text
//
// Two passes over the text:
//   1. full names (and aliases), longest first, case-insensitive
//   2. postal abbreviations, uppercase only, postal context before bare tokens
// Any candidate directly followed by a street suffix ("Washington Ave") is
// rejected. Abbreviations that are also compass directions ("NE") only count
// after ", " or before a 5-digit postal code.

use crate::catalog::{Catalog, Subdivision};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Compass tokens that collide with postal abbreviations
pub const DIRECTIONAL_TOKENS: &[&str] = &["N", "S", "E", "W", "NE", "NW", "SE", "SW"];

/// Lowercase street-type words, full and abbreviated
pub const STREET_SUFFIXES: &[&str] = &[
    "street", "st", "avenue", "ave", "av", "road", "rd", "boulevard", "blvd", "drive", "dr",
    "lane", "ln", "way", "court", "ct", "place", "pl", "parkway", "pkwy", "highway", "hwy",
    "circle", "cir", "terrace", "ter", "trail", "trl", "pike", "square", "sq",
];

/// Trailing designators for the United States itself
const DOMESTIC_COUNTRY_SUFFIXES: &[&str] = &[
    ", united states of america",
    ", united states",
    ", u.s.a.",
    ", u.s.a",
    ", usa",
    ", u.s.",
    ", us",
];

const CANADIAN_PROVINCES: &[&str] = &[
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

// ============================================================================
// PHRASE MATCHING HELPERS
// ============================================================================

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// Byte offsets of every case-insensitive whole-word occurrence of `phrase`
pub fn phrase_occurrences(text: &str, phrase: &str) -> Vec<usize> {
    if phrase.is_empty() {
        return Vec::new();
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`
    let hay = text.to_ascii_lowercase();
    let needle = phrase.to_ascii_lowercase();
    let bytes = hay.as_bytes();
    let needle_bytes = needle.as_bytes();
    let starts_with_word = is_word_byte(needle_bytes[0]);
    let ends_with_word = is_word_byte(needle_bytes[needle_bytes.len() - 1]);

    let mut out = Vec::new();
    let mut from = 0;
    while let Some(pos) = hay[from..].find(&needle) {
        let start = from + pos;
        let end = start + needle.len();

        let left_ok = !starts_with_word || start == 0 || !is_word_byte(bytes[start - 1]);
        let right_ok = !ends_with_word || end == bytes.len() || !is_word_byte(bytes[end]);
        if left_ok && right_ok {
            out.push(start);
        }

        // Advance past the first char of this hit, staying on a char boundary
        from = start + hay[start..].chars().next().map(char::len_utf8).unwrap_or(1);
    }
    out
}

/// First case-insensitive whole-word occurrence of `phrase`
pub fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    phrase_occurrences(text, phrase).into_iter().next()
}

/// The alphanumeric token starting at `start`, if any
fn token_at(text: &str, start: usize) -> &str {
    let rest = &text[start..];
    let len = rest.bytes().take_while(|b| is_word_byte(*b)).count();
    &rest[..len]
}

/// True when `text[end..]` is a space followed by a street-type word
pub fn followed_by_street_suffix(text: &str, end: usize) -> bool {
    let rest = &text[end..];
    if !rest.starts_with(' ') {
        return false;
    }
    let word_start = end + (rest.len() - rest.trim_start_matches(' ').len());
    let word = token_at(text, word_start).to_ascii_lowercase();
    !word.is_empty() && STREET_SUFFIXES.contains(&word.as_str())
}

fn preceded_by_comma_space(text: &str, start: usize) -> bool {
    text[..start].ends_with(", ")
}

/// True when `text[end..]` is whitespace then exactly five digits
fn followed_by_postal_code(text: &str, end: usize) -> bool {
    let rest = &text[end..];
    let trimmed = rest.trim_start_matches(' ');
    if trimmed.len() == rest.len() {
        return false;
    }
    let digits = trimmed.bytes().take_while(|b| b.is_ascii_digit()).count();
    let after = trimmed.as_bytes().get(digits);
    digits == 5 && !after.map(|b| is_word_byte(*b)).unwrap_or(false)
}

/// Alphanumeric tokens with their byte offsets
fn tokens(text: &str) -> Vec<(usize, &str)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if is_word_byte(bytes[i]) {
            let start = i;
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            out.push((start, &text[start..i]));
        } else {
            i += 1;
        }
    }
    out
}

/// Strip trailing country designators. A trailing ", CA" is the Canada
/// country code when the text also names Canada or a province.
pub fn strip_country_noise(text: &str) -> &str {
    let mut current = text.trim_end();

    loop {
        let lower = current.to_ascii_lowercase();
        let domestic = DOMESTIC_COUNTRY_SUFFIXES
            .iter()
            .find(|suffix| lower.ends_with(*suffix));

        if let Some(suffix) = domestic {
            current = current[..current.len() - suffix.len()].trim_end();
            continue;
        }

        if current.ends_with(", CA") {
            let head = &current[..current.len() - 4];
            let canadian = find_phrase(head, "canada").is_some()
                || CANADIAN_PROVINCES.iter().any(|code| {
                    phrase_occurrences(head, code)
                        .into_iter()
                        .any(|pos| preceded_by_comma_space(head, pos) && &head[pos..pos + 2] == *code)
                });
            if canadian {
                current = head.trim_end();
                continue;
            }
        }

        return current;
    }
}

// ============================================================================
// TEXT MATCH
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    FullName,
    Abbreviation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextMatch {
    /// Canonical subdivision name
    pub subdivision: String,
    /// The exact slice of input that matched
    pub matched: String,
    pub kind: MatchKind,
}

// ============================================================================
// TEXT RESOLVER
// ============================================================================

pub struct TextResolver {
    catalog: Arc<Catalog>,
    /// (full name or alias, canonical name), longest first
    full_names: Vec<(String, String)>,
    /// (abbreviation, canonical name)
    abbreviations: Vec<(String, String)>,
}

impl TextResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let mut full_names: Vec<(String, String)> = catalog
            .subdivisions()
            .iter()
            .flat_map(|s: &Subdivision| {
                s.full_names()
                    .map(|n| (n.to_string(), s.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        // Stable sort: equal lengths keep catalog order
        full_names.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let abbreviations = catalog
            .subdivisions()
            .iter()
            .flat_map(|s| {
                s.abbreviations
                    .iter()
                    .map(|a| (a.to_ascii_uppercase(), s.name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        TextResolver {
            catalog,
            full_names,
            abbreviations,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Find the subdivision named in `text`, if any
    pub fn extract_subdivision(&self, text: &str) -> Option<TextMatch> {
        if text.trim().is_empty() {
            return None;
        }

        let cleaned = strip_country_noise(text);

        self.match_full_name(cleaned)
            .or_else(|| self.match_abbreviation(cleaned))
            .map(|m| {
                debug!("text '{}' -> {} via {:?} '{}'", text, m.subdivision, m.kind, m.matched);
                m
            })
    }

    fn match_full_name(&self, text: &str) -> Option<TextMatch> {
        for (name, canonical) in &self.full_names {
            for start in phrase_occurrences(text, name) {
                let end = start + name.len();
                if followed_by_street_suffix(text, end) {
                    debug!("rejecting '{}' at {}: street name", name, start);
                    continue;
                }
                return Some(TextMatch {
                    subdivision: canonical.clone(),
                    matched: text[start..end].to_string(),
                    kind: MatchKind::FullName,
                });
            }
        }
        None
    }

    /// The rightmost abbreviation in postal context (", XX" or "XX 12345")
    /// wins; a bare token only counts when no such candidate exists.
    fn match_abbreviation(&self, text: &str) -> Option<TextMatch> {
        let mut bare: Option<(&str, &str)> = None;
        let mut postal: Option<(&str, &str)> = None;

        for (start, token) in tokens(text) {
            let Some((abbr, canonical)) = self.abbreviations.iter().find(|(a, _)| a == token) else {
                continue;
            };
            let end = start + token.len();
            let in_context = preceded_by_comma_space(text, start) || followed_by_postal_code(text, end);

            if DIRECTIONAL_TOKENS.contains(&abbr.as_str()) && !in_context {
                debug!("rejecting '{}' at {}: directional without postal context", token, start);
                continue;
            }

            if followed_by_street_suffix(text, end) {
                continue;
            }

            if in_context {
                postal = Some((token, canonical.as_str()));
            } else if bare.is_none() {
                bare = Some((token, canonical.as_str()));
            }
        }

        postal.or(bare).map(|(token, canonical)| TextMatch {
            subdivision: canonical.to_string(),
            matched: token.to_string(),
            kind: MatchKind::Abbreviation,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
