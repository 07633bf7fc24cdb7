// 🏷️ Name-Pattern Resolver - Rules as Data
// Curated title patterns for records with no coordinates and no usable address.
//
// Two passes: regional nicknames resolve straight to a territory, then
// single-subdivision patterns go through the normal subdivision → territory
// mapping. First match wins.

use crate::catalog::{Catalog, TerritoryMatch};
use anyhow::{Context as AnyhowContext, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// PATTERN DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum PatternTarget {
    /// Multi-subdivision regional nickname
    Territory(String),
    /// A single subdivision (nickname, landmark or city)
    Subdivision(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamePattern {
    /// Pattern ID for reasoning trails
    pub id: String,

    /// Case-insensitive whole-word phrase. `*` stands for any run of
    /// separators, so "nor*cal" matches "NorCal", "Nor Cal" and "Nor-Cal".
    pub pattern: String,

    pub target: PatternTarget,

    /// Priority inside its pass (higher = tried first)
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default)]
    pub description: Option<String>,
}

fn default_priority() -> i32 {
    0
}

impl NamePattern {
    pub fn territory(id: &str, pattern: &str, territory: &str) -> Self {
        NamePattern {
            id: id.to_string(),
            pattern: pattern.to_string(),
            target: PatternTarget::Territory(territory.to_string()),
            priority: 10,
            description: None,
        }
    }

    pub fn subdivision(id: &str, pattern: &str, subdivision: &str) -> Self {
        NamePattern {
            id: id.to_string(),
            pattern: pattern.to_string(),
            target: PatternTarget::Subdivision(subdivision.to_string()),
            priority: 10,
            description: None,
        }
    }

    pub fn is_regional(&self) -> bool {
        matches!(self.target, PatternTarget::Territory(_))
    }

    /// Check if the pattern occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        let pattern_lower = self.pattern.to_lowercase();
        let parts: Vec<&str> = pattern_lower
            .split('*')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            return false;
        }

        let text_lower = text.to_lowercase();
        let bytes = text_lower.as_bytes();
        let is_word = |b: u8| b.is_ascii_alphanumeric();

        let mut from = 0;
        while let Some(found) = text_lower[from..].find(parts[0]) {
            let start = from + found;
            from = start + 1;
            while from < text_lower.len() && !text_lower.is_char_boundary(from) {
                from += 1;
            }

            if start > 0 && is_word(bytes[start - 1]) {
                continue;
            }

            // Remaining parts follow in order, separated only by non-word chars
            let mut pos = start + parts[0].len();
            let mut ok = true;
            for part in &parts[1..] {
                while pos < bytes.len() && !is_word(bytes[pos]) {
                    pos += 1;
                }
                if text_lower[pos..].starts_with(part) {
                    pos += part.len();
                } else {
                    ok = false;
                    break;
                }
            }

            if ok && (pos == bytes.len() || !is_word(bytes[pos])) {
                return true;
            }
        }

        false
    }
}

// ============================================================================
// PATTERN MATCH
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub pattern_id: String,
    pub territory: String,
    /// Set for single-subdivision patterns
    pub subdivision: Option<String>,
    pub regional: bool,
    pub reasoning: Vec<String>,
}

// ============================================================================
// PATTERN RESOLVER
// ============================================================================

pub struct PatternResolver {
    catalog: Arc<Catalog>,
    patterns: Vec<NamePattern>,
}

impl PatternResolver {
    /// Create a resolver from a list of patterns, dropping any whose target
    /// is not in the catalog.
    pub fn from_patterns(catalog: Arc<Catalog>, patterns: Vec<NamePattern>) -> Self {
        let mut patterns: Vec<NamePattern> = patterns
            .into_iter()
            .filter(|p| {
                let known = match &p.target {
                    PatternTarget::Territory(t) => catalog.is_territory(t),
                    PatternTarget::Subdivision(s) => catalog.subdivision(s).is_some(),
                };
                if !known {
                    warn!("dropping name pattern {}: unknown target {:?}", p.id, p.target);
                }
                known
            })
            .collect();

        // Regional pass first, then priority, then longer patterns
        patterns.sort_by(|a, b| {
            b.is_regional()
                .cmp(&a.is_regional())
                .then(b.priority.cmp(&a.priority))
                .then(b.pattern.len().cmp(&a.pattern.len()))
        });

        PatternResolver { catalog, patterns }
    }

    /// Curated patterns plus every subdivision full name
    pub fn standard(catalog: Arc<Catalog>) -> Self {
        let mut patterns = standard_patterns();
        for sub in catalog.subdivisions() {
            for name in sub.full_names() {
                let mut p = NamePattern::subdivision(
                    &format!("name:{}", name.to_lowercase()),
                    name,
                    &sub.name,
                );
                p.priority = 0;
                patterns.push(p);
            }
        }
        Self::from_patterns(catalog, patterns)
    }

    /// Load patterns from JSON file
    pub fn from_file<P: AsRef<Path>>(catalog: Arc<Catalog>, path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read patterns file: {:?}", path.as_ref()))?;

        let patterns: Vec<NamePattern> =
            serde_json::from_str(&content).context("Failed to parse patterns JSON")?;

        Ok(Self::from_patterns(catalog, patterns))
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Match a title/name against the pattern table
    pub fn resolve(&self, title: &str) -> Option<PatternMatch> {
        if title.trim().is_empty() {
            return None;
        }

        for pattern in &self.patterns {
            if !pattern.matches(title) {
                continue;
            }

            match &pattern.target {
                PatternTarget::Territory(territory) => {
                    return Some(PatternMatch {
                        pattern_id: pattern.id.clone(),
                        territory: territory.clone(),
                        subdivision: None,
                        regional: true,
                        reasoning: vec![format!(
                            "Name matches regional pattern '{}' -> {}",
                            pattern.pattern, territory
                        )],
                    });
                }
                PatternTarget::Subdivision(subdivision) => {
                    let Some(TerritoryMatch { territory, partition, .. }) =
                        self.catalog.resolve_territory(subdivision, Some(title), None)
                    else {
                        continue;
                    };

                    let mut reasoning = vec![format!(
                        "Name matches '{}' -> {}",
                        pattern.pattern, subdivision
                    )];
                    if let Some(decision) = partition {
                        reasoning.push(decision.describe(subdivision));
                    }

                    return Some(PatternMatch {
                        pattern_id: pattern.id.clone(),
                        territory,
                        subdivision: Some(subdivision.clone()),
                        regional: false,
                        reasoning,
                    });
                }
            }
        }

        None
    }
}

// ============================================================================
// STANDARD TABLE
// ============================================================================

pub fn standard_patterns() -> Vec<NamePattern> {
    let regional: &[(&str, &str)] = &[
        ("pacific northwest", "Pacific Northwest"),
        ("pnw", "Pacific Northwest"),
        ("cascadia", "Pacific Northwest"),
        ("nor*cal", "Northern California"),
        ("bay area", "Northern California"),
        ("so*cal", "Southern California"),
        ("inland empire", "Southern California"),
        ("four corners", "Desert Southwest"),
        ("desert southwest", "Desert Southwest"),
        ("front range", "Rocky Mountain"),
        ("rockies", "Rocky Mountain"),
        ("heartland", "Heartland"),
        ("upper midwest", "Upper Midwest"),
        ("twin cities", "Upper Midwest"),
        ("great lakes", "Great Lakes"),
        ("mid*south", "Mid-South"),
        ("low*country", "Southeast"),
        ("mid*atlantic", "Mid-Atlantic"),
        ("dmv", "Mid-Atlantic"),
        ("delmarva", "Mid-Atlantic"),
        ("tri*state", "Metro New York"),
        ("hudson valley", "Upstate New York"),
        ("new england", "New England"),
    ];

    let single: &[(&str, &str)] = &[
        ("lone star", "Texas"),
        ("golden state", "California"),
        ("big apple", "New York"),
        ("empire state", "New York"),
        ("buckeye", "Ohio"),
        ("hoosier", "Indiana"),
        ("sunshine state", "Florida"),
        ("bluegrass", "Kentucky"),
        ("peach state", "Georgia"),
        ("garden state", "New Jersey"),
        ("keystone", "Pennsylvania"),
        ("badger state", "Wisconsin"),
        ("volunteer state", "Tennessee"),
        ("big sky", "Montana"),
        ("grand canyon", "Arizona"),
        ("las vegas", "Nevada"),
        ("reno", "Nevada"),
        ("salt lake", "Utah"),
        ("moab", "Utah"),
        ("boulder", "Colorado"),
        ("denver", "Colorado"),
        ("chicago", "Illinois"),
        ("seattle", "Washington"),
        ("spokane", "Washington"),
        ("boise", "Idaho"),
        ("atlanta", "Georgia"),
        ("miami", "Florida"),
        ("orlando", "Florida"),
        ("nashville", "Tennessee"),
        ("chattanooga", "Tennessee"),
        ("austin", "Texas"),
        ("houston", "Texas"),
        ("dallas", "Texas"),
        ("phoenix", "Arizona"),
        ("tucson", "Arizona"),
        ("boston", "Massachusetts"),
        ("philadelphia", "Pennsylvania"),
        ("pittsburgh", "Pennsylvania"),
        ("detroit", "Michigan"),
        ("minneapolis", "Minnesota"),
        ("milwaukee", "Wisconsin"),
        ("new orleans", "Louisiana"),
        ("albuquerque", "New Mexico"),
        ("anchorage", "Alaska"),
        ("honolulu", "Hawaii"),
        ("los angeles", "California"),
        ("san diego", "California"),
        ("san francisco", "California"),
        ("brooklyn", "New York"),
    ];

    let mut patterns: Vec<NamePattern> = regional
        .iter()
        .map(|(pattern, territory)| {
            NamePattern::territory(&format!("region:{}", pattern), pattern, territory)
        })
        .collect();

    patterns.extend(single.iter().map(|(pattern, subdivision)| {
        NamePattern::subdivision(&format!("place:{}", pattern), pattern, subdivision)
    }));

    patterns
}

// ============================================================================
// TESTS
// ============================================================================
