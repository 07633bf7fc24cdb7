// 🧭 Territory Entity - the unit the engine assigns
// A territory lists its member subdivisions. A subdivision listed by two
// territories is split between them by a partition rule.

use crate::text::find_phrase;
use serde::{Deserialize, Serialize};

// ============================================================================
// TERRITORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Territory {
    /// Canonical name, e.g. "Northern California"
    pub name: String,

    /// Member subdivision names, in catalog order (never empty)
    pub members: Vec<String>,
}

impl Territory {
    pub fn new(name: &str, members: &[&str]) -> Self {
        Territory {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        }
    }

    pub fn has_member(&self, subdivision: &str) -> bool {
        self.members.iter().any(|m| m == subdivision)
    }
}

// ============================================================================
// PARTITION RULE
// ============================================================================

/// A named county or city inside a split subdivision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubArea {
    pub name: String,
    pub territory: String,
}

/// How a split subdivision is divided between two territories.
///
/// Evaluation order: a sub-area named in the hint text, then the latitude
/// threshold, then `default_territory`. Points exactly on the threshold
/// belong to the northern side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionRule {
    pub subdivision: String,
    pub northern: String,
    pub southern: String,
    pub latitude_threshold: f64,
    #[serde(default)]
    pub sub_areas: Vec<SubArea>,
    /// Used when neither a sub-area nor a latitude is available
    pub default_territory: String,
}

/// Which part of a partition rule decided the territory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartitionBasis {
    SubArea(String),
    Latitude,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionDecision {
    pub territory: String,
    pub basis: PartitionBasis,
}

impl PartitionDecision {
    pub fn describe(&self, subdivision: &str) -> String {
        match &self.basis {
            PartitionBasis::SubArea(area) => {
                format!("{} is split; sub-area '{}' belongs to {}", subdivision, area, self.territory)
            }
            PartitionBasis::Latitude => {
                format!("{} is split; latitude places the point in {}", subdivision, self.territory)
            }
            PartitionBasis::Default => {
                format!("{} is split; no sub-area or latitude, defaulted to {}", subdivision, self.territory)
            }
        }
    }
}

impl PartitionRule {
    pub fn territory_for_latitude(&self, latitude: f64) -> &str {
        if latitude >= self.latitude_threshold {
            &self.northern
        } else {
            &self.southern
        }
    }

    /// Find a sub-area named in `text`, longest names first
    pub fn find_sub_area(&self, text: &str) -> Option<&SubArea> {
        let mut areas: Vec<&SubArea> = self.sub_areas.iter().collect();
        areas.sort_by(|a, b| b.name.len().cmp(&a.name.len()));
        areas
            .into_iter()
            .find(|area| find_phrase(text, &area.name).is_some())
    }

    pub fn decide(&self, sub_area_hint: Option<&str>, latitude: Option<f64>) -> PartitionDecision {
        if let Some(area) = sub_area_hint.and_then(|hint| self.find_sub_area(hint)) {
            return PartitionDecision {
                territory: area.territory.clone(),
                basis: PartitionBasis::SubArea(area.name.clone()),
            };
        }

        match latitude.filter(|lat| lat.is_finite()) {
            Some(lat) => PartitionDecision {
                territory: self.territory_for_latitude(lat).to_string(),
                basis: PartitionBasis::Latitude,
            },
            None => PartitionDecision {
                territory: self.default_territory.clone(),
                basis: PartitionBasis::Default,
            },
        }
    }

    /// Every territory this rule can produce
    pub fn territories(&self) -> Vec<&str> {
        let mut out = vec![
            self.northern.as_str(),
            self.southern.as_str(),
            self.default_territory.as_str(),
        ];
        out.extend(self.sub_areas.iter().map(|a| a.territory.as_str()));
        out.sort_unstable();
        out.dedup();
        out
    }
}

// ============================================================================
// STANDARD TABLE
// ============================================================================

pub const NORTHERN_CALIFORNIA: &str = "Northern California";
pub const SOUTHERN_CALIFORNIA: &str = "Southern California";
pub const UPSTATE_NEW_YORK: &str = "Upstate New York";
pub const METRO_NEW_YORK: &str = "Metro New York";

pub fn standard_territories() -> Vec<Territory> {
    vec![
        Territory::new("Pacific Northwest", &["Washington", "Oregon", "Idaho", "Alaska"]),
        Territory::new(NORTHERN_CALIFORNIA, &["California"]),
        Territory::new(SOUTHERN_CALIFORNIA, &["California", "Hawaii"]),
        Territory::new("Desert Southwest", &["Arizona", "Nevada", "New Mexico", "Utah"]),
        Territory::new("Rocky Mountain", &["Colorado", "Wyoming", "Montana"]),
        Territory::new("Heartland", &["Kansas", "Nebraska", "Missouri", "Iowa"]),
        Territory::new("South Central", &["Texas", "Oklahoma"]),
        Territory::new(
            "Upper Midwest",
            &["Minnesota", "Wisconsin", "North Dakota", "South Dakota"],
        ),
        Territory::new("Great Lakes", &["Michigan", "Illinois", "Indiana", "Ohio"]),
        Territory::new(
            "Mid-South",
            &["Tennessee", "Kentucky", "Arkansas", "Louisiana", "Mississippi", "Alabama"],
        ),
        Territory::new(
            "Southeast",
            &["Georgia", "Florida", "South Carolina", "North Carolina"],
        ),
        Territory::new(
            "Mid-Atlantic",
            &[
                "Virginia",
                "West Virginia",
                "Maryland",
                "Delaware",
                "District of Columbia",
                "Pennsylvania",
                "New Jersey",
            ],
        ),
        Territory::new(UPSTATE_NEW_YORK, &["New York"]),
        Territory::new(METRO_NEW_YORK, &["New York"]),
        Territory::new(
            "New England",
            &[
                "Maine",
                "New Hampshire",
                "Vermont",
                "Massachusetts",
                "Rhode Island",
                "Connecticut",
            ],
        ),
    ]
}

fn sub_areas(territory: &str, names: &[&str]) -> Vec<SubArea> {
    names
        .iter()
        .map(|name| SubArea {
            name: name.to_string(),
            territory: territory.to_string(),
        })
        .collect()
}

pub fn standard_partitions() -> Vec<PartitionRule> {
    let mut california = sub_areas(
        NORTHERN_CALIFORNIA,
        &[
            "San Francisco",
            "Alameda",
            "Santa Clara",
            "San Mateo",
            "Marin",
            "Sacramento",
            "Sonoma",
            "Napa",
            "Fresno",
            "Monterey",
            "Oakland",
            "San Jose",
            "Berkeley",
            "Palo Alto",
            "Lake Tahoe",
            "Yosemite",
        ],
    );
    california.extend(sub_areas(
        SOUTHERN_CALIFORNIA,
        &[
            "Los Angeles",
            "San Diego",
            "Orange County",
            "Riverside",
            "San Bernardino",
            "Kern",
            "Santa Barbara",
            "Ventura",
            "San Luis Obispo",
            "Pasadena",
            "Long Beach",
            "Irvine",
            "Anaheim",
            "Santa Monica",
            "Bakersfield",
            "Palm Springs",
            "Joshua Tree",
        ],
    ));

    let mut new_york = sub_areas(
        METRO_NEW_YORK,
        &[
            "New York City",
            "NYC",
            "Manhattan",
            "Brooklyn",
            "Queens",
            "Bronx",
            "Staten Island",
            "Long Island",
            "Nassau",
            "Suffolk",
            "Westchester",
            "Rockland",
        ],
    );
    new_york.extend(sub_areas(
        UPSTATE_NEW_YORK,
        &[
            "Albany",
            "Buffalo",
            "Rochester",
            "Syracuse",
            "Ithaca",
            "Saratoga",
            "Lake Placid",
            "Adirondack",
            "Catskill",
        ],
    ));

    vec![
        PartitionRule {
            subdivision: "California".to_string(),
            northern: NORTHERN_CALIFORNIA.to_string(),
            southern: SOUTHERN_CALIFORNIA.to_string(),
            latitude_threshold: 35.79,
            sub_areas: california,
            default_territory: NORTHERN_CALIFORNIA.to_string(),
        },
        PartitionRule {
            subdivision: "New York".to_string(),
            northern: UPSTATE_NEW_YORK.to_string(),
            southern: METRO_NEW_YORK.to_string(),
            latitude_threshold: 41.3,
            sub_areas: new_york,
            default_territory: UPSTATE_NEW_YORK.to_string(),
        },
    ]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn california() -> PartitionRule {
        standard_partitions()
            .into_iter()
            .find(|p| p.subdivision == "California")
            .unwrap()
    }

    #[test]
    fn test_latitude_threshold_sides() {
        let rule = california();
        assert_eq!(rule.territory_for_latitude(37.77), NORTHERN_CALIFORNIA);
        assert_eq!(rule.territory_for_latitude(34.05), SOUTHERN_CALIFORNIA);
    }

    #[test]
    fn test_latitude_exactly_on_threshold_is_northern() {
        let rule = california();
        let t = rule.latitude_threshold;
        assert_eq!(rule.territory_for_latitude(t), NORTHERN_CALIFORNIA);
        assert_eq!(rule.territory_for_latitude(t + 1e-9), NORTHERN_CALIFORNIA);
        assert_eq!(rule.territory_for_latitude(t - 1e-9), SOUTHERN_CALIFORNIA);
    }

    #[test]
    fn test_sub_area_beats_latitude() {
        let rule = california();
        let decision = rule.decide(Some("Venue near downtown Los Angeles"), Some(38.0));
        assert_eq!(decision.territory, SOUTHERN_CALIFORNIA);
        assert_eq!(decision.basis, PartitionBasis::SubArea("Los Angeles".to_string()));
    }

    #[test]
    fn test_unmatched_hint_falls_back_to_latitude() {
        let rule = california();
        let decision = rule.decide(Some("Somewhere, California"), Some(33.0));
        assert_eq!(decision.territory, SOUTHERN_CALIFORNIA);
        assert_eq!(decision.basis, PartitionBasis::Latitude);
    }

    #[test]
    fn test_default_when_nothing_available() {
        let rule = california();
        let decision = rule.decide(None, None);
        assert_eq!(decision.territory, NORTHERN_CALIFORNIA);
        assert_eq!(decision.basis, PartitionBasis::Default);

        let nan = rule.decide(None, Some(f64::NAN));
        assert_eq!(nan.basis, PartitionBasis::Default);
    }

    #[test]
    fn test_longest_sub_area_wins() {
        let rule = standard_partitions()
            .into_iter()
            .find(|p| p.subdivision == "New York")
            .unwrap();
        let area = rule.find_sub_area("Run in New York City").unwrap();
        assert_eq!(area.name, "New York City");
    }

    #[test]
    fn test_rule_territories_deduplicated() {
        let rule = california();
        assert_eq!(rule.territories(), vec![NORTHERN_CALIFORNIA, SOUTHERN_CALIFORNIA]);
    }

    #[test]
    fn test_territory_membership() {
        let territories = standard_territories();
        let socal = territories.iter().find(|t| t.name == SOUTHERN_CALIFORNIA).unwrap();
        assert!(socal.has_member("California"));
        assert!(socal.has_member("Hawaii"));
        assert!(!socal.has_member("Nevada"));
    }
}
