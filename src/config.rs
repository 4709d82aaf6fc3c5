//! Configuration for species selection.

use serde::{Deserialize, Serialize};

/// Game modes, ordered from most to least common species.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Widely observed species, easy to recognize.
    Popular,
    /// Moderately observed species.
    Discovery,
    /// Rarely observed species.
    Expert,
    /// Constrained to one taxonomic class chosen by the player.
    Thematic,
}

/// Occurrence-count window a species must fall into to be playable.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ModeBounds {
    pub min_occurrences: u64,
    pub max_occurrences: u64,
}

impl ModeBounds {
    pub fn contains(&self, count: u64) -> bool {
        count >= self.min_occurrences && count <= self.max_occurrences
    }
}

/// One row of the taxon-filter table: a filter key the player can select,
/// the taxonomic class it stands for, and the class-name variants the
/// backbone taxonomy uses for the same group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxonClassEntry {
    /// Opaque filter key, also a valid taxon key in the remote taxonomy.
    pub filter_key: String,
    /// Canonical class name expected on taxon detail records.
    pub class_name: String,
    /// Accepted synonym class names (e.g. Hexapoda for Insecta).
    pub synonyms: Vec<String>,
}

impl TaxonClassEntry {
    /// Whether a taxon detail's class matches this entry.
    pub fn matches(&self, class: &str) -> bool {
        class == self.class_name || self.synonyms.iter().any(|s| s == class)
    }
}

/// Taxon-filter table. The synonym mappings are curated data, versioned
/// separately from the selection logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaxonClassTable {
    pub version: u32,
    pub entries: Vec<TaxonClassEntry>,
}

impl TaxonClassTable {
    pub fn lookup(&self, filter_key: &str) -> Option<&TaxonClassEntry> {
        self.entries.iter().find(|e| e.filter_key == filter_key)
    }
}

impl Default for TaxonClassTable {
    fn default() -> Self {
        fn entry(filter_key: &str, class_name: &str, synonyms: &[&str]) -> TaxonClassEntry {
            TaxonClassEntry {
                filter_key: filter_key.to_string(),
                class_name: class_name.to_string(),
                synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            }
        }

        Self {
            version: 1,
            entries: vec![
                entry("212", "Aves", &[]),
                entry("359", "Mammalia", &[]),
                entry("216", "Insecta", &["Hexapoda"]),
                entry("11592253", "Squamata", &[]),
                entry("131", "Amphibia", &[]),
                entry("238", "Actinopterygii", &["Osteichthyes"]),
            ],
        }
    }
}

/// Configuration for one selection pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    /// Base URL of the occurrence/taxonomy service.
    pub base_url: String,

    /// Timeout for a single HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Retries after a failed request (404 is never retried).
    pub max_retries: u32,

    /// Delay between retries, in milliseconds.
    pub retry_delay_ms: u64,

    /// Search-then-evaluate rounds before falling back to the offline catalog.
    pub max_selection_attempts: u32,

    /// Candidates evaluated per pool; small to bound worst-case wait.
    pub max_candidates_per_pool: usize,

    /// Budget for evaluating one candidate, in seconds.
    pub evaluation_timeout_secs: u64,

    /// Preferred vernacular-name language.
    pub primary_language: String,

    /// Second-choice vernacular-name language.
    pub secondary_language: String,

    /// Rights-holder substrings marking an image source as trustworthy.
    pub trusted_image_sources: Vec<String>,

    pub popular_bounds: ModeBounds,
    pub discovery_bounds: ModeBounds,
    pub expert_bounds: ModeBounds,

    /// Bounds for modes without a dedicated window (thematic).
    pub default_bounds: ModeBounds,

    pub taxon_classes: TaxonClassTable,
}

impl GameConfig {
    /// Occurrence-count window for a mode.
    pub fn bounds(&self, mode: GameMode) -> ModeBounds {
        match mode {
            GameMode::Popular => self.popular_bounds,
            GameMode::Discovery => self.discovery_bounds,
            GameMode::Expert => self.expert_bounds,
            GameMode::Thematic => self.default_bounds,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gbif.org/v1".to_string(),
            request_timeout_secs: 10,
            max_retries: 3,
            retry_delay_ms: 500,
            max_selection_attempts: 4,
            max_candidates_per_pool: 2,
            evaluation_timeout_secs: 4,
            primary_language: "fr".to_string(),
            secondary_language: "en".to_string(),
            trusted_image_sources: vec![
                "inaturalist".to_string(),
                "wikipedia".to_string(),
                "eol".to_string(),
            ],
            popular_bounds: ModeBounds {
                min_occurrences: 10_000,
                max_occurrences: 1_000_000,
            },
            discovery_bounds: ModeBounds {
                min_occurrences: 1_000,
                max_occurrences: 10_000,
            },
            expert_bounds: ModeBounds {
                min_occurrences: 100,
                max_occurrences: 1_000,
            },
            default_bounds: ModeBounds {
                min_occurrences: 100,
                max_occurrences: 1_000_000,
            },
            taxon_classes: TaxonClassTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_bounds() {
        let config = GameConfig::default();

        let popular = config.bounds(GameMode::Popular);
        assert!(popular.contains(10_000));
        assert!(popular.contains(1_000_000));
        assert!(!popular.contains(9_999));
        assert!(!popular.contains(1_000_001));

        let expert = config.bounds(GameMode::Expert);
        assert!(expert.contains(100));
        assert!(!expert.contains(5));
    }

    #[test]
    fn test_taxon_class_synonyms() {
        let table = TaxonClassTable::default();

        let insects = table.lookup("216").unwrap();
        assert!(insects.matches("Insecta"));
        assert!(insects.matches("Hexapoda"));
        assert!(!insects.matches("Arachnida"));

        let birds = table.lookup("212").unwrap();
        assert!(birds.matches("Aves"));
        assert!(!birds.matches("Reptilia"));

        assert!(table.lookup("999999").is_none());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = GameConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: GameConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url, config.base_url);
        assert_eq!(back.taxon_classes.entries.len(), config.taxon_classes.entries.len());
    }
}
