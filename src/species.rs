//! Domain model: the species record handed to the game once selection
//! succeeds. Records are built once by the evaluator (or the offline
//! catalog) and never mutated afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Higher taxonomy of a species; every level is optional because the
/// backbone taxonomy is incomplete for many records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub kingdom: Option<String>,
    pub phylum: Option<String>,
    pub class: Option<String>,
    pub order: Option<String>,
    pub family: Option<String>,
    pub genus: Option<String>,
}

/// An image URL with whatever attribution the source provided.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesImage {
    pub url: String,
    pub attribution: Option<String>,
}

/// Where a species is established, as reported by the distribution facet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub locality: Option<String>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub establishment_means: Option<String>,
}

/// The unit of play: one fully assembled species record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    /// Taxon key in the remote taxonomy, stable for the session.
    pub taxon_key: i64,

    /// Canonical binomial name; always non-empty.
    pub scientific_name: String,

    /// Best localized common name, when one exists.
    pub vernacular_name: Option<String>,

    pub taxonomy: Taxonomy,

    /// Total known observation records.
    pub occurrence_count: u64,

    pub image: Option<SpeciesImage>,

    /// Description-category (habitat, biology, morphology, ...) to free text.
    pub descriptions: HashMap<String, String>,

    pub distributions: Vec<Distribution>,

    pub habitat: Option<String>,

    pub threat_status: Option<String>,

    /// True when sourced from the offline catalog rather than the live service.
    pub is_offline: bool,
}

impl Species {
    /// Name shown to the player: common name when known, else the binomial.
    pub fn display_name(&self) -> &str {
        self.vernacular_name
            .as_deref()
            .unwrap_or(&self.scientific_name)
    }
}
