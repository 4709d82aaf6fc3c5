//! Species evaluation: decide whether a candidate taxon is playable for
//! the requested mode, and if so assemble its full record.
//!
//! Rejections are routine filtering, not failures: every check and every
//! unexpected error converts to `None` so the selector simply moves to
//! the next candidate.

use std::collections::HashMap;

use log::debug;

use crate::config::{GameConfig, GameMode, ModeBounds, TaxonClassTable};
use crate::gbif::{
    DescriptionRecord, DistributionRecord, GbifClient, MediaRecord, TaxonDetail, VernacularName,
};
use crate::species::{Distribution, Species, SpeciesImage, Taxonomy};

/// Taxonomic statuses a playable species may carry.
const ACCEPTED_STATUSES: &[&str] = &["ACCEPTED", "DOUBTFUL"];

pub struct SpeciesEvaluator<'a> {
    client: &'a GbifClient,
    config: &'a GameConfig,
}

impl<'a> SpeciesEvaluator<'a> {
    pub fn new(client: &'a GbifClient, config: &'a GameConfig) -> Self {
        Self { client, config }
    }

    /// Evaluate one candidate. `None` means "not playable, try the next
    /// one"; it is never an error.
    pub async fn evaluate(
        &self,
        taxon_key: i64,
        mode: GameMode,
        taxon_filter: Option<&str>,
    ) -> Option<Species> {
        let (detail, count) = tokio::join!(
            self.client.taxon_detail(taxon_key),
            self.client.count_occurrences(taxon_key),
        );
        let detail = detail.ok()?;
        let count = count.ok()?;

        if let Some(filter) = taxon_filter {
            if !class_filter_accepts(&detail, filter, &self.config.taxon_classes) {
                debug!(
                    "rejecting {}: class {:?} fails the {} filter",
                    taxon_key, detail.class, filter
                );
                return None;
            }
        }

        let name = playable_name(&detail)?;
        if !is_playable(&detail, count, self.config.bounds(mode)) {
            debug!("rejecting {}: not playable for {:?}", taxon_key, mode);
            return None;
        }

        // Facets are independent; a failure on any one yields an empty
        // facet rather than aborting the evaluation.
        let (vernacular, media, descriptions, distributions) = tokio::join!(
            self.client.vernacular_names(taxon_key),
            self.client.media(taxon_key),
            self.client.descriptions(taxon_key),
            self.client.distributions(taxon_key),
        );
        let vernacular = vernacular.unwrap_or_default();
        let media = media.unwrap_or_default();
        let descriptions = descriptions.unwrap_or_default();
        let distributions = distributions.unwrap_or_default();

        let mut image = best_image(&media, &self.config.trusted_image_sources);
        if image.is_none() {
            image = self.client.find_image(&name, Some(taxon_key)).await;
        }

        Some(Species {
            taxon_key,
            scientific_name: name,
            vernacular_name: best_vernacular_name(
                &vernacular,
                &self.config.primary_language,
                &self.config.secondary_language,
            ),
            taxonomy: Taxonomy {
                kingdom: detail.kingdom,
                phylum: detail.phylum,
                class: detail.class,
                order: detail.order,
                family: detail.family,
                genus: detail.genus,
            },
            occurrence_count: count,
            image,
            descriptions: collect_descriptions(&descriptions),
            distributions: collect_distributions(&distributions),
            habitat: detail.habitat,
            threat_status: detail.threat_status,
            is_offline: false,
        })
    }
}

/// Taxon-filter gate. A known filter key requires the detail's class to
/// be the expected class name or one of its declared synonyms; a record
/// without a class cannot be confirmed and is rejected. Unknown filter
/// keys carry no class expectation to verify.
fn class_filter_accepts(detail: &TaxonDetail, filter: &str, table: &TaxonClassTable) -> bool {
    match table.lookup(filter) {
        Some(expected) => expected.matches(detail.class.as_deref().unwrap_or("")),
        None => true,
    }
}

/// Canonical name if present, else the scientific name; `None` when the
/// record has neither.
fn playable_name(detail: &TaxonDetail) -> Option<String> {
    detail
        .canonical_name
        .as_deref()
        .or(detail.scientific_name.as_deref())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
}

/// The playability rules: species rank, occurrence count inside the mode
/// window, and an accepted (or at worst doubtful) taxonomic status.
fn is_playable(detail: &TaxonDetail, occurrence_count: u64, bounds: ModeBounds) -> bool {
    if detail.rank.as_deref() != Some("SPECIES") {
        return false;
    }
    if !bounds.contains(occurrence_count) {
        return false;
    }
    if let Some(status) = detail.taxonomic_status.as_deref() {
        if !ACCEPTED_STATUSES.contains(&status) {
            return false;
        }
    }
    true
}

fn language_matches(language: &str, preference: &str) -> bool {
    language.eq_ignore_ascii_case(preference)
        || language
            .get(..2)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(preference))
}

/// Preferred language first, then the secondary, then whatever is listed.
fn best_vernacular_name(
    names: &[VernacularName],
    primary: &str,
    secondary: &str,
) -> Option<String> {
    let named = |entry: &&VernacularName| entry.vernacular_name.is_some();

    for preference in [primary, secondary] {
        if let Some(entry) = names.iter().filter(named).find(|entry| {
            entry
                .language
                .as_deref()
                .is_some_and(|l| language_matches(l, preference))
        }) {
            return entry.vernacular_name.clone();
        }
    }
    names.iter().find_map(|entry| entry.vernacular_name.clone())
}

/// Best still image from the media facet: a trusted rights holder wins,
/// otherwise the first image-format entry.
fn best_image(media: &[MediaRecord], trusted_sources: &[String]) -> Option<SpeciesImage> {
    let images: Vec<&MediaRecord> = media
        .iter()
        .filter(|m| {
            m.is_still_image()
                && m.format
                    .as_deref()
                    .is_some_and(|f| f.starts_with("image/"))
        })
        .collect();

    let trusted = images.iter().find(|m| {
        m.rights_holder.as_deref().is_some_and(|holder| {
            let holder = holder.to_lowercase();
            trusted_sources.iter().any(|s| holder.contains(s.as_str()))
        })
    });

    trusted.or(images.first()).map(|m| SpeciesImage {
        url: m.identifier.clone().unwrap_or_default(),
        attribution: m.rights_holder.clone().or_else(|| m.license.clone()),
    })
}

/// Category → text, category keys lowercased. Later entries win on
/// duplicate categories.
fn collect_descriptions(records: &[DescriptionRecord]) -> HashMap<String, String> {
    let mut result = HashMap::new();
    for record in records {
        if let (Some(category), Some(text)) = (&record.category, &record.description) {
            result.insert(category.to_lowercase(), text.clone());
        }
    }
    result
}

/// Keep only entries that name an actual place.
fn collect_distributions(records: &[DistributionRecord]) -> Vec<Distribution> {
    records
        .iter()
        .filter(|r| {
            let named = |field: &Option<String>| {
                field.as_deref().is_some_and(|value| !value.trim().is_empty())
            };
            named(&r.locality) || named(&r.country)
        })
        .map(|r| Distribution {
            locality: r.locality.clone(),
            country: r.country.clone(),
            continent: r.continent.clone(),
            establishment_means: r.establishment_means.clone(),
        })
        .collect()
}
