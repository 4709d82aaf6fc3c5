//! Offline species catalog, used when the remote service is unusable.
//!
//! A small hand-curated dataset grouped by taxonomic-class key. Entries
//! are chosen uniformly at random within a class and marked `is_offline`
//! so downstream layers can skip occurrence-bound checks.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::gbif::GbifClient;
use crate::species::{Species, Taxonomy};

struct FallbackEntry {
    class_key: &'static str,
    taxon_key: i64,
    scientific_name: &'static str,
    vernacular_name: &'static str,
    class: &'static str,
    order: &'static str,
    family: &'static str,
    genus: &'static str,
    occurrence_count: u64,
}

#[rustfmt::skip]
static FALLBACK_SPECIES: &[FallbackEntry] = &[
    // Birds (Aves)
    FallbackEntry { class_key: "212", taxon_key: 2498252, scientific_name: "Passer domesticus", vernacular_name: "Moineau domestique", class: "Aves", order: "Passeriformes", family: "Passeridae", genus: "Passer", occurrence_count: 8_567_432 },
    FallbackEntry { class_key: "212", taxon_key: 2482468, scientific_name: "Turdus merula", vernacular_name: "Merle noir", class: "Aves", order: "Passeriformes", family: "Turdidae", genus: "Turdus", occurrence_count: 5_432_108 },
    FallbackEntry { class_key: "212", taxon_key: 2481082, scientific_name: "Erithacus rubecula", vernacular_name: "Rouge-gorge familier", class: "Aves", order: "Passeriformes", family: "Muscicapidae", genus: "Erithacus", occurrence_count: 3_891_564 },
    // Mammals (Mammalia)
    FallbackEntry { class_key: "359", taxon_key: 2440946, scientific_name: "Vulpes vulpes", vernacular_name: "Renard roux", class: "Mammalia", order: "Carnivora", family: "Canidae", genus: "Vulpes", occurrence_count: 1_245_673 },
    FallbackEntry { class_key: "359", taxon_key: 2433746, scientific_name: "Capreolus capreolus", vernacular_name: "Chevreuil européen", class: "Mammalia", order: "Artiodactyla", family: "Cervidae", genus: "Capreolus", occurrence_count: 892_456 },
    FallbackEntry { class_key: "359", taxon_key: 2437804, scientific_name: "Sciurus vulgaris", vernacular_name: "Écureuil roux", class: "Mammalia", order: "Rodentia", family: "Sciuridae", genus: "Sciurus", occurrence_count: 654_321 },
    // Insects (Insecta)
    FallbackEntry { class_key: "216", taxon_key: 1311477, scientific_name: "Apis mellifera", vernacular_name: "Abeille domestique", class: "Insecta", order: "Hymenoptera", family: "Apidae", genus: "Apis", occurrence_count: 2_789_456 },
    FallbackEntry { class_key: "216", taxon_key: 1920285, scientific_name: "Vanessa atalanta", vernacular_name: "Belle-Dame", class: "Insecta", order: "Lepidoptera", family: "Nymphalidae", genus: "Vanessa", occurrence_count: 1_567_890 },
    FallbackEntry { class_key: "216", taxon_key: 1890925, scientific_name: "Coccinella septempunctata", vernacular_name: "Coccinelle à sept points", class: "Insecta", order: "Coleoptera", family: "Coccinellidae", genus: "Coccinella", occurrence_count: 987_654 },
    // Squamates (lizards and snakes)
    FallbackEntry { class_key: "11592253", taxon_key: 2465963, scientific_name: "Lacerta agilis", vernacular_name: "Lézard des souches", class: "Reptilia", order: "Squamata", family: "Lacertidae", genus: "Lacerta", occurrence_count: 198_765 },
    FallbackEntry { class_key: "11592253", taxon_key: 2458794, scientific_name: "Natrix natrix", vernacular_name: "Couleuvre à collier", class: "Reptilia", order: "Squamata", family: "Natricidae", genus: "Natrix", occurrence_count: 123_456 },
    FallbackEntry { class_key: "11592253", taxon_key: 2465969, scientific_name: "Vipera berus", vernacular_name: "Vipère péliade", class: "Reptilia", order: "Squamata", family: "Viperidae", genus: "Vipera", occurrence_count: 87_654 },
    // Amphibians (Amphibia)
    FallbackEntry { class_key: "131", taxon_key: 2427091, scientific_name: "Rana temporaria", vernacular_name: "Grenouille rousse", class: "Amphibia", order: "Anura", family: "Ranidae", genus: "Rana", occurrence_count: 345_678 },
    FallbackEntry { class_key: "131", taxon_key: 2433477, scientific_name: "Bufo bufo", vernacular_name: "Crapaud commun", class: "Amphibia", order: "Anura", family: "Bufonidae", genus: "Bufo", occurrence_count: 234_567 },
    FallbackEntry { class_key: "131", taxon_key: 2430915, scientific_name: "Salamandra salamandra", vernacular_name: "Salamandre tachetée", class: "Amphibia", order: "Caudata", family: "Salamandridae", genus: "Salamandra", occurrence_count: 156_789 },
    // Arachnids (Arachnida)
    FallbackEntry { class_key: "367", taxon_key: 2163740, scientific_name: "Argiope bruennichi", vernacular_name: "Épeire frelon", class: "Arachnida", order: "Araneae", family: "Araneidae", genus: "Argiope", occurrence_count: 76_543 },
    FallbackEntry { class_key: "367", taxon_key: 2161811, scientific_name: "Latrodectus mactans", vernacular_name: "Veuve noire", class: "Arachnida", order: "Araneae", family: "Theridiidae", genus: "Latrodectus", occurrence_count: 45_678 },
    FallbackEntry { class_key: "367", taxon_key: 2164056, scientific_name: "Lycosa tarantula", vernacular_name: "Tarentule", class: "Arachnida", order: "Araneae", family: "Lycosidae", genus: "Lycosa", occurrence_count: 98_765 },
    // Gastropods (Gastropoda)
    FallbackEntry { class_key: "225", taxon_key: 2301374, scientific_name: "Helix pomatia", vernacular_name: "Escargot de Bourgogne", class: "Gastropoda", order: "Stylommatophora", family: "Helicidae", genus: "Helix", occurrence_count: 234_567 },
    FallbackEntry { class_key: "225", taxon_key: 2290125, scientific_name: "Limax maximus", vernacular_name: "Limace léopard", class: "Gastropoda", order: "Stylommatophora", family: "Limacidae", genus: "Limax", occurrence_count: 123_456 },
    FallbackEntry { class_key: "225", taxon_key: 2296515, scientific_name: "Cepaea nemoralis", vernacular_name: "Escargot des haies", class: "Gastropoda", order: "Stylommatophora", family: "Helicidae", genus: "Cepaea", occurrence_count: 345_678 },
    // Flowering plants (Magnoliopsida)
    FallbackEntry { class_key: "220", taxon_key: 3034893, scientific_name: "Quercus robur", vernacular_name: "Chêne pédonculé", class: "Magnoliopsida", order: "Fagales", family: "Fagaceae", genus: "Quercus", occurrence_count: 1_567_890 },
    FallbackEntry { class_key: "220", taxon_key: 3152594, scientific_name: "Rosa canina", vernacular_name: "Églantier", class: "Magnoliopsida", order: "Rosales", family: "Rosaceae", genus: "Rosa", occurrence_count: 876_543 },
    FallbackEntry { class_key: "220", taxon_key: 3034332, scientific_name: "Bellis perennis", vernacular_name: "Pâquerette", class: "Magnoliopsida", order: "Asterales", family: "Asteraceae", genus: "Bellis", occurrence_count: 2_345_678 },
    // Crustaceans (Malacostraca)
    FallbackEntry { class_key: "229", taxon_key: 2225897, scientific_name: "Cancer pagurus", vernacular_name: "Tourteau", class: "Malacostraca", order: "Decapoda", family: "Cancridae", genus: "Cancer", occurrence_count: 432_109 },
    FallbackEntry { class_key: "229", taxon_key: 2225626, scientific_name: "Homarus gammarus", vernacular_name: "Homard européen", class: "Malacostraca", order: "Decapoda", family: "Nephropidae", genus: "Homarus", occurrence_count: 198_765 },
    FallbackEntry { class_key: "229", taxon_key: 2224708, scientific_name: "Crangon crangon", vernacular_name: "Crevette grise", class: "Malacostraca", order: "Decapoda", family: "Crangonidae", genus: "Crangon", occurrence_count: 567_890 },
];

impl FallbackEntry {
    fn to_species(&self) -> Species {
        Species {
            taxon_key: self.taxon_key,
            scientific_name: self.scientific_name.to_string(),
            vernacular_name: Some(self.vernacular_name.to_string()),
            taxonomy: Taxonomy {
                kingdom: None,
                phylum: None,
                class: Some(self.class.to_string()),
                order: Some(self.order.to_string()),
                family: Some(self.family.to_string()),
                genus: Some(self.genus.to_string()),
            },
            occurrence_count: self.occurrence_count,
            image: None,
            descriptions: Default::default(),
            distributions: Vec::new(),
            habitat: None,
            threat_status: None,
            is_offline: true,
        }
    }
}

/// Random entry from one class, or `None` if the class is unknown.
pub fn pick(class_key: &str, rng: &mut impl Rng) -> Option<Species> {
    let entries: Vec<&FallbackEntry> = FALLBACK_SPECIES
        .iter()
        .filter(|e| e.class_key == class_key)
        .collect();
    entries.choose(rng).map(|e| e.to_species())
}

/// Random entry across all classes.
pub fn pick_any(rng: &mut impl Rng) -> Option<Species> {
    FALLBACK_SPECIES.choose(rng).map(|e| e.to_species())
}

/// One opportunistic image lookup for a catalog species that lacks one.
/// On failure the species is returned unchanged.
pub async fn enrich_with_image(mut species: Species, client: &GbifClient) -> Species {
    if species.image.is_none() {
        species.image = client
            .find_image(&species.scientific_name, Some(species.taxon_key))
            .await;
    }
    species
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_pick_scoped_to_class() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..20 {
            let species = pick("212", &mut rng).unwrap();
            assert_eq!(species.taxonomy.class.as_deref(), Some("Aves"));
            assert!(species.is_offline);
            assert!(!species.scientific_name.is_empty());
        }
    }

    #[test]
    fn test_pick_unknown_class() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(pick("999999", &mut rng).is_none());
    }

    #[test]
    fn test_pick_any_always_succeeds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..50 {
            let species = pick_any(&mut rng).unwrap();
            assert!(species.is_offline);
            assert!(!species.scientific_name.is_empty());
        }
    }

    #[test]
    fn test_pick_varies_within_class() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.insert(pick("359", &mut rng).unwrap().taxon_key);
        }
        assert!(seen.len() > 1);
    }

    #[test]
    fn test_catalog_covers_common_filter_classes() {
        let classes: Vec<&str> = FALLBACK_SPECIES.iter().map(|e| e.class_key).collect();
        for key in ["212", "359", "216", "11592253", "131"] {
            assert!(classes.contains(&key), "missing fallback entries for {}", key);
        }
    }
}
