//! Client for the GBIF occurrence/taxonomy service.
//!
//! Every call is an independent GET with a per-request timeout. Failed
//! requests are retried a bounded number of times with a fixed delay;
//! the first well-formed response wins and later attempts are abandoned.
//! A clean 404 is surfaced immediately as `NotFound` without retrying.

use std::time::Duration;

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::GameConfig;
use crate::species::SpeciesImage;

/// iNaturalist research-grade observations, a reliable source of species photos.
const INATURALIST_DATASET_KEY: &str = "50c9509d-22c7-4a22-a47d-8c48425ef4a7";

/// Errors surfaced by the client. Transient failures are retried
/// internally and only reported as `Unreachable` once every attempt
/// has been exhausted.
#[derive(Debug)]
pub enum ApiError {
    /// The resource does not exist (clean 4xx from the service).
    NotFound,
    /// All attempts failed; the message describes the last failure.
    Unreachable(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "resource not found"),
            ApiError::Unreachable(msg) => write!(f, "service unreachable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

/// One page of occurrence-search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrencePage {
    #[serde(default)]
    pub results: Vec<OccurrenceRecord>,
    #[serde(default)]
    pub count: u64,
}

/// One observation of a taxon at a place/time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceRecord {
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default)]
    pub taxon_key: Option<i64>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub media: Vec<MediaRecord>,
}

/// A media attachment on an occurrence or a taxon.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    #[serde(rename = "type", default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub rights_holder: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

impl MediaRecord {
    pub fn is_still_image(&self) -> bool {
        self.media_type.as_deref() == Some("StillImage") && self.identifier.is_some()
    }
}

/// Full taxon record from `/species/{key}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonDetail {
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub taxonomic_status: Option<String>,
    #[serde(default)]
    pub kingdom: Option<String>,
    #[serde(default)]
    pub phylum: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub genus: Option<String>,
    #[serde(default)]
    pub habitat: Option<String>,
    #[serde(default)]
    pub threat_status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VernacularName {
    #[serde(default)]
    pub vernacular_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRecord {
    #[serde(rename = "type", default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionRecord {
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub continent: Option<String>,
    #[serde(default)]
    pub establishment_means: Option<String>,
}

/// Autocomplete entry from `/species/suggest`, consumed by the input
/// suggestion UI.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonSuggestion {
    #[serde(default)]
    pub key: Option<i64>,
    #[serde(default)]
    pub scientific_name: Option<String>,
    #[serde(default)]
    pub canonical_name: Option<String>,
    #[serde(default)]
    pub vernacular_name: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
}

/// Facet endpoints wrap their lists in `{"results": [...]}`.
#[derive(Debug, Deserialize)]
struct Paged<T> {
    #[serde(default)]
    results: Vec<T>,
}

/// Parameters for an occurrence search. Coordinates and a clean
/// geospatial record are always required; everything else is optional.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub limit: u32,
    pub offset: u32,
    pub taxon_key: Option<String>,
    pub country: Option<String>,
    pub year_range: Option<(i32, i32)>,
    pub class_name: Option<String>,
}

impl SearchParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("hasCoordinate", "true".to_string()),
            ("hasGeospatialIssue", "false".to_string()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
        ];
        if let Some(key) = &self.taxon_key {
            query.push(("taxonKey", key.clone()));
        }
        if let Some(country) = &self.country {
            query.push(("country", country.clone()));
        }
        if let Some((from, to)) = self.year_range {
            query.push(("year", format!("{},{}", from, to)));
        }
        if let Some(class) = &self.class_name {
            query.push(("class", class.clone()));
        }
        query
    }
}

/// HTTP client for the occurrence/taxonomy service. Stateless beyond
/// the connection pool; holds no cache.
pub struct GbifClient {
    http: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl GbifClient {
    pub fn new(config: &GameConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: config.base_url.clone(),
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// One GET with bounded retries. First parseable success wins.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut last_failure = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_delay).await;
                debug!("retrying {} (attempt {}/{})", endpoint, attempt + 1, self.max_retries + 1);
            }

            let response = match self.http.get(&url).query(query).send().await {
                Ok(response) => response,
                Err(err) => {
                    last_failure = err.to_string();
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ApiError::NotFound);
            }
            if !status.is_success() {
                last_failure = format!("status {}", status);
                continue;
            }

            match response.json::<T>().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    last_failure = format!("undecodable payload: {}", err);
                    continue;
                }
            }
        }

        warn!("{} unreachable after {} attempts: {}", endpoint, self.max_retries + 1, last_failure);
        Err(ApiError::Unreachable(last_failure))
    }

    /// Occurrence search used to collect candidate taxon keys.
    pub async fn search_occurrences(&self, params: &SearchParams) -> Result<OccurrencePage, ApiError> {
        self.get_json("/occurrence/search", &params.to_query()).await
    }

    /// Total known observation records for a taxon.
    pub async fn count_occurrences(&self, taxon_key: i64) -> Result<u64, ApiError> {
        let query = [
            ("taxonKey", taxon_key.to_string()),
            ("limit", "0".to_string()),
        ];
        let page: OccurrencePage = self.get_json("/occurrence/search", &query).await?;
        Ok(page.count)
    }

    pub async fn taxon_detail(&self, taxon_key: i64) -> Result<TaxonDetail, ApiError> {
        self.get_json(&format!("/species/{}", taxon_key), &[]).await
    }

    pub async fn vernacular_names(&self, taxon_key: i64) -> Result<Vec<VernacularName>, ApiError> {
        let page: Paged<VernacularName> = self
            .get_json(&format!("/species/{}/vernacularNames", taxon_key), &[])
            .await?;
        Ok(page.results)
    }

    pub async fn media(&self, taxon_key: i64) -> Result<Vec<MediaRecord>, ApiError> {
        let page: Paged<MediaRecord> = self
            .get_json(&format!("/species/{}/media", taxon_key), &[])
            .await?;
        Ok(page.results)
    }

    pub async fn descriptions(&self, taxon_key: i64) -> Result<Vec<DescriptionRecord>, ApiError> {
        let page: Paged<DescriptionRecord> = self
            .get_json(&format!("/species/{}/descriptions", taxon_key), &[])
            .await?;
        Ok(page.results)
    }

    pub async fn distributions(&self, taxon_key: i64) -> Result<Vec<DistributionRecord>, ApiError> {
        let page: Paged<DistributionRecord> = self
            .get_json(&format!("/species/{}/distributions", taxon_key), &[])
            .await?;
        Ok(page.results)
    }

    /// Free-text autocomplete against the taxonomy index.
    pub async fn suggest(&self, query: &str, limit: u32) -> Result<Vec<TaxonSuggestion>, ApiError> {
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("rank", "SPECIES".to_string()),
        ];
        self.get_json("/species/suggest", &params).await
    }

    /// Opportunistic image hunt: occurrences by taxon key first, then a
    /// free-text occurrence search, then the iNaturalist dataset. Never
    /// errors; `None` means no image could be found.
    pub async fn find_image(
        &self,
        scientific_name: &str,
        taxon_key: Option<i64>,
    ) -> Option<SpeciesImage> {
        if let Some(key) = taxon_key {
            let query = [
                ("taxonKey", key.to_string()),
                ("mediaType", "StillImage".to_string()),
                ("limit", "5".to_string()),
            ];
            if let Some(image) = self.image_from_occurrences(&query).await {
                return Some(image);
            }
        }

        let query = [
            ("q", scientific_name.to_string()),
            ("mediaType", "StillImage".to_string()),
            ("limit", "10".to_string()),
        ];
        if let Some(image) = self.image_from_occurrences(&query).await {
            return Some(image);
        }

        let query = [
            ("q", scientific_name.to_string()),
            ("datasetKey", INATURALIST_DATASET_KEY.to_string()),
            ("mediaType", "StillImage".to_string()),
            ("limit", "3".to_string()),
        ];
        self.image_from_occurrences(&query).await
    }

    async fn image_from_occurrences(&self, query: &[(&str, String)]) -> Option<SpeciesImage> {
        let page: OccurrencePage = match self.get_json("/occurrence/search", query).await {
            Ok(page) => page,
            Err(_) => return None,
        };

        for record in &page.results {
            for media in &record.media {
                if media.is_still_image() {
                    return Some(SpeciesImage {
                        url: media.identifier.clone()?,
                        attribution: media
                            .rights_holder
                            .clone()
                            .or_else(|| media.license.clone()),
                    });
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occurrence_page_parsing() {
        let json = r#"{
            "offset": 0,
            "limit": 2,
            "count": 43210,
            "results": [
                {"key": 1, "taxonKey": 2498252, "year": 2019,
                 "media": [{"type": "StillImage", "format": "image/jpeg",
                            "identifier": "https://img.example/1.jpg",
                            "rightsHolder": "iNaturalist user"}]},
                {"key": 2, "year": 2020}
            ]
        }"#;

        let page: OccurrencePage = serde_json::from_str(json).unwrap();
        assert_eq!(page.count, 43210);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[0].taxon_key, Some(2498252));
        assert!(page.results[0].media[0].is_still_image());
        assert_eq!(page.results[1].taxon_key, None);
        assert!(page.results[1].media.is_empty());
    }

    #[test]
    fn test_taxon_detail_parsing() {
        let json = r#"{
            "key": 2482468,
            "scientificName": "Turdus merula Linnaeus, 1758",
            "canonicalName": "Turdus merula",
            "rank": "SPECIES",
            "taxonomicStatus": "ACCEPTED",
            "kingdom": "Animalia",
            "class": "Aves",
            "order": "Passeriformes",
            "family": "Turdidae",
            "genus": "Turdus"
        }"#;

        let detail: TaxonDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.canonical_name.as_deref(), Some("Turdus merula"));
        assert_eq!(detail.rank.as_deref(), Some("SPECIES"));
        assert_eq!(detail.class.as_deref(), Some("Aves"));
        assert_eq!(detail.phylum, None);
    }

    #[test]
    fn test_search_params_query() {
        let params = SearchParams {
            limit: 50,
            offset: 730,
            taxon_key: Some("212".to_string()),
            country: Some("FR".to_string()),
            year_range: Some((2010, 2024)),
            class_name: None,
        };

        let query = params.to_query();
        assert!(query.contains(&("hasCoordinate", "true".to_string())));
        assert!(query.contains(&("hasGeospatialIssue", "false".to_string())));
        assert!(query.contains(&("limit", "50".to_string())));
        assert!(query.contains(&("offset", "730".to_string())));
        assert!(query.contains(&("taxonKey", "212".to_string())));
        assert!(query.contains(&("country", "FR".to_string())));
        assert!(query.contains(&("year", "2010,2024".to_string())));
    }

    #[test]
    fn test_minimal_search_params_query() {
        let params = SearchParams {
            limit: 300,
            offset: 0,
            ..Default::default()
        };

        let query = params.to_query();
        assert_eq!(query.len(), 4);
        assert!(!query.iter().any(|(k, _)| *k == "taxonKey"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let config = GameConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            retry_delay_ms: 0,
            request_timeout_secs: 1,
            ..GameConfig::default()
        };
        let client = GbifClient::new(&config);

        let err = client.taxon_detail(2482468).await.unwrap_err();
        assert!(matches!(err, ApiError::Unreachable(_)));
    }
}
