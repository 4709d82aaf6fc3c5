//! Selection orchestration: search, evaluate, fall back.
//!
//! One selection request walks Searching → Evaluating a bounded number
//! of times, then Fallback. Only total exhaustion of both the remote
//! service and the offline catalog is a user-visible failure.

use std::time::Duration;

use log::{debug, info};
use rand::Rng;

use crate::config::{GameConfig, GameMode};
use crate::evaluator::SpeciesEvaluator;
use crate::fallback;
use crate::gbif::GbifClient;
use crate::search::CandidateSearch;
use crate::species::Species;

/// The one terminal selection failure: every remote avenue and the
/// offline catalog came up empty.
#[derive(Debug)]
pub enum SelectError {
    NoSpeciesAvailable,
}

impl std::fmt::Display for SelectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectError::NoSpeciesAvailable => write!(f, "no species available"),
        }
    }
}

impl std::error::Error for SelectError {}

/// Stateless selection pipeline; each call starts clean so successive
/// rounds get fresh random offsets and fresh species.
pub struct SpeciesSelector {
    client: GbifClient,
    config: GameConfig,
}

impl SpeciesSelector {
    pub fn new(config: GameConfig) -> Self {
        let client = GbifClient::new(&config);
        Self { client, config }
    }

    pub fn client(&self) -> &GbifClient {
        &self.client
    }

    /// Select one playable species for the requested mode. Resolves with
    /// a remote species when the service cooperates, an offline catalog
    /// species when it does not, and fails only when both are exhausted.
    pub async fn select_species(
        &self,
        mode: GameMode,
        taxon_filter: Option<&str>,
        region: Option<&str>,
        rng: &mut impl Rng,
    ) -> Result<Species, SelectError> {
        let search = CandidateSearch::new(&self.client);
        let evaluator = SpeciesEvaluator::new(&self.client, &self.config);
        let evaluation_timeout = Duration::from_secs(self.config.evaluation_timeout_secs);

        for attempt in 1..=self.config.max_selection_attempts {
            debug!(
                "selection attempt {}/{}",
                attempt, self.config.max_selection_attempts
            );

            let pool = search.find_candidates(taxon_filter, region, rng).await;
            if pool.is_empty() {
                debug!("no remote candidates, switching to offline catalog");
                break;
            }

            for &taxon_key in pool.iter().take(self.config.max_candidates_per_pool) {
                let outcome = tokio::time::timeout(
                    evaluation_timeout,
                    evaluator.evaluate(taxon_key, mode, taxon_filter),
                )
                .await;

                match outcome {
                    Ok(Some(species)) => {
                        info!(
                            "selected {} ({} occurrences)",
                            species.scientific_name, species.occurrence_count
                        );
                        return Ok(species);
                    }
                    Ok(None) => continue,
                    Err(_) => {
                        debug!("evaluation of {} timed out", taxon_key);
                        // A thematic round should never be left without a
                        // plausible answer while the service crawls.
                        if let Some(filter) = taxon_filter {
                            if let Some(species) = fallback::pick(filter, rng) {
                                return Ok(fallback::enrich_with_image(species, &self.client).await);
                            }
                        }
                    }
                }
            }
        }

        let picked = match taxon_filter {
            Some(filter) => fallback::pick(filter, rng).or_else(|| fallback::pick_any(rng)),
            None => fallback::pick_any(rng),
        };

        match picked {
            Some(species) => {
                info!("offline catalog supplied {}", species.scientific_name);
                Ok(fallback::enrich_with_image(species, &self.client).await)
            }
            None => Err(SelectError::NoSpeciesAvailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Configuration pointing at a dead endpoint, with budgets shrunk so
    /// the whole search chain exhausts quickly.
    fn offline_config() -> GameConfig {
        GameConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            retry_delay_ms: 0,
            request_timeout_secs: 1,
            max_selection_attempts: 1,
            evaluation_timeout_secs: 1,
            ..GameConfig::default()
        }
    }

    #[tokio::test]
    async fn test_degrades_to_offline_catalog() {
        let selector = SpeciesSelector::new(offline_config());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let species = selector
            .select_species(GameMode::Popular, None, None, &mut rng)
            .await
            .unwrap();

        assert!(species.is_offline);
        assert!(!species.scientific_name.is_empty());
    }

    #[tokio::test]
    async fn test_offline_fallback_respects_taxon_filter() {
        let selector = SpeciesSelector::new(offline_config());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let species = selector
            .select_species(GameMode::Thematic, Some("212"), None, &mut rng)
            .await
            .unwrap();

        assert!(species.is_offline);
        assert_eq!(species.taxonomy.class.as_deref(), Some("Aves"));
    }

    /// Minimal service for exercising the evaluation-timeout path: every
    /// occurrence search gets the canned page, everything else (taxon
    /// detail, facets) stalls until the client gives up.
    async fn spawn_stalling_service(page: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]);
                    if request.starts_with("GET /occurrence/search") {
                        let response = format!(
                            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                            page.len(),
                            page
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                    } else {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_evaluation_timeout_uses_scoped_catalog() {
        let page = r#"{"count": 43210, "results": [{"taxonKey": 555}, {"taxonKey": 556}]}"#;
        let base_url = spawn_stalling_service(page).await;

        let selector = SpeciesSelector::new(GameConfig {
            base_url,
            max_retries: 0,
            retry_delay_ms: 0,
            request_timeout_secs: 5,
            max_selection_attempts: 3,
            evaluation_timeout_secs: 1,
            ..GameConfig::default()
        });
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let started = std::time::Instant::now();
        let species = selector
            .select_species(GameMode::Thematic, Some("212"), None, &mut rng)
            .await
            .unwrap();

        // The first stalled evaluation already resolves the thematic round
        // from the scoped catalog; without that shortcut the selector would
        // sit through six evaluation timeouts before reaching the terminal
        // fallback.
        assert!(species.is_offline);
        assert_eq!(species.taxonomy.class.as_deref(), Some("Aves"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_unknown_filter_still_resolves() {
        let selector = SpeciesSelector::new(offline_config());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        // No catalog entries for this class key; the unscoped catalog
        // still supplies an answer.
        let species = selector
            .select_species(GameMode::Thematic, Some("238"), None, &mut rng)
            .await
            .unwrap();

        assert!(species.is_offline);
    }
}
