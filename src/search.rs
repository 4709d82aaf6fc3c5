//! Candidate search: turn an unreliable occurrence API into a shuffled
//! pool of candidate taxon keys.
//!
//! Strategies run one at a time, narrow/fast first, each under its own
//! timeout. A timed-out or empty strategy is skipped, not retried. When
//! every primary strategy fails, progressively more permissive last-resort
//! strategies take over. Full exhaustion yields an empty pool, which the
//! selector reads as "switch to the offline catalog".

use std::time::Duration;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::gbif::{GbifClient, OccurrenceRecord, SearchParams};

/// One way of querying the occurrence index. Ephemeral; rebuilt per search.
#[derive(Debug, Clone)]
pub struct SearchStrategy {
    pub name: &'static str,
    pub limit: u32,
    /// Random offsets are drawn from [0, max_offset).
    pub max_offset: u32,
    pub year_range: Option<(i32, i32)>,
    /// Last-resort strategies drop the taxon filter to widen the net.
    pub apply_taxon_filter: bool,
    pub timeout: Duration,
}

impl SearchStrategy {
    fn to_params(
        &self,
        taxon_filter: Option<&str>,
        region: Option<&str>,
        rng: &mut impl Rng,
    ) -> SearchParams {
        let offset = if self.max_offset > 0 {
            rng.gen_range(0..self.max_offset)
        } else {
            0
        };
        // Filtered classes have far fewer records, so deep offsets
        // would land past the end of the result set.
        let offset = if taxon_filter.is_some() && self.apply_taxon_filter {
            offset.min(1_000)
        } else {
            offset
        };

        SearchParams {
            limit: self.limit,
            offset,
            taxon_key: if self.apply_taxon_filter {
                taxon_filter.map(str::to_string)
            } else {
                None
            },
            country: region.map(str::to_string),
            year_range: self.year_range,
            class_name: None,
        }
    }
}

/// Primary strategies, narrow/fast to wide/slow.
pub fn primary_strategies() -> Vec<SearchStrategy> {
    vec![
        SearchStrategy {
            name: "narrow-recent",
            limit: 50,
            max_offset: 1_000,
            year_range: Some((2010, 2024)),
            apply_taxon_filter: true,
            timeout: Duration::from_secs(4),
        },
        SearchStrategy {
            name: "standard",
            limit: 150,
            max_offset: 5_000,
            year_range: None,
            apply_taxon_filter: true,
            timeout: Duration::from_secs(6),
        },
        SearchStrategy {
            name: "wide",
            limit: 300,
            max_offset: 10_000,
            year_range: None,
            apply_taxon_filter: true,
            timeout: Duration::from_secs(8),
        },
    ]
}

/// Escalation once every primary strategy has failed: longer timeouts,
/// fewer constraints.
pub fn last_resort_strategies() -> Vec<SearchStrategy> {
    vec![
        SearchStrategy {
            name: "last-resort-shallow",
            limit: 300,
            max_offset: 500,
            year_range: None,
            apply_taxon_filter: true,
            timeout: Duration::from_secs(12),
        },
        SearchStrategy {
            name: "last-resort-unfiltered",
            limit: 500,
            max_offset: 50_000,
            year_range: None,
            apply_taxon_filter: false,
            timeout: Duration::from_secs(15),
        },
    ]
}

/// Runs search strategies against the client until one produces candidates.
pub struct CandidateSearch<'a> {
    client: &'a GbifClient,
}

impl<'a> CandidateSearch<'a> {
    pub fn new(client: &'a GbifClient) -> Self {
        Self { client }
    }

    /// Produce a deduplicated, shuffled pool of candidate taxon keys.
    /// An empty pool means no remote candidates could be obtained.
    pub async fn find_candidates(
        &self,
        taxon_filter: Option<&str>,
        region: Option<&str>,
        rng: &mut impl Rng,
    ) -> Vec<i64> {
        let strategies: Vec<SearchStrategy> = primary_strategies()
            .into_iter()
            .chain(last_resort_strategies())
            .collect();

        for strategy in &strategies {
            let params = strategy.to_params(taxon_filter, region, rng);
            debug!(
                "strategy {}: limit={} offset={}",
                strategy.name, params.limit, params.offset
            );

            let outcome =
                tokio::time::timeout(strategy.timeout, self.client.search_occurrences(&params))
                    .await;

            match outcome {
                Ok(Ok(page)) => {
                    let mut pool = dedup_taxon_keys(&page.results);
                    if pool.is_empty() {
                        debug!("strategy {} returned no usable taxon keys", strategy.name);
                        continue;
                    }
                    pool.shuffle(rng);
                    debug!("strategy {} produced {} candidates", strategy.name, pool.len());
                    return pool;
                }
                Ok(Err(err)) => {
                    debug!("strategy {} failed: {}", strategy.name, err);
                }
                Err(_) => {
                    debug!("strategy {} timed out", strategy.name);
                }
            }
        }

        Vec::new()
    }
}

/// Unique taxon keys from an occurrence page, in first-seen order.
/// Records without a taxon key are dropped.
fn dedup_taxon_keys(records: &[OccurrenceRecord]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .filter_map(|r| r.taxon_key)
        .filter(|key| seen.insert(*key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(taxon_key: Option<i64>) -> OccurrenceRecord {
        OccurrenceRecord {
            taxon_key,
            ..Default::default()
        }
    }

    #[test]
    fn test_dedup_taxon_keys() {
        let records = vec![
            record(Some(10)),
            record(Some(20)),
            record(Some(10)),
            record(None),
            record(Some(30)),
            record(Some(20)),
        ];

        let pool = dedup_taxon_keys(&records);
        assert_eq!(pool, vec![10, 20, 30]);
    }

    #[test]
    fn test_dedup_drops_keyless_records() {
        let records = vec![record(None), record(None)];
        assert!(dedup_taxon_keys(&records).is_empty());
    }

    #[test]
    fn test_strategy_escalation_order() {
        let primary = primary_strategies();
        for pair in primary.windows(2) {
            assert!(pair[0].limit <= pair[1].limit);
            assert!(pair[0].timeout <= pair[1].timeout);
        }

        let last_resort = last_resort_strategies();
        assert!(!last_resort.is_empty());
        // The final escalation drops the taxon filter entirely.
        assert!(!last_resort.last().unwrap().apply_taxon_filter);
        // Last-resort timeouts exceed the primary ones.
        assert!(last_resort[0].timeout > primary.last().unwrap().timeout);
    }

    #[test]
    fn test_params_respect_taxon_filter() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let strategy = &primary_strategies()[1];

        let params = strategy.to_params(Some("212"), None, &mut rng);
        assert_eq!(params.taxon_key.as_deref(), Some("212"));
        // Filtered searches stay shallow.
        assert!(params.offset <= 1_000);

        let params = strategy.to_params(None, Some("FR"), &mut rng);
        assert_eq!(params.taxon_key, None);
        assert_eq!(params.country.as_deref(), Some("FR"));
    }

    #[test]
    fn test_unfiltered_strategy_ignores_taxon_filter() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let strategy = last_resort_strategies().pop().unwrap();

        let params = strategy.to_params(Some("212"), None, &mut rng);
        assert_eq!(params.taxon_key, None);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_empty_pool() {
        let config = GameConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 0,
            retry_delay_ms: 0,
            request_timeout_secs: 1,
            ..GameConfig::default()
        };
        let client = GbifClient::new(&config);
        let search = CandidateSearch::new(&client);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let pool = search.find_candidates(None, None, &mut rng).await;
        assert!(pool.is_empty());
    }
}
