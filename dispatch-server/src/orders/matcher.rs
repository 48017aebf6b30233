//! Provider Matcher
//!
//! Queries the directory around the pickup point (5 km, widened to 10 km when
//! the first query returns fewer than requested), scores every candidate and
//! returns the best `count`.
//!
//! score = 0.7 × (1 − min(distance / 10, 1)) + 0.3 × (rating / 5)
//!
//! Sorting is stable: candidates with equal scores keep the directory's order.

use crate::directory::{DirectoryResult, ProviderCandidate, ProviderDirectory};
use shared::order::Order;
use std::sync::Arc;

/// Initial search radius (km)
pub const INITIAL_RADIUS_KM: f64 = 5.0;
/// Widened search radius (km)
pub const WIDENED_RADIUS_KM: f64 = 10.0;

const DISTANCE_WEIGHT: f64 = 0.7;
const RATING_WEIGHT: f64 = 0.3;
/// Distance at which the proximity factor reaches 0
const DISTANCE_NORMALIZER_KM: f64 = 10.0;
const MAX_RATING: f64 = 5.0;

/// A candidate with its computed score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProvider {
    pub candidate: ProviderCandidate,
    pub score: f64,
}

impl ScoredProvider {
    pub fn provider_id(&self) -> &str {
        &self.candidate.provider_id
    }
}

/// Weighted proximity/rating score, both factors clamped into [0, 1]
pub fn score(candidate: &ProviderCandidate) -> f64 {
    let proximity = (1.0 - (candidate.distance / DISTANCE_NORMALIZER_KM).min(1.0)).clamp(0.0, 1.0);
    let rating = (candidate.rating / MAX_RATING).clamp(0.0, 1.0);
    DISTANCE_WEIGHT * proximity + RATING_WEIGHT * rating
}

/// Score, sort descending (stable) and truncate
pub fn rank(candidates: Vec<ProviderCandidate>, count: usize) -> Vec<ScoredProvider> {
    let mut scored: Vec<ScoredProvider> = candidates
        .into_iter()
        .map(|candidate| ScoredProvider {
            score: score(&candidate),
            candidate,
        })
        .collect();
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(count);
    scored
}

/// Ranks directory candidates for an order
#[derive(Clone)]
pub struct ProviderMatcher {
    directory: Arc<dyn ProviderDirectory>,
}

impl ProviderMatcher {
    pub fn new(directory: Arc<dyn ProviderDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Arc<dyn ProviderDirectory> {
        &self.directory
    }

    /// Best `count` providers for the order, best first
    pub async fn find_best(&self, order: &Order, count: usize) -> DirectoryResult<Vec<ScoredProvider>> {
        let service_type = order.order_type.service_type();
        let pickup = order.pickup_location.coordinates();

        let mut candidates = self
            .directory
            .find_available(pickup, INITIAL_RADIUS_KM, service_type)
            .await?;

        if candidates.len() < count {
            tracing::debug!(
                order_id = %order.id,
                found = candidates.len(),
                wanted = count,
                "Widening provider search radius"
            );
            candidates = self
                .directory
                .find_available(pickup, WIDENED_RADIUS_KM, service_type)
                .await?;
        }

        Ok(rank(candidates, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DirectoryError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared::order::{Coordinates, Location, OpaquePayload, OrderStatus, OrderType, PaymentMethod};

    fn candidate(id: &str, distance: f64, rating: f64) -> ProviderCandidate {
        ProviderCandidate {
            provider_id: id.to_string(),
            name: String::new(),
            rating,
            distance,
        }
    }

    /// Directory that answers per radius and records every query
    struct ScriptedDirectory {
        at_5: Vec<ProviderCandidate>,
        at_10: Vec<ProviderCandidate>,
        queries: Mutex<Vec<(f64, String)>>,
    }

    #[async_trait]
    impl ProviderDirectory for ScriptedDirectory {
        async fn find_available(
            &self,
            _location: Coordinates,
            radius_km: f64,
            service_type: &str,
        ) -> DirectoryResult<Vec<ProviderCandidate>> {
            self.queries.lock().push((radius_km, service_type.to_string()));
            if radius_km <= INITIAL_RADIUS_KM {
                Ok(self.at_5.clone())
            } else {
                Ok(self.at_10.clone())
            }
        }

        async fn notify(&self, _: &str, _: &str, _: &OpaquePayload) -> DirectoryResult<()> {
            Err(DirectoryError::Unavailable("not used".to_string()))
        }
    }

    fn order(order_type: OrderType) -> Order {
        Order {
            id: "o-1".to_string(),
            user_id: "u-1".to_string(),
            provider_id: None,
            order_type,
            status: OrderStatus::Created,
            pickup_location: Location::at(52.0, 13.0),
            destination_location: Location::at(52.1, 13.1),
            items: vec![],
            total_price: 0.0,
            platform_fee: 0.0,
            provider_fee: 0.0,
            payment_method: PaymentMethod::Cash,
            ledger_ref: None,
            notes: None,
            status_history: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_score_formula() {
        assert!((score(&candidate("a", 0.0, 5.0)) - 1.0).abs() < 1e-9);
        assert!((score(&candidate("a", 5.0, 2.5)) - (0.35 + 0.15)).abs() < 1e-9);
        // Distance beyond 10 km contributes nothing
        assert!((score(&candidate("a", 25.0, 5.0)) - 0.3).abs() < 1e-9);
        // Out-of-range ratings are clamped
        assert!((score(&candidate("a", 10.0, 9.0)) - 0.3).abs() < 1e-9);
        assert!(score(&candidate("a", 10.0, -1.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rank_sorts_descending_and_truncates() {
        let ranked = rank(
            vec![
                candidate("far", 9.0, 5.0),
                candidate("close", 1.0, 3.0),
                candidate("best", 0.5, 5.0),
                candidate("mid", 4.0, 4.0),
            ],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.provider_id()).collect();
        assert_eq!(ids, vec!["best", "close", "mid"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let ranked = rank(
            vec![
                candidate("first", 2.0, 4.0),
                candidate("second", 2.0, 4.0),
                candidate("third", 2.0, 4.0),
            ],
            3,
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.provider_id()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_no_widening_when_enough_found() {
        let directory = Arc::new(ScriptedDirectory {
            at_5: vec![
                candidate("a", 1.0, 4.0),
                candidate("b", 2.0, 4.0),
                candidate("c", 3.0, 4.0),
            ],
            at_10: vec![candidate("z", 0.1, 5.0)],
            queries: Mutex::new(vec![]),
        });
        let matcher = ProviderMatcher::new(directory.clone());

        let best = matcher.find_best(&order(OrderType::FoodDelivery), 3).await.unwrap();
        assert_eq!(best.len(), 3);
        let queries = directory.queries.lock().clone();
        assert_eq!(queries, vec![(5.0, "food_delivery".to_string())]);
    }

    #[tokio::test]
    async fn test_widens_when_fewer_found() {
        let directory = Arc::new(ScriptedDirectory {
            at_5: vec![candidate("a", 1.0, 4.0)],
            at_10: vec![candidate("a", 1.0, 4.0), candidate("b", 8.0, 5.0)],
            queries: Mutex::new(vec![]),
        });
        let matcher = ProviderMatcher::new(directory.clone());

        let best = matcher.find_best(&order(OrderType::Ride), 3).await.unwrap();
        let ids: Vec<_> = best.iter().map(|s| s.provider_id()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let radii: Vec<f64> = directory.queries.lock().iter().map(|q| q.0).collect();
        assert_eq!(radii, vec![5.0, 10.0]);
    }
}
