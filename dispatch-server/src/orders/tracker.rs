//! Location Tracker
//!
//! One polling task per subscriber. On every tick the task reads the latest
//! position report; when it differs from the last one pushed, it reads the
//! order status, computes the ETA and pushes a [`LocationUpdate`].
//!
//! The task stops when the subscriber goes away (receiver dropped), when the
//! subscription is dropped, or on server shutdown.

use super::eta::estimate_minutes;
use super::storage::{OrderStorage, StorageResult};
use futures::Stream;
use shared::order::{LocationUpdate, OrderLocation};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Per-subscriber buffer; the tick rate is the only other backpressure
const SUBSCRIBER_BUFFER: usize = 16;

/// Spawns Track pollers
#[derive(Clone)]
pub struct LocationTracker {
    storage: OrderStorage,
    interval: Duration,
    shutdown: CancellationToken,
}

impl LocationTracker {
    pub fn new(storage: OrderStorage, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            storage,
            interval,
            shutdown,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the polling task for an order that is known to exist
    pub fn subscribe(&self, order_id: &str) -> TrackSubscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let cancel = self.shutdown.child_token();

        let poller = TrackPoller {
            storage: self.storage.clone(),
            order_id: order_id.to_string(),
            last_location_id: None,
        };
        tokio::spawn(poller.run(tx, self.interval, cancel.clone()));

        tracing::debug!(order_id, "Track subscription started");
        TrackSubscription {
            rx,
            _guard: cancel.drop_guard(),
        }
    }
}

/// Receiving side of a Track stream
///
/// Dropping it stops the polling task.
pub struct TrackSubscription {
    rx: mpsc::Receiver<LocationUpdate>,
    _guard: DropGuard,
}

impl TrackSubscription {
    /// Next update, `None` once the stream has ended
    pub async fn next(&mut self) -> Option<LocationUpdate> {
        self.rx.recv().await
    }

    pub fn into_stream(self) -> impl Stream<Item = LocationUpdate> + Send + 'static {
        futures::stream::unfold(self, |mut sub| async move {
            sub.rx.recv().await.map(|update| (update, sub))
        })
    }
}

/// State owned by one polling task
struct TrackPoller {
    storage: OrderStorage,
    order_id: String,
    last_location_id: Option<String>,
}

impl TrackPoller {
    async fn run(
        mut self,
        tx: mpsc::Sender<LocationUpdate>,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                _ = ticker.tick() => {
                    let update = match self.poll() {
                        Ok(Some(update)) => update,
                        Ok(None) => continue,
                        Err(e) => {
                            tracing::warn!(order_id = %self.order_id, error = %e, "Track poll failed");
                            continue;
                        }
                    };
                    if tx.send(update).await.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(order_id = %self.order_id, "Track subscription ended");
    }

    /// One tick; `None` means nothing new to push
    ///
    /// The location only counts as pushed once the update is built, so a
    /// failed order read is retried on the next tick.
    fn poll(&mut self) -> StorageResult<Option<LocationUpdate>> {
        let Some(location) = self.storage.latest_location(&self.order_id)? else {
            return Ok(None);
        };
        if self.last_location_id.as_deref() == Some(location.id.as_str()) {
            return Ok(None);
        }

        let Some(order) = self.storage.get_order(&self.order_id)? else {
            return Ok(None);
        };
        let update = build_update(&location, order.eta_target().coordinates());
        self.last_location_id = Some(location.id);
        Ok(Some(update))
    }
}

fn build_update(
    location: &OrderLocation,
    target: shared::order::Coordinates,
) -> LocationUpdate {
    LocationUpdate {
        order_id: location.order_id.clone(),
        provider_id: location.provider_id.clone(),
        current_location: location.to_location(),
        estimated_arrival_minutes: estimate_minutes(location.coordinates(), target),
        timestamp: location.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use shared::order::{Location, Order, OrderStatus, OrderType, PaymentMethod};

    const TICK: Duration = Duration::from_millis(20);

    fn seed_order(storage: &OrderStorage, status: OrderStatus) {
        let mut order = Order {
            id: "o-1".to_string(),
            user_id: "u-1".to_string(),
            provider_id: Some("p-1".to_string()),
            order_type: OrderType::Ride,
            status: OrderStatus::Created,
            pickup_location: Location::at(0.0, 0.0),
            destination_location: Location::at(1.0, 0.0),
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
        };
        order.push_status(status, "system", "");
        storage.insert_order(&order).unwrap();
    }

    fn report(storage: &OrderStorage, id: &str, lat: f64) {
        storage
            .insert_location(&OrderLocation {
                id: id.to_string(),
                order_id: "o-1".to_string(),
                provider_id: "p-1".to_string(),
                latitude: lat,
                longitude: 0.0,
                timestamp: shared::util::now_millis(),
            })
            .unwrap();
    }

    fn poller(storage: &OrderStorage) -> TrackPoller {
        TrackPoller {
            storage: storage.clone(),
            order_id: "o-1".to_string(),
            last_location_id: None,
        }
    }

    #[test]
    fn test_poll_skips_without_location() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_order(&storage, OrderStatus::ProviderAccepted);
        assert!(poller(&storage).poll().unwrap().is_none());
    }

    #[test]
    fn test_poll_dedups_unchanged_location() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_order(&storage, OrderStatus::ProviderAccepted);
        report(&storage, "l-1", 0.5);

        let mut poller = poller(&storage);
        assert!(poller.poll().unwrap().is_some());
        assert!(poller.poll().unwrap().is_none());

        report(&storage, "l-2", 0.6);
        let update = poller.poll().unwrap().unwrap();
        assert_eq!(update.current_location.latitude, 0.6);
    }

    #[test]
    fn test_poll_retries_location_when_order_read_misses() {
        let storage = OrderStorage::open_in_memory().unwrap();
        report(&storage, "l-1", 0.5);

        let mut poller = poller(&storage);
        assert!(poller.poll().unwrap().is_none());
        assert!(poller.last_location_id.is_none());

        seed_order(&storage, OrderStatus::ProviderAccepted);
        let update = poller.poll().unwrap().unwrap();
        assert_eq!(update.current_location.latitude, 0.5);
        assert_eq!(poller.last_location_id.as_deref(), Some("l-1"));
        assert!(poller.poll().unwrap().is_none());
    }

    #[test]
    fn test_poll_eta_target_follows_status() {
        let storage = OrderStorage::open_in_memory().unwrap();
        // Provider halfway between pickup (0,0) and destination (1,0)
        seed_order(&storage, OrderStatus::ProviderAccepted);
        report(&storage, "l-1", 0.25);
        let to_pickup = poller(&storage).poll().unwrap().unwrap();
        assert!((to_pickup.estimated_arrival_minutes - 55.5).abs() < 1e-6);

        storage
            .update_order("o-1", |order: &mut Order| {
                order.push_status(OrderStatus::InTransit, "p-1", "");
                Ok::<(), crate::orders::storage::StorageError>(())
            })
            .unwrap();
        let to_destination = poller(&storage).poll().unwrap().unwrap();
        assert!((to_destination.estimated_arrival_minutes - 166.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_subscription_pushes_each_new_location_once() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_order(&storage, OrderStatus::InTransit);
        let tracker = LocationTracker::new(storage.clone(), TICK, CancellationToken::new());

        let mut sub = tracker.subscribe("o-1");
        report(&storage, "l-1", 0.1);
        let first = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.provider_id, "p-1");

        // Several ticks pass without a new report
        let idle = tokio::time::timeout(TICK * 5, sub.next()).await;
        assert!(idle.is_err());

        report(&storage, "l-2", 0.2);
        let second = tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.current_location.latitude, 0.2);
    }

    #[tokio::test]
    async fn test_shutdown_ends_stream() {
        let storage = OrderStorage::open_in_memory().unwrap();
        seed_order(&storage, OrderStatus::InTransit);
        let shutdown = CancellationToken::new();
        let tracker = LocationTracker::new(storage, TICK, shutdown.clone());

        let stream = tracker.subscribe("o-1").into_stream();
        shutdown.cancel();
        let collected: Vec<_> = tokio::time::timeout(Duration::from_secs(2), stream.collect::<Vec<_>>())
            .await
            .unwrap();
        assert!(collected.is_empty());
    }
}
