use super::*;
use crate::directory::{DirectoryError, DirectoryResult, MemoryDirectory, ProviderCandidate, RegisteredProvider};
use crate::ledger::{HashChainLedger, LedgerResult, LedgerWorker};
use async_trait::async_trait;
use shared::order::{Coordinates, OpaquePayload, OrderItem, OrderType, PaymentMethod};
use shared::request::{AcceptOrderRequest, AssignProviderRequest, RejectOrderRequest};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Short tick so Track tests finish quickly
const TEST_TRACK_INTERVAL: Duration = Duration::from_millis(20);

/// Pickup used by every test order
const PICKUP: (f64, f64) = (40.4168, -3.7038);
const DESTINATION: (f64, f64) = (40.4530, -3.6883);

struct TestHarness {
    manager: OrdersManager,
    directory: MemoryDirectory,
    ledger: Arc<HashChainLedger>,
}

fn build_manager(
    directory: Arc<dyn ProviderDirectory>,
    recorder: Arc<dyn LedgerRecorder>,
    run_worker: bool,
) -> OrdersManager {
    let storage = OrderStorage::open_in_memory().unwrap();
    let (ledger, rx) = LedgerService::new(64);
    if run_worker {
        let worker = LedgerWorker::new(recorder.clone(), storage.clone());
        tokio::spawn(worker.run(rx, CancellationToken::new()));
    }
    let tracker = LocationTracker::new(
        storage.clone(),
        TEST_TRACK_INTERVAL,
        CancellationToken::new(),
    );
    OrdersManager::new(storage, directory, recorder, ledger, tracker)
}

/// Manager without a ledger worker (queued snapshots are never recorded)
fn create_test_manager() -> TestHarness {
    let directory = MemoryDirectory::new();
    let ledger = Arc::new(HashChainLedger::open_in_memory().unwrap());
    let manager = build_manager(Arc::new(directory.clone()), ledger.clone(), false);
    TestHarness {
        manager,
        directory,
        ledger,
    }
}

/// Manager with a running ledger worker; needs a tokio runtime
fn spawn_test_manager() -> TestHarness {
    let directory = MemoryDirectory::new();
    let ledger = Arc::new(HashChainLedger::open_in_memory().unwrap());
    let manager = build_manager(Arc::new(directory.clone()), ledger.clone(), true);
    TestHarness {
        manager,
        directory,
        ledger,
    }
}

fn item(name: &str, price: f64, quantity: f64) -> OrderItem {
    OrderItem {
        item_id: format!("item-{name}"),
        name: name.to_string(),
        quantity,
        price,
        ..Default::default()
    }
}

fn create_request(user_id: &str, items: Vec<OrderItem>) -> CreateOrderRequest {
    CreateOrderRequest {
        user_id: user_id.to_string(),
        order_type: OrderType::Ride,
        pickup_location: Some(Location::at(PICKUP.0, PICKUP.1)),
        destination_location: Some(Location::at(DESTINATION.0, DESTINATION.1)),
        items,
        payment_method: PaymentMethod::CreditCard,
        notes: None,
    }
}

fn create_order(manager: &OrdersManager) -> Order {
    manager
        .create(create_request("user-1", vec![item("trip", 12.5, 1.0)]))
        .unwrap()
}

/// Provider `distance_km` north of the pickup point offering rides
fn ride_provider(id: &str, distance_km: f64, rating: f64) -> RegisteredProvider {
    RegisteredProvider {
        provider_id: id.to_string(),
        name: format!("Provider {id}"),
        rating,
        service_types: vec!["ride".to_string()],
        position: Coordinates::new(PICKUP.0 + distance_km / 111.195, PICKUP.1),
        available: true,
    }
}

fn status_update(status: OrderStatus, actor: &str) -> UpdateStatusRequest {
    UpdateStatusRequest {
        status,
        updated_by: actor.to_string(),
        note: String::new(),
    }
}

async fn assign(manager: &OrdersManager, order_id: &str, provider_id: &str) -> Order {
    manager
        .assign_provider(
            order_id,
            AssignProviderRequest {
                provider_id: Some(provider_id.to_string()),
            },
        )
        .await
        .unwrap()
}

fn accept(provider_id: &str) -> AcceptOrderRequest {
    AcceptOrderRequest {
        provider_id: provider_id.to_string(),
        current_location: None,
    }
}

fn reject(provider_id: &str, reason: &str) -> RejectOrderRequest {
    RejectOrderRequest {
        provider_id: provider_id.to_string(),
        reason: reason.to_string(),
    }
}

fn report_at(provider_id: &str, lat: f64, lon: f64) -> UpdateLocationRequest {
    UpdateLocationRequest {
        provider_id: provider_id.to_string(),
        location: Some(Location::at(lat, lon)),
    }
}

/// History tail always mirrors the current status
fn assert_history_consistent(order: &Order) {
    assert_eq!(order.last_recorded_status(), Some(order.status));
}

/// Poll until `check` holds or the timeout expires
async fn wait_for<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Directory that always errors
struct DownDirectory;

#[async_trait]
impl ProviderDirectory for DownDirectory {
    async fn find_available(
        &self,
        _: Coordinates,
        _: f64,
        _: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>> {
        Err(DirectoryError::Unavailable("directory down".into()))
    }

    async fn notify(&self, _: &str, _: &str, _: &OpaquePayload) -> DirectoryResult<()> {
        Err(DirectoryError::Unavailable("directory down".into()))
    }
}

/// Directory that finds providers but cannot deliver notifications
#[derive(Default)]
struct MuteDirectory {
    inner: MemoryDirectory,
}

#[async_trait]
impl ProviderDirectory for MuteDirectory {
    async fn find_available(
        &self,
        location: Coordinates,
        radius_km: f64,
        service_type: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>> {
        self.inner
            .find_available(location, radius_km, service_type)
            .await
    }

    async fn notify(&self, _: &str, _: &str, _: &OpaquePayload) -> DirectoryResult<()> {
        Err(DirectoryError::Unavailable("push gateway down".into()))
    }
}

/// Directory that logs the radius of every search
#[derive(Default)]
struct RecordingDirectory {
    inner: MemoryDirectory,
    radii: parking_lot::Mutex<Vec<f64>>,
}

impl RecordingDirectory {
    fn radii(&self) -> Vec<f64> {
        self.radii.lock().clone()
    }
}

#[async_trait]
impl ProviderDirectory for RecordingDirectory {
    async fn find_available(
        &self,
        location: Coordinates,
        radius_km: f64,
        service_type: &str,
    ) -> DirectoryResult<Vec<ProviderCandidate>> {
        self.radii.lock().push(radius_km);
        self.inner
            .find_available(location, radius_km, service_type)
            .await
    }

    async fn notify(
        &self,
        provider_id: &str,
        order_id: &str,
        payload: &OpaquePayload,
    ) -> DirectoryResult<()> {
        self.inner.notify(provider_id, order_id, payload).await
    }
}

/// Ledger that refuses every write
struct DownLedger;

#[async_trait]
impl LedgerRecorder for DownLedger {
    async fn record(
        &self,
        _: &str,
        _: &str,
        _: Option<&str>,
        _: &OpaquePayload,
    ) -> LedgerResult<String> {
        Err(crate::ledger::LedgerError::Unavailable("ledger down".into()))
    }

    async fn verify(&self, _: &str, _: &str) -> LedgerResult<bool> {
        Err(crate::ledger::LedgerError::Unavailable("ledger down".into()))
    }

    async fn history(&self, _: &str) -> LedgerResult<Vec<LedgerEntry>> {
        Ok(vec![])
    }
}

mod test_assignment;
