use super::*;
use shared::ErrorCode;
use shared::order::ProviderOfferPayload;

#[tokio::test]
async fn test_assign_explicit_provider_skips_matching() {
    let h = create_test_manager();
    let order = create_order(&h.manager);

    let assigned = assign(&h.manager, &order.id, "driver-9").await;
    assert_eq!(assigned.provider_id.as_deref(), Some("driver-9"));
    assert_eq!(assigned.status, OrderStatus::ProviderAssigned);
    let last = assigned.status_history.last().unwrap();
    assert_eq!(last.actor, SYSTEM_ACTOR);
    assert_eq!(last.note, "Provider driver-9 assigned");
    // Manual override notifies nobody
    assert!(h.directory.notifications_for("driver-9").is_empty());
}

#[tokio::test]
async fn test_assign_picks_best_and_notifies_all_candidates() {
    let h = create_test_manager();
    h.directory.register(ride_provider("near-low", 0.5, 2.0));
    h.directory.register(ride_provider("near-high", 1.0, 5.0));
    h.directory.register(ride_provider("far", 4.0, 4.0));
    h.directory.register(ride_provider("too-far", 30.0, 5.0));
    let order = create_order(&h.manager);

    let assigned = h
        .manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap();

    // near-high: 0.7*0.9 + 0.3*1.0 = 0.93 beats near-low: 0.7*0.95 + 0.3*0.4 = 0.785
    assert_eq!(assigned.provider_id.as_deref(), Some("near-high"));
    assert_eq!(assigned.status, OrderStatus::ProviderAssigned);

    for id in ["near-low", "near-high", "far"] {
        let sent = h.directory.notifications_for(id);
        assert_eq!(sent.len(), 1, "{id} notified once");
        let offer: ProviderOfferPayload = sent[0].payload.decode().unwrap();
        assert_eq!(offer.order_id, order.id);
        assert_eq!(offer.total_price, 12.5);
    }
    assert!(h.directory.notifications_for("too-far").is_empty());
}

#[tokio::test]
async fn test_assign_without_providers_is_not_found() {
    let h = create_test_manager();
    let order = create_order(&h.manager);

    let err = h
        .manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let stored = h.manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Created);
    assert_eq!(stored.status_history.len(), 1);
    assert!(stored.provider_id.is_none());
}

#[tokio::test]
async fn test_assign_ignores_other_service_types() {
    let h = create_test_manager();
    let mut courier = ride_provider("courier", 0.5, 5.0);
    courier.service_types = vec!["food_delivery".to_string()];
    h.directory.register(courier);
    let order = create_order(&h.manager);

    let err = h
        .manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::NoProvidersAvailable(_)));
}

#[tokio::test]
async fn test_assign_survives_notification_failures() {
    let directory = MuteDirectory::default();
    directory.inner.register(ride_provider("driver-1", 1.0, 4.5));
    let ledger = Arc::new(HashChainLedger::open_in_memory().unwrap());
    let manager = build_manager(Arc::new(directory), ledger, false);
    let order = create_order(&manager);

    let assigned = manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap();
    assert_eq!(assigned.provider_id.as_deref(), Some("driver-1"));
}

#[tokio::test]
async fn test_assign_directory_outage_is_internal() {
    let ledger = Arc::new(HashChainLedger::open_in_memory().unwrap());
    let manager = build_manager(Arc::new(DownDirectory), ledger, false);
    let order = create_order(&manager);

    let err = manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert_eq!(manager.get(&order.id).unwrap().status, OrderStatus::Created);
}

#[tokio::test]
async fn test_assign_missing_order() {
    let h = create_test_manager();
    let err = h
        .manager
        .assign_provider(
            "ghost",
            AssignProviderRequest {
                provider_id: Some("driver-1".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_accept_by_assigned_provider() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;

    let accepted = h
        .manager
        .accept_order(
            &order.id,
            AcceptOrderRequest {
                provider_id: "driver-1".to_string(),
                current_location: Some(Location::at(40.42, -3.70)),
            },
        )
        .unwrap();
    assert_eq!(accepted.status, OrderStatus::ProviderAccepted);
    let last = accepted.status_history.last().unwrap();
    assert_eq!(last.actor, "driver-1");
    assert_eq!(last.note, "Provider accepted the order");

    let latest = h.manager.storage().latest_location(&order.id).unwrap().unwrap();
    assert_eq!(latest.provider_id, "driver-1");
    assert_eq!(latest.latitude, 40.42);
}

#[tokio::test]
async fn test_accept_with_invalid_location_still_succeeds() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;

    let accepted = h
        .manager
        .accept_order(
            &order.id,
            AcceptOrderRequest {
                provider_id: "driver-1".to_string(),
                current_location: Some(Location::at(f64::NAN, 0.0)),
            },
        )
        .unwrap();
    assert_eq!(accepted.status, OrderStatus::ProviderAccepted);
    assert!(h.manager.storage().latest_location(&order.id).unwrap().is_none());
}

#[tokio::test]
async fn test_accept_reject_by_other_provider_denied() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;

    let err = h.manager.accept_order(&order.id, accept("driver-2")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PermissionDenied);

    let err = h
        .manager
        .reject_order(&order.id, reject("driver-2", "nope"))
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PermissionDenied);

    let stored = h.manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::ProviderAssigned);
    assert_eq!(stored.provider_id.as_deref(), Some("driver-1"));
}

#[test]
fn test_accept_unassigned_order_denied() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    let err = h.manager.accept_order(&order.id, accept("driver-1")).unwrap_err();
    assert_eq!(err.code(), ErrorCode::PermissionDenied);
}

#[test]
fn test_accept_reject_require_provider_id() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assert_eq!(
        h.manager.accept_order(&order.id, accept("")).unwrap_err().code(),
        ErrorCode::InvalidArgument
    );
    assert_eq!(
        h.manager
            .reject_order(&order.id, reject("", "x"))
            .unwrap_err()
            .code(),
        ErrorCode::InvalidArgument
    );
}

#[tokio::test]
async fn test_reject_clears_provider_immediately() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;

    let rejected = h
        .manager
        .reject_order(&order.id, reject("driver-1", "Vehicle issue"))
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::ProviderRejected);
    assert!(rejected.provider_id.is_none());
    let last = rejected.status_history.last().unwrap();
    assert_eq!(last.actor, "driver-1");
    assert_eq!(last.note, "Vehicle issue");
    assert_history_consistent(&rejected);
}

#[tokio::test]
async fn test_reject_rematches_to_another_provider() {
    let h = create_test_manager();
    h.directory.register(ride_provider("driver-1", 0.5, 5.0));
    h.directory.register(ride_provider("driver-2", 2.0, 4.0));
    let order = create_order(&h.manager);

    let assigned = h
        .manager
        .assign_provider(&order.id, AssignProviderRequest::default())
        .await
        .unwrap();
    assert_eq!(assigned.provider_id.as_deref(), Some("driver-1"));

    h.manager
        .reject_order(&order.id, reject("driver-1", "busy"))
        .unwrap();

    let manager = h.manager.clone();
    let id = order.id.clone();
    let reassigned = wait_for(|| {
        manager
            .get(&id)
            .map(|o| o.provider_id.as_deref() == Some("driver-2"))
            .unwrap_or(false)
    })
    .await;
    assert!(reassigned, "rematch should auto-assign driver-2");

    let stored = h.manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::ProviderAssigned);
    let statuses: Vec<_> = stored.status_history.iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            OrderStatus::Created,
            OrderStatus::ProviderAssigned,
            OrderStatus::ProviderRejected,
            OrderStatus::ProviderAssigned,
        ]
    );
    // driver-2 was offered the order twice: once per matching round
    assert_eq!(h.directory.notifications_for("driver-2").len(), 2);
    assert_eq!(h.directory.notifications_for("driver-1").len(), 1);
}

#[tokio::test]
async fn test_rematch_keeps_initial_radius_when_three_found() {
    let directory = Arc::new(RecordingDirectory::default());
    for (id, km) in [("driver-1", 0.5), ("driver-2", 1.0), ("driver-3", 2.0), ("driver-4", 8.0)] {
        directory.inner.register(ride_provider(id, km, 4.5));
    }
    let ledger = Arc::new(HashChainLedger::open_in_memory().unwrap());
    let manager = build_manager(directory.clone(), ledger, false);
    let order = create_order(&manager);
    assign(&manager, &order.id, "driver-1").await;
    let rejected = manager
        .reject_order(&order.id, reject("driver-1", "busy"))
        .unwrap();

    // The rematch spawned by the reject may run too; neither widens
    manager.rematch(&rejected, "driver-1").await.unwrap();
    let mut radii = directory.radii();
    radii.dedup();
    assert_eq!(radii, vec![crate::orders::matcher::INITIAL_RADIUS_KM]);

    let stored = manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::ProviderAssigned);
    assert_eq!(stored.provider_id.as_deref(), Some("driver-2"));
    // The rejecter is filtered, the 8 km provider is never reached
    assert!(directory.inner.notifications_for("driver-1").is_empty());
    assert!(directory.inner.notifications_for("driver-4").is_empty());
}

#[tokio::test]
async fn test_rematch_without_candidates_leaves_order_rejected() {
    let h = create_test_manager();
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;
    let rejected = h
        .manager
        .reject_order(&order.id, reject("driver-1", "busy"))
        .unwrap();

    h.manager.rematch(&rejected, "driver-1").await.unwrap();
    let stored = h.manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::ProviderRejected);
    assert!(stored.provider_id.is_none());
}

#[tokio::test]
async fn test_rematch_yields_to_later_changes() {
    let h = create_test_manager();
    h.directory.register(ride_provider("driver-2", 1.0, 5.0));
    let order = create_order(&h.manager);
    assign(&h.manager, &order.id, "driver-1").await;
    let rejected = h
        .manager
        .reject_order(&order.id, reject("driver-1", "busy"))
        .unwrap();

    // The customer cancels before the rematch lands
    h.manager
        .cancel(&order.id, CancelOrderRequest::default())
        .unwrap();
    h.manager.rematch(&rejected, "driver-1").await.unwrap();

    let stored = h.manager.get(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert!(stored.provider_id.is_none());
}
