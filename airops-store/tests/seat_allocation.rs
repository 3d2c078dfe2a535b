use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use airops_core::repository::SeatStore;
use airops_core::reservation::{AllocationStatus, ReservationStatus};
use airops_core::{CoreError, SeatAllocator};
use airops_shared::{CustomerId, FlightInstanceId};
use airops_store::InMemorySeatStore;

const FLIGHT: FlightInstanceId = FlightInstanceId(100);

fn store_with(seats_total: i32, seats_sold: i32, customers: i32) -> Arc<InMemorySeatStore> {
    let store = Arc::new(InMemorySeatStore::new());
    store.add_flight_instance(FLIGHT, seats_total, seats_sold).unwrap();
    for c in 1..=customers {
        store.add_customer(CustomerId(c)).unwrap();
    }
    store
}

/// `sold <= total` and every sold seat beyond the seeded ones has exactly one reserved row.
async fn assert_invariants(store: &InMemorySeatStore, seeded_sold: i32) {
    let seats = store.seat_availability(FLIGHT).await.unwrap().unwrap();
    let reserved = store
        .reservations_for(FLIGHT)
        .await
        .unwrap()
        .iter()
        .filter(|r| r.status == ReservationStatus::Reserved)
        .count() as i32;

    assert!(seats.seats_sold <= seats.seats_total);
    assert_eq!(seats.seats_sold, seeded_sold + reserved);
}

#[tokio::test]
async fn test_two_seats_then_waitlist() {
    let store = store_with(2, 0, 3);
    let allocator = SeatAllocator::new(store.clone());

    let first = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap();
    let second = allocator.reserve(FLIGHT, CustomerId(2)).await.unwrap();
    let third = allocator.reserve(FLIGHT, CustomerId(3)).await.unwrap();

    assert_eq!(first.status, AllocationStatus::Reserved);
    assert_eq!(second.status, AllocationStatus::Reserved);
    assert_eq!(third.status, AllocationStatus::Waitlisted);

    let rows = store.reservations_for(FLIGHT).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].id, third.reservation_id);
    assert_eq!(rows[2].status, ReservationStatus::Waitlisted);
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 2);
    assert_invariants(&store, 0).await;
}

#[tokio::test]
async fn test_full_flight_waitlists_without_touching_counter() {
    let store = store_with(1, 1, 1);
    let allocator = SeatAllocator::new(store.clone());

    let allocation = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap();

    assert_eq!(allocation.status, AllocationStatus::Waitlisted);
    let seats = store.seat_availability(FLIGHT).await.unwrap().unwrap();
    assert_eq!((seats.seats_total, seats.seats_sold, seats.seats_available), (1, 1, 0));
    assert_invariants(&store, 1).await;
}

#[tokio::test]
async fn test_unknown_flight_instance_is_not_found() {
    let store = store_with(5, 0, 1);
    let allocator = SeatAllocator::new(store.clone());

    let err = allocator
        .reserve(FlightInstanceId(999), CustomerId(1))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(store.reservations_for(FlightInstanceId(999)).await.unwrap().is_empty());
    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 0);
}

#[tokio::test]
async fn test_unknown_customer_rolls_back() {
    let store = store_with(5, 0, 0);
    let allocator = SeatAllocator::new(store.clone());

    let err = allocator.reserve(FLIGHT, CustomerId(7)).await.unwrap_err();

    assert!(matches!(err, CoreError::NotFound(_)));
    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_simultaneous_last_seat() {
    let store = store_with(1, 0, 2);
    let allocator = SeatAllocator::new(store.clone());

    let (a, b) = tokio::join!(
        {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.reserve(FLIGHT, CustomerId(1)).await })
        },
        {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.reserve(FLIGHT, CustomerId(2)).await })
        }
    );
    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    let mut statuses = vec![a.status, b.status];
    statuses.sort_by_key(|s| *s == AllocationStatus::Waitlisted);
    assert_eq!(statuses, vec![AllocationStatus::Reserved, AllocationStatus::Waitlisted]);
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 1);
    assert_invariants(&store, 0).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_never_oversell() {
    const REQUESTS: i32 = 64;
    const FREE: i32 = 10;

    let store = store_with(FREE + 5, 5, REQUESTS);
    let allocator = SeatAllocator::new(store.clone()).with_lock_timeout(Duration::from_secs(10));

    let handles: Vec<_> = (1..=REQUESTS)
        .map(|c| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.reserve(FLIGHT, CustomerId(c)).await })
        })
        .collect();

    let mut allocations = Vec::new();
    for handle in handles {
        allocations.push(handle.await.unwrap().unwrap());
    }

    let reserved = allocations
        .iter()
        .filter(|a| a.status == AllocationStatus::Reserved)
        .count() as i32;
    let waitlisted = allocations.len() as i32 - reserved;
    assert_eq!(reserved, FREE);
    assert_eq!(waitlisted, REQUESTS - FREE);

    let ids: HashSet<_> = allocations.iter().map(|a| a.reservation_id).collect();
    assert_eq!(ids.len(), REQUESTS as usize);

    let seats = store.seat_availability(FLIGHT).await.unwrap().unwrap();
    assert_eq!(seats.seats_sold, seats.seats_total);
    assert_invariants(&store, 5).await;
}

#[tokio::test]
async fn test_failed_counter_update_leaves_no_reservation() {
    let store = store_with(3, 0, 2);
    let allocator = SeatAllocator::new(store.clone());

    store.fail_next_sold_update();
    let err = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap_err();
    assert!(matches!(err, CoreError::StorageError(_)));

    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 0);

    // the row lock went with the rolled back transaction
    let next = allocator.reserve(FLIGHT, CustomerId(2)).await.unwrap();
    assert_eq!(next.status, AllocationStatus::Reserved);
    assert_invariants(&store, 0).await;
}

#[tokio::test]
async fn test_failed_commit_applies_nothing() {
    let store = store_with(3, 0, 1);
    let allocator = SeatAllocator::new(store.clone());

    store.fail_next_commit();
    let err = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap_err();

    assert!(matches!(err, CoreError::StorageError(_)));
    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());
    assert_eq!(store.seat_availability(FLIGHT).await.unwrap().unwrap().seats_sold, 0);
}

#[tokio::test]
async fn test_lock_wait_is_bounded() {
    let store = store_with(3, 0, 1);
    let allocator = SeatAllocator::new(store.clone()).with_lock_timeout(Duration::from_millis(50));

    let mut blocker = store.begin().await.unwrap();
    blocker.lock_capacity(FLIGHT).await.unwrap();

    let err = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap_err();
    assert!(matches!(err, CoreError::Timeout(_)));
    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());

    blocker.rollback().await.unwrap();
    let allocation = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap();
    assert_eq!(allocation.status, AllocationStatus::Reserved);
}

#[tokio::test]
async fn test_other_flight_instances_do_not_wait() {
    let other = FlightInstanceId(200);
    let store = store_with(3, 0, 1);
    store.add_flight_instance(other, 1, 0).unwrap();
    let allocator = SeatAllocator::new(store.clone()).with_lock_timeout(Duration::from_millis(50));

    let mut blocker = store.begin().await.unwrap();
    blocker.lock_capacity(FLIGHT).await.unwrap();

    let allocation = allocator.reserve(other, CustomerId(1)).await.unwrap();
    assert_eq!(allocation.status, AllocationStatus::Reserved);

    blocker.rollback().await.unwrap();
}

#[tokio::test]
async fn test_inconsistent_counters_are_a_conflict() {
    let store = store_with(2, 3, 1);
    let allocator = SeatAllocator::new(store.clone());

    let err = allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap_err();

    assert!(matches!(err, CoreError::Conflict(_)));
    assert!(store.reservations_for(FLIGHT).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_availability_reads_are_repeatable() {
    let store = store_with(4, 0, 2);
    let allocator = SeatAllocator::new(store.clone());
    allocator.reserve(FLIGHT, CustomerId(1)).await.unwrap();
    allocator.reserve(FLIGHT, CustomerId(2)).await.unwrap();

    let first = (
        store.seat_availability(FLIGHT).await.unwrap(),
        store.reservations_for(FLIGHT).await.unwrap(),
    );
    let second = (
        store.seat_availability(FLIGHT).await.unwrap(),
        store.reservations_for(FLIGHT).await.unwrap(),
    );

    assert_eq!(first, second);
    assert_eq!(first.0.unwrap().seats_available, 2);
}
