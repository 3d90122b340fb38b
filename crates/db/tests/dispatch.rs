//! Repository-level integration tests for delivery dispatch:
//! state machine enforcement, slot capacity, and derived stats.

use assert_matches::assert_matches;
use sqlx::PgPool;

use greenmile_core::error::CoreError;
use greenmile_db::models::status::DeliveryStatus;
use greenmile_db::models::time_slot::CreateTimeSlot;
use greenmile_db::models::tracking::{AssignDelivery, CreateTracking};
use greenmile_db::repositories::{RepoError, StatsRepo, TimeSlotRepo, TrackingRepo};

// ---------------------------------------------------------------------------
// Seed helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, username: &str, role: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, email, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(username)
    .bind(format!("{username}@example.com"))
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_order(pool: &PgPool, user_id: i64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO orders (user_id, total_amount, delivery_address) \
         VALUES ($1, 42.50, '12 Main St') RETURNING id",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_tracking(pool: &PgPool, order_id: i64) -> i64 {
    let record = TrackingRepo::create(
        pool,
        &CreateTracking {
            order_id,
            current_location: None,
            estimated_delivery_time: None,
            delivery_notes: None,
        },
    )
    .await
    .unwrap();
    record.id
}

fn assign_input(order_id: i64, person_id: i64, slot_id: Option<i64>) -> AssignDelivery {
    AssignDelivery {
        order_id,
        delivery_person_id: person_id,
        status: "PICKED_UP".to_string(),
        current_location: Some("Warehouse".to_string()),
        delivery_notes: None,
        time_slot_id: slot_id,
    }
}

fn slot_input(person_id: i64, start: &str, end: &str, max_orders: i32) -> CreateTimeSlot {
    CreateTimeSlot {
        delivery_person_id: person_id,
        slot_date: chrono::Utc::now().date_naive(),
        start_time: start.parse().unwrap(),
        end_time: end.parse().unwrap(),
        max_orders,
        notes: None,
    }
}

// ---------------------------------------------------------------------------
// Record creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn create_starts_pending_with_no_actual_time(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;

    let record = TrackingRepo::create(
        &pool,
        &CreateTracking {
            order_id: order,
            current_location: None,
            estimated_delivery_time: None,
            delivery_notes: None,
        },
    )
    .await
    .unwrap();

    assert_eq!(record.status_id, DeliveryStatus::Pending.id());
    assert_eq!(record.order_id, order);
    assert!(record.delivery_person_id.is_none());
    assert!(record.actual_delivery_time.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn one_record_per_order_enforced(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    seed_tracking(&pool, order).await;

    let second = TrackingRepo::create(
        &pool,
        &CreateTracking {
            order_id: order,
            current_location: None,
            estimated_delivery_time: None,
            delivery_notes: None,
        },
    )
    .await;

    assert!(second.is_err(), "second record for one order must be rejected");
}

#[sqlx::test(migrations = "./migrations")]
async fn find_by_order_returns_the_record(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;

    let found = TrackingRepo::find_by_order(&pool, order).await.unwrap();
    assert_eq!(found.unwrap().id, id);

    let missing = TrackingRepo::find_by_order(&pool, order + 999).await.unwrap();
    assert!(missing.is_none());
}

// ---------------------------------------------------------------------------
// Status advancement
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn advance_to_in_transit_then_delivered(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;

    // PENDING -> IN_TRANSIT skips PICKED_UP and leaves actual time unset.
    let record = TrackingRepo::advance_status(&pool, id, DeliveryStatus::InTransit.id())
        .await
        .unwrap();
    assert_eq!(record.status_id, DeliveryStatus::InTransit.id());
    assert!(record.actual_delivery_time.is_none());

    // IN_TRANSIT -> DELIVERED stamps actual delivery time.
    let record = TrackingRepo::advance_status(&pool, id, DeliveryStatus::Delivered.id())
        .await
        .unwrap();
    assert_eq!(record.status_id, DeliveryStatus::Delivered.id());
    assert!(record.actual_delivery_time.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn advance_out_of_terminal_is_rejected(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;

    TrackingRepo::advance_status(&pool, id, DeliveryStatus::Failed.id())
        .await
        .unwrap();

    let err = TrackingRepo::advance_status(&pool, id, DeliveryStatus::InTransit.id())
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::InvalidState(_)));

    // The record is untouched.
    let record = TrackingRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(record.status_id, DeliveryStatus::Failed.id());
}

#[sqlx::test(migrations = "./migrations")]
async fn advance_unknown_record_is_not_found(pool: PgPool) {
    let err = TrackingRepo::advance_status(&pool, 999_999, DeliveryStatus::InTransit.id())
        .await
        .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn assign_sets_person_status_and_location(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let order = seed_order(&pool, customer).await;
    seed_tracking(&pool, order).await;

    let record = TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, None),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap();

    assert_eq!(record.delivery_person_id, Some(courier));
    assert_eq!(record.status_id, DeliveryStatus::PickedUp.id());
    assert_eq!(record.current_location.as_deref(), Some("Warehouse"));
}

#[sqlx::test(migrations = "./migrations")]
async fn assign_missing_record_or_person_is_not_found(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let order = seed_order(&pool, customer).await;

    // No tracking record for the order yet.
    let err = TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, None),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::NotFound { .. }));

    seed_tracking(&pool, order).await;

    // Unknown delivery person.
    let err = TrackingRepo::assign(
        &pool,
        &assign_input(order, courier + 999, None),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        RepoError::Core(CoreError::NotFound { entity: "User", .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn assign_rejects_over_capacity_slot(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let slot = TimeSlotRepo::create(&pool, &slot_input(courier, "09:00:00", "12:00:00", 2))
        .await
        .unwrap();

    // Fill the slot to capacity.
    for _ in 0..2 {
        let order = seed_order(&pool, customer).await;
        seed_tracking(&pool, order).await;
        TrackingRepo::assign(
            &pool,
            &assign_input(order, courier, Some(slot.id)),
            DeliveryStatus::PickedUp.id(),
        )
        .await
        .unwrap();
    }
    assert_eq!(TimeSlotRepo::assigned_count(&pool, slot.id).await.unwrap(), 2);

    // Third assignment must be rejected.
    let order = seed_order(&pool, customer).await;
    seed_tracking(&pool, order).await;
    let err = TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, Some(slot.id)),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap_err();
    assert_matches!(
        err,
        RepoError::Core(CoreError::CapacityExceeded { max_orders: 2, .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn reassigning_within_same_slot_is_not_double_counted(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let slot = TimeSlotRepo::create(&pool, &slot_input(courier, "09:00:00", "12:00:00", 1))
        .await
        .unwrap();

    let order = seed_order(&pool, customer).await;
    seed_tracking(&pool, order).await;
    TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, Some(slot.id)),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap();

    // The record already occupies the slot's only opening; updating it
    // again must not trip the capacity gate.
    let record = TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, Some(slot.id)),
        DeliveryStatus::InTransit.id(),
    )
    .await
    .unwrap();
    assert_eq!(record.status_id, DeliveryStatus::InTransit.id());
}

// ---------------------------------------------------------------------------
// Relocate / delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn relocate_touches_location_only(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;
    TrackingRepo::advance_status(&pool, id, DeliveryStatus::InTransit.id())
        .await
        .unwrap();

    let record = TrackingRepo::relocate(&pool, id, "Corner of 5th and Oak")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.current_location.as_deref(), Some("Corner of 5th and Oak"));
    assert_eq!(record.status_id, DeliveryStatus::InTransit.id());
    assert!(record.actual_delivery_time.is_none());

    let missing = TrackingRepo::relocate(&pool, id + 999, "nowhere").await.unwrap();
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn delete_reports_whether_a_row_existed(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;

    assert!(TrackingRepo::delete(&pool, id).await.unwrap());
    assert!(!TrackingRepo::delete(&pool, id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Time slots
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn schedule_is_sorted_by_start_time(pool: PgPool) {
    let courier = seed_user(&pool, "dave", "delivery_person").await;

    // Insert out of order.
    TimeSlotRepo::create(&pool, &slot_input(courier, "18:00:00", "21:00:00", 3))
        .await
        .unwrap();
    TimeSlotRepo::create(&pool, &slot_input(courier, "09:00:00", "12:00:00", 5))
        .await
        .unwrap();
    TimeSlotRepo::create(&pool, &slot_input(courier, "13:00:00", "17:00:00", 5))
        .await
        .unwrap();

    let date = chrono::Utc::now().date_naive();
    let slots = TimeSlotRepo::list_schedule(&pool, courier, date).await.unwrap();
    let starts: Vec<String> = slots.iter().map(|s| s.start_time.to_string()).collect();
    assert_eq!(starts, vec!["09:00:00", "13:00:00", "18:00:00"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn slot_delete_blocked_while_deliveries_active(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let slot = TimeSlotRepo::create(&pool, &slot_input(courier, "09:00:00", "12:00:00", 5))
        .await
        .unwrap();

    let order = seed_order(&pool, customer).await;
    let id = seed_tracking(&pool, order).await;
    TrackingRepo::assign(
        &pool,
        &assign_input(order, courier, Some(slot.id)),
        DeliveryStatus::PickedUp.id(),
    )
    .await
    .unwrap();

    let err = TimeSlotRepo::delete(&pool, slot.id).await.unwrap_err();
    assert_matches!(err, RepoError::Core(CoreError::Conflict(_)));

    // Once the delivery reaches a terminal status, deletion goes through.
    TrackingRepo::advance_status(&pool, id, DeliveryStatus::Delivered.id())
        .await
        .unwrap();
    assert!(TimeSlotRepo::delete(&pool, slot.id).await.unwrap());

    // The record keeps its history but loses the slot reference.
    let record = TrackingRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert!(record.time_slot_id.is_none());
    assert!(record.actual_delivery_time.is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn deleting_unknown_slot_returns_false(pool: PgPool) {
    assert!(!TimeSlotRepo::delete(&pool, 999_999).await.unwrap());
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn person_stats_success_rate_scenario(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let courier = seed_user(&pool, "dave", "delivery_person").await;

    // 3 delivered + 1 failed + 1 pending assigned to the courier.
    let mut first_status = Vec::new();
    for _ in 0..5 {
        let order = seed_order(&pool, customer).await;
        seed_tracking(&pool, order).await;
        let record = TrackingRepo::assign(
            &pool,
            &assign_input(order, courier, None),
            DeliveryStatus::PickedUp.id(),
        )
        .await
        .unwrap();
        first_status.push(record.id);
    }
    for id in &first_status[0..3] {
        TrackingRepo::advance_status(&pool, *id, DeliveryStatus::Delivered.id())
            .await
            .unwrap();
    }
    TrackingRepo::advance_status(&pool, first_status[3], DeliveryStatus::Failed.id())
        .await
        .unwrap();
    TrackingRepo::advance_status(&pool, first_status[4], DeliveryStatus::Pending.id())
        .await
        .unwrap();

    let stats = StatsRepo::person_stats(&pool, courier).await.unwrap();
    assert_eq!(stats.total_deliveries, 3);
    assert_eq!(stats.completed_today, 3);
    assert_eq!(stats.pending_deliveries, 1);
    assert_eq!(stats.in_transit, 0);
    assert_eq!(stats.success_rate, 60.0);
    assert_eq!(stats.total_earnings, 15.0);
}

#[sqlx::test(migrations = "./migrations")]
async fn person_with_no_attempts_has_zero_success_rate(pool: PgPool) {
    let courier = seed_user(&pool, "dave", "delivery_person").await;
    let stats = StatsRepo::person_stats(&pool, courier).await.unwrap();
    assert_eq!(stats.success_rate, 0.0);
    assert_eq!(stats.total_deliveries, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn delayed_excludes_terminal_records(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let overdue = chrono::Utc::now() - chrono::Duration::minutes(10);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let order = seed_order(&pool, customer).await;
        let record = TrackingRepo::create(
            &pool,
            &CreateTracking {
                order_id: order,
                current_location: None,
                estimated_delivery_time: Some(overdue),
                delivery_notes: None,
            },
        )
        .await
        .unwrap();
        ids.push(record.id);
    }
    TrackingRepo::advance_status(&pool, ids[0], DeliveryStatus::InTransit.id())
        .await
        .unwrap();
    TrackingRepo::advance_status(&pool, ids[1], DeliveryStatus::Delivered.id())
        .await
        .unwrap();
    TrackingRepo::advance_status(&pool, ids[2], DeliveryStatus::Failed.id())
        .await
        .unwrap();

    let delayed = StatsRepo::delayed(&pool).await.unwrap();
    assert_eq!(delayed.len(), 1);
    assert_eq!(delayed[0].id, ids[0]);
    assert_eq!(delayed[0].is_delayed, Some(true));
    assert!(delayed[0].minutes_until_delivery.unwrap() < 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn histogram_lists_every_status_with_zero_defaults(pool: PgPool) {
    let customer = seed_user(&pool, "alice", "customer").await;
    let order = seed_order(&pool, customer).await;
    seed_tracking(&pool, order).await;

    let histogram = StatsRepo::status_histogram(&pool).await.unwrap();
    assert_eq!(histogram.len(), 5);
    assert_eq!(histogram[0].status, "PENDING");
    assert_eq!(histogram[0].count, 1);
    assert!(histogram[1..].iter().all(|bucket| bucket.count == 0));
}
