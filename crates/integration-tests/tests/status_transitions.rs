//! Integration tests for the listing, order, and shipment state machines.
//!
//! These verify the transition rules the repositories enforce, without
//! requiring a database. The SQL guards in `rakuda_api::db` mirror
//! exactly these rules.

use rakuda_api::db::shipment_jobs::ShipmentJobStatus;
use rakuda_core::{ListingStatus, OrderStatus, ShipmentStatus};

// =============================================================================
// Listing Status Tests
// =============================================================================

#[test]
fn test_listing_lifecycle_forward_path() {
    assert!(ListingStatus::Draft.can_transition_to(ListingStatus::Active));
    assert!(ListingStatus::Active.can_transition_to(ListingStatus::Paused));
    assert!(ListingStatus::Paused.can_transition_to(ListingStatus::Active));
    assert!(ListingStatus::Active.can_transition_to(ListingStatus::Ended));
    assert!(ListingStatus::Paused.can_transition_to(ListingStatus::Ended));
}

#[test]
fn test_listing_cannot_return_to_draft() {
    for status in [
        ListingStatus::Active,
        ListingStatus::Paused,
        ListingStatus::Ended,
    ] {
        assert!(!status.can_transition_to(ListingStatus::Draft));
    }
}

#[test]
fn test_ended_listing_is_terminal() {
    for next in [
        ListingStatus::Draft,
        ListingStatus::Active,
        ListingStatus::Paused,
        ListingStatus::Ended,
    ] {
        assert!(!ListingStatus::Ended.can_transition_to(next));
    }
}

#[test]
fn test_only_active_listings_are_live() {
    assert!(ListingStatus::Active.is_live());
    assert!(!ListingStatus::Draft.is_live());
    assert!(!ListingStatus::Paused.is_live());
    assert!(!ListingStatus::Ended.is_live());
}

// =============================================================================
// Order Status Tests
// =============================================================================

#[test]
fn test_order_happy_path() {
    let path = [
        (OrderStatus::Pending, OrderStatus::Paid),
        (OrderStatus::Paid, OrderStatus::Shipped),
        (OrderStatus::Shipped, OrderStatus::Delivered),
    ];
    for (from, to) in path {
        assert!(from.can_transition_to(to), "{from:?} -> {to:?} should be legal");
    }
}

#[test]
fn test_order_cancellation_window_closes_at_shipment() {
    // Cancellable until the parcel leaves
    assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
    assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));

    // Once shipped, no cancellation
    assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
}

#[test]
fn test_order_cannot_skip_payment() {
    assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
    assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Delivered));
    assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Delivered));
}

#[test]
fn test_order_terminal_states() {
    let all = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];
    for next in all {
        assert!(!OrderStatus::Delivered.can_transition_to(next));
        assert!(!OrderStatus::Cancelled.can_transition_to(next));
    }
}

// =============================================================================
// Shipment Status Tests
// =============================================================================

#[test]
fn test_shipment_processing_path() {
    assert!(ShipmentStatus::Pending.can_transition_to(ShipmentStatus::Processing));
    assert!(ShipmentStatus::Processing.can_transition_to(ShipmentStatus::Shipped));
    assert!(ShipmentStatus::Processing.can_transition_to(ShipmentStatus::Failed));
}

#[test]
fn test_failed_shipment_can_be_reprocessed() {
    // Operator fixes the problem and re-queues
    assert!(ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Processing));
}

#[test]
fn test_shipped_is_terminal() {
    for next in [
        ShipmentStatus::Pending,
        ShipmentStatus::Processing,
        ShipmentStatus::Shipped,
        ShipmentStatus::Failed,
    ] {
        assert!(!ShipmentStatus::Shipped.can_transition_to(next));
    }
}

#[test]
fn test_shipment_cannot_ship_without_processing() {
    assert!(!ShipmentStatus::Pending.can_transition_to(ShipmentStatus::Shipped));
    assert!(!ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Shipped));
}

// =============================================================================
// Shipment Job Status Tests
// =============================================================================

#[test]
fn test_job_status_enum_values() {
    assert!(matches!(ShipmentJobStatus::Queued, ShipmentJobStatus::Queued));
    assert!(matches!(ShipmentJobStatus::Running, ShipmentJobStatus::Running));
    assert!(matches!(
        ShipmentJobStatus::Succeeded,
        ShipmentJobStatus::Succeeded
    ));
    assert!(matches!(ShipmentJobStatus::Dead, ShipmentJobStatus::Dead));
}

#[test]
fn test_job_status_eq_and_copy() {
    let status = ShipmentJobStatus::Queued;
    let copied = status;
    assert_eq!(status, copied);
    assert_ne!(ShipmentJobStatus::Succeeded, ShipmentJobStatus::Dead);
}

/// Job state machine as the worker drives it:
/// queued -> running -> succeeded
/// queued -> running -> queued (retry with backoff)
/// queued -> running -> dead (retries exhausted)
#[test]
fn test_job_transitions_are_between_distinct_states() {
    let transitions = [
        (ShipmentJobStatus::Queued, ShipmentJobStatus::Running),
        (ShipmentJobStatus::Running, ShipmentJobStatus::Succeeded),
        (ShipmentJobStatus::Running, ShipmentJobStatus::Queued),
        (ShipmentJobStatus::Running, ShipmentJobStatus::Dead),
    ];
    for (from, to) in transitions {
        assert_ne!(from, to);
    }
}

#[test]
fn test_job_status_json_spelling() {
    // The API serializes job statuses lowercase
    let json = serde_json::to_string(&ShipmentJobStatus::Succeeded).expect("serialize");
    assert_eq!(json, "\"succeeded\"");
    let json = serde_json::to_string(&ShipmentJobStatus::Dead).expect("serialize");
    assert_eq!(json, "\"dead\"");
}
