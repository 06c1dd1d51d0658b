//! Status enums for listings, orders, and shipments.
//!
//! Each enum mirrors a Postgres enum type of the same name and encodes
//! the legal state machine in `can_transition_to`. Repositories reject
//! writes that would skip a state; callers should consult these methods
//! before attempting a transition.

use serde::{Deserialize, Serialize};

/// Lifecycle of a marketplace listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "listing_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Ended,
}

impl ListingStatus {
    /// Whether buyers can currently see and purchase the listing.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether a transition to `next` is legal.
    ///
    /// `Ended` is terminal; a new listing must be created instead.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active)
                | (Self::Active, Self::Paused | Self::Ended)
                | (Self::Paused, Self::Active | Self::Ended)
        )
    }
}

/// Lifecycle of a marketplace order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Whether a transition to `next` is legal.
    ///
    /// Orders can be cancelled until they ship. `Delivered` and
    /// `Cancelled` are terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Paid | Self::Cancelled)
                | (Self::Paid, Self::Shipped | Self::Cancelled)
                | (Self::Shipped, Self::Delivered)
        )
    }
}

/// Lifecycle of a shipment attached to a paid order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shipment_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Failed,
}

impl ShipmentStatus {
    /// Whether a transition to `next` is legal.
    ///
    /// `Failed` shipments can be re-processed after the operator fixes
    /// whatever made the job exhaust its retries.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Shipped | Self::Failed)
                | (Self::Failed, Self::Processing)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_ended_is_terminal() {
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
    fn order_happy_path_is_legal() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn shipped_orders_cannot_be_cancelled() {
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn failed_shipments_can_retry() {
        assert!(ShipmentStatus::Failed.can_transition_to(ShipmentStatus::Processing));
        assert!(!ShipmentStatus::Shipped.can_transition_to(ShipmentStatus::Processing));
    }
}
