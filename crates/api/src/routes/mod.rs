//! HTTP route handlers for the back-office API.
//!
//! # Route Structure
//!
//! ```text
//! # Shipments
//! GET    /api/shipments/pending        - Paid orders awaiting shipment (cached)
//! POST   /api/shipments/{id}/process   - Enqueue a shipment job
//! GET    /api/shipments/jobs/{id}      - Shipment job status
//!
//! # Listings
//! GET    /api/listings                 - Listing inventory (filterable)
//! GET    /api/listings/{id}            - Listing detail
//! PATCH  /api/listings/{id}            - Update listing fields
//!
//! # Pricing
//! GET    /api/pricing/recommendations  - Bulk pricing quotes (cached)
//! POST   /api/pricing/apply/{listing_id} - Apply a quote to a listing
//! GET    /api/pricing/history/{listing_id} - Price change log
//!
//! # Exchange rates
//! GET    /api/rates/latest             - Current rate for a pair
//! GET    /api/rates/history            - Stored observations for a pair
//! POST   /api/rates/refresh            - Force a provider fetch
//!
//! # Dashboard
//! GET    /api/dashboard/stats          - Aggregate counters (cached)
//!
//! # Inventory
//! GET    /api/inventory/alerts         - Products under their low-stock threshold
//!
//! # Messages
//! GET    /api/messages/templates       - Message templates
//! POST   /api/messages/templates       - Create a template
//! POST   /api/messages/generate        - Render a template against an order
//! GET    /api/messages                 - Outbound message log
//!
//! # Cache administration
//! GET    /api/admin/cache/stats        - Hit/miss/error counters
//! GET    /api/admin/cache/config       - Namespace and TTL table
//! POST   /api/admin/cache/invalidate   - Drop a namespace or exact key
//! POST   /api/admin/cache/flush        - Drop every cache entry
//!
//! # Sessions and audit
//! POST   /api/auth/sessions            - Issue a session (admin token)
//! GET    /api/auth/sessions            - List sessions
//! DELETE /api/auth/sessions/{id}       - Revoke a session
//! GET    /api/admin/audit              - Audit log page
//! ```
//!
//! Liveness and readiness probes (`/health`, `/health/ready`) are wired
//! directly in `main.rs`.
//!
//! Every handler except session issuance takes the [`RequireSession`]
//! extractor, so the auth requirement is visible in each signature.
//!
//! [`RequireSession`]: crate::middleware::RequireSession

use axum::Router;

use crate::state::AppState;

pub mod audit;
pub mod auth;
pub mod cache_admin;
pub mod dashboard;
pub mod inventory;
pub mod listings;
pub mod messages;
pub mod pricing;
pub mod rates;
pub mod shipments;

/// Build the complete API router.
#[must_use]
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(shipments::router())
        .merge(listings::router())
        .merge(pricing::router())
        .merge(rates::router())
        .merge(dashboard::router())
        .merge(inventory::router())
        .merge(messages::router())
        .merge(cache_admin::router())
        .merge(auth::router())
        .merge(audit::router())
}
