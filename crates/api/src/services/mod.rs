//! Business logic services for the back-office API.
//!
//! # Services
//!
//! - `alerts` - Low-stock inventory scanning and digest emails
//! - `audit` - Best-effort audit trail writes
//! - `mailer` - Email delivery via SMTP
//! - `messages` - Buyer message rendering and delivery
//! - `rates` - Exchange-rate fetching, storage, and cache
//! - `repricer` - Pricing recommendations and marketplace price pushes
//! - `shipment_queue` - Shipment job queue worker

pub mod alerts;
pub mod audit;
pub mod mailer;
pub mod messages;
pub mod rates;
pub mod repricer;
pub mod shipment_queue;

pub use alerts::AlertsService;
pub use audit::AuditService;
pub use mailer::Mailer;
pub use messages::MessageService;
pub use rates::RatesService;
pub use repricer::RepricerService;
pub use shipment_queue::ShipmentQueue;
