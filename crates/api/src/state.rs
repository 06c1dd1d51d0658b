//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CacheService;
use crate::config::Config;
use crate::ebay::EbayClient;
use crate::fx::RateClient;
use crate::services::{
    AlertsService, AuditService, Mailer, MessageService, RatesService, RepricerService,
    ShipmentQueue,
};

/// Error creating application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, the Redis cache, and the
/// domain services built on top of them.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pool: PgPool,
    cache: CacheService,
    rates: RatesService,
    repricer: RepricerService,
    shipment_queue: ShipmentQueue,
    messages: MessageService,
    alerts: AlertsService,
    audit: AuditService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// Builds the full service graph from the three shared resources.
    /// eBay and SMTP are optional: without their configuration the
    /// repricer and messaging run in local-only mode and the alerts
    /// service logs instead of emailing.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: Config, pool: PgPool, cache: CacheService) -> Result<Self, StateError> {
        let ebay = config.ebay().map(EbayClient::new);
        let rate_client = RateClient::new(&config.rates);

        let audit = AuditService::new(pool.clone());
        let rates = RatesService::new(
            pool.clone(),
            rate_client,
            cache.clone(),
            config.rates.pairs.clone(),
        );
        let messages = MessageService::new(pool.clone(), ebay.clone());
        let shipment_queue = ShipmentQueue::new(
            pool.clone(),
            config.jobs,
            cache.clone(),
            audit.clone(),
            messages.clone(),
        );
        let repricer = RepricerService::new(
            pool.clone(),
            rates.clone(),
            cache.clone(),
            ebay,
            audit.clone(),
        );

        let mailer = config.smtp().map(Mailer::new).transpose()?;
        let digest_to = config.smtp().map(|s| s.alerts_to.clone());
        let alerts = AlertsService::new(pool.clone(), mailer, digest_to);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                cache,
                rates,
                repricer,
                shipment_queue,
                messages,
                alerts,
                audit,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Redis cache service.
    #[must_use]
    pub fn cache(&self) -> &CacheService {
        &self.inner.cache
    }

    /// Get a reference to the exchange-rate service.
    #[must_use]
    pub fn rates(&self) -> &RatesService {
        &self.inner.rates
    }

    /// Get a reference to the pricing automation service.
    #[must_use]
    pub fn repricer(&self) -> &RepricerService {
        &self.inner.repricer
    }

    /// Get a reference to the shipment queue service.
    #[must_use]
    pub fn shipment_queue(&self) -> &ShipmentQueue {
        &self.inner.shipment_queue
    }

    /// Get a reference to the buyer messaging service.
    #[must_use]
    pub fn messages(&self) -> &MessageService {
        &self.inner.messages
    }

    /// Get a reference to the inventory alerts service.
    #[must_use]
    pub fn alerts(&self) -> &AlertsService {
        &self.inner.alerts
    }

    /// Get a reference to the audit trail writer.
    #[must_use]
    pub fn audit(&self) -> &AuditService {
        &self.inner.audit
    }
}
