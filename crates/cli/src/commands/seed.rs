//! Seed the database with a demo dataset.
//!
//! Gives a fresh install something to look at: a small supplier catalog,
//! listings across both marketplaces with every pricing strategy
//! represented, a couple of paid orders (so the shipment queue has work),
//! competitor observations (so the repricer has signal), the default
//! message templates, and one USD/JPY rate.
//!
//! The command is idempotent: catalog rows upsert on their natural keys,
//! and the history-shaped tables (orders, observations, rates) are only
//! seeded when empty.
//!
//! # Environment Variables
//!
//! - `RAKUDA_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use rakuda_api::db::{self, RepositoryError, competitor_prices, exchange_rates, messages, orders};
use rakuda_api::pricing::PricingStrategy;
use rakuda_core::{Currency, CurrencyPair, ListingId, ListingStatus, Marketplace};

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Neither `RAKUDA_DATABASE_URL` nor `DATABASE_URL` is set.
    #[error("Missing environment variable: RAKUDA_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

struct DemoProduct {
    sku: &'static str,
    title: &'static str,
    cost_jpy: i64,
    stock: i32,
    low_stock_threshold: i32,
}

struct DemoListing {
    sku: &'static str,
    marketplace: Marketplace,
    title: &'static str,
    price_usd: Decimal,
    status: ListingStatus,
    strategy: Option<PricingStrategy>,
    shipping_usd: Decimal,
    target_margin_pct: Decimal,
}

/// Load the demo dataset.
///
/// # Errors
///
/// Returns an error if the database URL is missing or any insert fails.
pub async fn demo() -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = super::database_url().ok_or(SeedError::MissingDatabaseUrl)?;

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let products = seed_products(&pool).await?;
    let listings = seed_listings(&pool).await?;
    let observations = seed_competitor_prices(&pool).await?;
    let orders = seed_orders(&pool).await?;
    let templates = seed_templates(&pool).await?;
    let rates = seed_rates(&pool).await?;

    info!("Seeding complete!");
    info!("  Products inserted: {products}");
    info!("  Listings inserted: {listings}");
    info!("  Competitor observations: {observations}");
    info!("  Orders created: {orders}");
    info!("  Templates created: {templates}");
    info!("  Exchange rates recorded: {rates}");

    Ok(())
}

async fn seed_products(pool: &PgPool) -> Result<u64, SeedError> {
    let rows = [
        DemoProduct {
            sku: "FIG-NENDO-1489",
            title: "Nendoroid Hatsune Miku: Sakura Ver. (Boxed, Mint)",
            cost_jpy: 5_800,
            stock: 6,
            low_stock_threshold: 2,
        },
        DemoProduct {
            sku: "LENS-NIKKOR-5018G",
            title: "Nikon AF-S Nikkor 50mm f/1.8G (Excellent+)",
            cost_jpy: 18_500,
            stock: 3,
            low_stock_threshold: 2,
        },
        DemoProduct {
            sku: "WATCH-SARB033",
            title: "Seiko SARB033 Automatic, 38mm (Serviced 2025)",
            cost_jpy: 62_000,
            stock: 1,
            low_stock_threshold: 1,
        },
        DemoProduct {
            sku: "KIT-TAMIYA-58346",
            title: "Tamiya 1/10 RC Grasshopper Kit (Sealed)",
            cost_jpy: 11_200,
            stock: 8,
            low_stock_threshold: 3,
        },
        // Out of stock: shows up in inventory alerts
        DemoProduct {
            sku: "TEA-KYUSU-BANKO",
            title: "Banko-yaki Kyusu Teapot 320ml (Artisan Made)",
            cost_jpy: 7_400,
            stock: 0,
            low_stock_threshold: 2,
        },
        // Below threshold: also alerts
        DemoProduct {
            sku: "CART-GB-CRYSTAL",
            title: "Pokemon Crystal GBC Cartridge (JP, Tested, Saves)",
            cost_jpy: 4_200,
            stock: 2,
            low_stock_threshold: 3,
        },
    ];

    let mut inserted = 0;
    for p in &rows {
        let result = sqlx::query(
            r"
            INSERT INTO products (sku, title, cost_jpy, stock_quantity, low_stock_threshold)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (sku) DO NOTHING
            ",
        )
        .bind(p.sku)
        .bind(p.title)
        .bind(Decimal::from(p.cost_jpy))
        .bind(p.stock)
        .bind(p.low_stock_threshold)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

async fn seed_listings(pool: &PgPool) -> Result<u64, SeedError> {
    let rows = [
        DemoListing {
            sku: "FIG-NENDO-1489",
            marketplace: Marketplace::Ebay,
            title: "Nendoroid Hatsune Miku Sakura Ver. Figure - Authentic Japan Import",
            price_usd: Decimal::new(6499, 2),
            status: ListingStatus::Active,
            strategy: Some(PricingStrategy::Competitive),
            shipping_usd: Decimal::new(800, 2),
            target_margin_pct: Decimal::from(15),
        },
        DemoListing {
            sku: "FIG-NENDO-1489",
            marketplace: Marketplace::Joom,
            title: "Hatsune Miku Sakura Nendoroid Figure (Official, Japan)",
            price_usd: Decimal::new(5999, 2),
            status: ListingStatus::Active,
            strategy: Some(PricingStrategy::Penetration),
            shipping_usd: Decimal::ZERO,
            target_margin_pct: Decimal::from(12),
        },
        DemoListing {
            sku: "LENS-NIKKOR-5018G",
            marketplace: Marketplace::Ebay,
            title: "Nikon AF-S Nikkor 50mm f/1.8G Lens Excellent+ From Japan",
            price_usd: Decimal::new(18999, 2),
            status: ListingStatus::Active,
            strategy: Some(PricingStrategy::ProfitMaximize),
            shipping_usd: Decimal::new(1250, 2),
            target_margin_pct: Decimal::from(20),
        },
        DemoListing {
            sku: "WATCH-SARB033",
            marketplace: Marketplace::Ebay,
            title: "Seiko SARB033 Automatic Watch 38mm, Serviced, From Japan",
            price_usd: Decimal::new(58900, 2),
            status: ListingStatus::Active,
            strategy: Some(PricingStrategy::Premium),
            shipping_usd: Decimal::ZERO,
            target_margin_pct: Decimal::from(25),
        },
        DemoListing {
            sku: "KIT-TAMIYA-58346",
            marketplace: Marketplace::Ebay,
            title: "Tamiya 58346 Grasshopper 1/10 RC Kit NEW Sealed Japan",
            price_usd: Decimal::new(10999, 2),
            status: ListingStatus::Paused,
            strategy: Some(PricingStrategy::MarketAverage),
            shipping_usd: Decimal::new(1800, 2),
            target_margin_pct: Decimal::from(15),
        },
        // Manual pricing: the repricer skips NULL-strategy listings
        DemoListing {
            sku: "TEA-KYUSU-BANKO",
            marketplace: Marketplace::Joom,
            title: "Japanese Banko Ware Kyusu Teapot 320ml Handmade",
            price_usd: Decimal::new(7499, 2),
            status: ListingStatus::Active,
            strategy: None,
            shipping_usd: Decimal::new(950, 2),
            target_margin_pct: Decimal::from(30),
        },
        DemoListing {
            sku: "CART-GB-CRYSTAL",
            marketplace: Marketplace::Ebay,
            title: "Pokemon Crystal Version Game Boy Color Japan - Tested, Saves",
            price_usd: Decimal::new(4499, 2),
            status: ListingStatus::Active,
            strategy: Some(PricingStrategy::Competitive),
            shipping_usd: Decimal::new(600, 2),
            target_margin_pct: Decimal::from(15),
        },
    ];

    let mut inserted = 0;
    for l in &rows {
        let result = sqlx::query(
            r"
            INSERT INTO listings
                (product_id, marketplace, title, price_usd, status, strategy,
                 fee_rate, shipping_usd, target_margin_pct)
            SELECT p.id, $2, $3, $4, $5, $6, $7, $8, $9
            FROM products p
            WHERE p.sku = $1
            ON CONFLICT (product_id, marketplace) DO NOTHING
            ",
        )
        .bind(l.sku)
        .bind(l.marketplace)
        .bind(l.title)
        .bind(l.price_usd)
        .bind(l.status)
        .bind(l.strategy)
        .bind(l.marketplace.default_fee_rate())
        .bind(l.shipping_usd)
        .bind(l.target_margin_pct)
        .execute(pool)
        .await?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}

async fn listing_id_for(
    pool: &PgPool,
    sku: &str,
    marketplace: Marketplace,
) -> Result<Option<ListingId>, sqlx::Error> {
    sqlx::query_scalar::<_, ListingId>(
        r"
        SELECT l.id
        FROM listings l
        JOIN products p ON p.id = l.product_id
        WHERE p.sku = $1 AND l.marketplace = $2
        ",
    )
    .bind(sku)
    .bind(marketplace)
    .fetch_optional(pool)
    .await
}

async fn seed_competitor_prices(pool: &PgPool) -> Result<u64, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM competitor_prices")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Competitor observations already present, skipping");
        return Ok(0);
    }

    let observations: [(&str, &[Decimal]); 3] = [
        (
            "FIG-NENDO-1489",
            &[
                Decimal::new(6245, 2),
                Decimal::new(6690, 2),
                Decimal::new(7100, 2),
            ],
        ),
        (
            "LENS-NIKKOR-5018G",
            &[Decimal::new(19500, 2), Decimal::new(20137, 2)],
        ),
        (
            "CART-GB-CRYSTAL",
            &[Decimal::new(3999, 2), Decimal::new(4725, 2)],
        ),
    ];

    let mut inserted = 0;
    for (sku, prices) in observations {
        let Some(listing_id) = listing_id_for(pool, sku, Marketplace::Ebay).await? else {
            continue;
        };
        for price in prices {
            competitor_prices::record(pool, listing_id, "ebay-browse", *price).await?;
            inserted += 1;
        }
    }

    Ok(inserted)
}

async fn seed_orders(pool: &PgPool) -> Result<u64, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Orders already present, skipping");
        return Ok(0);
    }

    let mut created = 0;

    // Two paid orders: their shipments land in the pending queue.
    if let Some(listing_id) = listing_id_for(pool, "FIG-NENDO-1489", Marketplace::Ebay).await? {
        let order = orders::create(
            pool,
            orders::NewOrder {
                listing_id,
                external_id: Some("14-11223-90817".to_owned()),
                buyer_username: "sakura_collector88".to_owned(),
                quantity: 1,
                sale_price_usd: Decimal::new(6499, 2),
            },
        )
        .await?;
        orders::mark_paid(pool, order.id).await?;
        created += 1;
    }

    if let Some(listing_id) = listing_id_for(pool, "LENS-NIKKOR-5018G", Marketplace::Ebay).await? {
        let order = orders::create(
            pool,
            orders::NewOrder {
                listing_id,
                external_id: Some("22-90876-11234".to_owned()),
                buyer_username: "glassfinder".to_owned(),
                quantity: 1,
                sale_price_usd: Decimal::new(18999, 2),
            },
        )
        .await?;
        orders::mark_paid(pool, order.id).await?;
        created += 1;
    }

    // One order still awaiting payment.
    if let Some(listing_id) = listing_id_for(pool, "CART-GB-CRYSTAL", Marketplace::Ebay).await? {
        orders::create(
            pool,
            orders::NewOrder {
                listing_id,
                external_id: None,
                buyer_username: "retro.games.den".to_owned(),
                quantity: 2,
                sale_price_usd: Decimal::new(4499, 2),
            },
        )
        .await?;
        created += 1;
    }

    Ok(created)
}

async fn seed_templates(pool: &PgPool) -> Result<u64, SeedError> {
    let templates = [
        messages::NewTemplate {
            name: "payment-received".to_owned(),
            trigger_kind: "order_paid".to_owned(),
            subject: "Thanks for your order, {{buyer_name}}!".to_owned(),
            body: "Hello {{buyer_name}},\n\n\
                   Thank you for purchasing {{item_title}} (order {{order_id}}).\n\
                   Your item ships from Japan within 2-4 business days, carefully \
                   packed. We will message you again with tracking as soon as it \
                   is on the way.\n\n\
                   Arigatou gozaimasu!"
                .to_owned(),
        },
        messages::NewTemplate {
            name: "shipping-confirmation".to_owned(),
            trigger_kind: "order_shipped".to_owned(),
            subject: "Your order {{order_id}} is on its way".to_owned(),
            body: "Hello {{buyer_name}},\n\n\
                   Good news - {{item_title}} has shipped via {{carrier}}.\n\
                   Tracking number: {{tracking_number}}\n\n\
                   International delivery from Japan typically takes 7-14 days. \
                   Thank you for your patience!"
                .to_owned(),
        },
        messages::NewTemplate {
            name: "delivery-followup".to_owned(),
            trigger_kind: "delivery_followup".to_owned(),
            subject: "How is your {{item_title}}?".to_owned(),
            body: "Hello {{buyer_name}},\n\n\
                   We hope {{item_title}} arrived safely and you are happy with \
                   it. If anything is not right, please reply here first and we \
                   will sort it out.\n\n\
                   Thank you for buying from us!"
                .to_owned(),
        },
    ];

    let mut created = 0;
    for template in templates {
        match messages::create_template(pool, template).await {
            Ok(_) => created += 1,
            // Already seeded on a previous run
            Err(RepositoryError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(created)
}

async fn seed_rates(pool: &PgPool) -> Result<u64, SeedError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exchange_rates")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!("Exchange rates already present, skipping");
        return Ok(0);
    }

    let pair = CurrencyPair::new(Currency::USD, Currency::JPY);
    exchange_rates::record(pool, pair, Decimal::new(14718, 2)).await?;

    Ok(1)
}
