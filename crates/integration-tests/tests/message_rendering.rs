//! Integration tests for buyer message templates.
//!
//! These render operator-authored templates (the kind `rakuda seed`
//! installs) against realistic order context, end to end through the
//! public rendering API.

use chrono::Utc;
use rakuda_api::db::messages::{MessageStatus, MessageTemplate};
use rakuda_api::db::orders::OrderContext;
use rakuda_api::services::messages::{RenderError, render_template};
use rakuda_core::{Marketplace, OrderId, OrderStatus, ShipmentId, TemplateId};

fn template(name: &str, trigger_kind: &str, subject: &str, body: &str) -> MessageTemplate {
    MessageTemplate {
        id: TemplateId::new(1),
        name: name.to_string(),
        trigger_kind: trigger_kind.to_string(),
        subject: subject.to_string(),
        body: body.to_string(),
        enabled: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn shipped_order() -> OrderContext {
    OrderContext {
        order_id: OrderId::new(310),
        order_external_id: Some("14-11223-90817".to_string()),
        buyer_username: "sakura_collector88".to_string(),
        item_title: "Nendoroid Hatsune Miku Sakura Ver.".to_string(),
        marketplace: Marketplace::Ebay,
        quantity: 1,
        status: OrderStatus::Shipped,
        shipment_id: Some(ShipmentId::new(12)),
        carrier: Some("Japan Post".to_string()),
        tracking_number: Some("RR987654321JP".to_string()),
    }
}

fn paid_order() -> OrderContext {
    OrderContext {
        status: OrderStatus::Paid,
        shipment_id: None,
        carrier: None,
        tracking_number: None,
        ..shipped_order()
    }
}

// =============================================================================
// Full Template Tests
// =============================================================================

#[test]
fn test_shipping_confirmation_renders_end_to_end() {
    let t = template(
        "shipping-confirmation",
        "order_shipped",
        "Your order {{order_id}} is on its way",
        "Hello {{buyer_name}},\n\n\
         Good news - {{item_title}} has shipped via {{carrier}}.\n\
         Tracking number: {{tracking_number}}\n\n\
         Thank you for your patience!",
    );

    let rendered = render_template(&t, &shipped_order()).expect("render");

    assert_eq!(rendered.subject, "Your order 14-11223-90817 is on its way");
    assert!(rendered.body.contains("sakura_collector88"));
    assert!(rendered.body.contains("Nendoroid Hatsune Miku Sakura Ver."));
    assert!(rendered.body.contains("via Japan Post"));
    assert!(rendered.body.contains("RR987654321JP"));
    assert!(!rendered.body.contains("{{"), "all slots must be filled");
}

#[test]
fn test_payment_template_works_before_shipment_exists() {
    // A paid-order template must not reference tracking
    let t = template(
        "payment-received",
        "order_paid",
        "Thanks for your order, {{buyer_name}}!",
        "Thank you for purchasing {{item_title}} (order {{order_id}}).",
    );

    let rendered = render_template(&t, &paid_order()).expect("render");
    assert_eq!(rendered.subject, "Thanks for your order, sakura_collector88!");
}

#[test]
fn test_shipping_template_against_unshipped_order_names_the_gaps() {
    let t = template(
        "shipping-confirmation",
        "order_shipped",
        "Shipped!",
        "Via {{carrier}}, tracking {{tracking_number}}.",
    );

    let err = render_template(&t, &paid_order()).expect_err("must fail");
    assert_eq!(
        err,
        RenderError::MissingValues(vec![
            "carrier".to_string(),
            "tracking_number".to_string()
        ])
    );
}

// =============================================================================
// Strictness Tests
// =============================================================================

#[test]
fn test_unknown_placeholders_win_over_missing_values() {
    // Subject has a typo, body wants tracking the order lacks; the
    // operator hears about the typo first.
    let t = template(
        "broken",
        "order_shipped",
        "Order {{ordr_id}}",
        "Tracking {{tracking_number}}",
    );

    let err = render_template(&t, &paid_order()).expect_err("must fail");
    assert_eq!(
        err,
        RenderError::UnknownPlaceholders(vec!["ordr_id".to_string()])
    );
}

#[test]
fn test_render_error_reads_like_an_operator_message() {
    let err = RenderError::UnknownPlaceholders(vec![
        "coupon_code".to_string(),
        "gift_wrap".to_string(),
    ]);
    assert_eq!(err.to_string(), "unknown placeholders: coupon_code, gift_wrap");

    let err = RenderError::MissingValues(vec!["tracking_number".to_string()]);
    assert_eq!(err.to_string(), "order has no value for: tracking_number");
}

// =============================================================================
// Wire Format Tests
// =============================================================================

#[test]
fn test_message_status_json_spelling() {
    assert_eq!(
        serde_json::to_string(&MessageStatus::Queued).expect("serialize"),
        "\"queued\""
    );
    assert_eq!(
        serde_json::to_string(&MessageStatus::Sent).expect("serialize"),
        "\"sent\""
    );
    assert_eq!(
        serde_json::to_string(&MessageStatus::Failed).expect("serialize"),
        "\"failed\""
    );
}
