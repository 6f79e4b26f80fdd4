mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{seed_product, seed_scenario, seed_store, seed_user, TestApp};
use duka_api::{
    db::DbPool,
    entities::{
        inventory_event::{self, Entity as InventoryEvent},
        inventory_lot::PaymentStatus,
        notification::{self, Entity as Notification},
    },
    errors::ServiceError,
    services::{
        inventory::{RecordInventory, UpdateInventory},
        sales::NewSale,
    },
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

async fn notifications_for(db: &DbPool, user_id: i64, category: &str) -> Vec<notification::Model> {
    Notification::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::Category.eq(category))
        .all(db)
        .await
        .unwrap()
}

fn lot(product_id: i64, store_id: i64, quantity: i32, status: PaymentStatus) -> RecordInventory {
    RecordInventory {
        product_id,
        store_id,
        quantity,
        buying_price: dec!(50.00),
        selling_price: dec!(75.00),
        payment_status: status,
        remarks: None,
    }
}

#[tokio::test]
async fn threshold_resolution_prefers_store_override_then_product_default() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let other_store = seed_store(&app.db, "Duka Mbili", s.merchant.id).await;
    let thresholds = &app.state.services.thresholds;

    // No product default and no override: the deployment default applies.
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 20);

    // A store-less row is the product-wide default.
    thresholds.upsert(s.product.id, None, 8).await.unwrap();
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 8);

    thresholds.upsert(s.product.id, Some(s.store.id), 5).await.unwrap();
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 5);
    // One store's override never leaks into another.
    assert_eq!(thresholds.resolve(s.product.id, other_store.id).await.unwrap(), 8);

    // Replacing the override takes effect rather than adding a second row.
    thresholds.upsert(s.product.id, Some(s.store.id), 12).await.unwrap();
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 12);
    assert_eq!(thresholds.list_for_store(s.store.id).await.unwrap().len(), 1);

    thresholds.delete(s.product.id, Some(s.store.id)).await.unwrap();
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 8);

    thresholds.delete(s.product.id, None).await.unwrap();
    assert_eq!(thresholds.resolve(s.product.id, s.store.id).await.unwrap(), 20);
}

#[tokio::test]
async fn product_wide_defaults_are_owner_territory_over_http() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let uri = format!("/api/v1/thresholds/products/{}", s.product.id);
    let body = serde_json::json!({ "minimum_quantity": 7 });

    let denied = app
        .request("PUT", &uri, Some(body.clone()), Some(&app.token_for(&s.admin)))
        .await;
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let ok = app
        .request("PUT", &uri, Some(body), Some(&app.token_for(&s.merchant)))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    assert_eq!(
        app.state
            .services
            .thresholds
            .resolve(s.product.id, s.store.id)
            .await
            .unwrap(),
        7
    );
}

#[tokio::test]
async fn low_stock_alerts_reach_store_admins_and_owner_only() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let inactive_admin = seed_user(&app.db, "Dormant", "admin", Some(s.store.id), false).await;
    let other_merchant = seed_user(&app.db, "Otieno", "superuser", None, true).await;
    let other_store = seed_store(&app.db, "Duka Mbili", other_merchant.id).await;
    let other_admin = seed_user(&app.db, "Njeri", "admin", Some(other_store.id), true).await;

    // 10 on hand against the deployment default of 20 is already low.
    app.state
        .services
        .inventory
        .record(s.clerk.id, lot(s.product.id, s.store.id, 10, PaymentStatus::Paid))
        .await
        .unwrap();

    assert_eq!(notifications_for(&app.db, s.admin.id, "low_stock").await.len(), 1);
    assert_eq!(notifications_for(&app.db, s.merchant.id, "low_stock").await.len(), 1);
    assert!(notifications_for(&app.db, s.clerk.id, "low_stock").await.is_empty());
    assert!(notifications_for(&app.db, inactive_admin.id, "low_stock").await.is_empty());
    assert!(notifications_for(&app.db, other_admin.id, "low_stock").await.is_empty());
    assert!(notifications_for(&app.db, other_merchant.id, "low_stock").await.is_empty());

    let alert = &notifications_for(&app.db, s.admin.id, "low_stock").await[0];
    assert_eq!(alert.store_id, Some(s.store.id));
    assert_eq!(alert.product_id, Some(s.product.id));
    assert!(!alert.title.is_empty());
}

#[tokio::test]
async fn low_stock_fires_at_threshold_and_again_on_each_drain() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let product = seed_product(&app.db, "Salt 500g", Some(5)).await;

    app.state
        .services
        .inventory
        .record(s.clerk.id, lot(product.id, s.store.id, 10, PaymentStatus::Paid))
        .await
        .unwrap();
    // 10 > 5: nothing yet.
    assert!(notifications_for(&app.db, s.admin.id, "low_stock").await.is_empty());

    let sell = |quantity| NewSale {
        product_id: product.id,
        store_id: s.store.id,
        quantity,
        unit_price: dec!(30.00),
    };
    app.state.services.sales.record(s.clerk.id, sell(5)).await.unwrap();
    // Exactly at the threshold counts as low.
    assert_eq!(notifications_for(&app.db, s.admin.id, "low_stock").await.len(), 1);

    app.state.services.sales.record(s.clerk.id, sell(1)).await.unwrap();
    assert_eq!(notifications_for(&app.db, s.admin.id, "low_stock").await.len(), 2);
}

#[tokio::test]
async fn unpaid_stock_alerts_on_creation_and_on_transition_only() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let product = seed_product(&app.db, "Wheat Flour 2kg", Some(0)).await;
    let inventory = &app.state.services.inventory;

    // Recorded unpaid: one alert.
    inventory
        .record(s.clerk.id, lot(product.id, s.store.id, 10, PaymentStatus::Unpaid))
        .await
        .unwrap();
    assert_eq!(notifications_for(&app.db, s.admin.id, "unpaid_inventory").await.len(), 1);

    // Recorded paid, later marked unpaid: one more alert.
    let paid = inventory
        .record(s.clerk.id, lot(product.id, s.store.id, 10, PaymentStatus::Paid))
        .await
        .unwrap();
    inventory
        .update(
            s.admin.id,
            paid.id,
            UpdateInventory {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(notifications_for(&app.db, s.admin.id, "unpaid_inventory").await.len(), 2);

    // The transition is captured on the timeline with both snapshots.
    let flip = InventoryEvent::find()
        .filter(inventory_event::Column::EventType.eq("payment_status_updated"))
        .filter(inventory_event::Column::LotId.eq(paid.id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(flip.previous_payment_status.as_deref(), Some("paid"));
    assert_eq!(flip.new_payment_status.as_deref(), Some("unpaid"));

    // Re-stating the same status is not a transition.
    inventory
        .update(
            s.admin.id,
            paid.id,
            UpdateInventory {
                payment_status: Some(PaymentStatus::Unpaid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(notifications_for(&app.db, s.admin.id, "unpaid_inventory").await.len(), 2);

    // Settling the debt never alerts.
    inventory
        .update(
            s.admin.id,
            paid.id,
            UpdateInventory {
                payment_status: Some(PaymentStatus::Paid),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(notifications_for(&app.db, s.admin.id, "unpaid_inventory").await.len(), 2);
}

#[tokio::test]
async fn inbox_reads_are_scoped_to_the_owner() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;

    // Deployment default threshold of 20 makes this an instant low-stock alert.
    app.state
        .services
        .inventory
        .record(s.clerk.id, lot(s.product.id, s.store.id, 3, PaymentStatus::Unpaid))
        .await
        .unwrap();

    let notifications = &app.state.services.notifications;
    // Low stock and unpaid: two unread rows for the admin.
    assert_eq!(notifications.unread_count(s.admin.id).await.unwrap(), 2);

    let inbox = notifications
        .list_for_user(s.admin.id, true, 0, 20)
        .await
        .unwrap();
    assert_eq!(inbox.len(), 2);

    // Only the owner may mark a notification read.
    let err = notifications
        .mark_read(s.clerk.id, inbox[0].id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::Forbidden(_));

    let read = notifications.mark_read(s.admin.id, inbox[0].id).await.unwrap();
    assert!(read.is_read);
    assert!(read.read_at.is_some());
    assert_eq!(notifications.unread_count(s.admin.id).await.unwrap(), 1);

    // Marking an already-read row again is a no-op, not an error.
    notifications.mark_read(s.admin.id, inbox[0].id).await.unwrap();

    assert_eq!(notifications.mark_all_read(s.admin.id).await.unwrap(), 1);
    assert_eq!(notifications.unread_count(s.admin.id).await.unwrap(), 0);
    assert!(notifications
        .list_for_user(s.admin.id, true, 0, 20)
        .await
        .unwrap()
        .is_empty());

    // The merchant's copies are untouched.
    assert_eq!(notifications.unread_count(s.merchant.id).await.unwrap(), 2);
}
