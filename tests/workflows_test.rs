mod common;

use common::{body_json, seed_product, seed_scenario, seed_store, seed_supplier, seed_user, TestApp};
use duka_api::entities::{
    inventory_event::{self, Entity as InventoryEvent},
    inventory_lot::{self, Entity as InventoryLot},
    notification::{self, Entity as Notification},
    sale::Entity as Sale,
    supply_request::Entity as SupplyRequest,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;

#[tokio::test]
async fn receiving_a_purchase_order_opens_unpaid_lots() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let supplier = seed_supplier(&app.db, "Bidco Distributors").await;
    let flour = seed_product(&app.db, "Flour 1kg", Some(0)).await;
    let oil = seed_product(&app.db, "Oil 500ml", Some(0)).await;
    let admin_token = app.token_for(&s.admin);

    let response = app
        .request(
            "POST",
            "/api/v1/purchase-orders",
            Some(json!({
                "store_id": s.store.id,
                "supplier_id": supplier.id,
                "notes": "Weekly restock",
                "items": [
                    {"product_id": flour.id, "quantity": 10, "buying_price": "55.00", "selling_price": "70.00"},
                    {"product_id": oil.id, "quantity": 4, "buying_price": "110.00", "selling_price": "145.00"}
                ]
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = body_json(response).await;
    assert_eq!(body["order"]["status"], "draft");
    let order_id = body["order"]["id"].as_i64().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/v1/purchase-orders/{}/status", order_id),
            Some(json!({"status": "received"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["status"], "received");
    assert!(!body["received_at"].is_null());

    // Each line item became an unpaid lot in the store.
    let lots = InventoryLot::find()
        .filter(inventory_lot::Column::StoreId.eq(s.store.id))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(lots.len(), 2);
    assert!(lots.iter().all(|l| l.payment_status == "unpaid"));

    let received_events = InventoryEvent::find()
        .filter(inventory_event::Column::EventType.eq("purchase_order_received"))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(received_events.len(), 2);

    // A received order cannot be received again.
    let response = app
        .request(
            "POST",
            &format!("/api/v1/purchase-orders/{}/status", order_id),
            Some(json!({"status": "received"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn clerks_cannot_raise_purchase_orders() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let supplier = seed_supplier(&app.db, "Kapa Traders").await;
    let clerk_token = app.token_for(&s.clerk);

    let response = app
        .request(
            "POST",
            "/api/v1/purchase-orders",
            Some(json!({
                "store_id": s.store.id,
                "supplier_id": supplier.id,
                "items": [
                    {"product_id": s.product.id, "quantity": 5, "buying_price": "10.00", "selling_price": "15.00"}
                ]
            })),
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn completing_a_transfer_moves_stock_between_stores() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let branch = seed_store(&app.db, "Duka Branch", s.merchant.id).await;
    let product = seed_product(&app.db, "Soap Bar", Some(0)).await;
    let admin_token = app.token_for(&s.admin);

    app.state
        .services
        .inventory
        .record(
            s.clerk.id,
            duka_api::services::inventory::RecordInventory {
                product_id: product.id,
                store_id: s.store.id,
                quantity: 10,
                buying_price: "20.00".parse().unwrap(),
                selling_price: "35.00".parse().unwrap(),
                payment_status: duka_api::entities::inventory_lot::PaymentStatus::Paid,
                remarks: None,
            },
        )
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/api/v1/stock-transfers",
            Some(json!({
                "product_id": product.id,
                "from_store_id": s.store.id,
                "to_store_id": branch.id,
                "quantity": 4,
                "buying_price": "20.00",
                "selling_price": "35.00"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let transfer_id = body_json(response).await["id"].as_i64().unwrap();

    // An unapproved transfer cannot complete.
    let response = app
        .request(
            "POST",
            &format!("/api/v1/stock-transfers/{}/status", transfer_id),
            Some(json!({"status": "completed"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 409);

    for status in ["approved", "completed"] {
        let response = app
            .request(
                "POST",
                &format!("/api/v1/stock-transfers/{}/status", transfer_id),
                Some(json!({"status": status})),
                Some(&admin_token),
            )
            .await;
        assert_eq!(response.status(), 200);
    }

    let inventory = &app.state.services.inventory;
    assert_eq!(inventory.on_hand(product.id, s.store.id).await.unwrap(), 6);
    assert_eq!(inventory.on_hand(product.id, branch.id).await.unwrap(), 4);

    // The destination lot is the store's own stock, not a debt.
    let branch_lot = InventoryLot::find()
        .filter(inventory_lot::Column::StoreId.eq(branch.id))
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(branch_lot.payment_status, "paid");
    assert_eq!(branch_lot.quantity_in_stock, 4);

    let out_events = InventoryEvent::find()
        .filter(inventory_event::Column::StoreId.eq(s.store.id))
        .filter(inventory_event::Column::EventType.eq("stock_transfer_out"))
        .count(&*app.db)
        .await
        .unwrap();
    let in_events = InventoryEvent::find()
        .filter(inventory_event::Column::StoreId.eq(branch.id))
        .filter(inventory_event::Column::EventType.eq("stock_transfer_in"))
        .count(&*app.db)
        .await
        .unwrap();
    assert_eq!(out_events, 1);
    assert_eq!(in_events, 1);
}

#[tokio::test]
async fn transfer_exceeding_stock_fails_without_side_effects() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let branch = seed_store(&app.db, "Duka Branch", s.merchant.id).await;
    let product = seed_product(&app.db, "Detergent 1kg", Some(0)).await;
    let admin_token = app.token_for(&s.admin);

    app.state
        .services
        .inventory
        .record(
            s.clerk.id,
            duka_api::services::inventory::RecordInventory {
                product_id: product.id,
                store_id: s.store.id,
                quantity: 3,
                buying_price: "150.00".parse().unwrap(),
                selling_price: "210.00".parse().unwrap(),
                payment_status: duka_api::entities::inventory_lot::PaymentStatus::Paid,
                remarks: None,
            },
        )
        .await
        .unwrap();

    let response = app
        .request(
            "POST",
            "/api/v1/stock-transfers",
            Some(json!({
                "product_id": product.id,
                "from_store_id": s.store.id,
                "to_store_id": branch.id,
                "quantity": 50,
                "buying_price": "150.00",
                "selling_price": "210.00"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let transfer_id = body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .request(
            "POST",
            &format!("/api/v1/stock-transfers/{}/status", transfer_id),
            Some(json!({"status": "approved"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let response = app
        .request(
            "POST",
            &format!("/api/v1/stock-transfers/{}/status", transfer_id),
            Some(json!({"status": "completed"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 422);

    let inventory = &app.state.services.inventory;
    assert_eq!(inventory.on_hand(product.id, s.store.id).await.unwrap(), 3);
    assert_eq!(inventory.on_hand(product.id, branch.id).await.unwrap(), 0);

    // The transfer is still approved and can complete once stock arrives.
    let response = app
        .request(
            "GET",
            &format!("/api/v1/stock-transfers/{}", transfer_id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(body_json(response).await["status"], "approved");
}

#[tokio::test]
async fn returns_move_stock_by_direction() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let product = seed_product(&app.db, "Juice 1L", Some(0)).await;
    let admin_token = app.token_for(&s.admin);
    let clerk_token = app.token_for(&s.clerk);

    app.state
        .services
        .inventory
        .record(
            s.clerk.id,
            duka_api::services::inventory::RecordInventory {
                product_id: product.id,
                store_id: s.store.id,
                quantity: 10,
                buying_price: "95.00".parse().unwrap(),
                selling_price: "130.00".parse().unwrap(),
                payment_status: duka_api::entities::inventory_lot::PaymentStatus::Paid,
                remarks: None,
            },
        )
        .await
        .unwrap();

    // Raising a return takes the admin role.
    let response = app
        .request(
            "POST",
            "/api/v1/returns",
            Some(json!({
                "store_id": s.store.id,
                "product_id": product.id,
                "return_type": "customer",
                "quantity": 2,
                "unit_price": "130.00"
            })),
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // A customer brings two units back.
    let response = app
        .request(
            "POST",
            "/api/v1/returns",
            Some(json!({
                "store_id": s.store.id,
                "product_id": product.id,
                "return_type": "customer",
                "quantity": 2,
                "unit_price": "130.00",
                "reason": "Damaged packaging"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let customer_return = body_json(response).await["id"].as_i64().unwrap();

    for status in ["approved", "completed"] {
        let response = app
            .request(
                "POST",
                &format!("/api/v1/returns/{}/status", customer_return),
                Some(json!({"status": status})),
                Some(&admin_token),
            )
            .await;
        assert_eq!(response.status(), 200);
    }
    let inventory = &app.state.services.inventory;
    assert_eq!(inventory.on_hand(product.id, s.store.id).await.unwrap(), 12);

    // Three units go back to the supplier.
    let response = app
        .request(
            "POST",
            "/api/v1/returns",
            Some(json!({
                "store_id": s.store.id,
                "product_id": product.id,
                "return_type": "supplier",
                "quantity": 3,
                "unit_price": "95.00",
                "reason": "Expired"
            })),
            Some(&admin_token),
        )
        .await;
    let supplier_return = body_json(response).await["id"].as_i64().unwrap();
    for status in ["approved", "completed"] {
        app.request(
            "POST",
            &format!("/api/v1/returns/{}/status", supplier_return),
            Some(json!({"status": status})),
            Some(&admin_token),
        )
        .await;
    }
    assert_eq!(inventory.on_hand(product.id, s.store.id).await.unwrap(), 9);

    let customer_events = InventoryEvent::find()
        .filter(inventory_event::Column::EventType.eq("return_customer"))
        .count(&*app.db)
        .await
        .unwrap();
    let supplier_events = InventoryEvent::find()
        .filter(inventory_event::Column::EventType.eq("return_supplier"))
        .count(&*app.db)
        .await
        .unwrap();
    assert_eq!(customer_events, 1);
    assert_eq!(supplier_events, 1);

    // Rejection is terminal.
    let response = app
        .request(
            "POST",
            "/api/v1/returns",
            Some(json!({
                "store_id": s.store.id,
                "product_id": product.id,
                "return_type": "customer",
                "quantity": 1,
                "unit_price": "130.00"
            })),
            Some(&admin_token),
        )
        .await;
    let rejected_return = body_json(response).await["id"].as_i64().unwrap();
    let response = app
        .request(
            "POST",
            &format!("/api/v1/returns/{}/status", rejected_return),
            Some(json!({"status": "rejected"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let response = app
        .request(
            "POST",
            &format!("/api/v1/returns/{}/status", rejected_return),
            Some(json!({"status": "approved"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn sales_over_http_record_totals_and_respect_stock() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let product = seed_product(&app.db, "Eggs Tray", Some(0)).await;
    let clerk_token = app.token_for(&s.clerk);
    let admin_token = app.token_for(&s.admin);

    app.state
        .services
        .inventory
        .record(
            s.clerk.id,
            duka_api::services::inventory::RecordInventory {
                product_id: product.id,
                store_id: s.store.id,
                quantity: 5,
                buying_price: "300.00".parse().unwrap(),
                selling_price: "390.00".parse().unwrap(),
                payment_status: duka_api::entities::inventory_lot::PaymentStatus::Paid,
                remarks: None,
            },
        )
        .await
        .unwrap();

    // Recording a sale takes the admin role.
    let response = app
        .request(
            "POST",
            "/api/v1/sales",
            Some(json!({
                "product_id": product.id,
                "store_id": s.store.id,
                "quantity": 2,
                "unit_price": "390.00"
            })),
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);

    let response = app
        .request(
            "POST",
            "/api/v1/sales",
            Some(json!({
                "product_id": product.id,
                "store_id": s.store.id,
                "quantity": 2,
                "unit_price": "390.00"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let body = body_json(response).await;
    let total: rust_decimal::Decimal = body["total"]
        .as_str()
        .expect("total serializes as a string")
        .parse()
        .unwrap();
    assert_eq!(total, rust_decimal_macros::dec!(780));

    // Selling more than is on hand is rejected and records nothing.
    let response = app
        .request(
            "POST",
            "/api/v1/sales",
            Some(json!({
                "product_id": product.id,
                "store_id": s.store.id,
                "quantity": 9,
                "unit_price": "390.00"
            })),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 422);

    assert_eq!(Sale::find().count(&*app.db).await.unwrap(), 1);
    assert_eq!(
        app.state
            .services
            .inventory
            .on_hand(product.id, s.store.id)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn supply_requests_notify_admins_and_resolve_once() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let clerk_token = app.token_for(&s.clerk);
    let admin_token = app.token_for(&s.admin);

    let response = app
        .request(
            "POST",
            "/api/v1/supply-requests",
            Some(json!({
                "product_id": s.product.id,
                "store_id": s.store.id,
                "quantity": 30
            })),
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 201);
    let request_id = body_json(response).await["id"].as_i64().unwrap();

    let pending_alerts = Notification::find()
        .filter(notification::Column::Category.eq("pending_supply_request"))
        .all(&*app.db)
        .await
        .unwrap();
    let recipients: Vec<i64> = pending_alerts.iter().map(|n| n.user_id).collect();
    assert!(recipients.contains(&s.admin.id));
    assert!(recipients.contains(&s.merchant.id));
    assert!(!recipients.contains(&s.clerk.id));

    let response = app
        .request(
            "POST",
            &format!("/api/v1/supply-requests/{}/approve", request_id),
            Some(json!({"admin_notes": "Order from Bidco on Monday"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);
    let body = body_json(response).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["resolved_by"].as_i64(), Some(s.admin.id));
    assert_eq!(
        body["admin_notes"].as_str(),
        Some("Order from Bidco on Monday")
    );

    // The requester hears back.
    let status_alerts = Notification::find()
        .filter(notification::Column::UserId.eq(s.clerk.id))
        .filter(notification::Column::Category.eq("supply_request_status"))
        .all(&*app.db)
        .await
        .unwrap();
    assert_eq!(status_alerts.len(), 1);

    // Clerks cannot resolve, and a resolved request stays resolved.
    let response = app
        .request(
            "POST",
            &format!("/api/v1/supply-requests/{}/approve", request_id),
            None,
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);
    let response = app
        .request(
            "POST",
            &format!("/api/v1/supply-requests/{}/approve", request_id),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 409);

    // The approval note rides along in the requester's notification.
    let status_alerts = Notification::find()
        .filter(notification::Column::UserId.eq(s.clerk.id))
        .filter(notification::Column::Category.eq("supply_request_status"))
        .all(&*app.db)
        .await
        .unwrap();
    assert!(status_alerts[0].message.contains("Order from Bidco on Monday"));

    // Declines carry a reason back to the requester.
    let response = app
        .request(
            "POST",
            "/api/v1/supply-requests",
            Some(json!({
                "product_id": s.product.id,
                "store_id": s.store.id,
                "quantity": 500
            })),
            Some(&clerk_token),
        )
        .await;
    let second_id = body_json(response).await["id"].as_i64().unwrap();
    let response = app
        .request(
            "POST",
            &format!("/api/v1/supply-requests/{}/decline", second_id),
            Some(json!({"admin_notes": "Budget exhausted"})),
            Some(&admin_token),
        )
        .await;
    assert_eq!(response.status(), 200);

    let declined = SupplyRequest::find_by_id(second_id)
        .one(&*app.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(declined.status, "declined");
    assert_eq!(declined.admin_notes.as_deref(), Some("Budget exhausted"));
}

#[tokio::test]
async fn clerks_read_only_their_own_records_and_history() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let other_clerk = seed_user(&app.db, "Wafula", "clerk", Some(s.store.id), true).await;
    let product = seed_product(&app.db, "Sugar 1kg", Some(0)).await;

    let record = |actor_id, quantity| {
        app.state.services.inventory.record(
            actor_id,
            duka_api::services::inventory::RecordInventory {
                product_id: product.id,
                store_id: s.store.id,
                quantity,
                buying_price: "120.00".parse().unwrap(),
                selling_price: "150.00".parse().unwrap(),
                payment_status: duka_api::entities::inventory_lot::PaymentStatus::Paid,
                remarks: None,
            },
        )
    };
    let mine = record(s.clerk.id, 4).await.unwrap();
    let theirs = record(other_clerk.id, 6).await.unwrap();

    let clerk_token = app.token_for(&s.clerk);
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", s.store.id),
            None,
            Some(&clerk_token),
        )
        .await;
    let body = body_json(response).await;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"].as_i64(), Some(mine.id));

    // The store's full history stays admin territory.
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}/timeline", s.store.id),
            None,
            Some(&clerk_token),
        )
        .await;
    let body = body_json(response).await;
    for event in body["data"].as_array().unwrap() {
        assert_eq!(event["recorded_by"].as_i64(), Some(s.clerk.id));
    }

    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/{}", theirs.id),
            None,
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // Admins see everything in their store.
    let admin_token = app.token_for(&s.admin);
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", s.store.id),
            None,
            Some(&admin_token),
        )
        .await;
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn store_scope_and_authentication_are_enforced() {
    let app = TestApp::spawn().await;
    let s = seed_scenario(&app.db).await;
    let other_merchant = seed_user(&app.db, "Otieno", "superuser", None, true).await;
    let other_store = seed_store(&app.db, "Duka Geni", other_merchant.id).await;

    // No token at all.
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", s.store.id),
            None,
            None,
        )
        .await;
    assert_eq!(response.status(), 401);

    // A clerk cannot read another store.
    let clerk_token = app.token_for(&s.clerk);
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", other_store.id),
            None,
            Some(&clerk_token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // A merchant cannot reach into another merchant's store.
    let other_token = app.token_for(&other_merchant);
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", s.store.id),
            None,
            Some(&other_token),
        )
        .await;
    assert_eq!(response.status(), 403);

    // The owning merchant can.
    let merchant_token = app.token_for(&s.merchant);
    let response = app
        .request(
            "GET",
            &format!("/api/v1/inventory/stores/{}", s.store.id),
            None,
            Some(&merchant_token),
        )
        .await;
    assert_eq!(response.status(), 200);
}
