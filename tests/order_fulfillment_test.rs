mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use serde_json::json;

fn id_of(value: &serde_json::Value) -> i64 {
    value["id"].as_i64().expect("id is numeric")
}

#[tokio::test]
async fn order_beyond_stock_is_rejected_and_stock_untouched() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 12).await);

    let response = app.place_order("Acme Corp", &[(item, 15)]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(
        body["message"],
        "Insufficient quantity for item Pallet Jack. Available: 12, Requested: 15"
    );

    assert_eq!(app.item_quantity(item).await, 12);
    let orders = app.authed(Method::GET, "/api/order", None).await;
    assert_eq!(orders.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn order_within_stock_reserves_quantity() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 12).await);

    let response = app.place_order("Acme Corp", &[(item, 2)]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = response_json(response).await;

    assert_eq!(order["customerName"], "Acme Corp");
    let lines = order["items"].as_array().expect("items array");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 2);
    assert_eq!(lines[0]["inventoryItemId"], item);
    assert_eq!(lines[0]["inventoryItem"]["name"], "Pallet Jack");
    assert_eq!(lines[0]["inventoryItem"]["quantity"], 10);

    assert_eq!(app.item_quantity(item).await, 10);
}

#[tokio::test]
async fn deleting_an_order_does_not_restock() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 12).await);
    let order = response_json(app.place_order("Acme Corp", &[(item, 2)]).await).await;
    let order_id = id_of(&order);

    let response = app
        .authed(Method::DELETE, &format!("/api/order/{order_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(app.item_quantity(item).await, 10);

    let again = app
        .authed(Method::DELETE, &format!("/api/order/{order_id}"), None)
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let lines = app.authed(Method::GET, "/api/order/allitems", None).await;
    assert_eq!(lines.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failing_line_rolls_back_every_reservation() {
    let app = TestApp::new().await;
    let jacks = id_of(&app.create_item("Pallet Jack", 12).await);
    let wrap = id_of(&app.create_item("Stretch Wrap", 3).await);

    let response = app
        .place_order("Acme Corp", &[(jacks, 5), (wrap, 4)])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Stretch Wrap"));

    assert_eq!(app.item_quantity(jacks).await, 12);
    assert_eq!(app.item_quantity(wrap).await, 3);
    let lines = app.authed(Method::GET, "/api/order/allitems", None).await;
    assert_eq!(lines.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_item_is_not_found_and_nothing_is_reserved() {
    let app = TestApp::new().await;
    let jacks = id_of(&app.create_item("Pallet Jack", 12).await);

    let response = app.place_order("Acme Corp", &[(jacks, 1), (999, 1)]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Inventory item with ID 999 not found.");

    assert_eq!(app.item_quantity(jacks).await, 12);
}

#[tokio::test]
async fn repeated_lines_draw_from_one_balance() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 5).await);

    let too_many = app.place_order("Acme Corp", &[(item, 3), (item, 3)]).await;
    assert_eq!(too_many.status(), StatusCode::BAD_REQUEST);
    let body = response_json(too_many).await;
    assert_eq!(
        body["message"],
        "Insufficient quantity for item Pallet Jack. Available: 2, Requested: 3"
    );
    assert_eq!(app.item_quantity(item).await, 5);

    let fits = app.place_order("Acme Corp", &[(item, 3), (item, 2)]).await;
    assert_eq!(fits.status(), StatusCode::CREATED);
    assert_eq!(app.item_quantity(item).await, 0);
}

#[tokio::test]
async fn malformed_orders_are_bad_requests() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 5).await);

    let empty = app.place_order("Acme Corp", &[]).await;
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

    let zero = app.place_order("Acme Corp", &[(item, 0)]).await;
    assert_eq!(zero.status(), StatusCode::BAD_REQUEST);

    let bad_customer = app.place_order("Acme, Inc.", &[(item, 1)]).await;
    assert_eq!(bad_customer.status(), StatusCode::BAD_REQUEST);

    let missing_field = app
        .authed(Method::POST, "/api/order", Some(json!({ "items": [] })))
        .await;
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.item_quantity(item).await, 5);
}

#[tokio::test]
async fn new_order_is_visible_after_cached_listing() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 12).await);
    let first = id_of(&response_json(app.place_order("Acme Corp", &[(item, 1)]).await).await);

    // warm the cache
    let listing = response_json(app.authed(Method::GET, "/api/order", None).await).await;
    assert_eq!(listing.as_array().unwrap().len(), 1);

    let second = id_of(&response_json(app.place_order("Globex", &[(item, 2)]).await).await);

    let fetched = app
        .authed(Method::GET, &format!("/api/order/{second}"), None)
        .await;
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(response_json(fetched).await["customerName"], "Globex");

    let listing = response_json(app.authed(Method::GET, "/api/order", None).await).await;
    let ids: Vec<i64> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(id_of)
        .collect();
    assert_eq!(ids, vec![first, second]);
}

#[tokio::test]
async fn inventory_edits_refresh_cached_snapshots() {
    let app = TestApp::new().await;
    let item = id_of(&app.create_item("Pallet Jack", 12).await);
    app.place_order("Acme Corp", &[(item, 2)]).await;

    let listing = response_json(app.authed(Method::GET, "/api/order", None).await).await;
    assert_eq!(listing[0]["items"][0]["inventoryItem"]["quantity"], 10);

    let update = app
        .request(
            Method::PUT,
            &format!("/api/inventory/{item}"),
            Some(json!({ "id": item, "name": "Hand Pallet Jack", "quantity": 40 })),
            None,
        )
        .await;
    assert_eq!(update.status(), StatusCode::OK);

    let listing = response_json(app.authed(Method::GET, "/api/order", None).await).await;
    assert_eq!(
        listing[0]["items"][0]["inventoryItem"]["name"],
        "Hand Pallet Jack"
    );
    assert_eq!(listing[0]["items"][0]["inventoryItem"]["quantity"], 40);
}

#[tokio::test]
async fn missing_order_is_not_found() {
    let app = TestApp::new().await;
    let response = app.authed(Method::GET, "/api/order/42", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response_json(response).await["message"],
        "Order with ID 42 not found."
    );
}
