//! End-to-end tests of the store admin over HTTP, against the demo catalogue.

use std::sync::Arc;

use serde_json::{json, Value};
use storefront::seed::seed_demo_data;
use storefront::{admin, build_site};
use storefront_admin::db::{AdminDbExecutor, InMemoryAdminDb};
use storefront_core::Settings;
use storefront_test::client::TestClient;

async fn client() -> (TestClient, InMemoryAdminDb) {
    let db = InMemoryAdminDb::new();
    let site = build_site(&Settings::default(), Arc::new(db.clone()));
    seed_demo_data(&site).await.unwrap();
    (TestClient::new(site.into_axum_router()), db)
}

fn ids(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["pk"].as_str().unwrap().to_string())
        .collect()
}

fn column(page: &Value, index: usize) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["cells"][index]["display"].as_str().unwrap().to_string())
        .collect()
}

// ═════════════════════════════════════════════════════════════════════
// Products
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_product_changelist() {
    let (client, _) = client().await;
    let page = client.get("/admin/store/product/").await.value();
    assert_eq!(page["count"], 12);
    assert_eq!(page["total_pages"], 3);
    assert_eq!(ids(&page), vec!["12", "11", "10", "9", "8"]);

    let headers: Vec<_> = page["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(headers, vec!["title", "unit_price", "inventory_status", "collection"]);

    assert_eq!(column(&page, 1), vec!["2.49", "7.99", "11.20", "5.99", "14.75"]);
    assert_eq!(column(&page, 2), vec!["Low", "OK", "OK", "OK", "Low"]);
    assert_eq!(column(&page, 3)[0], "Stationery");
}

#[tokio::test]
async fn test_inventory_status_sorts_by_inventory() {
    let (client, _) = client().await;
    let page = client
        .get("/admin/store/product/?o=inventory_status&all=1")
        .await
        .value();
    assert_eq!(page["ordering"], json!(["inventory", "-id"]));
    assert_eq!(ids(&page)[..4], ["8", "4", "12", "2"]);
    assert_eq!(column(&page, 2)[..6], ["Low", "Low", "Low", "Low", "Low", "OK"]);

    let page = client.get("/admin/store/product/?o=-inventory_status").await.value();
    assert_eq!(ids(&page)[0], "3");
}

#[tokio::test]
async fn test_product_search_and_filters() {
    let (client, _) = client().await;
    let page = client.get("/admin/store/product/?q=COFFEE").await.value();
    assert_eq!(ids(&page), vec!["6"]);

    let page = client
        .get("/admin/store/product/?collection__id__exact=4")
        .await
        .value();
    assert_eq!(ids(&page), vec!["10", "9"]);

    let fields: Vec<_> = page["filters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["collection", "last_update"]);
}

#[tokio::test]
async fn test_clear_inventory_action() {
    let (client, db) = client().await;
    let page = client.get("/admin/store/product/").await.value();
    let actions: Vec<_> = page["actions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["name"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["delete_selected", "clear_inventory"]);

    let response = client
        .post_json(
            "/admin/store/product/action/",
            &json!({"action": "clear_inventory", "selected": [3, "5"]}),
        )
        .await;
    assert_eq!(response.status_code(), 200);
    let body = response.value();
    assert_eq!(body["success"], true);
    assert_eq!(body["affected_count"], 2);
    assert_eq!(body["message"], "2 products were successfully updated");

    assert_eq!(db.get_object("store.product", "3").await.unwrap()["inventory"], 0);
    assert_eq!(db.get_object("store.product", "5").await.unwrap()["inventory"], 0);
    assert_eq!(db.get_object("store.product", "1").await.unwrap()["inventory"], 42);

    let messages = client.get("/admin/messages/").await.value();
    assert_eq!(messages[0]["level"], "Info");
    assert_eq!(messages[0]["text"], "2 products were successfully updated");
}

#[tokio::test]
async fn test_unit_price_is_editable_in_the_changelist() {
    let (client, db) = client().await;
    let response = client
        .post_json(
            "/admin/store/product/editable/",
            &json!([{"pk": 12, "unit_price": "3.10"}]),
        )
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        db.get_object("store.product", "12").await.unwrap()["unit_price"],
        json!(3.1)
    );

    let response = client
        .post_json(
            "/admin/store/product/editable/",
            &json!([{"pk": 12, "unit_price": "0.50"}]),
        )
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(response.value()["fields"]["12-unit_price"].is_array());

    let response = client
        .post_json(
            "/admin/store/product/editable/",
            &json!([{"pk": 12, "inventory": 1}]),
        )
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_tagging_a_product() {
    let (client, db) = client().await;
    let form = json!({"inlines": {"tags.taggeditem": [{"tag": 3}]}});
    let response = client.put_json("/admin/store/product/2/", &form).await;
    assert_eq!(response.status_code(), 200);
    let view = response.value();
    let rows = view["inlines"][0]["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["object_id"], 2);
    assert_eq!(rows[0]["content_type"], 2);
    assert!(!view["object"]["last_update"].is_null());

    let form = json!({"inlines": {"tags.taggeditem": [{"tag": 42}]}});
    let response = client.put_json("/admin/store/product/2/", &form).await;
    assert_eq!(response.status_code(), 400);

    // Tags go with the product.
    assert_eq!(client.delete("/admin/store/product/2/").await.status_code(), 200);
    assert_eq!(db.count("tags.taggeditem").unwrap(), 3);
}

#[tokio::test]
async fn test_tag_autocomplete() {
    let (client, _) = client().await;
    let body = client.get("/admin/tags/tag/autocomplete/?term=sell").await.value();
    assert_eq!(body["results"], json!([{"id": "2", "text": "bestseller"}]));
}

// ═════════════════════════════════════════════════════════════════════
// Collections
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_collection_products_count_links_to_products() {
    let (client, _) = client().await;
    let page = client.get("/admin/store/collection/").await.value();
    assert_eq!(column(&page, 0), vec!["Beauty", "Cleaning", "Grocery", "Pets", "Stationery"]);

    let grocery = &page["results"][2]["cells"][1];
    assert_eq!(grocery["html"], true);
    assert_eq!(
        grocery["display"],
        "<a href=\"/admin/store/product/?collection__id=3\">4</a>"
    );

    let products = client
        .get("/admin/store/product/?collection__id=3")
        .await
        .value();
    assert_eq!(products["count"], 4);
    assert_eq!(ids(&products), vec!["8", "7", "6", "5"]);

    let collection = products["filters"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["field"] == "collection")
        .unwrap();
    let selected: Vec<_> = collection["choices"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["selected"] == true)
        .map(|c| c["display"].as_str().unwrap())
        .collect();
    assert_eq!(selected, vec!["Grocery"]);
}

#[tokio::test]
async fn test_collection_sorts_by_products_count() {
    let (client, _) = client().await;
    let page = client
        .get("/admin/store/collection/?o=-products_count")
        .await
        .value();
    assert_eq!(ids(&page), vec!["3", "5", "4", "2", "1"]);
}

#[tokio::test]
async fn test_collection_with_products_is_protected() {
    let (client, db) = client().await;
    let response = client.delete("/admin/store/collection/1/").await;
    assert_eq!(response.status_code(), 409);
    assert!(response.value()["error"]
        .as_str()
        .unwrap()
        .contains("'Product.collection'"));
    assert_eq!(db.count("store.collection").unwrap(), 5);
}

// ═════════════════════════════════════════════════════════════════════
// Customers
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_customer_changelist() {
    let (client, _) = client().await;
    let page = client.get("/admin/store/customer/").await.value();
    assert_eq!(column(&page, 0), vec!["Ada", "Alan", "Barbara", "Edsger", "Grace", "Ken"]);
    assert_eq!(column(&page, 2)[0], "Gold");

    let page = client.get("/admin/store/customer/?q=ada").await.value();
    assert_eq!(ids(&page), vec!["1"]);
    assert_eq!(page["results"][0]["repr"], "Ada Lovelace");
}

#[tokio::test]
async fn test_membership_is_editable_in_the_changelist() {
    let (client, db) = client().await;
    let response = client
        .post_json(
            "/admin/store/customer/editable/",
            &json!([{"pk": 3, "membership": "S"}]),
        )
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        db.get_object("store.customer", "3").await.unwrap()["membership"],
        "S"
    );

    let response = client
        .post_json(
            "/admin/store/customer/editable/",
            &json!([{"pk": 3, "membership": "P"}]),
        )
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(
        response.value()["fields"]["3-membership"],
        json!(["Select a valid choice. P is not one of the available choices."])
    );
}

#[tokio::test]
async fn test_customer_with_orders_is_protected() {
    let (client, _) = client().await;
    let response = client.delete("/admin/store/customer/1/").await;
    assert_eq!(response.status_code(), 409);
    assert!(response.value()["error"]
        .as_str()
        .unwrap()
        .contains("'Order.customer'"));
}

// ═════════════════════════════════════════════════════════════════════
// Orders
// ═════════════════════════════════════════════════════════════════════

fn order_form(items: usize) -> Value {
    let rows: Vec<Value> = (0..items)
        .map(|n| json!({"product": n % 12 + 1, "quantity": 1, "unit_price": 4.5}))
        .collect();
    json!({
        "fields": {"customer": 2},
        "inlines": {"store.orderitem": rows}
    })
}

#[tokio::test]
async fn test_order_needs_at_least_one_item() {
    let (client, db) = client().await;
    let response = client.post_json("/admin/store/order/", &order_form(0)).await;
    assert_eq!(response.status_code(), 400);
    let body = response.value();
    assert_eq!(body["code"], "min_num");
    assert_eq!(db.count("store.order").unwrap(), 6);
}

#[tokio::test]
async fn test_order_takes_at_most_ten_items() {
    let (client, _) = client().await;
    let response = client.post_json("/admin/store/order/", &order_form(11)).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.value()["code"], "max_num");

    let response = client.post_json("/admin/store/order/", &order_form(10)).await;
    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_add_order_with_items() {
    let (client, db) = client().await;
    let response = client.post_json("/admin/store/order/", &order_form(2)).await;
    assert_eq!(response.status_code(), 201);
    let view = response.value();
    assert_eq!(view["pk"], "7");
    assert_eq!(view["object"]["payment_status"], "P");
    assert!(!view["object"]["placed_at"].is_null());
    assert_eq!(view["related"]["customer"]["text"], "Alan Turing");
    assert_eq!(
        view["autocomplete"]["customer"],
        "/admin/store/customer/autocomplete/"
    );

    let items = db.objects_where("store.orderitem", "order", "7").await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(db.count("store.orderitem").unwrap(), 14);
}

#[tokio::test]
async fn test_order_item_validation() {
    let (client, db) = client().await;
    let form = json!({
        "fields": {"customer": 2},
        "inlines": {"store.orderitem": [{"product": 99, "quantity": -1, "unit_price": 4.5}]}
    });
    let response = client.post_json("/admin/store/order/", &form).await;
    assert_eq!(response.status_code(), 400);
    let body = response.value();
    assert_eq!(body["code"], "invalid");
    let fields = &body["fields"];
    assert!(fields["store.orderitem-0-product"].is_array());
    assert!(fields["store.orderitem-0-quantity"].is_array());
    // An invalid row still counts toward the minimum.
    assert!(fields.get("store.orderitem").is_none());
    assert_eq!(db.count("store.order").unwrap(), 6);
}

#[tokio::test]
async fn test_order_and_item_errors_are_reported_together() {
    let (client, db) = client().await;
    let form = json!({
        "fields": {"customer": 99},
        "inlines": {"store.orderitem": [
            {"product": 1, "quantity": 2, "unit_price": 3.99},
            {"product": 99, "quantity": 1, "unit_price": 4.5}
        ]}
    });
    let response = client.post_json("/admin/store/order/", &form).await;
    assert_eq!(response.status_code(), 400);
    let body = response.value();
    assert_eq!(body["code"], "invalid");
    let fields = body["fields"].as_object().unwrap();
    let mut keys: Vec<_> = fields.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["customer", "store.orderitem-1-product"]);
    assert_eq!(db.count("store.orderitem").unwrap(), 12);
}

#[tokio::test]
async fn test_deleting_an_order_removes_its_items() {
    let (client, db) = client().await;
    assert_eq!(client.delete("/admin/store/order/6/").await.status_code(), 200);
    assert_eq!(db.count("store.order").unwrap(), 5);
    assert_eq!(db.count("store.orderitem").unwrap(), 9);
}

// ═════════════════════════════════════════════════════════════════════
// Site
// ═════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_index_lists_store_and_tags() {
    let (client, _) = client().await;
    let body = client.get("/admin/").await.value();
    assert_eq!(body["site_name"], "Storefront administration");
    let apps: Vec<_> = body["apps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["app_label"].as_str().unwrap())
        .collect();
    assert_eq!(apps, vec!["store", "tags"]);
}

#[tokio::test]
async fn test_unregistered_models_are_not_served() {
    let (client, _) = client().await;
    assert_eq!(client.get("/admin/store/orderitem/").await.status_code(), 404);
    assert_eq!(client.get("/admin/tags/taggeditem/").await.status_code(), 404);
}

#[test]
fn test_inventory_status_boundary() {
    assert_eq!(admin::inventory_status(admin::LOW_INVENTORY_THRESHOLD - 1), "Low");
    assert_eq!(admin::inventory_status(admin::LOW_INVENTORY_THRESHOLD), "OK");
}
