//! Admin registrations for the store app.
//!
//! The configurations are plain [`ModelAdmin`] values. What they cannot say as
//! data lives in the display columns ([`InventoryStatus`], [`ProductsCount`])
//! and the [`ClearInventoryAction`].

use async_trait::async_trait;
use serde_json::{Map, Value};
use storefront_admin::actions::{ActionResult, AdminAction};
use storefront_admin::contrib::messages::MessageLevel;
use storefront_admin::db::pk_of;
use storefront_admin::display::{DisplayColumn, DisplayValue};
use storefront_admin::model_admin::{Annotation, InlineAdmin, ModelAdmin};
use storefront_admin::site::AdminSite;
use storefront_admin::urls::AdminUrls;
use storefront_core::utils::html::format_html;
use storefront_core::utils::http::urlencode;
use storefront_core::{StoreError, StoreResult};

use crate::models::{self, Collection, Customer, Product, Record};
use crate::tags;

/// Products with fewer units than this are reported as low on stock.
pub const LOW_INVENTORY_THRESHOLD: i64 = 10;

/// Stock label for an inventory count.
///
/// ```
/// use storefront::admin::inventory_status;
///
/// assert_eq!(inventory_status(9), "Low");
/// assert_eq!(inventory_status(10), "OK");
/// ```
pub const fn inventory_status(inventory: i64) -> &'static str {
    if inventory < LOW_INVENTORY_THRESHOLD {
        "Low"
    } else {
        "OK"
    }
}

/// Link from a collection to the product changelist filtered to it.
///
/// ```
/// use storefront::admin::products_count_link;
/// use storefront_admin::urls::AdminUrls;
///
/// let html = products_count_link(&AdminUrls::new("/admin"), "3", 12);
/// assert_eq!(html, "<a href=\"/admin/store/product/?collection__id=3\">12</a>");
/// ```
pub fn products_count_link(urls: &AdminUrls, collection_id: &str, count: u64) -> String {
    let url = format!(
        "{}?{}",
        urls.changelist("store", "product"),
        urlencode(&[("collection__id", collection_id)])
    );
    format_html("<a href=\"{}\">{}</a>", &[&url, &count])
}

// ── Display columns ─────────────────────────────────────────────────

/// `"Low"` or `"OK"` depending on the product's inventory; sorts by inventory.
#[derive(Debug)]
pub struct InventoryStatus;

impl DisplayColumn for InventoryStatus {
    fn name(&self) -> &str {
        "inventory_status"
    }

    fn ordering(&self) -> Option<&str> {
        Some("inventory")
    }

    fn render(&self, row: &Value, _urls: &AdminUrls) -> StoreResult<DisplayValue> {
        let inventory = row
            .get("inventory")
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                StoreError::ImproperlyConfigured(format!(
                    "product {} has no integer inventory",
                    pk_of(row)
                ))
            })?;
        Ok(DisplayValue::Text(inventory_status(inventory).to_string()))
    }
}

/// Number of products in a collection, linked to those products.
///
/// Reads the `products_count` annotation of [`collection_admin`].
#[derive(Debug)]
pub struct ProductsCount;

impl DisplayColumn for ProductsCount {
    fn name(&self) -> &str {
        "products_count"
    }

    fn ordering(&self) -> Option<&str> {
        Some("products_count")
    }

    fn render(&self, row: &Value, urls: &AdminUrls) -> StoreResult<DisplayValue> {
        let count = row
            .get("products_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                StoreError::ImproperlyConfigured(
                    "products_count needs the collection rows to be annotated".to_string(),
                )
            })?;
        Ok(DisplayValue::Html(products_count_link(urls, &pk_of(row), count)))
    }
}

/// Shows a row as one of its text fields.
struct FieldStr(&'static str);

impl DisplayColumn for FieldStr {
    fn name(&self) -> &str {
        "__str__"
    }

    fn render(&self, row: &Value, _urls: &AdminUrls) -> StoreResult<DisplayValue> {
        Ok(DisplayValue::Text(
            row.get(self.0)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ))
    }
}

/// Shows a customer as "first last".
struct CustomerName;

impl DisplayColumn for CustomerName {
    fn name(&self) -> &str {
        "__str__"
    }

    fn render(&self, row: &Value, _urls: &AdminUrls) -> StoreResult<DisplayValue> {
        let part = |field: &str| row.get(field).and_then(Value::as_str).unwrap_or_default();
        Ok(DisplayValue::Text(
            format!("{} {}", part("first_name"), part("last_name"))
                .trim()
                .to_string(),
        ))
    }
}

// ── Actions ─────────────────────────────────────────────────────────

/// Sets the inventory of the selected products to zero.
#[derive(Debug)]
pub struct ClearInventoryAction;

#[async_trait]
impl AdminAction for ClearInventoryAction {
    fn name(&self) -> &'static str {
        "clear_inventory"
    }

    fn description(&self) -> &'static str {
        "Clear Inventory"
    }

    async fn execute(
        &self,
        site: &AdminSite,
        model_key: &str,
        selected_ids: &[String],
    ) -> StoreResult<ActionResult> {
        let mut changes = Map::new();
        changes.insert("inventory".to_string(), Value::from(0));
        let updated = site
            .db()
            .update_objects(model_key, selected_ids, &changes)
            .await?;
        Ok(ActionResult::success(
            format!("{updated} products were successfully updated"),
            updated,
        )
        .with_level(MessageLevel::Info))
    }
}

// ── Model admins ────────────────────────────────────────────────────

/// The product changelist: stock status, inline price edits, tags.
pub fn product_admin() -> ModelAdmin {
    ModelAdmin::new("store", "product")
        .list_display(vec!["title", "unit_price", "inventory_status", "collection"])
        .list_editable(vec!["unit_price"])
        .list_per_page(5)
        .list_select_related(vec!["collection"])
        .list_filter(vec!["collection", "last_update"])
        .actions(vec!["clear_inventory"])
        .search_fields(vec!["title", "description"])
        .inlines(vec![tags::tag_inline()])
}

pub fn customer_admin() -> ModelAdmin {
    ModelAdmin::new("store", "customer")
        .list_display(vec!["first_name", "last_name", "membership"])
        .list_editable(vec!["membership"])
        .list_per_page(10)
        .ordering(vec!["first_name", "last_name"])
        .search_fields(vec!["first_name", "last_name"])
}

/// Order lines edited on the order page; an order keeps one to ten lines.
pub fn order_item_inline() -> InlineAdmin {
    InlineAdmin::tabular("store", "orderitem", "order")
        .autocomplete_fields(vec!["product"])
        .min_num(1)
        .max_num(Some(10))
        .extra(0)
}

pub fn order_admin() -> ModelAdmin {
    ModelAdmin::new("store", "order")
        .inlines(vec![order_item_inline()])
        .autocomplete_fields(vec!["customer"])
        .list_display(vec!["id", "placed_at", "customer"])
}

/// Collections with a linked count of their products.
pub fn collection_admin() -> ModelAdmin {
    ModelAdmin::new("store", "collection")
        .list_display(vec!["title", "products_count"])
        .annotate(Annotation::count(
            "products_count",
            Product::MODEL_KEY,
            "collection",
        ))
}

/// Registers the store models, the tags app, and their admin configuration.
pub fn register(site: &mut AdminSite) {
    for meta in models::metas() {
        site.register_model(meta);
    }
    tags::register(site);

    site.register_display(Collection::MODEL_KEY, Box::new(FieldStr("title")));
    site.register_display(Collection::MODEL_KEY, Box::new(ProductsCount));
    site.register_display(Product::MODEL_KEY, Box::new(FieldStr("title")));
    site.register_display(Product::MODEL_KEY, Box::new(InventoryStatus));
    site.register_display(Customer::MODEL_KEY, Box::new(CustomerName));
    site.add_action(Box::new(ClearInventoryAction));

    site.register(product_admin());
    site.register(customer_admin());
    site.register(order_admin());
    site.register(collection_admin());
}
