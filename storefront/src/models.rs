//! Store models.
//!
//! Each model is a typed struct that converts to and from the JSON rows the
//! admin stores, plus the [`ModelMeta`] the admin validates and renders it
//! with. Foreign keys hold the referenced primary key.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storefront_admin::meta::{FieldSchema, FieldType, ModelMeta, OnDelete};
use storefront_core::{StoreError, StoreResult};

/// A typed model stored as an admin row.
///
/// ```
/// use storefront::models::{Collection, Record};
///
/// let row = Collection::new("Beauty").to_row().unwrap();
/// assert_eq!(row["title"], "Beauty");
/// assert!(!row.contains_key("id"));
/// assert_eq!(Collection::MODEL_KEY, "store.collection");
/// ```
pub trait Record: Serialize + DeserializeOwned {
    /// The `"app_label.model_name"` key rows are stored under.
    const MODEL_KEY: &'static str;

    /// The model's admin metadata.
    fn meta() -> ModelMeta;

    /// Converts the record into a row. An unset `id` is left out so the
    /// store assigns one.
    fn to_row(&self) -> StoreResult<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(StoreError::SerializationError(format!(
                "{} serialized to {other} instead of an object",
                Self::MODEL_KEY
            ))),
            Err(e) => Err(StoreError::SerializationError(e.to_string())),
        }
    }

    /// Reads a record back from a stored row.
    fn from_row(row: Value) -> StoreResult<Self> {
        serde_json::from_value(row).map_err(|e| {
            StoreError::SerializationError(format!("{}: {e}", Self::MODEL_KEY))
        })
    }
}

/// Customer membership tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Membership {
    /// Entry tier.
    #[default]
    #[serde(rename = "B")]
    Bronze,
    /// Middle tier.
    #[serde(rename = "S")]
    Silver,
    /// Top tier.
    #[serde(rename = "G")]
    Gold,
}

impl Membership {
    /// Stored value and label of each tier.
    pub const CHOICES: [(&'static str, &'static str); 3] =
        [("B", "Bronze"), ("S", "Silver"), ("G", "Gold")];
}

/// Payment state of an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Awaiting payment.
    #[default]
    #[serde(rename = "P")]
    Pending,
    /// Paid.
    #[serde(rename = "C")]
    Complete,
    /// Payment was declined.
    #[serde(rename = "F")]
    Failed,
}

impl PaymentStatus {
    /// Stored value and label of each state.
    pub const CHOICES: [(&'static str, &'static str); 3] =
        [("P", "Pending"), ("C", "Complete"), ("F", "Failed")];
}

// ── Collection ──────────────────────────────────────────────────────

/// A group of products shown together in the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub featured_product: Option<i64>,
}

impl Collection {
    /// Creates an unsaved collection.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            featured_product: None,
        }
    }
}

impl Record for Collection {
    const MODEL_KEY: &'static str = "store.collection";

    fn meta() -> ModelMeta {
        ModelMeta::new("store", "collection")
            .fields(vec![
                FieldSchema::auto_id(),
                FieldSchema::new("title", FieldType::CharField).max_length(255),
                FieldSchema::new("featured_product", FieldType::ForeignKey)
                    .foreign_key(Product::MODEL_KEY, OnDelete::SetNull)
                    .optional(),
            ])
            .ordering(vec!["title"])
    }
}

// ── Product ─────────────────────────────────────────────────────────

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    pub inventory: i64,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    pub collection: i64,
}

impl Record for Product {
    const MODEL_KEY: &'static str = "store.product";

    fn meta() -> ModelMeta {
        ModelMeta::new("store", "product").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("title", FieldType::CharField).max_length(255),
            FieldSchema::new("slug", FieldType::SlugField),
            FieldSchema::new("description", FieldType::TextField).optional(),
            FieldSchema::new("unit_price", FieldType::DecimalField)
                .decimal(6, 2)
                .min_value(1),
            FieldSchema::new("inventory", FieldType::IntegerField).min_value(0),
            FieldSchema::new("last_update", FieldType::DateTimeField).auto_now(),
            FieldSchema::new("collection", FieldType::ForeignKey)
                .foreign_key(Collection::MODEL_KEY, OnDelete::Protect),
        ])
    }
}

// ── Customer ────────────────────────────────────────────────────────

/// A shop customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub membership: Membership,
}

impl Customer {
    /// The customer's display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Record for Customer {
    const MODEL_KEY: &'static str = "store.customer";

    fn meta() -> ModelMeta {
        ModelMeta::new("store", "customer")
            .fields(vec![
                FieldSchema::auto_id(),
                FieldSchema::new("first_name", FieldType::CharField).max_length(255),
                FieldSchema::new("last_name", FieldType::CharField).max_length(255),
                FieldSchema::new("email", FieldType::EmailField).unique(),
                FieldSchema::new("phone", FieldType::CharField).max_length(255),
                FieldSchema::new("birth_date", FieldType::DateField).optional(),
                FieldSchema::new("membership", FieldType::CharField)
                    .max_length(1)
                    .choices(&Membership::CHOICES)
                    .default("B"),
            ])
            .ordering(vec!["first_name", "last_name"])
    }
}

// ── Order ───────────────────────────────────────────────────────────

/// A customer's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub placed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub customer: i64,
}

impl Record for Order {
    const MODEL_KEY: &'static str = "store.order";

    fn meta() -> ModelMeta {
        ModelMeta::new("store", "order").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("placed_at", FieldType::DateTimeField).auto_now_add(),
            FieldSchema::new("payment_status", FieldType::CharField)
                .max_length(1)
                .choices(&PaymentStatus::CHOICES)
                .default("P"),
            FieldSchema::new("customer", FieldType::ForeignKey)
                .foreign_key(Customer::MODEL_KEY, OnDelete::Protect),
        ])
    }
}

// ── OrderItem ───────────────────────────────────────────────────────

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub order: i64,
    pub product: i64,
    pub quantity: u16,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

impl Record for OrderItem {
    const MODEL_KEY: &'static str = "store.orderitem";

    fn meta() -> ModelMeta {
        ModelMeta::new("store", "orderitem")
            .verbose_name("order item")
            .verbose_name_plural("order items")
            .fields(vec![
                FieldSchema::auto_id(),
                FieldSchema::new("order", FieldType::ForeignKey)
                    .foreign_key(Order::MODEL_KEY, OnDelete::Cascade),
                FieldSchema::new("product", FieldType::ForeignKey)
                    .foreign_key(Product::MODEL_KEY, OnDelete::Protect),
                FieldSchema::new("quantity", FieldType::PositiveSmallIntegerField),
                FieldSchema::new("unit_price", FieldType::DecimalField)
                    .decimal(6, 2)
                    .min_value(1),
            ])
    }
}

/// Metadata of every store model.
pub fn metas() -> Vec<ModelMeta> {
    vec![
        Collection::meta(),
        Product::meta(),
        Customer::meta(),
        Order::meta(),
        OrderItem::meta(),
    ]
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_row_stores_price_as_number() {
        let product = Product {
            id: None,
            title: "Coffee - Espresso".into(),
            slug: "-".into(),
            description: None,
            unit_price: Decimal::from_str("12.50").unwrap(),
            inventory: 4,
            last_update: None,
            collection: 2,
        };
        let row = product.to_row().unwrap();
        assert_eq!(row["unit_price"], json!(12.5));
        assert_eq!(row["collection"], 2);
        assert!(!row.contains_key("id"));
    }

    #[test]
    fn test_customer_from_row() {
        let customer = Customer::from_row(json!({
            "id": 3,
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": "ada@example.com",
            "phone": "555-0100",
            "birth_date": "1815-12-10",
            "membership": "G"
        }))
        .unwrap();
        assert_eq!(customer.id, Some(3));
        assert_eq!(customer.membership, Membership::Gold);
        assert_eq!(customer.full_name(), "Ada Lovelace");
        assert_eq!(customer.birth_date, NaiveDate::from_ymd_opt(1815, 12, 10));
    }

    #[test]
    fn test_from_row_reports_model() {
        let err = Order::from_row(json!({"customer": "nobody"})).unwrap_err();
        assert!(matches!(err, StoreError::SerializationError(ref msg) if msg.starts_with("store.order")));
    }

    #[test]
    fn test_meta_relations() {
        let product = Product::meta();
        let collection = product.field("collection").unwrap();
        assert_eq!(collection.related_model.as_deref(), Some("store.collection"));
        assert_eq!(collection.on_delete, Some(OnDelete::Protect));
        assert!(product.field("last_update").unwrap().auto_now);

        let customer = Customer::meta();
        let membership = customer.field("membership").unwrap();
        assert_eq!(membership.choice_label("S"), Some("Silver"));
        assert!(!membership.required);
        assert_eq!(customer.ordering, vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_metas_cover_store_app() {
        let keys: Vec<String> = metas().iter().map(ModelMeta::model_key).collect();
        assert_eq!(
            keys,
            vec![
                "store.collection",
                "store.product",
                "store.customer",
                "store.order",
                "store.orderitem"
            ]
        );
    }
}
