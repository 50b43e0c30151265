//! Demo catalogue loaded by `storefront serve`.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use storefront_admin::site::AdminSite;
use storefront_core::{StoreError, StoreResult};

use crate::models::{
    Collection, Customer, Membership, Order, OrderItem, PaymentStatus, Product, Record,
};
use crate::tags::{Tag, TaggedItem};

/// Row counts written by [`seed_demo_data`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub collections: usize,
    pub products: usize,
    pub customers: usize,
    pub orders: usize,
    pub order_items: usize,
    pub tags: usize,
}

const COLLECTIONS: [&str; 5] = ["Beauty", "Cleaning", "Grocery", "Pets", "Stationery"];

// (title, unit price in cents, inventory, collection index)
const PRODUCTS: [(&str, i64, i64, usize); 12] = [
    ("Lip Balm - Mint", 399, 42, 0),
    ("Face Cream", 1_850, 7, 0),
    ("Dish Soap", 275, 120, 1),
    ("Glass Cleaner", 460, 3, 1),
    ("Rolled Oats", 329, 64, 2),
    ("Coffee - Espresso Roast", 1_299, 9, 2),
    ("Honey - Wildflower", 845, 15, 2),
    ("Olive Oil - Extra Virgin", 1_475, 0, 2),
    ("Dog Biscuits", 599, 33, 3),
    ("Cat Litter", 1_120, 11, 3),
    ("Gel Pens", 799, 58, 4),
    ("Spiral Notebook", 249, 4, 4),
];

// (first name, last name, membership)
const CUSTOMERS: [(&str, &str, Membership); 6] = [
    ("Ada", "Lovelace", Membership::Gold),
    ("Alan", "Turing", Membership::Silver),
    ("Barbara", "Liskov", Membership::Bronze),
    ("Edsger", "Dijkstra", Membership::Bronze),
    ("Grace", "Hopper", Membership::Gold),
    ("Ken", "Thompson", Membership::Silver),
];

const TAGS: [&str; 3] = ["organic", "bestseller", "clearance"];

/// Writes the demo catalogue through the site's object store.
///
/// Every product is stamped with the current time, every order gets between
/// one and three lines, and a few products are tagged.
pub async fn seed_demo_data(site: &AdminSite) -> StoreResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    let now = Utc::now();

    let mut collection_ids = Vec::with_capacity(COLLECTIONS.len());
    for title in COLLECTIONS {
        collection_ids.push(insert(site, &Collection::new(title)).await?);
        summary.collections += 1;
    }

    let mut products = Vec::with_capacity(PRODUCTS.len());
    for (title, cents, inventory, collection) in PRODUCTS {
        let product = Product {
            id: None,
            title: title.to_string(),
            slug: slugify(title),
            description: Some(format!("{title} from the demo catalogue.")),
            unit_price: Decimal::new(cents, 2),
            inventory,
            last_update: Some(now),
            collection: collection_ids[collection],
        };
        let id = insert(site, &product).await?;
        products.push((id, product.unit_price));
        summary.products += 1;
    }

    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (first_name, last_name, membership) in CUSTOMERS {
        let customer = Customer {
            id: None,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: format!(
                "{}.{}@example.com",
                first_name.to_lowercase(),
                last_name.to_lowercase()
            ),
            phone: format!("555-01{:02}", customer_ids.len()),
            birth_date: NaiveDate::from_ymd_opt(1980, 1, 1),
            membership,
        };
        customer_ids.push(insert(site, &customer).await?);
        summary.customers += 1;
    }

    let statuses = [
        PaymentStatus::Complete,
        PaymentStatus::Pending,
        PaymentStatus::Failed,
    ];
    for (index, customer) in customer_ids.iter().enumerate() {
        let order = Order {
            id: None,
            placed_at: Some(now),
            payment_status: statuses[index % statuses.len()],
            customer: *customer,
        };
        let order_id = insert(site, &order).await?;
        summary.orders += 1;

        for line in 0..=(index % 3) {
            let (product, unit_price) = products[(index * 2 + line) % products.len()];
            let item = OrderItem {
                id: None,
                order: order_id,
                product,
                quantity: u16::try_from(line + 1).unwrap_or(1),
                unit_price,
            };
            insert(site, &item).await?;
            summary.order_items += 1;
        }
    }

    let content_type = site.content_type_for(Product::MODEL_KEY)?.id;
    for (index, label) in TAGS.into_iter().enumerate() {
        let tag = insert(
            site,
            &Tag {
                id: None,
                label: label.to_string(),
            },
        )
        .await?;
        summary.tags += 1;
        let (object_id, _) = products[index * 4];
        insert(
            site,
            &TaggedItem {
                id: None,
                tag,
                content_type,
                object_id,
            },
        )
        .await?;
    }

    tracing::info!(?summary, "demo data loaded");
    Ok(summary)
}

async fn insert<R: Record + Sync>(site: &AdminSite, record: &R) -> StoreResult<i64> {
    let row = site.db().create_object(R::MODEL_KEY, record.to_row()?).await?;
    row.get("id").and_then(Value::as_i64).ok_or_else(|| {
        StoreError::DatabaseError(format!("{} row stored without an integer id", R::MODEL_KEY))
    })
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use storefront_core::checks::has_errors;

    use super::*;
    use crate::admin;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Coffee - Espresso Roast"), "coffee-espresso-roast");
        assert_eq!(slugify("Gel Pens"), "gel-pens");
    }

    #[tokio::test]
    async fn test_seed_demo_data() {
        let mut site = AdminSite::new("admin");
        admin::register(&mut site);
        let summary = seed_demo_data(&site).await.unwrap();
        assert_eq!(summary.collections, 5);
        assert_eq!(summary.products, 12);
        assert_eq!(summary.customers, 6);
        assert_eq!(summary.orders, 6);
        assert_eq!(summary.order_items, 12);
        assert_eq!(summary.tags, 3);
        assert!(!has_errors(&site.check()));

        let product = Product::from_row(site.db().get_object("store.product", "6").await.unwrap())
            .unwrap();
        assert_eq!(product.unit_price, Decimal::new(1_299, 2));
        assert_eq!(product.collection, 3);

        let tagged = site.db().all_objects("tags.taggeditem").await.unwrap();
        assert_eq!(tagged.len(), 3);
        assert_eq!(tagged[1]["object_id"], 5);
    }
}
