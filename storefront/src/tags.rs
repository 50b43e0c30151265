//! The tags app: labels attached to any model through a generic relation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_admin::display::{DisplayColumn, DisplayValue};
use storefront_admin::meta::{FieldSchema, FieldType, ModelMeta, OnDelete};
use storefront_admin::model_admin::{InlineAdmin, ModelAdmin};
use storefront_admin::site::AdminSite;
use storefront_admin::urls::AdminUrls;
use storefront_core::StoreResult;

use crate::models::Record;

/// A label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
}

impl Record for Tag {
    const MODEL_KEY: &'static str = "tags.tag";

    fn meta() -> ModelMeta {
        ModelMeta::new("tags", "tag")
            .fields(vec![
                FieldSchema::auto_id(),
                FieldSchema::new("label", FieldType::CharField).max_length(255),
            ])
            .ordering(vec!["label"])
    }
}

/// A tag applied to one row of any model.
///
/// `content_type` is the tagged model's content type id and `object_id` the
/// tagged row's primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub tag: i64,
    pub content_type: i64,
    pub object_id: i64,
}

impl Record for TaggedItem {
    const MODEL_KEY: &'static str = "tags.taggeditem";

    fn meta() -> ModelMeta {
        ModelMeta::new("tags", "taggeditem")
            .verbose_name("tagged item")
            .verbose_name_plural("tagged items")
            .fields(vec![
                FieldSchema::auto_id(),
                FieldSchema::new("tag", FieldType::ForeignKey)
                    .foreign_key(Tag::MODEL_KEY, OnDelete::Cascade),
                FieldSchema::new("content_type", FieldType::PositiveIntegerField)
                    .label("content type"),
                FieldSchema::new("object_id", FieldType::PositiveIntegerField)
                    .label("object id"),
            ])
    }
}

/// Shows a tag as its label.
struct TagLabel;

impl DisplayColumn for TagLabel {
    fn name(&self) -> &str {
        "__str__"
    }

    fn render(&self, row: &Value, _urls: &AdminUrls) -> StoreResult<DisplayValue> {
        Ok(DisplayValue::Text(
            row.get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        ))
    }
}

/// Tags are searched by label so tag pickers can autocomplete.
pub fn tag_admin() -> ModelAdmin {
    ModelAdmin::new("tags", "tag").search_fields(vec!["label"])
}

/// Generic inline for tagging any registered object.
pub fn tag_inline() -> InlineAdmin {
    InlineAdmin::generic_tabular("tags", "taggeditem").autocomplete_fields(vec!["tag"])
}

/// Registers the tags models and their admin.
pub fn register(site: &mut AdminSite) {
    site.register_model(Tag::meta());
    site.register_model(TaggedItem::meta());
    site.register_display(Tag::MODEL_KEY, Box::new(TagLabel));
    site.register(tag_admin());
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storefront_admin::model_admin::InlineRelation;

    use super::*;

    #[test]
    fn test_tag_label_display() {
        let value = TagLabel
            .render(&json!({"id": 1, "label": "organic"}), &AdminUrls::new("/admin"))
            .unwrap();
        assert_eq!(value, DisplayValue::Text("organic".into()));
    }

    #[test]
    fn test_tag_inline_is_generic() {
        let inline = tag_inline();
        assert_eq!(inline.model_key(), "tags.taggeditem");
        assert_eq!(inline.autocomplete_fields, vec!["tag"]);
        assert_eq!(
            inline.relation,
            InlineRelation::Generic {
                ct_field: "content_type".into(),
                fk_field: "object_id".into(),
            }
        );
    }

    #[test]
    fn test_register() {
        let mut site = AdminSite::new("admin");
        register(&mut site);
        assert!(site.is_registered("tags.tag"));
        assert!(!site.is_registered("tags.taggeditem"));
        assert!(site.get_meta("tags.taggeditem").is_some());
        assert_eq!(
            site.object_repr("tags.tag", &json!({"id": 2, "label": "sale"})),
            "sale"
        );
    }
}
