//! Content types.
//!
//! Every registered model gets a [`ContentType`] with a stable numeric id.
//! Generic relations store that id next to the target's primary key, which is
//! how a tagged item can point at a product, a collection, or anything else.

use serde::{Deserialize, Serialize};

/// A model's content type.
///
/// ```
/// use storefront_admin::contrib::contenttypes::ContentTypeRegistry;
///
/// let mut registry = ContentTypeRegistry::new();
/// let ct = registry.get_for_model("store", "product").clone();
/// assert_eq!(ct.id, 1);
/// assert_eq!(ct.model_key(), "store.product");
/// assert_eq!(registry.get_for_model("store", "product").id, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentType {
    /// Numeric id stored by generic relations.
    pub id: i64,
    /// The application label.
    pub app_label: String,
    /// The model name in lowercase.
    pub model: String,
}

impl ContentType {
    /// Returns the model key in `"app_label.model"` format.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} | {}", self.app_label, self.model)
    }
}

/// Registry of content types, assigning ids in registration order.
#[derive(Debug, Clone, Default)]
pub struct ContentTypeRegistry {
    types: Vec<ContentType>,
}

impl ContentTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content type for a model, creating it on first use.
    pub fn get_for_model(&mut self, app_label: &str, model: &str) -> &ContentType {
        let index = match self
            .types
            .iter()
            .position(|ct| ct.app_label == app_label && ct.model == model)
        {
            Some(index) => index,
            None => {
                let id = i64::try_from(self.types.len()).unwrap_or(i64::MAX - 1) + 1;
                self.types.push(ContentType {
                    id,
                    app_label: app_label.to_string(),
                    model: model.to_string(),
                });
                self.types.len() - 1
            }
        };
        &self.types[index]
    }

    /// Looks up an existing content type by model key.
    pub fn lookup(&self, model_key: &str) -> Option<&ContentType> {
        self.types.iter().find(|ct| ct.model_key() == model_key)
    }

    /// Looks up a content type by id.
    pub fn get(&self, id: i64) -> Option<&ContentType> {
        self.types.iter().find(|ct| ct.id == id)
    }

    /// Returns all registered content types.
    pub fn all(&self) -> &[ContentType] {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_and_stable() {
        let mut registry = ContentTypeRegistry::new();
        assert_eq!(registry.get_for_model("store", "product").id, 1);
        assert_eq!(registry.get_for_model("store", "collection").id, 2);
        assert_eq!(registry.get_for_model("store", "product").id, 1);
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_lookup_and_get() {
        let mut registry = ContentTypeRegistry::new();
        registry.get_for_model("tags", "tag");
        registry.get_for_model("store", "product");

        let ct = registry.lookup("store.product").unwrap();
        assert_eq!(ct.id, 2);
        assert_eq!(registry.get(2).unwrap().model, "product");
        assert!(registry.get(9).is_none());
        assert!(registry.lookup("store.order").is_none());
    }

    #[test]
    fn test_content_type_display() {
        let mut registry = ContentTypeRegistry::new();
        let ct = registry.get_for_model("store", "product");
        assert_eq!(ct.to_string(), "store | product");
    }
}
