//! Admin URL reversing.

use serde::Serialize;

/// Builds admin URLs under a fixed prefix.
///
/// ```
/// use storefront_admin::urls::AdminUrls;
///
/// let urls = AdminUrls::new("/admin/");
/// assert_eq!(urls.changelist("store", "product"), "/admin/store/product/");
/// assert_eq!(urls.change("store", "product", "7"), "/admin/store/product/7/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminUrls {
    prefix: String,
}

impl AdminUrls {
    /// Creates a reverser for `prefix`; a trailing slash is ignored.
    pub fn new(prefix: &str) -> Self {
        let trimmed = prefix.trim_end_matches('/');
        let prefix = if trimmed.starts_with('/') || trimmed.is_empty() {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
        Self { prefix }
    }

    /// Returns the prefix without a trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The admin index.
    pub fn index(&self) -> String {
        format!("{}/", self.prefix)
    }

    /// The changelist of a model.
    pub fn changelist(&self, app_label: &str, model_name: &str) -> String {
        format!("{}/{app_label}/{model_name}/", self.prefix)
    }

    /// The change view of one object.
    pub fn change(&self, app_label: &str, model_name: &str, pk: &str) -> String {
        format!("{}/{app_label}/{model_name}/{pk}/", self.prefix)
    }

    /// The autocomplete endpoint of a model.
    pub fn autocomplete(&self, app_label: &str, model_name: &str) -> String {
        format!("{}/{app_label}/{model_name}/autocomplete/", self.prefix)
    }
}
