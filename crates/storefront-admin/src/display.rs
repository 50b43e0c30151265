//! Computed changelist columns.
//!
//! A [`DisplayColumn`] renders a value that is not a stored field, such as a
//! stock status or a link to related rows. Columns declared in
//! `list_display` are resolved against the model's [`DisplayRegistry`] before
//! falling back to fields and annotations.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use storefront_core::StoreResult;

use crate::urls::AdminUrls;

/// The rendered value of a display column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum DisplayValue {
    /// Plain text, escaped by whoever renders it.
    Text(String),
    /// Markup that is already escaped and safe to insert.
    Html(String),
}

impl DisplayValue {
    /// Returns the rendered string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Html(s) => s,
        }
    }

    /// Returns `true` for pre-escaped markup.
    pub const fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }
}

/// A computed column in a changelist.
///
/// ```
/// use serde_json::{json, Value};
/// use storefront_admin::display::{DisplayColumn, DisplayValue};
/// use storefront_admin::urls::AdminUrls;
/// use storefront_core::StoreResult;
///
/// struct Shout;
///
/// impl DisplayColumn for Shout {
///     fn name(&self) -> &str { "shout" }
///     fn render(&self, row: &Value, _urls: &AdminUrls) -> StoreResult<DisplayValue> {
///         let title = row["title"].as_str().unwrap_or_default();
///         Ok(DisplayValue::Text(title.to_uppercase()))
///     }
/// }
///
/// let value = Shout.render(&json!({"title": "mug"}), &AdminUrls::new("/admin")).unwrap();
/// assert_eq!(value.as_str(), "MUG");
/// ```
pub trait DisplayColumn: Send + Sync {
    /// The name used in `list_display`.
    fn name(&self) -> &str;

    /// The column header; defaults to the name with underscores as spaces.
    fn description(&self) -> Option<&str> {
        None
    }

    /// The field (or annotation) the column sorts by, if sortable.
    fn ordering(&self) -> Option<&str> {
        None
    }

    /// Renders the column for one row.
    ///
    /// # Errors
    ///
    /// Returns an error when the row lacks data the column needs.
    fn render(&self, row: &Value, urls: &AdminUrls) -> StoreResult<DisplayValue>;
}

/// The display columns registered for one model.
#[derive(Default)]
pub struct DisplayRegistry {
    columns: HashMap<String, Box<dyn DisplayColumn>>,
}

impl DisplayRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a column, replacing any column with the same name.
    pub fn register(&mut self, column: Box<dyn DisplayColumn>) {
        self.columns.insert(column.name().to_string(), column);
    }

    /// Looks up a column by name.
    pub fn get(&self, name: &str) -> Option<&dyn DisplayColumn> {
        self.columns.get(name).map(AsRef::as_ref)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.columns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for DisplayRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayRegistry")
            .field("columns", &self.names())
            .finish()
    }
}

/// Capitalises the first character, as column headers are shown.
pub fn capfirst(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
