//! Model metadata.
//!
//! [`ModelMeta`] describes a model's fields the way the admin needs them:
//! types for form validation, relations for lookups and deletion rules, and
//! verbose names for display. Every model the admin touches is registered with
//! its metadata, including models only edited through inlines.

use serde::{Deserialize, Serialize};

/// The kind of a model field.
///
/// Serialized with the conventional field class names so a frontend can pick
/// widgets from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    AutoField,
    /// Bounded string.
    CharField,
    /// URL-safe identifier string.
    SlugField,
    /// Unbounded string.
    TextField,
    /// String containing an e-mail address.
    EmailField,
    /// Signed integer.
    IntegerField,
    /// Integer that may not be negative.
    PositiveIntegerField,
    /// Integer in `0..=32767`.
    PositiveSmallIntegerField,
    /// Fixed-point decimal.
    DecimalField,
    /// Calendar date (`YYYY-MM-DD`).
    DateField,
    /// RFC 3339 timestamp.
    DateTimeField,
    /// Reference to another model's primary key.
    ForeignKey,
}

impl FieldType {
    /// Returns `true` for date and datetime fields.
    pub const fn is_temporal(self) -> bool {
        matches!(self, Self::DateField | Self::DateTimeField)
    }
}

/// What happens to referencing rows when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    Cascade,
    /// Refuse the delete while references exist.
    Protect,
    /// Null out the reference.
    SetNull,
}

/// Schema information about a single model field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FieldSchema {
    /// The field name, also the key in stored rows.
    pub name: String,
    /// The field kind.
    pub field_type: FieldType,
    /// Whether a value must be supplied on creation.
    pub required: bool,
    /// Whether the field is excluded from forms.
    pub read_only: bool,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether values must be unique across the table.
    pub unique: bool,
    /// Maximum character length, if applicable.
    pub max_length: Option<usize>,
    /// Minimum numeric value, if applicable.
    pub min_value: Option<i64>,
    /// Total digits allowed for decimals.
    pub max_digits: Option<u32>,
    /// Digits allowed after the decimal point.
    pub decimal_places: Option<u32>,
    /// Human-readable label.
    pub label: String,
    /// Help text for the field.
    pub help_text: String,
    /// Allowed choices as (stored value, label) pairs.
    pub choices: Option<Vec<(String, String)>>,
    /// Target model key for foreign keys (e.g. `"store.collection"`).
    pub related_model: Option<String>,
    /// Deletion rule for foreign keys.
    pub on_delete: Option<OnDelete>,
    /// Set to the current time on every save.
    pub auto_now: bool,
    /// Set to the current time when the row is created.
    pub auto_now_add: bool,
    /// Value used when a new row omits the field.
    pub default: Option<serde_json::Value>,
}

impl FieldSchema {
    /// Creates a required, editable field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            read_only: false,
            primary_key: false,
            unique: false,
            max_length: None,
            min_value: None,
            max_digits: None,
            decimal_places: None,
            label,
            help_text: String::new(),
            choices: None,
            related_model: None,
            on_delete: None,
            auto_now: false,
            auto_now_add: false,
            default: None,
        }
    }

    /// Creates the conventional `id` auto primary key.
    pub fn auto_id() -> Self {
        Self::new("id", FieldType::AutoField).primary_key().label("ID")
    }

    /// Marks this field as optional.
    #[must_use]
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Marks this field as read-only.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.read_only = true;
        self.required = false;
        self
    }

    /// Requires unique values.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the maximum length.
    #[must_use]
    pub const fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Sets the minimum value.
    #[must_use]
    pub const fn min_value(mut self, min: i64) -> Self {
        self.min_value = Some(min);
        self
    }

    /// Sets decimal precision.
    #[must_use]
    pub const fn decimal(mut self, max_digits: u32, decimal_places: u32) -> Self {
        self.max_digits = Some(max_digits);
        self.decimal_places = Some(decimal_places);
        self
    }

    /// Sets the human-readable label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Restricts values to the given (value, label) choices.
    #[must_use]
    pub fn choices(mut self, choices: &[(&str, &str)]) -> Self {
        self.choices = Some(
            choices
                .iter()
                .map(|(v, l)| ((*v).to_string(), (*l).to_string()))
                .collect(),
        );
        self
    }

    /// Makes this field a foreign key to `related_model`.
    #[must_use]
    pub fn foreign_key(mut self, related_model: impl Into<String>, on_delete: OnDelete) -> Self {
        self.field_type = FieldType::ForeignKey;
        self.related_model = Some(related_model.into());
        self.on_delete = Some(on_delete);
        self
    }

    /// Sets the field to "now" on every save; implies read-only.
    #[must_use]
    pub const fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self.read_only = true;
        self.required = false;
        self
    }

    /// Sets the field to "now" on creation; implies read-only.
    #[must_use]
    pub const fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self.read_only = true;
        self.required = false;
        self
    }

    /// Sets the value used when a new row omits the field; the field becomes optional.
    #[must_use]
    pub fn default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Returns `true` if this is a foreign key.
    pub const fn is_relation(&self) -> bool {
        matches!(self.field_type, FieldType::ForeignKey)
    }

    /// Returns the label for a stored choice value, if this field has choices.
    pub fn choice_label(&self, value: &str) -> Option<&str> {
        self.choices
            .as_ref()?
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, label)| label.as_str())
    }
}

/// Metadata for one model.
///
/// ```
/// use storefront_admin::meta::{FieldSchema, FieldType, ModelMeta};
///
/// let meta = ModelMeta::new("store", "collection")
///     .fields(vec![
///         FieldSchema::auto_id(),
///         FieldSchema::new("title", FieldType::CharField).max_length(255),
///     ])
///     .ordering(vec!["title"]);
/// assert_eq!(meta.model_key(), "store.collection");
/// assert_eq!(meta.verbose_name_plural, "collections");
/// assert!(meta.field("title").is_some());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
    /// Application label (e.g. `"store"`).
    pub app_label: String,
    /// Lower-case model name (e.g. `"orderitem"`).
    pub model_name: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Human-readable plural name.
    pub verbose_name_plural: String,
    /// Field definitions in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Default ordering (prefix with `-` for descending).
    pub ordering: Vec<String>,
}

impl ModelMeta {
    /// Creates metadata with derived verbose names and no fields.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        let verbose_name = model_name.replace('_', " ");
        let verbose_name_plural = format!("{verbose_name}s");
        Self {
            app_label: app_label.into(),
            model_name,
            verbose_name,
            verbose_name_plural,
            fields: Vec::new(),
            ordering: Vec::new(),
        }
    }

    /// Sets the singular verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the plural verbose name.
    #[must_use]
    pub fn verbose_name_plural(mut self, name: impl Into<String>) -> Self {
        self.verbose_name_plural = name.into();
        self
    }

    /// Sets the field definitions.
    #[must_use]
    pub fn fields(mut self, fields: Vec<FieldSchema>) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the default ordering.
    #[must_use]
    pub fn ordering(mut self, fields: Vec<&str>) -> Self {
        self.ordering = fields.into_iter().map(String::from).collect();
        self
    }

    /// Returns the model key in `"app_label.model_name"` format.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the primary key field name, `"id"` when none is declared.
    pub fn pk_name(&self) -> &str {
        self.fields
            .iter()
            .find(|f| f.primary_key)
            .map_or("id", |f| f.name.as_str())
    }

    /// Returns the foreign keys that point at `model_key`.
    pub fn relations_to<'a>(&'a self, model_key: &'a str) -> impl Iterator<Item = &'a FieldSchema> {
        self.fields
            .iter()
            .filter(move |f| f.related_model.as_deref() == Some(model_key))
    }
}
