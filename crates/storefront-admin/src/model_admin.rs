//! Model administration configuration.
//!
//! [`ModelAdmin`] controls how a registered model appears in the admin: list
//! columns, editable columns, filters, search, ordering, pagination, inline
//! editors, autocomplete widgets, enabled actions, and queryset annotations.
//! Configuration is built with a chain of builder methods.

use serde::{Deserialize, Serialize};

/// Configuration for how a model is displayed and managed in the admin.
///
/// # Examples
///
/// ```
/// use storefront_admin::model_admin::ModelAdmin;
///
/// let admin = ModelAdmin::new("store", "customer")
///     .list_display(vec!["first_name", "last_name", "membership"])
///     .list_editable(vec!["membership"])
///     .ordering(vec!["first_name", "last_name"])
///     .search_fields(vec!["first_name", "last_name"])
///     .list_per_page(10);
/// assert_eq!(admin.model_key(), "store.customer");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelAdmin {
    /// The application label (e.g. `"store"`).
    pub app_label: String,
    /// The model name in lowercase (e.g. `"product"`).
    pub model_name: String,
    /// Columns of the changelist: field names, annotation names, or display columns.
    pub list_display: Vec<String>,
    /// Columns that link to the change view. Empty means the first column.
    pub list_display_links: Vec<String>,
    /// Fields offered in the filter sidebar.
    pub list_filter: Vec<String>,
    /// Fields searched by the changelist search box.
    pub search_fields: Vec<String>,
    /// Ordering override; empty falls back to the model's default ordering.
    pub ordering: Vec<String>,
    /// Rows per changelist page.
    pub list_per_page: usize,
    /// Largest result set that may be shown on a single page.
    pub list_max_show_all: usize,
    /// Columns editable directly in the changelist.
    pub list_editable: Vec<String>,
    /// Foreign keys resolved together with the changelist rows.
    pub list_select_related: Vec<String>,
    /// Foreign keys edited with an autocomplete widget.
    pub autocomplete_fields: Vec<String>,
    /// Fields shown but never accepted from forms.
    pub readonly_fields: Vec<String>,
    /// Inline editors on the change view.
    pub inlines: Vec<InlineAdmin>,
    /// Names of the actions enabled for this model.
    pub action_names: Vec<String>,
    /// Aggregates computed onto every changelist row.
    pub annotations: Vec<Annotation>,
}

impl ModelAdmin {
    /// Creates a `ModelAdmin` with default configuration.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
            list_display: vec!["__str__".to_string()],
            list_display_links: Vec::new(),
            list_filter: Vec::new(),
            search_fields: Vec::new(),
            ordering: Vec::new(),
            list_per_page: 100,
            list_max_show_all: 200,
            list_editable: Vec::new(),
            list_select_related: Vec::new(),
            autocomplete_fields: Vec::new(),
            readonly_fields: Vec::new(),
            inlines: Vec::new(),
            action_names: vec!["delete_selected".to_string()],
            annotations: Vec::new(),
        }
    }

    /// Sets the changelist columns.
    #[must_use]
    pub fn list_display(mut self, fields: Vec<&str>) -> Self {
        self.list_display = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the columns that link to the change view.
    #[must_use]
    pub fn list_display_links(mut self, fields: Vec<&str>) -> Self {
        self.list_display_links = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the filter sidebar fields.
    #[must_use]
    pub fn list_filter(mut self, fields: Vec<&str>) -> Self {
        self.list_filter = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the fields to search over.
    #[must_use]
    pub fn search_fields(mut self, fields: Vec<&str>) -> Self {
        self.search_fields = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the ordering override.
    #[must_use]
    pub fn ordering(mut self, fields: Vec<&str>) -> Self {
        self.ordering = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the number of rows per page.
    #[must_use]
    pub const fn list_per_page(mut self, count: usize) -> Self {
        self.list_per_page = count;
        self
    }

    /// Sets the maximum number of rows for "show all".
    #[must_use]
    pub const fn list_max_show_all(mut self, count: usize) -> Self {
        self.list_max_show_all = count;
        self
    }

    /// Sets the columns editable in the changelist.
    #[must_use]
    pub fn list_editable(mut self, fields: Vec<&str>) -> Self {
        self.list_editable = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the foreign keys resolved with the changelist rows.
    #[must_use]
    pub fn list_select_related(mut self, fields: Vec<&str>) -> Self {
        self.list_select_related = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the foreign keys edited through autocomplete.
    #[must_use]
    pub fn autocomplete_fields(mut self, fields: Vec<&str>) -> Self {
        self.autocomplete_fields = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the read-only fields.
    #[must_use]
    pub fn readonly_fields(mut self, fields: Vec<&str>) -> Self {
        self.readonly_fields = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the inline editors.
    #[must_use]
    pub fn inlines(mut self, inlines: Vec<InlineAdmin>) -> Self {
        self.inlines = inlines;
        self
    }

    /// Enables additional actions next to `delete_selected`.
    #[must_use]
    pub fn actions(mut self, names: Vec<&str>) -> Self {
        for name in names {
            if !self.action_names.iter().any(|n| n == name) {
                self.action_names.push(name.to_string());
            }
        }
        self
    }

    /// Adds a queryset annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Returns the model key in `"app_label.model_name"` format.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Returns the annotation with the given name, if any.
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name() == name)
    }

    /// Returns the columns that link to the change view.
    pub fn display_links(&self) -> Vec<&str> {
        if self.list_display_links.is_empty() {
            self.list_display.first().map(String::as_str).into_iter().collect()
        } else {
            self.list_display_links.iter().map(String::as_str).collect()
        }
    }
}

/// An aggregate computed onto each changelist row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Annotation {
    /// Number of `related_model` rows whose `fk_field` references the row.
    Count {
        /// Key the count is stored under.
        name: String,
        /// The model holding the foreign key (e.g. `"store.product"`).
        related_model: String,
        /// The foreign key on `related_model` (e.g. `"collection"`).
        fk_field: String,
    },
}

impl Annotation {
    /// Creates a reverse-relation count.
    pub fn count(
        name: impl Into<String>,
        related_model: impl Into<String>,
        fk_field: impl Into<String>,
    ) -> Self {
        Self::Count {
            name: name.into(),
            related_model: related_model.into(),
            fk_field: fk_field.into(),
        }
    }

    /// Returns the key the annotation is stored under.
    pub fn name(&self) -> &str {
        match self {
            Self::Count { name, .. } => name,
        }
    }
}

/// How an inline's rows are attached to the parent object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineRelation {
    /// A plain foreign key on the inline model.
    ForeignKey {
        /// The foreign key field pointing at the parent.
        fk_name: String,
    },
    /// A content-type + object-id pair.
    Generic {
        /// Field holding the content type id.
        ct_field: String,
        /// Field holding the parent's primary key.
        fk_field: String,
    },
}

/// Configuration for inline editing within a parent model's change view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineAdmin {
    /// The app label of the inline model.
    pub app_label: String,
    /// The model name of the inline model.
    pub model_name: String,
    /// The display layout.
    pub inline_type: InlineType,
    /// How rows attach to the parent.
    pub relation: InlineRelation,
    /// Number of extra empty forms to display.
    pub extra: usize,
    /// Minimum number of rows the parent must keep.
    pub min_num: usize,
    /// Maximum number of rows, if bounded.
    pub max_num: Option<usize>,
    /// Fields shown in each row; empty means all editable fields.
    pub fields: Vec<String>,
    /// Foreign keys edited with an autocomplete widget.
    pub autocomplete_fields: Vec<String>,
}

impl InlineAdmin {
    /// Creates a tabular inline attached through `fk_name`.
    pub fn tabular(
        app_label: impl Into<String>,
        model_name: impl Into<String>,
        fk_name: impl Into<String>,
    ) -> Self {
        Self::with_relation(
            app_label,
            model_name,
            InlineType::Tabular,
            InlineRelation::ForeignKey {
                fk_name: fk_name.into(),
            },
        )
    }

    /// Creates a generic tabular inline using `content_type` / `object_id`.
    pub fn generic_tabular(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self::with_relation(
            app_label,
            model_name,
            InlineType::Tabular,
            InlineRelation::Generic {
                ct_field: "content_type".to_string(),
                fk_field: "object_id".to_string(),
            },
        )
    }

    /// Creates an inline with an explicit layout and relation.
    pub fn with_relation(
        app_label: impl Into<String>,
        model_name: impl Into<String>,
        inline_type: InlineType,
        relation: InlineRelation,
    ) -> Self {
        Self {
            app_label: app_label.into(),
            model_name: model_name.into(),
            inline_type,
            relation,
            extra: 3,
            min_num: 0,
            max_num: None,
            fields: Vec::new(),
            autocomplete_fields: Vec::new(),
        }
    }

    /// Sets the number of extra empty forms.
    #[must_use]
    pub const fn extra(mut self, n: usize) -> Self {
        self.extra = n;
        self
    }

    /// Sets the minimum number of rows.
    #[must_use]
    pub const fn min_num(mut self, n: usize) -> Self {
        self.min_num = n;
        self
    }

    /// Sets the maximum number of rows.
    #[must_use]
    pub const fn max_num(mut self, n: Option<usize>) -> Self {
        self.max_num = n;
        self
    }

    /// Sets the fields to display.
    #[must_use]
    pub fn fields(mut self, fields: Vec<&str>) -> Self {
        self.fields = fields.into_iter().map(String::from).collect();
        self
    }

    /// Sets the autocomplete fields.
    #[must_use]
    pub fn autocomplete_fields(mut self, fields: Vec<&str>) -> Self {
        self.autocomplete_fields = fields.into_iter().map(String::from).collect();
        self
    }

    /// Returns the inline model key.
    pub fn model_key(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Returns the fields the admin fills in from the parent.
    pub fn parent_fields(&self) -> Vec<&str> {
        match &self.relation {
            InlineRelation::ForeignKey { fk_name } => vec![fk_name.as_str()],
            InlineRelation::Generic { ct_field, fk_field } => {
                vec![ct_field.as_str(), fk_field.as_str()]
            }
        }
    }
}

/// The visual layout style for inline editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineType {
    /// Table-based layout with each inline as a row.
    Tabular,
    /// Form-based layout with each inline as a full form block.
    Stacked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_admin_new_defaults() {
        let admin = ModelAdmin::new("store", "product");
        assert_eq!(admin.app_label, "store");
        assert_eq!(admin.model_name, "product");
        assert_eq!(admin.list_display, vec!["__str__"]);
        assert!(admin.list_display_links.is_empty());
        assert!(admin.list_filter.is_empty());
        assert!(admin.search_fields.is_empty());
        assert!(admin.ordering.is_empty());
        assert_eq!(admin.list_per_page, 100);
        assert_eq!(admin.list_max_show_all, 200);
        assert_eq!(admin.action_names, vec!["delete_selected"]);
        assert!(admin.annotations.is_empty());
    }

    #[test]
    fn test_model_admin_builder() {
        let admin = ModelAdmin::new("store", "product")
            .list_display(vec!["title", "unit_price", "inventory_status", "collection"])
            .list_editable(vec!["unit_price"])
            .list_per_page(5)
            .list_select_related(vec!["collection"])
            .list_filter(vec!["collection", "last_update"])
            .search_fields(vec!["title", "description"])
            .readonly_fields(vec!["slug"])
            .list_max_show_all(50);

        assert_eq!(admin.list_display.len(), 4);
        assert_eq!(admin.list_editable, vec!["unit_price"]);
        assert_eq!(admin.list_per_page, 5);
        assert_eq!(admin.list_select_related, vec!["collection"]);
        assert_eq!(admin.list_filter, vec!["collection", "last_update"]);
        assert_eq!(admin.search_fields, vec!["title", "description"]);
        assert_eq!(admin.readonly_fields, vec!["slug"]);
        assert_eq!(admin.list_max_show_all, 50);
    }

    #[test]
    fn test_actions_extend_default_without_duplicates() {
        let admin = ModelAdmin::new("store", "product")
            .actions(vec!["clear_inventory", "delete_selected", "clear_inventory"]);
        assert_eq!(admin.action_names, vec!["delete_selected", "clear_inventory"]);
    }

    #[test]
    fn test_display_links_default_to_first_column() {
        let admin = ModelAdmin::new("store", "order").list_display(vec!["id", "placed_at"]);
        assert_eq!(admin.display_links(), vec!["id"]);

        let admin = admin.list_display_links(vec!["placed_at"]);
        assert_eq!(admin.display_links(), vec!["placed_at"]);
    }

    #[test]
    fn test_annotation_lookup() {
        let admin = ModelAdmin::new("store", "collection").annotate(Annotation::count(
            "products_count",
            "store.product",
            "collection",
        ));
        assert!(admin.annotation("products_count").is_some());
        assert!(admin.annotation("orders_count").is_none());
        assert_eq!(admin.annotations[0].name(), "products_count");
    }

    #[test]
    fn test_inline_tabular() {
        let inline = InlineAdmin::tabular("store", "orderitem", "order")
            .autocomplete_fields(vec!["product"])
            .min_num(1)
            .max_num(Some(10))
            .extra(0);
        assert_eq!(inline.model_key(), "store.orderitem");
        assert_eq!(inline.inline_type, InlineType::Tabular);
        assert_eq!(inline.extra, 0);
        assert_eq!(inline.min_num, 1);
        assert_eq!(inline.max_num, Some(10));
        assert_eq!(inline.parent_fields(), vec!["order"]);
        assert_eq!(inline.autocomplete_fields, vec!["product"]);
    }

    #[test]
    fn test_inline_generic() {
        let inline = InlineAdmin::generic_tabular("tags", "taggeditem");
        assert_eq!(inline.extra, 3);
        assert_eq!(inline.min_num, 0);
        assert!(inline.max_num.is_none());
        assert_eq!(inline.parent_fields(), vec!["content_type", "object_id"]);
    }

    #[test]
    fn test_model_admin_serialization() {
        let admin = ModelAdmin::new("store", "customer").list_per_page(10);
        let json = serde_json::to_string(&admin).unwrap();
        assert!(json.contains("\"app_label\":\"store\""));
        assert!(json.contains("\"list_per_page\":10"));
    }
}
