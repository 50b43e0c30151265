//! Request and response bodies of the admin JSON API.
//!
//! Every admin endpoint answers with one of these types. Pagination follows
//! [`JsonListResponse::paginate`]: pages are 1-indexed and out-of-range page
//! numbers are clamped rather than rejected.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filters::FilterSpec;
use crate::meta::{FieldSchema, ModelMeta};
use crate::model_admin::{InlineAdmin, InlineType, ModelAdmin};
use crate::urls::AdminUrls;

/// Results returned per autocomplete page.
pub const AUTOCOMPLETE_PAGE_SIZE: usize = 20;

/// A paginated slice of a result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonListResponse<T = Value> {
    /// The items of the current page.
    pub results: Vec<T>,
    /// Total number of matching items across all pages.
    pub count: usize,
    /// The current page number (1-indexed).
    pub page: usize,
    /// The number of items per page.
    pub page_size: usize,
    /// Total number of pages, at least 1.
    pub total_pages: usize,
    /// Whether there is a next page.
    pub has_next: bool,
    /// Whether there is a previous page.
    pub has_previous: bool,
}

impl<T: Clone> JsonListResponse<T> {
    /// Slices `all_results` to the requested page.
    ///
    /// ```
    /// use storefront_admin::api::JsonListResponse;
    ///
    /// let items: Vec<u32> = (1..=12).collect();
    /// let page = JsonListResponse::paginate(&items, 3, 5);
    /// assert_eq!(page.results, vec![11, 12]);
    /// assert_eq!(page.total_pages, 3);
    /// assert!(!page.has_next);
    /// ```
    pub fn paginate(all_results: &[T], page: usize, page_size: usize) -> Self {
        let count = all_results.len();
        let page_size = if page_size == 0 { 1 } else { page_size };
        let total_pages = count.div_ceil(page_size).max(1);
        let page = page.clamp(1, total_pages);

        let start = (page - 1) * page_size;
        let end = (start + page_size).min(count);
        let results = if start < count {
            all_results[start..end].to_vec()
        } else {
            Vec::new()
        };

        Self {
            results,
            count,
            page,
            page_size,
            total_pages,
            has_next: page < total_pages,
            has_previous: page > 1,
        }
    }

    /// Maps the items of the page, keeping the pagination data.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> JsonListResponse<U> {
        JsonListResponse {
            results: self.results.into_iter().map(f).collect(),
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }

    /// Like [`map`](Self::map), stopping at the first error.
    pub fn try_map<U, E, F: FnMut(T) -> Result<U, E>>(
        self,
        f: F,
    ) -> Result<JsonListResponse<U>, E> {
        Ok(JsonListResponse {
            results: self.results.into_iter().map(f).collect::<Result<_, E>>()?,
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        })
    }
}

/// Response of the admin index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIndexResponse {
    /// The site's display name.
    pub site_name: String,
    /// Registered models grouped by app label, sorted by label.
    pub apps: Vec<AppModels>,
}

/// Models grouped under an application label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppModels {
    /// The application label.
    pub app_label: String,
    /// The models registered under this app, sorted by plural name.
    pub models: Vec<ModelInfo>,
}

/// Summary information about a registered model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// The application label.
    pub app_label: String,
    /// The model name.
    pub name: String,
    /// The human-readable name.
    pub verbose_name: String,
    /// The plural human-readable name.
    pub verbose_name_plural: String,
    /// The changelist URL.
    pub url: String,
}

impl ModelInfo {
    /// Describes a model.
    pub fn new(meta: &ModelMeta, urls: &AdminUrls) -> Self {
        Self {
            app_label: meta.app_label.clone(),
            name: meta.model_name.clone(),
            verbose_name: meta.verbose_name.clone(),
            verbose_name_plural: meta.verbose_name_plural.clone(),
            url: urls.changelist(&meta.app_label, &meta.model_name),
        }
    }
}

/// Describes an inline editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineSchema {
    /// The inline model key.
    pub model: String,
    /// Plural name of the inline model.
    pub verbose_name_plural: String,
    /// Layout of the rows.
    pub inline_type: InlineType,
    /// Number of blank rows offered.
    pub extra: usize,
    /// Minimum number of rows.
    pub min_num: usize,
    /// Maximum number of rows.
    pub max_num: Option<usize>,
    /// Editable fields of each row.
    pub fields: Vec<FieldSchema>,
    /// Fields using autocomplete widgets.
    pub autocomplete_fields: Vec<String>,
}

impl InlineSchema {
    /// Describes `inline` using the inline model's metadata.
    pub fn new(inline: &InlineAdmin, meta: &ModelMeta) -> Self {
        let parent_fields = inline.parent_fields();
        let fields = meta
            .fields
            .iter()
            .filter(|f| !f.primary_key && !parent_fields.contains(&f.name.as_str()))
            .filter(|f| inline.fields.is_empty() || inline.fields.contains(&f.name))
            .cloned()
            .collect();
        Self {
            model: inline.model_key(),
            verbose_name_plural: meta.verbose_name_plural.clone(),
            inline_type: inline.inline_type,
            extra: inline.extra,
            min_num: inline.min_num,
            max_num: inline.max_num,
            fields,
            autocomplete_fields: inline.autocomplete_fields.clone(),
        }
    }
}

/// Schema of a registered model, used to build forms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchemaResponse {
    /// The model summary.
    pub model: ModelInfo,
    /// Field definitions.
    pub fields: Vec<FieldSchema>,
    /// Changelist columns.
    pub list_display: Vec<String>,
    /// Columns editable in the changelist.
    pub list_editable: Vec<String>,
    /// Sidebar filter fields.
    pub list_filter: Vec<String>,
    /// Searchable fields.
    pub search_fields: Vec<String>,
    /// Effective default ordering.
    pub ordering: Vec<String>,
    /// Rows per page.
    pub list_per_page: usize,
    /// Fields using autocomplete widgets.
    pub autocomplete_fields: Vec<String>,
    /// Fields shown but not editable.
    pub readonly_fields: Vec<String>,
    /// Enabled actions.
    pub actions: Vec<ActionInfo>,
    /// Inline editors.
    pub inlines: Vec<InlineSchema>,
}

impl ModelSchemaResponse {
    /// Builds the schema of `admin`'s model.
    pub fn new(
        meta: &ModelMeta,
        admin: &ModelAdmin,
        urls: &AdminUrls,
        actions: Vec<ActionInfo>,
        inlines: Vec<InlineSchema>,
    ) -> Self {
        let ordering = if admin.ordering.is_empty() {
            meta.ordering.clone()
        } else {
            admin.ordering.clone()
        };
        Self {
            model: ModelInfo::new(meta, urls),
            fields: meta.fields.clone(),
            list_display: admin.list_display.clone(),
            list_editable: admin.list_editable.clone(),
            list_filter: admin.list_filter.clone(),
            search_fields: admin.search_fields.clone(),
            ordering,
            list_per_page: admin.list_per_page,
            autocomplete_fields: admin.autocomplete_fields.clone(),
            readonly_fields: admin.readonly_fields.clone(),
            actions,
            inlines,
        }
    }
}

/// An action offered on the changelist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    /// Identifier sent back when running the action.
    pub name: String,
    /// Label shown to the user.
    pub description: String,
}

/// A changelist column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// The `list_display` entry.
    pub name: String,
    /// The header text.
    pub label: String,
    /// Whether the column can be used in `o`.
    pub sortable: bool,
    /// Whether the column is in `list_editable`.
    pub editable: bool,
    /// Whether the cell links to the change view.
    pub link: bool,
}

/// One changelist cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    /// The column this cell belongs to.
    pub column: String,
    /// The underlying value (the stored value for fields).
    pub value: Value,
    /// The rendered text.
    pub display: String,
    /// Whether `display` is pre-escaped markup.
    pub html: bool,
}

/// One changelist row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeListRow {
    /// The primary key.
    pub pk: String,
    /// The change view URL.
    pub url: String,
    /// The object's string representation.
    pub repr: String,
    /// Cells in column order.
    pub cells: Vec<Cell>,
}

/// Response of a changelist request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeListResponse {
    /// The model summary.
    pub model: ModelInfo,
    /// Column headers.
    pub columns: Vec<ColumnInfo>,
    /// The current page of rows with pagination data.
    #[serde(flatten)]
    pub page: JsonListResponse<ChangeListRow>,
    /// Number of rows before filtering and searching.
    pub full_count: usize,
    /// Whether every matching row is on this page.
    pub show_all: bool,
    /// Whether "show all" is available for this result size.
    pub can_show_all: bool,
    /// The active search query.
    pub search_query: String,
    /// Whether the model has a search box.
    pub has_search: bool,
    /// The applied ordering.
    pub ordering: Vec<String>,
    /// Sidebar filters.
    pub filters: Vec<FilterSpec>,
    /// Enabled actions.
    pub actions: Vec<ActionInfo>,
}

/// An inline formset on the change view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineFormsetResponse {
    /// The inline configuration.
    #[serde(flatten)]
    pub schema: InlineSchema,
    /// The parent's existing inline rows.
    pub rows: Vec<Value>,
    /// Display text for foreign keys of the rows, keyed by row pk then field.
    pub related: BTreeMap<String, BTreeMap<String, AutocompleteItem>>,
}

/// Response of the change view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeViewResponse {
    /// The model summary.
    pub model: ModelInfo,
    /// The primary key.
    pub pk: String,
    /// The object's string representation.
    pub repr: String,
    /// The stored row.
    pub object: Value,
    /// Field definitions.
    pub fields: Vec<FieldSchema>,
    /// Fields shown but not editable.
    pub readonly_fields: Vec<String>,
    /// Autocomplete URLs keyed by field.
    pub autocomplete: BTreeMap<String, String>,
    /// Display text of the object's foreign keys, keyed by field.
    pub related: BTreeMap<String, AutocompleteItem>,
    /// Inline formsets.
    pub inlines: Vec<InlineFormsetResponse>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteItem {
    /// The primary key.
    pub id: String,
    /// The string representation.
    pub text: String,
}

/// Whether more suggestions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// `true` when a later page has results.
    pub more: bool,
}

/// Response of the autocomplete endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    /// Suggestions for the requested page.
    pub results: Vec<AutocompleteItem>,
    /// Pagination state.
    pub pagination: Pagination,
}

/// Body of an action request.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    /// The action name.
    pub action: String,
    /// Primary keys of the selected rows.
    #[serde(default)]
    pub selected: Vec<Value>,
}

/// Response of an action request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    /// The action that ran.
    pub action: String,
    /// Whether it completed.
    pub success: bool,
    /// The outcome message, also queued as a site message.
    pub message: String,
    /// Number of rows affected.
    pub affected_count: usize,
}

/// Body of a list-editable save: a JSON array with one object per changed
/// row, each carrying its `pk`.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct ListEditableRequest {
    /// Changed rows.
    pub rows: Vec<Map<String, Value>>,
}

/// Response of a list-editable save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEditableResponse {
    /// Number of rows saved.
    pub changed: usize,
    /// The outcome message.
    pub message: String,
}
