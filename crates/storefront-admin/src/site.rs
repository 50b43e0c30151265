//! Admin site registry and router generation.
//!
//! The [`AdminSite`] is the central registry: model metadata, the
//! [`ModelAdmin`] configuration of each administered model, display columns,
//! actions, and content types. [`AdminSite::into_axum_router`] turns it into an
//! Axum router serving the JSON admin API.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use storefront_core::logging::admin_span;
use storefront_core::{StoreError, StoreResult};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::actions::{ActionRegistry, AdminAction};
use crate::api::{
    ActionInfo, ActionRequest, ActionResponse, AppModels, AutocompleteResponse,
    ChangeListResponse, ChangeViewResponse, InlineSchema, ListEditableRequest,
    ListEditableResponse, ModelIndexResponse, ModelInfo, ModelSchemaResponse,
};
use crate::changelist::object_repr;
use crate::contrib::contenttypes::{ContentType, ContentTypeRegistry};
use crate::contrib::messages::{Message, MessageLevel, MessageStorage};
use crate::db::{AdminDbExecutor, InMemoryAdminDb};
use crate::display::{DisplayColumn, DisplayRegistry};
use crate::forms::ChangeForm;
use crate::meta::ModelMeta;
use crate::model_admin::ModelAdmin;
use crate::urls::AdminUrls;

/// The admin site, responsible for model registration and route generation.
///
/// # Examples
///
/// ```
/// use storefront_admin::meta::{FieldSchema, FieldType, ModelMeta};
/// use storefront_admin::model_admin::ModelAdmin;
/// use storefront_admin::site::AdminSite;
///
/// let mut site = AdminSite::new("admin");
/// site.register_model(ModelMeta::new("tags", "tag").fields(vec![
///     FieldSchema::auto_id(),
///     FieldSchema::new("label", FieldType::CharField).max_length(255),
/// ]));
/// site.register(ModelAdmin::new("tags", "tag").search_fields(vec!["label"]));
/// assert!(site.is_registered("tags.tag"));
/// let router = site.into_axum_router();
/// ```
pub struct AdminSite {
    name: String,
    urls: AdminUrls,
    models: HashMap<String, ModelMeta>,
    registry: HashMap<String, ModelAdmin>,
    actions: ActionRegistry,
    displays: HashMap<String, DisplayRegistry>,
    content_types: ContentTypeRegistry,
    db: Arc<dyn AdminDbExecutor>,
    messages: Mutex<MessageStorage>,
}

impl AdminSite {
    /// Creates a site with an empty in-memory store, mounted at `/admin`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            urls: AdminUrls::new("/admin"),
            models: HashMap::new(),
            registry: HashMap::new(),
            actions: ActionRegistry::new(),
            displays: HashMap::new(),
            content_types: ContentTypeRegistry::new(),
            db: Arc::new(InMemoryAdminDb::new()),
            messages: Mutex::new(MessageStorage::new()),
        }
    }

    /// Sets the URL prefix for admin API routes.
    #[must_use]
    pub fn url_prefix(mut self, prefix: &str) -> Self {
        self.urls = AdminUrls::new(prefix);
        self
    }

    /// Sets the object store.
    #[must_use]
    pub fn with_db(mut self, db: Arc<dyn AdminDbExecutor>) -> Self {
        self.db = db;
        self
    }

    /// Returns the site name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the URL reverser.
    pub const fn urls(&self) -> &AdminUrls {
        &self.urls
    }

    /// Returns the object store.
    pub fn db(&self) -> &dyn AdminDbExecutor {
        self.db.as_ref()
    }

    // ── Registration ────────────────────────────────────────────────

    /// Registers a model's metadata and content type.
    pub fn register_model(&mut self, meta: ModelMeta) {
        self.content_types
            .get_for_model(&meta.app_label, &meta.model_name);
        self.models.insert(meta.model_key(), meta);
    }

    /// Registers an admin configuration, replacing any previous one.
    pub fn register(&mut self, admin: ModelAdmin) {
        tracing::debug!(model = %admin.model_key(), "registering model admin");
        self.registry.insert(admin.model_key(), admin);
    }

    /// Removes a model's admin configuration; its metadata stays.
    pub fn unregister(&mut self, model_key: &str) -> Option<ModelAdmin> {
        self.registry.remove(model_key)
    }

    /// Registers a display column for a model.
    pub fn register_display(&mut self, model_key: &str, column: Box<dyn DisplayColumn>) {
        self.displays
            .entry(model_key.to_string())
            .or_default()
            .register(column);
    }

    /// Makes an action available; models enable it through their admin.
    pub fn add_action(&mut self, action: Box<dyn AdminAction>) {
        self.actions.register(action);
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Returns `true` if the model has an admin configuration.
    pub fn is_registered(&self, model_key: &str) -> bool {
        self.registry.contains_key(model_key)
    }

    /// Returns the keys of all administered models, sorted.
    pub fn registered_models(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Returns a model's admin configuration.
    pub fn get_model_admin(&self, model_key: &str) -> Option<&ModelAdmin> {
        self.registry.get(model_key)
    }

    /// Returns a model's admin configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the model is not administered.
    pub fn model_admin(&self, model_key: &str) -> StoreResult<&ModelAdmin> {
        self.registry
            .get(model_key)
            .ok_or_else(|| StoreError::NotFound(format!("Model '{model_key}' not found")))
    }

    /// Returns a model's metadata, if registered.
    pub fn get_meta(&self, model_key: &str) -> Option<&ModelMeta> {
        self.models.get(model_key)
    }

    /// Returns a model's metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no metadata is registered.
    pub fn meta(&self, model_key: &str) -> StoreResult<&ModelMeta> {
        self.models
            .get(model_key)
            .ok_or_else(|| StoreError::NotFound(format!("Unknown model '{model_key}'")))
    }

    /// Returns every registered model's metadata.
    pub fn all_meta(&self) -> impl Iterator<Item = &ModelMeta> {
        self.models.values()
    }

    /// Returns the display columns of a model.
    pub fn displays(&self, model_key: &str) -> Option<&DisplayRegistry> {
        self.displays.get(model_key)
    }

    /// Returns the site's actions.
    pub const fn action_registry(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Returns the content type registry.
    pub const fn content_types(&self) -> &ContentTypeRegistry {
        &self.content_types
    }

    /// Returns a model's content type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the model is not registered.
    pub fn content_type_for(&self, model_key: &str) -> StoreResult<&ContentType> {
        self.content_types
            .lookup(model_key)
            .ok_or_else(|| StoreError::NotFound(format!("No content type for '{model_key}'")))
    }

    /// Returns the string representation of a row of `model_key`.
    pub fn object_repr(&self, model_key: &str, row: &serde_json::Value) -> String {
        self.models.get(model_key).map_or_else(
            || crate::db::pk_of(row),
            |meta| object_repr(meta, self.displays(model_key), &self.urls, row),
        )
    }

    /// The actions a model's admin enables, in configuration order.
    pub fn enabled_actions(&self, admin: &ModelAdmin) -> Vec<ActionInfo> {
        admin
            .action_names
            .iter()
            .filter_map(|name| self.actions.get(name))
            .map(|action| ActionInfo {
                name: action.name().to_string(),
                description: action.description().to_string(),
            })
            .collect()
    }

    // ── Messages ────────────────────────────────────────────────────

    /// Queues a message for the user.
    pub fn add_message(&self, level: MessageLevel, text: &str) {
        match self.messages.lock() {
            Ok(mut storage) => storage.add(level, text),
            Err(_) => tracing::warn!("message storage lock poisoned; dropping message"),
        }
    }

    /// Drains the queued messages.
    pub fn take_messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .map(|mut storage| storage.drain())
            .unwrap_or_default()
    }

    // ── Read-only views ─────────────────────────────────────────────

    /// Lists the administered models grouped by app.
    pub fn index(&self) -> ModelIndexResponse {
        let mut apps: BTreeMap<&str, Vec<ModelInfo>> = BTreeMap::new();
        for key in self.registered_models() {
            if let Some(meta) = self.models.get(key) {
                apps.entry(meta.app_label.as_str())
                    .or_default()
                    .push(ModelInfo::new(meta, &self.urls));
            }
        }
        ModelIndexResponse {
            site_name: self.name.clone(),
            apps: apps
                .into_iter()
                .map(|(app_label, mut models)| {
                    models.sort_by(|a, b| a.verbose_name_plural.cmp(&b.verbose_name_plural));
                    AppModels {
                        app_label: app_label.to_string(),
                        models,
                    }
                })
                .collect(),
        }
    }

    /// Describes a model's fields and admin configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown model.
    pub fn schema(&self, model_key: &str) -> StoreResult<ModelSchemaResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        let inlines = admin
            .inlines
            .iter()
            .filter_map(|inline| {
                self.models
                    .get(&inline.model_key())
                    .map(|inline_meta| InlineSchema::new(inline, inline_meta))
            })
            .collect();
        Ok(ModelSchemaResponse::new(
            meta,
            admin,
            &self.urls,
            self.enabled_actions(admin),
            inlines,
        ))
    }

    // ── Router ──────────────────────────────────────────────────────

    /// Converts the site into an Axum router mounted at the URL prefix.
    ///
    /// Routes (relative to the prefix):
    /// - `GET /` - Model index
    /// - `GET /messages/` - Drain queued messages
    /// - `GET /{app}/{model}/schema` - Model schema
    /// - `GET /{app}/{model}/` - Changelist
    /// - `POST /{app}/{model}/` - Create an object
    /// - `POST /{app}/{model}/editable/` - Save changelist edits
    /// - `POST /{app}/{model}/action/` - Run a bulk action
    /// - `GET /{app}/{model}/autocomplete/` - Autocomplete suggestions
    /// - `GET /{app}/{model}/{pk}/` - Change view
    /// - `PUT /{app}/{model}/{pk}/` - Save an object and its inlines
    /// - `DELETE /{app}/{model}/{pk}/` - Delete an object
    pub fn into_axum_router(self) -> Router {
        let prefix = self.urls.prefix().to_string();
        let shared = Arc::new(self);

        Router::new()
            .route(&format!("{prefix}/"), get(handle_index))
            .route(&format!("{prefix}/messages/"), get(handle_messages))
            .route(&format!("{prefix}/{{app}}/{{model}}/schema"), get(handle_schema))
            .route(
                &format!("{prefix}/{{app}}/{{model}}/"),
                get(handle_changelist).post(handle_add),
            )
            .route(
                &format!("{prefix}/{{app}}/{{model}}/editable/"),
                post(handle_list_editable),
            )
            .route(
                &format!("{prefix}/{{app}}/{{model}}/action/"),
                post(handle_action),
            )
            .route(
                &format!("{prefix}/{{app}}/{{model}}/autocomplete/"),
                get(handle_autocomplete),
            )
            .route(
                &format!("{prefix}/{{app}}/{{model}}/{{pk}}/"),
                get(handle_change_view)
                    .put(handle_save_change)
                    .delete(handle_delete),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(shared)
    }
}

impl std::fmt::Debug for AdminSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSite")
            .field("name", &self.name)
            .field("url_prefix", &self.urls.prefix())
            .field("models", &self.registered_models().join(", "))
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

// ── Error responses ─────────────────────────────────────────────────

/// A [`StoreError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin request failed");
        }
        let body = match &self.0 {
            StoreError::ValidationError(err) => {
                let message = if err.message.is_empty() {
                    "Please correct the errors below."
                } else {
                    err.message.as_str()
                };
                json!({
                    "error": message,
                    "code": err.code,
                    "fields": err.field_errors,
                })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}

type ApiResult<T> = Result<axum::Json<T>, ApiError>;

// ── Handlers ────────────────────────────────────────────────────────

async fn handle_index(State(site): State<Arc<AdminSite>>) -> axum::Json<ModelIndexResponse> {
    axum::Json(site.index())
}

async fn handle_messages(State(site): State<Arc<AdminSite>>) -> axum::Json<Vec<Message>> {
    axum::Json(site.take_messages())
}

async fn handle_schema(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
) -> ApiResult<ModelSchemaResponse> {
    Ok(axum::Json(site.schema(&format!("{app}.{model}"))?))
}

async fn handle_changelist(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
    Query(params): Query<Vec<(String, String)>>,
) -> ApiResult<ChangeListResponse> {
    let key = format!("{app}.{model}");
    let response = site
        .changelist(&key, params)
        .instrument(admin_span(&key, "changelist"))
        .await?;
    Ok(axum::Json(response))
}

async fn handle_add(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
    axum::Json(form): axum::Json<ChangeForm>,
) -> Result<(StatusCode, axum::Json<ChangeViewResponse>), ApiError> {
    let key = format!("{app}.{model}");
    let created = site
        .add_object(&key, form)
        .instrument(admin_span(&key, "add"))
        .await?;
    Ok((StatusCode::CREATED, axum::Json(created)))
}

async fn handle_list_editable(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
    axum::Json(request): axum::Json<ListEditableRequest>,
) -> ApiResult<ListEditableResponse> {
    let key = format!("{app}.{model}");
    let response = site
        .save_list_editable(&key, request.rows)
        .instrument(admin_span(&key, "editable"))
        .await?;
    Ok(axum::Json(response))
}

async fn handle_action(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
    axum::Json(request): axum::Json<ActionRequest>,
) -> ApiResult<ActionResponse> {
    let key = format!("{app}.{model}");
    let response = site
        .run_action(&key, request)
        .instrument(admin_span(&key, "action"))
        .await?;
    Ok(axum::Json(response))
}

#[derive(Debug, Deserialize)]
struct AutocompleteParams {
    #[serde(default)]
    term: String,
    page: Option<usize>,
}

async fn handle_autocomplete(
    State(site): State<Arc<AdminSite>>,
    Path((app, model)): Path<(String, String)>,
    Query(params): Query<AutocompleteParams>,
) -> ApiResult<AutocompleteResponse> {
    Ok(axum::Json(
        site.autocomplete(
            &format!("{app}.{model}"),
            &params.term,
            params.page.unwrap_or(1),
        )
        .await?,
    ))
}

async fn handle_change_view(
    State(site): State<Arc<AdminSite>>,
    Path((app, model, pk)): Path<(String, String, String)>,
) -> ApiResult<ChangeViewResponse> {
    Ok(axum::Json(
        site.change_view(&format!("{app}.{model}"), &pk).await?,
    ))
}

async fn handle_save_change(
    State(site): State<Arc<AdminSite>>,
    Path((app, model, pk)): Path<(String, String, String)>,
    axum::Json(form): axum::Json<ChangeForm>,
) -> ApiResult<ChangeViewResponse> {
    let key = format!("{app}.{model}");
    let response = site
        .save_change(&key, &pk, form)
        .instrument(admin_span(&key, "change"))
        .await?;
    Ok(axum::Json(response))
}

async fn handle_delete(
    State(site): State<Arc<AdminSite>>,
    Path((app, model, pk)): Path<(String, String, String)>,
) -> ApiResult<serde_json::Value> {
    let key = format!("{app}.{model}");
    let message = site
        .delete_object(&key, &pk)
        .instrument(admin_span(&key, "delete"))
        .await?;
    Ok(axum::Json(json!({ "deleted": pk, "message": message })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{FieldSchema, FieldType};

    fn tag_meta() -> ModelMeta {
        ModelMeta::new("tags", "tag").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("label", FieldType::CharField).max_length(255),
        ])
    }

    #[test]
    fn test_admin_site_new() {
        let site = AdminSite::new("admin");
        assert_eq!(site.name(), "admin");
        assert_eq!(site.urls().prefix(), "/admin");
        assert!(site.registered_models().is_empty());
    }

    #[test]
    fn test_admin_site_custom_prefix() {
        let site = AdminSite::new("admin").url_prefix("/backoffice/");
        assert_eq!(site.urls().changelist("tags", "tag"), "/backoffice/tags/tag/");
    }

    #[test]
    fn test_register_and_unregister() {
        let mut site = AdminSite::new("admin");
        site.register_model(tag_meta());
        site.register(ModelAdmin::new("tags", "tag"));
        assert!(site.is_registered("tags.tag"));
        assert!(site.model_admin("tags.tag").is_ok());

        assert!(site.unregister("tags.tag").is_some());
        assert!(!site.is_registered("tags.tag"));
        assert_eq!(site.model_admin("tags.tag").unwrap_err().status_code(), 404);
        assert!(site.get_meta("tags.tag").is_some());
    }

    #[test]
    fn test_register_model_assigns_content_type() {
        let mut site = AdminSite::new("admin");
        site.register_model(tag_meta());
        site.register_model(ModelMeta::new("store", "product"));
        assert_eq!(site.content_type_for("tags.tag").unwrap().id, 1);
        assert_eq!(site.content_type_for("store.product").unwrap().id, 2);
        assert!(site.content_type_for("store.order").is_err());
    }

    #[test]
    fn test_enabled_actions_skip_unknown_names() {
        let site = AdminSite::new("admin");
        let admin = ModelAdmin::new("tags", "tag").actions(vec!["missing"]);
        let names: Vec<_> = site
            .enabled_actions(&admin)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["delete_selected"]);
    }

    #[test]
    fn test_messages_drain() {
        let site = AdminSite::new("admin");
        site.add_message(MessageLevel::Success, "saved");
        let messages = site.take_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "saved");
        assert!(site.take_messages().is_empty());
    }

    #[test]
    fn test_index_groups_by_app() {
        let mut site = AdminSite::new("Shop");
        site.register_model(tag_meta());
        site.register_model(ModelMeta::new("store", "product"));
        site.register_model(ModelMeta::new("store", "collection"));
        site.register(ModelAdmin::new("tags", "tag"));
        site.register(ModelAdmin::new("store", "product"));
        site.register(ModelAdmin::new("store", "collection"));

        let index = site.index();
        assert_eq!(index.site_name, "Shop");
        let apps: Vec<_> = index.apps.iter().map(|a| a.app_label.as_str()).collect();
        assert_eq!(apps, vec!["store", "tags"]);
        let store: Vec<_> = index.apps[0].models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(store, vec!["collection", "product"]);
    }

    #[test]
    fn test_object_repr_falls_back_to_pk() {
        let mut site = AdminSite::new("admin");
        site.register_model(tag_meta());
        let row = json!({"id": 4, "label": "fresh"});
        assert_eq!(site.object_repr("tags.tag", &row), "Tag object (4)");
        assert_eq!(site.object_repr("unknown.model", &row), "4");
    }

    #[test]
    fn test_api_error_response_status() {
        let response = ApiError(StoreError::ProtectedError("in use".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = ApiError(StoreError::NotFound("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_admin_site_debug() {
        let mut site = AdminSite::new("admin");
        site.register(ModelAdmin::new("tags", "tag"));
        let debug = format!("{site:?}");
        assert!(debug.contains("tags.tag"));
    }
}
