//! Read-only admin views: changelist, change view, and autocomplete.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;
use storefront_core::{StoreError, StoreResult};

use crate::api::{
    AutocompleteItem, AutocompleteResponse, ChangeListResponse, ChangeListRow,
    ChangeViewResponse, InlineFormsetResponse, InlineSchema, JsonListResponse, ModelInfo,
    Pagination, AUTOCOMPLETE_PAGE_SIZE,
};
use crate::changelist::{
    annotate_count, columns, object_repr, render_cell, resolve_ordering, sort_rows,
    ChangeListQuery, RenderContext,
};
use crate::db::{key_string, pk_of};
use crate::filters::{
    all_values_filter, apply_filters, apply_search, choices_filter, date_filter, related_filter,
    FilterSpec,
};
use crate::meta::ModelMeta;
use crate::model_admin::{Annotation, InlineAdmin, InlineRelation, ModelAdmin};
use crate::site::AdminSite;

impl AdminSite {
    /// Builds one page of a model's changelist.
    ///
    /// `params` are the raw query pairs: `p`, `q`, `o`, and `all` drive
    /// pagination, search, ordering, and show-all; everything else is a lookup.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown model and
    /// [`StoreError::BadRequest`] for an invalid page, lookup, or ordering.
    pub async fn changelist(
        &self,
        model_key: &str,
        params: Vec<(String, String)>,
    ) -> StoreResult<ChangeListResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        let displays = self.displays(model_key);
        let query = ChangeListQuery::from_pairs(params.clone())?;

        let mut all_rows = self.db().all_objects(model_key).await?;
        for annotation in &admin.annotations {
            match annotation {
                Annotation::Count {
                    name,
                    related_model,
                    fk_field,
                } => {
                    let related = self.db().all_objects(related_model).await?;
                    annotate_count(&mut all_rows, name, &related, fk_field);
                }
            }
        }
        let full_count = all_rows.len();

        let filtered = apply_filters(all_rows.clone(), meta, &query.filters)?;
        let mut rows = if admin.search_fields.is_empty() {
            filtered
        } else {
            apply_search(filtered, &admin.search_fields, &query.search)
        };
        let ordering = resolve_ordering(query.ordering.as_deref(), admin, meta, displays)?;
        sort_rows(&mut rows, &ordering);

        let count = rows.len();
        let can_show_all = count <= admin.list_max_show_all;
        let show_all = query.show_all && can_show_all;
        let page_size = if show_all {
            count.max(1)
        } else {
            admin.list_per_page
        };
        let page = JsonListResponse::paginate(&rows, query.page, page_size);

        let related = self
            .related_reprs(meta, &admin.list_display, &page.results)
            .await?;
        let ctx = RenderContext {
            meta,
            displays,
            urls: self.urls(),
            related: &related,
        };
        let page = page.try_map(|row| self.render_row(admin, &ctx, &row))?;

        let filters = self.filter_specs(admin, meta, &all_rows, &params).await?;
        tracing::debug!(
            model = model_key,
            count,
            page = page.page,
            "changelist rendered"
        );

        Ok(ChangeListResponse {
            model: ModelInfo::new(meta, self.urls()),
            columns: columns(admin, meta, displays),
            page,
            full_count,
            show_all,
            can_show_all,
            search_query: query.search,
            has_search: !admin.search_fields.is_empty(),
            ordering,
            filters,
            actions: self.enabled_actions(admin),
        })
    }

    fn render_row(
        &self,
        admin: &ModelAdmin,
        ctx: &RenderContext<'_>,
        row: &Value,
    ) -> StoreResult<ChangeListRow> {
        let pk = pk_of(row);
        let cells = admin
            .list_display
            .iter()
            .map(|column| render_cell(column, row, ctx))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(ChangeListRow {
            url: self
                .urls()
                .change(&ctx.meta.app_label, &ctx.meta.model_name, &pk),
            repr: object_repr(ctx.meta, ctx.displays, self.urls(), row),
            pk,
            cells,
        })
    }

    /// String representations of the rows referenced by the foreign keys in
    /// `columns`, keyed by field then primary key.
    async fn related_reprs(
        &self,
        meta: &ModelMeta,
        columns: &[String],
        rows: &[Value],
    ) -> StoreResult<HashMap<String, HashMap<String, String>>> {
        let mut reprs = HashMap::new();
        for name in columns {
            let Some(target) = meta
                .field(name)
                .and_then(|field| field.related_model.as_deref())
            else {
                continue;
            };
            let wanted: HashSet<String> = rows
                .iter()
                .filter_map(|row| row.get(name))
                .filter(|value| !value.is_null())
                .map(key_string)
                .collect();
            if wanted.is_empty() {
                continue;
            }
            let labels: HashMap<String, String> = self
                .db()
                .all_objects(target)
                .await?
                .iter()
                .filter(|row| wanted.contains(&pk_of(row)))
                .map(|row| (pk_of(row), self.object_repr(target, row)))
                .collect();
            reprs.insert(name.clone(), labels);
        }
        Ok(reprs)
    }

    async fn filter_specs(
        &self,
        admin: &ModelAdmin,
        meta: &ModelMeta,
        rows: &[Value],
        params: &[(String, String)],
    ) -> StoreResult<Vec<FilterSpec>> {
        let mut specs = Vec::with_capacity(admin.list_filter.len());
        for name in &admin.list_filter {
            let Some(field) = meta.field(name) else {
                tracing::warn!(model = %meta.model_key(), field = %name, "skipping unknown list_filter field");
                continue;
            };
            let spec = if let Some(target) = field.related_model.as_deref() {
                let mut options = self.db().all_objects(target).await?;
                if let Some(target_meta) = self.get_meta(target) {
                    sort_rows(&mut options, &target_meta.ordering);
                }
                let options: Vec<(String, String)> = options
                    .iter()
                    .map(|row| (pk_of(row), self.object_repr(target, row)))
                    .collect();
                related_filter(field, &options, params)
            } else if field.field_type.is_temporal() {
                date_filter(field, Utc::now().date_naive(), params)
            } else if field.choices.is_some() {
                choices_filter(field, params)
            } else {
                all_values_filter(field, rows, params)
            };
            specs.push(spec);
        }
        Ok(specs)
    }

    /// Loads one object with its inline rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown model and
    /// [`StoreError::DoesNotExist`] for an unknown primary key.
    pub async fn change_view(&self, model_key: &str, pk: &str) -> StoreResult<ChangeViewResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        let object = self.db().get_object(model_key, pk).await?;
        let related = self.related_items(meta, &object, &[]).await?;

        let autocomplete = admin
            .autocomplete_fields
            .iter()
            .filter_map(|name| {
                let target = meta.field(name)?.related_model.as_deref()?;
                let (app_label, model_name) = target.split_once('.')?;
                Some((name.clone(), self.urls().autocomplete(app_label, model_name)))
            })
            .collect();

        let mut inlines = Vec::with_capacity(admin.inlines.len());
        for inline in &admin.inlines {
            let Some(inline_meta) = self.get_meta(&inline.model_key()) else {
                continue;
            };
            let mut rows = self.inline_rows(inline, model_key, pk).await?;
            sort_rows(&mut rows, &inline_meta.ordering);
            let parent_fields = inline.parent_fields();
            let mut row_related = BTreeMap::new();
            for row in &rows {
                let items = self.related_items(inline_meta, row, &parent_fields).await?;
                if !items.is_empty() {
                    row_related.insert(pk_of(row), items);
                }
            }
            inlines.push(InlineFormsetResponse {
                schema: InlineSchema::new(inline, inline_meta),
                rows,
                related: row_related,
            });
        }

        Ok(ChangeViewResponse {
            model: ModelInfo::new(meta, self.urls()),
            pk: pk_of(&object),
            repr: self.object_repr(model_key, &object),
            fields: meta.fields.clone(),
            readonly_fields: admin.readonly_fields.clone(),
            object,
            autocomplete,
            related,
            inlines,
        })
    }

    /// Display text of a row's foreign keys, skipping the `skip` fields.
    async fn related_items(
        &self,
        meta: &ModelMeta,
        row: &Value,
        skip: &[&str],
    ) -> StoreResult<BTreeMap<String, AutocompleteItem>> {
        let mut items = BTreeMap::new();
        for field in meta.fields.iter().filter(|f| !skip.contains(&f.name.as_str())) {
            let Some(target) = field.related_model.as_deref() else {
                continue;
            };
            let Some(value) = row.get(&field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let id = key_string(value);
            match self.db().get_object(target, &id).await {
                Ok(target_row) => {
                    items.insert(
                        field.name.clone(),
                        AutocompleteItem {
                            text: self.object_repr(target, &target_row),
                            id,
                        },
                    );
                }
                Err(StoreError::DoesNotExist(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(items)
    }

    /// The rows of `inline` attached to one parent object.
    pub(crate) async fn inline_rows(
        &self,
        inline: &InlineAdmin,
        parent_key: &str,
        parent_pk: &str,
    ) -> StoreResult<Vec<Value>> {
        let inline_key = inline.model_key();
        match &inline.relation {
            InlineRelation::ForeignKey { fk_name } => {
                self.db().objects_where(&inline_key, fk_name, parent_pk).await
            }
            InlineRelation::Generic { ct_field, fk_field } => {
                let content_type = self.content_type_for(parent_key)?.id.to_string();
                Ok(self
                    .db()
                    .objects_where(&inline_key, fk_field, parent_pk)
                    .await?
                    .into_iter()
                    .filter(|row| {
                        row.get(ct_field)
                            .is_some_and(|v| key_string(v) == content_type)
                    })
                    .collect())
            }
        }
    }

    /// Suggestions for an autocomplete widget pointing at `model_key`.
    ///
    /// Rows are searched with the model admin's `search_fields`, ordered by
    /// its ordering, and returned twenty at a time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the model is not administered or
    /// its admin has no `search_fields`.
    pub async fn autocomplete(
        &self,
        model_key: &str,
        term: &str,
        page: usize,
    ) -> StoreResult<AutocompleteResponse> {
        let admin = self.model_admin(model_key)?;
        if admin.search_fields.is_empty() {
            return Err(StoreError::NotFound(format!(
                "{model_key} must define search_fields to be used for autocomplete"
            )));
        }
        let meta = self.meta(model_key)?;
        let mut rows = apply_search(
            self.db().all_objects(model_key).await?,
            &admin.search_fields,
            term,
        );
        let ordering = resolve_ordering(None, admin, meta, None)?;
        sort_rows(&mut rows, &ordering);

        let page = JsonListResponse::paginate(&rows, page, AUTOCOMPLETE_PAGE_SIZE);
        Ok(AutocompleteResponse {
            pagination: Pagination {
                more: page.has_next,
            },
            results: page
                .results
                .iter()
                .map(|row| AutocompleteItem {
                    id: pk_of(row),
                    text: self.object_repr(model_key, row),
                })
                .collect(),
        })
    }
}
