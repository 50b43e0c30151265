//! Admin write paths: adding and saving objects with their inline formsets,
//! changelist edits, actions, and deletion.
//!
//! Deletion walks every foreign key that references the deleted rows and
//! applies its rule: `Protect` refuses the whole delete, `Cascade` deletes the
//! referencing rows too, `SetNull` clears the reference. Rows attached through
//! a generic inline of the deleted model's admin are deleted with it.

use std::collections::{HashSet, VecDeque};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use storefront_core::{StoreError, StoreResult, ValidationError};

use crate::api::{ActionRequest, ActionResponse, ChangeViewResponse, ListEditableResponse};
use crate::contrib::messages::MessageLevel;
use crate::db::{key_string, pk_of};
use crate::display::capfirst;
use crate::forms::{clean_fields, validate_formset, ChangeForm};
use crate::meta::{ModelMeta, OnDelete};
use crate::model_admin::{InlineAdmin, InlineRelation, ModelAdmin};
use crate::site::AdminSite;

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const NOTHING_SELECTED: &str =
    "Items must be selected in order to perform actions on them. No items have been changed.";

/// Inline changes validated before anything is written.
#[derive(Debug)]
struct InlinePlan {
    inline: InlineAdmin,
    creates: Vec<Map<String, Value>>,
    updates: Vec<(String, Map<String, Value>)>,
    deletion: Option<DeletionPlan>,
}

/// Rows to delete and references to clear, in discovery order.
#[derive(Debug, Default)]
struct DeletionPlan {
    deletes: Vec<(String, Vec<String>)>,
    nullify: Vec<(String, String, Vec<String>)>,
}

impl AdminSite {
    /// Creates an object together with its inline rows.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ValidationError`] when the form or an inline
    /// formset is invalid; nothing is written in that case.
    pub async fn add_object(
        &self,
        model_key: &str,
        form: ChangeForm,
    ) -> StoreResult<ChangeViewResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        let cleaned = self
            .clean_form(meta, &form.fields, &admin.readonly_fields, false, None)
            .await;
        let plans = self.plan_inlines(admin, model_key, None, &form).await;
        let (mut cleaned, plans) = join_validation(cleaned, plans)?;

        stamp_auto_fields(meta, &mut cleaned, true);
        let created = self.db().create_object(model_key, cleaned).await?;
        let pk = pk_of(&created);
        self.apply_inlines(model_key, &pk, plans).await?;

        let repr = self.object_repr(model_key, &created);
        tracing::info!(model = model_key, pk = %pk, "object added");
        self.add_message(
            MessageLevel::Success,
            &format!("The {} \"{repr}\" was added successfully.", meta.verbose_name),
        );
        self.change_view(model_key, &pk).await
    }

    /// Saves changes to an object and the inline formsets present in `form`.
    ///
    /// Only submitted fields change. Inlines missing from `form` are left
    /// alone; submitted inline rows with an `id` are updated (or deleted with
    /// `DELETE`), rows without one are created.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DoesNotExist`] for an unknown object and
    /// [`StoreError::ValidationError`] for invalid input.
    pub async fn save_change(
        &self,
        model_key: &str,
        pk: &str,
        form: ChangeForm,
    ) -> StoreResult<ChangeViewResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        self.db().get_object(model_key, pk).await?;

        let cleaned = self
            .clean_form(meta, &form.fields, &admin.readonly_fields, true, Some(pk))
            .await;
        let plans = self.plan_inlines(admin, model_key, Some(pk), &form).await;
        let (mut cleaned, plans) = join_validation(cleaned, plans)?;

        stamp_auto_fields(meta, &mut cleaned, false);
        let updated = self.db().update_object(model_key, pk, cleaned).await?;
        self.apply_inlines(model_key, pk, plans).await?;

        let repr = self.object_repr(model_key, &updated);
        tracing::info!(model = model_key, pk, "object changed");
        self.add_message(
            MessageLevel::Success,
            &format!("The {} \"{repr}\" was changed successfully.", meta.verbose_name),
        );
        self.change_view(model_key, pk).await
    }

    /// Saves edits made in the changelist.
    ///
    /// Each row names its object with `pk`; every other key must be one of
    /// the admin's `list_editable` fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadRequest`] when a row has no `pk` or the model
    /// has no editable columns, and [`StoreError::ValidationError`] when a
    /// value is invalid or a field is not editable. No row is saved unless all
    /// rows are valid.
    pub async fn save_list_editable(
        &self,
        model_key: &str,
        rows: Vec<Map<String, Value>>,
    ) -> StoreResult<ListEditableResponse> {
        let admin = self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        if admin.list_editable.is_empty() {
            return Err(StoreError::BadRequest(format!(
                "{model_key} has no list_editable fields"
            )));
        }

        let mut errors = ValidationError::default();
        let mut changes = Vec::with_capacity(rows.len());
        for mut row in rows {
            let pk = row
                .remove("pk")
                .filter(|v| !v.is_null())
                .map(|v| key_string(&v))
                .ok_or_else(|| StoreError::BadRequest("Each row needs a \"pk\".".to_string()))?;
            self.db().get_object(model_key, &pk).await?;

            let mut editable = Map::new();
            for (field, value) in row {
                if admin.list_editable.contains(&field) {
                    editable.insert(field, value);
                } else {
                    errors
                        .field_errors
                        .entry(format!("{pk}-{field}"))
                        .or_default()
                        .push("This field cannot be edited from the changelist.".to_string());
                }
            }
            match self
                .clean_form(meta, &editable, &admin.readonly_fields, true, Some(&pk))
                .await
            {
                Ok(cleaned) => changes.push((pk, cleaned)),
                Err(StoreError::ValidationError(err)) => merge_prefixed(&mut errors, &pk, err),
                Err(err) => return Err(err),
            }
        }
        if !errors.is_empty() {
            errors.code = "invalid".to_string();
            tracing::debug!(model = model_key, errors = %errors, "changelist edit rejected");
            return Err(errors.into());
        }

        let changed = changes.len();
        for (pk, mut data) in changes {
            stamp_auto_fields(meta, &mut data, false);
            self.db().update_object(model_key, &pk, data).await?;
        }

        let message = if changed == 1 {
            format!("1 {} was changed successfully.", meta.verbose_name)
        } else {
            format!("{changed} {} were changed successfully.", meta.verbose_name_plural)
        };
        tracing::info!(model = model_key, changed, "changelist edits saved");
        self.add_message(MessageLevel::Success, &message);
        Ok(ListEditableResponse { changed, message })
    }

    /// Runs an action on the selected rows and queues its message.
    ///
    /// Primary keys that do not exist are dropped from the selection. An
    /// empty selection changes nothing and queues a warning.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the action is not enabled for
    /// the model, and propagates the action's own errors.
    pub async fn run_action(
        &self,
        model_key: &str,
        request: ActionRequest,
    ) -> StoreResult<ActionResponse> {
        let admin = self.model_admin(model_key)?;
        if !admin.action_names.contains(&request.action) {
            return Err(StoreError::NotFound(format!(
                "Action '{}' is not available for {model_key}",
                request.action
            )));
        }
        let action = self.action_registry().require(&request.action)?;

        let existing: HashSet<String> = self
            .db()
            .all_objects(model_key)
            .await?
            .iter()
            .map(pk_of)
            .collect();
        let mut seen = HashSet::new();
        let selected: Vec<String> = request
            .selected
            .iter()
            .map(key_string)
            .filter(|pk| existing.contains(pk) && seen.insert(pk.clone()))
            .collect();

        if selected.is_empty() {
            self.add_message(MessageLevel::Warning, NOTHING_SELECTED);
            return Ok(ActionResponse {
                action: request.action,
                success: false,
                message: NOTHING_SELECTED.to_string(),
                affected_count: 0,
            });
        }

        let result = action.execute(self, model_key, &selected).await?;
        tracing::info!(
            model = model_key,
            action = %request.action,
            affected = result.affected_count,
            "admin action executed"
        );
        self.add_message(result.level, &result.message);
        Ok(ActionResponse {
            action: request.action,
            success: result.success,
            message: result.message,
            affected_count: result.affected_count,
        })
    }

    /// Deletes one object and returns the confirmation message.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DoesNotExist`] for an unknown object and
    /// [`StoreError::ProtectedError`] when a protected reference remains.
    pub async fn delete_object(&self, model_key: &str, pk: &str) -> StoreResult<String> {
        self.model_admin(model_key)?;
        let meta = self.meta(model_key)?;
        let row = self.db().get_object(model_key, pk).await?;
        let repr = self.object_repr(model_key, &row);
        self.delete_objects(model_key, &[pk.to_string()]).await?;

        let message = format!("The {} \"{repr}\" was deleted successfully.", meta.verbose_name);
        self.add_message(MessageLevel::Success, &message);
        Ok(message)
    }

    /// Deletes rows of `model_key`, applying the deletion rule of every
    /// foreign key that references them. Returns how many rows of
    /// `model_key` were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProtectedError`] without deleting anything when
    /// a `Protect` foreign key references one of the rows.
    pub async fn delete_objects(&self, model_key: &str, pks: &[String]) -> StoreResult<usize> {
        let plan = self.plan_deletion(model_key, pks).await?;
        let deleted = self.execute_deletion(&plan).await?;
        tracing::info!(model = model_key, deleted, "objects deleted");
        Ok(deleted)
    }

    async fn plan_deletion(&self, model_key: &str, pks: &[String]) -> StoreResult<DeletionPlan> {
        let mut metas: Vec<&ModelMeta> = self.all_meta().collect();
        metas.sort_by_key(|meta| meta.model_key());

        let mut plan = DeletionPlan::default();
        let mut protected: Vec<String> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut queue = VecDeque::from([(model_key.to_string(), pks.to_vec())]);

        while let Some((key, batch)) = queue.pop_front() {
            let batch: Vec<String> = batch
                .into_iter()
                .filter(|pk| seen.insert((key.clone(), pk.clone())))
                .collect();
            if batch.is_empty() {
                continue;
            }

            for meta in &metas {
                let referencing_key = meta.model_key();
                for field in meta.relations_to(&key) {
                    let referencing: Vec<String> = self
                        .db()
                        .all_objects(&referencing_key)
                        .await?
                        .iter()
                        .filter(|row| {
                            row.get(&field.name)
                                .is_some_and(|v| !v.is_null() && batch.contains(&key_string(v)))
                        })
                        .map(pk_of)
                        .collect();
                    if referencing.is_empty() {
                        continue;
                    }
                    match field.on_delete.unwrap_or(OnDelete::Cascade) {
                        OnDelete::Protect => {
                            let name = format!("'{}.{}'", capfirst(&meta.model_name), field.name);
                            if !protected.contains(&name) {
                                protected.push(name);
                            }
                        }
                        OnDelete::Cascade => queue.push_back((referencing_key.clone(), referencing)),
                        OnDelete::SetNull => {
                            plan.nullify
                                .push((referencing_key.clone(), field.name.clone(), referencing));
                        }
                    }
                }
            }

            if let Some(admin) = self.get_model_admin(&key) {
                for inline in &admin.inlines {
                    if matches!(inline.relation, InlineRelation::Generic { .. }) {
                        let attached = self.generic_rows(inline, &key, &batch).await?;
                        if !attached.is_empty() {
                            queue.push_back((inline.model_key(), attached));
                        }
                    }
                }
            }

            plan.deletes.push((key, batch));
        }

        if protected.is_empty() {
            Ok(plan)
        } else {
            let model_name = self
                .get_meta(model_key)
                .map_or_else(|| model_key.to_string(), |meta| capfirst(&meta.model_name));
            Err(StoreError::ProtectedError(format!(
                "Cannot delete some instances of model '{model_name}' because they are \
                 referenced through protected foreign keys: {}.",
                protected.join(", ")
            )))
        }
    }

    /// Primary keys of `inline` rows attached to any of `parent_pks`.
    async fn generic_rows(
        &self,
        inline: &InlineAdmin,
        parent_key: &str,
        parent_pks: &[String],
    ) -> StoreResult<Vec<String>> {
        let InlineRelation::Generic { ct_field, fk_field } = &inline.relation else {
            return Ok(Vec::new());
        };
        let Some(content_type) = self.content_types().lookup(parent_key) else {
            return Ok(Vec::new());
        };
        let content_type = content_type.id.to_string();
        Ok(self
            .db()
            .all_objects(&inline.model_key())
            .await?
            .iter()
            .filter(|row| {
                row.get(ct_field).is_some_and(|v| key_string(v) == content_type)
                    && row
                        .get(fk_field)
                        .is_some_and(|v| parent_pks.contains(&key_string(v)))
            })
            .map(pk_of)
            .collect())
    }

    async fn execute_deletion(&self, plan: &DeletionPlan) -> StoreResult<usize> {
        for (key, field, pks) in &plan.nullify {
            let mut changes = Map::new();
            changes.insert(field.clone(), Value::Null);
            self.db().update_objects(key, pks, &changes).await?;
        }
        let mut root_deleted = 0;
        for (index, (key, pks)) in plan.deletes.iter().enumerate().rev() {
            let deleted = self.db().delete_objects(key, pks).await?;
            if index == 0 {
                root_deleted = deleted;
            }
        }
        Ok(root_deleted)
    }

    /// Cleans a submission and checks foreign keys and unique fields against
    /// the store. Store checks run on every field that cleaned, so one
    /// response carries all of a form's errors.
    async fn clean_form(
        &self,
        meta: &ModelMeta,
        data: &Map<String, Value>,
        readonly: &[String],
        partial: bool,
        current_pk: Option<&str>,
    ) -> StoreResult<Map<String, Value>> {
        let (cleaned, field_errors) = clean_fields(meta, data, readonly, partial);
        let mut errors = ValidationError::with_field_errors(field_errors);
        for field in &meta.fields {
            let Some(value) = cleaned.get(&field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            if let Some(target) = field.related_model.as_deref() {
                match self.db().get_object(target, &key_string(value)).await {
                    Ok(_) => {}
                    Err(StoreError::DoesNotExist(_)) => {
                        errors
                            .field_errors
                            .entry(field.name.clone())
                            .or_default()
                            .push(INVALID_CHOICE.to_string());
                    }
                    Err(err) => return Err(err),
                }
            }
            if field.unique {
                let wanted = key_string(value);
                let taken = self
                    .db()
                    .all_objects(&meta.model_key())
                    .await?
                    .iter()
                    .any(|row| {
                        Some(pk_of(row).as_str()) != current_pk
                            && row.get(&field.name).is_some_and(|v| key_string(v) == wanted)
                    });
                if taken {
                    errors
                        .field_errors
                        .entry(field.name.clone())
                        .or_default()
                        .push(format!(
                            "{} with this {} already exists.",
                            capfirst(&meta.verbose_name),
                            capfirst(&field.label)
                        ));
                }
            }
        }

        if errors.is_empty() {
            Ok(cleaned)
        } else {
            errors.code = "invalid".to_string();
            tracing::debug!(model = %meta.model_key(), errors = %errors, "form rejected");
            Err(errors.into())
        }
    }

    /// Validates the submitted inline formsets of `form` without writing.
    async fn plan_inlines(
        &self,
        admin: &ModelAdmin,
        parent_key: &str,
        parent_pk: Option<&str>,
        form: &ChangeForm,
    ) -> StoreResult<Vec<InlinePlan>> {
        let mut errors = ValidationError::default();
        let mut plans = Vec::with_capacity(admin.inlines.len());

        for inline in &admin.inlines {
            let inline_key = inline.model_key();
            let submitted = form.inlines.get(&inline_key);
            if parent_pk.is_some() && submitted.is_none() {
                continue;
            }
            let inline_meta = self.meta(&inline_key)?;
            let existing: Vec<String> = match parent_pk {
                Some(pk) => self
                    .inline_rows(inline, parent_key, pk)
                    .await?
                    .iter()
                    .map(pk_of)
                    .collect(),
                None => Vec::new(),
            };
            let readonly: Vec<String> = inline
                .parent_fields()
                .into_iter()
                .map(String::from)
                .collect();

            let mut creates = Vec::new();
            let mut updates = Vec::new();
            let mut deletes: Vec<String> = Vec::new();
            let mut added = 0;
            for (index, row) in submitted.into_iter().flatten().enumerate() {
                let prefix = format!("{inline_key}-{index}");
                let id = row.id.as_ref().filter(|v| !v.is_null()).map(key_string);
                let outcome = match id {
                    Some(id) if !existing.contains(&id) => {
                        errors
                            .field_errors
                            .entry(format!("{prefix}-id"))
                            .or_default()
                            .push(INVALID_CHOICE.to_string());
                        continue;
                    }
                    Some(id) if row.delete => {
                        if !deletes.contains(&id) {
                            deletes.push(id);
                        }
                        continue;
                    }
                    Some(id) => self
                        .clean_form(inline_meta, &row.data, &readonly, true, Some(&id))
                        .await
                        .map(|cleaned| updates.push((id, cleaned))),
                    None if row.delete || row.data.is_empty() => continue,
                    None => {
                        added += 1;
                        self
                            .clean_form(inline_meta, &row.data, &readonly, false, None)
                            .await
                            .map(|cleaned| creates.push(cleaned))
                    }
                };
                match outcome {
                    Ok(()) => {}
                    Err(StoreError::ValidationError(err)) => merge_prefixed(&mut errors, &prefix, err),
                    Err(err) => return Err(err),
                }
            }

            // Invalid rows still count toward the bounds.
            let kept = existing.len() - deletes.len() + added;
            if let Err(err) = validate_formset(inline, kept) {
                errors
                    .field_errors
                    .entry(inline_key.clone())
                    .or_default()
                    .push(err.message.clone());
                if errors.message.is_empty() {
                    errors.message = err.message;
                    errors.code = err.code;
                }
            }

            let deletion = if deletes.is_empty() {
                None
            } else {
                Some(self.plan_deletion(&inline_key, &deletes).await?)
            };
            plans.push(InlinePlan {
                inline: inline.clone(),
                creates,
                updates,
                deletion,
            });
        }

        if errors.is_empty() {
            Ok(plans)
        } else {
            if errors.code.is_empty() {
                errors.code = "invalid".to_string();
            }
            tracing::debug!(model = parent_key, errors = %errors, "inline formsets rejected");
            Err(errors.into())
        }
    }

    async fn apply_inlines(
        &self,
        parent_key: &str,
        parent_pk: &str,
        plans: Vec<InlinePlan>,
    ) -> StoreResult<()> {
        for plan in plans {
            let inline_key = plan.inline.model_key();
            if let Some(deletion) = &plan.deletion {
                self.execute_deletion(deletion).await?;
            }
            for (pk, data) in plan.updates {
                self.db().update_object(&inline_key, &pk, data).await?;
            }
            let inline_meta = self.meta(&inline_key)?;
            for mut data in plan.creates {
                match &plan.inline.relation {
                    InlineRelation::ForeignKey { fk_name } => {
                        data.insert(fk_name.clone(), pk_value(parent_pk));
                    }
                    InlineRelation::Generic { ct_field, fk_field } => {
                        let content_type = self.content_type_for(parent_key)?.id;
                        data.insert(ct_field.clone(), Value::from(content_type));
                        data.insert(fk_field.clone(), pk_value(parent_pk));
                    }
                }
                stamp_auto_fields(inline_meta, &mut data, true);
                self.db().create_object(&inline_key, data).await?;
            }
        }
        Ok(())
    }
}

/// Sets `auto_now` fields, and `auto_now_add` fields when `creating`.
fn stamp_auto_fields(meta: &ModelMeta, data: &mut Map<String, Value>, creating: bool) {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    for field in &meta.fields {
        if field.auto_now || (creating && field.auto_now_add) {
            data.insert(field.name.clone(), Value::String(now.clone()));
        }
    }
}

/// Stores a primary key the way the store assigns them: numeric when possible.
fn pk_value(pk: &str) -> Value {
    pk.parse::<i64>()
        .map_or_else(|_| Value::String(pk.to_string()), Value::from)
}

/// Combines the outcomes of validating a form and its inlines, reporting
/// the validation errors of both.
fn join_validation<A, B>(form: StoreResult<A>, inlines: StoreResult<B>) -> StoreResult<(A, B)> {
    match (form, inlines) {
        (Ok(form), Ok(inlines)) => Ok((form, inlines)),
        (Err(StoreError::ValidationError(mut errors)), Err(StoreError::ValidationError(more))) => {
            for (field, messages) in more.field_errors {
                errors.field_errors.entry(field).or_default().extend(messages);
            }
            if errors.message.is_empty() && !more.message.is_empty() {
                errors.message = more.message;
                errors.code = more.code;
            }
            Err(errors.into())
        }
        (Err(err), _) | (_, Err(err)) => Err(err),
    }
}

fn merge_prefixed(into: &mut ValidationError, prefix: &str, err: ValidationError) {
    if !err.message.is_empty() {
        into.field_errors
            .entry(prefix.to_string())
            .or_default()
            .push(err.message);
    }
    for (field, messages) in err.field_errors {
        into.field_errors
            .entry(format!("{prefix}-{field}"))
            .or_default()
            .extend(messages);
    }
}
