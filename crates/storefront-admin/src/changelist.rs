//! Changelist building blocks.
//!
//! The changelist view runs rows through annotation, filtering, searching,
//! ordering, and pagination, then renders one cell per `list_display` column.
//! The pieces here are independent of the site so they can be used and tested
//! on plain rows.

use std::collections::HashMap;

use serde_json::Value;
use storefront_core::{StoreError, StoreResult};

use crate::api::{Cell, ColumnInfo};
use crate::db::{key_string, pk_of};
use crate::display::{capfirst, DisplayRegistry};
use crate::filters::compare_json_values;
use crate::meta::{FieldType, ModelMeta};
use crate::model_admin::ModelAdmin;
use crate::urls::AdminUrls;

/// Shown for empty values.
pub const EMPTY_VALUE_DISPLAY: &str = "-";

/// Parameters of a changelist request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeListQuery {
    /// Requested page (1-indexed).
    pub page: usize,
    /// The search box contents.
    pub search: String,
    /// Raw `o` parameter.
    pub ordering: Option<String>,
    /// Whether "show all" was requested.
    pub show_all: bool,
    /// Every other parameter, as lookups.
    pub filters: Vec<(String, String)>,
}

impl ChangeListQuery {
    /// Splits query pairs into the reserved changelist parameters and lookups.
    ///
    /// ```
    /// use storefront_admin::changelist::ChangeListQuery;
    ///
    /// let pairs = vec![
    ///     ("p".to_string(), "2".to_string()),
    ///     ("q".to_string(), "mug".to_string()),
    ///     ("collection__id__exact".to_string(), "3".to_string()),
    /// ];
    /// let query = ChangeListQuery::from_pairs(pairs).unwrap();
    /// assert_eq!(query.page, 2);
    /// assert_eq!(query.search, "mug");
    /// assert_eq!(query.filters.len(), 1);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadRequest`] when `p` is not a number.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> StoreResult<Self> {
        let mut query = Self {
            page: 1,
            ..Self::default()
        };
        for (key, value) in pairs {
            match key.as_str() {
                "p" => {
                    query.page = value
                        .trim()
                        .parse()
                        .map_err(|_| StoreError::BadRequest(format!("Invalid page '{value}'")))?;
                }
                "q" => query.search = value,
                "o" => query.ordering = Some(value).filter(|o| !o.trim().is_empty()),
                "all" => query.show_all = true,
                // Error flag set by clients after a rejected filter.
                "e" => {}
                _ if value.is_empty() => {}
                _ => query.filters.push((key, value)),
            }
        }
        Ok(query)
    }
}

/// Stores in each row the number of `related` rows whose `fk_field` points at it.
pub fn annotate_count(rows: &mut [Value], name: &str, related: &[Value], fk_field: &str) {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in related {
        if let Some(target) = row.get(fk_field).filter(|v| !v.is_null()) {
            *counts.entry(key_string(target)).or_default() += 1;
        }
    }
    for row in rows.iter_mut() {
        let count = counts.get(&pk_of(row)).copied().unwrap_or(0);
        if let Value::Object(map) = row {
            map.insert(name.to_string(), Value::from(count));
        }
    }
}

/// Works out the ordering of a changelist.
///
/// A requested ordering may only name `list_display` columns; display columns
/// sort by their declared ordering field. Without a request the admin's
/// ordering applies, then the model's. `-id` is appended as a tie-break so
/// pages are stable.
///
/// # Errors
///
/// Returns [`StoreError::BadRequest`] for a column that cannot be sorted.
pub fn resolve_ordering(
    requested: Option<&str>,
    admin: &ModelAdmin,
    meta: &ModelMeta,
    displays: Option<&DisplayRegistry>,
) -> StoreResult<Vec<String>> {
    let mut ordering: Vec<String> = match requested {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| {
                let (name, descending) = item
                    .strip_prefix('-')
                    .map_or((item, false), |stripped| (stripped, true));
                let target = sort_field(name, admin, meta, displays).ok_or_else(|| {
                    StoreError::BadRequest(format!("Cannot order by '{name}'"))
                })?;
                Ok(apply_direction(&target, descending))
            })
            .collect::<StoreResult<_>>()?,
        None if !admin.ordering.is_empty() => admin.ordering.clone(),
        None => meta.ordering.clone(),
    };

    let pk = meta.pk_name();
    if !ordering
        .iter()
        .any(|o| o.trim_start_matches('-') == pk)
    {
        ordering.push(format!("-{pk}"));
    }
    Ok(ordering)
}

fn apply_direction(target: &str, descending: bool) -> String {
    match (target.strip_prefix('-'), descending) {
        (Some(inner), true) => inner.to_string(),
        (Some(_), false) => target.to_string(),
        (None, true) => format!("-{target}"),
        (None, false) => target.to_string(),
    }
}

/// Returns the field a `list_display` column sorts by, if it is sortable.
fn sort_field(
    name: &str,
    admin: &ModelAdmin,
    meta: &ModelMeta,
    displays: Option<&DisplayRegistry>,
) -> Option<String> {
    if !admin.list_display.iter().any(|c| c == name) || name == "__str__" {
        return None;
    }
    if meta.field(name).is_some() || admin.annotation(name).is_some() {
        return Some(name.to_string());
    }
    displays
        .and_then(|d| d.get(name))
        .and_then(|column| column.ordering())
        .map(ToString::to_string)
}

/// Sorts rows by a list of fields, each optionally prefixed with `-`.
pub fn sort_rows(rows: &mut [Value], ordering: &[String]) {
    let keys: Vec<(&str, bool)> = ordering
        .iter()
        .map(|o| {
            o.strip_prefix('-')
                .map_or((o.as_str(), false), |field| (field, true))
        })
        .collect();
    rows.sort_by(|a, b| {
        for (field, descending) in &keys {
            let cmp = compare_json_values(a.get(*field), b.get(*field));
            let cmp = if *descending { cmp.reverse() } else { cmp };
            if cmp.is_ne() {
                return cmp;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// Builds the column headers of a changelist.
pub fn columns(
    admin: &ModelAdmin,
    meta: &ModelMeta,
    displays: Option<&DisplayRegistry>,
) -> Vec<ColumnInfo> {
    let links = admin.display_links();
    admin
        .list_display
        .iter()
        .map(|name| {
            let label = if name == "__str__" {
                capfirst(&meta.verbose_name)
            } else if let Some(field) = meta.field(name) {
                capfirst(&field.label)
            } else if let Some(column) = displays.and_then(|d| d.get(name)) {
                capfirst(
                    &column
                        .description()
                        .map_or_else(|| name.replace('_', " "), ToString::to_string),
                )
            } else {
                capfirst(&name.replace('_', " "))
            };
            ColumnInfo {
                name: name.clone(),
                label,
                sortable: sort_field(name, admin, meta, displays).is_some(),
                editable: admin.list_editable.contains(name),
                link: links.contains(&name.as_str()),
            }
        })
        .collect()
}

/// Everything a cell needs beyond its row.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// The row's model.
    pub meta: &'a ModelMeta,
    /// The model's display columns.
    pub displays: Option<&'a DisplayRegistry>,
    /// URL reverser.
    pub urls: &'a AdminUrls,
    /// String representations of related rows, keyed by field then primary key.
    pub related: &'a HashMap<String, HashMap<String, String>>,
}

/// Returns the string representation of a row.
///
/// Uses the model's `__str__` display column when registered, otherwise
/// `"{Verbose name} object ({pk})"`.
pub fn object_repr(
    meta: &ModelMeta,
    displays: Option<&DisplayRegistry>,
    urls: &AdminUrls,
    row: &Value,
) -> String {
    displays
        .and_then(|d| d.get("__str__"))
        .and_then(|column| column.render(row, urls).ok())
        .map_or_else(
            || format!("{} object ({})", capfirst(&meta.verbose_name), pk_of(row)),
            |value| value.as_str().to_string(),
        )
}

/// Renders one cell.
///
/// # Errors
///
/// Returns [`StoreError::ImproperlyConfigured`] for a column that is neither a
/// field, a display column, nor an annotation, and propagates display errors.
pub fn render_cell(column: &str, row: &Value, ctx: &RenderContext<'_>) -> StoreResult<Cell> {
    if column == "__str__" {
        let repr = object_repr(ctx.meta, ctx.displays, ctx.urls, row);
        return Ok(Cell {
            column: column.to_string(),
            value: Value::String(repr.clone()),
            display: repr,
            html: false,
        });
    }

    if let Some(field) = ctx.meta.field(column) {
        let value = row.get(column).cloned().unwrap_or(Value::Null);
        let display = if value.is_null() {
            EMPTY_VALUE_DISPLAY.to_string()
        } else if field.is_relation() {
            let pk = key_string(&value);
            ctx.related
                .get(column)
                .and_then(|reprs| reprs.get(&pk))
                .cloned()
                .unwrap_or(pk)
        } else if let Some(label) = value.as_str().and_then(|v| field.choice_label(v)) {
            label.to_string()
        } else if field.field_type == FieldType::DecimalField {
            let places = field.decimal_places.unwrap_or(2) as usize;
            value
                .as_f64()
                .map_or_else(|| key_string(&value), |n| format!("{n:.places$}"))
        } else {
            key_string(&value)
        };
        return Ok(Cell {
            column: column.to_string(),
            value,
            display,
            html: false,
        });
    }

    if let Some(display_column) = ctx.displays.and_then(|d| d.get(column)) {
        let rendered = display_column.render(row, ctx.urls)?;
        return Ok(Cell {
            column: column.to_string(),
            value: Value::String(rendered.as_str().to_string()),
            display: rendered.as_str().to_string(),
            html: rendered.is_html(),
        });
    }

    if let Some(value) = row.get(column) {
        return Ok(Cell {
            column: column.to_string(),
            value: value.clone(),
            display: key_string(value),
            html: false,
        });
    }

    Err(StoreError::ImproperlyConfigured(format!(
        "Unknown list_display column '{column}' on {}",
        ctx.meta.model_key()
    )))
}
