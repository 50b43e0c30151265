//! Changelist filtering, searching, and the filter sidebar.
//!
//! Query parameters other than the reserved changelist ones are field lookups
//! in the `field[__id][__op]` form (`collection__id__exact=3`,
//! `last_update__gte=2024-01-01`). [`apply_filters`] evaluates them against
//! rows; [`apply_search`] implements the search box. The [`FilterSpec`]
//! builders describe the sidebar, each choice carrying the query string that
//! selects it.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::utils::http::urlencode;
use storefront_core::{StoreError, StoreResult};

use crate::db::key_string;
use crate::meta::{FieldSchema, ModelMeta};

/// A comparison applied by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    /// Equal (the default).
    Exact,
    /// Equal ignoring case.
    IExact,
    /// Substring match ignoring case.
    IContains,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Null check; the value is a boolean.
    IsNull,
}

impl LookupOp {
    fn parse(segment: &str) -> Option<Self> {
        Some(match segment {
            "exact" => Self::Exact,
            "iexact" => Self::IExact,
            "icontains" => Self::IContains,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "isnull" => Self::IsNull,
            _ => return None,
        })
    }
}

/// A parsed filter parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// The model field the lookup reads.
    pub field: String,
    /// The comparison.
    pub op: LookupOp,
}

impl Lookup {
    /// Parses a query parameter name against a model's fields.
    ///
    /// ```
    /// use storefront_admin::filters::{Lookup, LookupOp};
    /// use storefront_admin::meta::{FieldSchema, FieldType, ModelMeta, OnDelete};
    ///
    /// let meta = ModelMeta::new("store", "product").fields(vec![
    ///     FieldSchema::auto_id(),
    ///     FieldSchema::new("collection", FieldType::ForeignKey)
    ///         .foreign_key("store.collection", OnDelete::Protect),
    /// ]);
    /// let lookup = Lookup::parse("collection__id__exact", &meta).unwrap();
    /// assert_eq!(lookup.field, "collection");
    /// assert_eq!(lookup.op, LookupOp::Exact);
    /// assert!(Lookup::parse("price__gte", &meta).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadRequest`] for unknown fields or operators.
    pub fn parse(key: &str, meta: &ModelMeta) -> StoreResult<Self> {
        let mut segments = key.split("__");
        let field_name = segments.next().unwrap_or_default();
        let field = meta.field(field_name).ok_or_else(|| {
            StoreError::BadRequest(format!(
                "Unknown filter field '{field_name}' on {}",
                meta.model_key()
            ))
        })?;

        let mut rest: Vec<&str> = segments.collect();
        if field.is_relation() && rest.first() == Some(&"id") {
            rest.remove(0);
        }
        let op = match rest.as_slice() {
            [] => LookupOp::Exact,
            [op] => LookupOp::parse(op)
                .ok_or_else(|| StoreError::BadRequest(format!("Unsupported lookup '{key}'")))?,
            _ => return Err(StoreError::BadRequest(format!("Unsupported lookup '{key}'"))),
        };
        Ok(Self {
            field: field.name.clone(),
            op,
        })
    }

    /// Returns `true` if `row` satisfies this lookup for the raw parameter value.
    pub fn matches(&self, row: &Value, raw: &str) -> bool {
        let value = row.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            LookupOp::IsNull => value.is_null() == parse_flag(raw),
            _ if value.is_null() => false,
            LookupOp::Exact => equals(value, raw),
            LookupOp::IExact => key_string(value).to_lowercase() == raw.to_lowercase(),
            LookupOp::IContains => key_string(value)
                .to_lowercase()
                .contains(&raw.to_lowercase()),
            LookupOp::Gt => compare_lookup(value, raw) == Some(Ordering::Greater),
            LookupOp::Gte => matches!(
                compare_lookup(value, raw),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            LookupOp::Lt => compare_lookup(value, raw) == Some(Ordering::Less),
            LookupOp::Lte => matches!(
                compare_lookup(value, raw),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn equals(value: &Value, raw: &str) -> bool {
    match value {
        Value::Number(n) => raw
            .parse::<f64>()
            .ok()
            .zip(n.as_f64())
            .is_some_and(|(a, b)| (a - b).abs() < f64::EPSILON),
        Value::Bool(b) => *b == parse_flag(raw),
        other => key_string(other) == raw,
    }
}

/// Parses an RFC 3339 timestamp or a `YYYY-MM-DD` date (as midnight UTC).
pub fn parse_temporal(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn compare_lookup(value: &Value, raw: &str) -> Option<Ordering> {
    match value {
        Value::Number(n) => n.as_f64()?.partial_cmp(&raw.parse::<f64>().ok()?),
        Value::String(s) => match (parse_temporal(s), parse_temporal(raw)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(s.as_str().cmp(raw)),
        },
        _ => None,
    }
}

/// Keeps the rows matching every lookup in `params`.
///
/// # Errors
///
/// Returns [`StoreError::BadRequest`] if any parameter is not a valid lookup.
pub fn apply_filters(
    rows: Vec<Value>,
    meta: &ModelMeta,
    params: &[(String, String)],
) -> StoreResult<Vec<Value>> {
    if params.is_empty() {
        return Ok(rows);
    }
    let lookups = params
        .iter()
        .map(|(key, raw)| Lookup::parse(key, meta).map(|lookup| (lookup, raw.as_str())))
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(rows
        .into_iter()
        .filter(|row| lookups.iter().all(|(lookup, raw)| lookup.matches(row, raw)))
        .collect())
}

/// Applies a search query across `search_fields`.
///
/// The query is split on whitespace; a row is kept when every term matches at
/// least one field, ignoring case. A field prefixed with `^` matches at the
/// start of the value and one prefixed with `=` must match exactly.
pub fn apply_search(rows: Vec<Value>, search_fields: &[String], query: &str) -> Vec<Value> {
    let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if terms.is_empty() || search_fields.is_empty() {
        return rows;
    }

    rows.into_iter()
        .filter(|row| {
            terms.iter().all(|term| {
                search_fields
                    .iter()
                    .any(|field| search_field_matches(row, field, term))
            })
        })
        .collect()
}

fn search_field_matches(row: &Value, field: &str, term: &str) -> bool {
    let (name, mode) = match field.chars().next() {
        Some(prefix @ ('^' | '=')) => (&field[1..], prefix),
        _ => (field, ' '),
    };
    let Some(value) = row.get(name).filter(|v| !v.is_null()) else {
        return false;
    };
    let text = key_string(value).to_lowercase();
    match mode {
        '^' => text.starts_with(term),
        '=' => text == term,
        _ => text.contains(term),
    }
}

/// Compares two optional JSON values for ordering. Missing and null sort first.
pub fn compare_json_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if let (Some(a_num), Some(b_num)) = (a.as_f64(), b.as_f64()) {
                a_num.partial_cmp(&b_num).unwrap_or(Ordering::Equal)
            } else if let (Some(a_str), Some(b_str)) = (a.as_str(), b.as_str()) {
                match (parse_temporal(a_str), parse_temporal(b_str)) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => a_str.to_lowercase().cmp(&b_str.to_lowercase()),
                }
            } else if let (Some(a_bool), Some(b_bool)) = (a.as_bool(), b.as_bool()) {
                a_bool.cmp(&b_bool)
            } else {
                a.to_string().cmp(&b.to_string())
            }
        }
    }
}

/// One entry of a sidebar filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterChoice {
    /// The label shown to the user.
    pub display: String,
    /// Query string (starting with `?`) that selects this choice.
    pub query_string: String,
    /// Whether the current request has this choice selected.
    pub selected: bool,
}

/// A sidebar filter with its choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// The field the filter applies to.
    pub field: String,
    /// Human-readable title.
    pub title: String,
    /// Available choices, "All" first.
    pub choices: Vec<FilterChoice>,
}

/// Builds filter choices for one field against the current request parameters.
struct ChoiceBuilder<'a> {
    field: &'a str,
    params: &'a [(String, String)],
    choices: Vec<FilterChoice>,
}

impl<'a> ChoiceBuilder<'a> {
    fn new(field: &'a str, params: &'a [(String, String)]) -> Self {
        let mut builder = Self {
            field,
            params,
            choices: Vec::new(),
        };
        let untouched = !params.iter().any(|(k, _)| builder.owns(k));
        builder.push_with("All", &[], untouched);
        builder
    }

    fn owns(&self, key: &str) -> bool {
        key == self.field
            || key
                .strip_prefix(self.field)
                .is_some_and(|rest| rest.starts_with("__"))
    }

    /// Folds the spellings of an exact match (`field`, `field__exact`,
    /// `field__id`, `field__id__exact`) into one key.
    fn canonical(&self, key: &str) -> String {
        match key.strip_prefix(self.field) {
            Some("" | "__exact" | "__id" | "__id__exact") => format!("{}__exact", self.field),
            _ => key.to_string(),
        }
    }

    fn is_selected(&self, set: &[(String, String)]) -> bool {
        let current: Vec<(String, &str)> = self
            .params
            .iter()
            .filter(|(k, _)| self.owns(k))
            .map(|(k, v)| (self.canonical(k), v.as_str()))
            .collect();
        current.len() == set.len()
            && set
                .iter()
                .all(|(k, v)| current.contains(&(self.canonical(k), v.as_str())))
    }

    fn push(&mut self, display: impl Into<String>, set: Vec<(String, String)>) {
        let selected = self.is_selected(&set);
        self.push_with(display, &set, selected);
    }

    fn push_with(&mut self, display: impl Into<String>, set: &[(String, String)], selected: bool) {
        let mut pairs: Vec<(String, String)> = self
            .params
            .iter()
            .filter(|(k, _)| k != "p" && !self.owns(k))
            .cloned()
            .collect();
        pairs.extend(set.iter().cloned());
        self.choices.push(FilterChoice {
            display: display.into(),
            query_string: format!("?{}", urlencode(&pairs)),
            selected,
        });
    }

    fn finish(self, title: &str) -> FilterSpec {
        FilterSpec {
            field: self.field.to_string(),
            title: title.to_string(),
            choices: self.choices,
        }
    }
}

/// A filter over a foreign key, one choice per related row.
///
/// `options` are `(primary key, label)` pairs of the related rows.
pub fn related_filter(
    field: &FieldSchema,
    options: &[(String, String)],
    params: &[(String, String)],
) -> FilterSpec {
    let mut builder = ChoiceBuilder::new(&field.name, params);
    let key = format!("{}__id__exact", field.name);
    for (pk, label) in options {
        builder.push(label.clone(), vec![(key.clone(), pk.clone())]);
    }
    if !field.required {
        builder.push(
            "Empty",
            vec![(format!("{}__isnull", field.name), "True".to_string())],
        );
    }
    builder.finish(&field.label)
}

/// A filter over a field with declared choices.
pub fn choices_filter(field: &FieldSchema, params: &[(String, String)]) -> FilterSpec {
    let mut builder = ChoiceBuilder::new(&field.name, params);
    let key = format!("{}__exact", field.name);
    for (value, label) in field.choices.iter().flatten() {
        builder.push(label.clone(), vec![(key.clone(), value.clone())]);
    }
    builder.finish(&field.label)
}

/// A filter offering every distinct value present in `rows`.
pub fn all_values_filter(field: &FieldSchema, rows: &[Value], params: &[(String, String)]) -> FilterSpec {
    let mut values: Vec<&Value> = rows
        .iter()
        .filter_map(|row| row.get(&field.name))
        .filter(|v| !v.is_null())
        .collect();
    values.sort_by(|a, b| compare_json_values(Some(a), Some(b)));
    values.dedup();

    let mut builder = ChoiceBuilder::new(&field.name, params);
    let key = format!("{}__exact", field.name);
    for value in values {
        let text = key_string(value);
        builder.push(text.clone(), vec![(key.clone(), text)]);
    }
    builder.finish(&field.label)
}

/// A filter over a date or datetime field with relative ranges ending today.
pub fn date_filter(field: &FieldSchema, today: NaiveDate, params: &[(String, String)]) -> FilterSpec {
    let gte = format!("{}__gte", field.name);
    let lt = format!("{}__lt", field.name);
    let range = |from: NaiveDate, to: NaiveDate| {
        vec![
            (gte.clone(), from.format("%Y-%m-%d").to_string()),
            (lt.clone(), to.format("%Y-%m-%d").to_string()),
        ]
    };

    let mut builder = ChoiceBuilder::new(&field.name, params);
    builder.choices[0].display = "Any date".to_string();
    let tomorrow = today.succ_opt();

    if let Some(tomorrow) = tomorrow {
        builder.push("Today", range(today, tomorrow));
        if let Some(week_ago) = today.checked_sub_days(Days::new(7)) {
            builder.push("Past 7 days", range(week_ago, tomorrow));
        }
    }
    if let Some((first, next)) = month_bounds(today) {
        builder.push("This month", range(first, next));
    }
    if let (Some(first), Some(next)) = (
        NaiveDate::from_ymd_opt(today.year(), 1, 1),
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1),
    ) {
        builder.push("This year", range(first, next));
    }
    if !field.required && !field.auto_now && !field.auto_now_add {
        let isnull = format!("{}__isnull", field.name);
        builder.push("No date", vec![(isnull.clone(), "True".to_string())]);
        builder.push("Has date", vec![(isnull, "False".to_string())]);
    }
    builder.finish(&field.label)
}

fn month_bounds(day: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let first = day.with_day(1)?;
    let next = if day.month() == 12 {
        NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)?
    };
    Some((first, next))
}
