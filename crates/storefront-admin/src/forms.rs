//! Form cleaning for the change view, the add view, and list editing.
//!
//! Submitted values are checked against the model's [`FieldSchema`]s and
//! converted to their stored representation. Errors are collected per field
//! into a [`ValidationError`] so one response reports every problem.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use storefront_core::ValidationError;

use crate::meta::{FieldSchema, FieldType, ModelMeta};
use crate::model_admin::InlineAdmin;

const REQUIRED: &str = "This field is required.";
const SMALL_INT_MAX: i64 = 32767;

/// A change or add form submission.
///
/// ```
/// use storefront_admin::forms::ChangeForm;
///
/// let form: ChangeForm = serde_json::from_str(r#"{
///     "fields": {"customer": 1, "payment_status": "P"},
///     "inlines": {"store.orderitem": [{"product": 2, "quantity": 1, "unit_price": "9.50"}]}
/// }"#).unwrap();
/// assert_eq!(form.inlines["store.orderitem"].len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeForm {
    /// Values for the object's own fields.
    #[serde(default)]
    pub fields: Map<String, Value>,
    /// Inline rows keyed by the inline's model key.
    #[serde(default)]
    pub inlines: HashMap<String, Vec<InlineFormData>>,
}

/// One row of an inline formset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineFormData {
    /// The primary key of an existing row; absent for new rows.
    #[serde(default)]
    pub id: Option<Value>,
    /// Marks an existing row for deletion.
    #[serde(default, rename = "DELETE")]
    pub delete: bool,
    /// The row's field values.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Cleans one submitted value.
///
/// Empty strings count as missing. Returns the stored representation, or the
/// list of messages describing why the value was rejected.
pub fn clean_value(field: &FieldSchema, raw: &Value) -> Result<Value, Vec<String>> {
    let is_empty = match raw {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if is_empty {
        if field.required {
            return Err(vec![REQUIRED.to_string()]);
        }
        return Ok(Value::Null);
    }

    let mut errors = Vec::new();
    let value = match field.field_type {
        FieldType::CharField | FieldType::SlugField | FieldType::TextField | FieldType::EmailField => {
            clean_text(field, raw, &mut errors)
        }
        FieldType::AutoField
        | FieldType::IntegerField
        | FieldType::PositiveIntegerField
        | FieldType::PositiveSmallIntegerField => clean_integer(field, raw, &mut errors),
        FieldType::DecimalField => clean_decimal(field, raw, &mut errors),
        FieldType::DateField => match raw.as_str().map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")) {
            Some(Ok(date)) => Value::String(date.format("%Y-%m-%d").to_string()),
            _ => {
                errors.push("Enter a valid date (YYYY-MM-DD).".to_string());
                Value::Null
            }
        },
        FieldType::DateTimeField => match raw.as_str().and_then(parse_datetime) {
            Some(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            None => {
                errors.push("Enter a valid date/time.".to_string());
                Value::Null
            }
        },
        FieldType::ForeignKey => match as_integer(raw) {
            Some(pk) => Value::from(pk),
            None => {
                errors.push(
                    "Select a valid choice. That choice is not one of the available choices."
                        .to_string(),
                );
                Value::Null
            }
        },
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

fn clean_text(field: &FieldSchema, raw: &Value, errors: &mut Vec<String>) -> Value {
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => {
            errors.push("Enter a valid value.".to_string());
            return Value::Null;
        }
    };

    if let Some(max) = field.max_length {
        let len = text.chars().count();
        if len > max {
            errors.push(format!(
                "Ensure this value has at most {max} characters (it has {len})."
            ));
        }
    }
    match field.field_type {
        FieldType::SlugField
            if !text
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') =>
        {
            errors.push(
                "Enter a valid \"slug\" consisting of letters, numbers, underscores or hyphens."
                    .to_string(),
            );
        }
        FieldType::EmailField if !is_valid_email(&text) => {
            errors.push("Enter a valid email address.".to_string());
        }
        _ => {}
    }
    if field.choices.is_some() && field.choice_label(&text).is_none() {
        errors.push(format!(
            "Select a valid choice. {text} is not one of the available choices."
        ));
    }
    Value::String(text)
}

fn is_valid_email(text: &str) -> bool {
    let Some((local, domain)) = text.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !text.chars().any(char::is_whitespace)
}

fn as_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn clean_integer(field: &FieldSchema, raw: &Value, errors: &mut Vec<String>) -> Value {
    let Some(n) = as_integer(raw) else {
        errors.push("Enter a whole number.".to_string());
        return Value::Null;
    };

    let min = match field.field_type {
        FieldType::PositiveIntegerField | FieldType::PositiveSmallIntegerField => {
            Some(field.min_value.map_or(0, |m| m.max(0)))
        }
        _ => field.min_value,
    };
    if let Some(min) = min {
        if n < min {
            errors.push(format!("Ensure this value is greater than or equal to {min}."));
        }
    }
    if field.field_type == FieldType::PositiveSmallIntegerField && n > SMALL_INT_MAX {
        errors.push(format!(
            "Ensure this value is less than or equal to {SMALL_INT_MAX}."
        ));
    }
    Value::from(n)
}

fn clean_decimal(field: &FieldSchema, raw: &Value, errors: &mut Vec<String>) -> Value {
    let parsed = match raw {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    let Some(decimal) = parsed else {
        errors.push("Enter a number.".to_string());
        return Value::Null;
    };

    let normalized = decimal.normalize();
    let places = normalized.scale();
    let digits = normalized.abs().mantissa().to_string().len();
    let digits = u32::try_from(digits).unwrap_or(u32::MAX).max(places);
    let whole_digits = digits - places;

    if let Some(max_digits) = field.max_digits {
        if digits > max_digits {
            errors.push(format!(
                "Ensure that there are no more than {max_digits} digits in total."
            ));
        }
    }
    if let Some(decimal_places) = field.decimal_places {
        if places > decimal_places {
            errors.push(format!(
                "Ensure that there are no more than {decimal_places} decimal places."
            ));
        }
        if let Some(max_digits) = field.max_digits {
            let max_whole = max_digits.saturating_sub(decimal_places);
            if whole_digits > max_whole && digits <= max_digits {
                errors.push(format!(
                    "Ensure that there are no more than {max_whole} digits before the decimal point."
                ));
            }
        }
    }
    if let Some(min) = field.min_value {
        if decimal < Decimal::from(min) {
            errors.push(format!("Ensure this value is greater than or equal to {min}."));
        }
    }

    normalized
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.and_utc())
}

/// Cleans a submission for one model.
///
/// Read-only fields (from the schema or from `readonly`) are ignored. Unknown
/// fields are rejected. With `partial` set, only submitted fields are cleaned,
/// which is how existing rows are updated; otherwise missing required fields
/// are reported and missing optional fields take their default.
pub fn clean_data(
    meta: &ModelMeta,
    data: &Map<String, Value>,
    readonly: &[String],
    partial: bool,
) -> Result<Map<String, Value>, ValidationError> {
    let (cleaned, field_errors) = clean_fields(meta, data, readonly, partial);
    if field_errors.is_empty() {
        Ok(cleaned)
    } else {
        let mut err = ValidationError::with_field_errors(field_errors);
        err.code = "invalid".to_string();
        Err(err)
    }
}

/// Like [`clean_data`], but returns the fields that did clean alongside the
/// errors of those that did not.
pub fn clean_fields(
    meta: &ModelMeta,
    data: &Map<String, Value>,
    readonly: &[String],
    partial: bool,
) -> (Map<String, Value>, BTreeMap<String, Vec<String>>) {
    let mut cleaned = Map::new();
    let mut field_errors: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for key in data.keys() {
        if meta.field(key).is_none() {
            field_errors
                .entry(key.clone())
                .or_default()
                .push(format!("Unknown field for {}.", meta.verbose_name));
        }
    }

    for field in &meta.fields {
        if field.read_only || readonly.iter().any(|r| r == &field.name) {
            continue;
        }
        match data.get(&field.name) {
            Some(raw) => match clean_value(field, raw) {
                Ok(value) => {
                    cleaned.insert(field.name.clone(), value);
                }
                Err(errors) => {
                    field_errors.insert(field.name.clone(), errors);
                }
            },
            None if partial => {}
            None if field.required => {
                field_errors.insert(field.name.clone(), vec![REQUIRED.to_string()]);
            }
            None => {
                cleaned.insert(
                    field.name.clone(),
                    field.default.clone().unwrap_or(Value::Null),
                );
            }
        }
    }

    (cleaned, field_errors)
}

/// Checks the number of rows an inline keeps against its bounds.
pub fn validate_formset(inline: &InlineAdmin, kept: usize) -> Result<(), ValidationError> {
    if kept < inline.min_num {
        let noun = if inline.min_num == 1 { "form" } else { "forms" };
        return Err(ValidationError::new(
            format!("Please submit at least {} {noun}.", inline.min_num),
            "min_num",
        ));
    }
    if let Some(max) = inline.max_num {
        if kept > max {
            let noun = if max == 1 { "form" } else { "forms" };
            return Err(ValidationError::new(
                format!("Please submit at most {max} {noun}."),
                "max_num",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::meta::OnDelete;

    fn price() -> FieldSchema {
        FieldSchema::new("unit_price", FieldType::DecimalField)
            .decimal(6, 2)
            .min_value(1)
    }

    fn customer_meta() -> ModelMeta {
        ModelMeta::new("store", "customer").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("first_name", FieldType::CharField).max_length(5),
            FieldSchema::new("email", FieldType::EmailField).unique(),
            FieldSchema::new("birth_date", FieldType::DateField).optional(),
            FieldSchema::new("membership", FieldType::CharField)
                .choices(&[("B", "Bronze"), ("S", "Silver"), ("G", "Gold")])
                .default("B"),
        ])
    }

    #[test]
    fn test_clean_required_and_empty() {
        let field = FieldSchema::new("title", FieldType::CharField);
        assert_eq!(clean_value(&field, &json!("  ")).unwrap_err(), vec![REQUIRED]);
        let optional = FieldSchema::new("description", FieldType::TextField).optional();
        assert_eq!(clean_value(&optional, &json!("")).unwrap(), Value::Null);
    }

    #[test]
    fn test_clean_char_max_length_and_trim() {
        let field = FieldSchema::new("title", FieldType::CharField).max_length(3);
        assert_eq!(clean_value(&field, &json!(" abc ")).unwrap(), json!("abc"));
        assert_eq!(
            clean_value(&field, &json!("abcd")).unwrap_err(),
            vec!["Ensure this value has at most 3 characters (it has 4)."]
        );
    }

    #[test]
    fn test_clean_slug_and_email() {
        let slug = FieldSchema::new("slug", FieldType::SlugField);
        assert!(clean_value(&slug, &json!("coffee-mug_2")).is_ok());
        assert!(clean_value(&slug, &json!("coffee mug")).is_err());

        let email = FieldSchema::new("email", FieldType::EmailField);
        assert!(clean_value(&email, &json!("ann@example.com")).is_ok());
        for bad in ["ann", "ann@", "@example.com", "ann@example", "a nn@example.com"] {
            assert!(clean_value(&email, &json!(bad)).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_clean_choices() {
        let field = FieldSchema::new("membership", FieldType::CharField)
            .choices(&[("B", "Bronze"), ("G", "Gold")]);
        assert_eq!(clean_value(&field, &json!("G")).unwrap(), json!("G"));
        assert_eq!(
            clean_value(&field, &json!("X")).unwrap_err(),
            vec!["Select a valid choice. X is not one of the available choices."]
        );
    }

    #[test]
    fn test_clean_integers() {
        let inventory = FieldSchema::new("inventory", FieldType::IntegerField).min_value(0);
        assert_eq!(clean_value(&inventory, &json!("12")).unwrap(), json!(12));
        assert_eq!(
            clean_value(&inventory, &json!(-1)).unwrap_err(),
            vec!["Ensure this value is greater than or equal to 0."]
        );
        assert_eq!(
            clean_value(&inventory, &json!("1.5")).unwrap_err(),
            vec!["Enter a whole number."]
        );

        let quantity = FieldSchema::new("quantity", FieldType::PositiveSmallIntegerField);
        assert!(clean_value(&quantity, &json!(-3)).is_err());
        assert!(clean_value(&quantity, &json!(40000)).is_err());
        assert_eq!(clean_value(&quantity, &json!(3)).unwrap(), json!(3));
    }

    #[test]
    fn test_clean_decimal() {
        assert_eq!(clean_value(&price(), &json!("19.99")).unwrap(), json!(19.99));
        assert_eq!(clean_value(&price(), &json!(5)).unwrap(), json!(5.0));
        assert_eq!(
            clean_value(&price(), &json!("0.50")).unwrap_err(),
            vec!["Ensure this value is greater than or equal to 1."]
        );
        assert_eq!(
            clean_value(&price(), &json!("1.999")).unwrap_err(),
            vec!["Ensure that there are no more than 2 decimal places."]
        );
        assert_eq!(
            clean_value(&price(), &json!("12345.5")).unwrap_err(),
            vec!["Ensure that there are no more than 4 digits before the decimal point."]
        );
        assert_eq!(
            clean_value(&price(), &json!("1234567")).unwrap_err(),
            vec!["Ensure that there are no more than 6 digits in total."]
        );
        assert_eq!(clean_value(&price(), &json!("abc")).unwrap_err(), vec!["Enter a number."]);
    }

    #[test]
    fn test_clean_dates() {
        let date = FieldSchema::new("birth_date", FieldType::DateField);
        assert_eq!(clean_value(&date, &json!("1990-05-01")).unwrap(), json!("1990-05-01"));
        assert!(clean_value(&date, &json!("01/05/1990")).is_err());

        let dt = FieldSchema::new("placed_at", FieldType::DateTimeField);
        assert_eq!(
            clean_value(&dt, &json!("2024-05-01 10:30")).unwrap(),
            json!("2024-05-01T10:30:00Z")
        );
        assert_eq!(
            clean_value(&dt, &json!("2024-05-01T10:30:00+02:00")).unwrap(),
            json!("2024-05-01T08:30:00Z")
        );
        assert!(clean_value(&dt, &json!("soon")).is_err());
    }

    #[test]
    fn test_clean_foreign_key() {
        let field = FieldSchema::new("collection", FieldType::ForeignKey)
            .foreign_key("store.collection", OnDelete::Protect);
        assert_eq!(clean_value(&field, &json!("3")).unwrap(), json!(3));
        assert!(clean_value(&field, &json!("three")).is_err());
    }

    #[test]
    fn test_clean_data_full() {
        let data = json!({"first_name": "Ann", "email": "ann@example.com", "id": 7});
        let cleaned = clean_data(&customer_meta(), data.as_object().unwrap(), &[], false).unwrap();
        assert_eq!(cleaned["membership"], "B");
        assert_eq!(cleaned["birth_date"], Value::Null);
        assert!(!cleaned.contains_key("id"));
    }

    #[test]
    fn test_clean_data_collects_errors() {
        let data = json!({"first_name": "Annabel", "nickname": "A"});
        let err = clean_data(&customer_meta(), data.as_object().unwrap(), &[], false).unwrap_err();
        assert_eq!(err.code, "invalid");
        assert_eq!(err.field_errors["email"], vec![REQUIRED]);
        assert_eq!(err.field_errors["first_name"].len(), 1);
        assert!(err.field_errors.contains_key("nickname"));
    }

    #[test]
    fn test_clean_fields_keeps_valid_values() {
        let data = json!({"first_name": "Ada", "email": "not-an-email"});
        let (cleaned, errors) = clean_fields(&customer_meta(), data.as_object().unwrap(), &[], false);
        assert_eq!(cleaned["first_name"], "Ada");
        assert_eq!(cleaned["membership"], "B");
        assert!(errors.contains_key("email"));
        assert!(!cleaned.contains_key("email"));
    }

    #[test]
    fn test_clean_data_partial() {
        let data = json!({"membership": "G"});
        let cleaned = clean_data(&customer_meta(), data.as_object().unwrap(), &[], true).unwrap();
        assert_eq!(cleaned.len(), 1);

        let readonly = vec!["membership".to_string()];
        let cleaned = clean_data(&customer_meta(), data.as_object().unwrap(), &readonly, true).unwrap();
        assert!(cleaned.is_empty());
    }

    #[test]
    fn test_validate_formset_bounds() {
        let inline = InlineAdmin::tabular("store", "orderitem", "order")
            .min_num(1)
            .max_num(Some(10));
        let err = validate_formset(&inline, 0).unwrap_err();
        assert_eq!(err.code, "min_num");
        assert_eq!(err.message, "Please submit at least 1 form.");
        assert!(validate_formset(&inline, 1).is_ok());
        assert!(validate_formset(&inline, 10).is_ok());
        let err = validate_formset(&inline, 11).unwrap_err();
        assert_eq!(err.message, "Please submit at most 10 forms.");
    }

    #[test]
    fn test_change_form_inline_rows() {
        let form: ChangeForm = serde_json::from_value(json!({
            "inlines": {"store.orderitem": [
                {"id": 4, "DELETE": true},
                {"product": 1, "quantity": 2, "unit_price": 3.5}
            ]}
        }))
        .unwrap();
        let rows = &form.inlines["store.orderitem"];
        assert!(rows[0].delete);
        assert_eq!(rows[0].id, Some(json!(4)));
        assert!(!rows[1].delete);
        assert_eq!(rows[1].data["quantity"], 2);
        assert!(form.fields.is_empty());
    }
}
