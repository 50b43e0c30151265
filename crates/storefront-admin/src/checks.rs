//! System checks for admin registrations.
//!
//! [`AdminSite::check`] validates every registered [`ModelAdmin`] against its
//! model metadata and reports problems with the conventional `admin.E*` ids.

use storefront_core::checks::CheckMessage;

use crate::meta::ModelMeta;
use crate::model_admin::{InlineAdmin, InlineRelation, ModelAdmin};
use crate::site::AdminSite;

impl AdminSite {
    /// Runs the admin checks for all registered models.
    pub fn check(&self) -> Vec<CheckMessage> {
        let mut messages = Vec::new();
        for key in self.registered_models() {
            let Some(admin) = self.get_model_admin(key) else {
                continue;
            };
            let Some(meta) = self.get_meta(key) else {
                messages.push(CheckMessage::error(
                    format!("'{key}' is registered with the admin but has no model metadata."),
                    Some("Register the model with AdminSite::register_model."),
                    Some(key),
                    Some("storefront.E001"),
                ));
                continue;
            };
            self.check_list_display(key, admin, meta, &mut messages);
            check_list_editable(key, admin, meta, &mut messages);
            check_list_filter(key, admin, meta, &mut messages);
            check_ordering(key, admin, meta, &mut messages);
            self.check_autocomplete(key, &admin.autocomplete_fields, meta, &mut messages);
            for inline in &admin.inlines {
                self.check_inline(key, inline, &mut messages);
            }
        }
        messages
    }

    fn check_list_display(
        &self,
        key: &str,
        admin: &ModelAdmin,
        meta: &ModelMeta,
        messages: &mut Vec<CheckMessage>,
    ) {
        let displays = self.displays(key);
        for (i, name) in admin.list_display.iter().enumerate() {
            let known = name == "__str__"
                || meta.field(name).is_some()
                || displays.is_some_and(|d| d.get(name).is_some())
                || admin.annotation(name).is_some();
            if !known {
                messages.push(CheckMessage::error(
                    format!(
                        "The value of 'list_display[{i}]' refers to '{name}', which is not a \
                         field or display column of '{key}'."
                    ),
                    None,
                    Some(key),
                    Some("admin.E108"),
                ));
            }
        }
        for (i, name) in admin.list_display_links.iter().enumerate() {
            if !admin.list_display.contains(name) {
                messages.push(CheckMessage::error(
                    format!(
                        "The value of 'list_display_links[{i}]' refers to '{name}', which is not \
                         defined in 'list_display'."
                    ),
                    None,
                    Some(key),
                    Some("admin.E111"),
                ));
            }
        }
    }

    fn check_autocomplete(
        &self,
        owner: &str,
        fields: &[String],
        meta: &ModelMeta,
        messages: &mut Vec<CheckMessage>,
    ) {
        for (i, name) in fields.iter().enumerate() {
            let Some(field) = meta.field(name) else {
                messages.push(CheckMessage::error(
                    format!(
                        "The value of 'autocomplete_fields[{i}]' refers to '{name}', which is not \
                         a field of '{}'.",
                        meta.model_key()
                    ),
                    None,
                    Some(owner),
                    Some("admin.E037"),
                ));
                continue;
            };
            let Some(target) = field.related_model.as_deref() else {
                messages.push(CheckMessage::error(
                    format!("The value of 'autocomplete_fields[{i}]' must be a foreign key."),
                    None,
                    Some(owner),
                    Some("admin.E038"),
                ));
                continue;
            };
            match self.get_model_admin(target) {
                None => messages.push(CheckMessage::error(
                    format!(
                        "An admin for model '{target}' has to be registered to be referenced by \
                         {owner}.autocomplete_fields."
                    ),
                    None,
                    Some(owner),
                    Some("admin.E039"),
                )),
                Some(target_admin) if target_admin.search_fields.is_empty() => {
                    messages.push(CheckMessage::error(
                        format!(
                            "The admin for '{target}' must define \"search_fields\", because it's \
                             referenced by {owner}.autocomplete_fields."
                        ),
                        None,
                        Some(owner),
                        Some("admin.E040"),
                    ));
                }
                Some(_) => {}
            }
        }
    }

    fn check_inline(&self, parent_key: &str, inline: &InlineAdmin, messages: &mut Vec<CheckMessage>) {
        let inline_key = inline.model_key();
        let owner = format!("{parent_key} inline {inline_key}");
        let Some(meta) = self.get_meta(&inline_key) else {
            messages.push(CheckMessage::error(
                format!("The inline model '{inline_key}' has no model metadata."),
                Some("Register the model with AdminSite::register_model."),
                Some(&owner),
                Some("storefront.E001"),
            ));
            return;
        };
        match &inline.relation {
            InlineRelation::ForeignKey { fk_name } => {
                let points_at_parent = meta
                    .field(fk_name)
                    .is_some_and(|f| f.related_model.as_deref() == Some(parent_key));
                if !points_at_parent {
                    messages.push(CheckMessage::error(
                        format!("'{inline_key}' has no ForeignKey to '{parent_key}'."),
                        None,
                        Some(&owner),
                        Some("admin.E202"),
                    ));
                }
            }
            InlineRelation::Generic { ct_field, fk_field } => {
                for (field, id) in [(ct_field, "admin.E302"), (fk_field, "admin.E303")] {
                    if meta.field(field).is_none() {
                        messages.push(CheckMessage::error(
                            format!("'{field}' is not a field on '{inline_key}'."),
                            None,
                            Some(&owner),
                            Some(id),
                        ));
                    }
                }
            }
        }
        self.check_autocomplete(&owner, &inline.autocomplete_fields, meta, messages);
    }
}

fn check_list_editable(
    key: &str,
    admin: &ModelAdmin,
    meta: &ModelMeta,
    messages: &mut Vec<CheckMessage>,
) {
    for (i, name) in admin.list_editable.iter().enumerate() {
        let Some(field) = meta.field(name) else {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'list_editable[{i}]' refers to '{name}', which is not a field \
                     of '{key}'."
                ),
                None,
                Some(key),
                Some("admin.E121"),
            ));
            continue;
        };
        if !admin.list_display.contains(name) {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'list_editable[{i}]' refers to '{name}', which is not contained \
                     in 'list_display'."
                ),
                Some("Add it to list_display."),
                Some(key),
                Some("admin.E122"),
            ));
        } else if admin.list_display_links.contains(name) {
            messages.push(CheckMessage::error(
                format!(
                    "The value of '{name}' cannot be in both 'list_editable' and \
                     'list_display_links'."
                ),
                None,
                Some(key),
                Some("admin.E123"),
            ));
        } else if admin.list_display.first() == Some(name) && admin.list_display_links.is_empty() {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'list_editable[{i}]' refers to the first field in \
                     'list_display' ('{name}'), which cannot be used unless \
                     'list_display_links' is set."
                ),
                None,
                Some(key),
                Some("admin.E124"),
            ));
        } else if field.read_only || admin.readonly_fields.contains(name) {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'list_editable[{i}]' refers to '{name}', which is not editable \
                     through the admin."
                ),
                None,
                Some(key),
                Some("admin.E125"),
            ));
        }
    }
}

fn check_list_filter(key: &str, admin: &ModelAdmin, meta: &ModelMeta, messages: &mut Vec<CheckMessage>) {
    for (i, name) in admin.list_filter.iter().enumerate() {
        if meta.field(name).is_none() {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'list_filter[{i}]' refers to '{name}', which does not refer to \
                     a Field."
                ),
                None,
                Some(key),
                Some("admin.E116"),
            ));
        }
    }
}

fn check_ordering(key: &str, admin: &ModelAdmin, meta: &ModelMeta, messages: &mut Vec<CheckMessage>) {
    for (i, entry) in admin.ordering.iter().enumerate() {
        let name = entry.trim_start_matches('-');
        if meta.field(name).is_none() && admin.annotation(name).is_none() {
            messages.push(CheckMessage::error(
                format!(
                    "The value of 'ordering[{i}]' refers to '{name}', which is not a field of \
                     '{key}'."
                ),
                None,
                Some(key),
                Some("admin.E033"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use storefront_core::checks::has_errors;

    use super::*;
    use crate::meta::{FieldSchema, FieldType, OnDelete};

    fn site() -> AdminSite {
        let mut site = AdminSite::new("admin");
        site.register_model(ModelMeta::new("store", "customer").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("first_name", FieldType::CharField),
        ]));
        site.register_model(ModelMeta::new("store", "order").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("customer", FieldType::ForeignKey)
                .foreign_key("store.customer", OnDelete::Protect),
        ]));
        site.register_model(ModelMeta::new("store", "orderitem").fields(vec![
            FieldSchema::auto_id(),
            FieldSchema::new("order", FieldType::ForeignKey)
                .foreign_key("store.order", OnDelete::Cascade),
        ]));
        site
    }

    fn ids(messages: &[CheckMessage]) -> Vec<&str> {
        messages.iter().filter_map(|m| m.id.as_deref()).collect()
    }

    #[test]
    fn test_valid_configuration_passes() {
        let mut site = site();
        site.register(ModelAdmin::new("store", "customer").search_fields(vec!["first_name"]));
        site.register(
            ModelAdmin::new("store", "order")
                .list_display(vec!["id", "customer"])
                .autocomplete_fields(vec!["customer"])
                .inlines(vec![InlineAdmin::tabular("store", "orderitem", "order")]),
        );
        let messages = site.check();
        assert!(messages.is_empty(), "{messages:?}");
        assert!(!has_errors(&messages));
    }

    #[test]
    fn test_list_display_and_filter_errors() {
        let mut site = site();
        site.register(
            ModelAdmin::new("store", "customer")
                .list_display(vec!["first_name", "nickname"])
                .list_filter(vec!["membership"])
                .ordering(vec!["-last_name"]),
        );
        assert_eq!(ids(&site.check()), vec!["admin.E108", "admin.E116", "admin.E033"]);
    }

    #[test]
    fn test_list_editable_errors() {
        let mut site = site();
        site.register(
            ModelAdmin::new("store", "customer")
                .list_display(vec!["first_name"])
                .list_editable(vec!["first_name", "email"]),
        );
        assert_eq!(ids(&site.check()), vec!["admin.E124", "admin.E121"]);

        site.register(
            ModelAdmin::new("store", "customer")
                .list_display(vec!["id"])
                .list_editable(vec!["first_name"]),
        );
        assert_eq!(ids(&site.check()), vec!["admin.E122"]);
    }

    #[test]
    fn test_autocomplete_errors() {
        let mut site = site();
        site.register(ModelAdmin::new("store", "order").autocomplete_fields(vec!["customer"]));
        assert_eq!(ids(&site.check()), vec!["admin.E039"]);

        site.register(ModelAdmin::new("store", "customer"));
        assert_eq!(ids(&site.check()), vec!["admin.E040"]);
    }

    #[test]
    fn test_inline_without_foreign_key() {
        let mut site = site();
        site.register(
            ModelAdmin::new("store", "customer")
                .inlines(vec![InlineAdmin::tabular("store", "orderitem", "order")]),
        );
        let messages = site.check();
        assert_eq!(ids(&messages), vec!["admin.E202"]);
        assert!(messages[0].msg.contains("store.customer"));
    }

    #[test]
    fn test_missing_metadata() {
        let mut site = AdminSite::new("admin");
        site.register(ModelAdmin::new("store", "ghost"));
        assert_eq!(ids(&site.check()), vec!["storefront.E001"]);
    }
}
