//! Admin actions for bulk operations on selected rows.
//!
//! An action is registered once on the site and enabled per model through
//! [`ModelAdmin::actions`](crate::model_admin::ModelAdmin::actions). The site
//! runs it against the selected primary keys and queues its outcome message.
//! [`DeleteSelectedAction`] is available on every model.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storefront_core::{StoreError, StoreResult};

use crate::contrib::messages::MessageLevel;
use crate::site::AdminSite;

/// The result of executing an admin action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action completed successfully.
    pub success: bool,
    /// A message describing the outcome.
    pub message: String,
    /// The number of objects affected by the action.
    pub affected_count: usize,
    /// Level of the message queued for the user.
    pub level: MessageLevel,
}

impl ActionResult {
    /// Creates a successful action result.
    pub fn success(message: impl Into<String>, affected_count: usize) -> Self {
        Self {
            success: true,
            message: message.into(),
            affected_count,
            level: MessageLevel::Success,
        }
    }

    /// Creates a failed action result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            affected_count: 0,
            level: MessageLevel::Warning,
        }
    }

    /// Overrides the message level.
    #[must_use]
    pub const fn with_level(mut self, level: MessageLevel) -> Self {
        self.level = level;
        self
    }
}

/// A bulk operation on selected rows.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use storefront_admin::actions::{ActionResult, AdminAction};
/// use storefront_admin::site::AdminSite;
/// use storefront_core::StoreResult;
///
/// struct MarkPaid;
///
/// #[async_trait]
/// impl AdminAction for MarkPaid {
///     fn name(&self) -> &str { "mark_paid" }
///     fn description(&self) -> &str { "Mark selected orders as paid" }
///     async fn execute(
///         &self,
///         site: &AdminSite,
///         model_key: &str,
///         selected_ids: &[String],
///     ) -> StoreResult<ActionResult> {
///         let mut changes = serde_json::Map::new();
///         changes.insert("payment_status".into(), "C".into());
///         let n = site.db().update_objects(model_key, selected_ids, &changes).await?;
///         Ok(ActionResult::success(format!("{n} orders marked as paid."), n))
///     }
/// }
/// ```
#[async_trait]
pub trait AdminAction: Send + Sync {
    /// Returns the unique identifier for this action.
    fn name(&self) -> &str;

    /// Returns a human-readable description of what this action does.
    fn description(&self) -> &str;

    /// Executes the action on the selected objects.
    ///
    /// `selected_ids` is never empty and only holds primary keys of existing
    /// rows of `model_key`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the action fails; nothing is reported to
    /// the user as a success in that case.
    async fn execute(
        &self,
        site: &AdminSite,
        model_key: &str,
        selected_ids: &[String],
    ) -> StoreResult<ActionResult>;
}

/// Deletes the selected objects, honouring the deletion rules of every
/// foreign key that references them.
#[derive(Debug)]
pub struct DeleteSelectedAction;

#[async_trait]
impl AdminAction for DeleteSelectedAction {
    fn name(&self) -> &'static str {
        "delete_selected"
    }

    fn description(&self) -> &'static str {
        "Delete selected objects"
    }

    async fn execute(
        &self,
        site: &AdminSite,
        model_key: &str,
        selected_ids: &[String],
    ) -> StoreResult<ActionResult> {
        let meta = site.meta(model_key)?;
        let deleted = site.delete_objects(model_key, selected_ids).await?;
        let noun = if deleted == 1 {
            &meta.verbose_name
        } else {
            &meta.verbose_name_plural
        };
        Ok(ActionResult::success(
            format!("Successfully deleted {deleted} {noun}."),
            deleted,
        ))
    }
}

/// The actions available on a site.
pub struct ActionRegistry {
    actions: Vec<Box<dyn AdminAction>>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    /// Creates a registry holding `delete_selected`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DeleteSelectedAction));
        registry
    }

    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Registers an action, replacing any action with the same name.
    pub fn register(&mut self, action: Box<dyn AdminAction>) {
        self.actions.retain(|a| a.name() != action.name());
        self.actions.push(action);
    }

    /// Looks up an action by name.
    pub fn get(&self, name: &str) -> Option<&dyn AdminAction> {
        self.actions
            .iter()
            .find(|a| a.name() == name)
            .map(AsRef::as_ref)
    }

    /// Looks up an action by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such action is registered.
    pub fn require(&self, name: &str) -> StoreResult<&dyn AdminAction> {
        self.get(name)
            .ok_or_else(|| StoreError::NotFound(format!("Action '{name}' not found")))
    }

    /// Returns the names of all registered actions.
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Returns (name, description) pairs for all registered actions.
    pub fn action_descriptions(&self) -> Vec<(&str, &str)> {
        self.actions
            .iter()
            .map(|a| (a.name(), a.description()))
            .collect()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.action_names())
            .finish()
    }
}
