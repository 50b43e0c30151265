//! System check messages.
//!
//! Checks inspect configuration at startup and report [`CheckMessage`]s. The
//! admin site uses these to validate its registrations; the `check` command
//! prints them and fails when any are serious.

use serde::Serialize;

/// Severity level for a check message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CheckLevel {
    /// Debugging information.
    Debug = 0,
    /// Informational message.
    Info = 1,
    /// A potential problem.
    Warning = 2,
    /// A definite problem that should be fixed.
    Error = 3,
    /// A problem that prevents the application from running.
    Critical = 4,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A diagnostic produced by a system check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMessage {
    /// The severity level.
    pub level: CheckLevel,
    /// What is wrong.
    pub msg: String,
    /// How to fix it, if known.
    pub hint: Option<String>,
    /// The object the issue relates to (e.g. `"store.product"`).
    pub obj: Option<String>,
    /// Stable identifier such as `"admin.E108"`.
    pub id: Option<String>,
}

impl CheckMessage {
    /// Creates a new message.
    pub fn new(
        level: CheckLevel,
        msg: impl Into<String>,
        hint: Option<&str>,
        obj: Option<&str>,
        id: Option<&str>,
    ) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(String::from),
            obj: obj.map(String::from),
            id: id.map(String::from),
        }
    }

    /// Creates a warning-level message.
    pub fn warning(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Warning, msg, hint, obj, id)
    }

    /// Creates an error-level message.
    pub fn error(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Error, msg, hint, obj, id)
    }

    /// Returns `true` for warnings and anything more severe.
    pub fn is_serious(&self) -> bool {
        self.level >= CheckLevel::Warning
    }
}

impl std::fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref obj) = self.obj {
            write!(f, "{obj}: ")?;
        }
        if let Some(ref id) = self.id {
            write!(f, "({id}) ")?;
        }
        write!(f, "{}: {}", self.level, self.msg)?;
        if let Some(ref hint) = self.hint {
            write!(f, "\n\tHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Returns `true` if any message is an error or critical.
pub fn has_errors(messages: &[CheckMessage]) -> bool {
    messages.iter().any(|m| m.level >= CheckLevel::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_level_ordering() {
        assert!(CheckLevel::Debug < CheckLevel::Info);
        assert!(CheckLevel::Warning < CheckLevel::Error);
        assert!(CheckLevel::Error < CheckLevel::Critical);
    }

    #[test]
    fn test_check_message_display() {
        let msg = CheckMessage::error(
            "The value of 'list_editable[0]' refers to 'price', which is not contained in 'list_display'.",
            Some("Add it to list_display."),
            Some("store.product"),
            Some("admin.E122"),
        );
        let text = msg.to_string();
        assert!(text.starts_with("store.product: (admin.E122) ERROR:"));
        assert!(text.contains("HINT: Add it to list_display."));
    }

    #[test]
    fn test_is_serious_and_has_errors() {
        let warning = CheckMessage::warning("w", None, None, None);
        let error = CheckMessage::error("e", None, None, None);
        let info = CheckMessage::new(CheckLevel::Info, "i", None, None, None);
        assert!(warning.is_serious());
        assert!(!info.is_serious());
        assert!(!has_errors(&[warning.clone(), info]));
        assert!(has_errors(&[warning, error]));
    }
}
