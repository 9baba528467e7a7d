//! Authorization explanation (audit/debug display).

use serde::Serialize;

/// Why `has_permission(module, action)` came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionExplanation {
    pub module: String,
    pub action: String,
    pub granted: bool,
    pub reason: ExplanationReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplanationReason {
    /// The role bypasses per-module checks.
    PrivilegedRole { role: String },
    Granted { role: String },
    ActionNotGranted { role: String },
    ModuleNotListed { role: String },
    UnknownAction,
    NoProfile,
}

impl ExplanationReason {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::PrivilegedRole { .. } | Self::Granted { .. })
    }
}

impl PermissionExplanation {
    /// Human-readable one-liner.
    pub fn message(&self) -> String {
        let (module, action) = (&self.module, &self.action);
        match &self.reason {
            ExplanationReason::PrivilegedRole { role } => {
                format!("role '{role}' bypasses module checks")
            }
            ExplanationReason::Granted { role } => {
                format!("role '{role}' grants '{action}' on '{module}'")
            }
            ExplanationReason::ActionNotGranted { role } => {
                format!("role '{role}' lists '{module}' but does not grant '{action}'")
            }
            ExplanationReason::ModuleNotListed { role } => {
                format!("role '{role}' has no entry for '{module}'")
            }
            ExplanationReason::UnknownAction => format!("'{action}' is not a known action"),
            ExplanationReason::NoProfile => "no administrator profile is loaded".to_string(),
        }
    }
}
