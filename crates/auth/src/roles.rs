use serde::{Deserialize, Serialize};

use crate::permissions::ModulePermission;

/// Role name that bypasses every per-module check.
pub const SUPER_ADMIN: &str = "Super Admin";

/// Role assigned to an administrator, with its per-module grants.
///
/// Both fields default when missing so a truncated payload degrades to a
/// role that grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub permissions: Vec<ModulePermission>,
}

impl Role {
    pub fn new(name: impl Into<String>, permissions: Vec<ModulePermission>) -> Self {
        Self {
            name: name.into(),
            permissions,
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.name == SUPER_ADMIN
    }

    /// Grant entry for `module`. Duplicate entries are a malformed list; the
    /// first one wins.
    pub fn permission_for(&self, module: &str) -> Option<&ModulePermission> {
        self.permissions
            .iter()
            .find(|p| p.accessible_module == module)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_duplicate_entry_wins() {
        let role = Role::new(
            "Ops",
            vec![
                ModulePermission::new("credits").with_view(true),
                ModulePermission::new("credits").with_view(false),
            ],
        );
        assert!(role.permission_for("credits").unwrap().view);
    }

    #[test]
    fn super_admin_is_exact_match() {
        assert!(Role::new(SUPER_ADMIN, vec![]).is_super_admin());
        assert!(!Role::new("super admin", vec![]).is_super_admin());
    }
}
