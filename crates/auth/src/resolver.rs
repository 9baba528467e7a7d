//! Capability resolution for the signed-in administrator.

use crate::catalog::{CatalogEntry, ModuleCatalog};
use crate::explain::{ExplanationReason, PermissionExplanation};
use crate::permissions::Action;
use crate::profile::Profile;

/// Answers "may the current administrator do X in module Y?".
///
/// - No IO
/// - No caching of its own (cheap to rebuild per render)
/// - Unknown modules and actions resolve to `false` (default-deny)
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'a> {
    profile: Option<&'a Profile>,
    catalog: &'a ModuleCatalog,
}

impl<'a> PermissionResolver<'a> {
    pub fn new(profile: Option<&'a Profile>, catalog: &'a ModuleCatalog) -> Self {
        Self { profile, catalog }
    }

    pub fn profile(&self) -> Option<&'a Profile> {
        self.profile
    }

    pub fn catalog(&self) -> &'a ModuleCatalog {
        self.catalog
    }

    pub fn is_super_admin(&self) -> bool {
        self.profile.is_some_and(|p| p.role.is_super_admin())
    }

    /// Core check by wire action name (`"view"`, `"statusChange"`, ...).
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        if self.is_super_admin() {
            return true;
        }
        match Action::parse(action) {
            Some(action) => self.allows(module, action),
            None => false,
        }
    }

    /// Typed variant of [`has_permission`](Self::has_permission).
    pub fn allows(&self, module: &str, action: Action) -> bool {
        let Some(profile) = self.profile else {
            return false;
        };
        if profile.role.is_super_admin() {
            return true;
        }
        profile
            .role
            .permission_for(module)
            .is_some_and(|p| p.allows(action))
    }

    pub fn can_access_module(&self, module: &str) -> bool {
        self.has_permission(module, Action::View.as_str())
    }

    pub fn can_create(&self, module: &str) -> bool {
        self.has_permission(module, Action::Create.as_str())
    }

    pub fn can_edit(&self, module: &str) -> bool {
        self.has_permission(module, Action::Edit.as_str())
    }

    pub fn can_delete(&self, module: &str) -> bool {
        self.has_permission(module, Action::Delete.as_str())
    }

    pub fn can_change_status(&self, module: &str) -> bool {
        self.has_permission(module, Action::StatusChange.as_str())
    }

    pub fn can_assign_driver(&self, module: &str) -> bool {
        self.has_permission(module, Action::DriverAssign.as_str())
    }

    pub fn can_change_paid_status(&self, module: &str) -> bool {
        self.has_permission(module, Action::PaidStatusChange.as_str())
    }

    pub fn can_change_attendance(&self, module: &str) -> bool {
        self.has_permission(module, Action::AttendanceChange.as_str())
    }

    pub fn can_change_user_credit(&self, module: &str) -> bool {
        self.has_permission(module, Action::UserCreditChange.as_str())
    }

    pub fn can_view_details(&self, module: &str) -> bool {
        self.has_permission(module, Action::ViewDetails.as_str())
    }

    /// Catalog entries the administrator can view, in catalog order.
    pub fn accessible_pages(&self) -> impl Iterator<Item = &'a CatalogEntry> + '_ {
        self.catalog
            .iter()
            .filter(move |entry| self.can_access_module(&entry.module))
    }

    /// Highest-priority catalog entry the administrator can view.
    pub fn first_accessible_page(&self) -> Option<&'a CatalogEntry> {
        self.accessible_pages().next()
    }

    pub fn has_any_access(&self) -> bool {
        self.first_accessible_page().is_some()
    }

    /// Explain the outcome of `has_permission(module, action)`.
    pub fn explain(&self, module: &str, action: &str) -> PermissionExplanation {
        let reason = match self.profile {
            None => ExplanationReason::NoProfile,
            Some(p) if p.role.is_super_admin() => ExplanationReason::PrivilegedRole {
                role: p.role.name.clone(),
            },
            Some(p) => match (Action::parse(action), p.role.permission_for(module)) {
                (None, _) => ExplanationReason::UnknownAction,
                (Some(_), None) => ExplanationReason::ModuleNotListed {
                    role: p.role.name.clone(),
                },
                (Some(a), Some(entry)) if entry.allows(a) => ExplanationReason::Granted {
                    role: p.role.name.clone(),
                },
                (Some(_), Some(_)) => ExplanationReason::ActionNotGranted {
                    role: p.role.name.clone(),
                },
            },
        };

        PermissionExplanation {
            module: module.to_string(),
            action: action.to_string(),
            granted: reason.is_granted(),
            reason,
        }
    }
}
