use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation within a module, each independently grantable.
///
/// The wire names are the camelCase flags carried by [`ModulePermission`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    StatusChange,
    DriverAssign,
    PaidStatusChange,
    AttendanceChange,
    UserCreditChange,
    ViewDetails,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::View,
        Action::Create,
        Action::Edit,
        Action::Delete,
        Action::StatusChange,
        Action::DriverAssign,
        Action::PaidStatusChange,
        Action::AttendanceChange,
        Action::UserCreditChange,
        Action::ViewDetails,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::StatusChange => "statusChange",
            Action::DriverAssign => "driverAssign",
            Action::PaidStatusChange => "paidStatusChange",
            Action::AttendanceChange => "attendanceChange",
            Action::UserCreditChange => "userCreditChange",
            Action::ViewDetails => "viewDetails",
        }
    }

    /// Parse a wire action name; `None` for anything unrecognized.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Grants for a single module within a role.
///
/// Flags missing from the payload deserialize to `false` (default-deny).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModulePermission {
    pub accessible_module: String,
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub status_change: bool,
    pub driver_assign: bool,
    pub paid_status_change: bool,
    pub attendance_change: bool,
    pub user_credit_change: bool,
    pub view_details: bool,
}

impl ModulePermission {
    /// Entry for `module` with every flag cleared.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            accessible_module: module.into(),
            ..Default::default()
        }
    }

    pub fn with_view(mut self, granted: bool) -> Self {
        self.view = granted;
        self
    }

    /// Set the flag for `action`.
    pub fn with(mut self, action: Action, granted: bool) -> Self {
        *self.flag_mut(action) = granted;
        self
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => self.view,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
            Action::StatusChange => self.status_change,
            Action::DriverAssign => self.driver_assign,
            Action::PaidStatusChange => self.paid_status_change,
            Action::AttendanceChange => self.attendance_change,
            Action::UserCreditChange => self.user_credit_change,
            Action::ViewDetails => self.view_details,
        }
    }

    fn flag_mut(&mut self, action: Action) -> &mut bool {
        match action {
            Action::View => &mut self.view,
            Action::Create => &mut self.create,
            Action::Edit => &mut self.edit,
            Action::Delete => &mut self.delete,
            Action::StatusChange => &mut self.status_change,
            Action::DriverAssign => &mut self.driver_assign,
            Action::PaidStatusChange => &mut self.paid_status_change,
            Action::AttendanceChange => &mut self.attendance_change,
            Action::UserCreditChange => &mut self.user_credit_change,
            Action::ViewDetails => &mut self.view_details,
        }
    }
}
