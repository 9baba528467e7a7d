//! Route gating for protected pages.
//!
//! The guard is a pure decision: it maps the current profile state and a
//! route's requirement to a [`GuardDecision`]. Rendering and navigation are
//! left to whichever UI adapter interprets the decision.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;

use crate::catalog::DASHBOARD;
use crate::permissions::Action;
use crate::resolver::PermissionResolver;

/// Route the guard sends unauthenticated visitors to.
pub const LOGIN_PATH: &str = "/login";

/// Bytes escaped in the `from` query value. Path separators stay readable.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Login URL that returns to `from` after signing in.
pub fn login_redirect_path(from: &str) -> String {
    format!("{LOGIN_PATH}?from={}", utf8_percent_encode(from, QUERY_VALUE))
}

/// What a protected route requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    pub module: String,
    pub action: String,
}

impl RouteRequirement {
    /// Require `view` on `module`.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            action: Action::View.as_str().to_string(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }
}

/// Why a route was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnauthorizedReason {
    /// The administrator cannot view any page in the catalog.
    NoAccessiblePages,
    /// The required action is not granted on this module.
    Forbidden { module: String, action: String },
}

impl UnauthorizedReason {
    pub fn message(&self) -> String {
        match self {
            Self::NoAccessiblePages => {
                "You do not have access to any page. Contact an administrator to be granted permissions."
                    .to_string()
            }
            Self::Forbidden { .. } => "You do not have permission to access this page.".to_string(),
        }
    }
}

/// Outcome of guarding a single render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Profile is still loading; show a placeholder.
    Loading,
    /// No profile; go to [`LOGIN_PATH`], returning to `from` afterwards.
    RedirectLogin { from: String },
    /// Send the administrator somewhere they can actually see.
    RedirectTo { path: String },
    Unauthorized(UnauthorizedReason),
    Allow,
}

impl GuardDecision {
    /// Where a redirecting decision navigates to, with any query escaped.
    pub fn redirect_target(&self) -> Option<String> {
        match self {
            Self::RedirectLogin { from } => Some(login_redirect_path(from)),
            Self::RedirectTo { path } => Some(path.clone()),
            _ => None,
        }
    }
}

/// Inputs captured at render time.
#[derive(Debug, Clone, Copy)]
pub struct GuardState<'a> {
    pub is_loading: bool,
    pub resolver: PermissionResolver<'a>,
    /// Location the visitor attempted to open.
    pub location: &'a str,
}

/// Guard for one protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteGuard {
    requirement: RouteRequirement,
}

impl RouteGuard {
    pub fn new(requirement: RouteRequirement) -> Self {
        Self { requirement }
    }

    pub fn requirement(&self) -> &RouteRequirement {
        &self.requirement
    }

    /// Decide what this render shows.
    ///
    /// Order: loading, unauthenticated, dashboard fallback, permission check.
    /// The dashboard fallback runs before the permission check because it can
    /// redirect past what would otherwise be an unauthorized outcome.
    pub fn decide(&self, state: &GuardState<'_>) -> GuardDecision {
        if state.is_loading {
            return GuardDecision::Loading;
        }

        let resolver = &state.resolver;
        if resolver.profile().is_none() {
            tracing::debug!(location = state.location, "no profile; redirecting to login");
            return GuardDecision::RedirectLogin {
                from: state.location.to_string(),
            };
        }

        let RouteRequirement { module, action } = &self.requirement;

        if module == DASHBOARD && !resolver.can_access_module(DASHBOARD) {
            return match resolver.first_accessible_page() {
                Some(entry) if !entry.is_root() => {
                    tracing::debug!(path = %entry.path, "dashboard not viewable; redirecting");
                    GuardDecision::RedirectTo {
                        path: entry.path.clone(),
                    }
                }
                _ => GuardDecision::Unauthorized(UnauthorizedReason::NoAccessiblePages),
            };
        }

        if resolver.has_permission(module, action) {
            GuardDecision::Allow
        } else {
            tracing::debug!(%module, %action, "route refused");
            GuardDecision::Unauthorized(UnauthorizedReason::Forbidden {
                module: module.clone(),
                action: action.clone(),
            })
        }
    }
}
