//! `adminpanel-auth` — pure client-side authorization for the admin console.
//!
//! This crate is intentionally decoupled from HTTP and storage. The server
//! remains the authority; everything here decides what the console *shows*.

pub mod catalog;
pub mod explain;
pub mod guard;
pub mod permissions;
pub mod profile;
pub mod resolver;
pub mod roles;

pub use catalog::{CatalogEntry, DASHBOARD, ModuleCatalog};
pub use explain::{ExplanationReason, PermissionExplanation};
pub use guard::{
    GuardDecision, GuardState, LOGIN_PATH, RouteGuard, RouteRequirement, UnauthorizedReason, login_redirect_path,
};
pub use permissions::{Action, ModulePermission, UnknownAction};
pub use profile::Profile;
pub use resolver::PermissionResolver;
pub use roles::{Role, SUPER_ADMIN};
