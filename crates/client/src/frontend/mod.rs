//! Leptos adapter for the route guard.

pub mod guard;

pub use guard::ProtectedRoute;
