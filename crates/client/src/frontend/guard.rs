//! Interprets a [`GuardDecision`] as a view.

use adminpanel_auth::{GuardDecision, ModuleCatalog, RouteRequirement, login_redirect_path};
use leptos::*;
use leptos_router::*;

use crate::store::StoreSnapshot;

/// Renders `children` only when the guard allows the current profile in.
#[component]
pub fn ProtectedRoute(
    #[prop(into)] snapshot: Signal<StoreSnapshot>,
    catalog: ModuleCatalog,
    #[prop(into)] module: String,
    #[prop(optional, into)] action: Option<String>,
    children: ChildrenFn,
) -> impl IntoView {
    let location = use_location();
    let catalog = store_value(catalog);
    let requirement = match action {
        Some(action) => RouteRequirement::new(module).with_action(action),
        None => RouteRequirement::new(module),
    };

    move || {
        let pathname = location.pathname.get();
        let decision = snapshot.with(|snap| {
            catalog.with_value(|catalog| snap.guard(catalog, &requirement, &pathname))
        });

        match decision {
            GuardDecision::Loading => view! { <div class="route-loading">"Loading..."</div> }.into_view(),
            GuardDecision::RedirectLogin { from } => {
                view! { <Redirect path=login_redirect_path(&from)/> }.into_view()
            }
            GuardDecision::RedirectTo { path } => view! { <Redirect path=path/> }.into_view(),
            GuardDecision::Unauthorized(reason) => view! {
                <div class="unauthorized">
                    <h2>"Access denied"</h2>
                    <p>{reason.message()}</p>
                </div>
            }
            .into_view(),
            GuardDecision::Allow => children().into_view(),
        }
    }
}
