use std::fmt;
use std::sync::Arc;

use super::session::SessionManager;
use crate::cache::{ItemCache, UserCache};
use crate::models::{EntityId, Item};
use crate::routes::Route;

/// A navigation the router is about to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub to: Route,
    pub from: Option<Route>,
}

impl Navigation {
    pub fn to(route: Route) -> Self {
        Self {
            to: route,
            from: None,
        }
    }

    pub fn with_origin(mut self, route: Route) -> Self {
        self.from = Some(route);
        self
    }
}

/// Why a navigation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    AdminOnly,
    NotOwner,
    /// The item to edit could not be loaded.
    LoadFailed(String),
    /// The profile to show could not be loaded.
    ProfileUnavailable(String),
}

impl DenyReason {
    /// Text for the notice shown to the user.
    pub fn notice(&self) -> &'static str {
        match self {
            DenyReason::AdminOnly => "Access denied: administrators only.",
            DenyReason::NotOwner => "Access denied: you can only edit your own items.",
            DenyReason::LoadFailed(_) | DenyReason::ProfileUnavailable(_) => {
                "Access denied or the page could not be loaded."
            }
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::LoadFailed(detail) | DenyReason::ProfileUnavailable(detail) => {
                write!(f, "{} ({})", self.notice(), detail)
            }
            _ => f.write_str(self.notice()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denial {
    pub reason: DenyReason,
    pub redirect: Route,
}

/// Outcome of a guard check, consumed by the routing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(Route),
    Deny(Denial),
}

impl Decision {
    fn deny(reason: DenyReason) -> Self {
        Decision::Deny(Denial {
            reason,
            redirect: Route::Home,
        })
    }

    /// Where the router should end up for `navigation`.
    pub fn destination(&self, navigation: &Navigation) -> Route {
        match self {
            Decision::Allow => navigation.to.clone(),
            Decision::Redirect(route) => route.clone(),
            Decision::Deny(denial) => denial.redirect.clone(),
        }
    }

    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Decision::Deny(denial) => Some(denial.reason.notice()),
            _ => None,
        }
    }
}

/// Decides, before a view mounts, whether a navigation may proceed.
///
/// Checks run in a fixed order: admin privilege, sign-in pages while signed
/// in, authentication, item ownership, profile existence. Any failure while
/// resolving an entity denies access.
pub struct NavigationGuard {
    session: Arc<SessionManager>,
    items: Arc<ItemCache>,
    users: Arc<UserCache>,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionManager>, items: Arc<ItemCache>, users: Arc<UserCache>) -> Self {
        Self {
            session,
            items,
            users,
        }
    }

    pub async fn check(&self, navigation: &Navigation) -> Decision {
        // No navigation is judged against a session that has not been restored yet.
        self.session.rehydrate().await;

        let decision = self.evaluate(&navigation.to).await;
        tracing::debug!(
            to = %navigation.to,
            from = ?navigation.from.as_ref().map(Route::path),
            ?decision,
            "navigation checked"
        );
        decision
    }

    async fn evaluate(&self, to: &Route) -> Decision {
        if to.requires_admin() && !self.session.is_admin() {
            return Decision::deny(DenyReason::AdminOnly);
        }

        let authenticated = self.session.is_authenticated();

        if to.is_auth_page() && authenticated {
            return Decision::Redirect(Route::Home);
        }

        if to.requires_auth() && !authenticated {
            return Decision::Redirect(Route::Login);
        }

        match to {
            Route::EditItem { id } => self.check_ownership(id).await,
            Route::Profile { id: Some(id) } => self.check_profile(id).await,
            _ => Decision::Allow,
        }
    }

    async fn check_ownership(&self, id: &EntityId) -> Decision {
        match self.items.fetch_by_id(id).await {
            Ok(item) if self.may_edit(&item) => Decision::Allow,
            Ok(_) => Decision::deny(DenyReason::NotOwner),
            Err(failure) => Decision::deny(DenyReason::LoadFailed(failure.message)),
        }
    }

    fn may_edit(&self, item: &Item) -> bool {
        if self.session.is_admin() {
            return true;
        }
        match item.owner_id() {
            Some(owner) => self.session.is_current_user(owner),
            None => false,
        }
    }

    async fn check_profile(&self, id: &EntityId) -> Decision {
        match self.users.fetch_by_id(id).await {
            Ok(_) => Decision::Allow,
            Err(failure) => Decision::deny(DenyReason::ProfileUnavailable(failure.message)),
        }
    }
}
