//! Route table and the auth guard in front of it.
//!
//! The guard is a pure function of the requested route and the session
//! state. While the session is still resolving every guarded route is
//! `Loading`; afterwards protected routes need an identity and public
//! routes (sign-in, sign-up) need its absence.

use std::fmt;

use crate::error::Result;
use crate::session::{SessionState, SessionStore};

/// Who may see a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Only visitors without an identity; signed-in users go to the dashboard.
    Public,
    /// Only signed-in users; visitors go to sign-in.
    Protected,
}

/// Every screen of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Onboarding,
    /// `/`, which forwards to the dashboard.
    Root,
    Dashboard,
    Menus,
    Campaigns,
    LandingPages,
    Billing,
    Settings,
}

impl Route {
    pub const ALL: [Self; 10] = [
        Self::Login,
        Self::Register,
        Self::Onboarding,
        Self::Root,
        Self::Dashboard,
        Self::Menus,
        Self::Campaigns,
        Self::LandingPages,
        Self::Billing,
        Self::Settings,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Onboarding => "/onboarding",
            Self::Root => "/",
            Self::Dashboard => "/dashboard",
            Self::Menus => "/menus",
            Self::Campaigns => "/campaigns",
            Self::LandingPages => "/landing-pages",
            Self::Billing => "/billing",
            Self::Settings => "/settings",
        }
    }

    #[must_use]
    pub const fn access(self) -> RouteAccess {
        match self {
            Self::Login | Self::Register => RouteAccess::Public,
            _ => RouteAccess::Protected,
        }
    }

    /// Match a location against the route table, ignoring any query string,
    /// fragment or trailing slash. `None` for unknown paths.
    #[must_use]
    pub fn from_path(location: &str) -> Option<Self> {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Self::ALL.into_iter().find(|route| route.path() == path)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What to show for a requested route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still resolving; show a spinner.
    Loading,
    /// Show the requested screen.
    Render(Route),
    /// Replace the location with another route.
    Redirect(Route),
}

/// Decide what a known route shows for the given session.
#[must_use]
pub const fn decide(route: Route, session: &SessionState) -> GuardDecision {
    if session.is_loading {
        return GuardDecision::Loading;
    }
    let signed_in = session.identity.is_some();
    match (route.access(), signed_in) {
        (RouteAccess::Protected, false) => GuardDecision::Redirect(Route::Login),
        (RouteAccess::Public, true) => GuardDecision::Redirect(Route::Dashboard),
        _ if matches!(route, Route::Root) => GuardDecision::Redirect(Route::Dashboard),
        _ => GuardDecision::Render(route),
    }
}

/// Decide what a raw location shows. Unknown paths forward to the
/// dashboard without waiting on the session; the dashboard route is then
/// guarded on its own.
#[must_use]
pub fn resolve(location: &str, session: &SessionState) -> GuardDecision {
    Route::from_path(location).map_or(GuardDecision::Redirect(Route::Dashboard), |route| {
        decide(route, session)
    })
}

/// Route guard bound to a session.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    session: SessionStore,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(session: SessionStore) -> Self {
        Self { session }
    }

    /// Decision for the session as it is right now; may be `Loading`.
    #[must_use]
    pub fn check(&self, location: &str) -> GuardDecision {
        resolve(location, &self.session.state())
    }

    /// Decision once the session has resolved; never `Loading`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session was disposed while resolving.
    pub async fn settle(&self, location: &str) -> Result<GuardDecision> {
        let state = self.session.wait_until_resolved().await?;
        Ok(resolve(location, &state))
    }
}

// =============================================================================
// Navigation
// =============================================================================

/// One entry of the sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavItem {
    pub label: &'static str,
    pub route: Route,
}

impl NavItem {
    /// Whether this entry should be highlighted on `current`.
    #[must_use]
    pub fn is_active(&self, current: Route) -> bool {
        self.route == current
    }
}

/// Sidebar entries, top to bottom.
pub const NAVIGATION: [NavItem; 6] = [
    NavItem { label: "Dashboard", route: Route::Dashboard },
    NavItem { label: "Menus", route: Route::Menus },
    NavItem { label: "Campaigns", route: Route::Campaigns },
    NavItem { label: "Landing Pages", route: Route::LandingPages },
    NavItem { label: "Billing", route: Route::Billing },
    NavItem { label: "Settings", route: Route::Settings },
];

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use restodash_core::UserId;

    use crate::models::{Identity, UserMetadata};

    fn resolved(signed_in: bool) -> SessionState {
        let identity = signed_in.then(|| Identity {
            id: UserId::new(),
            email: "owner@example.com".into(),
            created_at: Utc::now(),
            user_metadata: UserMetadata::default(),
        });
        SessionState {
            identity,
            is_loading: false,
        }
    }

    #[test]
    fn test_loading_blocks_every_known_route() {
        let state = SessionState::default();
        for route in Route::ALL {
            assert_eq!(decide(route, &state), GuardDecision::Loading);
        }
    }

    #[test]
    fn test_protected_without_identity_goes_to_login() {
        let state = resolved(false);
        assert_eq!(
            decide(Route::Menus, &state),
            GuardDecision::Redirect(Route::Login)
        );
        assert_eq!(
            decide(Route::Onboarding, &state),
            GuardDecision::Redirect(Route::Login)
        );
        assert_eq!(decide(Route::Login, &state), GuardDecision::Render(Route::Login));
    }

    #[test]
    fn test_signed_in_sees_requested_view() {
        let state = resolved(true);
        assert_eq!(decide(Route::Billing, &state), GuardDecision::Render(Route::Billing));
        assert_eq!(
            decide(Route::Register, &state),
            GuardDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            decide(Route::Root, &state),
            GuardDecision::Redirect(Route::Dashboard)
        );
    }

    #[test]
    fn test_unknown_path_forwards_to_dashboard() {
        assert_eq!(
            resolve("/nope", &SessionState::default()),
            GuardDecision::Redirect(Route::Dashboard)
        );
        assert_eq!(
            resolve("/settings/?tab=profile", &resolved(true)),
            GuardDecision::Render(Route::Settings)
        );
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Route::from_path("/"), Some(Route::Root));
        assert_eq!(Route::from_path(""), Some(Route::Root));
        assert_eq!(Route::from_path("/landing-pages#top"), Some(Route::LandingPages));
        assert_eq!(Route::from_path("/menus/42"), None);
    }

    #[test]
    fn test_navigation_is_protected() {
        assert!(
            NAVIGATION
                .iter()
                .all(|item| item.route.access() == RouteAccess::Protected)
        );
        assert!(NAVIGATION[1].is_active(Route::Menus));
        assert!(!NAVIGATION[0].is_active(Route::Root));
    }
}
