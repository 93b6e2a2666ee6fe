use crate::models::Role;
use crate::routes::Route;
use crate::services::auth_session::AuthSession;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(Route),
}

/// Gate for role-specific screens. Reads the session, keeps no state.
#[derive(Clone)]
pub struct RouteGuard {
    auth: Arc<AuthSession>,
}

impl RouteGuard {
    pub fn new(auth: Arc<AuthSession>) -> Self {
        Self { auth }
    }

    /// Decide whether `route` may be opened with the current session.
    pub fn check(&self, route: Route) -> GuardDecision {
        let Some(required) = route.required_role() else {
            return GuardDecision::Allow;
        };

        if !self.auth.is_authenticated() {
            return GuardDecision::Redirect(Route::Login);
        }

        match self.auth.role() {
            Some(actual) if actual == required => GuardDecision::Allow,
            Some(Role::Student) => GuardDecision::Redirect(Route::StudentDashboard),
            Some(Role::Teacher) => GuardDecision::Redirect(Route::TeacherDashboard),
            None => GuardDecision::Redirect(Route::Login),
        }
    }

    /// Apply [`RouteGuard::check`] to the navigator and return the decision.
    pub fn navigate(&self, route: Route) -> GuardDecision {
        let decision = self.check(route);
        match decision {
            GuardDecision::Allow => self.auth.navigator().navigate(route),
            GuardDecision::Redirect(target) => {
                tracing::info!(requested = %route, redirect = %target, "Navigation denied");
                self.auth.navigator().navigate(target);
            }
        }
        decision
    }
}
