use crate::models::Role;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Screens the client can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    StudentDashboard,
    TeacherDashboard,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::Login,
        Route::Register,
        Route::StudentDashboard,
        Route::TeacherDashboard,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::StudentDashboard => "/student/dashboard",
            Route::TeacherDashboard => "/teacher/dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let path = path.trim_end_matches('/');
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    /// Role a user must hold to open this route; `None` for public routes.
    pub fn required_role(&self) -> Option<Role> {
        match self {
            Route::Login | Route::Register => None,
            Route::StudentDashboard => Some(Role::Student),
            Route::TeacherDashboard => Some(Role::Teacher),
        }
    }

    pub fn is_protected(&self) -> bool {
        self.required_role().is_some()
    }

    /// Landing screen for a role; unrecognized roles go back to login.
    pub fn dashboard_for(role: Option<Role>) -> Route {
        match role {
            Some(Role::Student) => Route::StudentDashboard,
            Some(Role::Teacher) => Route::TeacherDashboard,
            None => Route::Login,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Process-wide current route, observable by the view layer.
#[derive(Clone)]
pub struct Navigator {
    current: Arc<watch::Sender<Route>>,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            current: Arc::new(tx),
        }
    }

    pub fn navigate(&self, route: Route) {
        let previous = self.current.send_replace(route);
        if previous != route {
            tracing::debug!(from = %previous, to = %route, "Navigated");
        }
    }

    pub fn current(&self) -> Route {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.current.subscribe()
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Login)
    }
}
