use axum::http::Method;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Health,
    Register,
    Login,
    Me,
    UserById,
}

impl Route {
    pub const ALL: [Route; 5] = [Route::Health, Route::Register, Route::Login, Route::Me, Route::UserById];

    /// Map a request line onto a known route. Unknown paths return None.
    pub fn classify(method: &Method, path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let get = *method == Method::GET;
        let post = *method == Method::POST;
        match segments.as_slice() {
            [] if get => Some(Route::Health),
            ["account", "register"] if post => Some(Route::Register),
            ["account", "login"] if post => Some(Route::Login),
            ["account", "me"] if get => Some(Route::Me),
            ["account", "users", _id] if get => Some(Route::UserById),
            _ => None,
        }
    }
}

/// Route -> whether an authenticated principal is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutePolicy;

impl RoutePolicy {
    pub fn requires_auth(&self, route: Route) -> bool {
        match route {
            Route::Health | Route::Register | Route::Login => false,
            Route::Me | Route::UserById => true,
        }
    }

    /// Unknown routes are public; the router answers them with 404.
    pub fn requires_auth_for(&self, method: &Method, path: &str) -> bool {
        Route::classify(method, path).map(|r| self.requires_auth(r)).unwrap_or(false)
    }
}
