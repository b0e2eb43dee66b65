//! Screen controllers. They hold per-screen state and talk to the session and
//! the catalog; rendering lives in [`crate::tui`].

use std::fmt::Display;

pub mod browser;
pub mod dashboard;
pub mod login;
pub mod stocks;

pub use browser::StockBrowser;
pub use dashboard::DashboardView;
pub use login::LoginView;
pub use stocks::StocksView;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Stocks,
}

impl Route {
    /// Unknown paths fall back to the login screen.
    pub fn parse(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/dashboard" => Route::Dashboard,
            "/stocks" => Route::Stocks,
            _ => Route::Login,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::Stocks => "/stocks",
        }
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Outcome of entering a protected screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    Ready,
    Redirect(Route),
}

/// A blocking acknowledgment shown to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/dashboard"), Route::Dashboard);
        assert_eq!(Route::parse("/dashboard/"), Route::Dashboard);
        assert_eq!(Route::parse("/stocks"), Route::Stocks);
        assert_eq!(Route::parse(""), Route::Login);
        assert_eq!(Route::parse("/"), Route::Login);
        assert_eq!(Route::parse("/admin/secret"), Route::Login);
    }

    #[test]
    fn test_route_path_roundtrip() {
        for route in [Route::Login, Route::Dashboard, Route::Stocks] {
            assert_eq!(Route::parse(route.path()), route);
        }
    }
}
