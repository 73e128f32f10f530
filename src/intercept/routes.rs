// Path-based response routing.
// An ordered table of path prefixes to extractors; first match wins.

use std::fmt;

use crate::extract::{self, Observation};

/// Pure extractor from a response body to an observation.
pub type Extractor = fn(&[u8]) -> Option<Observation>;

/// One routing entry.
#[derive(Clone, Copy)]
pub struct Route {
    pub name: &'static str,
    pub prefix: &'static str,
    pub extract: Extractor,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Ordered routing table; unmatched paths pass through.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Station index page and nearby-store map query.
    pub fn standard() -> Self {
        Self::new(vec![
            Route {
                name: "listing",
                prefix: "/front/gasstation/index",
                extract: extract::extract_listing,
            },
            Route {
                name: "nearby",
                prefix: "/map/store/near",
                extract: extract::extract_nearby,
            },
        ])
    }

    /// First route whose prefix matches `path`.
    pub fn match_path(&self, path: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|route| path.starts_with(route.prefix))
            .copied()
    }
}
