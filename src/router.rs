//! Composable route tables.
//!
//! Handlers are grouped in small tables next to where they are defined and merged
//! into one flat, ordered table at startup:
//!
//! ```ignore
//! let mut user = Router::new();
//! let login = user.enroll_handler("/login")(get(login));
//!
//! let mut root = Router::new();
//! root.mount_router("/user", &user); // "/user/login"
//! let app = root.into_axum()?.with_state(state);
//! ```

use crate::error::RouteError;
use axum::routing::MethodRouter;
use axum::Extension;
use serde_json::Value;
use std::any::Any;
use std::collections::hash_map::{Entry, HashMap};
use std::panic::{self, AssertUnwindSafe};

/// Extra data attached to a route, available to its handler as `Extension<RouteMeta>`.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteMeta(pub Value);

#[derive(Clone, Debug)]
pub struct Route<H> {
    pub path: String,
    pub handler: H,
    pub meta: Option<Value>,
}

/// Ordered list of `(path, handler[, meta])` entries. Paths are not validated here;
/// matching is up to the web framework.
#[derive(Clone, Debug)]
pub struct Router<H> {
    routes: Vec<Route<H>>,
}

impl<H> Router<H> {
    pub fn new() -> Self {
        Router { routes: Vec::new() }
    }

    pub fn mount_handler(&mut self, path: impl Into<String>, handler: H) -> &mut Self {
        self.push(path.into(), handler, None)
    }

    pub fn mount_handler_with(
        &mut self,
        path: impl Into<String>,
        handler: H,
        meta: Value,
    ) -> &mut Self {
        self.push(path.into(), handler, Some(meta))
    }

    fn push(&mut self, path: String, handler: H, meta: Option<Value>) -> &mut Self {
        self.routes.push(Route { path, handler, meta });
        self
    }

    /// Entries in registration order.
    pub fn routes(&self) -> &[Route<H>] {
        &self.routes
    }

    pub fn into_routes(self) -> Vec<Route<H>> {
        self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H: Clone> Router<H> {
    /// Copy every entry of `other` into this table with `base_path` prepended.
    pub fn mount_router(&mut self, base_path: &str, other: &Router<H>) -> &mut Self {
        for route in &other.routes {
            self.routes.push(Route {
                path: format!("{}{}", base_path, route.path),
                handler: route.handler.clone(),
                meta: route.meta.clone(),
            });
        }
        self
    }

    /// Registration at the definition site: the returned closure mounts the handler it
    /// receives and hands it back unchanged.
    pub fn enroll_handler<'a>(&'a mut self, path: &'a str) -> impl FnOnce(H) -> H + 'a {
        move |handler| {
            self.mount_handler(path, handler.clone());
            handler
        }
    }

    pub fn enroll_handler_with<'a>(
        &'a mut self,
        path: &'a str,
        meta: Value,
    ) -> impl FnOnce(H) -> H + 'a {
        move |handler| {
            self.mount_handler_with(path, handler.clone(), meta);
            handler
        }
    }
}

impl<H> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Router<MethodRouter<S>>
where
    S: Clone + Send + Sync + 'static,
{
    /// Flatten into an axum router in table order. Entries sharing a path are merged,
    /// so each may serve its own methods; the same method twice on one path is an
    /// error, as are two paths that differ only in parameter names.
    pub fn into_axum(self) -> Result<axum::Router<S>, RouteError> {
        let mut shapes: HashMap<String, String> = HashMap::new();
        let mut app = axum::Router::new();
        for Route { path, handler, meta } in self.routes {
            if !path.starts_with('/') {
                return Err(RouteError::InvalidPath(path));
            }
            match shapes.entry(route_shape(&path)) {
                Entry::Occupied(e) if *e.get() != path => {
                    return Err(RouteError::Conflict {
                        existing: e.get().clone(),
                        path,
                    });
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(e) => {
                    e.insert(path.clone());
                }
            }
            let handler = match meta {
                Some(meta) => handler.layer(Extension(RouteMeta(meta))),
                None => handler,
            };
            tracing::debug!(path = %path, "mount route");
            // axum reports a method routed twice on one path by panicking.
            app = panic::catch_unwind(AssertUnwindSafe(|| app.route(&path, handler))).map_err(
                |payload| RouteError::Overlap {
                    path: path.clone(),
                    reason: panic_message(payload.as_ref()),
                },
            )?;
        }
        Ok(app)
    }
}

/// Path with every `:param` and `*wildcard` segment reduced to a placeholder.
fn route_shape(path: &str) -> String {
    path.split('/')
        .map(|seg| match seg.chars().next() {
            Some(':') | Some('*') => ":",
            _ => seg,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "overlapping method route".into())
}
