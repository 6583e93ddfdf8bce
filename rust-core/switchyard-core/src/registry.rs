//! # Action Registry
//!
//! Registration phase of the framework.
//!
//! A [`Registry`] collects actions, their route names and the controller
//! classes that `"Controller@method"` targets refer to. Registration is
//! all-or-nothing: a call that fails leaves the trie and the route table
//! untouched.
//!
//! [`Registry::seal`] consumes the builder into a [`SealedRegistry`]. The
//! sealed form has no mutating API, so it can be shared across request
//! workers behind an `Arc`.
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register("profile", "/user/:id", target)?;
//! let registry = Arc::new(registry.seal());
//! ```

use crate::action::{Action, ControllerFactory, Target};
use crate::config::RouteConfig;
use crate::error::{Error, Result};
use crate::params::BoundParams;
use crate::route::{build_url, RouteTable};
use crate::trie::ActionTrie;
use crate::types::ParamValue;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Mutable registration-phase registry
#[derive(Default)]
pub struct Registry {
    trie: ActionTrie,
    routes: RouteTable,
    actions: Vec<Action>,
    controllers: HashMap<String, Arc<dyn ControllerFactory>>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action under a route name
    ///
    /// Returns the new action so validators can be attached.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRouteName` or `Error::DuplicateRoute` if the
    /// name or the path is taken. Nothing is registered in that case.
    pub fn register(
        &mut self,
        route_name: &str,
        action_path: &str,
        target: Target,
    ) -> Result<&mut Action> {
        if self.routes.contains(route_name) {
            return Err(Error::DuplicateRouteName {
                name: route_name.to_string(),
            });
        }
        if self.trie.contains(action_path) {
            return Err(Error::DuplicateRoute {
                path: action_path.to_string(),
            });
        }

        let id = self.actions.len();
        self.trie.insert(action_path, id)?;
        self.routes.insert(route_name, action_path)?;

        info!(
            route = route_name,
            path = action_path,
            target = ?target,
            "Action registered"
        );
        self.actions.push(Action::new(route_name, action_path, target));
        Ok(&mut self.actions[id])
    }

    /// Make a controller class available to `"Controller@method"` targets
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTarget` if a controller with the same name exists
    pub fn register_controller(&mut self, factory: Arc<dyn ControllerFactory>) -> Result<()> {
        let name = factory.name().to_string();
        if self.controllers.contains_key(&name) {
            return Err(Error::InvalidTarget {
                target: name,
                reason: "controller already registered".to_string(),
            });
        }

        debug!(controller = %name, "Controller registered");
        self.controllers.insert(name, factory);
        Ok(())
    }

    /// Register an action whose target is written as `"Controller@method"`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTarget` for a malformed target, an unknown
    /// controller or an undeclared method, and the errors of [`Self::register`]
    pub fn register_named(
        &mut self,
        route_name: &str,
        action_path: &str,
        target: &str,
    ) -> Result<&mut Action> {
        let target = self.resolve(target)?;
        self.register(route_name, action_path, target)
    }

    /// Register every route of a configuration list, in order
    ///
    /// # Errors
    ///
    /// Stops at the first route that fails to register
    pub fn load_routes(&mut self, routes: &[RouteConfig]) -> Result<()> {
        for route in routes {
            self.register_named(&route.name, &route.path, &route.target)?;
        }
        Ok(())
    }

    /// Number of registered actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Named route table
    #[must_use]
    pub const fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Finish registration
    #[must_use]
    pub fn seal(self) -> SealedRegistry {
        info!(
            actions = self.actions.len(),
            controllers = self.controllers.len(),
            "Registry sealed"
        );
        SealedRegistry {
            trie: self.trie,
            routes: self.routes,
            actions: self.actions,
        }
    }

    fn resolve(&self, target: &str) -> Result<Target> {
        let invalid = |reason: &str| Error::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };

        let (controller, method) = target
            .split_once('@')
            .ok_or_else(|| invalid("expected \"Controller@method\""))?;
        if controller.is_empty() {
            return Err(invalid("controller is not included"));
        }

        let factory = self
            .controllers
            .get(controller)
            .ok_or_else(|| invalid("unknown controller"))?;
        Target::controller(Arc::clone(factory), method)
    }
}

/// Immutable registry shared by request workers
#[derive(Debug)]
pub struct SealedRegistry {
    trie: ActionTrie,
    routes: RouteTable,
    actions: Vec<Action>,
}

impl SealedRegistry {
    /// Resolve a request path to its action and bound values
    ///
    /// # Errors
    ///
    /// Returns `Error::ActionNotFound` if no action matches
    pub fn at(&self, path: &str) -> Result<(&Action, BoundParams)> {
        let (id, params) = self.trie.at(path)?;
        let action = self.actions.get(id).ok_or_else(|| Error::ActionNotFound {
            path: path.to_string(),
        })?;
        Ok((action, params))
    }

    /// Action registered under a route name
    #[must_use]
    pub fn action(&self, route_name: &str) -> Option<&Action> {
        self.actions.iter().find(|action| action.name() == route_name)
    }

    /// Build the URL of a named route
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` if `name` is not registered
    pub fn to_route<I, K>(&self, name: &str, params: I) -> Result<String>
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: Into<String>,
    {
        self.routes.to_route(name, params)
    }

    /// Build a URL from a literal path template
    #[must_use]
    pub fn to<I, K>(&self, template: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, ParamValue)>,
        K: Into<String>,
    {
        build_url(template, params)
    }

    /// Number of registered actions
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
