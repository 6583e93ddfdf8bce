//! # Named Routes
//!
//! Route name → action path template table, used for reverse URL generation.
//!
//! ```ignore
//! routes.insert("profile", "/user/:id")?;
//! routes.to_route("profile", [("id", 5.into()), ("tab", "x".into())])?; // "/user/5?tab=x"
//! ```

use crate::error::{Error, Result};
use crate::types::{encode_segment, placeholder_name, ParamValue};
use std::collections::HashMap;
use tracing::warn;
use url::form_urlencoded;

/// A named route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Unique route name
    pub name: String,
    /// Action path with `:name` placeholders (e.g. "/user/:id")
    pub template: String,
}

impl RouteEntry {
    /// Create a new route entry
    #[must_use]
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    /// Placeholder names in template order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.template.split('/').filter_map(placeholder_name)
    }
}

/// Table of named routes
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteEntry>,
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route name for an action path template
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateRouteName` if `name` is taken
    pub fn insert(&mut self, name: &str, template: &str) -> Result<()> {
        if self.routes.contains_key(name) {
            return Err(Error::DuplicateRouteName {
                name: name.to_string(),
            });
        }
        self.routes
            .insert(name.to_string(), RouteEntry::new(name, template));
        Ok(())
    }

    /// Check if a route name is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Look up a route by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RouteEntry> {
        self.routes.get(name)
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the table is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
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
        let entry = self.routes.get(name).ok_or_else(|| Error::RouteNotFound {
            name: name.to_string(),
        })?;
        Ok(build_url(&entry.template, params))
    }
}

/// Build a URL from an action path template
///
/// Every `:key` segment is replaced by the percent-encoded `params[key]`;
/// used keys are consumed, the remaining ones are appended as a
/// form-encoded query string in the given order. Placeholders without a value
/// are left in place.
pub fn build_url<I, K>(template: &str, params: I) -> String
where
    I: IntoIterator<Item = (K, ParamValue)>,
    K: Into<String>,
{
    let params: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.into(), v.to_string()))
        .collect();

    let mut consumed: Vec<&str> = Vec::new();
    let path = template
        .split('/')
        .map(|segment| {
            let Some(name) = placeholder_name(segment) else {
                return segment.to_string();
            };
            // last value given for a key wins
            match params.iter().rev().find(|(k, _)| k == name) {
                Some((key, value)) => {
                    consumed.push(key.as_str());
                    encode_segment(value)
                }
                None => {
                    warn!(template, placeholder = name, "Unresolved URL placeholder");
                    segment.to_string()
                }
            }
        })
        .collect::<Vec<_>>()
        .join("/");

    let mut rest = params
        .iter()
        .filter(|(k, _)| !consumed.contains(&k.as_str()))
        .peekable();

    if rest.peek().is_none() {
        return path;
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(rest.map(|(k, v)| (k.as_str(), v.as_str())))
        .finish();
    format!("{path}?{query}")
}
