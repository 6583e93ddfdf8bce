//! # Parameter Binding
//!
//! Turns bound path values into the positional argument list of an action
//! target.
//!
//! Targets declare their parameters up front with a [`Signature`]; nothing is
//! inspected at runtime. For each declared parameter, in order:
//!
//! 1. a request parameter receives the current [`Request`]
//! 2. otherwise a bound value with the same name is converted to the declared type
//! 3. otherwise the declared default is used
//! 4. otherwise binding fails with `Error::MissingParameter`
//!
//! ```ignore
//! let signature = Signature::new()
//!     .param("name", ParamType::String)
//!     .param_with_default("age", ParamType::Int, 18);
//! ```

use crate::error::{Error, Result};
use crate::params::BoundParams;
use crate::request::Request;
use crate::types::{convert_param, ParamType, ParamValue};

/// How a declared parameter is filled
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Receives the current request
    Request,
    /// Receives a bound value converted to the given type
    Value(ParamType),
}

/// One declared parameter of a target
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Parameter name, matched against placeholder names
    pub name: String,
    /// Request injection or typed value
    pub kind: ParamKind,
    /// Value used when nothing is bound under `name`
    pub default: Option<ParamValue>,
}

/// Declared parameter list of a closure or controller method
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<ParamDescriptor>,
}

impl Signature {
    /// Create an empty signature (target takes no arguments)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required typed parameter
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, param_type: ParamType) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            kind: ParamKind::Value(param_type),
            default: None,
        });
        self
    }

    /// Add a typed parameter with a default value
    #[must_use]
    pub fn param_with_default(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        default: impl Into<ParamValue>,
    ) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            kind: ParamKind::Value(param_type),
            default: Some(default.into()),
        });
        self
    }

    /// Add a parameter receiving the current request
    #[must_use]
    pub fn request(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            kind: ParamKind::Request,
            default: None,
        });
        self
    }

    /// Declared parameters in order
    #[must_use]
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Number of declared parameters
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the target takes no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// One bound argument
#[derive(Debug, Clone)]
pub enum Arg<'r> {
    /// The current request
    Request(&'r Request),
    /// A bound or default value
    Value(ParamValue),
}

/// Positional argument list handed to a target
#[derive(Debug, Clone, Default)]
pub struct Args<'r> {
    values: Vec<Arg<'r>>,
}

impl<'r> Args<'r> {
    /// Number of arguments
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no arguments
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Argument at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Arg<'r>> {
        self.values.get(index)
    }

    /// All arguments in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arg<'r>> {
        self.values.iter()
    }

    /// Value argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` if the argument is missing or a request
    pub fn value(&self, index: usize) -> Result<&ParamValue> {
        if let Some(Arg::Value(value)) = self.values.get(index) {
            return Ok(value);
        }
        Err(Error::ArgumentType {
            index,
            expected: "a value",
        })
    }

    /// Request argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` if the argument is missing or a value
    pub fn request(&self, index: usize) -> Result<&'r Request> {
        if let Some(Arg::Request(request)) = self.values.get(index) {
            return Ok(*request);
        }
        Err(Error::ArgumentType {
            index,
            expected: "the request",
        })
    }

    /// String argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` on a kind mismatch
    pub fn string(&self, index: usize) -> Result<&str> {
        self.value(index)?
            .as_str()
            .ok_or_else(|| Self::mismatch(index, ParamType::String))
    }

    /// Integer argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` on a kind mismatch
    pub fn int(&self, index: usize) -> Result<i64> {
        self.value(index)?
            .as_int()
            .ok_or_else(|| Self::mismatch(index, ParamType::Int))
    }

    /// Float argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` on a kind mismatch
    pub fn float(&self, index: usize) -> Result<f64> {
        self.value(index)?
            .as_float()
            .ok_or_else(|| Self::mismatch(index, ParamType::Float))
    }

    /// Boolean argument at `index`
    ///
    /// # Errors
    ///
    /// Returns `Error::ArgumentType` on a kind mismatch
    pub fn bool(&self, index: usize) -> Result<bool> {
        self.value(index)?
            .as_bool()
            .ok_or_else(|| Self::mismatch(index, ParamType::Bool))
    }

    const fn mismatch(index: usize, param_type: ParamType) -> Error {
        Error::ArgumentType {
            index,
            expected: param_type.type_name(),
        }
    }
}

/// Bind a target's declared parameters
///
/// Used identically for closures and controller methods.
///
/// # Errors
///
/// Returns `Error::MissingParameter` for a parameter with neither a bound
/// value nor a default, `Error::InvalidParameter` if a bound value does not
/// convert to the declared type
pub fn bind<'r>(
    signature: &Signature,
    params: &BoundParams,
    request: &'r Request,
) -> Result<Args<'r>> {
    let mut values = Vec::with_capacity(signature.len());

    for descriptor in signature.params() {
        let ParamKind::Value(param_type) = descriptor.kind else {
            values.push(Arg::Request(request));
            continue;
        };

        let value = match (params.get(&descriptor.name), &descriptor.default) {
            (Some(raw), _) => convert_param(&descriptor.name, raw, param_type)?,
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(Error::MissingParameter {
                    name: descriptor.name.clone(),
                })
            }
        };
        values.push(Arg::Value(value));
    }

    Ok(Args { values })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Signature {
        Signature::new()
            .param("name", ParamType::String)
            .param_with_default("age", ParamType::Int, 18)
    }

    #[test]
    fn test_bind_value_and_default() {
        let request = Request::get("/person/Ann");
        let params = BoundParams::from([("name", "Ann")]);

        let args = bind(&person(), &params, &request).unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args.string(0).unwrap(), "Ann");
        assert_eq!(args.int(1).unwrap(), 18);
    }

    #[test]
    fn test_bound_value_beats_default() {
        let request = Request::get("/");
        let params: BoundParams = [("name", "Ann"), ("age", "31")].into_iter().collect();

        let args = bind(&person(), &params, &request).unwrap();
        assert_eq!(args.int(1).unwrap(), 31);
    }

    #[test]
    fn test_missing_parameter() {
        let request = Request::get("/");
        let err = bind(&person(), &BoundParams::new(), &request).unwrap_err();
        let Error::MissingParameter { name } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(name, "name");
    }

    #[test]
    fn test_invalid_parameter() {
        let request = Request::get("/");
        let params: BoundParams = [("name", "Ann"), ("age", "old")].into_iter().collect();
        let err = bind(&person(), &params, &request).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_request_injection() {
        let request = Request::get("/user/7?tab=info");
        let signature = Signature::new()
            .param("id", ParamType::Int)
            .request("request");
        let params = BoundParams::from([("id", "7")]);

        let args = bind(&signature, &params, &request).unwrap();
        assert_eq!(args.int(0).unwrap(), 7);
        assert_eq!(args.request(1).unwrap().param("tab"), Some("info"));
    }

    #[test]
    fn test_request_param_ignores_bound_name() {
        let request = Request::get("/");
        let signature = Signature::new().request("request");
        let params = BoundParams::from([("request", "x")]);

        let args = bind(&signature, &params, &request).unwrap();
        assert!(matches!(args.get(0), Some(Arg::Request(_))));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let request = Request::get("/");
        let params = BoundParams::from([("name", "Ann")]);
        let args = bind(&person(), &params, &request).unwrap();

        assert!(matches!(args.int(0), Err(Error::ArgumentType { index: 0, .. })));
        assert!(args.request(0).is_err());
        assert!(args.value(5).is_err());
    }

    #[test]
    fn test_unused_bound_values_are_ignored() {
        let request = Request::get("/");
        let params = BoundParams::from([("extra", "1")]);
        let args = bind(&Signature::new(), &params, &request).unwrap();
        assert!(args.is_empty());
    }
}
