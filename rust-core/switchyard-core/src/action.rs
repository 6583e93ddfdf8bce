//! # Actions
//!
//! An action is a registered endpoint: a name, a target and the validators run
//! before the target.
//!
//! Targets come in two kinds:
//!
//! - [`ClosureTarget`]: a function called with the bound [`Args`]
//! - [`ControllerTarget`]: a controller method; a fresh controller is built by
//!   its [`ControllerFactory`] for every request, wrapped in
//!   `before_action` / `after_action` hooks
//!
//! Both declare their parameters with a [`Signature`] and go through the same
//! [`bind`] step.

use crate::binder::{bind, Args, Signature};
use crate::error::{Error, Result};
use crate::params::BoundParams;
use crate::request::Request;
use crate::response::Response;
use crate::validation::{Validator, ValidatorChain};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of a target's own logic
pub type HandlerResult = anyhow::Result<Response>;

/// Something that can be invoked with bound path values
pub trait Invoke: Send + Sync {
    /// Bind `params` against the target's signature and run it
    ///
    /// # Errors
    ///
    /// Binding errors (`MissingParameter`, `InvalidParameter`) and
    /// `Error::Handler` for errors raised by the target itself
    fn invoke(&self, request: &Request, params: &BoundParams) -> Result<Response>;
}

type ClosureFn = dyn for<'r> Fn(Args<'r>) -> HandlerResult + Send + Sync;

/// Function target
#[derive(Clone)]
pub struct ClosureTarget {
    signature: Signature,
    handler: Arc<ClosureFn>,
}

impl ClosureTarget {
    /// Create a closure target with its declared parameters
    pub fn new<F>(signature: Signature, handler: F) -> Self
    where
        F: for<'r> Fn(Args<'r>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            signature,
            handler: Arc::new(handler),
        }
    }

    /// Declared parameters
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl Invoke for ClosureTarget {
    fn invoke(&self, request: &Request, params: &BoundParams) -> Result<Response> {
        let args = bind(&self.signature, params, request)?;
        (self.handler)(args).map_err(Error::Handler)
    }
}

/// A controller instance, created fresh for each request
pub trait Controller {
    /// Called before the action method with the current request
    fn before_action(&mut self, _method: &str, _request: &Request) {}

    /// Called after the action method, also when it failed or panicked
    fn after_action(&mut self, _method: &str) {}

    /// Run the named action method with its bound arguments
    ///
    /// # Errors
    ///
    /// Any error raised by the method's own logic
    fn call(&mut self, method: &str, args: Args<'_>) -> HandlerResult;
}

/// Builds controllers and describes their action methods
pub trait ControllerFactory: Send + Sync {
    /// Controller name used in `Controller@method` targets and logs
    fn name(&self) -> &str;

    /// Create a new controller instance
    fn create(&self) -> Box<dyn Controller>;

    /// Declared parameters of `method`, `None` if the controller has no such method
    fn signature(&self, method: &str) -> Option<&Signature>;
}

type MakeController<C> = dyn Fn() -> C + Send + Sync;

/// [`ControllerFactory`] built from a constructor and a method table
///
/// ```ignore
/// let users = ControllerClass::new("UserController", UserController::default)
///     .method("show", Signature::new().param("id", ParamType::Int));
/// ```
pub struct ControllerClass<C> {
    name: String,
    make: Box<MakeController<C>>,
    methods: HashMap<String, Signature>,
}

impl<C: Controller + 'static> ControllerClass<C> {
    /// Create a factory calling `make` for each request
    pub fn new<F>(name: impl Into<String>, make: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            make: Box::new(make),
            methods: HashMap::new(),
        }
    }

    /// Declare an action method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, signature: Signature) -> Self {
        self.methods.insert(name.into(), signature);
        self
    }
}

impl<C: Controller + 'static> ControllerFactory for ControllerClass<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self) -> Box<dyn Controller> {
        Box::new((self.make)())
    }

    fn signature(&self, method: &str) -> Option<&Signature> {
        self.methods.get(method)
    }
}

/// Runs `after_action` when dropped
struct AfterAction<'a> {
    controller: Box<dyn Controller>,
    method: &'a str,
}

impl Drop for AfterAction<'_> {
    fn drop(&mut self) {
        self.controller.after_action(self.method);
    }
}

/// Controller method target
#[derive(Clone)]
pub struct ControllerTarget {
    factory: Arc<dyn ControllerFactory>,
    method: String,
    signature: Signature,
}

impl ControllerTarget {
    /// Resolve `method` on the controller built by `factory`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTarget` if `method` is empty or not declared
    pub fn new(factory: Arc<dyn ControllerFactory>, method: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidTarget {
            target: format!("{}@{method}", factory.name()),
            reason: reason.to_string(),
        };

        if method.is_empty() {
            return Err(invalid("method not included"));
        }
        let signature = factory
            .signature(method)
            .cloned()
            .ok_or_else(|| invalid("controller has no such method"))?;

        Ok(Self {
            method: method.to_string(),
            signature,
            factory,
        })
    }

    /// Controller method name
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Declared parameters of the method
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }
}

impl Invoke for ControllerTarget {
    fn invoke(&self, request: &Request, params: &BoundParams) -> Result<Response> {
        let mut controller = self.factory.create();
        debug!(controller = self.factory.name(), method = %self.method, "Controller created");

        controller.before_action(&self.method, request);
        let mut guard = AfterAction {
            controller,
            method: &self.method,
        };

        let args = bind(&self.signature, params, request)?;
        guard
            .controller
            .call(&self.method, args)
            .map_err(Error::Handler)
    }
}

/// Executable part of an action
#[derive(Clone)]
pub enum Target {
    /// Function target
    Closure(ClosureTarget),
    /// Controller method target
    Controller(ControllerTarget),
}

impl Target {
    /// Function target with declared parameters
    pub fn closure<F>(signature: Signature, handler: F) -> Self
    where
        F: for<'r> Fn(Args<'r>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Closure(ClosureTarget::new(signature, handler))
    }

    /// Controller method target
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidTarget` if the method is missing or undeclared
    pub fn controller(factory: Arc<dyn ControllerFactory>, method: &str) -> Result<Self> {
        ControllerTarget::new(factory, method).map(Self::Controller)
    }

    /// Declared parameters of the target
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        match self {
            Self::Closure(target) => target.signature(),
            Self::Controller(target) => target.signature(),
        }
    }
}

impl Invoke for Target {
    fn invoke(&self, request: &Request, params: &BoundParams) -> Result<Response> {
        match self {
            Self::Closure(target) => target.invoke(request, params),
            Self::Controller(target) => target.invoke(request, params),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closure(_) => f.write_str("Closure"),
            Self::Controller(target) => {
                write!(f, "{}@{}", target.factory.name(), target.method)
            }
        }
    }
}

/// A registered endpoint
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    path: String,
    target: Target,
    validators: ValidatorChain,
}

impl Action {
    /// Create an action (registration goes through the registry)
    pub(crate) fn new(name: impl Into<String>, path: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            target,
            validators: ValidatorChain::new(),
        }
    }

    /// Action name (the route name it was registered under)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action path template
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Action target
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// Attached validators
    #[must_use]
    pub const fn validators(&self) -> &ValidatorChain {
        &self.validators
    }

    /// Append a validator
    pub fn with_validator<V: Validator + 'static>(&mut self, validator: V) -> &mut Self {
        self.validators.add(validator);
        self
    }

    /// Append a shared validator
    pub fn with_shared_validator(&mut self, validator: Arc<dyn Validator>) -> &mut Self {
        self.validators.add_shared(validator);
        self
    }

    /// Validate, merge the bound values into the request, invoke the target
    ///
    /// A rejected validation returns the validator's response without
    /// invoking the target.
    ///
    /// # Errors
    ///
    /// Binding errors and `Error::Handler` from the target
    pub fn execute(&self, request: &mut Request, params: &BoundParams) -> Result<Response> {
        if let Err(failed) = self.validators.validate(params) {
            warn!(
                action = %self.name,
                errors = failed.errors.len(),
                "Validation failed"
            );
            return Ok(failed.response);
        }

        request.merge_params(params);
        self.target.invoke(request, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamType;
    use crate::validation::{ValidationErrors, ValidationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn greet() -> Target {
        Target::closure(
            Signature::new()
                .param("name", ParamType::String)
                .param_with_default("age", ParamType::Int, 18),
            |args| {
                Ok(Response::text(format!(
                    "{} is {}",
                    args.string(0)?,
                    args.int(1)?
                )))
            },
        )
    }

    #[test]
    fn test_closure_target() {
        let request = Request::get("/greet/Ann");
        let params = BoundParams::from([("name", "Ann")]);
        let response = greet().invoke(&request, &params).unwrap();
        assert_eq!(response.body_str(), Some("Ann is 18"));
    }

    #[test]
    fn test_closure_target_missing_parameter() {
        let request = Request::get("/greet");
        let err = greet().invoke(&request, &BoundParams::new()).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));
    }

    #[test]
    fn test_closure_target_handler_error() {
        let target = Target::closure(Signature::new(), |_| Err(anyhow::anyhow!("boom")));
        let err = target
            .invoke(&Request::get("/"), &BoundParams::new())
            .unwrap_err();
        assert!(matches!(err, Error::Handler(_)));
    }

    #[derive(Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Controller for Recorder {
        fn before_action(&mut self, method: &str, request: &Request) {
            self.log
                .lock()
                .unwrap()
                .push(format!("before:{method}:{}", request.path));
        }

        fn after_action(&mut self, method: &str) {
            self.log.lock().unwrap().push(format!("after:{method}"));
        }

        fn call(&mut self, method: &str, args: Args<'_>) -> HandlerResult {
            self.log.lock().unwrap().push(format!("call:{method}"));
            if method != "show" {
                anyhow::bail!("failed");
            }
            Ok(Response::text(format!("user {}", args.int(0)?)))
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, created: &Arc<AtomicUsize>) -> Arc<dyn ControllerFactory> {
        let log = Arc::clone(log);
        let created = Arc::clone(created);
        Arc::new(
            ControllerClass::new("UserController", move || {
                created.fetch_add(1, Ordering::SeqCst);
                Recorder {
                    log: Arc::clone(&log),
                }
            })
            .method("show", Signature::new().param("id", ParamType::Int))
            .method("fail", Signature::new()),
        )
    }

    #[test]
    fn test_controller_hooks_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let created = Arc::new(AtomicUsize::new(0));
        let target = Target::controller(recorder(&log, &created), "show").unwrap();
        let params = BoundParams::from([("id", "7")]);

        let response = target.invoke(&Request::get("/user/7"), &params).unwrap();
        assert_eq!(response.body_str(), Some("user 7"));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:show:/user/7", "call:show", "after:show"]
        );
    }

    #[test]
    fn test_controller_created_per_request() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let created = Arc::new(AtomicUsize::new(0));
        let target = Target::controller(recorder(&log, &created), "show").unwrap();
        let params = BoundParams::from([("id", "1")]);

        target.invoke(&Request::get("/"), &params).unwrap();
        target.invoke(&Request::get("/"), &params).unwrap();
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_after_action_runs_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let created = Arc::new(AtomicUsize::new(0));

        let target = Target::controller(recorder(&log, &created), "fail").unwrap();
        assert!(target.invoke(&Request::get("/"), &BoundParams::new()).is_err());

        let target = Target::controller(recorder(&log, &created), "show").unwrap();
        let err = target
            .invoke(&Request::get("/"), &BoundParams::new())
            .unwrap_err();
        assert!(matches!(err, Error::MissingParameter { .. }));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["before:fail:/", "call:fail", "after:fail", "before:show:/", "after:show"]
        );
    }

    #[test]
    fn test_controller_target_validation() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let created = Arc::new(AtomicUsize::new(0));
        let factory = recorder(&log, &created);

        assert!(matches!(
            Target::controller(Arc::clone(&factory), ""),
            Err(Error::InvalidTarget { .. })
        ));
        assert!(matches!(
            Target::controller(factory, "missing"),
            Err(Error::InvalidTarget { .. })
        ));
    }

    #[test]
    fn test_execute_merges_params() {
        let target = Target::closure(Signature::new().request("request"), |args| {
            let request = args.request(0)?;
            Ok(Response::text(request.param("id").unwrap_or("-").to_string()))
        });
        let action = Action::new("user.show", "/user/:id", target);
        let mut request = Request::get("/user/3");
        let params = BoundParams::from([("id", "3")]);

        let response = action.execute(&mut request, &params).unwrap();
        assert_eq!(response.body_str(), Some("3"));
        assert_eq!(request.param("id"), Some("3"));
    }

    #[test]
    fn test_execute_stops_on_validation_failure() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&invoked);
        let target = Target::closure(Signature::new(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Response::text("ok"))
        });

        let mut action = Action::new("guarded", "/guarded", target);
        action.with_validator(|_: &BoundParams| -> ValidationResult<()> {
            let mut errors = ValidationErrors::new();
            errors.add_required("token");
            Err(errors)
        });

        let mut request = Request::get("/guarded");
        let response = action.execute(&mut request, &BoundParams::new()).unwrap();
        assert_eq!(response.status, 422);
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }
}
