//! # Dispatcher
//!
//! Request phase: `path -> match -> validate -> bind -> invoke -> response`.
//!
//! Request-time failures of the routing layer are turned into responses here:
//!
//! | Failure                  | Response                 |
//! |--------------------------|--------------------------|
//! | no action for the path   | 404 `{"error": ...}`     |
//! | validator rejected       | the validator's response |
//! | unbound parameter        | 500 `{"error": ...}`     |
//! | unconvertible parameter  | 400 `{"error": ...}`     |
//!
//! Errors raised by a target's own logic are returned as `Err` for the
//! caller's error boundary.

use crate::error::{Error, Result};
use crate::registry::SealedRegistry;
use crate::request::Request;
use crate::response::Response;
use std::sync::Arc;
use tracing::{debug, error};

/// Drives a request through the sealed registry
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<SealedRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a sealed registry
    #[must_use]
    pub const fn new(registry: Arc<SealedRegistry>) -> Self {
        Self { registry }
    }

    /// The registry requests are resolved against
    #[must_use]
    pub const fn registry(&self) -> &Arc<SealedRegistry> {
        &self.registry
    }

    /// Resolve and run the action for `request`
    ///
    /// Bound path values are merged into the request's parameters before
    /// the target runs.
    ///
    /// # Errors
    ///
    /// Returns `Error::Handler` if the target's own logic fails
    pub fn handle(&self, request: &mut Request) -> Result<Response> {
        let path = request.path.clone();
        debug!(method = %request.method, path = %path, "Dispatching request");

        let (action, params) = match self.registry.at(&path) {
            Ok(found) => found,
            Err(Error::ActionNotFound { .. }) => {
                debug!(path = %path, "No action matched");
                return Ok(Response::not_found());
            }
            Err(err) => return Err(err),
        };
        debug!(
            action = action.name(),
            bound = params.len(),
            "Action matched"
        );

        match action.execute(request, &params) {
            Ok(response) => {
                debug!(action = action.name(), status = response.status, "Action completed");
                Ok(response)
            }
            Err(err @ Error::MissingParameter { .. }) => {
                error!(action = action.name(), error = %err, "Action target cannot be bound");
                Ok(Response::error(500, "Internal Server Error"))
            }
            Err(err @ Error::InvalidParameter { .. }) => {
                debug!(action = action.name(), error = %err, "Parameter conversion failed");
                Ok(Response::error(400, &err.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Controller, ControllerClass, HandlerResult, Target};
    use crate::binder::{Args, Signature};
    use crate::params::BoundParams;
    use crate::registry::Registry;
    use crate::types::ParamType;
    use crate::validation::{FieldError, ValidationErrors, ValidationResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn echo(label: &'static str, signature: Signature) -> Target {
        Target::closure(signature, move |args| {
            let values: Vec<String> = (0..args.len())
                .map(|i| args.value(i).map(ToString::to_string))
                .collect::<Result<_>>()?;
            Ok(Response::text(format!("{label}:{}", values.join(","))))
        })
    }

    fn dispatcher(build: impl FnOnce(&mut Registry)) -> Dispatcher {
        let mut registry = Registry::new();
        build(&mut registry);
        Dispatcher::new(Arc::new(registry.seal()))
    }

    fn body(dispatcher: &Dispatcher, path: &str) -> (u16, String) {
        let response = dispatcher.handle(&mut Request::get(path)).unwrap();
        (response.status, response.body_str().unwrap_or_default().to_string())
    }

    #[test]
    fn test_literal_beats_placeholder() {
        let d = dispatcher(|r| {
            r.register("bound", "/user/:id", echo("bound", Signature::new().param("id", ParamType::String)))
                .unwrap();
            r.register("me", "/user/me", echo("me", Signature::new())).unwrap();
        });

        assert_eq!(body(&d, "/user/me"), (200, "me:".to_string()));
        assert_eq!(body(&d, "/user/42"), (200, "bound:42".to_string()));
    }

    #[test]
    fn test_backtracking_across_placeholders() {
        let d = dispatcher(|r| {
            r.register("a", "/:a/x", echo("a", Signature::new().param("a", ParamType::String)))
                .unwrap();
            r.register("b", "/:b/y", echo("b", Signature::new().param("b", ParamType::String)))
                .unwrap();
        });

        assert_eq!(body(&d, "/k/y"), (200, "b:k".to_string()));
    }

    #[test]
    fn test_not_found() {
        let d = dispatcher(|r| {
            r.register("home", "/", echo("home", Signature::new())).unwrap();
        });

        let (status, text) = body(&d, "/missing");
        assert_eq!(status, 404);
        assert!(text.contains("Not Found"));
        assert_eq!(body(&d, "/").0, 200);
    }

    #[test]
    fn test_defaults_and_conversion() {
        let d = dispatcher(|r| {
            let signature = Signature::new()
                .param("name", ParamType::String)
                .param_with_default("age", ParamType::Int, 18);
            r.register("person", "/person/:name", echo("p", signature.clone())).unwrap();
            r.register("aged", "/person/:name/:age", echo("p", signature)).unwrap();
        });

        assert_eq!(body(&d, "/person/Ann"), (200, "p:Ann,18".to_string()));
        assert_eq!(body(&d, "/person/Ann/31"), (200, "p:Ann,31".to_string()));
        assert_eq!(body(&d, "/person/Ann/old").0, 400);
    }

    #[test]
    fn test_missing_parameter_is_500() {
        let d = dispatcher(|r| {
            r.register("broken", "/broken", echo("x", Signature::new().param("id", ParamType::Int)))
                .unwrap();
        });

        assert_eq!(body(&d, "/broken").0, 500);
    }

    #[test]
    fn test_handler_error_propagates() {
        let d = dispatcher(|r| {
            r.register(
                "fail",
                "/fail",
                Target::closure(Signature::new(), |_| Err(anyhow::anyhow!("boom"))),
            )
            .unwrap();
        });

        let err = d.handle(&mut Request::get("/fail")).unwrap_err();
        assert!(matches!(err, Error::Handler(_)));
    }

    #[test]
    fn test_bound_values_merged_into_request() {
        let d = dispatcher(|r| {
            r.register(
                "show",
                "/user/:id",
                Target::closure(Signature::new().request("request"), |args| {
                    let request = args.request(0)?;
                    Ok(Response::text(format!(
                        "{}/{}",
                        request.param("id").unwrap_or("-"),
                        request.param("tab").unwrap_or("-")
                    )))
                }),
            )
            .unwrap();
        });

        let mut request = Request::get("/user/7?id=1&tab=info");
        let response = d.handle(&mut request).unwrap();
        assert_eq!(response.body_str(), Some("7/info"));
        assert_eq!(request.param("id"), Some("7"));
    }

    #[test]
    fn test_validation_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let d = dispatcher(move |r| {
            r.register(
                "post",
                "/post/:slug",
                Target::closure(Signature::new(), move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Response::text("ok"))
                }),
            )
            .unwrap()
            .with_validator(|data: &BoundParams| -> ValidationResult<()> {
                if data.get("slug").is_some_and(|s| s.len() >= 3) {
                    return Ok(());
                }
                let mut errors = ValidationErrors::new();
                errors.add(FieldError::too_short("slug", 3));
                Err(errors)
            });
        });

        assert_eq!(body(&d, "/post/ab").0, 422);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(body(&d, "/post/abc").0, 200);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    struct Audited {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Controller for Audited {
        fn before_action(&mut self, method: &str, request: &Request) {
            let id = request.param("id").unwrap_or("-");
            self.push(format!("before {method} id={id}"));
        }

        fn after_action(&mut self, method: &str) {
            self.push(format!("after {method}"));
        }

        fn call(&mut self, method: &str, args: Args<'_>) -> HandlerResult {
            let id = args.int(0)?;
            self.push(format!("{method} {id}"));
            if id == 0 {
                anyhow::bail!("no such user");
            }
            Ok(Response::text(id.to_string()))
        }
    }

    impl Audited {
        fn push(&self, entry: String) {
            if let Ok(mut log) = self.log.lock() {
                log.push(entry);
            }
        }
    }

    #[test]
    fn test_controller_hooks_around_call() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);

        let d = dispatcher(move |r| {
            r.register_controller(Arc::new(
                ControllerClass::new("Users", move || Audited {
                    log: Arc::clone(&shared),
                })
                .method("show", Signature::new().param("id", ParamType::Int)),
            ))
            .unwrap();
            r.register_named("user.show", "/user/:id", "Users@show").unwrap();
        });

        assert_eq!(body(&d, "/user/5"), (200, "5".to_string()));
        assert!(d.handle(&mut Request::get("/user/0")).is_err());

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "before show id=5",
                "show 5",
                "after show",
                "before show id=0",
                "show 0",
                "after show",
            ]
        );
    }
}
