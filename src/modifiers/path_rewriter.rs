//! Built-in path rewriting extension
//!
//! Offers two modifiers:
//! - `<name>-request` appends a configured suffix segment to the backend path
//! - `<name>-response` observes the response and passes it through unchanged
//!
//! Configuration for the request modifier:
//!
//! ```toml
//! [extra_config."plugin/req-resp-modifier"]
//! name = ["omni.path-rewriter-request"]
//!
//! [extra_config."plugin/req-resp-modifier"."omni.path-rewriter-request"]
//! suffix = "/v2"
//! ```

use std::any::Any;
use std::sync::Arc;

use super::view::{Payload, RequestView, RequestWrapper, ResponseView};
use super::{ModifierConfig, ModifierDescriptor, Phase, Transform};
use crate::extensions::{
    ContextRegisterer, ExtensionState, Logger, LoggerRegisterer, ModifierRegisterer, Registerer,
    StdoutLogger,
};
use crate::lifecycle::ShutdownToken;
use crate::Error;

/// Suffix appended when none is configured
pub const DEFAULT_SUFFIX: &str = "/fooo";

/// Default capability name
const DEFAULT_NAME: &str = "omni.path-rewriter";

/// Context key echoed in debug output
const CONTEXT_KEY: &str = "myCtxKey";

/// Extension rewriting request paths and observing responses
#[derive(Debug, Clone)]
pub struct PathRewriter {
    state: Arc<ExtensionState>,
}

impl Default for PathRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PathRewriter {
    /// Create the extension under its default name
    #[must_use]
    pub fn new() -> Self {
        Self::with_name(DEFAULT_NAME)
    }

    /// Create the extension under a custom capability name
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        Self {
            state: ExtensionState::new(name),
        }
    }

    /// Per-instance state (logger, shutdown token)
    #[must_use]
    pub fn state(&self) -> &Arc<ExtensionState> {
        &self.state
    }

    fn watch_shutdown(&self, phase: Phase) {
        let Some(token) = self.state.shutdown() else {
            tracing::debug!(
                plugin = %self.state.name(),
                phase = %phase,
                "no shutdown context registered, skipping cleanup hook"
            );
            return;
        };

        // Cleanups must not own the state; the state owns the token they live in
        let logger = self.state.shared_logger();
        token.on_shutdown(phase.modifier_name(self.state.name()), move || {
            match logger {
                Some(logger) => logger.debug(&[&"Shutting down the service"]),
                None => StdoutLogger.debug(&[&"Shutting down the service"]),
            }
        });
    }
}

impl Registerer for PathRewriter {
    fn name(&self) -> &str {
        self.state.name()
    }

    fn as_modifier_registerer(&self) -> Option<&dyn ModifierRegisterer> {
        Some(self)
    }

    fn as_logger_registerer(&self) -> Option<&dyn LoggerRegisterer> {
        Some(self)
    }

    fn as_context_registerer(&self) -> Option<&dyn ContextRegisterer> {
        Some(self)
    }
}

impl ModifierRegisterer for PathRewriter {
    fn register_modifiers(&self, register: &mut dyn FnMut(ModifierDescriptor)) {
        let name = self.state.name();

        let this = self.clone();
        register(ModifierDescriptor::new(
            Phase::Request.modifier_name(name),
            Phase::Request,
            move |config| this.request_modifier(config),
        ));

        let this = self.clone();
        register(ModifierDescriptor::new(
            Phase::Response.modifier_name(name),
            Phase::Response,
            move |config| this.response_modifier(config),
        ));
    }
}

impl LoggerRegisterer for PathRewriter {
    fn register_logger(&self, candidate: &dyn Any) {
        self.state.accept_logger(candidate);
    }
}

impl ContextRegisterer for PathRewriter {
    fn register_context(&self, token: ShutdownToken) {
        self.state.accept_context(token);
    }
}

impl PathRewriter {
    fn request_modifier(&self, config: &ModifierConfig) -> Transform {
        let suffix = match config.get("suffix") {
            None => DEFAULT_SUFFIX.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => {
                self.state.warning(&[
                    &format_args!("[PLUGIN: {}]", self.state.name()),
                    &"invalid suffix",
                    &other,
                    &format_args!("falling back to {DEFAULT_SUFFIX}"),
                ]);
                DEFAULT_SUFFIX.to_string()
            }
        };

        self.watch_shutdown(Phase::Request);

        let state = Arc::clone(&self.state);
        match state.logger() {
            Some(logger) => logger.debug(&[&format_args!(
                "[PLUGIN: {}] Request modifier injected",
                state.name()
            )]),
            None => StdoutLogger.info(&[&"request modifier loaded without logger"]),
        }

        Arc::new(move |input: Payload| -> crate::Result<Payload> {
            let Payload::Request(req) = input else {
                return Err(Error::unrecognized(Phase::Request));
            };

            let rewritten = rewrite(req.as_ref(), &suffix);

            if let Some(logger) = state.logger() {
                let ctx_value = req.context().value(CONTEXT_KEY).unwrap_or_default();
                logger.debug(&[&"context key:", &ctx_value]);
                logger.debug(&[&"params:", &format_args!("{:?}", rewritten.params)]);
                logger.debug(&[&"headers:", &format_args!("{:?}", rewritten.headers)]);
                logger.debug(&[&"method:", &rewritten.method]);
                logger.debug(&[&"url:", &rewritten.url]);
                logger.debug(&[&"query:", &format_args!("{:?}", rewritten.query)]);
                logger.debug(&[&"path:", &rewritten.path]);
            }

            Ok(Payload::request(rewritten))
        })
    }

    fn response_modifier(&self, _config: &ModifierConfig) -> Transform {
        self.watch_shutdown(Phase::Response);

        let state = Arc::clone(&self.state);
        match state.logger() {
            Some(logger) => logger.debug(&[&format_args!(
                "[PLUGIN: {}] Response modifier injected",
                state.name()
            )]),
            None => StdoutLogger.info(&[&"response modifier loaded without logger"]),
        }

        Arc::new(move |input: Payload| -> crate::Result<Payload> {
            let Payload::Response(resp) = input else {
                return Err(Error::unrecognized(Phase::Response));
            };

            match state.logger() {
                Some(logger) => observe(logger, resp.as_ref()),
                None => observe_to_console(resp.as_ref()),
            }

            Ok(Payload::Response(resp))
        })
    }
}

/// Copy of `req` with `suffix` joined onto its path
fn rewrite(req: &dyn RequestView, suffix: &str) -> RequestWrapper {
    let mut out = RequestWrapper::from_view(req);
    out.path = join_path(req.path(), suffix);
    out
}

fn observe(logger: &dyn Logger, resp: &dyn ResponseView) {
    if let Some(req) = resp.request() {
        for (name, values) in req.headers() {
            if let Some(first) = values.first() {
                logger.debug(&[&format_args!("Header {name} value: {first}")]);
            }
        }
    }

    let ctx_value = resp.context().value(CONTEXT_KEY).unwrap_or_default();
    logger.debug(&[&"context key:", &ctx_value]);
    logger.debug(&[&"data:", &format_args!("{:?}", resp.data())]);
    logger.debug(&[&"is complete:", &resp.is_complete()]);
    logger.debug(&[&"headers:", &format_args!("{:?}", resp.headers())]);
    logger.debug(&[&"status code:", &resp.status_code()]);

    if let Some(req) = resp.request() {
        logger.debug(&[&"original headers:", &format_args!("{:?}", req.headers())]);
    }
}

fn observe_to_console(resp: &dyn ResponseView) {
    let console = StdoutLogger;
    console.info(&[&"data:", &format_args!("{:?}", resp.data())]);
    console.info(&[&"is complete:", &resp.is_complete()]);
    console.info(&[&"headers:", &format_args!("{:?}", resp.headers())]);
    console.info(&[&"status code:", &resp.status_code()]);
}

/// Join two slash-separated paths and clean the result
///
/// Follows URL path semantics: empty and `.` segments are dropped, `..`
/// removes the previous segment, and a rooted base stays rooted.
#[must_use]
pub fn join_path(base: &str, suffix: &str) -> String {
    let joined = match (base.is_empty(), suffix.is_empty()) {
        (true, true) => return String::new(),
        (true, false) => suffix.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{base}/{suffix}"),
    };
    clean_path(&joined)
}

fn clean_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|last| *last != "..") {
                    segments.pop();
                } else if !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extensions::TracingLogger;
    use crate::lifecycle::ShutdownSignal;
    use crate::modifiers::{Data, RequestContext, ResponseWrapper};
    use url::Url;

    fn descriptors(ext: &PathRewriter) -> Vec<ModifierDescriptor> {
        let mut out = Vec::new();
        ext.register_modifiers(&mut |d| out.push(d));
        out
    }

    fn sample_request() -> RequestWrapper {
        RequestWrapper::new("GET", Url::parse("http://gateway.local/users?page=2").unwrap())
            .with_header("Accept", "application/json")
            .with_param("tenant", "acme")
            .with_body("{}")
            .with_context(RequestContext::new().with_value(CONTEXT_KEY, "v"))
    }

    #[test]
    fn join_path_cases() {
        assert_eq!(join_path("/users", "/foo"), "/users/foo");
        assert_eq!(join_path("/users/", "/foo"), "/users/foo");
        assert_eq!(join_path("", "/fooo"), "/fooo");
        assert_eq!(join_path("/users", ""), "/users");
        assert_eq!(join_path("/a/b", "../c"), "/a/c");
        assert_eq!(join_path("/", "/x"), "/x");
        assert_eq!(join_path("a", "b"), "a/b");
        assert_eq!(join_path("/..", "x"), "/x");
        assert_eq!(join_path("", ""), "");
    }

    #[test]
    fn registers_one_modifier_per_phase() {
        let ext = PathRewriter::with_name("omni.rw");
        let found = descriptors(&ext);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "omni.rw-request");
        assert_eq!(found[0].phase(), Some(Phase::Request));
        assert_eq!(found[1].name, "omni.rw-response");
        assert_eq!(found[1].phase(), Some(Phase::Response));

        // Re-registration yields the same set
        let again: Vec<String> = descriptors(&ext).into_iter().map(|d| d.name).collect();
        assert_eq!(again, vec!["omni.rw-request", "omni.rw-response"]);
    }

    #[test]
    fn request_modifier_appends_configured_suffix() {
        let ext = PathRewriter::new();
        let mut config = ModifierConfig::new();
        config.insert("suffix".into(), "/foo".into());
        let transform = descriptors(&ext)[0].build(&config);

        let original = sample_request();
        let out = transform(Payload::request(original.clone())).unwrap();
        let out = RequestWrapper::from_view(out.as_request().unwrap());

        assert_eq!(out.path, "/users/foo");
        assert_eq!(out.method, original.method);
        assert_eq!(out.url, original.url);
        assert_eq!(out.query, original.query);
        assert_eq!(out.headers, original.headers);
        assert_eq!(out.params, original.params);
        assert_eq!(out.body, original.body);
    }

    #[test]
    fn request_modifier_defaults_on_invalid_config() {
        let ext = PathRewriter::new();
        let mut config = ModifierConfig::new();
        config.insert("suffix".into(), serde_json::json!(42));
        let transform = descriptors(&ext)[0].build(&config);

        let out = transform(Payload::request(sample_request())).unwrap();
        assert_eq!(out.as_request().unwrap().path(), "/users/fooo");
    }

    #[test]
    fn request_modifier_rejects_response() {
        let ext = PathRewriter::new();
        let transform = descriptors(&ext)[0].build(&ModifierConfig::new());
        let err = transform(Payload::response(ResponseWrapper::new(200, Data::new()))).unwrap_err();
        assert!(matches!(
            err,
            Error::UnrecognizedInputType {
                expected: Phase::Request
            }
        ));
    }

    #[test]
    fn response_modifier_rejects_request() {
        let ext = PathRewriter::new();
        let transform = descriptors(&ext)[1].build(&ModifierConfig::new());
        let err = transform(Payload::request(sample_request())).unwrap_err();
        assert!(err.is_unrecognized_input());
    }

    #[test]
    fn response_modifier_is_identity() {
        let ext = PathRewriter::new();
        ext.register_logger(&TracingLogger::new().shared());
        let transform = descriptors(&ext)[1].build(&ModifierConfig::new());

        let mut data = Data::new();
        data.insert("id".into(), serde_json::json!(1));
        let original = ResponseWrapper::new(200, data)
            .with_request(sample_request())
            .with_header("Content-Type", "application/json");

        let first = transform(Payload::response(original.clone())).unwrap();
        let first = ResponseWrapper::from_view(first.as_response().unwrap());
        let second = transform(Payload::response(original.clone())).unwrap();
        let second = ResponseWrapper::from_view(second.as_response().unwrap());

        assert_eq!(first, original);
        assert_eq!(second, original);
    }

    #[test]
    fn transforms_work_without_logger() {
        let ext = PathRewriter::new();
        let found = descriptors(&ext);
        let req = found[0].build(&ModifierConfig::new());
        let resp = found[1].build(&ModifierConfig::new());

        assert!(req(Payload::request(sample_request())).is_ok());
        assert!(resp(Payload::response(ResponseWrapper::new(204, Data::new()))).is_ok());
    }

    #[test]
    fn factories_register_shutdown_cleanups() {
        let signal = ShutdownSignal::new();
        let ext = PathRewriter::new();
        ext.register_context(signal.token());

        for descriptor in descriptors(&ext) {
            let _ = descriptor.build(&ModifierConfig::new());
        }
        assert_eq!(signal.token().pending_cleanups(), 2);

        assert!(signal.fire());
        assert_eq!(signal.token().pending_cleanups(), 0);
        assert!(!signal.fire());
    }

    #[test]
    fn rebuilding_modifiers_keeps_one_cleanup_each() {
        let signal = ShutdownSignal::new();
        let ext = PathRewriter::new();
        ext.register_context(signal.token());

        for _ in 0..100 {
            for descriptor in descriptors(&ext) {
                drop(descriptor.build(&ModifierConfig::new()));
            }
        }
        assert_eq!(signal.token().pending_cleanups(), 2);
    }

    #[test]
    fn pending_cleanups_do_not_keep_state_alive() {
        let signal = ShutdownSignal::new();
        let ext = PathRewriter::new();
        ext.register_logger(&TracingLogger::new().shared());
        ext.register_context(signal.token());

        for descriptor in descriptors(&ext) {
            drop(descriptor.build(&ModifierConfig::new()));
        }
        let weak = Arc::downgrade(ext.state());
        drop(ext);

        assert_eq!(signal.token().pending_cleanups(), 2);
        assert!(weak.upgrade().is_none());
    }
}
