//! Read-only views over in-flight requests and responses
//!
//! Extensions only ever see these traits. The host keeps ownership of the
//! underlying request for the duration of one transform call.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use url::Url;

/// Header name to values
pub type Headers = BTreeMap<String, Vec<String>>;

/// Query parameter name to values
pub type Query = BTreeMap<String, Vec<String>>;

/// Path parameters extracted by the router
pub type Params = BTreeMap<String, String>;

/// Decoded response payload
pub type Data = serde_json::Map<String, serde_json::Value>;

/// Request-scoped values set by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    values: HashMap<String, String>,
}

impl RequestContext {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key-value pair
    #[must_use]
    pub fn with_value(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }

    /// Look up a value
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Read access to an in-flight request
pub trait RequestView: Send + Sync {
    /// Request-scoped context
    fn context(&self) -> &RequestContext;
    /// Path parameters
    fn params(&self) -> &Params;
    /// Request headers
    fn headers(&self) -> &Headers;
    /// Raw request body
    fn body(&self) -> &[u8];
    /// HTTP method
    fn method(&self) -> &str;
    /// Full request URL
    fn url(&self) -> &Url;
    /// Parsed query string
    fn query(&self) -> &Query;
    /// Path forwarded to the backend
    fn path(&self) -> &str;
}

/// Read access to an in-flight response
pub trait ResponseView: Send + Sync {
    /// Request-scoped context
    fn context(&self) -> &RequestContext;
    /// Request that produced this response, when the host kept it
    fn request(&self) -> Option<&dyn RequestView>;
    /// Decoded response data
    fn data(&self) -> &Data;
    /// Whether every backend answered
    fn is_complete(&self) -> bool;
    /// Response headers
    fn headers(&self) -> &Headers;
    /// HTTP status code
    fn status_code(&self) -> u16;
}

/// Phase-tagged value crossing the transform boundary
pub enum Payload {
    /// Request-phase input or output
    Request(Box<dyn RequestView>),
    /// Response-phase input or output
    Response(Box<dyn ResponseView>),
}

impl Payload {
    /// Wrap a request
    pub fn request(view: impl RequestView + 'static) -> Self {
        Self::Request(Box::new(view))
    }

    /// Wrap a response
    pub fn response(view: impl ResponseView + 'static) -> Self {
        Self::Response(Box::new(view))
    }

    /// Request view, if this is a request payload
    #[must_use]
    pub fn as_request(&self) -> Option<&dyn RequestView> {
        match self {
            Self::Request(req) => Some(req.as_ref()),
            Self::Response(_) => None,
        }
    }

    /// Response view, if this is a response payload
    #[must_use]
    pub fn as_response(&self) -> Option<&dyn ResponseView> {
        match self {
            Self::Response(resp) => Some(resp.as_ref()),
            Self::Request(_) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(req) => f
                .debug_struct("Request")
                .field("method", &req.method())
                .field("path", &req.path())
                .finish_non_exhaustive(),
            Self::Response(resp) => f
                .debug_struct("Response")
                .field("status_code", &resp.status_code())
                .field("is_complete", &resp.is_complete())
                .finish_non_exhaustive(),
        }
    }
}

/// Owned request representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestWrapper {
    /// Request-scoped context
    pub context: RequestContext,
    /// HTTP method
    pub method: String,
    /// Full request URL
    pub url: Url,
    /// Parsed query string
    pub query: Query,
    /// Path forwarded to the backend
    pub path: String,
    /// Raw request body
    pub body: Vec<u8>,
    /// Path parameters
    pub params: Params,
    /// Request headers
    pub headers: Headers,
}

impl RequestWrapper {
    /// Build a request from a URL, deriving path and query from it
    #[must_use]
    pub fn new(method: &str, url: Url) -> Self {
        let mut query = Query::new();
        for (key, value) in url.query_pairs() {
            query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Self {
            context: RequestContext::default(),
            method: method.to_string(),
            path: url.path().to_string(),
            url,
            query,
            body: Vec::new(),
            params: Params::new(),
            headers: Headers::new(),
        }
    }

    /// Snapshot any request view into an owned wrapper
    #[must_use]
    pub fn from_view(view: &dyn RequestView) -> Self {
        Self {
            context: view.context().clone(),
            method: view.method().to_string(),
            url: view.url().clone(),
            query: view.query().clone(),
            path: view.path().to_string(),
            body: view.body().to_vec(),
            params: view.params().clone(),
            headers: view.headers().clone(),
        }
    }

    /// Append a header value
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Set a path parameter
    #[must_use]
    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.params.insert(name.to_string(), value.to_string());
        self
    }

    /// Set the body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the context
    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Override the backend path
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }
}

impl RequestView for RequestWrapper {
    fn context(&self) -> &RequestContext {
        &self.context
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn method(&self) -> &str {
        &self.method
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn query(&self) -> &Query {
        &self.query
    }

    fn path(&self) -> &str {
        &self.path
    }
}

/// Owned response representation
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseWrapper {
    /// Request-scoped context
    pub context: RequestContext,
    /// Originating request
    pub request: Option<RequestWrapper>,
    /// Decoded response data
    pub data: Data,
    /// Whether every backend answered
    pub is_complete: bool,
    /// Response headers
    pub headers: Headers,
    /// HTTP status code
    pub status_code: u16,
}

impl ResponseWrapper {
    /// Build a complete response with the given status
    #[must_use]
    pub fn new(status_code: u16, data: Data) -> Self {
        Self {
            context: RequestContext::default(),
            request: None,
            data,
            is_complete: true,
            headers: Headers::new(),
            status_code,
        }
    }

    /// Snapshot any response view into an owned wrapper
    #[must_use]
    pub fn from_view(view: &dyn ResponseView) -> Self {
        Self {
            context: view.context().clone(),
            request: view.request().map(RequestWrapper::from_view),
            data: view.data().clone(),
            is_complete: view.is_complete(),
            headers: view.headers().clone(),
            status_code: view.status_code(),
        }
    }

    /// Attach the originating request
    #[must_use]
    pub fn with_request(mut self, request: RequestWrapper) -> Self {
        self.context = request.context.clone();
        self.request = Some(request);
        self
    }

    /// Append a header value
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .entry(name.to_string())
            .or_default()
            .push(value.to_string());
        self
    }

    /// Mark the response as partial
    #[must_use]
    pub const fn incomplete(mut self) -> Self {
        self.is_complete = false;
        self
    }
}

impl ResponseView for ResponseWrapper {
    fn context(&self) -> &RequestContext {
        &self.context
    }

    fn request(&self) -> Option<&dyn RequestView> {
        self.request.as_ref().map(|r| r as &dyn RequestView)
    }

    fn data(&self) -> &Data {
        &self.data
    }

    fn is_complete(&self) -> bool {
        self.is_complete
    }

    fn headers(&self) -> &Headers {
        &self.headers
    }

    fn status_code(&self) -> u16 {
        self.status_code
    }
}
