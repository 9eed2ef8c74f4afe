//! Ordered route table.
//!
//! Routes are tried top to bottom and the first entry whose method filter and
//! path pattern both match wins. Anything left over goes to
//! [`Handler::NotFound`].

use crate::http::request::Method;

/// Which request methods a route accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodFilter {
    Any,
    Only(Method),
}

impl MethodFilter {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            MethodFilter::Any => true,
            MethodFilter::Only(expected) => expected == method,
        }
    }
}

/// Structural pattern over the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// The empty path or `/`.
    Root,
    /// `<prefix><segment>` where segment is one or more non-slash characters
    /// and nothing follows it. The segment is captured.
    Segment(&'static str),
    /// Any path starting with the prefix.
    Prefix(&'static str),
}

impl PathPattern {
    /// Matches `path`, returning the captured segment if the pattern has one.
    pub fn matches<'a>(&self, path: &'a str) -> Option<Option<&'a str>> {
        match self {
            PathPattern::Root => (path.is_empty() || path == "/").then_some(None),
            PathPattern::Segment(prefix) => path
                .strip_prefix(*prefix)
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(Some),
            PathPattern::Prefix(prefix) => path.starts_with(*prefix).then_some(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Root,
    Echo,
    UserAgent,
    ReadFile,
    WriteFile,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: MethodFilter,
    pub pattern: PathPattern,
    pub handler: Handler,
}

impl Route {
    pub fn new(method: MethodFilter, pattern: PathPattern, handler: Handler) -> Self {
        Self { method, pattern, handler }
    }
}

/// Result of routing: the handler plus the captured path segment, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub handler: Handler,
    pub param: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The server's fixed table: root, echo, user-agent, file read, file write.
    pub fn standard() -> Self {
        Self::new(vec![
            Route::new(MethodFilter::Any, PathPattern::Root, Handler::Root),
            Route::new(MethodFilter::Any, PathPattern::Segment("/echo/"), Handler::Echo),
            Route::new(MethodFilter::Any, PathPattern::Prefix("/user-agent"), Handler::UserAgent),
            Route::new(
                MethodFilter::Only(Method::GET),
                PathPattern::Segment("/files/"),
                Handler::ReadFile,
            ),
            Route::new(
                MethodFilter::Only(Method::POST),
                PathPattern::Segment("/files/"),
                Handler::WriteFile,
            ),
        ])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn resolve<'a>(&self, method: &Method, path: &'a str) -> RouteMatch<'a> {
        self.routes
            .iter()
            .filter(|route| route.method.matches(method))
            .find_map(|route| {
                route.pattern.matches(path).map(|param| RouteMatch {
                    handler: route.handler,
                    param,
                })
            })
            .unwrap_or(RouteMatch {
                handler: Handler::NotFound,
                param: None,
            })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::standard()
    }
}
