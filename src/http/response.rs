use crate::http::request::Headers;

/// HTTP status codes the server emits.
///
/// - `Ok` (200): Request successful
/// - `Created` (201): File written
/// - `BadRequest` (400): Malformed or unframeable request
/// - `NotFound` (404): No route, or file missing
/// - `InternalServerError` (500): File could not be written or encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 400 Invalid request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the reason phrase written on the status line.
    ///
    /// # Example
    ///
    /// ```
    /// # use wicket::http::response::StatusCode;
    /// assert_eq!(StatusCode::Created.reason_phrase(), "Created");
    /// assert_eq!(StatusCode::BadRequest.reason_phrase(), "Invalid request");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::BadRequest => "Invalid request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A complete HTTP response ready to be serialized.
///
/// The body is final: any content coding has already been applied.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// Protocol version for the status line
    pub version: String,
    /// Headers, serialized in insertion order
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use wicket::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "text/plain")
///     .body(b"hello".to_vec())
///     .build();
///
/// assert_eq!(response.headers.get("Content-Length"), Some("5"));
///
/// let empty = ResponseBuilder::new(StatusCode::NotFound).build();
/// assert_eq!(empty.headers.get("Content-Length"), Some("0"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Vec<u8>,
    framed: bool,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
            framed: true,
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Leaves out the Content-Length header. Only meaningful for an empty
    /// body, which then goes out with no headers at all.
    pub fn unframed(mut self) -> Self {
        self.framed = false;
        self
    }

    /// Builds the final Response.
    ///
    /// Content-Length is computed from the final body bytes, overriding
    /// anything set by hand. An unframed builder skips it when the body is
    /// empty.
    pub fn build(mut self) -> Response {
        if self.framed || !self.body.is_empty() {
            self.headers.insert("Content-Length", self.body.len().to_string());
        }

        Response {
            status: self.status,
            version: "HTTP/1.1".to_string(),
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Empty 200 OK with no headers.
    pub fn ok() -> Self {
        ResponseBuilder::new(StatusCode::Ok).unframed().build()
    }

    /// Empty 201 Created.
    pub fn created() -> Self {
        ResponseBuilder::new(StatusCode::Created).build()
    }

    /// Empty 400 response.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest).build()
    }

    /// Empty 404 Not Found.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound).build()
    }

    /// Empty 500 Internal Server Error.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError).build()
    }

    /// Marks the response as the last one on its connection.
    pub fn close_connection(&mut self) {
        self.headers.insert("Connection", "close");
    }
}
