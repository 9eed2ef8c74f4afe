use tracing::{debug, error, warn};

use crate::http::encoding::{self, Encoding};
use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::service::files::{FileError, FileStore};
use crate::service::router::{Handler, RouteMatch};
use crate::service::App;

/// Runs the routed handler. Every outcome is a response; nothing here fails.
pub async fn handle(app: &App, route: RouteMatch<'_>, request: &Request) -> Response {
    match (route.handler, route.param) {
        (Handler::Root, _) => root(),
        (Handler::Echo, Some(value)) => echo(value, request, app.encodings()),
        (Handler::UserAgent, _) => user_agent(request),
        (Handler::ReadFile, Some(name)) => read_file(app.files(), name).await,
        (Handler::WriteFile, Some(name)) => write_file(app.files(), name, request).await,
        _ => not_found(),
    }
}

pub fn root() -> Response {
    Response::ok()
}

/// Reflects the path segment, gzip-compressed when the client accepts it.
pub fn echo(value: &str, request: &Request, supported: &[Encoding]) -> Response {
    let builder = ResponseBuilder::new(StatusCode::Ok).header("Content-Type", "text/plain");

    match encoding::negotiate(request.header("Accept-Encoding"), supported) {
        Some(coding) => match coding.encode(value.as_bytes()) {
            Ok(compressed) => builder
                .header("Content-Encoding", coding.token())
                .body(compressed)
                .build(),
            Err(e) => {
                warn!(error = %e, encoding = coding.token(), "Failed to encode echo body");
                Response::internal_error()
            }
        },
        None => builder.body(value.as_bytes().to_vec()).build(),
    }
}

/// Reflects the User-Agent header verbatim.
pub fn user_agent(request: &Request) -> Response {
    let agent = request.header("User-Agent").unwrap_or_default();

    ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .body(agent.as_bytes().to_vec())
        .build()
}

pub async fn read_file(files: &FileStore, name: &str) -> Response {
    match files.read(name).await {
        Ok(contents) => ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", "application/octet-stream")
            .body(contents)
            .build(),
        Err(FileError::NoDirectory) => {
            debug!(file = name, "File requested but no directory is configured");
            Response::not_found()
        }
        Err(e) => {
            debug!(file = name, error = %e, "File not readable");
            Response::not_found()
        }
    }
}

/// Stores the request body, cut to the declared Content-Length.
pub async fn write_file(files: &FileStore, name: &str, request: &Request) -> Response {
    let declared = match request.content_length() {
        Some(Ok(n)) => n,
        Some(Err(_)) | None => {
            warn!(file = name, "Upload without a usable Content-Length");
            return Response::bad_request();
        }
    };

    let Some(body) = request.body.as_ref() else {
        warn!(file = name, "Upload without a header/body boundary");
        return Response::bad_request();
    };

    let contents = &body[..declared.min(body.len())];

    match files.write(name, contents).await {
        Ok(()) => {
            debug!(file = name, bytes = contents.len(), "File written");
            Response::created()
        }
        Err(e) => {
            error!(file = name, error = %e, "Failed to write file");
            Response::internal_error()
        }
    }
}

pub fn not_found() -> Response {
    Response::not_found()
}
