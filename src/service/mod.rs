//! Request handling: routing, handlers and the directory they serve.
//!
//! [`App`] bundles everything a connection needs to answer a request. It is
//! built once at startup and shared read-only between connection tasks.

pub mod files;
pub mod handlers;
pub mod router;

use crate::config::Config;
use crate::http::encoding::Encoding;
use crate::http::request::Request;
use crate::http::response::Response;
use files::FileStore;
use router::Router;

#[derive(Debug, Clone)]
pub struct App {
    router: Router,
    files: FileStore,
    encodings: Vec<Encoding>,
}

impl App {
    pub fn new(router: Router, files: FileStore, encodings: Vec<Encoding>) -> Self {
        Self { router, files, encodings }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Router::standard(),
            FileStore::new(cfg.directory.clone(), cfg.max_file_bytes),
            cfg.supported_encodings.clone(),
        )
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Routes `request` and runs the selected handler.
    pub async fn dispatch(&self, request: &Request) -> Response {
        let route = self.router.resolve(&request.method, &request.path);
        let response = handlers::handle(self, route, request).await;

        tracing::info!(
            method = %request.method,
            path = %request.path,
            handler = ?route.handler,
            status = response.status.as_u16(),
            "Request handled"
        );

        response
    }
}
