//! Wicket - a small keep-alive HTTP/1.1 server
//!
//! Core library for parsing, routing, handling and connection management.

pub mod config;
pub mod http;
pub mod server;
pub mod service;
