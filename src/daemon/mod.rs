//! Daemon process: background tasks plus the HTTP API

pub mod http;
mod server;

pub use server::run;
