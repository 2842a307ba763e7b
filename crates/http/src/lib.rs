//! drive-http: reqwest transport for the EBRAINS Drive and Data-proxy client
//!
//! This crate implements the `Transport` trait from drive-core on top of
//! reqwest. It is the only crate that depends on an HTTP library.

pub mod connect;
pub mod transport;

pub use connect::{Clients, dataproxy_client, drive_client};
pub use transport::ReqwestTransport;
