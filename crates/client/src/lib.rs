//! `oneflow-client`: wires the synchronizers to the OneFlow REST API.
//!
//! - `config`: environment-driven [`ClientConfig`]
//! - `http`: [`HttpCollection`], the reqwest-backed remote collection
//! - `mirror`: [`LocalMirror`], optional JSON snapshots on disk
//! - `session`: [`Session`], one synchronizer per entity sharing a client and an event bus

pub mod config;
pub mod http;
pub mod mirror;
pub mod session;

pub use config::ClientConfig;
pub use http::HttpCollection;
pub use mirror::LocalMirror;
pub use session::Session;
