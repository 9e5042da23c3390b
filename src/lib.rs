//! Authenticated media upload service.
//!
//! Callers on an allow-list submit a file and get back a public URL for it.
//! [`services::intake_service::Intake`] is the entry point: it runs the
//! [`services::access_gate::AccessGate`] and, if admitted, the
//! [`services::ingest_service::Ingestor`] pipeline.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
