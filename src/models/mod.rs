//! Core data models for the upload service.
//!
//! None of these are persisted as records; the only durable artifact is the
//! file a `StoredObject` points at.

pub mod caller;
pub mod upload;
