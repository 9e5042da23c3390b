pub mod access_gate;
pub mod ingest_service;
pub mod intake_service;
