//! Intake — the single entry point transports call: gate first, then pipeline.

use crate::{
    models::{
        caller::CallerId,
        upload::{Ingested, UploadRequest},
    },
    services::{
        access_gate::AccessGate,
        ingest_service::{IngestError, Ingestor},
    },
};
use bytes::Bytes;
use futures::Stream;
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("you do not have access to this service")]
    Unauthorized(CallerId),
    #[error(transparent)]
    Rejected(#[from] IngestError),
}

pub type SubmitResult<T> = Result<T, SubmitError>;

#[derive(Clone)]
pub struct Intake {
    gate: Arc<AccessGate>,
    ingestor: Arc<Ingestor>,
}

impl Intake {
    pub fn new(gate: AccessGate, ingestor: Ingestor) -> Self {
        Self {
            gate: Arc::new(gate),
            ingestor: Arc::new(ingestor),
        }
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Submit an already buffered payload.
    #[instrument(
        name = "submit",
        skip_all,
        fields(caller = %request.caller, original_name = %request.original_name)
    )]
    pub async fn submit(&self, request: UploadRequest) -> SubmitResult<Ingested> {
        self.admit(request.caller, &request.original_name)?;
        let done = self
            .ingestor
            .ingest(&request.content, &request.original_name)
            .await?;
        Ok(done)
    }

    /// Submit a payload that is still arriving.
    ///
    /// `content` is not polled unless the caller is admitted.
    #[instrument(name = "submit", skip_all, fields(caller = %caller, original_name = %original_name))]
    pub async fn submit_stream<S>(
        &self,
        caller: CallerId,
        original_name: &str,
        content: S,
    ) -> SubmitResult<Ingested>
    where
        S: Stream<Item = io::Result<Bytes>> + Send,
    {
        self.admit(caller, original_name)?;
        let done = self.ingestor.ingest_stream(original_name, content).await?;
        Ok(done)
    }

    fn admit(&self, caller: CallerId, original_name: &str) -> SubmitResult<()> {
        if self.gate.authorize_with_preview(caller, original_name) {
            Ok(())
        } else {
            Err(SubmitError::Unauthorized(caller))
        }
    }
}
