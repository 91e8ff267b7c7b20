//! Test fixtures: an in-memory store and series builders

use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;

use super::{SeriesStore, SeriesStream};
use crate::chunk::XorChunkBuilder;
use crate::proto::storepb::{AggrChunk, Series, SeriesRequest, SeriesResponse};
use crate::proto::Label;
use crate::read::ReadResult;

/// One scripted stream item
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Respond(SeriesResponse),
    Fail(tonic::Code, String),
}

/// Store replaying the same script for every call and recording requests
#[derive(Debug, Default)]
pub(crate) struct ScriptedStore {
    steps: Vec<Step>,
    open_error: Option<(tonic::Code, String)>,
    stall: bool,
    requests: Mutex<Vec<SeriesRequest>>,
}

impl ScriptedStore {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    pub(crate) fn responding(responses: Vec<SeriesResponse>) -> Self {
        Self::new(responses.into_iter().map(Step::Respond).collect())
    }

    /// A store whose calls fail before any stream is returned
    pub(crate) fn failing(code: tonic::Code, message: &str) -> Self {
        Self {
            open_error: Some((code, message.to_string())),
            ..Default::default()
        }
    }

    /// A store whose stream never yields
    pub(crate) fn stalled() -> Self {
        Self {
            stall: true,
            ..Default::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<SeriesRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SeriesStore for ScriptedStore {
    async fn series(&self, request: SeriesRequest) -> ReadResult<SeriesStream> {
        self.requests.lock().unwrap().push(request);

        if let Some((code, message)) = &self.open_error {
            return Err(tonic::Status::new(*code, message.clone()).into());
        }
        if self.stall {
            let pending = futures_util::stream::pending::<Result<SeriesResponse, tonic::Status>>();
            return Ok(pending.boxed());
        }

        let items: Vec<Result<SeriesResponse, tonic::Status>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Respond(response) => Ok(response.clone()),
                Step::Fail(code, message) => Err(tonic::Status::new(*code, message.clone())),
            })
            .collect();
        Ok(futures_util::stream::iter(items).boxed())
    }
}

pub(crate) fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
    pairs.iter().map(|(n, v)| Label::new(*n, *v)).collect()
}

pub(crate) fn xor_chunk(samples: &[(i64, f64)]) -> AggrChunk {
    let mut builder = XorChunkBuilder::new();
    for (t, v) in samples {
        builder.append(*t, *v).unwrap();
    }
    builder.into_aggr_chunk()
}

pub(crate) fn series(pairs: &[(&str, &str)], chunks: Vec<AggrChunk>) -> Series {
    Series {
        labels: labels(pairs),
        chunks,
    }
}
