use std::marker::PhantomData;

use futures::StreamExt;

use crate::pipeline::{Envelope, PipelineError, Sink};

/// Rows that made it through a table pipeline plus the per-row failures.
#[derive(Debug)]
pub struct Collected<T> {
    pub rows: Vec<Envelope<T>>,
    pub row_errors: Vec<PipelineError>,
}

impl<T> Default for Collected<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            row_errors: Vec::new(),
        }
    }
}

/// Terminal sink of a table pipeline: gathers rows in arrival order.
///
/// Row-level errors (malformed or rejected rows) are kept and the stream
/// continues; a source error aborts the table.
pub struct CollectSink<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for CollectSink<T> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<T: Send + 'static> Sink<T> for CollectSink<T> {
    type Output = Collected<T>;

    async fn run<S>(&self, mut input: S) -> Result<Collected<T>, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut collected = Collected::default();

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => collected.rows.push(env),
                Err(e @ PipelineError::Source(_)) | Err(e @ PipelineError::Sink(_)) => {
                    tracing::error!(error = %e, "table source failed");
                    return Err(e);
                }
                Err(e) => {
                    tracing::debug!(error = %e, "row skipped");
                    collected.row_errors.push(e);
                }
            }
        }

        Ok(collected)
    }
}
