//! Streaming validation: a lazy source of records in, a lazy sequence of
//! per-record outcomes out, terminated by exactly one summary.
//!
//! Scheduling is single-threaded cooperative: one record is pulled,
//! validated, and emitted before the next is requested, so output order
//! always equals input order and an abandoned consumer never drains the
//! source. Failures of the validator itself (as opposed to data failing
//! rules) are captured into the entry under a `validation` pseudo-field
//! and the stream continues.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::Stream;
use tokio_stream::StreamExt;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::async_validator::CancelHandle;
use crate::config::StreamOptions;
use crate::error::EngineError;
use crate::rule::{ErrorMap, FieldError};
use crate::validator::ValidationCore;

/// Field-keyed error lists flattened to plain text, preserving insertion
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextErrorMap {
    entries: Vec<(String, Vec<String>)>,
}

impl TextErrorMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, list)| list.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, list)| (name.as_str(), list.as_slice()))
    }

    fn push_entry(&mut self, field: String, list: Vec<String>) {
        self.entries.push((field, list));
    }

    /// Flattens structured `{message, code}` entries to their messages.
    pub fn from_error_map(errors: &ErrorMap) -> Self {
        let mut flat = TextErrorMap::default();
        for (field, list) in errors.iter() {
            flat.push_entry(
                field.to_string(),
                list.iter().map(flatten_field_error).collect(),
            );
        }
        flat
    }

    /// Normalizes an untyped error mapping: list entries may be structured
    /// objects carrying `message`, raw text, or arbitrary values that
    /// degrade to their textual rendering; a null or non-object map
    /// degrades to no errors.
    pub fn from_value(errors: &Value) -> Self {
        let mut flat = TextErrorMap::default();
        let Value::Object(map) = errors else {
            return flat;
        };
        for (field, list) in map {
            let texts = match list {
                Value::Array(items) => items.iter().map(flatten_error_value).collect(),
                other => vec![flatten_error_value(other)],
            };
            flat.push_entry(field.clone(), texts);
        }
        flat
    }
}

fn flatten_field_error(error: &FieldError) -> String {
    error.message.clone()
}

fn flatten_error_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => Value::Object(map.clone()).to_string(),
        },
        other => other.to_string(),
    }
}

impl Serialize for TextErrorMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, list) in &self.entries {
            map.serialize_entry(field, list)?;
        }
        map.end()
    }
}

/// One element of the output sequence.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEntry {
    /// The record this entry describes.
    pub chunk: Value,
    /// Zero-based position in the source.
    pub index: usize,
    pub is_valid: bool,
    pub errors: TextErrorMap,
    /// Records processed so far, this one included.
    pub total_processed: usize,
}

/// Aggregate counters produced exactly once at stream end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingSummary {
    pub total_processed: usize,
    pub total_valid: usize,
    pub total_invalid: usize,
    pub total_errors: usize,
    /// Wall-clock milliseconds for the whole run.
    #[serde(rename = "processingTime")]
    pub processing_time_ms: f64,
    #[serde(rename = "averageTimePerItem")]
    pub average_time_per_item_ms: f64,
}

/// Output of a streaming run: per-record entries, then one summary.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Entry(StreamEntry),
    Summary(StreamingSummary),
}

impl StreamEvent {
    pub fn as_entry(&self) -> Option<&StreamEntry> {
        match self {
            StreamEvent::Entry(entry) => Some(entry),
            StreamEvent::Summary(_) => None,
        }
    }

    pub fn as_summary(&self) -> Option<&StreamingSummary> {
        match self {
            StreamEvent::Summary(summary) => Some(summary),
            StreamEvent::Entry(_) => None,
        }
    }
}

/// Observability callback fired every `chunk_size` records.
pub type ChunkCallback = Arc<dyn Fn(&ChunkInfo) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct ChunkInfo {
    /// One-based chunk ordinal.
    pub chunk_index: usize,
    pub records_processed: usize,
}

struct StreamProgress {
    index: usize,
    valid: usize,
    invalid: usize,
    errors: usize,
    started: Instant,
}

impl StreamProgress {
    fn new() -> Self {
        Self {
            index: 0,
            valid: 0,
            invalid: 0,
            errors: 0,
            started: Instant::now(),
        }
    }

    fn absorb(&mut self, entry: &StreamEntry) {
        self.index += 1;
        if entry.is_valid {
            self.valid += 1;
        } else {
            self.invalid += 1;
        }
        self.errors += entry.errors.total();
    }

    fn summary(&self) -> StreamingSummary {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1_000.0;
        StreamingSummary {
            total_processed: self.index,
            total_valid: self.valid,
            total_invalid: self.invalid,
            total_errors: self.errors,
            processing_time_ms: elapsed_ms,
            average_time_per_item_ms: if self.index == 0 {
                0.0
            } else {
                elapsed_ms / self.index as f64
            },
        }
    }
}

fn entry_for(core: &ValidationCore, record: Value, progress: &StreamProgress, opts: &StreamOptions) -> StreamEntry {
    let index = progress.index;
    match core.validate_sync(&record, &opts.per_record) {
        Ok(report) => StreamEntry {
            chunk: record,
            index,
            is_valid: report.is_valid,
            errors: TextErrorMap::from_error_map(&report.errors),
            total_processed: index + 1,
        },
        Err(failure) => StreamEntry {
            chunk: record,
            index,
            is_valid: false,
            errors: captured_failure(&failure),
            total_processed: index + 1,
        },
    }
}

fn captured_failure(failure: &EngineError) -> TextErrorMap {
    let mut errors = TextErrorMap::default();
    errors.push_entry(
        "validation".to_string(),
        vec![format!("Validation error: {failure}")],
    );
    errors
}

fn fire_chunk_callback(opts: &StreamOptions, on_chunk: &Option<ChunkCallback>, processed: usize) {
    if let Some(callback) = on_chunk {
        if opts.chunk_size > 0 && processed % opts.chunk_size == 0 {
            callback(&ChunkInfo {
                chunk_index: processed / opts.chunk_size,
                records_processed: processed,
            });
        }
    }
}

/// Lazy validation over an iterator source.
///
/// Yields one [`StreamEvent::Entry`] per source record, then exactly one
/// [`StreamEvent::Summary`]. Dropping the iterator early never pulls
/// another record; a raised cancel handle ends the run with a partial
/// summary covering the records already processed.
pub struct ValidationStream<'e, I>
where
    I: Iterator<Item = Value>,
{
    core: &'e ValidationCore,
    source: I,
    opts: StreamOptions,
    on_chunk: Option<ChunkCallback>,
    cancel: Option<CancelHandle>,
    progress: StreamProgress,
    finished: bool,
}

impl<'e, I> ValidationStream<'e, I>
where
    I: Iterator<Item = Value>,
{
    pub(crate) fn new(
        core: &'e ValidationCore,
        source: I,
        opts: StreamOptions,
        on_chunk: Option<ChunkCallback>,
        cancel: Option<CancelHandle>,
    ) -> Self {
        Self {
            core,
            source,
            opts,
            on_chunk,
            cancel,
            progress: StreamProgress::new(),
            finished: false,
        }
    }
}

impl<'e, I> Iterator for ValidationStream<'e, I>
where
    I: Iterator<Item = Value>,
{
    type Item = StreamEvent;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let cancelled = self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled);
        let record = if cancelled { None } else { self.source.next() };

        match record {
            Some(record) => {
                let entry = entry_for(self.core, record, &self.progress, &self.opts);
                self.progress.absorb(&entry);
                fire_chunk_callback(&self.opts, &self.on_chunk, self.progress.index);
                Some(StreamEvent::Entry(entry))
            }
            None => {
                self.finished = true;
                Some(StreamEvent::Summary(self.progress.summary()))
            }
        }
    }
}

/// Async adapter: same contract as [`ValidationStream`], over an async
/// source, awaiting async predicates per record.
pub(crate) fn stream_events_async<'e, S>(
    core: &'e ValidationCore,
    source: S,
    opts: StreamOptions,
    on_chunk: Option<ChunkCallback>,
    cancel: Option<CancelHandle>,
) -> impl Stream<Item = StreamEvent> + 'e
where
    S: Stream<Item = Value> + Unpin + Send + 'e,
{
    struct State<'e, S> {
        core: &'e ValidationCore,
        source: S,
        opts: StreamOptions,
        on_chunk: Option<ChunkCallback>,
        cancel: Option<CancelHandle>,
        progress: StreamProgress,
        finished: bool,
    }

    futures::stream::unfold(
        State {
            core,
            source,
            opts,
            on_chunk,
            cancel,
            progress: StreamProgress::new(),
            finished: false,
        },
        |mut state| async move {
            if state.finished {
                return None;
            }

            let cancelled = state.cancel.as_ref().is_some_and(CancelHandle::is_cancelled);
            let record = if cancelled {
                None
            } else {
                state.source.next().await
            };

            let event = match record {
                Some(record) => {
                    let index = state.progress.index;
                    let outcome = state
                        .core
                        .validate_async(&record, &state.opts.per_record, None)
                        .await;
                    let entry = match outcome {
                        Ok(report) => StreamEntry {
                            chunk: record,
                            index,
                            is_valid: report.is_valid,
                            errors: TextErrorMap::from_error_map(&report.errors),
                            total_processed: index + 1,
                        },
                        Err(failure) => StreamEntry {
                            chunk: record,
                            index,
                            is_valid: false,
                            errors: captured_failure(&failure),
                            total_processed: index + 1,
                        },
                    };
                    state.progress.absorb(&entry);
                    fire_chunk_callback(&state.opts, &state.on_chunk, state.progress.index);
                    StreamEvent::Entry(entry)
                }
                None => {
                    state.finished = true;
                    StreamEvent::Summary(state.progress.summary())
                }
            };
            Some((event, state))
        },
    )
}
