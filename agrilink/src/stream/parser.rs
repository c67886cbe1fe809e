// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Frame parser.
//
// Turns the raw chunk sequence into complete frames. Bytes are buffered
// until a full line is available, so frames and multi-byte characters
// split across chunk boundaries decode exactly as if they had arrived
// in one piece.

use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;

use super::types::Frame;
use crate::transport::ConnectionError;

// ---------------------------------------------------------------------------
// Incremental parser
// ---------------------------------------------------------------------------

/// Incremental SSE frame parser.
///
/// Feed chunks with [`FrameParser::push`]; call [`FrameParser::finish`]
/// once the stream has ended to flush a final frame that lacked its
/// trailing blank line.
#[derive(Debug, Default)]
pub struct FrameParser {
    /// Bytes after the last newline seen.
    line_buffer: Vec<u8>,
    /// Fields of the frame being assembled.
    event: Option<String>,
    data_lines: Vec<String>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning every frame it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.line_buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(newline_pos) = self.line_buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.line_buffer.drain(..=newline_pos).collect();
            if let Some(frame) = self.process_line(&line[..line.len() - 1]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush whatever is left at end of stream.
    pub fn finish(&mut self) -> Option<Frame> {
        let rest = std::mem::take(&mut self.line_buffer);
        if !rest.is_empty() {
            if let Some(frame) = self.process_line(&rest) {
                return Some(frame);
            }
        }
        self.dispatch()
    }

    /// Whether a partial line or frame is buffered.
    pub fn has_pending(&self) -> bool {
        !self.line_buffer.is_empty() || self.event.is_some() || !self.data_lines.is_empty()
    }

    fn process_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);

        // Blank line: frame boundary
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data_lines.push(value.to_string()),
            "id" | "retry" => {}
            other => {
                tracing::debug!(field = other, "ignoring unknown SSE field");
            }
        }
        None
    }

    fn dispatch(&mut self) -> Option<Frame> {
        let event = self.event.take();
        let data_lines = std::mem::take(&mut self.data_lines);
        if event.is_none() && data_lines.is_empty() {
            return None;
        }
        Some(Frame {
            event,
            data: data_lines.join("\n"),
        })
    }
}

// ---------------------------------------------------------------------------
// Stream adapter
// ---------------------------------------------------------------------------

struct FrameStreamState<S> {
    chunks: S,
    parser: FrameParser,
    ready: VecDeque<Frame>,
    done: bool,
}

/// Lazily decode a chunk stream into frames.
///
/// A clean end of input flushes the final frame. A transport error is
/// passed through and ends the frame stream; the partial frame is
/// discarded.
pub fn frames<S>(chunks: S) -> impl Stream<Item = Result<Frame, ConnectionError>>
where
    S: Stream<Item = Result<Bytes, ConnectionError>> + Unpin,
{
    let state = FrameStreamState {
        chunks,
        parser: FrameParser::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            if state.done {
                return None;
            }
            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    let completed = state.parser.push(&chunk);
                    state.ready.extend(completed);
                }
                Some(Err(e)) => {
                    state.done = true;
                    if state.parser.has_pending() {
                        tracing::debug!("discarding partial frame after transport error");
                    }
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    let last = state.parser.finish();
                    state.ready.extend(last);
                }
            }
        }
    })
}
