// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Response stream decoding.
//
// Responsibilities:
// - Reassemble SSE frames from arbitrarily split byte chunks
// - Accept CRLF line endings and skip comments and unknown fields
// - Flush a final frame that lacks its trailing blank line
// - Classify each frame into exactly one internal `Event`
// - Degrade unparseable payloads to plain status text, never an error

mod decoder;
mod parser;
mod types;

pub use decoder::EventDecoder;
pub use parser::{frames, FrameParser};
pub use types::{Event, EventKind, Frame};

#[cfg(test)]
mod tests;
