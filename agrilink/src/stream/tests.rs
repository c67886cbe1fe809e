// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Tests for frame parsing and event decoding
//
// Tests cover:
//  1. Frames split at arbitrary chunk boundaries
//  2. Multi-byte characters split across chunks
//  3. Multi-line data, comments, CRLF, unknown fields
//  4. End-of-stream flush of an unterminated frame
//  5. Transport errors passed through the frame stream
//  6. Typed decoding by payload-level and frame-level names
//  7. Shape heuristics and plain-text degradation

use super::*;
use crate::transport::ConnectionError;
use bytes::Bytes;
use futures_util::stream;
use serde_json::json;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_all(chunks: &[&[u8]]) -> Vec<Frame> {
    let mut parser = FrameParser::new();
    let mut out = Vec::new();
    for chunk in chunks {
        out.extend(parser.push(chunk));
    }
    out.extend(parser.finish());
    out
}

fn chunk_stream(
    chunks: Vec<Result<&'static [u8], ConnectionError>>,
) -> impl stream::Stream<Item = Result<Bytes, ConnectionError>> + Unpin {
    stream::iter(
        chunks
            .into_iter()
            .map(|c| c.map(Bytes::from_static))
            .collect::<Vec<_>>(),
    )
}

fn decode(event: Option<&str>, data: &str) -> Event {
    EventDecoder::new().decode(&Frame::new(event, data))
}

// ---------------------------------------------------------------------------
// Frame parser
// ---------------------------------------------------------------------------

#[test]
fn split_frame_reassembles_across_chunks() {
    let frames = parse_all(&[b"data: hel", b"lo\n\n"]);
    assert_eq!(frames, vec![Frame::untyped("hello")]);
}

#[test]
fn every_split_point_yields_same_frames() {
    let input: &[u8] = b"event: status\ndata: Checking soil\n\ndata: {\"agent\":\"pest\"}\n\n";
    let whole = parse_all(&[input]);
    assert_eq!(whole.len(), 2);
    for split in 0..input.len() {
        let (a, b) = input.split_at(split);
        assert_eq!(parse_all(&[a, b]), whole, "split at {split}");
    }
}

#[test]
fn multibyte_char_split_across_chunks() {
    let text = "data: Soil moisture \u{2014} 30%\n\n".as_bytes();
    // Split inside the three-byte em dash.
    let pos = text.iter().position(|&b| b == 0xE2).unwrap() + 1;
    let frames = parse_all(&[&text[..pos], &text[pos..]]);
    assert_eq!(frames, vec![Frame::untyped("Soil moisture \u{2014} 30%")]);
}

#[test]
fn multiple_frames_in_one_chunk() {
    let frames = parse_all(&[b"event: connected\ndata: Connection established\n\nevent: complete\ndata: done\n\n"]);
    assert_eq!(
        frames,
        vec![
            Frame::new(Some("connected"), "Connection established"),
            Frame::new(Some("complete"), "done"),
        ]
    );
}

#[test]
fn multi_line_data_joined_with_newline() {
    let frames = parse_all(&[b"event: final_response\ndata: # Diagnosis\ndata: - Aphids\n\n"]);
    assert_eq!(frames[0].data, "# Diagnosis\n- Aphids");
}

#[test]
fn crlf_line_endings_accepted() {
    let frames = parse_all(&[b"event: status\r\ndata: Working\r\n\r\n"]);
    assert_eq!(frames, vec![Frame::new(Some("status"), "Working")]);
}

#[test]
fn comments_and_unknown_fields_ignored() {
    let frames = parse_all(&[b": ping\nid: 7\nretry: 1000\nfoo: bar\ndata: x\n\n"]);
    assert_eq!(frames, vec![Frame::untyped("x")]);
}

#[test]
fn comment_only_block_produces_no_frame() {
    assert!(parse_all(&[b": keep-alive\n\n"]).is_empty());
}

#[test]
fn data_without_space_after_colon() {
    let frames = parse_all(&[b"data:tight\n\n"]);
    assert_eq!(frames[0].data, "tight");
}

#[test]
fn only_one_leading_space_stripped() {
    let frames = parse_all(&[b"data:   indented\n\n"]);
    assert_eq!(frames[0].data, "  indented");
}

#[test]
fn unterminated_frame_flushed_at_end() {
    let frames = parse_all(&[b"event: final_response\ndata: Apply neem oil"]);
    assert_eq!(frames, vec![Frame::new(Some("final_response"), "Apply neem oil")]);
}

#[test]
fn frame_missing_only_blank_line_flushed_at_end() {
    let frames = parse_all(&[b"data: last\n"]);
    assert_eq!(frames, vec![Frame::untyped("last")]);
}

#[test]
fn has_pending_tracks_partial_input() {
    let mut parser = FrameParser::new();
    assert!(!parser.has_pending());
    assert!(parser.push(b"data: par").is_empty());
    assert!(parser.has_pending());
    assert_eq!(parser.push(b"t\n\n").len(), 1);
    assert!(!parser.has_pending());
}

#[test]
fn finish_on_empty_parser_is_none() {
    assert!(FrameParser::new().finish().is_none());
}

// ---------------------------------------------------------------------------
// Frame stream adapter
// ---------------------------------------------------------------------------

#[tokio::test]
async fn frame_stream_yields_frames_then_flushes() {
    let input = chunk_stream(vec![
        Ok(&b"event: status\ndata: one\n\ndata: tw"[..]),
        Ok(&b"o"[..]),
    ]);
    let out: Vec<_> = Box::pin(frames(input)).collect().await;
    assert_eq!(
        out,
        vec![
            Ok(Frame::new(Some("status"), "one")),
            Ok(Frame::untyped("two")),
        ]
    );
}

#[tokio::test]
async fn frame_stream_passes_error_and_stops() {
    let input = chunk_stream(vec![
        Ok(&b"data: first\n\ndata: partial"[..]),
        Err(ConnectionError::Stream("reset".into())),
        Ok(&b"\n\ndata: never\n\n"[..]),
    ]);
    let out: Vec<_> = Box::pin(frames(input)).collect().await;
    assert_eq!(
        out,
        vec![
            Ok(Frame::untyped("first")),
            Err(ConnectionError::Stream("reset".into())),
        ]
    );
}

#[tokio::test]
async fn frame_stream_on_empty_body_is_empty() {
    let out: Vec<_> = Box::pin(frames(chunk_stream(vec![]))).collect().await;
    assert!(out.is_empty());
}

// ---------------------------------------------------------------------------
// Decoder: typed events
// ---------------------------------------------------------------------------

#[test]
fn payload_event_field_takes_precedence() {
    let event = decode(
        Some("status"),
        r#"{"event":"agent_result","agent":"pest","response":"Aphids"}"#,
    );
    assert_eq!(
        event,
        Event::AgentResult {
            agent_name: "pest".into(),
            response: json!("Aphids"),
        }
    );
}

#[test]
fn frame_name_used_when_payload_has_none() {
    assert_eq!(decode(Some("connected"), "Connection established"), Event::Connected);
    assert_eq!(decode(Some("complete"), "Query processing completed successfully!"), Event::Complete);
    assert_eq!(decode(Some("timeout"), ""), Event::Timeout);
}

#[test]
fn unknown_payload_event_falls_back_to_frame_name() {
    let event = decode(Some("status"), r#"{"event":"mystery","message":"Running pest agent"}"#);
    assert_eq!(event, Event::Status(Some("Running pest agent".into())));
}

#[test]
fn status_text_and_empty_status() {
    assert_eq!(decode(Some("status"), "Analyzing"), Event::Status(Some("Analyzing".into())));
    assert_eq!(decode(Some("status"), r#"{"event":"status"}"#), Event::Status(None));
    assert_eq!(decode(Some("progress"), "step 2"), Event::Status(Some("step 2".into())));
}

#[test]
fn meta_keeps_whole_object() {
    let data = r#"{"intent_classification":{"intent":"pest"},"agents_run":["pest"],"success_count":1}"#;
    match decode(Some("meta"), data) {
        Event::Meta(value) => assert_eq!(value["agents_run"], json!(["pest"])),
        other => panic!("expected Meta, got {other:?}"),
    }
}

#[test]
fn meta_with_text_payload_degrades_to_plain_status() {
    assert_eq!(decode(Some("meta"), "not json"), Event::PlainStatus("not json".into()));
}

#[test]
fn agent_result_object_response_preserved() {
    let data = r#"{"agent":"weather","response":{"forecast":"rain","mm":12}}"#;
    assert_eq!(
        decode(Some("agent_result"), data),
        Event::AgentResult {
            agent_name: "weather".into(),
            response: json!({"forecast": "rain", "mm": 12}),
        }
    );
}

#[test]
fn agent_result_without_agent_is_raw_structured() {
    let data = r#"{"response":"orphan"}"#;
    assert_eq!(
        decode(Some("agent_result"), data),
        Event::RawStructured(json!({"response": "orphan"}))
    );
}

#[test]
fn final_response_plain_and_structured() {
    assert_eq!(
        decode(Some("final_response"), "# Diagnosis\n- Aphids detected"),
        Event::FinalResponse("# Diagnosis\n- Aphids detected".into())
    );
    assert_eq!(
        decode(None, r#"{"event":"final_response","response":"Spray neem"}"#),
        Event::FinalResponse("Spray neem".into())
    );
}

#[test]
fn error_messages_extracted() {
    assert_eq!(
        decode(Some("error"), r#"{"error":"Orchestrator unavailable"}"#),
        Event::Error("Orchestrator unavailable".into())
    );
    assert_eq!(
        decode(Some("processing_error"), "agent crashed"),
        Event::ProcessingError("agent crashed".into())
    );
    assert_eq!(decode(Some("error"), ""), Event::Error("unknown error".into()));
}

#[test]
fn warning_keep_alive_and_trace() {
    assert_eq!(decode(Some("warning"), "slow agent"), Event::Warning("slow agent".into()));
    assert_eq!(decode(Some("keep_alive"), "ping"), Event::KeepAlive);
    assert_eq!(decode(Some("trace"), "Traceback..."), Event::Trace("Traceback...".into()));
}

// ---------------------------------------------------------------------------
// Decoder: heuristics and fallback
// ---------------------------------------------------------------------------

#[test]
fn untyped_agent_shape_becomes_agent_result() {
    for key in ["agent", "agentName", "agent_name"] {
        let data = json!({ key: "soil", "response": "pH 6.5" }).to_string();
        assert_eq!(
            decode(None, &data),
            Event::AgentResult {
                agent_name: "soil".into(),
                response: json!("pH 6.5"),
            },
            "key {key}"
        );
    }
}

#[test]
fn untyped_summary_shape_becomes_meta() {
    let data = r#"{"success_count":2,"error_count":0}"#;
    assert!(matches!(decode(None, data), Event::Meta(_)));
}

#[test]
fn unrecognized_object_is_raw_structured() {
    assert_eq!(decode(None, r#"{"foo":1}"#), Event::RawStructured(json!({"foo": 1})));
}

#[test]
fn plain_text_untyped_is_plain_status() {
    assert_eq!(
        decode(None, "Processing completed successfully!"),
        Event::PlainStatus("Processing completed successfully!".into())
    );
}

#[test]
fn unknown_frame_name_with_text_is_plain_status() {
    assert_eq!(
        decode(Some("agent_running"), "Running pest agent"),
        Event::PlainStatus("Running pest agent".into())
    );
}

#[test]
fn malformed_json_degrades_to_plain_status() {
    assert_eq!(decode(None, "{not json"), Event::PlainStatus("{not json".into()));
}

#[test]
fn json_scalars_are_text() {
    assert_eq!(decode(None, "42"), Event::PlainStatus("42".into()));
}

#[test]
fn blank_untyped_frame_is_keep_alive() {
    assert_eq!(decode(None, "  "), Event::KeepAlive);
}
