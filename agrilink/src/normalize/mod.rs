// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

// Content normalization applied to every assistant content write.
//
// Orchestrator text is Markdown produced by an LLM, and it frequently
// glues a list or heading directly under a paragraph line. Renderers
// then fold the marker into the paragraph. The normalizer separates
// such blocks with a blank line. It is idempotent: normalizing
// already-normalized content returns the same result.

use regex::Regex;
use std::sync::LazyLock;

// ---------------------------------------------------------------------------
// Trait: Normalizer
// ---------------------------------------------------------------------------

/// Pure string normalizer. Implementations must be Send + Sync so one
/// instance can be shared by every session.
pub trait Normalizer: Send + Sync {
    /// Normalize a single string. The result must be idempotent:
    /// `normalize(normalize(x)) == normalize(x)` for all `x`.
    fn normalize(&self, input: &str) -> String;
}

// ---------------------------------------------------------------------------
// Implementation: BlockSpacingNormalizer
// ---------------------------------------------------------------------------

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d{1,9}[.)])\s").expect("valid list regex"));

static HEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s{0,3}#{1,6}(?:\s|$)").expect("valid heading regex"));

/// Inserts a blank line before any list item or heading line whose
/// previous line is non-blank. Lines inside fenced code blocks are left
/// untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockSpacingNormalizer;

impl BlockSpacingNormalizer {
    pub fn new() -> Self {
        Self
    }
}

impl Normalizer for BlockSpacingNormalizer {
    fn normalize(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len() + 16);
        let mut prev_blank = true;
        let mut in_fence = false;

        for (i, line) in input.split('\n').enumerate() {
            if i > 0 {
                if !in_fence && !prev_blank && starts_block(line) {
                    out.push('\n');
                }
                out.push('\n');
            }
            out.push_str(line);

            if is_fence(line) {
                in_fence = !in_fence;
            }
            prev_blank = line.trim().is_empty();
        }

        out
    }
}

/// Whether a line opens a list item or a heading.
pub fn starts_block(line: &str) -> bool {
    LIST_MARKER.is_match(line) || HEADING_MARKER.is_match(line)
}

fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}
