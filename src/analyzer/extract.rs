use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cache::{read_with, SourceReader};
use crate::error::ExtractError;
use crate::parser::{traverse_ast, Node, Visitor};

/// Half-open range of source lines, `[start_line, start_line + line_count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: usize,
    pub line_count: usize,
}

impl SourceSpan {
    pub fn new(start_line: usize, line_count: usize) -> Self {
        Self {
            start_line,
            line_count,
        }
    }
}

#[derive(Default)]
struct LineBreakCounter(usize);

impl Visitor for LineBreakCounter {
    fn enter(&mut self, node: &Node) {
        if node.is_line_break() {
            self.0 += 1;
        }
    }
}

/// Count line-break markers at any depth under `nodes`.
pub fn count_line_breaks(nodes: &[Node]) -> usize {
    let mut counter = LineBreakCounter::default();
    for node in nodes {
        traverse_ast(node, &mut counter);
    }
    counter.0
}

/// Number of body lines under a call.
///
/// The call's own line marker sits inside its body and is not part of the
/// span, so one is subtracted. A body without markers spans zero lines.
pub fn body_line_count(body: &[Node]) -> usize {
    count_line_breaks(body).saturating_sub(1)
}

/// Remove one nesting level: a single leading tab, or exactly `width`
/// leading spaces. Anything else is left alone.
pub fn strip_indent(line: &str, width: usize) -> &str {
    if let Some(rest) = line.strip_prefix('\t') {
        return rest;
    }
    let leading = line.bytes().take(width).take_while(|&b| b == b' ').count();
    if leading == width {
        &line[width..]
    } else {
        line
    }
}

/// Slice `span` out of `source`, keeping each line's own terminator.
///
/// A span reaching past the end of the source yields whatever lines exist.
pub fn extract_lines(source: &str, span: SourceSpan, indent_width: usize) -> String {
    source
        .split_inclusive('\n')
        .skip(span.start_line)
        .take(span.line_count)
        .map(|line| strip_indent(line, indent_width))
        .collect()
}

/// Read `path` and extract `span` from it.
pub fn extract_span(
    reader: &dyn SourceReader,
    path: &Path,
    span: SourceSpan,
    indent_width: usize,
) -> Result<String, ExtractError> {
    let source = read_with(reader, path)?;
    Ok(extract_lines(&source, span, indent_width))
}
