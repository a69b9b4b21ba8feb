use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a code line is introduced in the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    /// `- code`
    Control,
    /// `= code`
    Output,
    /// `== code`
    UnescapedOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkupKind {
    Tag,
    Text,
    Comment,
    Html,
    /// `javascript:`, `css:`, `markdown:` and other embedded engines.
    Embedded,
}

/// A node of a parsed template.
///
/// Every physical source line contributes exactly one `LineBreak`, so the
/// number of markers under a node is the number of lines it spans. A node
/// opened on a line keeps that line's marker as its first child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    LineBreak,
    Call {
        kind: CallKind,
        code: String,
        children: Vec<Node>,
    },
    Markup {
        kind: MarkupKind,
        text: String,
        children: Vec<Node>,
    },
    Container {
        children: Vec<Node>,
    },
}

impl Node {
    pub fn container(children: Vec<Node>) -> Self {
        Node::Container { children }
    }

    /// Ordered children; empty for a line break.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::LineBreak => &[],
            Node::Call { children, .. }
            | Node::Markup { children, .. }
            | Node::Container { children } => children,
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::LineBreak => None,
            Node::Call { children, .. }
            | Node::Markup { children, .. }
            | Node::Container { children } => Some(children),
        }
    }

    pub fn is_line_break(&self) -> bool {
        matches!(self, Node::LineBreak)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: malformed indentation")]
    MalformedIndentation { line: usize },
    #[error("line {line}: expected code after `{indicator}`")]
    MissingCode { line: usize, indicator: &'static str },
}

/// Parse template source into a `Node::Container` root.
///
/// Lines are nested by indentation: a deeper line belongs to the previous
/// non-blank line, an equal one is its sibling. Text (`|`), comment (`/`)
/// and embedded engine (`javascript:`) lines swallow everything indented
/// below them verbatim. A leading byte-order mark is ignored.
pub fn parse_template(source: &str) -> Result<Node, ParseError> {
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    let mut parser = TemplateParser::new();
    for (idx, line) in source.lines().enumerate() {
        parser.parse_line(idx + 1, line)?;
    }
    Ok(parser.finish())
}

struct TemplateParser {
    /// Open nodes; `frames[0]` is the root and is never closed early.
    frames: Vec<Node>,
    /// Indentation of each open node, `frames.len() == indents.len() + 1`
    /// once the first line is seen.
    indents: Vec<usize>,
    /// Indentation of the verbatim block currently swallowing lines.
    verbatim: Option<usize>,
}

impl TemplateParser {
    fn new() -> Self {
        Self {
            frames: vec![Node::container(Vec::new())],
            indents: Vec::new(),
            verbatim: None,
        }
    }

    fn push_child(&mut self, node: Node) {
        if let Some(children) = self.frames.last_mut().and_then(Node::children_mut) {
            children.push(node);
        }
    }

    fn close_frame(&mut self) {
        if self.frames.len() > 1 {
            if let Some(node) = self.frames.pop() {
                self.push_child(node);
            }
        }
    }

    fn open(&mut self, node: Node) {
        self.frames.push(node);
        self.push_child(Node::LineBreak);
    }

    fn parse_line(&mut self, lineno: usize, line: &str) -> Result<(), ParseError> {
        let indent = indentation(line);
        let content = line[indent..].trim_end();

        if content.is_empty() {
            self.push_child(Node::LineBreak);
            return Ok(());
        }

        if let Some(level) = self.verbatim {
            if indent > level {
                self.push_child(Node::Markup {
                    kind: MarkupKind::Text,
                    text: content.to_string(),
                    children: vec![Node::LineBreak],
                });
                return Ok(());
            }
            self.verbatim = None;
        }

        self.enter_level(lineno, indent)?;
        let node = parse_indicator(lineno, content)?;
        if matches!(
            node,
            Node::Markup {
                kind: MarkupKind::Text | MarkupKind::Comment | MarkupKind::Embedded,
                ..
            }
        ) {
            self.verbatim = Some(indent);
        }
        self.open(node);
        Ok(())
    }

    /// Close whatever the new line ends and leave the stack ready for it.
    fn enter_level(&mut self, lineno: usize, indent: usize) -> Result<(), ParseError> {
        let Some(&last) = self.indents.last() else {
            self.indents.push(indent);
            return Ok(());
        };
        if indent > last {
            self.indents.push(indent);
            return Ok(());
        }

        while self.indents.len() > 1 && self.indents.last().is_some_and(|&open| open > indent) {
            self.indents.pop();
            self.close_frame();
        }
        if self.indents.last() != Some(&indent) {
            return Err(ParseError::MalformedIndentation { line: lineno });
        }
        // the previous node at this level is complete
        self.close_frame();
        Ok(())
    }

    fn finish(mut self) -> Node {
        while self.frames.len() > 1 {
            self.close_frame();
        }
        self.frames
            .pop()
            .unwrap_or_else(|| Node::container(Vec::new()))
    }
}

fn indentation(line: &str) -> usize {
    line.bytes().take_while(|b| matches!(b, b' ' | b'\t')).count()
}

fn parse_indicator(line: usize, content: &str) -> Result<Node, ParseError> {
    let call = |kind: CallKind, rest: &str, indicator: &'static str| {
        let code = rest.trim();
        if code.is_empty() {
            return Err(ParseError::MissingCode { line, indicator });
        }
        Ok(Node::Call {
            kind,
            code: code.to_string(),
            children: Vec::new(),
        })
    };
    let markup = |kind: MarkupKind, text: &str| Node::Markup {
        kind,
        text: text.to_string(),
        children: Vec::new(),
    };

    if let Some(rest) = content.strip_prefix("==") {
        call(CallKind::UnescapedOutput, rest, "==")
    } else if let Some(rest) = content.strip_prefix('=') {
        call(CallKind::Output, rest, "=")
    } else if let Some(rest) = content.strip_prefix('-') {
        call(CallKind::Control, rest, "-")
    } else if let Some(rest) = content.strip_prefix(|c: char| c == '|' || c == '\'') {
        Ok(markup(MarkupKind::Text, rest.strip_prefix(' ').unwrap_or(rest)))
    } else if let Some(rest) = content.strip_prefix('/') {
        Ok(markup(MarkupKind::Comment, rest.trim_start()))
    } else if content.starts_with('<') {
        Ok(markup(MarkupKind::Html, content))
    } else if let Some(engine) = embedded_engine(content) {
        Ok(markup(MarkupKind::Embedded, engine))
    } else {
        Ok(markup(MarkupKind::Tag, content))
    }
}

/// `name:` alone on a line opens an embedded engine block.
fn embedded_engine(content: &str) -> Option<&str> {
    content
        .strip_suffix(':')
        .map(str::trim_end)
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

pub trait Visitor {
    fn enter(&mut self, _node: &Node) {}
    fn exit(&mut self, _node: &Node) {}
}

pub fn traverse_ast(node: &Node, visitor: &mut dyn Visitor) {
    visitor.enter(node);
    for child in node.children() {
        traverse_ast(child, visitor);
    }
    visitor.exit(node);
}
