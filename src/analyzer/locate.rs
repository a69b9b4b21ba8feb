use regex::Regex;

use super::extract::{body_line_count, count_line_breaks, SourceSpan};
use crate::parser::Node;

/// `method` followed by a quoted argument; `single` and `double` are the
/// regex fragments allowed between `'...'` and `"..."` respectively.
fn call_pattern(method: &str, single: &str, double: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"\b{}\s+(?:'{single}'|"{double}")"#,
        regex::escape(method)
    ))
}

/// Matches `method 'argument'` or `method "argument"` in a call's code.
///
/// Parenthesized calls and computed arguments are deliberately not matched.
#[derive(Debug, Clone)]
pub struct CallSiteQuery {
    method: String,
    argument: String,
    pattern: Regex,
}

impl CallSiteQuery {
    pub fn new(method: &str, argument: &str) -> Result<Self, regex::Error> {
        let arg = regex::escape(argument);
        let pattern = call_pattern(method, &arg, &arg)?;
        Ok(Self {
            method: method.to_string(),
            argument: argument.to_string(),
            pattern,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn argument(&self) -> &str {
        &self.argument
    }

    pub fn matches(&self, code: &str) -> bool {
        self.pattern.is_match(code)
    }
}

/// A matched invocation inside a parsed template.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    pub node: &'a Node,
    pub code: &'a str,
    pub body: &'a [Node],
    /// 0-indexed line of the invocation itself.
    pub call_line: usize,
    /// First line of the body.
    pub body_start: usize,
}

impl<'a> CallSite<'a> {
    fn new(node: &'a Node, call_line: usize) -> Option<Self> {
        match node {
            Node::Call { code, children, .. } => Some(Self {
                node,
                code,
                body: children,
                call_line,
                body_start: call_line + 1,
            }),
            _ => None,
        }
    }

    pub fn line_count(&self) -> usize {
        body_line_count(self.body)
    }

    pub fn span(&self) -> SourceSpan {
        SourceSpan::new(self.body_start, self.line_count())
    }
}

/// Top-level calls with the line each one starts on.
fn top_level_calls(ast: &Node) -> impl Iterator<Item = CallSite<'_>> + '_ {
    ast.children()
        .iter()
        .scan(0usize, |line, child| {
            let at = *line;
            *line += count_line_breaks(std::slice::from_ref(child));
            Some((at, child))
        })
        .filter_map(|(at, child)| CallSite::new(child, at))
}

/// Find the first top-level call matching `query`.
///
/// Only the root's direct children are scanned; invocations nested inside
/// other blocks are not considered.
pub fn locate<'a>(ast: &'a Node, query: &CallSiteQuery) -> Option<CallSite<'a>> {
    top_level_calls(ast).find(|site| query.matches(site.code))
}

/// Every top-level `method '...'` call, paired with its literal argument.
pub fn call_sites<'a>(
    ast: &'a Node,
    method: &str,
) -> Result<Vec<(String, CallSite<'a>)>, regex::Error> {
    let pattern = call_pattern(method, "([^']*)", r#"([^"]*)"#)?;
    Ok(top_level_calls(ast)
        .filter_map(|site| {
            let caps = pattern.captures(site.code)?;
            let argument = caps.get(1).or_else(|| caps.get(2))?.as_str().to_string();
            Some((argument, site))
        })
        .collect())
}
