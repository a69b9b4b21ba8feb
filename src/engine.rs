use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::analyzer::extract::{extract_span, SourceSpan};
use crate::analyzer::locate::{locate, CallSite, CallSiteQuery};
use crate::cache::ParseCache;
use crate::config::Config;
use crate::error::ExtractError;
use crate::parser::Node;

/// Source text recovered for one call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub span: SourceSpan,
    pub source: String,
}

/// Pulls the literal body of a documentation block out of its template.
///
/// The parse cache is injected so one cache can serve the whole process
/// while tests each get their own.
pub struct Extractor {
    cache: Arc<ParseCache>,
    config: Config,
}

impl Extractor {
    pub fn new(cache: Arc<ParseCache>, config: Config) -> Self {
        Self { cache, config }
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract the body of `method 'argument'` starting at a caller-supplied
    /// line (the line right after the invocation).
    pub fn extract(
        &self,
        path: &Path,
        source_start_line: usize,
        method: &str,
        argument: &str,
    ) -> Result<String, ExtractError> {
        let ast = self.cache.get_or_parse(path)?;
        let query = CallSiteQuery::new(method, argument)?;
        let site = self.require(&ast, &query, path)?;
        let span = SourceSpan::new(source_start_line, site.line_count());
        debug!(path = %path.display(), method, argument, ?span, "extracting block body");
        extract_span(self.cache.reader(), path, span, self.config.indent_width)
    }

    /// Like [`Extractor::extract`], but the start line is taken from where
    /// the call sits in the template.
    pub fn extract_call_site(
        &self,
        path: &Path,
        method: &str,
        argument: &str,
    ) -> Result<Extraction, ExtractError> {
        let ast = self.cache.get_or_parse(path)?;
        let query = CallSiteQuery::new(method, argument)?;
        let span = self.require(&ast, &query, path)?.span();
        debug!(path = %path.display(), method, argument, ?span, "extracting located block body");
        let source = extract_span(self.cache.reader(), path, span, self.config.indent_width)?;
        Ok(Extraction { span, source })
    }

    /// Extract a styleguide section using the configured directive name.
    pub fn extract_section(&self, path: &Path, section: &str) -> Result<Extraction, ExtractError> {
        self.extract_call_site(path, &self.config.method, section)
    }

    fn require<'a>(
        &self,
        ast: &'a Node,
        query: &CallSiteQuery,
        path: &Path,
    ) -> Result<CallSite<'a>, ExtractError> {
        locate(ast, query).ok_or_else(|| ExtractError::CallSiteNotFound {
            path: path.to_path_buf(),
            method: query.method().to_string(),
            argument: query.argument().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::MemoryReader;

    const BUTTONS: &str = "\
h1 Buttons
- kss_block '1.1' do
  div.example
    | Hello
= kss_block \"1.2\" do
  button.primary Go
";

    fn extractor(reader: Arc<MemoryReader>) -> Extractor {
        Extractor::new(Arc::new(ParseCache::new(reader)), Config::default())
    }

    #[test]
    fn test_round_trip_example() {
        let reader = Arc::new(MemoryReader::with(
            "ex.slim",
            "- kss_block '1.1' do\n  div.example\n    | Hello\n",
        ));
        let out = extractor(reader)
            .extract(Path::new("ex.slim"), 1, "kss_block", "1.1")
            .unwrap();
        assert_eq!(out, "div.example\n  | Hello\n");
    }

    #[test]
    fn test_caller_start_line_is_used_as_given() {
        let reader = Arc::new(MemoryReader::with("b.slim", BUTTONS));
        let out = extractor(reader)
            .extract(Path::new("b.slim"), 5, "kss_block", "1.1")
            .unwrap();
        // two body lines counted for 1.1, sliced from line 5
        assert_eq!(out, "button.primary Go\n");
    }

    #[test]
    fn test_located_extraction() {
        let reader = Arc::new(MemoryReader::with("b.slim", BUTTONS));
        let engine = extractor(reader);

        let first = engine.extract_section(Path::new("b.slim"), "1.1").unwrap();
        assert_eq!(first.span, SourceSpan::new(2, 2));
        assert_eq!(first.source, "div.example\n  | Hello\n");

        let second = engine
            .extract_call_site(Path::new("b.slim"), "kss_block", "1.2")
            .unwrap();
        assert_eq!(second.span, SourceSpan::new(5, 1));
        assert_eq!(second.source, "button.primary Go\n");
    }

    #[test]
    fn test_missing_section_is_not_found() {
        let reader = Arc::new(MemoryReader::with("b.slim", BUTTONS));
        let err = extractor(reader)
            .extract(Path::new("b.slim"), 1, "kss_block", "9.9")
            .unwrap_err();
        assert!(matches!(err, ExtractError::CallSiteNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "No `kss_block '9.9'` block found in `b.slim`"
        );
    }

    #[test]
    fn test_template_parsed_once_across_requests() {
        let reader = Arc::new(MemoryReader::with("b.slim", BUTTONS));
        let engine = extractor(reader.clone());
        engine.extract_section(Path::new("b.slim"), "1.1").unwrap();
        engine.extract_section(Path::new("b.slim"), "1.2").unwrap();
        // one read for the parse, one per slice
        assert_eq!(reader.reads(), 3);
        assert_eq!(engine.cache().stats().templates, 1);
    }

    #[test]
    fn test_parse_failure_propagates() {
        let reader = Arc::new(MemoryReader::with("bad.slim", "div\n    p\n  span\n"));
        let err = extractor(reader)
            .extract(Path::new("bad.slim"), 0, "kss_block", "1.1")
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn test_tab_indented_template() {
        let reader = Arc::new(MemoryReader::with(
            "tabs.slim",
            "=> kss_block '1.1' do\n\tp\n\t\t| x\n",
        ));
        let out = extractor(reader)
            .extract(Path::new("tabs.slim"), 1, "kss_block", "1.1")
            .unwrap();
        assert_eq!(out, "p\n\t| x\n");
    }

    #[test]
    fn test_block_on_first_line_after_byte_order_mark() {
        let reader = Arc::new(MemoryReader::with(
            "bom.slim",
            "\u{FEFF}- kss_block '1.1' do\n  div.example\n",
        ));
        let out = extractor(reader)
            .extract_section(Path::new("bom.slim"), "1.1")
            .unwrap();
        assert_eq!(out.span, SourceSpan::new(1, 1));
        assert_eq!(out.source, "div.example\n");
    }

    #[test]
    fn test_custom_indent_width() {
        let reader = Arc::new(MemoryReader::with(
            "wide.slim",
            "- kss_block '3' do\n    p\n      | deep\n",
        ));
        let config = Config {
            indent_width: 4,
            ..Config::default()
        };
        let engine = Extractor::new(Arc::new(ParseCache::new(reader)), config);
        let out = engine.extract_section(Path::new("wide.slim"), "3").unwrap();
        assert_eq!(out.source, "p\n  | deep\n");
    }
}
