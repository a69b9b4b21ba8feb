use std::path::{Path, PathBuf};
use std::sync::Arc;

use styleguide_core::{Config, ExtractError, Extractor, ParseCache, SourceSpan};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn extractor() -> Extractor {
    Extractor::new(Arc::new(ParseCache::default()), Config::default())
}

#[test]
fn extracts_block_with_trailing_blank_line() {
    let out = extractor()
        .extract_section(&fixture("buttons.slim"), "1.1")
        .unwrap();
    assert_eq!(out.span, SourceSpan::new(4, 4));
    assert_eq!(
        out.source,
        ".example\n  button.primary Save\n  button.secondary Cancel\n\n"
    );
}

#[test]
fn extracts_double_quoted_block_with_text() {
    let out = extractor()
        .extract_call_site(&fixture("buttons.slim"), "kss_block", "1.2")
        .unwrap();
    assert_eq!(out.span, SourceSpan::new(9, 3));
    assert_eq!(
        out.source,
        "a.button href=\"#\"\n  | Link styled\n    as a button\n"
    );
}

#[test]
fn caller_supplied_start_line_matches_located_one() {
    let engine = extractor();
    let path = fixture("buttons.slim");
    let located = engine.extract_section(&path, "1.2").unwrap();
    let supplied = engine.extract(&path, 9, "kss_block", "1.2").unwrap();
    assert_eq!(located.source, supplied);
    assert_eq!(engine.cache().stats().templates, 1);
}

#[test]
fn other_directives_do_not_match() {
    let err = extractor()
        .extract(&fixture("buttons.slim"), 0, "render", "header")
        .unwrap_err();
    assert!(matches!(err, ExtractError::CallSiteNotFound { .. }));
}

#[test]
fn missing_template_is_read_failure() {
    let err = extractor()
        .extract(&fixture("nope.slim"), 0, "kss_block", "1.1")
        .unwrap_err();
    assert!(matches!(err, ExtractError::Read { .. }));
}
