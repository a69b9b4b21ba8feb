use crate::analyzer::extract::{extract_span, SourceSpan};
use crate::analyzer::locate::call_sites;
use crate::cache::ParseCache;
use crate::config::Config;
use crate::error::ExtractError;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// One documentation block found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub argument: String,
    pub file: PathBuf,
    pub call_line: usize,
    pub span: SourceSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct StyleguideIndex {
    pub sections: Vec<Section>,
    /// Templates that could not be read or parsed.
    pub skipped: usize,
}

impl StyleguideIndex {
    /// Walk `root`, parse every template in parallel through `cache` and
    /// record each top-level `config.method` block.
    pub fn build(root: &Path, config: &Config, cache: &ParseCache) -> Result<Self, ExtractError> {
        let files = find_template_files(root, config);
        debug!(root = %root.display(), files = files.len(), "indexing styleguide templates");
        let skipped = AtomicUsize::new(0);

        let per_file: Vec<Vec<Section>> = files
            .par_iter()
            .map(|file| match sections_in(file, config, cache) {
                Ok(sections) => Ok(sections),
                Err(ExtractError::Pattern(err)) => Err(ExtractError::Pattern(err)),
                Err(err) => {
                    warn!(file = %file.display(), error = %err, "skipping template");
                    skipped.fetch_add(1, Ordering::Relaxed);
                    Ok(Vec::new())
                }
            })
            .collect::<Result<_, _>>()?;

        let mut sections: Vec<Section> = per_file.into_iter().flatten().collect();
        sections.sort_by(|a, b| a.file.cmp(&b.file).then(a.call_line.cmp(&b.call_line)));

        Ok(Self {
            sections,
            skipped: skipped.into_inner(),
        })
    }

    /// First section registered under `argument`.
    pub fn find(&self, argument: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.argument == argument)
    }

    /// Fill in the extracted body of every section.
    pub fn load_sources(&mut self, config: &Config, cache: &ParseCache) -> Result<(), ExtractError> {
        for section in &mut self.sections {
            let source = extract_span(cache.reader(), &section.file, section.span, config.indent_width)?;
            section.source = Some(source);
        }
        Ok(())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}

fn sections_in(file: &Path, config: &Config, cache: &ParseCache) -> Result<Vec<Section>, ExtractError> {
    let ast = cache.get_or_parse(file)?;
    Ok(call_sites(&ast, &config.method)?
        .into_iter()
        .map(|(argument, site)| Section {
            argument,
            file: file.to_path_buf(),
            call_line: site.call_line,
            span: site.span(),
            source: None,
        })
        .collect())
}

pub fn find_template_files(root: &Path, config: &Config) -> Vec<PathBuf> {
    use walkdir::WalkDir;
    let mut out = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        let p = entry.path();
        if p.is_file() {
            // skip common heavy dirs
            if p.components().any(|c| {
                let s = c.as_os_str();
                s == "node_modules" || s == ".git" || s == "target"
            }) {
                continue;
            }
            if config.matches_extension(p) {
                out.push(p.to_path_buf());
            }
        }
    }
    out.sort();
    out
}
