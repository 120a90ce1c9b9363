use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use glob::Pattern;

/// Include/exclude globs evaluated against paths relative to the scan root.
///
/// A file is eligible when at least one include pattern matches and no
/// exclude pattern does. Patterns only ever decide which files are picked up;
/// directories are always traversed.
#[derive(Debug, Clone)]
pub struct Rules {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    root: PathBuf,
}

impl Rules {
    pub fn new(include: &[String], exclude: &[String], root: PathBuf) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            root,
        })
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        self.include
            .iter()
            .any(|pattern| pattern.matches_path(relative))
            && !self
                .exclude
                .iter()
                .any(|pattern| pattern.matches_path(relative))
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).with_context(|| format!("invalid glob pattern `{pattern}`"))
        })
        .collect()
}
