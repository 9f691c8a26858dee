use std::path::Path;

use anyhow::{Context, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Decides which file names the manager considers at all.
///
/// A name rejected here is invisible to both snapshot and purge, so an
/// excluded file is never recorded in the whitelist and never deleted.
pub struct FileFilter {
    skip_hidden: bool,
    extensions: Option<Vec<String>>,
    ignore: Option<Gitignore>,
}

impl FileFilter {
    pub fn new(
        skip_hidden: bool,
        extensions: Option<Vec<String>>,
        ignore_patterns: &[String],
    ) -> Result<Self> {
        let ignore = if ignore_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new("");
            for pattern in ignore_patterns {
                builder
                    .add_line(None, pattern)
                    .with_context(|| format!("Invalid ignore pattern: {}", pattern))?;
            }
            Some(builder.build().context("Failed to build ignore matcher")?)
        };

        Ok(Self {
            skip_hidden,
            extensions,
            ignore,
        })
    }

    /// Filter that lets every name through.
    pub fn permissive() -> Self {
        Self {
            skip_hidden: false,
            extensions: None,
            ignore: None,
        }
    }

    pub fn is_eligible(&self, name: &str) -> bool {
        if self.skip_hidden && name.starts_with('.') {
            return false;
        }

        if let Some(ref extensions) = self.extensions {
            match Path::new(name).extension().and_then(|s| s.to_str()) {
                Some(ext) if extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) => {}
                _ => return false,
            }
        }

        if let Some(ref ignore) = self.ignore {
            if ignore.matched(name, false).is_ignore() {
                return false;
            }
        }

        true
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::permissive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_accepts_everything() {
        let filter = FileFilter::permissive();
        assert!(filter.is_eligible("a.txt"));
        assert!(filter.is_eligible(".hidden"));
        assert!(filter.is_eligible("no_extension"));
    }

    #[test]
    fn test_skip_hidden() {
        let filter = FileFilter::new(true, None, &[]).unwrap();
        assert!(filter.is_eligible("visible.txt"));
        assert!(!filter.is_eligible(".bashrc"));
    }

    #[test]
    fn test_extension_allowlist() {
        let filter =
            FileFilter::new(false, Some(vec!["tmp".to_string(), "LOG".to_string()]), &[]).unwrap();
        assert!(filter.is_eligible("scratch.tmp"));
        assert!(filter.is_eligible("server.log"));
        assert!(!filter.is_eligible("keep.txt"));
        assert!(!filter.is_eligible("no_extension"));
    }

    #[test]
    fn test_ignore_patterns() {
        let patterns = vec!["*.bak".to_string(), "Cargo.lock".to_string()];
        let filter = FileFilter::new(false, None, &patterns).unwrap();
        assert!(!filter.is_eligible("old.bak"));
        assert!(!filter.is_eligible("Cargo.lock"));
        assert!(filter.is_eligible("main.rs"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let patterns = vec!["a[".to_string()];
        assert!(FileFilter::new(false, None, &patterns).is_err());
    }
}
