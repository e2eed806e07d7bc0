//! Layout template handling.
//!
//! The layout is a single HTML file containing one `@@content@@` token.
//! It is split into prefix/suffix halves once, and every rendered page is
//! assembled as `prefix + body + suffix`. Named fragment tokens
//! (`@@name@@`, configured under `[build.fragments]`) are substituted with
//! their file contents before the split, so fragments participate in the
//! same mtime tracking as the layout itself.

use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

/// Placeholder token marking where page content goes.
pub const CONTENT_TOKEN: &str = "@@content@@";

/// A loaded layout template, split around the content token.
pub struct Layout {
    path: PathBuf,
    /// Sorted for deterministic substitution order
    fragments: Vec<(String, PathBuf)>,
    prefix: String,
    suffix: String,
    /// Cached mtimes of the layout file and every fragment file
    mtimes: FxHashMap<PathBuf, SystemTime>,
}

impl Layout {
    /// Load a layout and its fragments from disk.
    pub fn load(path: &Path, fragments: &HashMap<String, PathBuf>) -> Result<Self> {
        let mut fragments: Vec<_> = fragments
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect();
        fragments.sort();

        let mut layout = Self {
            path: path.to_path_buf(),
            fragments,
            prefix: String::new(),
            suffix: String::new(),
            mtimes: FxHashMap::default(),
        };
        layout.reload()?;
        Ok(layout)
    }

    /// Re-read the layout and fragment files and re-split the template.
    pub fn reload(&mut self) -> Result<()> {
        let mut text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read layout {}", self.path.display()))?;

        for (name, frag_path) in &self.fragments {
            let token = format!("@@{name}@@");
            if !text.contains(&token) {
                bail!(
                    "Layout {} has no `{token}` token for fragment {}",
                    self.path.display(),
                    frag_path.display()
                );
            }
            let fragment = fs::read_to_string(frag_path)
                .with_context(|| format!("Failed to read fragment {}", frag_path.display()))?;
            text = text.replace(&token, &fragment);
        }

        let parts: Vec<&str> = text.split(CONTENT_TOKEN).collect();
        match parts.as_slice() {
            [prefix, suffix] => {
                self.prefix = (*prefix).to_owned();
                self.suffix = (*suffix).to_owned();
            }
            [_] => bail!(
                "Layout {} is missing the `{CONTENT_TOKEN}` token",
                self.path.display()
            ),
            _ => bail!(
                "Layout {} has more than one `{CONTENT_TOKEN}` token",
                self.path.display()
            ),
        }

        self.record_mtimes()
    }

    /// Wrap rendered page content in the layout halves.
    pub fn wrap(&self, html: &str) -> String {
        format!("{}{}{}", self.prefix, html, self.suffix)
    }

    /// Check whether the layout or any fragment changed since the last
    /// (re)load. Does not update the cache; `reload` does.
    pub fn has_modifications(&self) -> Result<bool> {
        for path in self.tracked_paths() {
            let mtime = modified_time(&path)?;
            if self.mtimes.get(&path) != Some(&mtime) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn record_mtimes(&mut self) -> Result<()> {
        self.mtimes.clear();
        for path in self.tracked_paths() {
            let mtime = modified_time(&path)?;
            self.mtimes.insert(path, mtime);
        }
        Ok(())
    }

    fn tracked_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.path.clone()];
        paths.extend(self.fragments.iter().map(|(_, path)| path.clone()));
        paths
    }
}

fn modified_time(path: &Path) -> Result<SystemTime> {
    let mtime = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .modified()?;
    Ok(mtime)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path) {
        let file = fs::OpenOptions::new().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();
    }

    #[test]
    fn test_load_and_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.html");
        fs::write(&path, "<body>@@content@@</body>").unwrap();

        let layout = Layout::load(&path, &HashMap::new()).unwrap();
        assert_eq!(layout.wrap("<p>hi</p>"), "<body><p>hi</p></body>");
    }

    #[test]
    fn test_missing_content_token_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.html");
        fs::write(&path, "<body>no token here</body>").unwrap();

        assert!(Layout::load(&path, &HashMap::new()).is_err());
    }

    #[test]
    fn test_multiple_content_tokens_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.html");
        fs::write(&path, "@@content@@ twice @@content@@").unwrap();

        assert!(Layout::load(&path, &HashMap::new()).is_err());
    }

    #[test]
    fn test_fragment_substitution() {
        let dir = tempfile::tempdir().unwrap();
        let layout_path = dir.path().join("layout.html");
        let nav_path = dir.path().join("nav.html");
        fs::write(&layout_path, "@@nav@@<main>@@content@@</main>").unwrap();
        fs::write(&nav_path, "<nav>links</nav>").unwrap();

        let fragments = HashMap::from([("nav".to_owned(), nav_path)]);
        let layout = Layout::load(&layout_path, &fragments).unwrap();

        assert_eq!(
            layout.wrap("x"),
            "<nav>links</nav><main>x</main>"
        );
    }

    #[test]
    fn test_fragment_token_missing_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout_path = dir.path().join("layout.html");
        let nav_path = dir.path().join("nav.html");
        fs::write(&layout_path, "<main>@@content@@</main>").unwrap();
        fs::write(&nav_path, "<nav/>").unwrap();

        let fragments = HashMap::from([("nav".to_owned(), nav_path)]);
        assert!(Layout::load(&layout_path, &fragments).is_err());
    }

    #[test]
    fn test_has_modifications_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.html");
        fs::write(&path, "@@content@@").unwrap();

        let mut layout = Layout::load(&path, &HashMap::new()).unwrap();
        assert!(!layout.has_modifications().unwrap());

        touch(&path);
        assert!(layout.has_modifications().unwrap());

        // Reload refreshes the cache
        layout.reload().unwrap();
        assert!(!layout.has_modifications().unwrap());
    }

    #[test]
    fn test_has_modifications_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let layout_path = dir.path().join("layout.html");
        let nav_path = dir.path().join("nav.html");
        fs::write(&layout_path, "@@nav@@@@content@@").unwrap();
        fs::write(&nav_path, "<nav/>").unwrap();

        let fragments = HashMap::from([("nav".to_owned(), nav_path.clone())]);
        let layout = Layout::load(&layout_path, &fragments).unwrap();
        assert!(!layout.has_modifications().unwrap());

        touch(&nav_path);
        assert!(layout.has_modifications().unwrap());
    }

    #[test]
    fn test_fragment_may_not_introduce_second_content_token() {
        let dir = tempfile::tempdir().unwrap();
        let layout_path = dir.path().join("layout.html");
        let nav_path = dir.path().join("nav.html");
        fs::write(&layout_path, "@@nav@@@@content@@").unwrap();
        fs::write(&nav_path, "@@content@@").unwrap();

        let fragments = HashMap::from([("nav".to_owned(), nav_path)]);
        assert!(Layout::load(&layout_path, &fragments).is_err());
    }
}
