//! Post metadata and front-matter extraction.
//!
//! `Post` is the primary metadata structure for content pages, holding all
//! path information needed across the build pipeline plus the parsed front
//! matter and the cached modification time used for incremental rebuilds.
//!
//! Front matter is an optional header at the top of a markdown file,
//! delimited by `---` lines, containing `key: value` pairs:
//!
//! ```text
//! ---
//! title: Dijkstra's algorithm
//! description: Shortest paths over weighted graphs.
//! tags: graphs, algorithms
//! ---
//! ```
//!
//! The parser is deliberately line-based: a line without a colon is a hard
//! error, no recovery is attempted.

use crate::config::SiteConfig;
use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::PathBuf,
    sync::OnceLock,
    time::SystemTime,
};

/// Output file name for every generated page.
pub const INDEX_HTML: &str = "index.html";

static TAGS_SPLIT: OnceLock<Regex> = OnceLock::new();

/// Separator for the `tags` value: whitespace or commas.
fn tags_split() -> &'static Regex {
    TAGS_SPLIT.get_or_init(|| Regex::new(r"\s+|,\s*").expect("hardcoded regex"))
}

// ============================================================================
// Front Matter
// ============================================================================

/// Parsed front-matter block.
///
/// `title`, `description` and `tags` are pulled out because the listing
/// index consumes them; any other key lands in `extra`. Keys are unique
/// within one block, a duplicate key overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub extra: FxHashMap<String, String>,
}

impl FrontMatter {
    fn insert_line(&mut self, line: &str) -> Result<()> {
        let Some((key, value)) = line.split_once(':') else {
            bail!("front matter line missing `:`: `{line}`");
        };
        let key = key.trim();
        let value = value.trim();

        match key {
            "title" => self.title = Some(value.to_owned()),
            "description" => self.description = Some(value.to_owned()),
            "tags" => {
                self.tags = tags_split()
                    .split(value)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                    .collect();
            }
            _ => {
                self.extra.insert(key.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }
}

/// Split a markdown document into front matter and body.
///
/// The block must open with a `---` line as the first non-blank content and
/// close with another `---` line. Returns `(None, text)` untouched when no
/// block is present; an opened but unclosed block is an error.
pub fn extract_front_matter(text: &str) -> Result<(Option<FrontMatter>, &str)> {
    let mut rest = text;

    // Skip leading blank lines
    while let Some((line, tail)) = rest.split_once('\n') {
        if !line.trim().is_empty() {
            break;
        }
        rest = tail;
    }

    let Some((first, mut tail)) = rest.split_once('\n') else {
        return Ok((None, text));
    };
    if first.trim() != "---" {
        return Ok((None, text));
    }

    let mut fm = FrontMatter::default();
    loop {
        if tail.is_empty() {
            bail!("unclosed front matter block (missing closing `---`)");
        }
        let (line, next) = tail.split_once('\n').unwrap_or((tail, ""));
        if line.trim() == "---" {
            return Ok((Some(fm), next));
        }
        fm.insert_line(line)?;
        tail = next;
    }
}

// ============================================================================
// Post Metadata
// ============================================================================

/// Path information for a post.
#[derive(Debug, Clone)]
pub struct PostPaths {
    /// Source .md file path
    pub source: PathBuf,
    /// Generated HTML file path (`output/<rel>/index.html`)
    pub html: PathBuf,
    /// Relative path without extension (for logging and link building)
    pub relative: String,
    /// Site link for the listing index (`/<rel>/`)
    pub link: String,
}

/// A content page tracked across generation passes.
#[derive(Debug, Clone)]
pub struct Post {
    /// Path information
    pub paths: PostPaths,
    /// Front matter from the last `load_markdown` call
    pub front_matter: Option<FrontMatter>,
    /// Cached source modification time
    mtime: Option<SystemTime>,
}

impl Post {
    /// Create a Post from a source .md file path.
    ///
    /// `posts/graphs/bfs.md` maps to `public/graphs/bfs/index.html` with
    /// link `/graphs/bfs/`, mirroring the content tree under the output
    /// root.
    pub fn from_source(source: PathBuf, config: &SiteConfig) -> Result<Self> {
        let content_dir = &config.build.content;
        let output_dir = &config.build.output;

        let relative = source
            .strip_prefix(content_dir)
            .map_err(|_| anyhow!("File is not in content directory: {}", source.display()))?
            .to_str()
            .ok_or_else(|| anyhow!("Invalid path encoding"))?
            .strip_suffix(".md")
            .ok_or_else(|| anyhow!("Not a .md file: {}", source.display()))?
            .replace('\\', "/");

        let html = output_dir.join(&relative).join(INDEX_HTML);
        let link = format!("/{relative}/");

        Ok(Self {
            paths: PostPaths {
                source,
                html,
                relative,
                link,
            },
            front_matter: None,
            mtime: None,
        })
    }

    /// Compare the source mtime against the cached one, updating the cache.
    ///
    /// Returns true when the file is new to the cache or was touched since
    /// the last check.
    pub fn has_modifications(&mut self) -> Result<bool> {
        let mtime = fs::metadata(&self.paths.source)
            .with_context(|| format!("Failed to stat {}", self.paths.source.display()))?
            .modified()?;

        if self.mtime != Some(mtime) {
            self.mtime = Some(mtime);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Read the source file, extract front matter, return the markdown body.
    pub fn load_markdown(&mut self) -> Result<String> {
        let text = fs::read_to_string(&self.paths.source)
            .with_context(|| format!("Failed to read {}", self.paths.source.display()))?;
        let (front_matter, body) = extract_front_matter(&text)
            .with_context(|| format!("Invalid front matter in {}", self.paths.source.display()))?;

        self.front_matter = front_matter;
        Ok(body.to_owned())
    }
}

// ============================================================================
// Tests
// ============================================================================
