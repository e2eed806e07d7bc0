//! Site generation orchestration.
//!
//! # Architecture
//!
//! ```text
//! generate_all()
//!     │
//!     ├── layout changed? ──► reload layout, force full regen
//!     │
//!     ├── generate_posts() ──► render new/modified posts
//!     │       (mtime cache decides what is skipped)
//!     │
//!     └── generate_listing() ──► rebuild index.html when any post was
//!             rendered or index.md itself changed
//! ```

use crate::{
    config::SiteConfig,
    layout::Layout,
    log,
    markdown::MarkdownRenderer,
    meta::{INDEX_HTML, Post},
    utils::minify::minify,
};
use anyhow::{Context, Result, bail};
use rustc_hash::FxHashMap;
use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use walkdir::WalkDir;

/// Marker in index.md where the post listing is spliced.
pub const CONTENT_MARKER: &str = "<!-- @@content@@ -->";

/// Listing page source, excluded from normal post processing.
const INDEX_MD: &str = "index.md";

/// Build the site once.
pub fn build_site(config: &'static SiteConfig) -> Result<()> {
    let mut generator = SiteGenerator::new(config)?;
    generator.generate_all()?;
    log_build_result(&config.build.output)
}

/// Holds everything that lives across generation passes: the layout, the
/// post table, and the listing-page mtime. Watch mode reuses one instance
/// so the mtime caches make repeated passes cheap.
pub struct SiteGenerator {
    config: &'static SiteConfig,
    layout: Layout,
    renderer: MarkdownRenderer,
    posts: FxHashMap<PathBuf, Post>,
    index_mtime: Option<SystemTime>,
}

impl SiteGenerator {
    pub fn new(config: &'static SiteConfig) -> Result<Self> {
        if config.build.clean && config.build.output.exists() {
            fs::remove_dir_all(&config.build.output).with_context(|| {
                format!(
                    "Failed to clear output directory: {}",
                    config.build.output.display()
                )
            })?;
        }

        let layout = Layout::load(&config.build.layout, &config.build.fragments)?;

        Ok(Self {
            config,
            layout,
            renderer: MarkdownRenderer::new(),
            posts: FxHashMap::default(),
            index_mtime: None,
        })
    }

    /// Run one generation pass.
    pub fn generate_all(&mut self) -> Result<()> {
        let force = self.layout.has_modifications()?;
        if force {
            log!("layout"; "layout changed, reloading...");
            self.layout.reload()?;
        }

        let modified = self.generate_posts(force)?;
        self.generate_listing(modified || force)?;
        Ok(())
    }

    /// All markdown sources under the content dir, except the listing page.
    fn collect_sources(&self) -> Vec<PathBuf> {
        let index_md = self.config.build.content.join(INDEX_MD);

        let mut sources: Vec<PathBuf> = WalkDir::new(&self.config.build.content)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
            .filter(|path| *path != index_md)
            .collect();

        sources.sort();
        sources
    }

    /// Render new and modified posts. Returns true when anything rendered.
    fn generate_posts(&mut self, force: bool) -> Result<bool> {
        let mut updated = FxHashMap::default();
        let mut modified = false;

        for source in self.collect_sources() {
            let mut post = match self.posts.remove(&source) {
                Some(post) => post,
                None => Post::from_source(source.clone(), self.config)?,
            };

            if post.has_modifications()? || force {
                log!("build"; "{} => {}", post.paths.relative, post.paths.link);
                self.render_post(&mut post)?;
                modified = true;
            }
            updated.insert(source, post);
        }

        // Posts whose sources disappeared drop out of the table (and thus
        // the listing); their generated files stay on disk.
        self.posts = updated;
        Ok(modified)
    }

    fn render_post(&self, post: &mut Post) -> Result<()> {
        let body = post.load_markdown()?;
        let page = self.layout.wrap(&self.renderer.render(&body));
        write_page(&post.paths.html, &page, self.config)
    }

    /// Regenerate the listing index from `index.md` and the post table.
    fn generate_listing(&mut self, force: bool) -> Result<()> {
        let index_md = self.config.build.content.join(INDEX_MD);
        let index_html = self.config.build.output.join(INDEX_HTML);

        let mtime = fs::metadata(&index_md)
            .and_then(|meta| meta.modified())
            .with_context(|| format!("Failed to stat {}", index_md.display()))?;
        if !force && self.index_mtime == Some(mtime) {
            return Ok(());
        }
        self.index_mtime = Some(mtime);
        log!("build"; "{INDEX_MD} => /{INDEX_HTML}");

        let mut entries: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| post.front_matter.is_some())
            .collect();
        entries.sort_by(|a, b| a.paths.relative.cmp(&b.paths.relative));

        let mut listing = String::new();
        for post in entries {
            if let Some(fm) = post.front_matter.as_ref() {
                listing.push_str(&listing_item(
                    &post.paths.link,
                    fm.title.as_deref().unwrap_or_default(),
                    fm.description.as_deref().unwrap_or_default(),
                ));
            }
        }

        let text = fs::read_to_string(&index_md)
            .with_context(|| format!("Failed to read {}", index_md.display()))?;
        let parts: Vec<&str> = text.split(CONTENT_MARKER).collect();
        let [prefix, suffix] = parts.as_slice() else {
            bail!(
                "{} must contain exactly one `{CONTENT_MARKER}` marker",
                index_md.display()
            );
        };

        let markdown = format!("{prefix}<ul>\n{listing}</ul>{suffix}");
        let page = self.layout.wrap(&self.renderer.render(&markdown));
        write_page(&index_html, &page, self.config)
    }
}

/// One entry of the listing index.
fn listing_item(link: &str, title: &str, description: &str) -> String {
    format!(
        "<li class=\"mb3\">\n<div class=\"f5\"><a href=\"{link}\">{title}</a></div>\n{description}\n</li>\n"
    )
}

/// Write a page, creating parent directories and minifying if enabled.
fn write_page(path: &Path, html: &str, config: &SiteConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let bytes = minify(html.as_bytes(), config);
    fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Log build result based on output directory contents
fn log_build_result(output: &Path) -> Result<()> {
    let file_count = fs::read_dir(output)?.filter_map(Result::ok).count();

    if file_count == 0 {
        log!("warn"; "output is empty, check if content has .md files");
    } else {
        log!("build"; "done");
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
