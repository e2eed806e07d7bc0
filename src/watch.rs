//! Watch mode: fixed-interval polling loop.
//!
//! No file-system notification machinery here: the content tree is small
//! and a poll every few seconds is enough. Each tick runs a full
//! `generate_all` pass; the per-post and layout mtime caches keep a
//! no-change pass cheap. The loop runs until interrupted.

use crate::{build::SiteGenerator, config::SiteConfig, log};
use anyhow::{Context, Result};
use std::{thread, time::Duration};

/// Poll the content tree and regenerate on change. Blocks forever.
///
/// A failed pass propagates its error out, so `main` prints it and the
/// process terminates with a non-zero exit. Ctrl+C exits cleanly.
pub fn watch_site(config: &'static SiteConfig) -> Result<()> {
    ctrlc::set_handler(|| {
        log!("watch"; "... done.");
        std::process::exit(0);
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut generator = SiteGenerator::new(config)?;
    let interval = Duration::from_secs(config.watch.interval);

    log!("watch"; "watching {} for changes...", config.build.content.display());

    loop {
        generator.generate_all()?;
        thread::sleep(interval);
    }
}
