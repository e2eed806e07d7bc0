//! Site initialization module.
//!
//! Creates new site structure with default configuration.

use crate::{config::SiteConfig, log};
use anyhow::{Context, Result, bail};
use std::{fs, path::Path};

/// Files to write ignore patterns to
const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

/// Default config filename
const CONFIG_FILE: &str = "til.toml";

/// Embedded scaffold templates
const LAYOUT_TEMPLATE: &str = include_str!("embed/layout.html");
const INDEX_TEMPLATE: &str = include_str!("embed/index.md");
const WELCOME_TEMPLATE: &str = include_str!("embed/welcome.md");

/// Create a new site with default structure
pub fn new_site(config: &'static SiteConfig, has_name: bool) -> Result<()> {
    let root = config.get_root();

    // Safety check: if no name was provided (init in current dir),
    // the directory must be completely empty
    if !has_name && !is_dir_empty(root)? {
        bail!(
            "Current directory is not empty. Use `tilgen init <SITE_NAME>` to create in a subdirectory."
        );
    }

    init_site_structure(config)?;
    init_default_config(root)?;
    init_ignored_files(root, &config.build.output)?;

    log!("init"; "site created at {}", root.display());
    Ok(())
}

/// Check if a directory is completely empty
fn is_dir_empty(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    Ok(fs::read_dir(path)?.next().is_none())
}

/// Write default configuration file
fn init_default_config(root: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&SiteConfig::default())?;
    fs::write(root.join(CONFIG_FILE), content)?;
    Ok(())
}

/// Create content directory, layout and starter pages
fn init_site_structure(config: &SiteConfig) -> Result<()> {
    let content = &config.build.content;
    if content.exists() {
        bail!(
            "Path `{}` already exists. Try `tilgen init <SITE_NAME>` instead.",
            content.display()
        );
    }
    fs::create_dir_all(content)
        .with_context(|| format!("Failed to create {}", content.display()))?;

    fs::write(&config.build.layout, LAYOUT_TEMPLATE)?;
    fs::write(content.join("index.md"), INDEX_TEMPLATE)?;
    fs::write(content.join("welcome.md"), WELCOME_TEMPLATE)?;

    Ok(())
}

/// Initialize .gitignore and .ignore files with the output path
fn init_ignored_files(root: &Path, output: &Path) -> Result<()> {
    let relative = output.strip_prefix(root).unwrap_or(output);
    let content = format!("{}\n", relative.display());

    for filename in IGNORE_FILES {
        let path = root.join(filename);
        if !path.exists() {
            fs::write(&path, &content)?;
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn leaked_config(root: &Path) -> &'static SiteConfig {
        let mut config = SiteConfig::default();
        config.set_root(root);
        config.build.content = root.join("posts");
        config.build.output = root.join("public");
        config.build.layout = root.join("layout.html");
        Box::leak(Box::new(config))
    }

    #[test]
    fn test_new_site_scaffolds_structure() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        let config = leaked_config(&root);

        new_site(config, true).unwrap();

        assert!(root.join("posts/index.md").is_file());
        assert!(root.join("posts/welcome.md").is_file());
        assert!(root.join("layout.html").is_file());
        assert!(root.join(CONFIG_FILE).is_file());
        assert!(root.join(".gitignore").is_file());

        // The written config parses back
        let parsed = SiteConfig::from_path(&root.join(CONFIG_FILE)).unwrap();
        assert_eq!(parsed.build.content, PathBuf::from("posts"));

        // The scaffolded layout carries the content token
        let layout = fs::read_to_string(root.join("layout.html")).unwrap();
        assert!(layout.contains("@@content@@"));

        // The scaffolded index carries the listing marker
        let index = fs::read_to_string(root.join("posts/index.md")).unwrap();
        assert!(index.contains("<!-- @@content@@ -->"));

        let ignore = fs::read_to_string(root.join(".gitignore")).unwrap();
        assert_eq!(ignore, "public\n");
    }

    #[test]
    fn test_new_site_refuses_nonempty_dir_without_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("something.txt"), "x").unwrap();
        let config = leaked_config(dir.path());

        assert!(new_site(config, false).is_err());
    }

    #[test]
    fn test_new_site_refuses_existing_content_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("site");
        fs::create_dir_all(root.join("posts")).unwrap();
        let config = leaked_config(&root);

        assert!(new_site(config, true).is_err());
    }
}
