//! Site configuration management.
//!
//! Handles loading, parsing, and validating the `til.toml` configuration file.

use crate::cli::{Cli, Commands, parse_fragment};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default values for serde deserialization
pub mod config_defaults {
    #[allow(unused)]
    pub fn r#true() -> bool {
        true
    }

    pub fn r#false() -> bool {
        false
    }

    pub mod base {
        pub fn url() -> Option<String> {
            None
        }
        pub fn author() -> String {
            "<YOUR_NAME>".into()
        }
    }

    pub mod build {
        use std::path::PathBuf;

        pub fn root() -> Option<PathBuf> {
            None
        }
        pub fn content() -> PathBuf {
            "posts".into()
        }
        pub fn output() -> PathBuf {
            "public".into()
        }
        pub fn layout() -> PathBuf {
            "layout.html".into()
        }
    }

    pub mod watch {
        pub fn interval() -> u64 {
            5
        }
    }
}

/// `[base]` section in til.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BaseConfig {
    /// Site title
    pub title: String,

    /// Author name, e.g.: "Bob"
    #[serde(default = "config_defaults::base::author")]
    #[educe(Default = config_defaults::base::author())]
    pub author: String,

    /// Site description
    pub description: String,

    /// Base URL of the published site, e.g.: "https://example.com"
    #[serde(default = "config_defaults::base::url")]
    #[educe(Default = config_defaults::base::url())]
    pub url: Option<String>,
}

#[test]
fn validate_base_config() {
    let config = r#"
        [base]
        title = "til"
        description = "Today I Learned"
        url = "https://til.gnoht.com"
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(config.base.title, "til");
    assert_eq!(config.base.description, "Today I Learned");
    assert_eq!(config.base.url, Some("https://til.gnoht.com".to_string()));
}

#[test]
fn test_base_config_defaults() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(config.base.author, "<YOUR_NAME>");
    assert_eq!(config.base.url, None);
}

/// `[build]` section in til.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Root directory path
    #[serde(default = "config_defaults::build::root")]
    #[educe(Default = config_defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Content directory path (relative to root)
    #[serde(default = "config_defaults::build::content")]
    #[educe(Default = config_defaults::build::content())]
    pub content: PathBuf,

    /// Output directory path (relative to root)
    #[serde(default = "config_defaults::build::output")]
    #[educe(Default = config_defaults::build::output())]
    pub output: PathBuf,

    /// Layout HTML file path (relative to root)
    #[serde(default = "config_defaults::build::layout")]
    #[educe(Default = config_defaults::build::layout())]
    pub layout: PathBuf,

    /// Named HTML fragments spliced into the layout (`@@name@@` tokens)
    #[serde(default)]
    pub fragments: HashMap<String, PathBuf>,

    /// Minify HTML output
    #[serde(default = "config_defaults::r#false")]
    #[educe(Default = false)]
    pub minify: bool,

    /// Clean output directory before building
    #[serde(default = "config_defaults::r#false")]
    #[educe(Default = false)]
    pub clean: bool,
}

#[test]
fn test_build_config_defaults() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(config.build.content, PathBuf::from("posts"));
    assert_eq!(config.build.output, PathBuf::from("public"));
    assert_eq!(config.build.layout, PathBuf::from("layout.html"));
    assert!(config.build.fragments.is_empty());
    assert!(!config.build.minify);
    assert!(!config.build.clean);
}

#[test]
fn test_build_fragments_config() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"

        [build.fragments]
        nav = "fragments/nav.html"
        footer = "fragments/footer.html"
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(
        config.build.fragments.get("nav"),
        Some(&PathBuf::from("fragments/nav.html"))
    );
    assert_eq!(
        config.build.fragments.get("footer"),
        Some(&PathBuf::from("fragments/footer.html"))
    );
}

/// `[watch]` section in til.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct WatchConfig {
    /// Poll interval in seconds
    #[serde(default = "config_defaults::watch::interval")]
    #[educe(Default = config_defaults::watch::interval())]
    pub interval: u64,
}

#[test]
fn test_watch_config() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"

        [watch]
        interval = 2
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(config.watch.interval, 2);
}

#[test]
fn test_watch_config_defaults() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(config.watch.interval, 5);
}

#[test]
fn test_unknown_field_rejection_in_base() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"
        unknown_field = "should_fail"
    "#;
    let result: Result<SiteConfig, _> = toml::from_str(config);

    assert!(result.is_err());
    let err = result.unwrap_err().to_string();
    assert!(err.contains("unknown field"));
}

#[test]
fn test_unknown_field_rejection_in_build() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"

        [build]
        unknown_field = "should_fail"
    "#;
    let result: Result<SiteConfig, _> = toml::from_str(config);

    assert!(result.is_err());
}

#[test]
fn test_extra_fields() {
    let config = r#"
        [base]
        title = "Test"
        description = "Test notes"

        [extra]
        custom_field = "custom_value"
        number_field = 42
    "#;
    let config: SiteConfig = toml::from_str(config).unwrap();

    assert_eq!(
        config.extra.get("custom_field").and_then(|v| v.as_str()),
        Some("custom_value")
    );
    assert_eq!(
        config.extra.get("number_field").and_then(|v| v.as_integer()),
        Some(42)
    );
}

/// Root configuration structure representing til.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Watch mode settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: HashMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Get CLI arguments reference
    pub fn get_cli(&self) -> &'static Cli {
        self.cli.expect("config not updated with CLI arguments")
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) -> Result<()> {
        self.cli = Some(cli);

        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());
        Self::update_option(&mut self.build.layout, cli.layout.as_ref());

        // CLI fragments override config entries with the same name
        for spec in &cli.fragments {
            let (name, path) = parse_fragment(spec)?;
            self.build.fragments.insert(name, path);
        }

        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Watch { build_args, interval } => {
                self.apply_build_args(build_args);
                Self::update_option(&mut self.watch.interval, interval.as_ref());
            }
            Commands::Init { .. } => {}
        }

        let mut root = cli.root.clone().unwrap_or_else(|| self.get_root().to_owned());
        if let Commands::Init { name: Some(name) } = &cli.command {
            root = root.join(name);
        }
        self.update_path_with_root(&root);

        Ok(())
    }

    fn apply_build_args(&mut self, build_args: &crate::cli::BuildArgs) {
        Self::update_option(&mut self.build.minify, build_args.minify.as_ref());
        if build_args.clean {
            self.build.clean = true;
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory
    fn update_path_with_root(&mut self, root: &Path) {
        self.set_root(root);

        self.build.content = root.join(&self.build.content);
        self.build.output = root.join(&self.build.output);
        self.build.layout = root.join(&self.build.layout);

        for path in self.build.fragments.values_mut() {
            *path = root.join(&*path);
        }
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        let cli = self.get_cli();

        if !self.get_root().join(&cli.config).exists() {
            bail!("Config file not found");
        }

        if let Some(base_url) = &self.base.url
            && !base_url.starts_with("http")
        {
            bail!(ConfigError::Validation(
                "[base.url] must start with http:// or https://".into()
            ));
        }

        if self.watch.interval == 0 {
            bail!(ConfigError::Validation(
                "[watch.interval] must be at least 1 second".into()
            ));
        }

        if !self.build.content.is_dir() {
            bail!(ConfigError::Validation(format!(
                "[build.content] not found: {}",
                self.build.content.display()
            )));
        }

        if !self.build.layout.is_file() {
            bail!(ConfigError::Validation(format!(
                "[build.layout] not found: {}",
                self.build.layout.display()
            )));
        }

        for (name, path) in &self.build.fragments {
            if !path.is_file() {
                bail!(ConfigError::Validation(format!(
                    "[build.fragments.{name}] not found: {}",
                    path.display()
                )));
            }
        }

        Ok(())
    }
}

#[test]
fn test_from_str() {
    let config_str = r#"
        [base]
        title = "My Notes"
        description = "A test knowledge base"
        author = "Test Author"
    "#;
    let result = SiteConfig::from_str(config_str);

    assert!(result.is_ok());
    let config = result.unwrap();
    assert_eq!(config.base.title, "My Notes");
    assert_eq!(config.base.author, "Test Author");
}

#[test]
fn test_from_str_invalid_toml() {
    let invalid_config = r#"
        [base
        title = "My Notes"
    "#;
    let result = SiteConfig::from_str(invalid_config);

    assert!(result.is_err());
}

#[test]
fn test_get_root_default() {
    let config = SiteConfig::default();
    assert_eq!(config.get_root(), Path::new("./"));
}

#[test]
fn test_set_root() {
    let mut config = SiteConfig::default();
    config.set_root(Path::new("/custom/path"));
    assert_eq!(config.get_root(), Path::new("/custom/path"));
}

#[test]
fn test_update_with_cli_joins_root() {
    use clap::Parser;

    let cli: &'static Cli = Box::leak(Box::new(
        Cli::try_parse_from([
            "tilgen",
            "--root",
            "/site",
            "--fragment",
            "nav=fragments/nav.html",
            "build",
            "--minify",
        ])
        .unwrap(),
    ));

    let mut config = SiteConfig::default();
    config.update_with_cli(cli).unwrap();

    assert_eq!(config.get_root(), Path::new("/site"));
    assert_eq!(config.build.content, PathBuf::from("/site/posts"));
    assert_eq!(config.build.output, PathBuf::from("/site/public"));
    assert_eq!(config.build.layout, PathBuf::from("/site/layout.html"));
    assert_eq!(
        config.build.fragments.get("nav"),
        Some(&PathBuf::from("/site/fragments/nav.html"))
    );
    assert!(config.build.minify);
}

#[test]
fn test_update_with_cli_bad_fragment() {
    use clap::Parser;

    let cli: &'static Cli = Box::leak(Box::new(
        Cli::try_parse_from(["tilgen", "--fragment", "not-a-fragment", "build"]).unwrap(),
    ));

    let mut config = SiteConfig::default();
    assert!(config.update_with_cli(cli).is_err());
}

#[test]
fn test_config_error_display() {
    let io_err = ConfigError::Io(
        PathBuf::from("til.toml"),
        std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
    );
    let display = format!("{}", io_err);
    assert!(display.contains("IO error"));
    assert!(display.contains("til.toml"));

    let validation_err = ConfigError::Validation("Test validation error".to_string());
    let display = format!("{}", validation_err);
    assert!(display.contains("Test validation error"));
}
