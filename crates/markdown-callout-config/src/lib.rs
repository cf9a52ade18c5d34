//! Configuration primitives and loader for the markdown-callout renderer.
//!
//! Settings resolve through a precedence stack:
//! override flag → working directory → git root → built-in defaults.
//! Each layer only overrides the keys it sets, and the resolved settings are
//! normalised into typed structures so the renderer never touches raw TOML.

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = ".markdown-callout.toml";

/// Complete configuration resolved from defaults and on-disk overrides.
#[derive(Clone, Debug)]
pub struct Config {
    pub markdown: MarkdownSettings,
    pub variables: BTreeMap<String, String>,
    pub sources: ConfigSources,
}

/// Markdown extensions handed to the converter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MarkdownSettings {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub smart_punctuation: bool,
    pub heading_ids: bool,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        MarkdownSettings {
            tables: true,
            footnotes: true,
            strikethrough: false,
            tasklists: false,
            smart_punctuation: true,
            heading_ids: true,
        }
    }
}

/// Provenance information for resolved configuration.
#[derive(Clone, Debug)]
pub struct ConfigSources {
    pub working_directory: PathBuf,
    pub layers: Vec<ConfigSource>,
}

/// Specific layer of configuration (default/git/local/override).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigSource {
    pub kind: ConfigSourceKind,
    pub path: Option<PathBuf>,
}

impl ConfigSource {
    fn default() -> Self {
        ConfigSource {
            kind: ConfigSourceKind::Default,
            path: None,
        }
    }

    fn for_file(kind: ConfigSourceKind, path: PathBuf) -> Self {
        ConfigSource {
            kind,
            path: Some(path),
        }
    }

    fn describe(&self) -> String {
        match (&self.kind, &self.path) {
            (ConfigSourceKind::Default, _) => "built-in defaults".to_owned(),
            (kind, Some(path)) => format!("{} at {}", kind, path.display()),
            (kind, None) => kind.to_string(),
        }
    }
}

/// Kinds of configuration sources, ordered from lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigSourceKind {
    Default,
    GitRoot,
    Local,
    Override,
}

impl fmt::Display for ConfigSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSourceKind::Default => "defaults",
            ConfigSourceKind::GitRoot => "git-root config",
            ConfigSourceKind::Local => "local config",
            ConfigSourceKind::Override => "override config",
        };
        f.write_str(label)
    }
}

/// Loader options, typically supplied by the CLI layer.
#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub override_path: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl LoadOptions {
    pub fn with_override_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_path = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }
}

/// Errors surfaced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to resolve working directory {attempted}: {source}")]
    WorkingDirectory {
        attempted: PathBuf,
        source: io::Error,
    },
    #[error("override config {path} not found")]
    OverrideNotFound { path: PathBuf },
    #[error("failed to read config {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("configuration validation failed:\n{0}")]
    Validation(ConfigValidationErrors),
}

impl Config {
    /// Loads configuration using the precedence rules and returns typed settings.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let working_dir = resolve_working_dir(options.working_dir)?;
        let override_path = options
            .override_path
            .map(|path| make_absolute(&path, &working_dir));

        if let Some(path) = &override_path {
            if !path.exists() {
                return Err(ConfigError::OverrideNotFound { path: path.clone() });
            }
        }

        let mut merged = PartialConfig::default();
        let mut source_layers = vec![ConfigSource::default()];

        let git_config_path = find_git_root(&working_dir).map(|root| root.join(CONFIG_FILE_NAME));
        let local_config_path = working_dir.join(CONFIG_FILE_NAME);

        if let Some(path) = git_config_path.as_ref() {
            if path.exists() && Some(path) != override_path.as_ref() && path != &local_config_path {
                let source = ConfigSource::for_file(ConfigSourceKind::GitRoot, path.clone());
                merged.merge(load_layer(path, source.clone())?);
                source_layers.push(source);
            }
        }

        if local_config_path.exists() && Some(&local_config_path) != override_path.as_ref() {
            let source = ConfigSource::for_file(ConfigSourceKind::Local, local_config_path.clone());
            merged.merge(load_layer(&local_config_path, source.clone())?);
            source_layers.push(source);
        }

        if let Some(path) = override_path {
            let source = ConfigSource::for_file(ConfigSourceKind::Override, path.clone());
            merged.merge(load_layer(&path, source.clone())?);
            source_layers.push(source);
        }

        let (markdown, variables) = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            markdown,
            variables,
            sources: ConfigSources {
                working_directory: working_dir,
                layers: source_layers,
            },
        })
    }

    /// Parses a single configuration document on top of the built-in defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let source = ConfigSource::for_file(ConfigSourceKind::Override, PathBuf::from("<inline>"));
        let layer = parse_layer(contents, source.clone()).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;

        let mut merged = PartialConfig::default();
        merged.merge(layer);
        let (markdown, variables) = merged.finalize().map_err(ConfigError::Validation)?;
        Ok(Config {
            markdown,
            variables,
            sources: ConfigSources {
                working_directory: PathBuf::from("."),
                layers: vec![ConfigSource::default(), source],
            },
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            markdown: MarkdownSettings::default(),
            variables: BTreeMap::new(),
            sources: ConfigSources {
                working_directory: PathBuf::from("."),
                layers: vec![ConfigSource::default()],
            },
        }
    }
}

fn resolve_working_dir(override_dir: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match override_dir {
        Some(path) => fs::canonicalize(&path).map_err(|source| ConfigError::WorkingDirectory {
            attempted: path,
            source,
        }),
        None => env::current_dir().map_err(|source| ConfigError::WorkingDirectory {
            attempted: PathBuf::from("."),
            source,
        }),
    }
}

fn make_absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn load_layer(path: &Path, source: ConfigSource) -> Result<PartialConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.into(),
        source,
    })?;
    parse_layer(&contents, source).map_err(|source| ConfigError::Parse {
        path: path.into(),
        source,
    })
}

fn parse_layer(contents: &str, source: ConfigSource) -> Result<PartialConfig, toml::de::Error> {
    let raw: RawConfig = toml::from_str(contents)?;
    Ok(raw.into_partial(source))
}

fn find_git_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

#[derive(Clone, Debug)]
struct Located<T> {
    value: T,
    source: ConfigSource,
}

impl<T> Located<T> {
    fn new(value: T, source: ConfigSource) -> Self {
        Located { value, source }
    }
}

#[derive(Clone, Debug, Default)]
struct PartialConfig {
    markdown: MarkdownPartial,
    variables: BTreeMap<String, Located<String>>,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        self.markdown.merge(other.markdown);
        // Variables merge per key so a local file can override one global.
        self.variables.extend(other.variables);
    }

    fn finalize(
        self,
    ) -> Result<(MarkdownSettings, BTreeMap<String, String>), ConfigValidationErrors> {
        let mut errors = Vec::new();

        for (name, located) in &self.variables {
            if !is_valid_variable_name(name) {
                errors.push(
                    ConfigValidationError::new(
                        Some(located.source.clone()),
                        format!("'{name}' is not a valid template variable name"),
                    )
                    .with_context("variables"),
                );
            }
        }

        if !errors.is_empty() {
            return Err(ConfigValidationErrors(errors));
        }

        let variables = self
            .variables
            .into_iter()
            .map(|(name, located)| (name, located.value))
            .collect();
        Ok((self.markdown.finalize(), variables))
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct MarkdownPartial {
    tables: Option<bool>,
    footnotes: Option<bool>,
    strikethrough: Option<bool>,
    tasklists: Option<bool>,
    smart_punctuation: Option<bool>,
    heading_ids: Option<bool>,
}

impl MarkdownPartial {
    fn merge(&mut self, other: MarkdownPartial) {
        self.tables = other.tables.or(self.tables);
        self.footnotes = other.footnotes.or(self.footnotes);
        self.strikethrough = other.strikethrough.or(self.strikethrough);
        self.tasklists = other.tasklists.or(self.tasklists);
        self.smart_punctuation = other.smart_punctuation.or(self.smart_punctuation);
        self.heading_ids = other.heading_ids.or(self.heading_ids);
    }

    fn finalize(self) -> MarkdownSettings {
        let defaults = MarkdownSettings::default();
        MarkdownSettings {
            tables: self.tables.unwrap_or(defaults.tables),
            footnotes: self.footnotes.unwrap_or(defaults.footnotes),
            strikethrough: self.strikethrough.unwrap_or(defaults.strikethrough),
            tasklists: self.tasklists.unwrap_or(defaults.tasklists),
            smart_punctuation: self.smart_punctuation.unwrap_or(defaults.smart_punctuation),
            heading_ids: self.heading_ids.unwrap_or(defaults.heading_ids),
        }
    }
}

/// Liquid identifiers: a leading letter or underscore, then letters, digits, `_` or `-`.
fn is_valid_variable_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
}

/// Aggregated validation failures.
#[derive(Clone, Debug)]
pub struct ConfigValidationErrors(pub Vec<ConfigValidationError>);

impl fmt::Display for ConfigValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "- {err}")?;
        }
        Ok(())
    }
}

impl ConfigValidationErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigValidationError> {
        self.0.iter()
    }
}

/// Validation failure with optional provenance.
#[derive(Clone, Debug)]
pub struct ConfigValidationError {
    pub source: Option<ConfigSource>,
    pub message: String,
    pub context: Option<String>,
}

impl ConfigValidationError {
    fn new(source: Option<ConfigSource>, message: String) -> Self {
        ConfigValidationError {
            source,
            message,
            context: None,
        }
    }

    fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{}: {}", context, self.message)?;
        } else {
            write!(f, "{}", self.message)?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source.describe())?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    markdown: Option<RawMarkdown>,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

impl RawConfig {
    fn into_partial(self, source: ConfigSource) -> PartialConfig {
        PartialConfig {
            markdown: self
                .markdown
                .map(RawMarkdown::into_partial)
                .unwrap_or_default(),
            variables: self
                .variables
                .into_iter()
                .map(|(name, value)| (name, Located::new(value, source.clone())))
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMarkdown {
    tables: Option<bool>,
    footnotes: Option<bool>,
    strikethrough: Option<bool>,
    tasklists: Option<bool>,
    smart_punctuation: Option<bool>,
    heading_ids: Option<bool>,
}

impl RawMarkdown {
    fn into_partial(self) -> MarkdownPartial {
        MarkdownPartial {
            tables: self.tables,
            footnotes: self.footnotes,
            strikethrough: self.strikethrough,
            tasklists: self.tasklists,
            smart_punctuation: self.smart_punctuation,
            heading_ids: self.heading_ids,
        }
    }
}
