//! Configuration file support for funclift
//!
//! Loads project-specific configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.funcliftrc.json` in project root
//! 3. `funclift.config.json` in project root
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::printer::DEFAULT_INDENT;
use crate::synth::{
    is_java_identifier, is_qualified_name, SynthesisOptions, DEFAULT_ANNOTATION,
    DEFAULT_INTERFACE, DEFAULT_METHOD,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file names, in lookup order
pub const CONFIG_FILES: &[&str] = &[".funcliftrc.json", "funclift.config.json"];

/// Files and directories that mark the root of a Java project
const PROJECT_MARKERS: &[&str] = &[
    ".git",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "settings.gradle",
];

/// funclift configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FuncliftConfig {
    /// Functional interface to implement, simple or qualified (default: `Function`)
    #[serde(default)]
    pub interface: Option<String>,

    /// Annotation carrying the declared name (default: `Named`)
    #[serde(default)]
    pub annotation: Option<String>,

    /// Name of the generated method (default: `apply`)
    #[serde(default)]
    pub method: Option<String>,

    /// Emit wrapper classes instead of primitive type arguments (default: false)
    #[serde(default)]
    pub box_primitives: Option<bool>,

    /// Copy the source file's imports into the generated unit (default: true)
    #[serde(default)]
    pub copy_imports: Option<bool>,

    /// Refuse to overwrite an existing generated file (default: false)
    #[serde(default)]
    pub strict: Option<bool>,

    /// Indentation width of generated code (default: 4)
    #[serde(default)]
    pub indent: Option<usize>,
}

/// Configuration with defaults applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub interface: String,
    pub annotation: String,
    pub method: String,
    pub box_primitives: bool,
    pub copy_imports: bool,
    pub strict: bool,
    pub indent: usize,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl FuncliftConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref interface) = self.interface {
            if !is_qualified_name(interface) {
                anyhow::bail!("interface must be a Java type name (got {:?})", interface);
            }
        }

        for (key, value) in [("annotation", &self.annotation), ("method", &self.method)] {
            if let Some(name) = value {
                if !is_java_identifier(name) {
                    anyhow::bail!("{} must be a Java identifier (got {:?})", key, name);
                }
            }
        }

        if let Some(indent) = self.indent {
            if !(1..=8).contains(&indent) {
                anyhow::bail!("indent must be between 1 and 8 (got {})", indent);
            }
        }

        Ok(())
    }

    /// Resolve config, filling in defaults
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            interface: self
                .interface
                .clone()
                .unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            annotation: self
                .annotation
                .clone()
                .unwrap_or_else(|| DEFAULT_ANNOTATION.to_string()),
            method: self
                .method
                .clone()
                .unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            box_primitives: self.box_primitives.unwrap_or(false),
            copy_imports: self.copy_imports.unwrap_or(true),
            strict: self.strict.unwrap_or(false),
            indent: self.indent.unwrap_or(DEFAULT_INDENT),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Self {
        ResolvedConfig {
            interface: DEFAULT_INTERFACE.to_string(),
            annotation: DEFAULT_ANNOTATION.to_string(),
            method: DEFAULT_METHOD.to_string(),
            box_primitives: false,
            copy_imports: true,
            strict: false,
            indent: DEFAULT_INDENT,
            config_path: None,
        }
    }

    pub fn synthesis_options(&self) -> SynthesisOptions {
        SynthesisOptions {
            interface: self.interface.clone(),
            annotation: self.annotation.clone(),
            method: self.method.clone(),
            box_primitives: self.box_primitives,
            copy_imports: self.copy_imports,
        }
    }
}

/// Nearest directory at or above `source`'s directory holding a config file
/// or a build marker; falls back to the source's own directory
pub fn find_project_root(source: &Path) -> PathBuf {
    let directory = if source.is_dir() {
        source.to_path_buf()
    } else {
        source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    };
    let directory = directory.canonicalize().unwrap_or(directory);

    directory
        .ancestors()
        .find(|candidate| {
            CONFIG_FILES
                .iter()
                .chain(PROJECT_MARKERS)
                .any(|marker| candidate.join(marker).exists())
        })
        .map(Path::to_path_buf)
        .unwrap_or(directory)
}

/// Discover and load a config file from the project root
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(FuncliftConfig, PathBuf)>> {
    for name in CONFIG_FILES {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<FuncliftConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: FuncliftConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (FuncliftConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}
