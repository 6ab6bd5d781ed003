use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "l10nrebase.toml";

const BUILTIN: &str = include_str!("builtin.toml");

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RebaseConfig {
    pub project_root: Option<PathBuf>,
    pub upstream_root: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub naming: Option<NamingCfg>,
    pub substitutions: Option<Vec<SubstitutionRule>>,
    pub migration: Option<MigrationCfg>,
    pub fixups: Option<Vec<FixupCfg>>,
    pub part_renames: Option<Vec<PartRenameCfg>>,
    pub path_swaps: Option<Vec<PathSwapCfg>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamingCfg {
    pub suffix: Option<String>,
    pub renames: Option<Vec<RenameCfg>>,
    pub exceptions: Option<Vec<NamingExceptionCfg>>,
}

/// Exact basename rename applied before the override suffix is added.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RenameCfg {
    pub from: String,
    pub to: String,
}

/// Override name to use instead of `computed` when rebasing `parent`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct NamingExceptionCfg {
    pub parent: String,
    pub computed: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubstitutionTarget {
    #[default]
    Text,
    Path,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubstitutionRule {
    pub pattern: String,
    pub replacement: String,
    /// Branding rules are the only ones applied to the reference copy.
    #[serde(default)]
    pub branding: bool,
    #[serde(default)]
    pub target: SubstitutionTarget,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationCfg {
    /// Catalog basename that triggers the migration.
    pub catalog: Option<String>,
    /// Upstream catalog, relative to the upstream root.
    pub upstream_catalog: Option<String>,
    /// Glob for upstream bundles, relative to the upstream root.
    pub upstream_bundles: Option<String>,
    pub upstream_bundle_prefix: Option<String>,
    /// Local bundle path relative to the project root, `{lang}` substituted.
    pub local_bundle: Option<String>,
    pub buffer_writes: Option<bool>,
    /// Upstream name -> local name, migrated in the order declared.
    pub messages: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FixupCfg {
    pub catalog: String,
    pub message: String,
    pub text: Option<String>,
    pub replace: Option<ReplaceCfg>,
    #[serde(default)]
    pub drop_attributes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceCfg {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PartRenameCfg {
    pub catalog: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathSwapCfg {
    pub catalogs: Vec<String>,
    pub element: String,
    pub attribute: String,
    #[serde(default)]
    pub suffixes: Vec<String>,
    pub from: String,
    pub to: String,
    /// Also rewrite matching paths inside the override document.
    #[serde(default)]
    pub in_override: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid built-in tables: {0}")]
    Builtin(#[from] toml::de::Error),
}

/// Tables shipped with the tool.
pub fn builtin() -> Result<RebaseConfig, ConfigError> {
    Ok(toml::from_str(BUILTIN)?)
}

pub fn read_config_file(path: &Path) -> Result<RebaseConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load configuration. With `explicit` set only that file is read;
/// otherwise CWD/l10nrebase.toml, then $CONFIG/l10nrebase/l10nrebase.toml.
/// Unset fields fall back to the built-in tables.
pub fn load_config(explicit: Option<&Path>) -> Result<RebaseConfig, ConfigError> {
    let mut merged = RebaseConfig::default();
    if let Some(path) = explicit {
        merged = merge(merged, read_config_file(path)?);
    } else {
        let mut candidates = Vec::new();
        if let Ok(p) = std::env::current_dir() {
            candidates.push(p.join(CONFIG_FILE_NAME));
        }
        if let Some(base) = dirs::config_dir() {
            candidates.push(base.join("l10nrebase").join(CONFIG_FILE_NAME));
        }
        for path in candidates.iter().filter(|p| p.is_file()) {
            merged = merge(merged, read_config_file(path)?);
        }
    }
    Ok(merge(merged, builtin()?))
}

/// Field-wise merge; values already set in `a` win.
pub fn merge(mut a: RebaseConfig, b: RebaseConfig) -> RebaseConfig {
    if a.project_root.is_none() {
        a.project_root = b.project_root;
    }
    if a.upstream_root.is_none() {
        a.upstream_root = b.upstream_root;
    }
    if a.log_dir.is_none() {
        a.log_dir = b.log_dir;
    }
    if a.substitutions.is_none() {
        a.substitutions = b.substitutions;
    }
    if a.fixups.is_none() {
        a.fixups = b.fixups;
    }
    if a.part_renames.is_none() {
        a.part_renames = b.part_renames;
    }
    if a.path_swaps.is_none() {
        a.path_swaps = b.path_swaps;
    }
    a.naming = merge_opt(a.naming, b.naming, merge_naming);
    a.migration = merge_opt(a.migration, b.migration, merge_migration);
    a
}

fn merge_opt<T>(a: Option<T>, b: Option<T>, f: fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (None, Some(b)) => Some(b),
        (Some(a), None) => Some(a),
        (None, None) => None,
    }
}

fn merge_naming(mut a: NamingCfg, b: NamingCfg) -> NamingCfg {
    if a.suffix.is_none() {
        a.suffix = b.suffix;
    }
    if a.renames.is_none() {
        a.renames = b.renames;
    }
    if a.exceptions.is_none() {
        a.exceptions = b.exceptions;
    }
    a
}

fn merge_migration(mut a: MigrationCfg, b: MigrationCfg) -> MigrationCfg {
    if a.catalog.is_none() {
        a.catalog = b.catalog;
    }
    if a.upstream_catalog.is_none() {
        a.upstream_catalog = b.upstream_catalog;
    }
    if a.upstream_bundles.is_none() {
        a.upstream_bundles = b.upstream_bundles;
    }
    if a.upstream_bundle_prefix.is_none() {
        a.upstream_bundle_prefix = b.upstream_bundle_prefix;
    }
    if a.local_bundle.is_none() {
        a.local_bundle = b.local_bundle;
    }
    if a.buffer_writes.is_none() {
        a.buffer_writes = b.buffer_writes;
    }
    if a.messages.is_none() {
        a.messages = b.messages;
    }
    a
}
