use crate::fixups::{apply_fixups, apply_part_renames, swap_paths, swaps_for};
use crate::migrate::{migrate_messages, MigrationPlan};
use crate::naming::OverrideNaming;
use crate::overrides::{generate_override, OverrideContext};
use crate::substitution::{substitute_in_place, RuleSubstitutor, Scope, Substitutor};
use crate::Result;
use l10nrebase_config::{FixupCfg, PartRenameCfg, PathSwapCfg, RebaseConfig};
use l10nrebase_core::RebaseError;
use l10nrebase_domain::{OverrideSummary, RebaseReport, REPORT_VERSION};
use indexmap::IndexMap;
use l10nrebase_parsers_xml::{is_catalog_path, leading_comments, ResourceDocument};
use std::path::{Path, PathBuf};

/// Migration applied when the catalog basename equals `catalog`.
#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub catalog: String,
    pub messages: IndexMap<String, String>,
    pub plan: MigrationPlan,
}

/// Resolved run settings: absolute roots plus compiled tables.
#[derive(Debug)]
pub struct Settings {
    pub project_root: PathBuf,
    pub upstream_root: PathBuf,
    pub naming: OverrideNaming,
    pub substitutor: RuleSubstitutor,
    pub migration: Option<MigrationSettings>,
    pub fixups: Vec<FixupCfg>,
    pub part_renames: Vec<PartRenameCfg>,
    pub path_swaps: Vec<PathSwapCfg>,
}

impl Settings {
    pub fn from_config(cfg: &RebaseConfig) -> Result<Self> {
        let project_root = match &cfg.project_root {
            Some(p) => p.clone(),
            None => std::env::current_dir()?,
        };
        let upstream_root = cfg
            .upstream_root
            .clone()
            .or_else(|| project_root.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| project_root.clone());

        let migration = cfg.migration.as_ref().and_then(|m| {
            if m.catalog.is_none()
                || m.upstream_catalog.is_none()
                || m.upstream_bundles.is_none()
                || m.local_bundle.is_none()
            {
                tracing::warn!(event = "migration_disabled", "incomplete [migration] table");
            }
            let catalog = m.catalog.clone()?;
            let plan = MigrationPlan {
                upstream_catalog: upstream_root.join(m.upstream_catalog.as_deref()?),
                upstream_bundles: upstream_root
                    .join(m.upstream_bundles.as_deref()?)
                    .display()
                    .to_string(),
                upstream_bundle_prefix: m.upstream_bundle_prefix.clone().unwrap_or_default(),
                local_bundle: project_root
                    .join(m.local_bundle.as_deref()?)
                    .display()
                    .to_string(),
                buffer_writes: m.buffer_writes.unwrap_or(false),
            };
            Some(MigrationSettings {
                catalog,
                messages: m.messages.clone().unwrap_or_default(),
                plan,
            })
        });

        Ok(Settings {
            naming: OverrideNaming::from_config(cfg.naming.as_ref()),
            substitutor: RuleSubstitutor::new(cfg.substitutions.as_deref().unwrap_or_default())?,
            migration,
            fixups: cfg.fixups.clone().unwrap_or_default(),
            part_renames: cfg.part_renames.clone().unwrap_or_default(),
            path_swaps: cfg.path_swaps.clone().unwrap_or_default(),
            project_root,
            upstream_root,
        })
    }
}

/// Rebase one catalog: write its override document, rewrite it in place and,
/// for the migration catalog, pull messages and translations from upstream.
/// `source` is resolved against the project root.
pub fn rebase(source: &Path, settings: &Settings) -> Result<RebaseReport> {
    let path = settings.project_root.join(source);
    if !is_catalog_path(&path) {
        let extension = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        return Err(RebaseError::UnsupportedExtension { path, extension }.into());
    }
    tracing::info!(event = "rebase_start", path = %path.display());

    let comments = leading_comments(&path)?;
    let overrides = write_overrides(&path, &comments, settings)?;

    let mut catalog = ResourceDocument::read(&path)?;
    catalog.leading_comments = comments;
    let basename = catalog.basename().to_string();

    let migration = match settings.migration.as_ref().filter(|m| m.catalog == basename) {
        Some(m) => Some(migrate_messages(&mut catalog, &m.messages, &m.plan)?),
        None => None,
    };
    let fixups_applied = apply_fixups(&mut catalog, &settings.fixups)?
        + apply_part_renames(&mut catalog, &settings.part_renames);

    let paths_swapped: usize = swaps_for(&settings.path_swaps, &basename)
        .map(|s| swap_paths(&mut catalog.root, s))
        .sum();

    catalog.write(&path)?;
    tracing::info!(event = "rebase_done", path = %path.display(), fixups = fixups_applied, paths_swapped);

    Ok(RebaseReport {
        report_version: REPORT_VERSION,
        source: path.display().to_string(),
        overrides,
        migration,
        fixups_applied,
        paths_swapped,
    })
}

fn write_overrides(path: &Path, comments: &[String], settings: &Settings) -> Result<OverrideSummary> {
    let mut reference = ResourceDocument::read(path)?;
    reference.leading_comments = comments.to_vec();
    reference.root = settings.substitutor.substitute(&reference.root, Scope::Branding);

    substitute_in_place(path, &settings.substitutor, Scope::Full)?;
    let modified = ResourceDocument::read(path)?;

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let part_exists = |file: &str| dir.join(file).exists();
    let ctx = OverrideContext {
        catalog_file_name: reference.file_name(),
        naming: &settings.naming,
        path_swaps: &settings.path_swaps,
        part_exists: &part_exists,
    };
    match generate_override(&reference, &modified, &ctx)? {
        Some(doc) => {
            doc.write()?;
            let mut summary = doc.summary;
            summary.written = true;
            Ok(summary)
        }
        None => Ok(OverrideSummary {
            path: settings.naming.override_file_path(path).display().to_string(),
            ..Default::default()
        }),
    }
}
