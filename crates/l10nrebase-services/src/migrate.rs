use crate::Result;
use l10nrebase_core::{MessageId, RebaseError};
use l10nrebase_domain::{BundleUpdate, MigratedMessage, MigrationReport};
use l10nrebase_parsers_xml::{Element, Node, ResourceDocument, TranslationBundle, Upsert};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Where upstream sources live and where local bundles go.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub upstream_catalog: PathBuf,
    /// Glob pattern matching one upstream bundle per locale.
    pub upstream_bundles: String,
    /// File name prefix stripped from upstream bundles to get the locale.
    pub upstream_bundle_prefix: String,
    /// Local bundle path with a `{lang}` placeholder.
    pub local_bundle: String,
    /// Resolve every local bundle before writing any of them.
    pub buffer_writes: bool,
}

impl MigrationPlan {
    pub fn local_bundle_path(&self, lang: &str) -> PathBuf {
        PathBuf::from(self.local_bundle.replace("{lang}", lang))
    }

    /// Locale encoded in an upstream bundle file name, if any.
    pub fn locale_of(&self, upstream: &Path) -> Option<String> {
        let name = upstream.file_name()?.to_str()?;
        let lang = name
            .strip_prefix(self.upstream_bundle_prefix.as_str())
            .unwrap_or(name)
            .trim_end_matches(".xtb");
        (!lang.is_empty()).then(|| lang.to_string())
    }

    fn upstream_bundle_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = glob::glob(&self.upstream_bundles)?.collect::<std::result::Result<Vec<_>, _>>()?;
        paths.sort();
        Ok(paths)
    }
}

/// Move the messages named in `map` (upstream name -> local name) from the
/// upstream catalog into `catalog`, in map order, then carry their
/// translations over to the local per-locale bundles.
///
/// A local message that already carries the target name is replaced where
/// it stands. The upstream `meaning` travels with the message so the local
/// catalog derives the same id the bundles are keyed by.
///
/// A missing local bundle aborts with `MissingBundle`. Unless
/// `buffer_writes` is set, bundles for earlier locales are already on disk
/// at that point.
pub fn migrate_messages(
    catalog: &mut ResourceDocument,
    map: &IndexMap<String, String>,
    plan: &MigrationPlan,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    if map.is_empty() {
        tracing::debug!(event = "migration_skipped", reason = "empty map");
        return Ok(report);
    }
    tracing::info!(event = "migration_start", catalog = %catalog.path.display(), messages = map.len());

    let upstream = ResourceDocument::read(&plan.upstream_catalog)?;
    let catalog_path = catalog.path.clone();
    let mut ids = Vec::with_capacity(map.len());
    for (upstream_name, local_name) in map {
        let message = upstream.require_message(upstream_name)?;
        let id = message.id();
        let mut el = Element::new("message");
        el.set_attr("name", local_name.as_str());
        if let Some(desc) = message.desc() {
            el.set_attr("desc", desc);
        }
        if let Some(meaning) = message.meaning() {
            el.set_attr("meaning", meaning);
        }
        el.children = message.element().children.clone();
        if let Some(existing) = catalog.find_message_mut(local_name) {
            *existing = el;
            tracing::debug!(event = "message_replaced", upstream = %upstream_name, local = %local_name, id = %id);
        } else {
            let container = catalog.messages_container_mut().ok_or_else(|| RebaseError::Xml {
                path: catalog_path.clone(),
                message: "no <messages> element to migrate into".to_string(),
            })?;
            container.append_element(el);
            tracing::debug!(event = "message_migrated", upstream = %upstream_name, local = %local_name, id = %id);
        }
        ids.push(id.clone());
        report.messages.push(MigratedMessage {
            upstream_name: upstream_name.clone(),
            local_name: local_name.clone(),
            id,
        });
    }

    let mut pending: Vec<TranslationBundle> = Vec::new();
    for upstream_path in plan.upstream_bundle_paths()? {
        let Some(lang) = plan.locale_of(&upstream_path) else {
            tracing::warn!(event = "bundle_skipped", path = %upstream_path.display(), "unable to determine locale");
            continue;
        };
        let local_path = plan.local_bundle_path(&lang);
        if !local_path.exists() {
            return Err(RebaseError::MissingBundle {
                locale: lang,
                path: local_path,
            }
            .into());
        }
        let upstream_bundle = TranslationBundle::read(&upstream_path)?;
        if upstream_bundle.is_empty() {
            tracing::debug!(event = "upstream_bundle_empty", locale = %lang, path = %upstream_path.display());
        }
        let mut local = TranslationBundle::read(&local_path)?;
        let update = merge_translations(&upstream_bundle, &mut local, &ids, &lang);
        report.bundles.push(update);
        if plan.buffer_writes {
            pending.push(local);
        } else {
            local.write(&local_path)?;
        }
    }
    for bundle in &pending {
        bundle.write(&bundle.path)?;
    }
    Ok(report)
}

fn merge_translations(
    upstream: &TranslationBundle,
    local: &mut TranslationBundle,
    ids: &[MessageId],
    lang: &str,
) -> BundleUpdate {
    let mut update = BundleUpdate {
        locale: lang.to_string(),
        path: local.path.display().to_string(),
        inserted: 0,
        updated: 0,
        missing: Vec::new(),
    };
    for id in ids {
        let Some(found) = upstream.translation(id) else {
            tracing::debug!(event = "translation_missing", locale = %lang, id = %id);
            update.missing.push(id.clone());
            continue;
        };
        let content: Vec<Node> = found.children.clone();
        match local.upsert(id, content) {
            Upsert::Inserted => update.inserted += 1,
            Upsert::Updated => update.updated += 1,
        }
    }
    update
}
