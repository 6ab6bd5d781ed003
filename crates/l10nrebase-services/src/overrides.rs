use crate::fixups::{swap_paths, swaps_for};
use crate::naming::OverrideNaming;
use crate::Result;
use l10nrebase_config::PathSwapCfg;
use l10nrebase_core::RebaseError;
use l10nrebase_domain::OverrideSummary;
use l10nrebase_parsers_xml::{Node, ResourceDocument, Rewrite};
use std::path::PathBuf;

/// Everything the diff needs besides the two trees.
pub struct OverrideContext<'a> {
    /// File name of the catalog being rebased, e.g. `brave_strings.grd`.
    pub catalog_file_name: &'a str,
    pub naming: &'a OverrideNaming,
    /// Only swaps flagged `in_override` for this catalog are applied.
    pub path_swaps: &'a [PathSwapCfg],
    /// Whether an override part exists, given its rewritten `file` value.
    pub part_exists: &'a dyn Fn(&str) -> bool,
}

#[derive(Debug, Clone)]
pub struct OverrideDocument {
    pub document: ResourceDocument,
    pub path: PathBuf,
    pub summary: OverrideSummary,
}

impl OverrideDocument {
    pub fn write(&self) -> Result<()> {
        self.document.write(&self.path)?;
        tracing::info!(event = "override_written", path = %self.path.display(), messages = self.summary.kept_messages.len(), parts = self.summary.kept_parts.len());
        Ok(())
    }
}

/// Diff the branding-only `original` against the fully substituted
/// `modified` and keep what differs. `None` means nothing is left to
/// override.
pub fn generate_override(
    original: &ResourceDocument,
    modified: &ResourceDocument,
    ctx: &OverrideContext<'_>,
) -> Result<Option<OverrideDocument>> {
    let before = original.messages();
    let after = modified.messages();
    if before.len() != after.len() {
        return Err(RebaseError::StructuralMismatch {
            document: modified.path.clone(),
            original: before.len(),
            modified: after.len(),
        }
        .into());
    }
    let unchanged: Vec<bool> = before
        .iter()
        .zip(&after)
        .map(|(a, b)| a.text() == b.text())
        .collect();

    let mut summary = OverrideSummary::default();

    // Pass 1: messages, matched by position.
    let mut idx = 0;
    let root = modified.root.rewrite(&mut |node: &Node| match node {
        Node::Element(e) if e.name == "message" => {
            let same = unchanged[idx];
            idx += 1;
            if same {
                summary.dropped_messages += 1;
                Rewrite::Drop
            } else {
                summary
                    .kept_messages
                    .push(e.attr("name").unwrap_or_default().to_string());
                Rewrite::Keep
            }
        }
        _ => Rewrite::Keep,
    });

    // Pass 2: build metadata and references.
    let root = root.rewrite(&mut |node: &Node| match node {
        Node::Comment(_) => Rewrite::Drop,
        Node::Element(e) if e.name == "outputs" || e.name == "output" => Rewrite::Drop,
        Node::Element(e) if e.name == "part" => {
            let file = e.attr("file").unwrap_or_default();
            let target = ctx.naming.part_override_path(file, ctx.catalog_file_name);
            if (ctx.part_exists)(&target) {
                let mut part = e.clone();
                part.set_attr("file", target.as_str());
                summary.kept_parts.push(target);
                Rewrite::Replace(part)
            } else {
                tracing::debug!(event = "override_part_dropped", file = %file, missing = %target);
                summary.dropped_parts.push(file.to_string());
                Rewrite::Drop
            }
        }
        Node::Element(e) if e.name == "file" => {
            let mut file = e.clone();
            if let Some(path) = e.attr("path") {
                file.set_attr("path", ctx.naming.override_path(path));
            }
            Rewrite::Replace(file)
        }
        _ => Rewrite::Keep,
    });

    let path = ctx.naming.override_file_path(&modified.path);
    summary.path = path.display().to_string();
    if summary.kept_messages.is_empty() && summary.kept_parts.is_empty() {
        tracing::info!(event = "override_empty", path = %path.display(), dropped = summary.dropped_messages);
        return Ok(None);
    }

    let mut document = original.with_root(root);
    document.path = path.clone();
    let basename = modified.basename();
    for swap in swaps_for(ctx.path_swaps, basename).filter(|s| s.in_override) {
        swap_paths(&mut document.root, swap);
    }

    Ok(Some(OverrideDocument {
        document,
        path,
        summary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::substitution::{RuleSubstitutor, Scope, Substitutor};
    use l10nrebase_config::{SubstitutionRule, SubstitutionTarget};
    use std::path::Path;

    fn rule(pattern: &str, replacement: &str, branding: bool) -> SubstitutionRule {
        SubstitutionRule {
            pattern: pattern.into(),
            replacement: replacement.into(),
            branding,
            target: SubstitutionTarget::Text,
        }
    }

    /// Reference and modified trees of `xml` under the given rules.
    fn trees(xml: &str, name: &str, rules: &[SubstitutionRule]) -> (ResourceDocument, ResourceDocument) {
        let subs = RuleSubstitutor::new(rules).unwrap();
        let doc = ResourceDocument::parse(xml, Path::new(name)).unwrap();
        let original = doc.with_root(subs.substitute(&doc.root, Scope::Branding));
        let modified = doc.with_root(subs.substitute(&doc.root, Scope::Full));
        (original, modified)
    }

    fn ctx<'a>(
        naming: &'a OverrideNaming,
        swaps: &'a [PathSwapCfg],
        part_exists: &'a dyn Fn(&str) -> bool,
    ) -> OverrideContext<'a> {
        OverrideContext {
            catalog_file_name: "brave_strings.grd",
            naming,
            path_swaps: swaps,
            part_exists,
        }
    }

    const SCENARIO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Copyright -->
<grit current_release="1">
  <outputs>
    <output filename="grit/chromium_strings.h" type="rc_header"/>
  </outputs>
  <translations>
    <file path="resources/chromium_strings_fr.xtb" lang="fr"/>
  </translations>
  <release seq="1">
    <messages fallback_to_english="true">
      <!-- Product name -->
      <message name="A" desc="greeting">
        Hello Chrome
      </message>
      <message name="B" desc="menu">
        Settings
      </message>
    </messages>
  </release>
</grit>
"#;

    #[test]
    fn keeps_only_messages_changed_beyond_branding() {
        let (original, modified) = trees(SCENARIO, "brave_strings.grd", &[rule(r"\bChrome\b", "Brave", false)]);
        let naming = OverrideNaming::default();
        let exists = |_: &str| false;
        let out = generate_override(&original, &modified, &ctx(&naming, &[], &exists))
            .unwrap()
            .unwrap();
        assert_eq!(out.path, PathBuf::from("brave_strings_override.grd"));
        assert_eq!(out.summary.kept_messages, vec!["A"]);
        assert_eq!(out.summary.dropped_messages, 1);
        let messages = out.document.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "Hello Brave");
        assert!(out.document.outputs().is_empty());
        assert_eq!(out.document.leading_comments, vec![" Copyright "]);
        assert_eq!(
            out.document.files()[0].attr("path"),
            Some("resources/chromium_strings_fr_override.xtb")
        );
        let xml = out.document.to_xml_string();
        assert!(!xml.contains("Product name"));
        assert!(xml.contains(
            "<messages fallback_to_english=\"true\">\n      <message name=\"A\" desc=\"greeting\">\n        Hello Brave\n      </message>\n      </messages>"
        ));
    }

    #[test]
    fn branding_only_changes_produce_no_override() {
        let (original, modified) = trees(SCENARIO, "brave_strings.grd", &[rule(r"\bChrome\b", "Brave", true)]);
        let naming = OverrideNaming::default();
        let exists = |_: &str| true;
        assert!(generate_override(&original, &modified, &ctx(&naming, &[], &exists))
            .unwrap()
            .is_none());
    }

    #[test]
    fn override_set_is_exactly_the_changed_positions() {
        let xml = r#"<grit><release><messages>
  <message name="M0">Chrome one</message>
  <message name="M1">two</message>
  <message name="M2">Google three</message>
  <message name="M3">Chrome <ph name="P">Google</ph></message>
  <message name="M4">Google LLC</message>
</messages></release></grit>"#;
        let rules = [
            rule(r"\bGoogle LLC\b", "Brave Software, Inc.", true),
            rule(r"\bChrome\b", "Brave", true),
            rule(r"\bGoogle\b", "Brave", false),
        ];
        let (original, modified) = trees(xml, "x.grd", &rules);
        let naming = OverrideNaming::default();
        let exists = |_: &str| false;
        let out = generate_override(&original, &modified, &ctx(&naming, &[], &exists))
            .unwrap()
            .unwrap();
        assert_eq!(out.summary.kept_messages, vec!["M2", "M3"]);
        assert_eq!(out.summary.dropped_messages, 3);
    }

    #[test]
    fn parts_without_an_override_file_are_dropped() {
        let xml = r#"<grit><release><messages>
  <part file="settings_chromium_strings.grdp"/>
  <part file="extra.grdp"/>
  <part file="gone.grdp"/>
</messages></release></grit>"#;
        let (original, modified) = trees(xml, "brave_strings.grd", &[]);
        let naming = OverrideNaming::from_config(l10nrebase_config::builtin().unwrap().naming.as_ref());
        let exists = |f: &str| f == "settings_brave_strings_override.grdp" || f == "extra_override.grdp";
        let out = generate_override(&original, &modified, &ctx(&naming, &[], &exists))
            .unwrap()
            .unwrap();
        let parts: Vec<_> = out.document.parts().iter().filter_map(|p| p.attr("file")).collect();
        assert_eq!(parts, vec!["settings_brave_strings_override.grdp", "extra_override.grdp"]);
        assert_eq!(out.summary.dropped_parts, vec!["gone.grdp"]);
        assert!(out.document.messages().is_empty());
    }

    #[test]
    fn xtb_paths_follow_local_naming_in_override() {
        let (original, modified) = trees(SCENARIO, "brave_strings.grd", &[rule(r"\bChrome\b", "Brave", false)]);
        let cfg = l10nrebase_config::builtin().unwrap();
        let naming = OverrideNaming::default();
        let swaps = cfg.path_swaps.unwrap();
        let exists = |_: &str| false;
        let out = generate_override(&original, &modified, &ctx(&naming, &swaps, &exists))
            .unwrap()
            .unwrap();
        assert_eq!(
            out.document.files()[0].attr("path"),
            Some("resources/brave_strings_fr_override.xtb")
        );
    }

    #[test]
    fn message_count_mismatch_is_fatal() {
        let doc = ResourceDocument::parse(SCENARIO, Path::new("brave_strings.grd")).unwrap();
        let mut fewer = doc.clone();
        let messages = fewer.messages_container_mut().unwrap();
        messages
            .children
            .retain(|n| !matches!(n, Node::Element(e) if e.attr("name") == Some("B")));
        let naming = OverrideNaming::default();
        let exists = |_: &str| false;
        let err = generate_override(&doc, &fewer, &ctx(&naming, &[], &exists)).unwrap_err();
        match err.downcast_ref::<RebaseError>() {
            Some(RebaseError::StructuralMismatch { original, modified, .. }) => {
                assert_eq!((*original, *modified), (2, 1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn inputs_are_left_untouched() {
        let (original, modified) = trees(SCENARIO, "brave_strings.grd", &[rule(r"\bChrome\b", "Brave", false)]);
        let snapshot = modified.root.clone();
        let naming = OverrideNaming::default();
        let exists = |_: &str| false;
        generate_override(&original, &modified, &ctx(&naming, &[], &exists)).unwrap();
        assert_eq!(modified.root, snapshot);
        assert_eq!(modified.messages().len(), 2);
    }
}
