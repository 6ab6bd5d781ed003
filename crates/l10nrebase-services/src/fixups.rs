//! One-off corrections applied to a catalog after substitution and
//! migration: message text fixes, part renames and path swaps.

use crate::Result;
use l10nrebase_config::{FixupCfg, PartRenameCfg, PathSwapCfg};
use l10nrebase_parsers_xml::{Element, Node, ResourceDocument};

/// Apply every fixup registered for `doc`'s basename. Returns how many
/// messages were touched.
pub fn apply_fixups(doc: &mut ResourceDocument, fixups: &[FixupCfg]) -> Result<usize> {
    let basename = doc.basename().to_string();
    let mut applied = 0;
    for fixup in fixups.iter().filter(|f| f.catalog == basename) {
        let message = doc.require_message_mut(&fixup.message)?;
        if let Some(text) = &fixup.text {
            message.children = vec![Node::Text(text.clone())];
        }
        if let Some(replace) = &fixup.replace {
            replace_in_text(message, &replace.from, &replace.to);
        }
        for attr in &fixup.drop_attributes {
            message.remove_attr(attr);
        }
        tracing::debug!(event = "fixup_applied", message = %fixup.message);
        applied += 1;
    }
    Ok(applied)
}

fn replace_in_text(el: &mut Element, from: &str, to: &str) {
    for child in el.children.iter_mut() {
        if let Node::Text(t) = child {
            if t.contains(from) {
                *t = t.replace(from, to);
            }
        }
    }
}

pub fn apply_part_renames(doc: &mut ResourceDocument, renames: &[PartRenameCfg]) -> usize {
    let basename = doc.basename().to_string();
    let mut renamed = 0;
    for rename in renames.iter().filter(|r| r.catalog == basename) {
        match doc
            .root
            .find_mut(&|e: &Element| e.name == "part" && e.attr("file") == Some(rename.from.as_str()))
        {
            Some(part) => {
                part.set_attr("file", rename.to.as_str());
                renamed += 1;
            }
            None => tracing::warn!(event = "part_rename_skipped", file = %rename.from, "part not found"),
        }
    }
    renamed
}

/// Rewrite `swap.from` to `swap.to` in every matching attribute whose value
/// ends with one of the swap's suffixes. Returns the number of rewrites.
pub fn swap_paths(root: &mut Element, swap: &PathSwapCfg) -> usize {
    let mut swapped = 0;
    root.for_each_element_mut(&mut |el: &mut Element| {
        if el.name != swap.element {
            return;
        }
        let Some(value) = el.attr(&swap.attribute) else {
            return;
        };
        let suffix_ok =
            swap.suffixes.is_empty() || swap.suffixes.iter().any(|s| value.ends_with(s.as_str()));
        if suffix_ok && value.contains(&swap.from) {
            let next = value.replace(&swap.from, &swap.to);
            el.set_attr(&swap.attribute, next);
            swapped += 1;
        }
    });
    swapped
}

/// Swaps registered for catalogs named `basename`.
pub fn swaps_for<'a>(
    swaps: &'a [PathSwapCfg],
    basename: &'a str,
) -> impl Iterator<Item = &'a PathSwapCfg> + 'a {
    swaps
        .iter()
        .filter(move |s| s.catalogs.iter().any(|c| c == basename))
}
