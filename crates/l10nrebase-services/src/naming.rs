use l10nrebase_config::NamingCfg;
use std::path::{Path, PathBuf};

pub const DEFAULT_SUFFIX: &str = "_override";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingException {
    pub parent: String,
    pub computed: String,
    pub replacement: String,
}

/// Maps a catalog, part or output path to its override counterpart:
/// `dir/chromium_strings.grd` -> `dir/brave_strings_override.grd`.
#[derive(Debug, Clone)]
pub struct OverrideNaming {
    pub suffix: String,
    /// Exact basename renames, applied before the suffix is added.
    pub renames: Vec<(String, String)>,
    pub exceptions: Vec<NamingException>,
}

impl Default for OverrideNaming {
    fn default() -> Self {
        OverrideNaming {
            suffix: DEFAULT_SUFFIX.to_string(),
            renames: Vec::new(),
            exceptions: Vec::new(),
        }
    }
}

impl OverrideNaming {
    pub fn from_config(cfg: Option<&NamingCfg>) -> Self {
        let Some(cfg) = cfg else {
            return Self::default();
        };
        OverrideNaming {
            suffix: cfg
                .suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_SUFFIX.to_string()),
            renames: cfg
                .renames
                .iter()
                .flatten()
                .map(|r| (r.from.clone(), r.to.clone()))
                .collect(),
            exceptions: cfg
                .exceptions
                .iter()
                .flatten()
                .map(|e| NamingException {
                    parent: e.parent.clone(),
                    computed: e.computed.clone(),
                    replacement: e.replacement.clone(),
                })
                .collect(),
        }
    }

    /// Override path for a `/`-separated reference as found in attributes.
    pub fn override_path(&self, path: &str) -> String {
        let (dir, file) = match path.rfind('/') {
            Some(i) => path.split_at(i + 1),
            None => ("", path),
        };
        let (stem, ext) = match file.rfind('.') {
            Some(i) if i > 0 => file.split_at(i),
            _ => (file, ""),
        };
        let stem = self
            .renames
            .iter()
            .find(|(from, _)| from == stem)
            .map_or(stem, |(_, to)| to.as_str());
        format!("{dir}{stem}{}{ext}", self.suffix)
    }

    /// Like [`override_path`](Self::override_path), honouring the
    /// exceptions registered for the catalog named `parent_file_name`.
    pub fn part_override_path(&self, path: &str, parent_file_name: &str) -> String {
        let computed = self.override_path(path);
        self.exceptions
            .iter()
            .find(|e| e.parent == parent_file_name && e.computed == computed)
            .map_or(computed, |e| e.replacement.clone())
    }

    pub fn override_file_path(&self, path: &Path) -> PathBuf {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return path.to_path_buf();
        };
        path.with_file_name(self.override_path(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming() -> OverrideNaming {
        let cfg = l10nrebase_config::builtin().unwrap();
        OverrideNaming::from_config(cfg.naming.as_ref())
    }

    #[test]
    fn appends_suffix_and_renames_exact_basenames() {
        let n = naming();
        assert_eq!(n.override_path("chromium_strings.grd"), "brave_strings_override.grd");
        assert_eq!(
            n.override_path("resources/generated_resources.grdp"),
            "resources/generated_resources_override.grdp"
        );
        // only the whole basename is renamed
        assert_eq!(
            n.override_path("resources/chromium_strings_fr.xtb"),
            "resources/chromium_strings_fr_override.xtb"
        );
        assert_eq!(n.override_path("README"), "README_override");
    }

    #[test]
    fn exception_applies_only_under_its_parent() {
        let n = naming();
        assert_eq!(
            n.part_override_path("settings_chromium_strings.grdp", "brave_strings.grd"),
            "settings_brave_strings_override.grdp"
        );
        assert_eq!(
            n.part_override_path("settings_chromium_strings.grdp", "other.grd"),
            "settings_chromium_strings_override.grdp"
        );
    }

    #[test]
    fn file_paths_keep_their_directory() {
        let n = OverrideNaming::default();
        assert_eq!(
            n.override_file_path(Path::new("/src/brave/app/generated_resources.grd")),
            PathBuf::from("/src/brave/app/generated_resources_override.grd")
        );
    }
}
