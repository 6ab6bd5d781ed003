use std::fmt;
use std::path::PathBuf;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Failures that abort a rebase run. Callers can recover the variant from an
/// `eyre::Report` with `downcast_ref::<RebaseError>()`.
#[derive(Debug, Error)]
pub enum RebaseError {
    /// Pre- and post-substitution trees disagree on the number of messages.
    #[error("{}: message count changed by substitution ({original} before, {modified} after)", .document.display())]
    StructuralMismatch {
        document: PathBuf,
        original: usize,
        modified: usize,
    },

    /// A local translation bundle for an upstream locale does not exist.
    #[error("unable to find local translation bundle for locale `{locale}`: {}", .path.display())]
    MissingBundle { locale: String, path: PathBuf },

    /// A message looked up by name is absent from a catalog.
    #[error("{}: message `{name}` not found", .document.display())]
    MissingMessage { document: PathBuf, name: String },

    #[error("{}: unexpected file extension `{extension}`", .path.display())]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("{}: {message}", .path.display())]
    Xml { path: PathBuf, message: String },
}

const ID_MASK: u64 = 0x7fff_ffff_ffff_ffff;

/// Content-derived translation id, identical for identical presentable text.
///
/// Computed the way GRIT does it: the leading 64 bits of the MD5 digest,
/// optionally mixed with the fingerprint of the message meaning, masked to
/// 63 bits and printed in decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn from_text(text: &str) -> Self {
        Self::with_meaning(text, None)
    }

    pub fn with_meaning(text: &str, meaning: Option<&str>) -> Self {
        let mut fp = fingerprint(text);
        if let Some(meaning) = meaning.filter(|m| !m.is_empty()) {
            // Sign is taken from the i64 view of the text fingerprint; only the
            // low 63 bits survive, so wrapping arithmetic is exact.
            let negative = (fp as i64) < 0;
            fp = fingerprint(meaning)
                .wrapping_add(fp << 1)
                .wrapping_add(u64::from(negative));
        }
        MessageId((fp & ID_MASK).to_string())
    }

    /// Wrap an id read from an existing bundle.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        MessageId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fingerprint(text: &str) -> u64 {
    let digest = Md5::digest(text.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}
