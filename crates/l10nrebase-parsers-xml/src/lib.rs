//! XML readers and writers for resource catalogs (`.grd`/`.grdp`) and
//! translation bundles (`.xtb`). Writers reproduce the upstream layout
//! exactly, since these files live in version control.

pub mod grd;
pub mod tree;
pub mod xtb;

pub use grd::{is_catalog_path, Message, ResourceDocument, CATALOG_EXTENSIONS};
pub use tree::{leading_comments, parse_document, Element, Node, Rewrite, XmlDocument};
pub use xtb::{TranslationBundle, Upsert};
