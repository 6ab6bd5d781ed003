//! Rebase pipeline over the lower-level crates: substitution, override
//! generation, translation migration and catalog fixups. The CLI only talks
//! to this crate.

pub mod fixups;
pub mod migrate;
pub mod naming;
pub mod overrides;
pub mod rebase;
pub mod substitution;

pub use l10nrebase_core::{RebaseError, Result};

pub use migrate::{migrate_messages, MigrationPlan};
pub use naming::OverrideNaming;
pub use overrides::{generate_override, OverrideContext, OverrideDocument};
pub use rebase::{rebase, MigrationSettings, Settings};
pub use substitution::{RuleSubstitutor, Scope, Substitutor};
