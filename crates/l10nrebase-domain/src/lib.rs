use l10nrebase_core::MessageId;
use serde::{Deserialize, Serialize};

pub const REPORT_VERSION: u32 = 1;

/// Outcome of diffing one catalog against its branding-only reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverrideSummary {
    /// Destination of the override document, whether or not it was written.
    pub path: String,
    pub written: bool,
    pub kept_messages: Vec<String>,
    pub dropped_messages: usize,
    pub kept_parts: Vec<String>,
    pub dropped_parts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigratedMessage {
    pub upstream_name: String,
    pub local_name: String,
    pub id: MessageId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleUpdate {
    pub locale: String,
    pub path: String,
    pub inserted: usize,
    pub updated: usize,
    /// Ids with no upstream translation for this locale.
    pub missing: Vec<MessageId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationReport {
    pub messages: Vec<MigratedMessage>,
    pub bundles: Vec<BundleUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebaseReport {
    pub report_version: u32,
    pub source: String,
    pub overrides: OverrideSummary,
    pub migration: Option<MigrationReport>,
    pub fixups_applied: usize,
    pub paths_swapped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_ids_as_plain_strings() {
        let report = RebaseReport {
            report_version: REPORT_VERSION,
            source: "app/brave_strings.grd".into(),
            overrides: OverrideSummary::default(),
            migration: Some(MigrationReport {
                messages: vec![MigratedMessage {
                    upstream_name: "IDS_A".into(),
                    local_name: "IDS_B".into(),
                    id: MessageId::from_raw("42"),
                }],
                bundles: Vec::new(),
            }),
            fixups_applied: 0,
            paths_swapped: 0,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["migration"]["messages"][0]["id"], "42");
        assert_eq!(json["overrides"]["written"], false);
    }
}
