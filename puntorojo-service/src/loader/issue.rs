use puntorojo_domain::TableRole;
use serde::Serialize;

/// A problem found while loading one table. Issues are reported next to the
/// analysis result; the offending table or row is skipped.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoadIssue {
    #[error("{table}: unreadable ({reason})")]
    Unreadable { table: String, reason: String },
    #[error("{table}: unsupported format '.{extension}'")]
    UnsupportedFormat { table: String, extension: String },
    #[error("{table}: not a {role} table, missing column(s): {}", .missing.join(", "))]
    SchemaMismatch {
        table: String,
        role: TableRole,
        missing: Vec<String>,
    },
    #[error("{table}: header carries both infrastructure and commercial columns; tag its role explicitly")]
    AmbiguousRole { table: String },
    #[error("{table} line {line}: {reason}")]
    MalformedRow {
        table: String,
        line: u64,
        reason: String,
    },
    #[error("{table}: transformer '{transformer_id}' rejected: {reason}")]
    RejectedRow {
        table: String,
        transformer_id: String,
        reason: String,
    },
}

impl LoadIssue {
    /// Whether the whole table was skipped, as opposed to a single row.
    pub fn skips_table(&self) -> bool {
        !matches!(self, LoadIssue::MalformedRow { .. } | LoadIssue::RejectedRow { .. })
    }
}
