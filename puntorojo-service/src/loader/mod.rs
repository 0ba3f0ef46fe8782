//! Table acquisition: read uploads, work out which table each one is, decode
//! and validate its rows. Falls back to the built-in sample when nothing was
//! uploaded.

mod issue;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use csv::StringRecord;
use puntorojo_domain::{CommercialRecord, InfrastructureRecord, TableRole};
use serde::Serialize;

use crate::{
    pipeline::{Pipeline, PipelineError, Source, Transform},
    sinks::collect::{CollectSink, Collected},
    sources::{self, sample, DelimitedTableSource, NdjsonTableSource, StaticSource, TableRow},
    transform::{CommercialValidation, InfrastructureValidation},
};

pub use issue::LoadIssue;

#[derive(Debug, Clone)]
pub enum TableContent {
    Path(PathBuf),
    Inline(String),
}

/// One uploaded table. `role` is the explicit tag; when absent the role is
/// inferred from the header.
#[derive(Debug, Clone)]
pub struct TableUpload {
    pub name: String,
    pub role: Option<TableRole>,
    pub content: TableContent,
}

impl TableUpload {
    pub fn from_path(path: impl Into<PathBuf>, role: Option<TableRole>) -> Self {
        let path = path.into();
        Self {
            name: path.display().to_string(),
            role,
            content: TableContent::Path(path),
        }
    }

    pub fn inline(name: impl Into<String>, role: Option<TableRole>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role,
            content: TableContent::Inline(content.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Delimited(u8),
    Ndjson,
}

impl TableFormat {
    /// Pick the format from the table name's extension. Names without an
    /// extension are read as CSV. Returns the offending extension otherwise.
    pub fn from_name(name: &str) -> Result<Self, String> {
        let ext = match Path::new(name).extension() {
            Some(ext) => ext.to_string_lossy().to_ascii_lowercase(),
            None => return Ok(TableFormat::Delimited(b',')),
        };

        match ext.as_str() {
            "csv" | "txt" => Ok(TableFormat::Delimited(b',')),
            "dat" | "psv" => Ok(TableFormat::Delimited(b'|')),
            "tsv" => Ok(TableFormat::Delimited(b'\t')),
            "ndjson" | "jsonl" => Ok(TableFormat::Ndjson),
            _ => Err(ext),
        }
    }

    fn read_headers(self, content: &str) -> Result<StringRecord, PipelineError> {
        match self {
            TableFormat::Delimited(delimiter) => {
                sources::delimited_table::read_headers(content, delimiter)
            }
            TableFormat::Ndjson => sources::ndjson_table::read_headers(content),
        }
    }
}

/// Where the analysed tables came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataOrigin {
    Sample,
    Uploaded { tables: Vec<String> },
}

/// First rows of a loaded table, echoed back to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TablePreview {
    pub table: String,
    pub role: TableRole,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub origin: DataOrigin,
    pub infrastructure: Vec<InfrastructureRecord>,
    pub commercial: Vec<CommercialRecord>,
    pub previews: Vec<TablePreview>,
    pub issues: Vec<LoadIssue>,
}

/// Decide which table `headers` belong to.
///
/// An explicit tag wins but must still carry that role's columns. Without a
/// tag exactly one role must match; a header that satisfies both is
/// ambiguous, one that satisfies neither is reported against the closer role.
pub fn resolve_role(
    table: &str,
    headers: &StringRecord,
    tag: Option<TableRole>,
) -> Result<TableRole, LoadIssue> {
    let mismatch = |role: TableRole, missing: Vec<&str>| LoadIssue::SchemaMismatch {
        table: table.to_string(),
        role,
        missing: missing.into_iter().map(str::to_string).collect(),
    };

    let names: Vec<&str> = headers.iter().collect();

    if let Some(role) = tag {
        let missing = role.missing_columns(&names);
        return if missing.is_empty() {
            Ok(role)
        } else {
            Err(mismatch(role, missing))
        };
    }

    let infra_missing = TableRole::Infrastructure.missing_columns(&names);
    let com_missing = TableRole::Commercial.missing_columns(&names);

    match (infra_missing.is_empty(), com_missing.is_empty()) {
        (true, true) => Err(LoadIssue::AmbiguousRole {
            table: table.to_string(),
        }),
        (true, false) => Ok(TableRole::Infrastructure),
        (false, true) => Ok(TableRole::Commercial),
        (false, false) if com_missing.len() < infra_missing.len() => {
            Err(mismatch(TableRole::Commercial, com_missing))
        }
        (false, false) => Err(mismatch(TableRole::Infrastructure, infra_missing)),
    }
}

async fn read_content(upload: &TableUpload) -> Result<String, LoadIssue> {
    match &upload.content {
        TableContent::Inline(text) => Ok(text.clone()),
        TableContent::Path(path) => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| LoadIssue::Unreadable {
                    table: upload.name.clone(),
                    reason: e.to_string(),
                })
        }
    }
}

async fn run_table<R, S, V>(source: S, validation: V) -> Result<Collected<R>, PipelineError>
where
    R: TableRow,
    S: Source<R> + 'static,
    V: Transform<R, R> + 'static,
{
    let validation: Arc<dyn Transform<R, R> + Send + Sync> = Arc::new(validation);
    let pipeline: Pipeline<_, R, _> = Pipeline {
        source,
        transforms: vec![validation],
        sink: CollectSink::default(),
    };
    pipeline.run().await
}

async fn ingest<R, V>(
    table: &str,
    content: String,
    format: TableFormat,
    validation: V,
) -> Result<Collected<R>, PipelineError>
where
    R: TableRow,
    V: Transform<R, R> + 'static,
{
    match format {
        TableFormat::Delimited(delimiter) => {
            run_table(DelimitedTableSource::<R>::new(table, content, delimiter), validation).await
        }
        TableFormat::Ndjson => run_table(NdjsonTableSource::<R>::new(table, content), validation).await,
    }
}

fn row_issue(table: &str, err: PipelineError) -> LoadIssue {
    match err {
        PipelineError::Row { line, reason } => LoadIssue::MalformedRow {
            table: table.to_string(),
            line,
            reason,
        },
        PipelineError::Transform {
            transformer_id,
            reason,
        } => LoadIssue::RejectedRow {
            table: table.to_string(),
            transformer_id,
            reason,
        },
        other => LoadIssue::Unreadable {
            table: table.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Accumulates tables of both roles across uploads.
struct Accumulator {
    preview_rows: usize,
    infrastructure: Vec<InfrastructureRecord>,
    commercial: Vec<CommercialRecord>,
    previews: Vec<TablePreview>,
    issues: Vec<LoadIssue>,
}

impl Accumulator {
    fn new(preview_rows: usize) -> Self {
        Self {
            preview_rows,
            infrastructure: Vec::new(),
            commercial: Vec::new(),
            previews: Vec::new(),
            issues: Vec::new(),
        }
    }

    fn absorb<R: TableRow>(
        &mut self,
        table: &str,
        result: Result<Collected<R>, PipelineError>,
    ) -> Option<Vec<R>> {
        let collected = match result {
            Ok(c) => c,
            Err(e) => {
                self.issue(LoadIssue::Unreadable {
                    table: table.to_string(),
                    reason: e.to_string(),
                });
                return None;
            }
        };

        for err in collected.row_errors {
            self.issue(row_issue(table, err));
        }

        let rows: Vec<R> = collected.rows.into_iter().map(|env| env.payload).collect();
        self.previews.push(TablePreview {
            table: table.to_string(),
            role: R::ROLE,
            columns: R::ROLE.required_columns().iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().take(self.preview_rows).map(|r| r.cells()).collect(),
            total_rows: rows.len(),
        });

        metrics::counter!("loader_tables_loaded_total", "role" => R::ROLE.as_str()).increment(1);
        tracing::info!(table, role = %R::ROLE, rows = rows.len(), "table loaded");
        Some(rows)
    }

    fn issue(&mut self, issue: LoadIssue) {
        metrics::counter!("loader_issues_total").increment(1);
        if issue.skips_table() {
            tracing::warn!(issue = %issue, "table skipped");
        } else {
            tracing::warn!(issue = %issue, "row skipped");
        }
        self.issues.push(issue);
    }

    fn finish(self, origin: DataOrigin) -> LoadedTables {
        LoadedTables {
            origin,
            infrastructure: self.infrastructure,
            commercial: self.commercial,
            previews: self.previews,
            issues: self.issues,
        }
    }
}

/// Load every upload. Tables of the same role are concatenated in upload
/// order. With no uploads at all, the built-in sample tables are used.
pub async fn load_tables(uploads: Vec<TableUpload>, preview_rows: usize) -> LoadedTables {
    let mut acc = Accumulator::new(preview_rows);

    if uploads.is_empty() {
        tracing::info!("no tables uploaded, using built-in sample data");
        let infra = run_table(
            StaticSource::new(sample::SAMPLE_INFRASTRUCTURE_TABLE, sample::infrastructure()),
            InfrastructureValidation,
        )
        .await;
        if let Some(rows) = acc.absorb(sample::SAMPLE_INFRASTRUCTURE_TABLE, infra) {
            acc.infrastructure.extend(rows);
        }
        let com = run_table(
            StaticSource::new(sample::SAMPLE_COMMERCIAL_TABLE, sample::commercial()),
            CommercialValidation,
        )
        .await;
        if let Some(rows) = acc.absorb(sample::SAMPLE_COMMERCIAL_TABLE, com) {
            acc.commercial.extend(rows);
        }
        return acc.finish(DataOrigin::Sample);
    }

    let names = uploads.iter().map(|u| u.name.clone()).collect();

    for upload in uploads {
        let table = upload.name.as_str();

        let format = match TableFormat::from_name(table) {
            Ok(format) => format,
            Err(extension) => {
                acc.issue(LoadIssue::UnsupportedFormat {
                    table: table.to_string(),
                    extension,
                });
                continue;
            }
        };

        let content = match read_content(&upload).await {
            Ok(content) => content,
            Err(issue) => {
                acc.issue(issue);
                continue;
            }
        };

        let headers = match format.read_headers(&content) {
            Ok(headers) => headers,
            Err(e) => {
                acc.issue(LoadIssue::Unreadable {
                    table: table.to_string(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let role = match resolve_role(table, &headers, upload.role) {
            Ok(role) => role,
            Err(issue) => {
                acc.issue(issue);
                continue;
            }
        };
        tracing::debug!(table, role = %role, explicit = upload.role.is_some(), "table role resolved");

        match role {
            TableRole::Infrastructure => {
                let res = ingest::<InfrastructureRecord, _>(table, content, format, InfrastructureValidation).await;
                if let Some(rows) = acc.absorb(table, res) {
                    acc.infrastructure.extend(rows);
                }
            }
            TableRole::Commercial => {
                let res = ingest::<CommercialRecord, _>(table, content, format, CommercialValidation).await;
                if let Some(rows) = acc.absorb(table, res) {
                    acc.commercial.extend(rows);
                }
            }
        }
    }

    acc.finish(DataOrigin::Uploaded { tables: names })
}
