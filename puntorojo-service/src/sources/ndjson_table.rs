use std::{marker::PhantomData, sync::Arc};

use csv::StringRecord;
use serde_json::{Map, Value};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

use super::records::TableRow;

/// Newline-delimited JSON table: one object per line, keys are column names.
///
/// Each object is flattened into a header-addressed record so rows decode
/// through the same [`TableRow`] path as delimited files. Scalars become
/// their JSON text, `null` and missing keys become empty cells.
pub struct NdjsonTableSource<R> {
    table: Arc<str>,
    content: Arc<str>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> NdjsonTableSource<R> {
    pub fn new(table: impl Into<Arc<str>>, content: impl Into<Arc<str>>) -> Self {
        Self {
            table: table.into(),
            content: content.into(),
            _marker: PhantomData,
        }
    }
}

fn parse_object(line: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(_) => Err("expected a JSON object".to_string()),
        Err(e) => Err(format!("invalid json: {e}")),
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Keys of the first non-blank object, used as the header row.
pub fn read_headers(content: &str) -> Result<StringRecord, PipelineError> {
    let first = content
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| PipelineError::Source("table is empty".to_string()))?;
    let obj = parse_object(first).map_err(|e| PipelineError::Source(format!("line 1: {e}")))?;

    Ok(super::delimited_table::normalize_headers(obj.keys().map(String::as_str)))
}

#[async_trait::async_trait]
impl<R: TableRow> Source<R> for NdjsonTableSource<R> {
    async fn stream(&self) -> EnvelopeStream<R> {
        let table = self.table.clone();
        let content = self.content.clone();

        let s = async_stream::stream! {
            let headers = R::ROLE
                .required_columns()
                .iter()
                .copied()
                .collect::<StringRecord>();

            for (idx, raw) in content.lines().enumerate() {
                let line = idx as u64 + 1;
                if raw.trim().is_empty() {
                    continue;
                }

                let decoded = parse_object(raw).and_then(|obj| {
                    let record: StringRecord = headers
                        .iter()
                        .map(|h| cell(obj.get(h)))
                        .collect();
                    R::from_record(&record, &headers)
                });

                match decoded {
                    Ok(row) => {
                        yield Ok(Envelope {
                            payload: row,
                            table: table.clone(),
                            line,
                        });
                    }
                    Err(reason) => {
                        metrics::counter!("loader_malformed_rows_total").increment(1);
                        yield Err(PipelineError::Row { line, reason });
                    }
                }
            }
        };

        Box::pin(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use puntorojo_domain::{CommercialRecord, TransformerId};

    #[tokio::test]
    async fn numeric_ids_and_values_decode() {
        let content = r#"{"ID_Trafo": 7, "kWh_Facturado": 1000.5, "Clientes_Directos": 12, "Recaudacion_DOP": 9000}
{"ID_Trafo": "T-8", "kWh_Facturado": "300", "Clientes_Directos": 3, "Recaudacion_DOP": null}
"#;
        let source = NdjsonTableSource::<CommercialRecord>::new("com.ndjson", content);

        let rows: Vec<_> = source.stream().await.collect().await;
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.payload.transformer_id, TransformerId::from("7"));
        assert_eq!(first.payload.billed_kwh, 1000.5);
        assert!(matches!(rows[1], Err(PipelineError::Row { line: 2, .. })));
    }

    #[test]
    fn headers_come_from_first_object() {
        let headers = read_headers("\n{\"ID_Trafo\": 1, \"Sector\": \"Gazcue\"}\n").unwrap();
        let mut names: Vec<_> = headers.iter().collect();
        names.sort();
        assert_eq!(names, vec!["ID_Trafo", "Sector"]);
    }

    #[test]
    fn non_object_first_line_is_a_source_error() {
        assert!(matches!(read_headers("[1, 2]"), Err(PipelineError::Source(_))));
    }
}
