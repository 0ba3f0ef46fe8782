use std::{marker::PhantomData, sync::Arc};

use csv::StringRecord;

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

use super::records::TableRow;

/// Delimited-text table held in memory (CSV, pipe-delimited `.dat`, TSV).
///
/// The first line is the header row; columns are addressed by name, so their
/// order does not matter.
pub struct DelimitedTableSource<R> {
    table: Arc<str>,
    content: Arc<str>,
    delimiter: u8,
    _marker: PhantomData<fn() -> R>,
}

impl<R> DelimitedTableSource<R> {
    pub fn new(table: impl Into<Arc<str>>, content: impl Into<Arc<str>>, delimiter: u8) -> Self {
        Self {
            table: table.into(),
            content: content.into(),
            delimiter,
            _marker: PhantomData,
        }
    }
}

/// Read and normalize the header row: names trimmed, UTF-8 BOM stripped.
pub fn read_headers(content: &str, delimiter: u8) -> Result<StringRecord, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(content.as_bytes());
    let raw = rdr
        .headers()
        .map_err(|e| PipelineError::Source(format!("failed to read headers: {e}")))?;

    Ok(normalize_headers(raw.iter()))
}

pub(crate) fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> StringRecord {
    raw.enumerate()
        .map(|(idx, h)| {
            let h = if idx == 0 { h.trim_start_matches('\u{feff}') } else { h };
            h.trim()
        })
        .collect()
}

#[async_trait::async_trait]
impl<R: TableRow> Source<R> for DelimitedTableSource<R> {
    async fn stream(&self) -> EnvelopeStream<R> {
        let table = self.table.clone();
        let content = self.content.clone();
        let delimiter = self.delimiter;

        let s = async_stream::stream! {
            let headers = match read_headers(&content, delimiter) {
                Ok(headers) => headers,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new()
                .delimiter(delimiter)
                .flexible(true)
                .from_reader(content.as_bytes());

            for result in rdr.records() {
                let record = match result {
                    Ok(record) => record,
                    Err(e) => {
                        yield Err(PipelineError::Source(format!("failed to read record: {e}")));
                        return;
                    }
                };
                let line = record.position().map(|p| p.line()).unwrap_or_default();

                if record.iter().all(|field| field.trim().is_empty()) {
                    continue;
                }

                // A bad row is reported but does not end the table.
                match R::from_record(&record, &headers) {
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
    use puntorojo_domain::{CommercialRecord, InfrastructureRecord};

    #[test]
    fn headers_are_trimmed_and_bom_stripped() {
        let headers = read_headers("\u{feff}ID_Trafo , kWh_Facturado\n1,2\n", b',').unwrap();
        assert_eq!(headers.iter().collect::<Vec<_>>(), vec!["ID_Trafo", "kWh_Facturado"]);
    }

    #[tokio::test]
    async fn pipe_delimited_rows_decode_with_line_numbers() {
        let content = "ID_Trafo|Sector|Latitud|Longitud|Capacidad_kVA|kWh_Entregado\n\
                       1|Gazcue|18.4691|-69.9303|100|2000\n\
                       2|Ensanche|18.4868|-69.9283|150|2500\n";
        let source = DelimitedTableSource::<InfrastructureRecord>::new("infra.dat", content, b'|');

        let rows: Vec<_> = source.stream().await.collect().await;
        assert_eq!(rows.len(), 2);
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.payload.sector, "Ensanche");
        assert_eq!(second.line, 3);
        assert_eq!(&*second.table, "infra.dat");
    }

    #[tokio::test]
    async fn bad_row_is_reported_and_stream_continues() {
        let content = "ID_Trafo,kWh_Facturado,Clientes_Directos,Recaudacion_DOP\n\
                       1,abc,50,50000\n\
                       \n\
                       2,2300,60,70000\n";
        let source = DelimitedTableSource::<CommercialRecord>::new("com.csv", content, b',');

        let rows: Vec<_> = source.stream().await.collect().await;
        assert_eq!(rows.len(), 2);
        assert!(matches!(rows[0], Err(PipelineError::Row { line: 2, .. })));
        assert_eq!(rows[1].as_ref().unwrap().payload.direct_customers, 60);
    }
}
