use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};

use crate::{
    analysis::{report::format_loss_pct, AnalysisReport},
    loader::TablePreview,
    pipeline::PipelineError,
};

use super::ReportSink;

/// Prints the report as plain text tables on stdout.
#[derive(Debug, Clone, Default)]
pub struct TerminalSink {
    pub show_previews: bool,
}

#[async_trait::async_trait]
impl ReportSink for TerminalSink {
    async fn publish(&self, report: &AnalysisReport) -> Result<(), PipelineError> {
        println!("{}", render_terminal_report(report, self.show_previews));
        Ok(())
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn preview_table(preview: &TablePreview) -> Table {
    let mut table = new_table(preview.columns.iter().map(String::as_str).collect());
    for row in &preview.rows {
        table.add_row(row.clone());
    }
    table
}

/// Critical-path table: sector, transformer, loss and loss percentage.
pub fn critical_path_table(report: &AnalysisReport) -> Table {
    let mut table = new_table(vec!["Sector", "ID_Trafo", "Loss (kWh)", "Loss (%)", "Advisory"]);
    for i in &report.interventions {
        let c = &i.candidate;
        table.add_row(vec![
            Cell::new(&c.sector),
            Cell::new(c.transformer_id.as_str()),
            Cell::new(c.loss).set_alignment(CellAlignment::Right),
            Cell::new(format_loss_pct(c.loss_pct)).set_alignment(CellAlignment::Right),
            Cell::new(i.advisory.label()),
        ]);
    }
    table
}

pub fn render_terminal_report(report: &AnalysisReport, show_previews: bool) -> String {
    let mut out = String::new();

    if show_previews {
        for preview in &report.previews {
            out.push_str(&format!(
                "{} ({}, {} of {} rows)\n{}\n\n",
                preview.table,
                preview.role,
                preview.rows.len(),
                preview.total_rows,
                preview_table(preview)
            ));
        }
    }

    if !report.issues.is_empty() {
        out.push_str("Load issues:\n");
        for issue in &report.issues {
            out.push_str(&format!("  - {issue}\n"));
        }
        out.push('\n');
    }

    out.push_str(&report.summary);
    out.push('\n');

    if !report.interventions.is_empty() {
        out.push_str("\nOperational recommendations:\n");
        for i in &report.interventions {
            out.push_str(&format!("  - {}\n", i.message));
        }
        out.push_str(&format!("\nCritical path\n{}\n", critical_path_table(report)));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis, config::AppConfig};

    #[tokio::test]
    async fn sample_report_lists_every_flagged_site() {
        let report = analysis::run_analysis(Vec::new(), &AppConfig::default()).await;
        let text = render_terminal_report(&report, true);

        assert!(text.contains("3 of 3 transformer(s) flagged"));
        assert!(text.contains("Critical path"));
        for sector in ["Gazcue", "Ensanche Luperón", "San Isidro"] {
            assert!(text.contains(sector), "missing {sector}");
        }
        assert!(text.contains("52.00%"));
        assert!(text.contains("sample-infrastructure (infrastructure, 3 of 3 rows)"));
    }

    #[tokio::test]
    async fn previews_can_be_hidden() {
        let report = analysis::run_analysis(Vec::new(), &AppConfig::default()).await;
        let text = render_terminal_report(&report, false);
        assert!(!text.contains("sample-commercial"));
    }
}
