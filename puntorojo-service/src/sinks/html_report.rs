//! Self-contained HTML report: Leaflet map with a heat layer and markers,
//! operational recommendations and the critical-path table.
//!
//! Leaflet and `leaflet.heat` are pulled from a CDN; everything else
//! (styles, script, map data) is inlined.

use std::path::PathBuf;

use crate::{
    analysis::{report::format_loss_pct, AnalysisReport, ReportStatus},
    loader::{DataOrigin, LoadIssue, TablePreview},
    pipeline::PipelineError,
};

use super::ReportSink;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";

/// Writes the rendered page to a file.
pub struct HtmlReportSink {
    path: PathBuf,
}

impl HtmlReportSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ReportSink for HtmlReportSink {
    async fn publish(&self, report: &AnalysisReport) -> Result<(), PipelineError> {
        let html = render_html_report(report)?;
        tokio::fs::write(&self.path, html).await.map_err(|e| {
            PipelineError::Sink(format!("failed to write {}: {e}", self.path.display()))
        })?;
        tracing::info!(path = %self.path.display(), "html report written");
        Ok(())
    }
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Map data as JSON that is safe inside a `<script>` element.
fn map_json(report: &AnalysisReport) -> Result<String, PipelineError> {
    let json = serde_json::to_string(&report.map)
        .map_err(|e| PipelineError::Sink(format!("failed to encode map data: {e}")))?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

/// Render the whole report page.
pub fn render_html_report(report: &AnalysisReport) -> Result<String, PipelineError> {
    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>PuntoRojo - Energy Loss Report</title>
    <link rel="stylesheet" href="{leaflet_css}">
    <style>{css}</style>
</head>
<body>
    <div class="container">
        {header}
        {summary}
        {issues}
        <h2>Energy loss map</h2>
        <div id="map"></div>
        {advisories}
        {critical_path}
        {previews}
    </div>
    <script type="application/json" id="map-data">{map_data}</script>
    <script src="{leaflet_js}"></script>
    <script src="{leaflet_heat_js}"></script>
    <script>{js}</script>
</body>
</html>"#,
        leaflet_css = LEAFLET_CSS,
        leaflet_js = LEAFLET_JS,
        leaflet_heat_js = LEAFLET_HEAT_JS,
        css = INLINE_CSS,
        js = INLINE_JS,
        header = render_header(report),
        summary = render_summary(report),
        issues = render_issues(&report.issues),
        advisories = render_advisories(report),
        critical_path = render_critical_path(report),
        previews = render_previews(&report.previews),
        map_data = map_json(report)?,
    ))
}

fn render_header(report: &AnalysisReport) -> String {
    let origin = match &report.origin {
        DataOrigin::Sample => "built-in sample data".to_string(),
        DataOrigin::Uploaded { tables } => escape_html(&tables.join(", ")),
    };

    format!(
        r#"<header>
            <h1>PuntoRojo &middot; energy loss detection</h1>
            <p class="meta">Generated {generated} from {origin}</p>
        </header>"#,
        generated = escape_html(&report.generated_at),
        origin = origin,
    )
}

fn render_summary(report: &AnalysisReport) -> String {
    let class = match report.status {
        ReportStatus::Ready => "status ready",
        ReportStatus::NoInterventions => "status quiet",
        ReportStatus::NoMatches => "status empty",
    };
    format!(
        r#"<p class="{class}">{summary}</p>"#,
        summary = escape_html(&report.summary)
    )
}

fn render_issues(issues: &[LoadIssue]) -> String {
    if issues.is_empty() {
        return String::new();
    }

    let items: String = issues
        .iter()
        .map(|i| format!("<li>{}</li>", escape_html(&i.to_string())))
        .collect();
    format!(r#"<section class="issues"><h2>Load issues</h2><ul>{items}</ul></section>"#)
}

fn render_advisories(report: &AnalysisReport) -> String {
    if report.interventions.is_empty() {
        return String::new();
    }

    let items: String = report
        .interventions
        .iter()
        .map(|i| {
            format!(
                r#"<li class="{class}">{msg}</li>"#,
                class = i.advisory.label(),
                msg = escape_html(&i.message)
            )
        })
        .collect();
    format!(r#"<section><h2>Operational recommendations</h2><ul class="advisories">{items}</ul></section>"#)
}

fn render_critical_path(report: &AnalysisReport) -> String {
    if report.interventions.is_empty() {
        return String::new();
    }

    let rows: String = report
        .interventions
        .iter()
        .map(|i| {
            let c = &i.candidate;
            let reasons = i
                .reasons
                .iter()
                .map(|r| r.label())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "<tr><td>{sector}</td><td>{id}</td><td class=\"num\">{loss}</td><td class=\"num\">{pct}</td><td>{reasons}</td></tr>",
                sector = escape_html(&c.sector),
                id = escape_html(c.transformer_id.as_str()),
                loss = c.loss,
                pct = format_loss_pct(c.loss_pct),
                reasons = reasons,
            )
        })
        .collect();

    format!(
        r#"<section>
            <h2>Critical path</h2>
            <table>
                <thead><tr><th>Sector</th><th>ID_Trafo</th><th>Loss (kWh)</th><th>Loss (%)</th><th>Flagged by</th></tr></thead>
                <tbody>{rows}</tbody>
            </table>
        </section>"#
    )
}

fn render_previews(previews: &[TablePreview]) -> String {
    if previews.is_empty() {
        return String::new();
    }

    let tables: String = previews
        .iter()
        .map(|p| {
            let head: String = p
                .columns
                .iter()
                .map(|c| format!("<th>{}</th>", escape_html(c)))
                .collect();
            let body: String = p
                .rows
                .iter()
                .map(|row| {
                    let cells: String = row
                        .iter()
                        .map(|v| format!("<td>{}</td>", escape_html(v)))
                        .collect();
                    format!("<tr>{cells}</tr>")
                })
                .collect();
            format!(
                r#"<h3>{table} <span class="meta">({role}, {shown} of {total} rows)</span></h3>
                <table class="preview"><thead><tr>{head}</tr></thead><tbody>{body}</tbody></table>"#,
                table = escape_html(&p.table),
                role = p.role,
                shown = p.rows.len(),
                total = p.total_rows,
            )
        })
        .collect();

    format!(r#"<details class="previews"><summary>Loaded data</summary>{tables}</details>"#)
}

const INLINE_CSS: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; background: #f6f7f9; color: #1f2933; }
.container { max-width: 1100px; margin: 0 auto; padding: 24px; }
h1 { color: #c81e1e; margin-bottom: 4px; }
.meta { color: #6b7280; font-size: 0.9em; }
#map { height: 500px; border-radius: 6px; margin-bottom: 24px; }
.status { padding: 10px 14px; border-radius: 6px; font-weight: 600; }
.status.ready { background: #fde8e8; color: #9b1c1c; }
.status.quiet { background: #def7ec; color: #03543f; }
.status.empty { background: #fdf6b2; color: #723b13; }
.issues { background: #fff8f1; border-left: 4px solid #ff8a4c; padding: 4px 16px; }
.advisories li { margin: 6px 0; }
.advisories li.technical { color: #9b1c1c; }
.advisories li.non-technical { color: #8a2c0d; }
table { border-collapse: collapse; width: 100%; background: #fff; margin-bottom: 16px; }
th, td { border: 1px solid #e5e7eb; padding: 6px 10px; text-align: left; }
th { background: #f3f4f6; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
"#;

const INLINE_JS: &str = r#"
(function () {
    var data = JSON.parse(document.getElementById('map-data').textContent);
    var map = L.map('map').setView(data.center, data.zoom);
    L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
        maxZoom: 19,
        attribution: '&copy; OpenStreetMap contributors'
    }).addTo(map);
    if (data.heat_points.length && L.heatLayer) {
        L.heatLayer(data.heat_points, { radius: 35 }).addTo(map);
    }
    data.markers.forEach(function (m) {
        var popup = document.createElement('span');
        popup.textContent = m.popup;
        L.marker(m.position).bindPopup(popup).addTo(map);
    });
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{analysis, config::AppConfig, loader::TableUpload};
    use time::macros::datetime;

    async fn sample_report() -> AnalysisReport {
        analysis::run_analysis(Vec::new(), &AppConfig::default()).await
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<b>"A&B"</b>"#), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[tokio::test]
    async fn sample_page_has_map_advisories_and_critical_path() {
        let html = render_html_report(&sample_report().await).unwrap();

        assert!(html.contains(r#"<div id="map"></div>"#));
        assert!(html.contains("leaflet-heat.js"));
        assert!(html.contains("Critical path"));
        assert!(html.contains("In Ensanche Luperón, the loss is technical"));
        assert!(html.contains(r#""center":[18.4675,-69.9312]"#));
        assert!(html.contains("Loss: 52.00% | Lost kWh: 1300 | Customers: 60"));
    }

    #[tokio::test]
    async fn sector_names_cannot_inject_markup() {
        let infra = "ID_Trafo,Sector,Latitud,Longitud,Capacidad_kVA,kWh_Entregado\n\
                     1,</script><script>alert(1)</script>,18.4,-69.9,100,2000\n";
        let com = "ID_Trafo,kWh_Facturado,Clientes_Directos,Recaudacion_DOP\n1,100,5,10\n";
        let uploads = vec![
            TableUpload::inline("infra.csv", None, infra),
            TableUpload::inline("com.csv", None, com),
        ];
        let report = analysis::run_analysis(uploads, &AppConfig::default()).await;

        let html = render_html_report(&report).unwrap();
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;/script&gt;"));
    }

    #[tokio::test]
    async fn empty_join_renders_explicit_state() {
        let loaded = crate::loader::LoadedTables {
            origin: DataOrigin::Uploaded { tables: vec!["infra.csv".to_string()] },
            infrastructure: Vec::new(),
            commercial: Vec::new(),
            previews: Vec::new(),
            issues: vec![LoadIssue::AmbiguousRole { table: "both.csv".to_string() }],
        };
        let report = analysis::analyze(loaded, &AppConfig::default(), datetime!(2024-01-01 00:00 UTC));

        let html = render_html_report(&report).unwrap();
        assert!(html.contains("status empty"));
        assert!(html.contains("Nothing to analyse"));
        assert!(html.contains("tag its role explicitly"));
        assert!(!html.contains("Critical path"));
    }

    #[tokio::test]
    async fn sink_writes_page_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        HtmlReportSink::new(&path).publish(&sample_report().await).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("<!DOCTYPE html>"));
    }
}
