//! One-shot analysis of infrastructure and commercial tables.
//!
//! Usage:
//!   analyze_tables [FILES...] [--infra <PATH>]... [--commercial <PATH>]... [--output <PATH>]
//!
//! Positional files have their role inferred from the header. With no files
//! at all the built-in sample tables are analysed.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use puntorojo_domain::TableRole;
use puntorojo_service::{
    analysis::{self, ReportStatus},
    config::AppConfig,
    loader::TableUpload,
    observability,
    sinks::{HtmlReportSink, ReportSink, TerminalSink},
};

/// Detect and prioritise energy-loss interventions per transformer
#[derive(Parser, Debug)]
#[command(name = "analyze_tables")]
#[command(about = "Join infrastructure and billing tables and flag transformers for field intervention")]
struct Args {
    /// Tables whose role is inferred from their header
    files: Vec<PathBuf>,

    /// Infrastructure table (ID_Trafo, Sector, Latitud, Longitud, Capacidad_kVA, kWh_Entregado)
    #[arg(long = "infra")]
    infrastructure: Vec<PathBuf>,

    /// Commercial table (ID_Trafo, kWh_Facturado, Clientes_Directos, Recaudacion_DOP)
    #[arg(long)]
    commercial: Vec<PathBuf>,

    /// HTML report path (defaults to report.output_path from the config)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Skip writing the HTML report
    #[arg(long)]
    no_html: bool,

    /// Print previews of the loaded tables
    #[arg(long)]
    preview: bool,

    /// Exit with status 2 when a transformer is flagged
    #[arg(long)]
    fail_on_flagged: bool,
}

fn tagged(paths: &[PathBuf], role: TableRole) -> impl Iterator<Item = TableUpload> + '_ {
    paths.iter().map(move |p| TableUpload::from_path(p, Some(role)))
}

impl Args {
    fn uploads(&self) -> Vec<TableUpload> {
        let mut uploads: Vec<_> = tagged(&self.infrastructure, TableRole::Infrastructure).collect();
        uploads.extend(tagged(&self.commercial, TableRole::Commercial));
        uploads.extend(self.files.iter().map(|p| TableUpload::from_path(p, None)));
        uploads
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args = Args::parse();
    let cfg = AppConfig::load()?;

    let report = analysis::run_analysis(args.uploads(), &cfg).await;

    TerminalSink {
        show_previews: args.preview,
    }
    .publish(&report)
    .await?;

    if !args.no_html {
        let path = args.output.clone().unwrap_or_else(|| cfg.report.output_path.clone());
        HtmlReportSink::new(path).publish(&report).await?;
    }

    if args.fail_on_flagged && report.status == ReportStatus::Ready {
        std::process::exit(2);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use puntorojo_service::loader::TableContent;

    #[test]
    fn tagged_files_come_before_inferred_ones() {
        let args = Args::parse_from([
            "analyze_tables",
            "extra.csv",
            "--infra",
            "infra.csv",
            "--commercial",
            "com-a.csv",
            "--commercial",
            "com-b.dat",
        ]);

        let uploads = args.uploads();
        let roles: Vec<_> = uploads.iter().map(|u| u.role).collect();
        assert_eq!(
            roles,
            vec![
                Some(TableRole::Infrastructure),
                Some(TableRole::Commercial),
                Some(TableRole::Commercial),
                None
            ]
        );
        assert!(matches!(&uploads[2].content, TableContent::Path(p) if p.ends_with("com-b.dat")));
    }

    #[test]
    fn no_files_means_no_uploads() {
        let args = Args::parse_from(["analyze_tables", "--no-html"]);
        assert!(args.uploads().is_empty());
        assert!(args.no_html);
    }
}
