// Entry point and high-level CLI flow.
//
// The run is a single pass: load the two or three extracts, join them by
// UAI, render the dashboard, write it out, then print the output path and
// a short preview table of the merged data.
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use log::{info, warn, LevelFilter};
use simple_logger::SimpleLogger;

use aed_dashboard::loader;
use aed_dashboard::merge;
use aed_dashboard::output;
use aed_dashboard::render::{self, ReportMeta};
use aed_dashboard::types::PreviewRow;
use aed_dashboard::util::format_int;

/// Génère le dashboard des personnels de vie scolaire (collèges publics)
/// à partir des extraits open data de l'Éducation nationale.
#[derive(Parser, Debug)]
#[command(name = "aed-dashboard", version)]
struct Cli {
    /// Chemin du CSV indicateurs personnels
    #[arg(long, value_name = "FILE")]
    indicateurs: PathBuf,

    /// Chemin du CSV effectifs second degré
    #[arg(long, value_name = "FILE")]
    effectifs: PathBuf,

    /// Chemin du CSV indices de position sociale (optionnel)
    #[arg(long, value_name = "FILE")]
    ips: Option<PathBuf>,

    /// Chemin de sortie HTML
    #[arg(long, default_value = "dashboard.html")]
    output: PathBuf,

    /// Code département (ex: 44)
    #[arg(long, default_value = "44")]
    departement: String,

    /// Libellé du département affiché dans le titre
    #[arg(long, default_value = "Loire-Atlantique")]
    departement_label: String,

    /// Libellé académie (ex: NANTES)
    #[arg(long, default_value = "NANTES")]
    academie: String,

    /// Préfixe de nature d'établissement à filtrer
    #[arg(long, default_value = "collège")]
    nature_prefix: String,

    /// Nombre d'entrées dans les graphiques Top
    #[arg(long, default_value_t = 15)]
    top: usize,

    /// Journalisation détaillée
    #[arg(short, long)]
    verbose: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

const PREVIEW_ROWS: usize = 5;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    SimpleLogger::new().with_level(level).init()?;

    let (ind_rows, ind_stats) = loader::load_indicateurs(
        &cli.indicateurs,
        &cli.departement,
        &cli.academie,
        &cli.nature_prefix,
    )?;
    info!(
        "indicators: {} rows read, {} kept",
        format_int(ind_stats.rows_read as i64),
        format_int(ind_stats.rows_kept as i64)
    );
    if ind_rows.is_empty() {
        warn!("no indicator row matched the filters; the dashboard will be empty");
    }

    let (eff_map, eff_stats) =
        loader::load_effectifs_latest(&cli.effectifs, &cli.departement, &cli.academie)?;
    info!(
        "headcounts: {} rows read, {} schools retained",
        format_int(eff_stats.rows_read as i64),
        format_int(eff_stats.rows_kept as i64)
    );

    let (ips_map, ips_stats) =
        loader::load_ips(cli.ips.as_deref(), &cli.departement, &cli.academie)?;
    if cli.ips.is_some() {
        info!(
            "social indices: {} rows read, {} schools retained",
            format_int(ips_stats.rows_read as i64),
            format_int(ips_stats.rows_kept as i64)
        );
    }

    let records = merge::merge_records(&ind_rows, &eff_map, &ips_map);
    let summary = merge::compute_summary(&records, &ind_rows, &ips_map);

    let meta = ReportMeta {
        departement: cli.departement.clone(),
        departement_label: cli.departement_label.clone(),
        academie: cli.academie.clone(),
        indicateurs_file: file_name(&cli.indicateurs),
        effectifs_file: file_name(&cli.effectifs),
        ips_file: cli.ips.as_deref().map(file_name),
        top_n: cli.top,
        generated_at: Local::now().format("%d/%m/%Y %H:%M").to_string(),
    };
    let html = render::render_dashboard(&records, &summary, &meta)?;
    output::write_text(&cli.output, &html)?;
    println!("Dashboard généré : {}", cli.output.display());

    let preview: Vec<PreviewRow> = records.iter().map(PreviewRow::from).collect();
    output::preview_table_rows(&preview, PREVIEW_ROWS);
    Ok(())
}
