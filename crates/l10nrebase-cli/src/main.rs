mod ui;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::Result;
use l10nrebase_domain::RebaseReport;
use l10nrebase_services::{rebase, Settings};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "l10nrebase",
    version,
    about = "Rebase an upstream string catalog onto local branding and write its override"
)]
struct Cli {
    /// Catalog to rebase (.grd or .grdp), relative to the project root
    #[arg(long, alias = "source_string_path")]
    source_string_path: PathBuf,

    /// Project checkout the catalog lives in (default: config, then CWD)
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Read settings from this file only
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

fn init_tracing(log_dir: Option<&Path>, use_color: bool) -> Option<WorkerGuard> {
    let console_layer = fmt::layer()
        .with_target(false)
        .with_ansi(use_color)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (file_writer, guard) =
                tracing_appender::non_blocking(rolling::daily(dir, "l10nrebase.log"));
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(file_writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn run(cli: Cli, use_color: bool) -> Result<()> {
    let mut cfg = l10nrebase_config::load_config(cli.config.as_deref())?;
    if let Some(root) = cli.project_root {
        cfg.project_root = Some(root);
    }
    let _guard = init_tracing(cfg.log_dir.as_deref(), use_color);
    debug!(project_root = ?cfg.project_root, upstream_root = ?cfg.upstream_root, "config loaded");

    let settings = Settings::from_config(&cfg)?;
    let report = rebase(&cli.source_string_path, &settings)?;

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        Format::Text => print_text(&report, use_color),
    }
    Ok(())
}

fn print_text(report: &RebaseReport, use_color: bool) {
    let paint = |s: &str| {
        if use_color {
            s.cyan().to_string()
        } else {
            s.to_string()
        }
    };
    let o = &report.overrides;
    if o.written {
        ui_ok!(
            "override written: {} ({} messages, {} parts)",
            paint(&o.path),
            o.kept_messages.len(),
            o.kept_parts.len()
        );
    } else {
        ui_info!("no override needed: nothing differs beyond branding");
    }
    for part in &o.dropped_parts {
        ui_info!("part dropped from override: {part}");
    }
    if let Some(m) = &report.migration {
        ui_ok!(
            "migrated {} messages into {} locale bundles",
            m.messages.len(),
            m.bundles.len()
        );
        for b in m.bundles.iter().filter(|b| !b.missing.is_empty()) {
            ui_warn!("{}: {} translations not found upstream", b.locale, b.missing.len());
        }
    }
    ui_ok!("rebased {}", paint(&report.source));
}

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("{e}");
    }
    let cli = Cli::parse();

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    match run(cli, use_color) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(error = ?err, "rebase failed");
            if use_color {
                ui_err!("{}", format!("{err:#}").red());
            } else {
                ui_err!("{err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
