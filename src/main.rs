use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod config;
mod models;
mod report;
mod responses;
mod scoring;

use config::ScoringConfig;
use models::RespondentReport;
use responses::{ResponseTable, TableLayout};

#[derive(Parser)]
#[command(name = "wellbeing-profile")]
#[command(about = "Score wellbeing questionnaires and render respondent reports", long_about = None)]
struct Cli {
    /// Scoring configuration (TOML). Defaults to the built-in PERMA-Profiler layout.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Sheet {
    /// Response sheet exported as CSV
    #[arg(long)]
    csv: PathBuf,
    /// Header of the respondent id column
    #[arg(long, default_value = "ID")]
    id_column: String,
    /// Zero-based column of the first answer; defaults to the column after the id
    #[arg(long)]
    first_item_column: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

impl Format {
    fn default_output(self) -> PathBuf {
        match self {
            Format::Markdown => PathBuf::from("report.md"),
            Format::Json => PathBuf::from("report.json"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List respondent ids found in a sheet
    Ids {
        #[command(flatten)]
        sheet: Sheet,
    },
    /// Print domain scores and tiers
    Score {
        #[command(flatten)]
        sheet: Sheet,
        /// Only this respondent
        #[arg(long)]
        id: Option<String>,
    },
    /// Write a respondent report
    #[command(group(
        ArgGroup::new("scope")
            .args(["id", "all"])
            .required(true)
            .multiple(false)
    ))]
    Report {
        #[command(flatten)]
        sheet: Sheet,
        #[arg(long)]
        id: Option<String>,
        /// Every respondent in the sheet
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        /// Output file; defaults to report.md or report.json
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the active scoring configuration as TOML
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wellbeing_profile=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ScoringConfig> {
    match path {
        Some(path) => ScoringConfig::load(path)
            .with_context(|| format!("invalid scoring config {}", path.display())),
        None => {
            let config = ScoringConfig::default();
            config.validate().context("built-in scoring config is invalid")?;
            Ok(config)
        }
    }
}

fn load_sheet(sheet: &Sheet, config: &ScoringConfig) -> anyhow::Result<ResponseTable> {
    let layout = TableLayout {
        id_column: sheet.id_column.clone(),
        first_item_column: sheet.first_item_column,
        item_count: config.item_count(),
        scale_max: config.scale_max,
    };
    ResponseTable::from_path(&sheet.csv, &layout)
}

fn score_selected(
    config: &ScoringConfig,
    table: &ResponseTable,
    id: Option<&str>,
) -> anyhow::Result<Vec<RespondentReport>> {
    match id {
        Some(id) => {
            let respondent = table
                .respondent(id)
                .with_context(|| format!("no respondent with id `{id}`"))?;
            Ok(vec![scoring::score_respondent(config, &respondent.response)])
        }
        None => Ok(scoring::score_all(config, &table.responses())),
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    // Configuration problems abort before any respondent is touched.
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Ids { sheet } => {
            let table = load_sheet(&sheet, &config)?;
            if table.is_empty() {
                println!("No respondents found in {}.", sheet.csv.display());
                return Ok(());
            }
            for id in table.ids() {
                println!("{id}");
            }
            if !table.duplicate_ids().is_empty() {
                println!(
                    "Duplicate ids (first row used): {}",
                    table.duplicate_ids().join(", ")
                );
            }
        }
        Commands::Score { sheet, id } => {
            let table = load_sheet(&sheet, &config)?;
            let reports = score_selected(&config, &table, id.as_deref())?;

            if reports.is_empty() {
                println!("No respondents found in {}.", sheet.csv.display());
                return Ok(());
            }

            for scored in &reports {
                println!(
                    "{} ({} of {} items answered)",
                    scored.respondent_id,
                    scored.answered,
                    config.item_count()
                );
                for domain in &scored.domains {
                    println!(
                        "- {} score {} ({})",
                        domain.label,
                        report::domain_score(&config, domain),
                        domain.tier.label()
                    );
                }
            }
        }
        Commands::Report {
            sheet,
            id,
            all: _,
            format,
            out,
        } => {
            let table = load_sheet(&sheet, &config)?;
            let reports = score_selected(&config, &table, id.as_deref())?;
            let generated_at = chrono::Local::now();
            let out = out.unwrap_or_else(|| format.default_output());

            let rendered = match format {
                Format::Markdown => reports
                    .iter()
                    .map(|r| report::build_report(r, &config, generated_at))
                    .collect::<Vec<_>>()
                    .join("\n---\n\n"),
                Format::Json => report::to_json(&reports, generated_at)?,
            };
            std::fs::write(&out, rendered)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!(
                "Report for {} respondent(s) written to {}.",
                reports.len(),
                out.display()
            );
        }
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
