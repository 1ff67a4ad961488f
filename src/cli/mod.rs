//! Command-line interface for drgcoder.
//!
//! Provides commands for analyzing clinical text, submitting repairs,
//! reviewing predictions, and searching diagnosis codes.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{backend_from_config, CodingApi};
use crate::config;
use crate::domain::{CoderCaseData, Diagnosis};
use crate::highlight::render_marked;
use crate::preferences::{JsonFileStore, Preferences};
use crate::ranking::{format_probability, rank, RankedList};
use crate::review::{SortColumn, StatusFilter};
use crate::search::{CodeSearcher, SearchOutcome};
use crate::views::{AnalysisStatus, AnalyzerMsg, AnalyzerView, Driver, SubmitStatus};

pub mod review;

/// drgcoder - medical coding assistant
#[derive(Parser, Debug)]
#[command(name = "drgcoder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze clinical text and show suggested codes
    Analyze {
        /// Input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Read input from stdin
        #[arg(long)]
        stdin: bool,

        /// Show every principal diagnosis candidate, not just the top one
        #[arg(long)]
        all: bool,

        /// Write the hydrated repair form to this file as JSON
        #[arg(long)]
        repair_out: Option<PathBuf>,

        /// Submit the hydrated repair form right away
        #[arg(long)]
        submit: bool,
    },

    /// Submit a repaired case record (JSON)
    Repair {
        /// CoderCaseData JSON file
        file: PathBuf,
    },

    /// List predictions awaiting or past review
    Predictions {
        /// Filter by patient id, code or diagnosis name
        #[arg(short, long)]
        search: Option<String>,

        /// Filter by review status
        #[arg(long, value_enum, default_value = "all")]
        status: StatusArg,

        /// Sort column
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Page to fetch
        #[arg(long, default_value = "1")]
        page: u32,

        /// Rows per page (defaults to review.page_size)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show a prediction in detail
    Show {
        /// Prediction ID
        id: String,
    },

    /// Approve one or more predictions
    Approve {
        /// Prediction IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Validator name (defaults to the stored name)
        #[arg(long, env = "DRGCODER_VALIDATOR")]
        by: Option<String>,

        /// Optional comment
        #[arg(long)]
        comment: Option<String>,
    },

    /// Reject a prediction with corrected codes
    Reject {
        /// Prediction ID
        id: String,

        /// Corrected main diagnosis code
        #[arg(long)]
        main: String,

        /// Corrected main diagnosis name
        #[arg(long)]
        main_name: Option<String>,

        /// Add a secondary diagnosis (CODE=NAME, repeatable)
        #[arg(long = "secondary", value_parser = parse_pair)]
        secondary: Vec<(String, String)>,

        /// Replace a secondary code (OLD=NEW, repeatable)
        #[arg(long = "replace", value_parser = parse_pair)]
        replace: Vec<(String, String)>,

        /// Drop a secondary code (repeatable)
        #[arg(long = "remove")]
        remove: Vec<String>,

        /// Why the prediction is wrong
        #[arg(long)]
        comment: String,

        /// Validator name (defaults to the stored name)
        #[arg(long, env = "DRGCODER_VALIDATOR")]
        by: Option<String>,
    },

    /// Search diagnosis codes
    Search {
        /// Code or name fragment
        query: String,
    },

    /// Show or set the stored validator name
    Validator {
        /// New name
        name: Option<String>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Status filter for CLI (maps to StatusFilter)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    All,
    Pending,
    Approved,
    Rejected,
}

impl From<StatusArg> for StatusFilter {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::All => StatusFilter::All,
            StatusArg::Pending => StatusFilter::Pending,
            StatusArg::Approved => StatusFilter::Approved,
            StatusArg::Rejected => StatusFilter::Rejected,
        }
    }
}

/// Sort column for CLI (maps to SortColumn)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Patient,
    Code,
    Name,
    Confidence,
    Created,
    Status,
}

impl From<SortArg> for SortColumn {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Patient => SortColumn::PacId,
            SortArg::Code => SortColumn::MainCode,
            SortArg::Name => SortColumn::MainName,
            SortArg::Confidence => SortColumn::Confidence,
            SortArg::Created => SortColumn::CreatedAt,
            SortArg::Status => SortColumn::Status,
        }
    }
}

/// Parse `LEFT=RIGHT`
fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((left, right)) if !left.trim().is_empty() => {
            Ok((left.trim().to_string(), right.trim().to_string()))
        }
        _ => Err(format!("Expected LEFT=RIGHT, got {:?}", raw)),
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Analyze {
                input,
                stdin,
                all,
                repair_out,
                submit,
            } => analyze(input, stdin, all, repair_out, submit).await,
            Commands::Repair { file } => submit_repair_file(&file).await,
            Commands::Predictions {
                search,
                status,
                sort,
                desc,
                page,
                limit,
            } => review::list(search, status.into(), sort.map(Into::into), desc, page, limit).await,
            Commands::Show { id } => review::show(&id).await,
            Commands::Approve { ids, by, comment } => review::approve(ids, by, comment).await,
            Commands::Reject {
                id,
                main,
                main_name,
                secondary,
                replace,
                remove,
                comment,
                by,
            } => {
                let edits = review::RejectArgs {
                    main,
                    main_name,
                    secondary,
                    replace,
                    remove,
                    comment,
                };
                review::reject(&id, edits, by).await
            }
            Commands::Search { query } => search_codes(&query).await,
            Commands::Validator { name } => validator(name),
            Commands::Config => show_config(),
        }
    }
}

/// Resolve the coding service backend from config
pub(crate) fn backend() -> Result<Arc<dyn CodingApi>> {
    let cfg = config::config()?;
    Ok(backend_from_config(cfg)?)
}

/// Load preferences from $DRGCODER_HOME/preferences.json
pub(crate) fn preferences() -> Result<Preferences<JsonFileStore>> {
    let path = config::config()?.preferences_path();
    Preferences::load(JsonFileStore::new(&path))
        .with_context(|| format!("Failed to load preferences: {}", path.display()))
}

/// Read input from a file or piped stdin
fn read_input(input_file: Option<PathBuf>, use_stdin: bool) -> Result<String> {
    let input = if let Some(path) = input_file {
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    } else if use_stdin || !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read from stdin")?;
        buffer
    } else {
        anyhow::bail!("No input provided. Use --input <file> or pipe to stdin");
    };

    if input.trim().is_empty() {
        anyhow::bail!("Input is empty");
    }

    Ok(input)
}

fn print_diagnoses(title: &str, list: &RankedList<'_, Diagnosis>) {
    println!("{}:", title);
    if list.is_empty() {
        println!("  (none)");
        return;
    }
    for d in list.visible() {
        let probability = format_probability(d.probability).unwrap_or_default();
        println!("  {:<8} {:>5}  {}", d.code, probability, d.name);
        if let Some(reason) = &d.reason {
            println!("           {}", reason);
        }
    }
    if list.hidden_count() > 0 {
        println!("  ... {} more (use --all)", list.hidden_count());
    }
}

/// Analyze text and print the results
async fn analyze(
    input_file: Option<PathBuf>,
    use_stdin: bool,
    show_all: bool,
    repair_out: Option<PathBuf>,
    submit: bool,
) -> Result<()> {
    let text = read_input(input_file, use_stdin)?;
    let driver = Driver::new(backend()?);
    let mut view = AnalyzerView::new();

    driver.dispatch(&mut view, AnalyzerMsg::Analyze(text)).await;
    if let AnalysisStatus::Failed(error) = view.status() {
        anyhow::bail!("Analysis failed: {}", error);
    }
    if show_all {
        driver.dispatch(&mut view, AnalyzerMsg::TogglePrincipal).await;
    }

    let result = view.result().context("Analysis returned no result")?;

    println!("Analyzed text:");
    println!("{}", render_marked(view.text(), &result.highlights, None));
    println!();
    println!("DRG {}  {}", result.drg_code, result.drg_name);
    println!(
        "  Reliability {:.0}%  LOS {:.1}  RV {:.2}  Revenue {:.0}  Cost {:.0}",
        result.reliability_score * 100.0,
        result.los,
        result.rv,
        result.revenue,
        result.cost
    );
    println!();

    print_diagnoses("Principal diagnosis (ICD-10)", &view.ranked_principal());
    if !result.other_diagnoses.is_empty() {
        println!();
        print_diagnoses(
            "Secondary diagnoses (ICD-10)",
            &RankedList::new(&result.other_diagnoses, false),
        );
    }
    if !result.procedures.is_empty() {
        println!();
        println!("Procedures:");
        for p in rank(&result.procedures) {
            let probability = format_probability(p.probability).unwrap_or_default();
            println!("  {:<8} {:>5}  {}", p.code, probability, p.name);
        }
    }

    if let Some(path) = repair_out {
        let form = view.repair().context("No repair form available")?;
        let json = serde_json::to_string_pretty(form.payload()).context("Failed to serialize repair form")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("\n[Repair form written to {}]", path.display());
    }

    if submit {
        driver.dispatch(&mut view, AnalyzerMsg::SubmitRepair).await;
        match view.submit_status() {
            SubmitStatus::Saved => eprintln!("\n[Repair saved]"),
            SubmitStatus::Failed(error) => anyhow::bail!("Repair submission failed: {}", error),
            _ => {}
        }
    }

    Ok(())
}

/// Submit a repair payload from a JSON file
async fn submit_repair_file(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read repair file: {}", path.display()))?;
    let payload: CoderCaseData = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse repair file: {}", path.display()))?;

    let ack = backend()?.submit_repair(&payload).await?;
    println!("Repair submitted: {}", ack.status);
    Ok(())
}

/// Search diagnosis codes
async fn search_codes(query: &str) -> Result<()> {
    let cfg = config::config()?;
    let searcher = CodeSearcher::new(backend()?, &cfg.search);

    match searcher.search(query).await? {
        SearchOutcome::TooShort => {
            println!(
                "Type at least {} characters to search.",
                cfg.search.min_query_length
            );
        }
        SearchOutcome::Results(results) if results.is_empty() => println!("No codes found."),
        SearchOutcome::Results(results) => {
            for r in results {
                println!("  {:<8} {}", r.code, r.name);
            }
        }
        SearchOutcome::Superseded | SearchOutcome::Stale => {}
    }
    Ok(())
}

/// Show or set the stored validator name
fn validator(name: Option<String>) -> Result<()> {
    let mut prefs = preferences()?;
    match name {
        Some(name) => {
            prefs
                .set_validator_name(&name)
                .context("Failed to save validator name")?;
            println!("Validator set to {}", name.trim());
        }
        None => match prefs.validator_name() {
            Some(name) => println!("{}", name),
            None => println!("(no validator name stored)"),
        },
    }
    Ok(())
}

/// Print the resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("drgcoder configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", cfg.home.display());
    println!("  Preferences: {}", cfg.preferences_path().display());
    println!();
    println!("API:");
    println!(
        "  Base URL: {}",
        cfg.api.base_url.as_deref().unwrap_or("(none - local mock)")
    );
    println!("  Timeout:  {}s", cfg.api.timeout_seconds);
    println!();
    println!("Search:");
    println!("  Debounce:         {}ms", cfg.search.debounce_ms);
    println!("  Min query length: {}", cfg.search.min_query_length);
    println!("  Result limit:     {}", cfg.search.limit);
    println!();
    println!("Review:");
    println!("  Page size: {}", cfg.review.page_size);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("E11.9=Type 2 diabetes").unwrap(),
            ("E11.9".to_string(), "Type 2 diabetes".to_string())
        );
        assert_eq!(parse_pair("A=").unwrap(), ("A".to_string(), String::new()));
        assert!(parse_pair("nothing").is_err());
        assert!(parse_pair("=B").is_err());
    }

    #[test]
    fn test_cli_parses_reject() {
        let cli = Cli::try_parse_from([
            "drgcoder",
            "reject",
            "pred-001",
            "--main",
            "J15.9",
            "--replace",
            "E11.9=E11.65",
            "--comment",
            "Wrong organism",
        ])
        .unwrap();
        match cli.command {
            Commands::Reject { main, replace, .. } => {
                assert_eq!(main, "J15.9");
                assert_eq!(replace, vec![("E11.9".to_string(), "E11.65".to_string())]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
