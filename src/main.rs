use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod batch;
mod config;
mod distance;
mod error;
mod evaluate;
mod extract;
mod metrics;
mod report;
mod tools;

use batch::{BatchEvaluator, ToolOutcome, GROUND_TRUTH_DIR};
use error::EvalError;

#[derive(Parser, Debug)]
#[command(name = "ocr-eval")]
#[command(about = "Score OCR tool output against ground-truth transcriptions")]
#[command(version)]
pub struct Args {
    /// TOML file describing OCR tools and their output formats
    #[arg(long, env = "OCR_EVAL_TOOLS_CONFIG", global = true)]
    pub tools_config: Option<PathBuf>,

    /// Text encoding of input files (any WHATWG label, e.g. "utf-8", "windows-1252")
    #[arg(long, env = "OCR_EVAL_ENCODING", default_value = "utf-8", global = true)]
    pub encoding: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a single ground-truth / OCR output pair
    Pair {
        /// [.txt] Path to ground truth file
        #[arg(short = 'g', long, visible_alias = "ground_truth_file")]
        ground_truth_file: PathBuf,

        /// [.json/.txt] Path to OCR processed file
        #[arg(short = 'o', long, visible_alias = "ocr_file")]
        ocr_file: PathBuf,

        /// OCR tool that produced the file (inferred from its directory if omitted)
        #[arg(short, long)]
        tool: Option<String>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Score every configured tool's outputs against a ground-truth directory
    Batch {
        /// Directory containing the ground-truth and per-tool output directories
        #[arg(short, long, default_value = ".")]
        working_dir: PathBuf,

        /// Ground-truth directory, relative to the working directory
        #[arg(long, default_value = GROUND_TRUTH_DIR)]
        ground_truth_dir: PathBuf,

        /// Where reports are written (defaults to the working directory)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Restrict to these tools (repeatable); all configured tools by default
        #[arg(short, long = "tool")]
        tools: Vec<String>,

        /// Worker threads for scoring pairs
        #[arg(long, env = "OCR_EVAL_WORKERS", default_value = "1")]
        workers: usize,
    },

    /// List configured OCR tools
    Tools,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            let eval_error = e.downcast_ref::<EvalError>();
            tracing::error!(
                code = eval_error.map(EvalError::code).unwrap_or("INTERNAL_ERROR"),
                "{:#}",
                e
            );
            if let (Some(err), Command::Pair { format: OutputFormat::Json, .. }) =
                (eval_error, &args.command)
            {
                if let Ok(body) = serde_json::to_string_pretty(&err.to_response()) {
                    println!("{}", body);
                }
            } else {
                eprintln!("Error: {:#}", e);
            }
            ExitCode::from(eval_error.map(EvalError::exit_code).unwrap_or(1))
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let config = config::Config::try_from(args)?;
    tracing::debug!(
        "Using {} tools ({}), encoding {}",
        config.registry.list().len(),
        config
            .tools_source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        config.encoding.name()
    );

    match &args.command {
        Command::Pair {
            ground_truth_file,
            ocr_file,
            tool,
            format,
        } => {
            let tool = config.registry.resolve(tool.as_deref(), ocr_file)?;
            tracing::debug!(
                "Reading {} with {} rule ({})",
                ocr_file.display(),
                tool.name,
                tool.rule
            );

            let pair =
                evaluate::evaluate_files(ground_truth_file, ocr_file, &tool.rule, config.encoding)?;

            match format {
                OutputFormat::Text => println!("OCR Evaluation results:\n{}", pair.record),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pair.record)?),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Batch {
            working_dir,
            ground_truth_dir,
            output_dir,
            tools,
            workers,
        } => {
            let selected = config.registry.select(tools)?;
            let output_dir = output_dir.clone().unwrap_or_else(|| working_dir.clone());

            let evaluator = BatchEvaluator::new(&config, *workers);
            let outcomes = evaluator.run_all(working_dir, ground_truth_dir, &selected)?;

            let mut summaries = Vec::new();
            let mut failed = 0;
            for outcome in &outcomes {
                match outcome {
                    ToolOutcome::Completed(run) => {
                        tracing::info!(
                            "{}: {}/{} pairs evaluated in {}ms",
                            run.tool,
                            run.records.len(),
                            run.total_pairs(),
                            run.elapsed_ms
                        );
                        for skipped in &run.skipped {
                            eprintln!(
                                "{}: skipped pair {} ({} / {}): {}",
                                run.tool,
                                skipped.index + 1,
                                skipped.gt_filename,
                                skipped.ocr_filename,
                                skipped.reason
                            );
                        }
                        report::export_run(run, &output_dir)?;
                        summaries.push(report::summarize(run));
                    }
                    ToolOutcome::Failed { tool, error } => {
                        failed += 1;
                        eprintln!("Skipped tool {}: {}", tool, error);
                    }
                }
            }

            if !summaries.is_empty() {
                let path = report::export_summary(&summaries, &output_dir)?;
                println!("OCR Evaluation results:\n");
                print!("{}", report::format_comparison(&summaries));
                println!("\nSummary written to {}", path.display());
            }

            if failed == outcomes.len() {
                anyhow::bail!("no OCR tool could be evaluated");
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Tools => {
            for tool in config.registry.tools() {
                let marker = if tool.name == config.registry.default_name() {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "{:<12} {:<20} {}{}",
                    tool.name,
                    tool.output_dir(),
                    tool.rule,
                    marker
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
