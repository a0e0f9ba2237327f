use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

use aibom::config::{ScanConfig, LOG_ENV};
use aibom::core::{Category, CodebaseAnalyzer};
use aibom::drift::{diff, Gate, Outcome};
use aibom::error::AibomError;
use aibom::evidence::{bundle_inventory, verify_bundle};
use aibom::formatters::{to_stable_string, write_stable_json, CycloneDxFormatter, SpdxFormatter};
use aibom::provenance::EnvironmentFacts;
use aibom::storage::{load_inventory, load_json, persist_run, write_inventory, STATE_DIR};
use aibom::validation::validate;

const EXIT_FATAL: u8 = 1;
const EXIT_INVALID: u8 = 2;
const EXIT_GATE: u8 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "aibom",
    version,
    author = "aibom developers",
    about = "Static AI bill of materials: inventory, drift gates and evidence bundles"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a source tree and write the inventory
    Generate(GenerateArgs),
    /// Check an inventory document against the schema
    Validate {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
    /// Compare two inventories and evaluate drift gates
    #[command(
        after_help = "Exit status: 0 when no gate fires, 1 on error, 2 for an invalid inventory, 3 when a gate fails.\nGate failures use 3; 2 is reserved for validation failures."
    )]
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Also write the report to this file
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Comma-separated drift kinds that fail the run, e.g. new-model,new-tool
        #[arg(long, value_name = "KINDS")]
        fail_on: Option<String>,
    },
    /// Pack an inventory into a hash-manifested evidence bundle
    Bundle {
        #[arg(long, value_name = "AIBOM")]
        input: PathBuf,
        #[arg(long, value_name = "ZIP")]
        out: PathBuf,
        #[arg(long, value_name = "PATH")]
        baseline: Option<PathBuf>,
        /// Extra file to include verbatim; repeatable
        #[arg(long, value_name = "PATH")]
        artifact: Vec<PathBuf>,
    },
    /// Recompute the digests of an evidence bundle
    Verify {
        #[arg(value_name = "BUNDLE")]
        bundle: PathBuf,
    },
    /// Convert an inventory to a standard SBOM format
    Export {
        #[arg(long, value_name = "AIBOM")]
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = ExportFormat::SpdxJson)]
        format: ExportFormat,
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Print the risk findings of an inventory
    Risk {
        #[arg(long, value_name = "AIBOM")]
        input: PathBuf,
    },
}

#[derive(Debug, Args)]
struct GenerateArgs {
    /// Directory to scan
    #[arg(default_value = ".")]
    target: PathBuf,

    #[arg(short, long, value_name = "FILE", default_value = "AI_BOM.json")]
    output: PathBuf,

    /// Keep prompt template text instead of redacting it
    #[arg(long)]
    include_prompts: bool,

    /// Also write SPDX.json next to the output
    #[arg(long)]
    audit_mode: bool,

    /// With --audit-mode, also write an evidence bundle here
    #[arg(long, value_name = "ZIP")]
    bundle_out: Option<PathBuf>,

    /// site-packages directory for framework versions; repeatable
    #[arg(long, value_name = "DIR")]
    site_packages: Vec<PathBuf>,

    /// Skip writing .aibom/runs and .aibom/latest.json
    #[arg(long)]
    no_persist: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum ExportFormat {
    SpdxJson,
    CyclonedxJson,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            if let Some(AibomError::Validation(errors)) = err.downcast_ref::<AibomError>() {
                eprintln!("Validation failed:\n{errors}");
                return ExitCode::from(EXIT_INVALID);
            }
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Validate { input } => {
            let document = load_json(&input)?;
            validate(&document).map_err(AibomError::Validation)?;
            println!("Validation passed: {}", input.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Diff {
            old,
            new,
            output,
            fail_on,
        } => drift(&old, &new, output.as_deref(), fail_on.as_deref()),
        Command::Bundle {
            input,
            out,
            baseline,
            artifact,
        } => {
            let environment = EnvironmentFacts::capture(parent_dir(&input));
            let manifest =
                bundle_inventory(&input, &out, baseline.as_deref(), &artifact, environment)
                    .with_context(|| format!("failed to bundle {}", input.display()))?;
            println!(
                "Wrote {} ({} manifested entries)",
                out.display(),
                manifest.files.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify { bundle } => {
            let report = verify_bundle(&bundle)
                .with_context(|| format!("failed to read bundle {}", bundle.display()))?;
            print!("{}", to_stable_string(&report)?);
            if report.is_intact() {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Bundle integrity check failed: {}", bundle.display());
                Ok(ExitCode::from(EXIT_INVALID))
            }
        }
        Command::Export {
            input,
            format,
            output,
        } => {
            let inventory = load_inventory(&input)?;
            match format {
                ExportFormat::SpdxJson => SpdxFormatter::new().format_to_file(&inventory, &output)?,
                ExportFormat::CyclonedxJson => {
                    CycloneDxFormatter::new().format_to_file(&inventory, &output)?
                }
            }
            println!("Exported {}", output.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Risk { input } => {
            let inventory = load_inventory(&input)?;
            let summary = serde_json::json!({
                "count": inventory.risk_findings.len(),
                "findings": inventory.risk_findings,
            });
            print!("{}", to_stable_string(&summary)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn generate(args: GenerateArgs) -> Result<ExitCode> {
    let start_time = Instant::now();
    let config = ScanConfig::new()
        .with_include_prompts(args.include_prompts)
        .with_site_packages(args.site_packages);

    let analyzer = CodebaseAnalyzer::new(config);
    let inventory = analyzer
        .analyze(&args.target)
        .with_context(|| format!("failed to analyze {}", args.target.display()))?;

    write_inventory(&inventory, &args.output)?;
    if !args.no_persist {
        persist_run(&args.target, &inventory)?;
    }

    if args.audit_mode {
        let spdx_out = args.output.with_file_name("SPDX.json");
        SpdxFormatter::new().format_to_file(&inventory, &spdx_out)?;
        info!(path = %spdx_out.display(), "wrote SPDX export");

        if let Some(bundle_out) = &args.bundle_out {
            let baseline = args.target.join(STATE_DIR).join("baseline.json");
            let baseline = baseline.exists().then_some(baseline);
            bundle_inventory(
                &args.output,
                bundle_out,
                baseline.as_deref(),
                &[],
                EnvironmentFacts::capture(&args.target),
            )?;
        }
    }

    let counts: Vec<String> = Category::ALL
        .iter()
        .map(|c| format!("{} {}", inventory.entries(*c).len(), c.section()))
        .collect();
    println!(
        "Wrote {}: {} ({} warnings) in {:.2}s",
        args.output.display(),
        counts.join(", "),
        inventory.analysis_warnings.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(ExitCode::SUCCESS)
}

fn drift(
    old: &Path,
    new: &Path,
    output: Option<&Path>,
    fail_on: Option<&str>,
) -> Result<ExitCode> {
    let gate = Gate::parse(fail_on.unwrap_or_default())?;
    let baseline = load_inventory(old).with_context(|| format!("baseline {}", old.display()))?;
    let current = load_inventory(new).with_context(|| format!("current {}", new.display()))?;

    let mut report = diff(&baseline, &current);
    gate.evaluate(&mut report);

    if let Some(output) = output {
        write_stable_json(&report, output)?;
    }
    print!("{}", to_stable_string(&report)?);

    match report.outcome() {
        Outcome::Success => Ok(ExitCode::SUCCESS),
        Outcome::GateFailed => {
            let fired: Vec<String> = report.blocking.iter().map(|k| k.to_string()).collect();
            eprintln!("Drift gates failed: {}", fired.join(", "));
            Ok(ExitCode::from(EXIT_GATE))
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
