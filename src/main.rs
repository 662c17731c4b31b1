use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tool_output_patcher::builtin::{self, CONFIRMATION_MESSAGE, DEFAULT_TARGET};
use tool_output_patcher::config::{discover_patch_files, load_from_path, PatchSet};
use tool_output_patcher::{PatchReport, Patcher, ReplaceOutcome, WorkspaceGuard};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tool-output-patcher")]
#[command(about = "Quiet per-tool status messages in the chat route", long_about = None)]
#[command(version)]
struct Cli {
    /// Workspace root used to resolve the target (defaults to the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// Target file (defaults to the patch set target, then src/app/api/chat/route.ts)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Patch set TOML file, or a directory of them (defaults to the built-in set)
    #[arg(short, long)]
    patches: Option<PathBuf>,

    /// Dry run - report what would change without writing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of changes
    #[arg(short, long)]
    diff: bool,

    /// Fail without writing if any search text is missing
    #[arg(long)]
    strict: bool,

    /// Print reports as JSON instead of the confirmation message
    #[arg(long)]
    json: bool,

    /// Show per-replacement status and debug logs
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    patch_set: &'a str,
    #[serde(flatten)]
    report: &'a PatchReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let workspace = resolve_workspace(cli.workspace.as_deref())?;
    let guard = WorkspaceGuard::new(&workspace)
        .with_context(|| format!("invalid workspace {}", workspace.display()))?;
    tracing::debug!(workspace = %guard.workspace_root().display(), "resolved workspace");

    let patch_sets = load_patch_sets(cli.patches.as_deref())?;

    let mut runs = Vec::with_capacity(patch_sets.len());
    for set in &patch_sets {
        let target = cli
            .file
            .clone()
            .or_else(|| set.meta.target.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TARGET));
        let file = guard.validate_path(&target)?;

        let patcher = Patcher::from_patch_set(set).strict(cli.strict);
        let report = if cli.dry_run {
            patcher.check(&file)?
        } else {
            patcher.patch(&file)?
        };

        if cli.verbose && !cli.json {
            print_steps(set, &report, cli.dry_run);
        }
        if cli.diff && !cli.json && report.changed() {
            display_diff(&report.file, report.original(), report.patched());
        }

        runs.push((set, report));
    }

    if cli.json {
        let out: Vec<JsonReport<'_>> = runs
            .iter()
            .map(|(set, report)| JsonReport {
                patch_set: set.display_name(),
                report,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if cli.dry_run {
        println!("{}", "Dry run: no files written".cyan());
    } else {
        let mut printed: Vec<&str> = Vec::new();
        for (set, _) in &runs {
            let message = set.meta.message.as_deref().unwrap_or(CONFIRMATION_MESSAGE);
            if !printed.contains(&message) {
                println!("{}", message);
                printed.push(message);
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays the confirmation line (or JSON).
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_workspace(cli_workspace: Option<&Path>) -> Result<PathBuf> {
    match cli_workspace {
        Some(path) => path
            .canonicalize()
            .with_context(|| format!("workspace not found: {}", path.display())),
        None => env::current_dir().context("cannot determine current directory"),
    }
}

/// Built-in set when no path is given; a file loads one set, a directory loads every `*.toml`.
fn load_patch_sets(path: Option<&Path>) -> Result<Vec<PatchSet>> {
    let Some(path) = path else {
        return Ok(vec![builtin::patch_set()]);
    };

    let files = if path.is_dir() {
        discover_patch_files(path)?
    } else {
        vec![path.to_path_buf()]
    };

    if files.is_empty() {
        anyhow::bail!("No .toml patch sets found in {}", path.display());
    }

    let mut sets = Vec::with_capacity(files.len());
    for file in files {
        tracing::debug!(file = %file.display(), "loading patch set");
        sets.push(load_from_path(&file)?);
    }
    Ok(sets)
}

fn print_steps(set: &PatchSet, report: &PatchReport, dry_run: bool) {
    println!(
        "{} {} ({})",
        "Patch set".bold(),
        set.display_name(),
        report.file.display()
    );

    let replacements = set.replacements();
    for (step, replacement) in report.steps.iter().zip(&replacements) {
        match step.outcome {
            ReplaceOutcome::Replaced { occurrences } => {
                let verb = if dry_run { "Would replace" } else { "Replaced" };
                let noun = if occurrences == 1 {
                    "occurrence"
                } else {
                    "occurrences"
                };
                println!(
                    "{} {}: {} {} {}",
                    "✓".green(),
                    step.id,
                    verb,
                    occurrences,
                    noun
                );
            }
            ReplaceOutcome::NotFound if replacement.is_applied_in(report.patched()) => {
                println!("{} {}: Already applied", "⊙".yellow(), step.id);
            }
            ReplaceOutcome::NotFound => {
                println!("{} {}: Not found, skipped", "⊘".cyan(), step.id);
            }
        }
    }

    println!(
        "  {} -> {} bytes",
        report.bytes_before,
        format!("{}", report.bytes_after).bold()
    );
}

/// Show unified diff between original and patched content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
