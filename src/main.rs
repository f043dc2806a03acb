use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use zona_patcher::cfg::ActionOutcome;
use zona_patcher::conflict::{detect_conflicts, ConflictRecord};
use zona_patcher::processor::{generate_changelog, ModProcessor, ScriptOutcome};
use zona_patcher::report::unified_diff;
use zona_patcher::script::{load_scripts, required_config_files, ModScript};
use zona_patcher::store::DirStore;

#[derive(Parser)]
#[command(name = "zona-patcher")]
#[command(about = "Structural patcher and conflict detector for game config files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply all mod scripts to a work directory of extracted configs
    Apply {
        /// Directory containing mod scripts (*.json)
        #[arg(short, long, default_value = "mods")]
        mods: PathBuf,

        /// Work directory holding the config files to patch
        #[arg(short, long, default_value = ".")]
        work: PathBuf,

        /// Show unified diffs of changed files
        #[arg(short, long)]
        diff: bool,

        /// Write a changelog of applied mods to this path
        #[arg(long)]
        changelog: Option<PathBuf>,
    },

    /// Detect conflicts between mod scripts without touching any file
    Conflicts {
        /// Directory containing mod scripts (*.json)
        #[arg(short, long, default_value = "mods")]
        mods: PathBuf,
    },

    /// List discovered mod scripts
    List {
        /// Directory containing mod scripts (*.json)
        #[arg(short, long, default_value = "mods")]
        mods: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Apply {
            mods,
            work,
            diff,
            changelog,
        } => cmd_apply(mods, work, diff, changelog),

        Commands::Conflicts { mods } => cmd_conflicts(mods),

        Commands::List { mods } => cmd_list(mods),
    }
}

fn cmd_apply(mods: PathBuf, work: PathBuf, diff: bool, changelog: Option<PathBuf>) -> Result<()> {
    let scripts = load_scripts(&mods)?;
    if scripts.is_empty() {
        anyhow::bail!("no mod scripts found in {}", mods.display());
    }

    // Conflict detection is a hard precondition: nothing is mutated
    // until the batch comes back clean.
    let conflicts = detect_conflicts(&scripts);
    if !conflicts.is_empty() {
        print_conflicts(&conflicts);
        anyhow::bail!(
            "{} conflict(s) detected; resolve them before applying",
            conflicts.len()
        );
    }

    let required = required_config_files(&scripts);
    let pristine: BTreeMap<String, String> = if diff {
        snapshot(&work, &required)
    } else {
        BTreeMap::new()
    };

    let mut processor = ModProcessor::new(DirStore::new(&work));
    let (outcomes, summary) = processor.process_all(&scripts);

    for outcome in &outcomes {
        print_outcome(outcome, &scripts);
    }

    println!();
    let status = format!(
        "{} mod(s) processed: {} succeeded, {} failed",
        summary.total, summary.succeeded, summary.failed
    );
    if summary.failed == 0 {
        println!("{}", status.green());
    } else {
        println!("{}", status.red());
    }

    if let Some(path) = changelog {
        fs::write(&path, generate_changelog(&scripts))?;
        println!("Changelog written to {}", path.display());
    }

    if diff {
        print_diffs(&work, &pristine);
    }

    Ok(())
}

fn cmd_conflicts(mods: PathBuf) -> Result<()> {
    let scripts = load_scripts(&mods)?;
    if scripts.is_empty() {
        anyhow::bail!("no mod scripts found in {}", mods.display());
    }

    let conflicts = detect_conflicts(&scripts);
    if conflicts.is_empty() {
        println!(
            "{}",
            format!("No conflicts across {} mod script(s)", scripts.len()).green()
        );
        return Ok(());
    }

    print_conflicts(&conflicts);
    anyhow::bail!("{} conflict(s) detected", conflicts.len())
}

fn cmd_list(mods: PathBuf) -> Result<()> {
    let scripts = load_scripts(&mods)?;
    if scripts.is_empty() {
        println!("No mod scripts found in {}", mods.display());
        return Ok(());
    }

    for (name, script) in &scripts {
        println!(
            "{} {} ({} action(s))",
            name.bold(),
            format!("v{}", script.version).dimmed(),
            script.actions.len()
        );
        if !script.description.is_empty() {
            println!("  {}", script.description.dimmed());
        }
    }
    Ok(())
}

fn print_outcome(outcome: &ScriptOutcome, scripts: &BTreeMap<String, ModScript>) {
    let action_count = scripts
        .get(&outcome.script)
        .map(|s| s.actions.len())
        .unwrap_or_default();

    println!("{}", format!("=== {} ===", outcome.script).bold());
    for applied in &outcome.applied {
        let progress = format!("[{}/{}]", applied.index + 1, action_count);
        println!("{} {}", progress.dimmed(), applied.description);
        if let ActionOutcome::Replaced { count: 0 } = applied.outcome {
            println!(
                "{}",
                "  warning: no matches found for replace".yellow()
            );
        }
    }
    match &outcome.error {
        None => println!("{}", "ok".green()),
        Some(err) => println!("{}", format!("failed: {err}").red()),
    }
}

fn print_conflicts(conflicts: &[ConflictRecord]) {
    println!("{}", "Mod conflicts detected:".red().bold());
    for c in conflicts {
        let target = match &c.path {
            Some(path) => path.clone(),
            None => "(whole-file replace)".to_string(),
        };
        println!(
            "  {} {} {} on {} at {} ({} vs {})",
            c.mod_file1.bold(),
            "<->".red(),
            c.mod_file2.bold(),
            c.config_file,
            target,
            c.action1,
            c.action2
        );
    }
}

fn snapshot(work: &Path, files: &BTreeSet<String>) -> BTreeMap<String, String> {
    files
        .iter()
        .filter_map(|file| {
            fs::read_to_string(work.join(file))
                .ok()
                .map(|content| (file.clone(), content))
        })
        .collect()
}

fn print_diffs(work: &Path, pristine: &BTreeMap<String, String>) {
    for (file, original) in pristine {
        let Ok(patched) = fs::read_to_string(work.join(file)) else {
            continue;
        };
        if let Some(diff) = unified_diff(file, original, &patched) {
            println!();
            for line in diff.lines() {
                match line.chars().next() {
                    Some('+') => println!("{}", line.green()),
                    Some('-') => println!("{}", line.red()),
                    _ => println!("{}", line.dimmed()),
                }
            }
        }
    }
}
