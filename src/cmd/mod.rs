//! Command-line surface for mysql2pg.

use crate::convert::{self, ConvertConfig, ConvertStats, WarningCollector};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mysql2pg")]
#[command(version)]
#[command(
    about = "Convert a MySQL dump file into PostgreSQL-compatible SQL",
    long_about = None
)]
pub struct Cli {
    /// Input MySQL dump file
    pub input: PathBuf,

    /// Output SQL file (default: <input stem>_postgres.sql)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Parse and report without writing the output file
    #[arg(long)]
    pub dry_run: bool,

    /// Show progress during conversion
    #[arg(short, long)]
    pub progress: bool,

    /// Suppress the conversion summary
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ConvertConfig {
        input: cli.input,
        output: cli.output,
        dry_run: cli.dry_run,
        progress: cli.progress,
    };

    let stats = convert::run(config)?;

    if !cli.quiet {
        print_summary(&stats, cli.dry_run);
    }

    Ok(())
}

fn print_summary(stats: &ConvertStats, dry_run: bool) {
    if dry_run {
        eprintln!("Dry run (no output written):");
    } else if let Some(path) = &stats.output_path {
        eprintln!("Converted MySQL dump to PostgreSQL format: {}", path.display());
    }
    eprintln!(
        "  {} statements processed, {} written, {} skipped",
        stats.statements_processed, stats.statements_written, stats.statements_skipped
    );
    eprintln!(
        "  {} tables, {} foreign keys deferred to ALTER TABLE",
        stats.tables_created, stats.foreign_keys_deferred
    );

    if !stats.warnings.is_empty() {
        let mut collector = WarningCollector::new();
        for w in &stats.warnings {
            collector.add(w.clone());
        }
        collector.print_summary();
        eprintln!("Review the output before importing; some constructs may need manual fixes.");
    }
}
