//! MySQL → PostgreSQL dump conversion pipeline.
//!
//! Statements are streamed out of the input file and pushed through the
//! passes in order: lexical normalization, type mapping, foreign-key
//! extraction. Cleaned statements are written in input order behind a
//! fixed PostgreSQL preamble, and every extracted foreign key is emitted
//! at the end as a deferred `ALTER TABLE ... ADD CONSTRAINT`, so all
//! referenced tables exist by the time the constraints apply.

mod foreign_keys;
mod normalize;
mod types;
mod warnings;

pub use foreign_keys::{extract_foreign_keys, ForeignKeyConstraint, ForeignKeyMap};
pub use normalize::{
    backticks_to_double_quotes, escape_quotes, normalize_create_table, normalize_statement,
    strip_version_comments,
};
pub use types::TypeMapper;
pub use warnings::{ConvertWarning, WarningCollector};

use crate::parser::{determine_buffer_size, Parser, StatementType};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Configuration for one conversion run
#[derive(Debug, Default)]
pub struct ConvertConfig {
    /// Input MySQL dump file
    pub input: PathBuf,
    /// Output SQL file (None for `<input stem>_postgres.sql`)
    pub output: Option<PathBuf>,
    /// Parse and report without writing output
    pub dry_run: bool,
    /// Show progress
    pub progress: bool,
}

/// Statistics from a conversion run
#[derive(Debug, Default)]
pub struct ConvertStats {
    /// Total statements read from the input
    pub statements_processed: u64,
    /// Statements written to the output
    pub statements_written: u64,
    /// Statements dropped (MySQL-only)
    pub statements_skipped: u64,
    /// Foreign keys moved to the deferred ALTER TABLE block
    pub foreign_keys_deferred: u64,
    /// Tables created
    pub tables_created: u64,
    /// Warnings generated
    pub warnings: Vec<ConvertWarning>,
    /// Path the output was written to (None on dry run)
    pub output_path: Option<PathBuf>,
}

/// Default output path: `<input stem>_postgres.sql` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dump".to_string());
    input.with_file_name(format!("{stem}_postgres.sql"))
}

/// Run the conversion pipeline over one dump file.
pub fn run(config: ConvertConfig) -> anyhow::Result<ConvertStats> {
    let file = File::open(&config.input)
        .map_err(|e| anyhow::anyhow!("cannot read input file '{}': {e}", config.input.display()))?;
    let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);

    let output_path = if config.dry_run {
        None
    } else {
        Some(
            config
                .output
                .clone()
                .unwrap_or_else(|| default_output_path(&config.input)),
        )
    };

    let mut writer: Box<dyn Write> = match &output_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Box::new(BufWriter::with_capacity(256 * 1024, File::create(path)?))
        }
        None => Box::new(std::io::sink()),
    };

    let progress_bar = if config.progress {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap(),
        );
        pb.set_message("Converting...");
        Some(pb)
    } else {
        None
    };

    let mut stats = ConvertStats::default();
    let mut collector = WarningCollector::new();
    let mut fk_map = ForeignKeyMap::new();
    let mut created_tables: Vec<String> = Vec::new();

    write_preamble(&mut writer, &config.input)?;

    let mut parser = Parser::new(file, determine_buffer_size(file_size));

    while let Some(stmt) = parser.read_statement()? {
        stats.statements_processed += 1;
        let index = stats.statements_processed;
        let line = parser.statement_line();

        if let Some(ref pb) = progress_bar {
            if index % 1000 == 0 {
                pb.set_message(format!("Processed {index} statements..."));
            }
        }

        let (stmt_type, table_name) = Parser::<&[u8]>::parse_statement(&stmt);
        let raw = String::from_utf8_lossy(&stmt);

        if let Some(reason) = skip_reason(stmt_type) {
            collector.add(ConvertWarning::SkippedStatement {
                reason: reason.to_string(),
                statement_preview: preview(&raw),
            });
            stats.statements_skipped += 1;
            continue;
        }

        let converted = match stmt_type {
            StatementType::CreateTable => {
                stats.tables_created += 1;
                created_tables.push(table_name.clone());

                detect_unrecognized_constructs(&raw, index, line, &mut collector);

                let cleaned = normalize::normalize_create_table(&raw);
                let mapped = TypeMapper::convert(&cleaned);
                let outcome = extract_foreign_keys(&mapped, &table_name);

                for construct in outcome.unrecognized {
                    collector.add(ConvertWarning::UnrecognizedConstruct {
                        construct,
                        statement_index: index,
                        line,
                    });
                }
                for fk in outcome.constraints {
                    stats.foreign_keys_deferred += 1;
                    fk_map.push(fk);
                }
                outcome.statement
            }
            _ => normalize::normalize_statement(&raw),
        };

        // A statement reduced to nothing (e.g. a pure version-comment
        // directive) produces no output
        if converted.trim().is_empty() || converted.trim() == ";" {
            stats.statements_skipped += 1;
            continue;
        }

        writer.write_all(converted.as_bytes())?;
        writer.write_all(b"\n")?;
        stats.statements_written += 1;
    }

    if parser.unbalanced_at_eof() {
        collector.add(ConvertWarning::UnbalancedSyntax {
            statement_index: stats.statements_processed,
            line: parser.statement_line(),
        });
    }

    write_foreign_key_block(&mut writer, &fk_map, &created_tables, &mut collector)?;

    writer.flush()?;

    if let Some(pb) = progress_bar {
        pb.finish_with_message(format!(
            "Converted {} statements",
            stats.statements_processed
        ));
    }

    stats.warnings = collector.take();
    stats.output_path = output_path;
    Ok(stats)
}

/// Fixed PostgreSQL-compatible settings block, written before any
/// converted statement.
fn write_preamble(writer: &mut dyn Write, input: &Path) -> std::io::Result<()> {
    writeln!(writer, "-- Converted from MySQL to PostgreSQL")?;
    writeln!(writer, "-- Original MySQL dump: {}", input.display())?;
    writeln!(writer)?;
    writeln!(writer, "SET statement_timeout = 0;")?;
    writeln!(writer, "SET lock_timeout = 0;")?;
    writeln!(writer, "SET client_encoding = 'UTF8';")?;
    writeln!(writer, "SET standard_conforming_strings = on;")?;
    writeln!(writer, "SET check_function_bodies = false;")?;
    writeln!(writer, "SET client_min_messages = warning;")?;
    writeln!(writer)
}

/// Emit the deferred foreign keys: tables in first-appearance order,
/// constraints in discovery order. A constraint referencing a table the
/// dump never creates is dropped with a warning instead of producing an
/// ALTER TABLE that cannot apply.
fn write_foreign_key_block(
    writer: &mut dyn Write,
    fk_map: &ForeignKeyMap,
    created_tables: &[String],
    collector: &mut WarningCollector,
) -> std::io::Result<()> {
    if fk_map.is_empty() {
        return Ok(());
    }

    writeln!(writer)?;
    writeln!(
        writer,
        "-- Foreign key constraints (added after table creation to avoid dependency issues)"
    )?;
    for fk in fk_map.iter() {
        if !created_tables.contains(&fk.referenced_table) {
            collector.add(ConvertWarning::SkippedStatement {
                reason: format!(
                    "foreign key references table \"{}\" which this dump does not create",
                    fk.referenced_table
                ),
                statement_preview: preview(&fk.to_alter_table()),
            });
            continue;
        }
        writeln!(writer, "{}", fk.to_alter_table())?;
    }
    Ok(())
}

/// Reason a statement type produces no PostgreSQL output, or `None` for
/// the types the pipeline converts.
fn skip_reason(stmt_type: StatementType) -> Option<&'static str> {
    match stmt_type {
        StatementType::LockTables => Some("LOCK TABLES has no PostgreSQL equivalent in a dump"),
        StatementType::UnlockTables => Some("UNLOCK TABLES has no PostgreSQL equivalent in a dump"),
        StatementType::AlterKeys => Some("ALTER TABLE ... DISABLE/ENABLE KEYS is MySQL-only"),
        StatementType::SessionSet => Some("MySQL session variable save/restore"),
        StatementType::CreateTable | StatementType::Insert | StatementType::Unknown => None,
    }
}

/// Clauses the mapper has no rule for are passed through unchanged and
/// surfaced so the user knows manual review is needed.
fn detect_unrecognized_constructs(
    stmt: &str,
    index: u64,
    line: u64,
    collector: &mut WarningCollector,
) {
    let upper = stmt.to_uppercase();

    if upper.contains(" UNSIGNED") {
        collector.add(ConvertWarning::UnrecognizedConstruct {
            construct: "UNSIGNED modifier".to_string(),
            statement_index: index,
            line,
        });
    }
    if upper.contains("ENUM(") {
        collector.add(ConvertWarning::UnrecognizedConstruct {
            construct: "ENUM type".to_string(),
            statement_index: index,
            line,
        });
    }
    if upper.contains(" SET(") {
        collector.add(ConvertWarning::UnrecognizedConstruct {
            construct: "SET type".to_string(),
            statement_index: index,
            line,
        });
    }
}

fn preview(stmt: &str) -> String {
    stmt.trim().chars().take(60).collect()
}
