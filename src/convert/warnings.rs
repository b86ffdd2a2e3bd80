//! Warning system for the conversion pipeline.
//!
//! Recoverable problems never abort a run; they are collected here and
//! reported on stderr after the output is written.

/// Warning types that can occur during conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertWarning {
    /// The scanner hit EOF inside a literal or an open paren group; the
    /// remainder was emitted as one final statement.
    UnbalancedSyntax { statement_index: u64, line: u64 },
    /// A clause the pipeline has no rule for; passed through unchanged
    /// so nothing is silently dropped.
    UnrecognizedConstruct {
        construct: String,
        statement_index: u64,
        line: u64,
    },
    /// A MySQL-only statement that produces no PostgreSQL output.
    SkippedStatement {
        reason: String,
        statement_preview: String,
    },
}

impl std::fmt::Display for ConvertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConvertWarning::UnbalancedSyntax {
                statement_index,
                line,
            } => {
                write!(
                    f,
                    "Unbalanced syntax at end of input (statement {}, near line {}): \
                     remainder emitted as-is, review the output",
                    statement_index, line
                )
            }
            ConvertWarning::UnrecognizedConstruct {
                construct,
                statement_index,
                line,
            } => {
                write!(
                    f,
                    "Unrecognized construct left in place (statement {}, near line {}): {}",
                    statement_index, line, construct
                )
            }
            ConvertWarning::SkippedStatement {
                reason,
                statement_preview,
            } => {
                write!(f, "Skipped: {} ({})", reason, statement_preview)
            }
        }
    }
}

/// Collects warnings during conversion
#[derive(Debug, Default)]
pub struct WarningCollector {
    warnings: Vec<ConvertWarning>,
    max_warnings: usize,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: 100, // Limit to avoid memory issues
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: limit,
        }
    }

    /// Add a warning, deduplicating repeats of the same kind.
    pub fn add(&mut self, warning: ConvertWarning) {
        if self.warnings.len() < self.max_warnings {
            if !self.warnings.iter().any(|w| Self::is_similar(w, &warning)) {
                self.warnings.push(warning);
            }
        }
    }

    /// Check if two warnings are similar enough to deduplicate
    fn is_similar(a: &ConvertWarning, b: &ConvertWarning) -> bool {
        match (a, b) {
            (
                ConvertWarning::SkippedStatement { reason: r1, .. },
                ConvertWarning::SkippedStatement { reason: r2, .. },
            ) => r1 == r2,
            (
                ConvertWarning::UnrecognizedConstruct { construct: c1, .. },
                ConvertWarning::UnrecognizedConstruct { construct: c2, .. },
            ) => c1 == c2,
            _ => false,
        }
    }

    /// Get all collected warnings
    pub fn warnings(&self) -> &[ConvertWarning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Drain collected warnings, leaving the collector empty.
    pub fn take(&mut self) -> Vec<ConvertWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Print summary of warnings to stderr.
    pub fn print_summary(&self) {
        if self.warnings.is_empty() {
            return;
        }

        eprintln!("\nConversion warnings ({}):", self.warnings.len());
        for warning in &self.warnings {
            eprintln!("  warning: {}", warning);
        }

        if self.warnings.len() >= self.max_warnings {
            eprintln!("  ... (additional warnings truncated)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deduplicates_skipped_statements() {
        let mut collector = WarningCollector::new();
        for _ in 0..3 {
            collector.add(ConvertWarning::SkippedStatement {
                reason: "LOCK TABLES".to_string(),
                statement_preview: "LOCK TABLES `users` WRITE".to_string(),
            });
        }
        assert_eq!(collector.count(), 1);
    }

    #[test]
    fn test_keeps_distinct_unbalanced_warnings() {
        let mut collector = WarningCollector::new();
        collector.add(ConvertWarning::UnbalancedSyntax {
            statement_index: 1,
            line: 10,
        });
        collector.add(ConvertWarning::UnbalancedSyntax {
            statement_index: 2,
            line: 20,
        });
        assert_eq!(collector.count(), 2);
    }

    #[test]
    fn test_limit_is_enforced() {
        let mut collector = WarningCollector::with_limit(2);
        for i in 0..5 {
            collector.add(ConvertWarning::UnrecognizedConstruct {
                construct: format!("clause {i}"),
                statement_index: i,
                line: i,
            });
        }
        assert_eq!(collector.count(), 2);
    }
}
