//! Lexical normalization of MySQL statements into PostgreSQL form.
//!
//! Each pass is a pure `&str -> String` function applied per statement:
//! identifier quoting, string-escape conversion, version-bracketed comment
//! reduction, and charset/collation/engine clause stripping.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CHARACTER_SET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+CHARACTER\s+SET\s+\w+").unwrap());

static RE_COLLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+COLLATE\s*=?\s*\w+").unwrap());

static RE_ENGINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s*ENGINE\s*=\s*\w+").unwrap());

static RE_AUTO_INCREMENT_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*AUTO_INCREMENT\s*=\s*\d+").unwrap());

static RE_DEFAULT_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:DEFAULT\s+)?CHARSET\s*=\s*\w+").unwrap());

/// Apply the dialect-independent rewrites every statement gets:
/// version comment reduction, backtick identifiers, string escapes.
pub fn normalize_statement(stmt: &str) -> String {
    let result = strip_version_comments(stmt);
    let result = backticks_to_double_quotes(&result);
    escape_quotes(&result)
}

/// CREATE TABLE additionally loses charset/collation clauses and the
/// MySQL table-option tail (`ENGINE=`, `AUTO_INCREMENT=`, `DEFAULT CHARSET=`).
/// The strips run outside string literals only, so a DEFAULT or COMMENT
/// value that happens to contain one of these words is left alone.
pub fn normalize_create_table(stmt: &str) -> String {
    let result = normalize_statement(stmt);
    map_outside_literals(&result, |seg| {
        let seg = RE_CHARACTER_SET.replace_all(seg, "");
        let seg = RE_ENGINE.replace_all(&seg, "");
        let seg = RE_AUTO_INCREMENT_OPTION.replace_all(&seg, "");
        let seg = RE_DEFAULT_CHARSET.replace_all(&seg, "");
        RE_COLLATE.replace_all(&seg, "").to_string()
    })
}

/// Apply `f` to the stretches of `stmt` that sit outside single-quoted
/// string literals; literal text (and the quotes) passes through
/// untouched. Callers run this after `escape_quotes`, so quotes inside
/// literals are already doubled and a `'` always toggles literal state.
pub(crate) fn map_outside_literals(stmt: &str, f: impl Fn(&str) -> String) -> String {
    let mut result = String::with_capacity(stmt.len());
    let mut segment = String::new();
    let mut in_string = false;

    for c in stmt.chars() {
        if c == '\'' {
            if !in_string {
                result.push_str(&f(&segment));
                segment.clear();
            }
            result.push(c);
            in_string = !in_string;
        } else if in_string {
            result.push(c);
        } else {
            segment.push(c);
        }
    }
    result.push_str(&f(&segment));
    result
}

/// Convert backtick-quoted identifiers to double-quoted identifiers.
/// Backticks inside single-quoted string literals are left alone, and
/// already-double-quoted identifiers pass through unchanged, so the
/// rewrite is idempotent.
pub fn backticks_to_double_quotes(stmt: &str) -> String {
    let mut result = String::with_capacity(stmt.len());
    let mut in_string = false;
    let mut in_backtick = false;
    let mut escaped = false;

    for c in stmt.chars() {
        if escaped {
            escaped = false;
            result.push(c);
        } else if c == '\\' && in_string {
            escaped = true;
            result.push(c);
        } else if c == '\'' && !in_backtick {
            in_string = !in_string;
            result.push(c);
        } else if c == '`' && !in_string {
            in_backtick = !in_backtick;
            result.push('"');
        } else {
            result.push(c);
        }
    }
    result
}

/// Convert MySQL backslash-escaped quotes inside string literals to the
/// standard doubled form: `\'` becomes `''`. A literal already using `''`
/// is left unchanged, as are other backslash escapes.
pub fn escape_quotes(stmt: &str) -> String {
    let mut result = String::with_capacity(stmt.len());
    let mut chars = stmt.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if c == '\'' {
            in_string = !in_string;
            result.push(c);
        } else if c == '\\' && in_string {
            match chars.peek() {
                Some('\'') => {
                    chars.next();
                    result.push_str("''");
                }
                Some('\\') => {
                    chars.next();
                    result.push_str("\\\\");
                }
                _ => result.push(c),
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Reduce MySQL version-bracketed comments `/*!NNNNN ... */` to their
/// inner SQL, or drop them entirely when the payload is a session
/// directive (`SET ...`). Regular comments are kept as-is, and a comment
/// marker inside a string literal is data, not a comment. This pass runs
/// before `escape_quotes`, so literals here still use `\'` escapes.
pub fn strip_version_comments(stmt: &str) -> String {
    let mut result = String::with_capacity(stmt.len());
    let mut chars = stmt.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '\'' {
                in_string = false;
            }
        } else if c == '\'' {
            in_string = true;
            result.push(c);
        } else if c == '/' && chars.peek() == Some(&'*') {
            chars.next(); // consume *
            if chars.peek() == Some(&'!') {
                chars.next(); // consume !
                while chars.peek().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    chars.next();
                }
                // Capture payload until the matching */
                let mut inner = String::new();
                let mut depth = 1;
                while depth > 0 {
                    match chars.next() {
                        Some('*') if chars.peek() == Some(&'/') => {
                            chars.next();
                            depth -= 1;
                            if depth > 0 {
                                inner.push_str("*/");
                            }
                        }
                        Some('/') if chars.peek() == Some(&'*') => {
                            chars.next();
                            depth += 1;
                            inner.push_str("/*");
                        }
                        Some(ic) => inner.push(ic),
                        None => break,
                    }
                }
                let trimmed = inner.trim();
                if !trimmed.is_empty() && !is_directive(trimmed) {
                    result.push_str(trimmed);
                }
            } else {
                result.push('/');
                result.push('*');
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Payloads that only make sense on a MySQL session are dropped rather
/// than unwrapped.
fn is_directive(inner: &str) -> bool {
    let upper = inner.to_uppercase();
    upper.starts_with("SET ") || upper.starts_with("SET@")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backticks_to_double_quotes() {
        assert_eq!(backticks_to_double_quotes("`users`"), "\"users\"");
        assert_eq!(
            backticks_to_double_quotes("CREATE TABLE `t` (`id` int)"),
            "CREATE TABLE \"t\" (\"id\" int)"
        );
    }

    #[test]
    fn test_backticks_inside_string_preserved() {
        assert_eq!(
            backticks_to_double_quotes("'hello `world`'"),
            "'hello `world`'"
        );
    }

    #[test]
    fn test_backtick_rewrite_is_idempotent() {
        let once = backticks_to_double_quotes("CREATE TABLE `t` (`id` int)");
        assert_eq!(backticks_to_double_quotes(&once), once);
    }

    #[test]
    fn test_escaped_quote_then_backtick_in_string() {
        // The \' must not end the literal, so the backtick stays data
        assert_eq!(
            backticks_to_double_quotes(r"'it\'s a `tick`'"),
            r"'it\'s a `tick`'"
        );
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape_quotes(r"'It\'s working'"), "'It''s working'");
        assert_eq!(escape_quotes("'hello'"), "'hello'");
    }

    #[test]
    fn test_escape_quotes_leaves_doubled_quotes_alone() {
        assert_eq!(escape_quotes("'It''s working'"), "'It''s working'");
    }

    #[test]
    fn test_escape_quotes_preserves_double_backslash() {
        assert_eq!(escape_quotes(r"'a\\b'"), r"'a\\b'");
    }

    #[test]
    fn test_strip_version_comment_directive() {
        let input = "/*!40101 SET NAMES utf8 */;";
        assert_eq!(strip_version_comments(input).trim(), ";");
    }

    #[test]
    fn test_strip_version_comment_keeps_inner_sql() {
        let input = "CREATE DATABASE /*!32312 IF NOT EXISTS*/ \"mydb\";";
        let output = strip_version_comments(input);
        assert!(output.contains("IF NOT EXISTS"));
        assert!(!output.contains("/*!"));
    }

    #[test]
    fn test_version_comment_marker_inside_literal_is_data() {
        let input = "INSERT INTO t VALUES ('see /*!40101 hint */ here');";
        assert_eq!(strip_version_comments(input), input);
    }

    #[test]
    fn test_version_comment_after_escaped_quote_is_data() {
        let input = r"INSERT INTO t VALUES ('it\'s /*!40101 x */');";
        assert_eq!(strip_version_comments(input), input);
    }

    #[test]
    fn test_regular_comment_preserved() {
        let input = "/* keep me */ SELECT 1;";
        assert_eq!(strip_version_comments(input), input);
    }

    #[test]
    fn test_normalize_create_table_strips_options() {
        let input = "CREATE TABLE `t` (`id` int) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_general_ci;";
        let output = normalize_create_table(input);
        assert!(!output.contains("ENGINE"));
        assert!(!output.contains("AUTO_INCREMENT=42"));
        assert!(!output.contains("CHARSET"));
        assert!(!output.contains("COLLATE"));
        assert!(output.contains("CREATE TABLE \"t\""));
    }

    #[test]
    fn test_normalize_create_table_keeps_option_words_in_literals() {
        let input =
            "CREATE TABLE `t` (`v` varchar(10) COMMENT 'set ENGINE=x here') ENGINE=InnoDB;";
        let output = normalize_create_table(input);
        assert!(output.contains("'set ENGINE=x here'"));
        assert!(!output.contains("ENGINE=InnoDB"));
    }

    #[test]
    fn test_map_outside_literals_skips_literal_text() {
        let mapped = map_outside_literals("a 'a' a", |seg| seg.to_uppercase());
        assert_eq!(mapped, "A 'a' A");

        // Doubled quotes keep toggling correctly
        let mapped = map_outside_literals("x 'it''s x' x", |seg| seg.to_uppercase());
        assert_eq!(mapped, "X 'it''s x' X");
    }

    #[test]
    fn test_normalize_create_table_strips_column_charset() {
        let input = "CREATE TABLE `t` (`name` varchar(10) CHARACTER SET latin1 COLLATE latin1_bin NOT NULL);";
        let output = normalize_create_table(input);
        assert!(!output.contains("CHARACTER SET"));
        assert!(!output.contains("COLLATE"));
        assert!(output.contains("NOT NULL"));
    }
}
