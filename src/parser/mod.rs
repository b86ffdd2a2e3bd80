//! Streaming statement scanner for MySQL dump files.
//!
//! Splits the dump into statements at semicolons that sit at parenthesis
//! depth zero, outside string literals and block comments, then classifies
//! each statement well enough for the conversion pipeline to route it.

pub mod scan;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use scan::ScanTracker;
use std::io::{BufRead, BufReader, Read};

pub const SMALL_BUFFER_SIZE: usize = 64 * 1024;
pub const MEDIUM_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Unknown,
    CreateTable,
    Insert,
    /// `LOCK TABLES ... WRITE` — dropped, PostgreSQL locking differs.
    LockTables,
    /// `UNLOCK TABLES` — dropped.
    UnlockTables,
    /// `ALTER TABLE ... DISABLE|ENABLE KEYS` — dropped, MySQL-only.
    AlterKeys,
    /// `SET @OLD_...` / `SET @saved_...` session save/restore — dropped.
    SessionSet,
}

static CREATE_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*CREATE\s+TABLE\s+[`"]?([^\s`"(]+)[`"]?"#).unwrap());

static INSERT_INTO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)^\s*INSERT\s+INTO\s+[`"]?([^\s`"(]+)[`"]?"#).unwrap());

static ALTER_KEYS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*ALTER\s+TABLE\s+\S+\s+(?:DISABLE|ENABLE)\s+KEYS").unwrap()
});

static SESSION_SET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*SET\s+@(?:OLD_|saved_)").unwrap());

pub struct Parser<R: Read> {
    reader: BufReader<R>,
    stmt_buffer: Vec<u8>,
    line: u64,
    stmt_line: u64,
    unbalanced_at_eof: bool,
}

impl<R: Read> Parser<R> {
    pub fn new(reader: R, buffer_size: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_size, reader),
            stmt_buffer: Vec::with_capacity(32 * 1024),
            line: 1,
            stmt_line: 1,
            unbalanced_at_eof: false,
        }
    }

    /// Read the next statement, including its terminator. At EOF with a
    /// non-empty remainder (unterminated literal, unmatched paren, or just
    /// a missing final `;`) the remainder is returned as one last
    /// statement and `unbalanced_at_eof()` reports whether the lexical
    /// state was left open.
    pub fn read_statement(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        self.stmt_buffer.clear();
        self.stmt_line = self.line;

        let mut tracker = ScanTracker::new();

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                // Trailing whitespace after the last terminator is not a
                // statement
                if self.stmt_buffer.iter().all(|&b| is_whitespace(b)) {
                    return Ok(None);
                }
                if !tracker.is_balanced() {
                    self.unbalanced_at_eof = true;
                }
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(result));
            }

            let mut consumed = 0;
            let mut found_terminator = false;

            for (i, &b) in buf.iter().enumerate() {
                if b == b'\n' {
                    self.line += 1;
                }
                if tracker.advance(b) {
                    self.stmt_buffer.extend_from_slice(&buf[..=i]);
                    consumed = i + 1;
                    found_terminator = true;
                    break;
                }
            }

            if found_terminator {
                self.reader.consume(consumed);
                let result = std::mem::take(&mut self.stmt_buffer);
                return Ok(Some(result));
            }

            self.stmt_buffer.extend_from_slice(buf);
            let len = buf.len();
            self.reader.consume(len);
        }
    }

    /// Source line on which the most recently returned statement began.
    pub fn statement_line(&self) -> u64 {
        self.stmt_line
    }

    /// True once a statement was cut short by EOF while a literal or
    /// paren group was still open.
    pub fn unbalanced_at_eof(&self) -> bool {
        self.unbalanced_at_eof
    }

    /// Classify a statement and extract the table name where applicable.
    pub fn parse_statement(stmt: &[u8]) -> (StatementType, String) {
        let stmt = trim_ascii_start(stmt);

        if stmt.len() < 6 {
            return (StatementType::Unknown, String::new());
        }

        let upper_prefix: Vec<u8> = stmt
            .iter()
            .take(20)
            .map(|b| b.to_ascii_uppercase())
            .collect();

        if upper_prefix.starts_with(b"CREATE TABLE") {
            if let Some(name) = extract_table_name(stmt, 12) {
                return (StatementType::CreateTable, name);
            }
            if let Some(caps) = CREATE_TABLE_RE.captures(stmt) {
                if let Some(m) = caps.get(1) {
                    return (
                        StatementType::CreateTable,
                        String::from_utf8_lossy(m.as_bytes()).into_owned(),
                    );
                }
            }
        }

        if upper_prefix.starts_with(b"INSERT INTO") {
            if let Some(name) = extract_table_name(stmt, 11) {
                return (StatementType::Insert, name);
            }
            if let Some(caps) = INSERT_INTO_RE.captures(stmt) {
                if let Some(m) = caps.get(1) {
                    return (
                        StatementType::Insert,
                        String::from_utf8_lossy(m.as_bytes()).into_owned(),
                    );
                }
            }
        }

        if upper_prefix.starts_with(b"LOCK TABLES") {
            return (StatementType::LockTables, String::new());
        }

        if upper_prefix.starts_with(b"UNLOCK TABLES") {
            return (StatementType::UnlockTables, String::new());
        }

        if upper_prefix.starts_with(b"ALTER TABLE") && ALTER_KEYS_RE.is_match(stmt) {
            return (StatementType::AlterKeys, String::new());
        }

        if upper_prefix.starts_with(b"SET @") && SESSION_SET_RE.is_match(stmt) {
            return (StatementType::SessionSet, String::new());
        }

        (StatementType::Unknown, String::new())
    }
}

#[inline]
fn trim_ascii_start(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|&b| !matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
        .unwrap_or(data.len());
    &data[start..]
}

#[inline]
fn extract_table_name(stmt: &[u8], offset: usize) -> Option<String> {
    let mut i = offset;

    while i < stmt.len() && is_whitespace(stmt[i]) {
        i += 1;
    }

    if i >= stmt.len() {
        return None;
    }

    let quote_char = if stmt[i] == b'`' || stmt[i] == b'"' {
        let q = stmt[i];
        i += 1;
        Some(q)
    } else {
        None
    };

    let start = i;

    while i < stmt.len() {
        let b = stmt[i];
        if let Some(q) = quote_char {
            if b == q {
                let name = &stmt[start..i];
                return Some(String::from_utf8_lossy(name).into_owned());
            }
        } else if is_whitespace(b) || b == b'(' || b == b';' || b == b',' {
            if i > start {
                let name = &stmt[start..i];
                return Some(String::from_utf8_lossy(name).into_owned());
            }
            return None;
        }
        i += 1;
    }

    if quote_char.is_none() && i > start {
        let name = &stmt[start..i];
        return Some(String::from_utf8_lossy(name).into_owned());
    }

    None
}

#[inline]
fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

pub fn determine_buffer_size(file_size: u64) -> usize {
    if file_size > 1024 * 1024 * 1024 {
        MEDIUM_BUFFER_SIZE
    } else {
        SMALL_BUFFER_SIZE
    }
}
