//! MySQL → PostgreSQL data type mapping.
//!
//! A fixed lookup table applied to CREATE TABLE statements. Matching is
//! case-insensitive and longest-prefix-wins (`DOUBLE PRECISION` is never
//! re-split into `DOUBLE`), and the whole mapping is stable under
//! repetition: applying it to already-converted output is a no-op.

use super::normalize::map_outside_literals;
use once_cell::sync::Lazy;
use regex::Regex;

/// Type mapper for MySQL → PostgreSQL column types
pub struct TypeMapper;

impl TypeMapper {
    /// Convert all data types in a statement. Only text outside string
    /// literals is rewritten; a type word inside a `DEFAULT '...'` or
    /// `COMMENT '...'` value is data and stays as-is.
    pub fn convert(stmt: &str) -> String {
        map_outside_literals(stmt, convert_segment)
    }
}

fn convert_segment(segment: &str) -> String {
    let mut result = segment.to_string();

    // AUTO_INCREMENT columns become SERIAL pseudo-types. SERIAL
    // already implies the integer type and NOT NULL, so the column's
    // own type token and a preceding NOT NULL are folded in.
    result = RE_BIGINT_AUTOINC.replace_all(&result, "BIGSERIAL").to_string();
    result = RE_SMALLINT_AUTOINC
        .replace_all(&result, "SMALLSERIAL")
        .to_string();
    result = RE_INT_AUTOINC.replace_all(&result, "SERIAL").to_string();
    result = RE_AUTOINC_LEFTOVER.replace_all(&result, "").to_string();

    // tinyint(1) is MySQL's boolean; any other width is a small int.
    // The width argument alone decides, nothing else.
    result = RE_TINYINT_BOOL.replace_all(&result, "BOOLEAN").to_string();
    result = RE_TINYINT.replace_all(&result, "SMALLINT").to_string();

    // Integer display widths are dropped, PostgreSQL has none
    result = RE_MEDIUMINT.replace_all(&result, "INTEGER").to_string();
    result = RE_BIGINT.replace_all(&result, "BIGINT").to_string();
    result = RE_SMALLINT.replace_all(&result, "SMALLINT").to_string();
    result = RE_INT.replace_all(&result, "INTEGER").to_string();

    result = RE_DOUBLE.replace_all(&result, "DOUBLE PRECISION").to_string();

    result = RE_DATETIME.replace_all(&result, "TIMESTAMP").to_string();

    result = RE_LONGTEXT.replace_all(&result, "TEXT").to_string();
    result = RE_MEDIUMTEXT.replace_all(&result, "TEXT").to_string();
    result = RE_TINYTEXT.replace_all(&result, "TEXT").to_string();

    result = RE_VARCHAR.replace_all(&result, "VARCHAR").to_string();

    // ON UPDATE CURRENT_TIMESTAMP has no PostgreSQL equivalent and is
    // removed before the default itself is rewritten
    result = RE_ON_UPDATE_CURRENT_TS.replace_all(&result, "").to_string();
    result = RE_DEFAULT_CURRENT_TS
        .replace_all(&result, "DEFAULT NOW()")
        .to_string();

    result
}

// AUTO_INCREMENT column patterns. NOT NULL before the keyword is folded
// into the SERIAL replacement.
static RE_BIGINT_AUTOINC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBIGINT\b\s*(\(\s*\d+\s*\))?(\s+NOT\s+NULL)?\s+AUTO_INCREMENT\b").unwrap()
});
static RE_SMALLINT_AUTOINC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:SMALLINT|TINYINT)\b\s*(\(\s*\d+\s*\))?(\s+NOT\s+NULL)?\s+AUTO_INCREMENT\b",
    )
    .unwrap()
});
static RE_INT_AUTOINC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:MEDIUMINT|INTEGER|INT)\b\s*(\(\s*\d+\s*\))?(\s+NOT\s+NULL)?\s+AUTO_INCREMENT\b",
    )
    .unwrap()
});
static RE_AUTOINC_LEFTOVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+AUTO_INCREMENT\b").unwrap());

static RE_TINYINT_BOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTINYINT\s*\(\s*1\s*\)").unwrap());
static RE_TINYINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bTINYINT\b\s*(\(\s*\d+\s*\))?").unwrap());
static RE_SMALLINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bSMALLINT\b\s*(\(\s*\d+\s*\))?").unwrap());
static RE_MEDIUMINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bMEDIUMINT\b\s*(\(\s*\d+\s*\))?").unwrap());
static RE_BIGINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBIGINT\b\s*(\(\s*\d+\s*\))?").unwrap());
static RE_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bINT\b\s*(\(\s*\d+\s*\))?").unwrap());

static RE_DOUBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDOUBLE\b(\s+PRECISION\b)?").unwrap());

static RE_DATETIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bDATETIME\b\s*(\(\s*\d+\s*\))?").unwrap());

static RE_LONGTEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLONGTEXT\b").unwrap());
static RE_MEDIUMTEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bMEDIUMTEXT\b").unwrap());
static RE_TINYTEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bTINYTEXT\b").unwrap());

static RE_VARCHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bVARCHAR\b").unwrap());

static RE_ON_UPDATE_CURRENT_TS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+ON\s+UPDATE\s+CURRENT_TIMESTAMP(\s*\(\s*\d*\s*\))?").unwrap()
});
static RE_DEFAULT_CURRENT_TS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDEFAULT\s+CURRENT_TIMESTAMP\b(\s*\(\s*\d*\s*\))?").unwrap()
});
