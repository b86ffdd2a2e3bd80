//! Foreign-key extraction from CREATE TABLE statements.
//!
//! MySQL dumps declare foreign keys inline, which fails on replay when a
//! referenced table has not been created yet. Each `CONSTRAINT ... FOREIGN
//! KEY ... REFERENCES ...` item is cut out of the column list here and
//! re-emitted later as a deferred `ALTER TABLE ... ADD CONSTRAINT`.
//! Plain `KEY`/`INDEX` items are dropped as well since PostgreSQL has no
//! inline non-constraint index syntax.
//!
//! The column list is parsed with the shared scan tracker, never with a
//! whole-statement regex, so commas inside nested parens (composite keys,
//! type widths) and quotes inside literals cannot mis-split an item.

use crate::parser::scan::ScanTracker;
use once_cell::sync::Lazy;
use regex::Regex;

/// One extracted foreign key, field text preserved verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyConstraint {
    /// Owning table (unquoted name)
    pub table: String,
    /// Constraint name; MySQL dumps always name them, but an unnamed
    /// inline FOREIGN KEY is accepted too
    pub name: Option<String>,
    /// Local column list, verbatim inner text
    pub columns: String,
    /// Referenced table (unquoted name)
    pub referenced_table: String,
    /// Referenced column list, verbatim inner text
    pub referenced_columns: String,
    /// Trailing `ON DELETE ... / ON UPDATE ...` text, possibly empty
    pub actions: String,
}

impl ForeignKeyConstraint {
    /// Render the deferred form of this constraint.
    pub fn to_alter_table(&self) -> String {
        let mut stmt = format!("ALTER TABLE \"{}\" ADD ", self.table);
        if let Some(name) = &self.name {
            stmt.push_str(&format!("CONSTRAINT \"{}\" ", name));
        }
        stmt.push_str(&format!(
            "FOREIGN KEY ({}) REFERENCES \"{}\" ({})",
            self.columns, self.referenced_table, self.referenced_columns
        ));
        if !self.actions.is_empty() {
            stmt.push(' ');
            stmt.push_str(&self.actions);
        }
        stmt.push(';');
        stmt
    }
}

/// Insertion-ordered mapping from table name to its extracted
/// constraints. Iteration yields tables in first-appearance order and
/// constraints in discovery order, which is exactly the emission order of
/// the deferred ALTER TABLE block.
#[derive(Debug, Default)]
pub struct ForeignKeyMap {
    entries: Vec<(String, Vec<ForeignKeyConstraint>)>,
}

impl ForeignKeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fk: ForeignKeyConstraint) {
        if let Some((_, list)) = self.entries.iter_mut().find(|(t, _)| *t == fk.table) {
            list.push(fk);
        } else {
            self.entries.push((fk.table.clone(), vec![fk]));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForeignKeyConstraint> {
        self.entries.iter().flat_map(|(_, list)| list.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, list)| list.len()).sum()
    }
}

/// Result of cleaning one CREATE TABLE statement.
#[derive(Debug)]
pub struct ExtractOutcome {
    /// The statement with foreign keys and plain KEY items removed
    pub statement: String,
    /// Extracted constraints in discovery order
    pub constraints: Vec<ForeignKeyConstraint>,
    /// Items that looked like constraints but could not be parsed; left
    /// in place so nothing is silently dropped
    pub unrecognized: Vec<String>,
}

static FOREIGN_KEY_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^\s*(?:CONSTRAINT\s+"?([^"\s]+)"?\s+)?FOREIGN\s+KEY\s*\(([^)]*)\)\s*REFERENCES\s+"?([^"\s(]+)"?\s*\(([^)]*)\)\s*(.*?)\s*$"#,
    )
    .unwrap()
});

static UNIQUE_KEY_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)^\s*UNIQUE\s+(?:KEY|INDEX)\s+"?([^"\s(]+)"?\s*\((.*)\)\s*$"#).unwrap()
});

/// Extract foreign keys from a normalized, type-mapped CREATE TABLE
/// statement. `table` is the unquoted owning table name.
pub fn extract_foreign_keys(stmt: &str, table: &str) -> ExtractOutcome {
    let Some((open, close)) = table_body_span(stmt) else {
        // No parenthesized column list (e.g. CREATE TABLE ... LIKE ...)
        return ExtractOutcome {
            statement: stmt.to_string(),
            constraints: Vec::new(),
            unrecognized: Vec::new(),
        };
    };

    let head = &stmt[..=open];
    let body = &stmt[open + 1..close];
    let tail = &stmt[close..];

    let mut constraints = Vec::new();
    let mut unrecognized = Vec::new();
    let mut kept: Vec<String> = Vec::new();

    for item in split_body_items(body) {
        match classify_item(&item) {
            ItemKind::ForeignKey => {
                if let Some(fk) = parse_foreign_key_item(&item, table) {
                    constraints.push(fk);
                } else {
                    unrecognized.push(preview(&item));
                    kept.push(item);
                }
            }
            ItemKind::PlainKey => {}
            ItemKind::UniqueKey => match rewrite_unique_key(&item) {
                Some(rewritten) => kept.push(rewritten),
                None => {
                    unrecognized.push(preview(&item));
                    kept.push(item);
                }
            },
            ItemKind::Column => kept.push(item),
        }
    }

    // Rejoining with a single comma per retained item repairs any commas
    // dangling from removed neighbors
    let statement = format!("{}{}{}", head, kept.join(","), tail);

    ExtractOutcome {
        statement,
        constraints,
        unrecognized,
    }
}

/// Locate the column-list body: the span between the first top-level `(`
/// and its matching `)`. Returns byte offsets of both parens. `None` when
/// the list is missing or never closed.
fn table_body_span(stmt: &str) -> Option<(usize, usize)> {
    let mut tracker = ScanTracker::new();
    let mut open = None;

    for (i, &b) in stmt.as_bytes().iter().enumerate() {
        let depth_before = tracker.depth();
        tracker.advance(b);
        if b == b'(' && depth_before == 0 && tracker.depth() == 1 && open.is_none() {
            open = Some(i);
        }
        if b == b')' && tracker.depth() == 0 {
            if let Some(o) = open {
                return Some((o, i));
            }
        }
    }

    None
}

/// Split the body at depth-zero commas (depth relative to the body).
/// Items keep their original leading/trailing whitespace so the rebuilt
/// statement preserves the dump's layout.
fn split_body_items(body: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut tracker = ScanTracker::new();

    for c in body.chars() {
        let mut buf = [0u8; 4];
        let mut top_level_comma = false;
        for &b in c.encode_utf8(&mut buf).as_bytes() {
            tracker.advance(b);
            if b == b',' && tracker.depth() == 0 && tracker.is_balanced() {
                top_level_comma = true;
            }
        }
        if top_level_comma {
            items.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }

    if !current.trim().is_empty() {
        items.push(current);
    }

    items
}

enum ItemKind {
    Column,
    ForeignKey,
    PlainKey,
    UniqueKey,
}

fn classify_item(item: &str) -> ItemKind {
    let upper = item.trim().to_uppercase();

    if upper.starts_with("FOREIGN KEY")
        || (upper.starts_with("CONSTRAINT") && upper.contains("FOREIGN KEY"))
    {
        ItemKind::ForeignKey
    } else if upper.starts_with("UNIQUE KEY") || upper.starts_with("UNIQUE INDEX") {
        ItemKind::UniqueKey
    } else if upper.starts_with("KEY ")
        || upper.starts_with("KEY\"")
        || upper.starts_with("INDEX ")
        || upper.starts_with("FULLTEXT ")
        || upper.starts_with("SPATIAL ")
    {
        ItemKind::PlainKey
    } else {
        ItemKind::Column
    }
}

fn parse_foreign_key_item(item: &str, table: &str) -> Option<ForeignKeyConstraint> {
    let caps = FOREIGN_KEY_ITEM_RE.captures(item)?;

    Some(ForeignKeyConstraint {
        table: table.to_string(),
        name: caps.get(1).map(|m| m.as_str().to_string()),
        columns: caps.get(2)?.as_str().trim().to_string(),
        referenced_table: caps.get(3)?.as_str().to_string(),
        referenced_columns: caps.get(4)?.as_str().trim().to_string(),
        actions: caps.get(5).map(|m| m.as_str().trim()).unwrap_or("").to_string(),
    })
}

/// MySQL `UNIQUE KEY "name" (cols)` becomes the standard constraint form.
fn rewrite_unique_key(item: &str) -> Option<String> {
    let caps = UNIQUE_KEY_ITEM_RE.captures(item)?;
    let indent: String = item.chars().take_while(|c| c.is_whitespace()).collect();
    Some(format!(
        "{}CONSTRAINT \"{}\" UNIQUE ({})",
        indent,
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str().trim()
    ))
}

fn preview(item: &str) -> String {
    item.trim().chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_top_level_commas(body: &str) -> usize {
        let mut tracker = ScanTracker::new();
        body.bytes()
            .filter(|&b| {
                tracker.advance(b);
                b == b',' && tracker.depth() == 0 && tracker.is_balanced()
            })
            .count()
    }

    #[test]
    fn test_extract_single_foreign_key() {
        let stmt = "CREATE TABLE \"users\" (\n  \"id\" SERIAL,\n  \"aid\" INTEGER,\n  CONSTRAINT \"fk\" FOREIGN KEY (\"aid\") REFERENCES \"assoc\" (\"id\")\n);";
        let outcome = extract_foreign_keys(stmt, "users");

        assert_eq!(outcome.constraints.len(), 1);
        let fk = &outcome.constraints[0];
        assert_eq!(fk.table, "users");
        assert_eq!(fk.name.as_deref(), Some("fk"));
        assert_eq!(fk.columns, "\"aid\"");
        assert_eq!(fk.referenced_table, "assoc");
        assert_eq!(fk.referenced_columns, "\"id\"");
        assert!(fk.actions.is_empty());

        assert!(!outcome.statement.contains("FOREIGN KEY"));
        assert!(outcome.statement.contains("\"aid\" INTEGER"));
    }

    #[test]
    fn test_alter_table_rendering() {
        let fk = ForeignKeyConstraint {
            table: "users".to_string(),
            name: Some("fk".to_string()),
            columns: "\"aid\"".to_string(),
            referenced_table: "assoc".to_string(),
            referenced_columns: "\"id\"".to_string(),
            actions: String::new(),
        };
        assert_eq!(
            fk.to_alter_table(),
            "ALTER TABLE \"users\" ADD CONSTRAINT \"fk\" FOREIGN KEY (\"aid\") REFERENCES \"assoc\" (\"id\");"
        );
    }

    #[test]
    fn test_on_delete_actions_preserved_verbatim() {
        let stmt = "CREATE TABLE \"orders\" (\n  \"id\" SERIAL,\n  \"uid\" INTEGER,\n  CONSTRAINT \"fk_u\" FOREIGN KEY (\"uid\") REFERENCES \"users\" (\"id\") ON DELETE CASCADE ON UPDATE SET NULL\n);";
        let outcome = extract_foreign_keys(stmt, "orders");

        assert_eq!(outcome.constraints.len(), 1);
        assert_eq!(
            outcome.constraints[0].actions,
            "ON DELETE CASCADE ON UPDATE SET NULL"
        );
        assert!(outcome.constraints[0]
            .to_alter_table()
            .ends_with("ON DELETE CASCADE ON UPDATE SET NULL;"));
    }

    #[test]
    fn test_composite_key_commas_not_missplit() {
        let stmt = "CREATE TABLE \"m\" (\n  \"a\" INTEGER,\n  \"b\" INTEGER,\n  CONSTRAINT \"fk_ab\" FOREIGN KEY (\"a\", \"b\") REFERENCES \"p\" (\"x\", \"y\")\n);";
        let outcome = extract_foreign_keys(stmt, "m");

        assert_eq!(outcome.constraints.len(), 1);
        assert_eq!(outcome.constraints[0].columns, "\"a\", \"b\"");
        assert_eq!(outcome.constraints[0].referenced_columns, "\"x\", \"y\"");
    }

    #[test]
    fn test_plain_key_items_removed() {
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  \"email\" VARCHAR(100),\n  KEY \"idx_email\" (\"email\")\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        assert!(!outcome.statement.contains("idx_email"));
        assert!(outcome.statement.contains("\"email\" VARCHAR(100)"));
        assert!(outcome.constraints.is_empty());
    }

    #[test]
    fn test_unique_key_rewritten_as_constraint() {
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  \"email\" VARCHAR(100),\n  UNIQUE KEY \"uq_email\" (\"email\")\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        assert!(outcome
            .statement
            .contains("CONSTRAINT \"uq_email\" UNIQUE (\"email\")"));
        assert!(!outcome.statement.contains("UNIQUE KEY"));
    }

    #[test]
    fn test_no_dangling_comma_when_last_item_removed() {
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  \"uid\" INTEGER,\n  CONSTRAINT \"fk\" FOREIGN KEY (\"uid\") REFERENCES \"u\" (\"id\")\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        let (open, close) = table_body_span(&outcome.statement).unwrap();
        let body = &outcome.statement[open + 1..close];
        let items = split_body_items(body).len();
        assert_eq!(items, 2);
        assert_eq!(count_top_level_commas(body), items - 1);
    }

    #[test]
    fn test_middle_removal_rejoined_with_single_comma() {
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  KEY \"i\" (\"id\"),\n  \"name\" VARCHAR(10)\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        let (open, close) = table_body_span(&outcome.statement).unwrap();
        let body = &outcome.statement[open + 1..close];
        assert_eq!(count_top_level_commas(body), 1);
        assert!(!body.contains(",,"));
    }

    #[test]
    fn test_self_reference_extracted_like_any_other() {
        let stmt = "CREATE TABLE \"emp\" (\n  \"id\" SERIAL,\n  \"manager\" INTEGER,\n  CONSTRAINT \"fk_mgr\" FOREIGN KEY (\"manager\") REFERENCES \"emp\" (\"id\")\n);";
        let outcome = extract_foreign_keys(stmt, "emp");

        assert_eq!(outcome.constraints.len(), 1);
        assert_eq!(outcome.constraints[0].referenced_table, "emp");
    }

    #[test]
    fn test_no_foreign_keys_yields_none() {
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  PRIMARY KEY (\"id\")\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        assert!(outcome.constraints.is_empty());
        assert!(outcome.statement.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn test_malformed_constraint_left_in_place() {
        // REFERENCES clause missing its column list: not confidently
        // parseable, so the item stays put and is reported
        let stmt = "CREATE TABLE \"t\" (\n  \"id\" SERIAL,\n  CONSTRAINT \"fk\" FOREIGN KEY (\"id\") REFERENCES\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        assert!(outcome.constraints.is_empty());
        assert_eq!(outcome.unrecognized.len(), 1);
        assert!(outcome.statement.contains("FOREIGN KEY"));
    }

    #[test]
    fn test_comma_inside_default_literal_not_split() {
        let stmt = "CREATE TABLE \"t\" (\n  \"a\" VARCHAR(10) DEFAULT 'x,y',\n  \"b\" INTEGER\n);";
        let outcome = extract_foreign_keys(stmt, "t");

        assert!(outcome.statement.contains("'x,y'"));
        let (open, close) = table_body_span(&outcome.statement).unwrap();
        let body = &outcome.statement[open + 1..close];
        assert_eq!(count_top_level_commas(body), 1);
    }

    #[test]
    fn test_foreign_key_map_preserves_appearance_order() {
        let mut map = ForeignKeyMap::new();
        let fk = |table: &str, name: &str| ForeignKeyConstraint {
            table: table.to_string(),
            name: Some(name.to_string()),
            columns: "\"c\"".to_string(),
            referenced_table: "r".to_string(),
            referenced_columns: "\"id\"".to_string(),
            actions: String::new(),
        };
        map.push(fk("b", "fk1"));
        map.push(fk("a", "fk2"));
        map.push(fk("b", "fk3"));

        let names: Vec<_> = map.iter().map(|f| f.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["fk1", "fk3", "fk2"]);
        assert_eq!(map.len(), 3);
    }
}
