//! Shared lexical scan state for SQL dump text.
//!
//! Both the statement scanner and the foreign-key extractor need to know
//! whether a byte sits inside a single-quoted string literal, inside a
//! block comment, or in plain SQL, and how deep the current parenthesis
//! nesting is. Keeping that logic in one state machine avoids two
//! slightly different (and eventually divergent) trackers.

/// Lexical context of the current scan position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Normal,
    InSingleQuoteLiteral,
    InBlockComment,
}

/// Byte-at-a-time tracker for quote, comment, and parenthesis state.
///
/// Inside a literal, both `\'` and `''` are treated as escapes: the
/// backslash form sets a one-byte skip, and the doubled form toggles out
/// and immediately back in on the adjacent quote, so neither closes the
/// literal across a terminator check.
#[derive(Debug, Default)]
pub struct ScanTracker {
    state: ScanState,
    depth: i32,
    escaped: bool,
    prev: u8,
}

impl ScanTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance over one byte. Returns `true` when the byte is a `;` that
    /// terminates a statement: paren depth zero, outside literals and
    /// block comments.
    pub fn advance(&mut self, b: u8) -> bool {
        match self.state {
            ScanState::Normal => {
                if self.prev == b'/' && b == b'*' {
                    self.state = ScanState::InBlockComment;
                    self.prev = 0;
                    return false;
                }
                match b {
                    b'\'' => self.state = ScanState::InSingleQuoteLiteral,
                    b'(' => self.depth += 1,
                    b')' => self.depth -= 1,
                    b';' if self.depth == 0 => {
                        self.prev = b;
                        return true;
                    }
                    _ => {}
                }
                self.prev = b;
                false
            }
            ScanState::InSingleQuoteLiteral => {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'\'' {
                    self.state = ScanState::Normal;
                }
                self.prev = b;
                false
            }
            ScanState::InBlockComment => {
                if self.prev == b'*' && b == b'/' {
                    self.state = ScanState::Normal;
                    self.prev = 0;
                } else {
                    self.prev = b;
                }
                false
            }
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// True when the tracker ended in plain SQL with matched parens,
    /// i.e. the input was lexically complete.
    pub fn is_balanced(&self) -> bool {
        self.state == ScanState::Normal && self.depth == 0
    }
}
