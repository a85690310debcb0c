//! Declaration extraction from calc-block source.
//!
//! Finds every top-level `const name = <text>;` span without parsing the
//! expression text, so one broken declaration cannot hide its siblings.
//! The scan honors strings, comments and bracket depth; a `;` inside a
//! string literal or a `let { }` binding list does not end the capture.

/// One extracted declaration. `source` is the raw expression text, which
/// may or may not parse; `line` is where the `const` keyword sits.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDecl {
    pub name: String,
    pub source: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractItem {
    Decl(RawDecl),
    /// A span that is not a well-formed declaration. The scan resumes at
    /// the next top-level `;` or `const`.
    Malformed { line: u32, message: String },
}

pub fn extract(source: &str) -> Vec<ExtractItem> {
    let mut scanner = Scanner::new(source);
    let mut items = Vec::new();
    loop {
        scanner.skip_trivia();
        let line = scanner.line;
        let c = match scanner.peek() {
            Some(c) => c,
            None => return items,
        };
        if !is_ident_start(c) {
            items.push(ExtractItem::Malformed {
                line,
                message: format!("unexpected character '{}' outside a declaration", c),
            });
            scanner.resync();
            continue;
        }
        let word = scanner.read_word();
        if word != "const" {
            items.push(ExtractItem::Malformed {
                line,
                message: format!("expected 'const', found '{}'", word),
            });
            scanner.resync();
            continue;
        }
        scanner.skip_trivia();
        if !scanner.peek().is_some_and(is_ident_start) {
            items.push(ExtractItem::Malformed {
                line: scanner.line,
                message: "expected a declaration name after 'const'".to_string(),
            });
            scanner.resync();
            continue;
        }
        let name = scanner.read_word();
        scanner.skip_trivia();
        if scanner.peek() != Some('=') {
            items.push(ExtractItem::Malformed {
                line: scanner.line,
                message: format!("expected '=' after 'const {}'", name),
            });
            scanner.resync();
            continue;
        }
        scanner.bump();
        match scanner.capture_expression() {
            Some(text) => items.push(ExtractItem::Decl(RawDecl {
                name,
                source: text.trim().to_string(),
                line,
            })),
            None => items.push(ExtractItem::Malformed {
                line,
                message: format!("declaration '{}' is missing its closing ';'", name),
            }),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
            }
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return,
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while self.peek().is_some_and(is_ident_continue) {
            word.push(self.bump().unwrap_or_default());
        }
        word
    }

    fn peek_word(&self) -> String {
        let mut i = self.pos;
        let mut word = String::new();
        while let Some(&c) = self.chars.get(i) {
            if !is_ident_continue(c) {
                break;
            }
            word.push(c);
            i += 1;
        }
        word
    }

    /// Everything up to the next `;` at bracket depth zero, the `;`
    /// consumed but excluded. None when the input ends first.
    fn capture_expression(&mut self) -> Option<String> {
        let mut out = String::new();
        let mut depth = 0i32;
        loop {
            let c = self.peek()?;
            match c {
                '"' | '\'' => self.copy_string(c, &mut out)?,
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        out.push(self.bump()?);
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    out.push(self.bump()?);
                    out.push(self.bump()?);
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                out.push(self.bump()?);
                                out.push(self.bump()?);
                                break;
                            }
                            (Some(_), _) => out.push(self.bump()?),
                            (None, _) => return None,
                        }
                    }
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    out.push(self.bump()?);
                }
                ')' | ']' | '}' => {
                    depth -= 1;
                    out.push(self.bump()?);
                }
                ';' if depth <= 0 => {
                    self.bump();
                    return Some(out);
                }
                _ => out.push(self.bump()?),
            }
        }
    }

    /// Copy a quoted string into `out`, honoring backslash escapes.
    fn copy_string(&mut self, quote: char, out: &mut String) -> Option<()> {
        out.push(self.bump()?);
        loop {
            let c = self.bump()?;
            out.push(c);
            if c == '\\' {
                out.push(self.bump()?);
            } else if c == quote {
                return Some(());
            }
        }
    }

    /// After a malformed span: consume up to and including the next
    /// top-level `;`, or stop in front of the next `const`.
    fn resync(&mut self) {
        let mut depth = 0i32;
        loop {
            let c = match self.peek() {
                Some(c) => c,
                None => return,
            };
            match c {
                '"' | '\'' => {
                    let mut sink = String::new();
                    if self.copy_string(c, &mut sink).is_none() {
                        return;
                    }
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_at(1)) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => return,
                        }
                    }
                }
                '(' | '[' | '{' => {
                    depth += 1;
                    self.bump();
                }
                ')' | ']' | '}' => {
                    depth -= 1;
                    self.bump();
                }
                ';' if depth <= 0 => {
                    self.bump();
                    return;
                }
                _ if depth <= 0 && is_ident_start(c) => {
                    if self.peek_word() == "const" {
                        return;
                    }
                    self.read_word();
                }
                _ => {
                    self.bump();
                }
            }
        }
    }
}
