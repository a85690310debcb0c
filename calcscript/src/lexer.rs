//! CalcScript tokenizer.
//!
//! Produces offset-carrying tokens; the parser never touches source text.
//! Comments (`//` and `/* */`) are skipped between tokens. The strict
//! spellings `===`/`!==` normalize to `==`/`!=` here so the parser only
//! knows one equality, but the token keeps its written text for error
//! messages.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Text(String),
    Ident(String),
    // keywords
    Let,
    In,
    True,
    False,
    Null,
    // operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Amp,
    AmpAmp,
    PipePipe,
    Bang,
    BangEq,
    EqEq,
    Eq,
    Arrow,
    Lt,
    Le,
    Gt,
    Ge,
    Question,
    QuestionQuestion,
    // punctuation
    Colon,
    Semi,
    Comma,
    Dot,
    Ellipsis,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

impl TokenKind {
    /// The kind's category word, for error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Number(_) => "number",
            TokenKind::Text(_) => "string",
            TokenKind::Ident(_) => "identifier",
            TokenKind::True | TokenKind::False => "boolean",
            TokenKind::Let | TokenKind::In | TokenKind::Null => "keyword",
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::StarStar
            | TokenKind::Slash
            | TokenKind::Amp
            | TokenKind::AmpAmp
            | TokenKind::PipePipe
            | TokenKind::Bang
            | TokenKind::BangEq
            | TokenKind::EqEq
            | TokenKind::Eq
            | TokenKind::Arrow
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::Question
            | TokenKind::QuestionQuestion => "operator",
            TokenKind::Colon
            | TokenKind::Semi
            | TokenKind::Comma
            | TokenKind::Dot
            | TokenKind::Ellipsis
            | TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBracket
            | TokenKind::RBracket
            | TokenKind::LBrace
            | TokenKind::RBrace => "punctuation",
            TokenKind::Eof => "end of input",
        }
    }
}

/// One lexed token: its kind, its source spelling, and its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("number literal '{text}' does not form a finite value (offset {offset})")]
    BadNumber { text: String, offset: usize },
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },
    #[error("unknown escape '\\{escape}' at offset {offset}")]
    BadEscape { escape: char, offset: usize },
    #[error("unterminated block comment starting at offset {offset}")]
    UnterminatedComment { offset: usize },
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnknownChar { ch: char, offset: usize },
}

impl LexError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            LexError::BadNumber { offset, .. }
            | LexError::UnterminatedString { offset }
            | LexError::BadEscape { offset, .. }
            | LexError::UnterminatedComment { offset }
            | LexError::UnknownChar { offset, .. } => *offset,
        }
    }
}

pub fn lex(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.src.len())
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Consume `n` chars and return the source slice they spanned.
    fn take(&mut self, n: usize) -> &'a str {
        let start = self.offset();
        for _ in 0..n {
            self.bump();
        }
        &self.src[start..self.offset()]
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let offset = self.offset();
            let c = match self.peek() {
                Some(c) => c,
                None => {
                    tokens.push(Token {
                        kind: TokenKind::Eof,
                        text: String::new(),
                        offset,
                    });
                    return Ok(tokens);
                }
            };

            let token = if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
                self.lex_number(offset)?
            } else if c == '"' || c == '\'' {
                self.lex_string(offset)?
            } else if c.is_ascii_alphabetic() || c == '_' {
                self.lex_word(offset)
            } else {
                self.lex_operator(offset)?
            };
            tokens.push(token);
        }
    }

    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.offset();
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(LexError::UnterminatedComment { offset: start })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn lex_number(&mut self, offset: usize) -> Result<Token, LexError> {
        let start = self.offset();
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        // exponent only when it is actually followed by digits
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut ahead = 1;
            if matches!(self.peek_at(ahead), Some('+') | Some('-')) {
                ahead += 1;
            }
            if self.peek_at(ahead).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..=ahead {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let text = &self.src[start..self.offset()];
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Token {
                kind: TokenKind::Number(value),
                text: text.to_string(),
                offset,
            }),
            _ => Err(LexError::BadNumber {
                text: text.to_string(),
                offset,
            }),
        }
    }

    fn lex_string(&mut self, offset: usize) -> Result<Token, LexError> {
        let quote = self.bump().unwrap_or('"');
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some('\\') => {
                    let escape_offset = self.offset();
                    match self.bump() {
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(other) => {
                            return Err(LexError::BadEscape {
                                escape: other,
                                offset: escape_offset,
                            })
                        }
                        None => return Err(LexError::UnterminatedString { offset }),
                    }
                }
                Some(c) => value.push(c),
                None => return Err(LexError::UnterminatedString { offset }),
            }
        }
        let text = self.src[offset..self.offset()].to_string();
        Ok(Token {
            kind: TokenKind::Text(value),
            text,
            offset,
        })
    }

    fn lex_word(&mut self, offset: usize) -> Token {
        let start = self.offset();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        let text = &self.src[start..self.offset()];
        let kind = match text {
            "let" => TokenKind::Let,
            "in" => TokenKind::In,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Ident(text.to_string()),
        };
        Token {
            kind,
            text: text.to_string(),
            offset,
        }
    }

    fn lex_operator(&mut self, offset: usize) -> Result<Token, LexError> {
        let c = self.peek().unwrap_or_default();
        let next = self.peek_at(1);
        let after = self.peek_at(2);
        let (kind, len) = match (c, next, after) {
            ('=', Some('='), Some('=')) => (TokenKind::EqEq, 3),
            ('!', Some('='), Some('=')) => (TokenKind::BangEq, 3),
            ('.', Some('.'), Some('.')) => (TokenKind::Ellipsis, 3),
            ('=', Some('='), _) => (TokenKind::EqEq, 2),
            ('=', Some('>'), _) => (TokenKind::Arrow, 2),
            ('!', Some('='), _) => (TokenKind::BangEq, 2),
            ('*', Some('*'), _) => (TokenKind::StarStar, 2),
            ('&', Some('&'), _) => (TokenKind::AmpAmp, 2),
            ('|', Some('|'), _) => (TokenKind::PipePipe, 2),
            ('?', Some('?'), _) => (TokenKind::QuestionQuestion, 2),
            ('<', Some('='), _) => (TokenKind::Le, 2),
            ('>', Some('='), _) => (TokenKind::Ge, 2),
            ('=', _, _) => (TokenKind::Eq, 1),
            ('!', _, _) => (TokenKind::Bang, 1),
            ('*', _, _) => (TokenKind::Star, 1),
            ('&', _, _) => (TokenKind::Amp, 1),
            ('?', _, _) => (TokenKind::Question, 1),
            ('<', _, _) => (TokenKind::Lt, 1),
            ('>', _, _) => (TokenKind::Gt, 1),
            ('+', _, _) => (TokenKind::Plus, 1),
            ('-', _, _) => (TokenKind::Minus, 1),
            ('/', _, _) => (TokenKind::Slash, 1),
            (':', _, _) => (TokenKind::Colon, 1),
            (';', _, _) => (TokenKind::Semi, 1),
            (',', _, _) => (TokenKind::Comma, 1),
            ('.', _, _) => (TokenKind::Dot, 1),
            ('(', _, _) => (TokenKind::LParen, 1),
            (')', _, _) => (TokenKind::RParen, 1),
            ('[', _, _) => (TokenKind::LBracket, 1),
            (']', _, _) => (TokenKind::RBracket, 1),
            ('{', _, _) => (TokenKind::LBrace, 1),
            ('}', _, _) => (TokenKind::RBrace, 1),
            _ => return Err(LexError::UnknownChar { ch: c, offset }),
        };
        let text = self.take(len).to_string();
        Ok(Token { kind, text, offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("12 1.5 .5 1e-3"),
            vec![
                TokenKind::Number(12.0),
                TokenKind::Number(1.5),
                TokenKind::Number(0.5),
                TokenKind::Number(0.001),
                TokenKind::Eof,
            ]
        );
        assert!(matches!(
            lex("1e999"),
            Err(LexError::BadNumber { ref text, .. }) if text == "1e999"
        ));
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#""a\"b" 'it\'s' "tab\there""#),
            vec![
                TokenKind::Text("a\"b".into()),
                TokenKind::Text("it's".into()),
                TokenKind::Text("tab\there".into()),
                TokenKind::Eof,
            ]
        );
        assert!(matches!(lex(r#""open"#), Err(LexError::UnterminatedString { .. })));
        assert!(matches!(
            lex(r#""bad\q""#),
            Err(LexError::BadEscape { escape: 'q', .. })
        ));
    }

    #[test]
    fn test_strict_equality_normalizes() {
        let tokens = lex("a === b !== c").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::EqEq);
        assert_eq!(tokens[1].text, "===");
        assert_eq!(tokens[3].kind, TokenKind::BangEq);
        assert_eq!(tokens[3].text, "!==");
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            kinds("a=>b ?? c ** ...d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Arrow,
                TokenKind::Ident("b".into()),
                TokenKind::QuestionQuestion,
                TokenKind::Ident("c".into()),
                TokenKind::StarStar,
                TokenKind::Ellipsis,
                TokenKind::Ident("d".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_trivia() {
        assert_eq!(
            kinds("1 // line\n + /* block\n spanning */ 2"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Plus,
                TokenKind::Number(2.0),
                TokenKind::Eof,
            ]
        );
        assert!(matches!(
            lex("/* open"),
            Err(LexError::UnterminatedComment { .. })
        ));
    }

    #[test]
    fn test_offsets_are_byte_positions() {
        let tokens = lex("ab + cd").unwrap();
        assert_eq!(tokens[0].offset, 0);
        assert_eq!(tokens[1].offset, 3);
        assert_eq!(tokens[2].offset, 5);
    }

    #[test]
    fn test_keywords_versus_identifiers() {
        assert_eq!(
            kinds("let letter null nullable in"),
            vec![
                TokenKind::Let,
                TokenKind::Ident("letter".into()),
                TokenKind::Null,
                TokenKind::Ident("nullable".into()),
                TokenKind::In,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character() {
        assert!(matches!(lex("1 @ 2"), Err(LexError::UnknownChar { ch: '@', .. })));
        assert!(matches!(lex("a | b"), Err(LexError::UnknownChar { ch: '|', .. })));
    }
}
