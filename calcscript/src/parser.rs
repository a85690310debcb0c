//! Recursive-descent expression parser.
//!
//! One `parse_*` method per precedence level, loosest first. `let` and the
//! conditional sit at the top; postfix member/index/call chains bind
//! tightest. Parenthesized parameter lists are told apart from grouped
//! expressions by scanning ahead to the matching `)` and checking for `=>`.

use thiserror::Error;

use crate::ast::{BinOp, Expr, FieldBinding, ObjectEntry, Param, UnOp};
use crate::lexer::{lex, LexError, Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected token `{text}` ({kind}) at offset {offset}")]
    UnexpectedToken {
        text: String,
        kind: &'static str,
        offset: usize,
    },
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEnd { offset: usize },
    #[error("unexpected trailing token `{text}` ({kind}) at offset {offset}")]
    TrailingToken {
        text: String,
        kind: &'static str,
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lex(err) => err.offset(),
            ParseError::UnexpectedToken { offset, .. }
            | ParseError::UnexpectedEnd { offset }
            | ParseError::TrailingToken { offset, .. } => *offset,
        }
    }
}

/// Parse one complete expression; extra input after it is an error.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = lex(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expression()?;
    let rest = &parser.tokens[parser.pos];
    if !matches!(rest.kind, TokenKind::Eof) {
        return Err(ParseError::TrailingToken {
            text: rest.text.clone(),
            kind: rest.kind.describe(),
            offset: rest.offset,
        });
    }
    Ok(expr)
}

fn binary(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, ahead: usize) -> &TokenKind {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i].kind
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.peek() {
            let name = name.clone();
            self.bump();
            Ok(name)
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ParseError {
        let token = &self.tokens[self.pos];
        match token.kind {
            TokenKind::Eof => ParseError::UnexpectedEnd {
                offset: token.offset,
            },
            _ => ParseError::UnexpectedToken {
                text: token.text.clone(),
                kind: token.kind.describe(),
                offset: token.offset,
            },
        }
    }

    // expression = let-expr | conditional
    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), TokenKind::Let) {
            return self.parse_let();
        }
        self.parse_conditional()
    }

    // let-expr = 'let' '{' (ident '=' expression ';')* '}' 'in' expression
    fn parse_let(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        self.expect(&TokenKind::LBrace)?;
        let mut bindings = Vec::new();
        while !matches!(self.peek(), TokenKind::RBrace) {
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Eq)?;
            let value = self.parse_expression()?;
            self.expect(&TokenKind::Semi)?;
            bindings.push((name, value));
        }
        self.bump();
        self.expect(&TokenKind::In)?;
        let body = self.parse_expression()?;
        Ok(Expr::Let {
            bindings,
            body: Box::new(body),
        })
    }

    // conditional = coalesce ('?' expression ':' expression)?
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let cond = self.parse_coalesce()?;
        if !self.eat(&TokenKind::Question) {
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect(&TokenKind::Colon)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    // coalesce = or ('??' or)*
    fn parse_coalesce(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            left = binary(BinOp::Coalesce, left, right);
        }
        Ok(left)
    }

    // or = and ('||' and)*
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::PipePipe) {
            let right = self.parse_and()?;
            left = binary(BinOp::Or, left, right);
        }
        Ok(left)
    }

    // and = equality ('&&' equality)*
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::AmpAmp) {
            let right = self.parse_equality()?;
            left = binary(BinOp::And, left, right);
        }
        Ok(left)
    }

    // equality = relational (('==' | '!=') relational)*
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::Ne,
                _ => break,
            };
            self.bump();
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // relational = concat (('<' | '<=' | '>' | '>=') concat)*
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            self.bump();
            let right = self.parse_concat()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // concat = additive ('&' additive)*
    fn parse_concat(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        while self.eat(&TokenKind::Amp) {
            let right = self.parse_additive()?;
            left = binary(BinOp::Concat, left, right);
        }
        Ok(left)
    }

    // additive = multiplicative (('+' | '-') multiplicative)*
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // multiplicative = power (('*' | '/') power)*
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.bump();
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    // power = unary ('**' power)?  (right associative)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_unary()?;
        if self.eat(&TokenKind::StarStar) {
            let right = self.parse_power()?;
            return Ok(binary(BinOp::Pow, left, right));
        }
        Ok(left)
    }

    // unary = ('!' | '-') unary | postfix
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Bang => UnOp::Not,
            TokenKind::Minus => UnOp::Neg,
            _ => return self.parse_postfix(),
        };
        self.bump();
        let expr = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    // postfix = primary ('.' ident | '[' expression ']' | '(' args ')')*
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let field = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        field,
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen => {
                    self.bump();
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    // args = (expression (',' expression)*)?  then ')'
    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    // primary = literal | identifier | arrow-fn | '(' expression ')'
    //         | array-literal | object-literal
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().clone() {
            TokenKind::Number(n) => {
                self.bump();
                Ok(Expr::Number(n))
            }
            TokenKind::Text(s) => {
                self.bump();
                Ok(Expr::Text(s))
            }
            TokenKind::True => {
                self.bump();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.bump();
                Ok(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.bump();
                Ok(Expr::Null)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek_at(1), TokenKind::Arrow) {
                    self.bump();
                    self.bump();
                    let body = self.parse_expression()?;
                    return Ok(Expr::Lambda {
                        params: vec![Param::Name(name)],
                        body: Box::new(body),
                    });
                }
                self.bump();
                Ok(Expr::Ident(name))
            }
            TokenKind::LParen => {
                if self.paren_is_parameter_list() {
                    return self.parse_lambda();
                }
                self.bump();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            _ => Err(self.unexpected()),
        }
    }

    /// Looking at `(`: is this a parameter list? Scan to the matching `)`
    /// and check whether `=>` follows it.
    fn paren_is_parameter_list(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::Arrow)
                        );
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    // lambda = '(' (param (',' param)*)? ')' '=>' expression
    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        let mut params = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                params.push(self.parse_param()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        self.expect(&TokenKind::Arrow)?;
        let body = self.parse_expression()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    // param = ident | '{' ident (':' ident)? (',' ident (':' ident)?)* '}'
    fn parse_param(&mut self) -> Result<Param, ParseError> {
        if !matches!(self.peek(), TokenKind::LBrace) {
            return Ok(Param::Name(self.expect_ident()?));
        }
        self.bump();
        let mut fields = Vec::new();
        loop {
            let key = self.expect_ident()?;
            let binding = if self.eat(&TokenKind::Colon) {
                self.expect_ident()?
            } else {
                key.clone()
            };
            fields.push(FieldBinding { key, binding });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Param::Destructure(fields))
    }

    // array-literal = '[' (expression (',' expression)*)? ']'
    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        let mut items = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::Array(items));
        }
        loop {
            items.push(self.parse_expression()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;
        Ok(Expr::Array(items))
    }

    // object-literal = '{' (entry (',' entry)*)? '}'
    // entry = (ident | string) ':' expression | '...' expression
    fn parse_object(&mut self) -> Result<Expr, ParseError> {
        self.bump();
        let mut entries = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::Object(entries));
        }
        loop {
            if self.eat(&TokenKind::Ellipsis) {
                entries.push(ObjectEntry::Spread(self.parse_expression()?));
            } else {
                let key = match self.peek().clone() {
                    TokenKind::Ident(name) => {
                        self.bump();
                        name
                    }
                    TokenKind::Text(s) => {
                        self.bump();
                        s
                    }
                    _ => return Err(self.unexpected()),
                };
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_expression()?;
                entries.push(ObjectEntry::Field { key, value });
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expr::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(src: &str) -> Expr {
        parse(src).unwrap()
    }

    #[test]
    fn test_precedence_stack() {
        // '*' binds over '+', '&' binds looser than '+', '==' looser still
        let expr = p("a == b & c + d * e");
        let Expr::Binary {
            op: BinOp::Eq,
            right,
            ..
        } = expr
        else {
            panic!("top is not ==")
        };
        let Expr::Binary {
            op: BinOp::Concat,
            right,
            ..
        } = *right
        else {
            panic!("rhs is not &")
        };
        let Expr::Binary {
            op: BinOp::Add,
            right,
            ..
        } = *right
        else {
            panic!("concat rhs is not +")
        };
        assert!(matches!(*right, Expr::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_power_is_right_associative() {
        let Expr::Binary {
            op: BinOp::Pow,
            left,
            right,
        } = p("2 ** 3 ** 2")
        else {
            panic!("not a power")
        };
        assert_eq!(*left, Expr::Number(2.0));
        assert!(matches!(*right, Expr::Binary { op: BinOp::Pow, .. }));
    }

    #[test]
    fn test_conditional_nests_right() {
        let Expr::Conditional { otherwise, .. } = p("a ? 1 : b ? 2 : 3") else {
            panic!("not a conditional")
        };
        assert!(matches!(*otherwise, Expr::Conditional { .. }));
    }

    #[test]
    fn test_strict_equality_spelling() {
        assert!(matches!(p("a === b"), Expr::Binary { op: BinOp::Eq, .. }));
        assert!(matches!(p("a !== b"), Expr::Binary { op: BinOp::Ne, .. }));
    }

    #[test]
    fn test_postfix_chain() {
        let Expr::Call { callee, args } = p("calc.math.abs(-1)") else {
            panic!("not a call")
        };
        assert_eq!(args.len(), 1);
        let Expr::Member { object, field } = *callee else {
            panic!("callee is not a member")
        };
        assert_eq!(field, "abs");
        assert!(matches!(*object, Expr::Member { .. }));
    }

    #[test]
    fn test_index_access() {
        let Expr::Index { object, index } = p("rows[0]") else {
            panic!("not an index");
        };
        assert_eq!(*object, Expr::Ident("rows".into()));
        assert_eq!(*index, Expr::Number(0.0));
    }

    #[test]
    fn test_single_param_lambda() {
        let Expr::Lambda { params, body } = p("x => x + 1") else {
            panic!("not a lambda")
        };
        assert_eq!(params, vec![Param::Name("x".into())]);
        assert!(matches!(*body, Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_destructuring_params() {
        let Expr::Lambda { params, .. } = p("({price, qty: n}) => price * n") else {
            panic!("not a lambda")
        };
        let Param::Destructure(fields) = &params[0] else {
            panic!("not a destructure")
        };
        assert_eq!(fields[0].key, "price");
        assert_eq!(fields[0].binding, "price");
        assert_eq!(fields[1].key, "qty");
        assert_eq!(fields[1].binding, "n");
    }

    #[test]
    fn test_parenthesized_expression_is_not_a_lambda() {
        assert!(matches!(
            p("(a + b) * 2"),
            Expr::Binary { op: BinOp::Mul, .. }
        ));
    }

    #[test]
    fn test_immediately_called_lambda() {
        let Expr::Call { callee, .. } = p("(x => x)(3)") else {
            panic!("not a call")
        };
        assert!(matches!(*callee, Expr::Lambda { .. }));
    }

    #[test]
    fn test_object_literal_entries() {
        let Expr::Object(entries) = p(r#"{a: 1, "b c": 2, ...rest}"#) else {
            panic!("not an object")
        };
        assert_eq!(entries.len(), 3);
        assert!(matches!(&entries[0], ObjectEntry::Field { key, .. } if key == "a"));
        assert!(matches!(&entries[1], ObjectEntry::Field { key, .. } if key == "b c"));
        assert!(matches!(&entries[2], ObjectEntry::Spread(Expr::Ident(name)) if name == "rest"));
    }

    #[test]
    fn test_array_literal() {
        let Expr::Array(items) = p("[1, null, \"x\"]") else {
            panic!("not an array")
        };
        assert_eq!(items, vec![Expr::Number(1.0), Expr::Null, Expr::Text("x".into())]);
    }

    #[test]
    fn test_let_bindings() {
        let Expr::Let { bindings, body } = p("let { a = 1; b = a + 1; } in a + b") else {
            panic!("not a let")
        };
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].0, "a");
        assert_eq!(bindings[1].0, "b");
        assert!(matches!(*body, Expr::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_unary_operators() {
        assert!(matches!(
            p("!ready"),
            Expr::Unary { op: UnOp::Not, .. }
        ));
        let Expr::Unary { op: UnOp::Neg, expr } = p("--x") else {
            panic!("not a negation")
        };
        assert!(matches!(*expr, Expr::Unary { op: UnOp::Neg, .. }));
    }

    #[test]
    fn test_trailing_token_is_an_error() {
        assert!(matches!(
            parse("1 2"),
            Err(ParseError::TrailingToken { ref text, .. }) if text == "2"
        ));
    }

    #[test]
    fn test_unexpected_token_names_text_and_kind() {
        match parse("1 + * 2") {
            Err(ParseError::UnexpectedToken { text, kind, offset }) => {
                assert_eq!(text, "*");
                assert_eq!(kind, "operator");
                assert_eq!(offset, 4);
            }
            other => panic!("expected unexpected-token error, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_input() {
        assert!(matches!(parse("1 +"), Err(ParseError::UnexpectedEnd { .. })));
        assert!(matches!(parse(""), Err(ParseError::UnexpectedEnd { .. })));
    }

    #[test]
    fn test_coalesce_binds_looser_than_or() {
        let Expr::Binary {
            op: BinOp::Coalesce,
            right,
            ..
        } = p("a ?? b || c")
        else {
            panic!("top is not ??")
        };
        assert!(matches!(*right, Expr::Binary { op: BinOp::Or, .. }));
    }
}
