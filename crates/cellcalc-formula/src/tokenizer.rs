//! Formula tokenizer
//!
//! Splits formula text (without the leading `=`) into a flat stream of typed
//! tokens. Function calls and parenthesized groups come out as start/stop pairs,
//! so the stream carries nesting without any tree structure.

use crate::error::{FormulaError, FormulaResult};

/// What a token does in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `NAME(`
    FunctionStart,
    /// The `)` closing a function call
    FunctionStop,
    /// A `(` that opens a parenthesized group
    SubexpressionStart,
    /// The `)` closing a parenthesized group
    SubexpressionStop,
    /// Number, text or reference
    Operand,
    /// Binary operator
    OperatorInfix,
    /// `,` between function arguments
    Argument,
}

/// Refinement of an [`TokenKind::Operand`] token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenSubkind {
    Number,
    Text,
    Range,
    None,
}

/// One token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub subkind: TokenSubkind,
    /// Function name, operand text (unquoted for text) or operator symbol
    pub text: String,
}

impl Token {
    pub fn new<S: Into<String>>(kind: TokenKind, subkind: TokenSubkind, text: S) -> Self {
        Self {
            kind,
            subkind,
            text: text.into(),
        }
    }

    pub fn function_start<S: Into<String>>(name: S) -> Self {
        Self::new(TokenKind::FunctionStart, TokenSubkind::None, name)
    }

    pub fn function_stop() -> Self {
        Self::new(TokenKind::FunctionStop, TokenSubkind::None, "")
    }

    pub fn subexpression_start() -> Self {
        Self::new(TokenKind::SubexpressionStart, TokenSubkind::None, "(")
    }

    pub fn subexpression_stop() -> Self {
        Self::new(TokenKind::SubexpressionStop, TokenSubkind::None, ")")
    }

    pub fn number<S: Into<String>>(text: S) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Number, text)
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Text, text)
    }

    pub fn range<S: Into<String>>(text: S) -> Self {
        Self::new(TokenKind::Operand, TokenSubkind::Range, text)
    }

    pub fn infix<S: Into<String>>(symbol: S) -> Self {
        Self::new(TokenKind::OperatorInfix, TokenSubkind::None, symbol)
    }

    pub fn argument() -> Self {
        Self::new(TokenKind::Argument, TokenSubkind::None, ",")
    }
}

/// Tokenize formula text
///
/// # Example
/// ```rust
/// use cellcalc_formula::tokenizer::{tokenize, Token};
///
/// let tokens = tokenize("SUM(A1, 2)").unwrap();
/// assert_eq!(
///     tokens,
///     vec![
///         Token::function_start("SUM"),
///         Token::range("A1"),
///         Token::argument(),
///         Token::number("2"),
///         Token::function_stop(),
///     ]
/// );
/// ```
pub fn tokenize(formula: &str) -> FormulaResult<Vec<Token>> {
    Tokenizer::new(formula).run()
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    /// Open groups, each either `FunctionStart` or `SubexpressionStart`
    groups: Vec<TokenKind>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            groups: Vec::new(),
        }
    }

    fn run(mut self) -> FormulaResult<Vec<Token>> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek_char() else { break };

            match c {
                '"' => self.scan_string()?,
                '0'..='9' => self.scan_number(false)?,
                '.' if self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.scan_number(false)?
                }
                '+' | '-' if self.in_prefix_position() => self.scan_signed_number()?,
                '+' | '-' | '*' | '/' | '=' => {
                    self.advance();
                    self.tokens.push(Token::infix(c.to_string()));
                }
                '<' => {
                    self.advance();
                    let symbol = match self.peek_char() {
                        Some('=') => "<=",
                        Some('>') => "<>",
                        _ => "<",
                    };
                    if symbol.len() == 2 {
                        self.advance();
                    }
                    self.tokens.push(Token::infix(symbol));
                }
                '>' => {
                    self.advance();
                    let symbol = if self.peek_char() == Some('=') {
                        self.advance();
                        ">="
                    } else {
                        ">"
                    };
                    self.tokens.push(Token::infix(symbol));
                }
                '(' => {
                    self.advance();
                    self.groups.push(TokenKind::SubexpressionStart);
                    self.tokens.push(Token::subexpression_start());
                }
                ')' => {
                    match self.groups.pop() {
                        Some(TokenKind::FunctionStart) => self.tokens.push(Token::function_stop()),
                        Some(_) => self.tokens.push(Token::subexpression_stop()),
                        None => return Err(self.error("unmatched ')'")),
                    }
                    self.advance();
                }
                ',' => {
                    if self.groups.last() != Some(&TokenKind::FunctionStart) {
                        return Err(self.error("',' outside of a function call"));
                    }
                    self.advance();
                    self.tokens.push(Token::argument());
                }
                '\'' => self.scan_identifier()?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_identifier()?,
                other => return Err(self.error(format!("unexpected character '{}'", other))),
            }
        }

        if !self.groups.is_empty() {
            return Err(self.error("unclosed '('"));
        }
        Ok(self.tokens)
    }

    /// A sign is a prefix when it cannot be the infix operator between two operands
    fn in_prefix_position(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(token) => !matches!(
                token.kind,
                TokenKind::Operand | TokenKind::FunctionStop | TokenKind::SubexpressionStop
            ),
        }
    }

    fn scan_signed_number(&mut self) -> FormulaResult<()> {
        let negative = self.peek_char() == Some('-');
        let sign_pos = self.pos;
        self.advance();
        let starts_number = match self.peek_char() {
            Some(c) if c.is_ascii_digit() => true,
            Some('.') => self.peek_char_at(1).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if !starts_number {
            self.pos = sign_pos;
            return Err(self.error("prefix operators are only supported before numbers"));
        }
        self.scan_number(negative)
    }

    fn scan_number(&mut self, negative: bool) -> FormulaResult<()> {
        let start = self.pos;
        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let signed = matches!(self.peek_char_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_char_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let digits = &self.input[start..self.pos];
        let text = if negative {
            format!("-{}", digits)
        } else {
            digits.to_string()
        };
        self.tokens.push(Token::number(text));
        Ok(())
    }

    fn scan_string(&mut self) -> FormulaResult<()> {
        let start = self.pos;
        self.advance();

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated string"));
                }
            }
        }

        self.tokens.push(Token::text(s));
        Ok(())
    }

    fn scan_identifier(&mut self) -> FormulaResult<()> {
        let start = self.pos;

        if self.peek_char() == Some('\'') {
            self.scan_quoted_sheet()?;
            if self.peek_char() != Some('!') {
                return Err(self.error("expected '!' after quoted sheet name"));
            }
        }

        while self.peek_char().is_some_and(|c| {
            c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '!' | ':')
        }) {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('(') {
            self.advance();
            self.groups.push(TokenKind::FunctionStart);
            self.tokens.push(Token::function_start(text.to_uppercase()));
            return Ok(());
        }

        let upper = text.to_uppercase();
        if upper == "TRUE" || upper == "FALSE" {
            self.tokens.push(Token::function_start(upper));
            self.tokens.push(Token::function_stop());
            return Ok(());
        }

        self.tokens.push(Token::range(text));
        Ok(())
    }

    fn scan_quoted_sheet(&mut self) -> FormulaResult<()> {
        let start = self.pos;
        self.advance();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
                None => {
                    self.pos = start;
                    return Err(self.error("unterminated sheet name"));
                }
            }
        }
    }

    // === Helper methods ===

    fn error<S: Into<String>>(&self, message: S) -> FormulaError {
        FormulaError::Tokenize {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }
}
