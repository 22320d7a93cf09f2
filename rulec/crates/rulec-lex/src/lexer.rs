//! Lexer for policy condition and effect strings.
//!
//! Whitespace separates tokens; parentheses and commas are always token
//! boundaries. Operators are matched longest-first (`<=` before `<`,
//! `+=` before `+`). Identifier-like text is read as a maximal word, which
//! is what keeps `AND`/`OR`/`NOT` recognition on word boundaries: `sAND`
//! or `lORe` never produce an operator token.

use rulec_util::{ErrorKind, Handler, Span};

use crate::cursor::Cursor;
use crate::token::{Token, TokenWithSpan};

/// The lexer for policy expression text.
///
/// # Example
///
/// ```
/// use rulec_util::Handler;
/// use rulec_lex::lexer::Lexer;
/// use rulec_lex::token::Token;
///
/// let handler = Handler::new();
/// let mut lexer = Lexer::new("value > 5", &handler);
///
/// assert_eq!(lexer.next_token(), Token::Ident("value".into()));
/// assert_eq!(lexer.next_token(), Token::Gt);
/// assert_eq!(lexer.next_token(), Token::Number("5".into()));
/// assert_eq!(lexer.next_token(), Token::Eof);
/// ```
pub struct Lexer<'a> {
    /// Character cursor over the source.
    cursor: Cursor<'a>,
    /// Diagnostic handler for error reporting.
    handler: &'a Handler,
    /// Start position of the current token.
    token_start: usize,
    /// Start line of the current token.
    token_start_line: u32,
    /// Start column of the current token.
    token_start_column: u32,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer over `source`.
    pub fn new(source: &'a str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
        }
    }

    /// Returns the next token, or [`Token::Eof`] at end of input.
    pub fn next_token(&mut self) -> Token {
        self.cursor.skip_whitespace();

        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Token::Eof;
        }

        match self.cursor.current_char() {
            '(' => {
                self.cursor.advance();
                Token::LParen
            }
            ')' => {
                self.cursor.advance();
                Token::RParen
            }
            ',' => {
                self.cursor.advance();
                Token::Comma
            }

            '+' => self.lex_op(Token::PlusEq, Token::Plus),
            '-' => self.lex_op(Token::MinusEq, Token::Minus),
            '*' => self.lex_op(Token::StarEq, Token::Star),
            '/' => self.lex_op(Token::SlashEq, Token::Slash),
            '=' => self.lex_op(Token::EqEq, Token::Eq),
            '<' => self.lex_op(Token::LtEq, Token::Lt),
            '>' => self.lex_op(Token::GtEq, Token::Gt),
            '!' => {
                self.cursor.advance();
                if self.cursor.match_char('=') {
                    Token::NotEq
                } else {
                    self.report_error("expected `=` after `!`");
                    Token::Invalid("!".into())
                }
            }

            '"' => self.lex_string(),

            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => self.lex_word(),

            c => {
                self.report_error(format!("unexpected character `{c}`"));
                self.cursor.advance();
                Token::Invalid(c.to_string())
            }
        }
    }

    /// Span of the most recently returned token.
    pub fn token_span(&self) -> Span {
        Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        )
    }

    /// Lexes a single- or compound-assignment style operator pair.
    ///
    /// Handles the `X`/`X=` shape shared by `+ - * / = < >`.
    fn lex_op(&mut self, with_eq: Token, without: Token) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            with_eq
        } else {
            without
        }
    }

    /// Lexes a numeric literal: a decimal run, or a `0x` hex form.
    ///
    /// A hex literal of exactly 40 digits is an address; any other hex
    /// length stays a plain hex literal (bytes or integer, decided by the
    /// type checker).
    fn lex_number(&mut self) -> Token {
        if self.cursor.current_char() == '0'
            && (self.cursor.peek_char(1) == 'x' || self.cursor.peek_char(1) == 'X')
        {
            self.cursor.advance();
            self.cursor.advance();

            let digit_start = self.cursor.position();
            while self.cursor.current_char().is_ascii_hexdigit() {
                self.cursor.advance();
            }

            let digit_count = self.cursor.position() - digit_start;
            if digit_count == 0 {
                self.report_error("no digits after `0x` prefix");
                return Token::Invalid(self.cursor.slice_from(self.token_start).to_owned());
            }

            let text = self.cursor.slice_from(self.token_start).to_owned();
            if digit_count == 40 {
                return Token::AddressLit(text);
            }
            return Token::Hex(text);
        }

        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        Token::Number(self.cursor.slice_from(self.token_start).to_owned())
    }

    /// Lexes an identifier, keyword, boolean literal, or prefixed name.
    fn lex_word(&mut self) -> Token {
        while is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        let word = self.cursor.slice_from(self.token_start);

        // Prefixed names: TR:x, TRU:x, FC:x, GV:X
        if self.cursor.current_char() == ':' {
            if let Some(make) = prefix_constructor(word) {
                self.cursor.advance();

                let name_start = self.cursor.position();
                while is_ident_continue(self.cursor.current_char()) {
                    self.cursor.advance();
                }
                let name = self.cursor.slice_from(name_start);
                if name.is_empty() {
                    self.report_error(format!("missing name after `{word}:`"));
                    return Token::Invalid(format!("{word}:"));
                }
                return make(name.to_owned());
            }

            self.report_error(format!("unknown name prefix `{word}:`"));
            self.cursor.advance();
            return Token::Invalid(format!("{word}:"));
        }

        // Keywords are matched on the whole word only
        match word {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(word.to_owned()),
        }
    }

    /// Lexes a double-quoted string literal with basic escapes.
    fn lex_string(&mut self) -> Token {
        self.cursor.advance();

        let mut content = String::new();
        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated string literal");
                break;
            }

            let c = self.cursor.current_char();
            if c == '"' {
                self.cursor.advance();
                break;
            }

            if c == '\\' {
                self.cursor.advance();
                let escaped = self.cursor.current_char();
                match escaped {
                    'n' => content.push('\n'),
                    't' => content.push('\t'),
                    '\\' => content.push('\\'),
                    '"' => content.push('"'),
                    _ => {
                        self.report_error(format!("unknown escape sequence `\\{escaped}`"));
                        content.push(escaped);
                    }
                }
                self.cursor.advance();
            } else {
                content.push(c);
                self.cursor.advance();
            }
        }

        Token::Str(content)
    }

    /// Reports a lexical error at the current token position.
    fn report_error(&self, message: impl Into<String>) {
        self.handler
            .error(ErrorKind::Grammar, message, self.token_span());
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token == Token::Eof {
            None
        } else {
            Some(token)
        }
    }
}

/// Tokenize a whole source string, including a trailing [`Token::Eof`].
pub fn tokenize(source: &str, handler: &Handler) -> Vec<TokenWithSpan> {
    let mut lexer = Lexer::new(source, handler);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        let span = lexer.token_span();
        let done = token == Token::Eof;
        tokens.push(TokenWithSpan::new(token, span));
        if done {
            break;
        }
    }
    tokens
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn prefix_constructor(word: &str) -> Option<fn(String) -> Token> {
    match word {
        "TR" => Some(Token::Tracker),
        "TRU" => Some(Token::TrackerUpdate),
        "FC" => Some(Token::ForeignCall),
        "GV" => Some(Token::GlobalVar),
        _ => None,
    }
}
