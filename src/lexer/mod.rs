use logos::{FilterResult, Logos};

use std::fmt;
use std::ops::Range;

use crate::diagnostic::CompileError;


/// Failures raised from inside the token callbacks.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LexError {
    #[default]
    UnexpectedCharacter,
    UnterminatedComment,
    TooManyDecimalPoints,
    UnexpectedEndOfInput,
    UnterminatedString,
    EmptyCharacter,
    UnterminatedCharacter,
    MissingClosingQuote,
    IntegerOutOfRange,
}

impl LexError {
    fn message(&self, slice: &str) -> String {
        match self {
            LexError::UnexpectedCharacter => format!("unexpected character '{slice}'"),
            LexError::UnterminatedComment => "unterminated comment".to_string(),
            LexError::TooManyDecimalPoints => "too many decimal points".to_string(),
            LexError::UnexpectedEndOfInput => "unexpected end of input".to_string(),
            LexError::UnterminatedString => "unterminated string".to_string(),
            LexError::EmptyCharacter => "empty character literal".to_string(),
            LexError::UnterminatedCharacter => "unterminated character".to_string(),
            LexError::MissingClosingQuote => {
                "invalid character, expected closing quote".to_string()
            }
            LexError::IntegerOutOfRange => format!("integer literal '{slice}' out of range"),
        }
    }
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    // never produced: the callback either skips the comment or fails
    #[token("/*", block_comment)]
    BlockComment,

    #[token(";")]
    Semicolon,

    #[token("=")]
    Assign,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Mul,

    #[token("/")]
    Div,

    #[token("int")]
    KeywordInt,

    #[token("float")]
    KeywordFloat,

    #[token("bool")]
    KeywordBool,

    #[token("char")]
    KeywordChar,

    #[token("string")]
    KeywordString,

    #[token("void")]
    KeywordVoid,

    #[token("for")]
    KeywordFor,

    #[token("while")]
    KeywordWhile,

    #[token("class")]
    KeywordClass,

    #[token("graph")]
    KeywordGraph,

    #[token("return")]
    KeywordReturn,

    #[token("def")]
    KeywordDef,

    #[token("if")]
    KeywordIf,

    #[token("else")]
    KeywordElse,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r"[0-9]+", int_literal)]
    IntVal(i64),

    #[regex(r"[0-9]+\.[0-9]*", float_literal)]
    #[regex(r"[0-9]+\.[0-9]*\.[0-9.]*", too_many_decimal_points)]
    FloatVal(f32),

    #[regex(r#""[^";]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    #[regex(r#""[^";]*"#, unterminated_string)]
    StringVal(String),

    #[regex(r"'[^']'", |lex| lex.slice().chars().nth(1))]
    #[token("''", empty_char)]
    #[token("'", unterminated_char)]
    #[regex(r"'[^']", missing_closing_quote)]
    CharVal(char),

    #[token("true", |_| true)]
    #[token("false", |_| false)]
    BoolVal(bool),

    Eof,
}

fn block_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), LexError> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(LexError::UnterminatedComment)
        }
    }
}

fn int_literal(lex: &mut logos::Lexer<Token>) -> Result<i64, LexError> {
    lex.slice()
        .parse::<i64>()
        .map_err(|_| LexError::IntegerOutOfRange)
}

fn float_literal(lex: &mut logos::Lexer<Token>) -> Result<f32, LexError> {
    let slice = lex.slice();
    // a trailing '.' with nothing after it means the input ended mid-number
    if slice.ends_with('.') && lex.remainder().is_empty() {
        return Err(LexError::UnexpectedEndOfInput);
    }
    slice
        .parse::<f32>()
        .map_err(|_| LexError::UnexpectedEndOfInput)
}

fn too_many_decimal_points(_lex: &mut logos::Lexer<Token>) -> Result<f32, LexError> {
    Err(LexError::TooManyDecimalPoints)
}

fn unterminated_string(_lex: &mut logos::Lexer<Token>) -> Result<String, LexError> {
    Err(LexError::UnterminatedString)
}

fn empty_char(_lex: &mut logos::Lexer<Token>) -> Result<char, LexError> {
    Err(LexError::EmptyCharacter)
}

fn unterminated_char(_lex: &mut logos::Lexer<Token>) -> Result<char, LexError> {
    Err(LexError::UnterminatedCharacter)
}

fn missing_closing_quote(lex: &mut logos::Lexer<Token>) -> Result<char, LexError> {
    // `'a` with nothing after it is cut off, not malformed
    if lex.remainder().is_empty() {
        return Err(LexError::UnterminatedCharacter);
    }
    Err(LexError::MissingClosingQuote)
}

impl Token {
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            Token::KeywordInt
                | Token::KeywordFloat
                | Token::KeywordBool
                | Token::KeywordChar
                | Token::KeywordString
                | Token::KeywordVoid
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::BlockComment => write!(f, "'/*'"),
            Token::Semicolon => write!(f, "';'"),
            Token::Assign => write!(f, "'='"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::LBrace => write!(f, "'{{'"),
            Token::RBrace => write!(f, "'}}'"),
            Token::LBracket => write!(f, "'['"),
            Token::RBracket => write!(f, "']'"),
            Token::Dot => write!(f, "'.'"),
            Token::Comma => write!(f, "','"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Mul => write!(f, "'*'"),
            Token::Div => write!(f, "'/'"),
            Token::KeywordInt => write!(f, "'int'"),
            Token::KeywordFloat => write!(f, "'float'"),
            Token::KeywordBool => write!(f, "'bool'"),
            Token::KeywordChar => write!(f, "'char'"),
            Token::KeywordString => write!(f, "'string'"),
            Token::KeywordVoid => write!(f, "'void'"),
            Token::KeywordFor => write!(f, "'for'"),
            Token::KeywordWhile => write!(f, "'while'"),
            Token::KeywordClass => write!(f, "'class'"),
            Token::KeywordGraph => write!(f, "'graph'"),
            Token::KeywordReturn => write!(f, "'return'"),
            Token::KeywordDef => write!(f, "'def'"),
            Token::KeywordIf => write!(f, "'if'"),
            Token::KeywordElse => write!(f, "'else'"),
            Token::Identifier(name) => write!(f, "identifier '{name}'"),
            Token::IntVal(i) => write!(f, "integer {i}"),
            Token::FloatVal(x) => write!(f, "float {x}"),
            Token::StringVal(s) => write!(f, "string \"{}\"", s.escape_debug()),
            Token::CharVal(c) => write!(f, "character '{}'", c.escape_debug()),
            Token::BoolVal(b) => write!(f, "boolean {b}"),
            Token::Eof => write!(f, "end of file"),
        }
    }
}

/// Pull-based tokenizer: hands out one token per call and remembers where
/// it was found. Once the input is exhausted every call yields `Token::Eof`.
pub struct Lexer<'src> {
    source: &'src str,
    inner: logos::Lexer<'src, Token>,
    span: Range<usize>,
    line: usize,
    // byte offset up to which newlines have been counted into `line`
    counted: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            inner: Token::lexer(source),
            span: 0..0,
            line: 1,
            counted: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, CompileError> {
        let Some(result) = self.inner.next() else {
            let end = self.source.len();
            self.advance_line_to(end);
            self.span = end..end;
            return Ok(Token::Eof);
        };

        let span = self.inner.span();
        self.advance_line_to(span.start);
        self.span = span.clone();

        match result {
            Ok(token) => {
                log::trace!("line {}: {}", self.line, token);
                Ok(token)
            }
            Err(err) => {
                let message = err.message(self.inner.slice());
                Err(CompileError::lexical(message, self.line, span))
            }
        }
    }

    /// Line of the token most recently returned.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Byte range of the token most recently returned.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    fn advance_line_to(&mut self, offset: usize) {
        if offset > self.counted {
            self.line += self.source[self.counted..offset]
                .bytes()
                .filter(|b| *b == b'\n')
                .count();
            self.counted = offset;
        }
    }

    /// Drains the whole input, ending with exactly one `Token::Eof`.
    pub fn tokenize(source: &'src str) -> Result<Vec<Token>, CompileError> {
        let mut lexer = Lexer::new(source);
        let mut tokens = vec![];
        loop {
            let token = lexer.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}
