//! XPath Lexer
//!
//! Turns an expression into tokens paired with their byte offsets.
//!
//! `*` and the names `and`, `or`, `mod`, `div` are ambiguous in XPath. They
//! are operators only when the previous token ends an operand, so `//div`
//! selects `div` elements while `6 div 2` divides.

use crate::error::{XPathError, XPathErrorCode};

/// XPath token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Operators
    Slash,       // /
    DoubleSlash, // //
    Pipe,        // |
    Plus,        // +
    Minus,       // -
    Multiply,    // * after an operand
    Eq,          // =
    NotEq,       // !=
    Lt,          // <
    LtEq,        // <=
    Gt,          // >
    GtEq,        // >=
    And,
    Or,
    Mod,
    Div,

    // Abbreviations
    Dot,       // .
    DoubleDot, // ..
    At,        // @
    Star,      // * as a name test

    // Brackets
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,

    Comma,
    DoubleColon,

    // Literals
    Number(f64),
    Literal(String),

    // Names
    Name(String),         // NCName
    NameTest(String),     // prefix:* or prefix:local
    NodeType(String),     // node, text, comment, processing-instruction
    FunctionName(String), // name followed by (
    Axis(String),         // name followed by ::
    Variable(String),     // $name

    Eof,
}

impl Token {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::Slash
                | Token::DoubleSlash
                | Token::Pipe
                | Token::Plus
                | Token::Minus
                | Token::Multiply
                | Token::Eq
                | Token::NotEq
                | Token::Lt
                | Token::LtEq
                | Token::Gt
                | Token::GtEq
                | Token::And
                | Token::Or
                | Token::Mod
                | Token::Div
        )
    }

    /// True when the next token must start an operand
    fn expects_operand(prev: Option<&Token>) -> bool {
        match prev {
            None => true,
            Some(t) => {
                t.is_operator()
                    || matches!(
                        t,
                        Token::At | Token::DoubleColon | Token::LeftParen | Token::LeftBracket | Token::Comma
                    )
            }
        }
    }
}

/// XPath lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    prev: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            pos: 0,
            prev: None,
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.remaining().chars().nth(offset)
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn single(&mut self, token: Token) -> Result<Token, XPathError> {
        self.advance(1);
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if is_xml_space(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Offset of the next token, after whitespace
    pub fn position(&mut self) -> usize {
        self.skip_whitespace();
        self.pos
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, XPathError> {
        let token = self.scan()?;
        self.prev = Some(token.clone());
        Ok(token)
    }

    fn scan(&mut self) -> Result<Token, XPathError> {
        self.skip_whitespace();
        let start = self.pos;

        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '/' => {
                self.advance(1);
                if self.peek() == Some('/') {
                    self.advance(1);
                    Ok(Token::DoubleSlash)
                } else {
                    Ok(Token::Slash)
                }
            }
            '.' => {
                if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
                    return Ok(self.read_number());
                }
                self.advance(1);
                if self.peek() == Some('.') {
                    self.advance(1);
                    Ok(Token::DoubleDot)
                } else {
                    Ok(Token::Dot)
                }
            }
            '@' => self.single(Token::At),
            '|' => self.single(Token::Pipe),
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '=' => self.single(Token::Eq),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            '[' => self.single(Token::LeftBracket),
            ']' => self.single(Token::RightBracket),
            ',' => self.single(Token::Comma),
            '*' => {
                if Token::expects_operand(self.prev.as_ref()) {
                    self.single(Token::Star)
                } else {
                    self.single(Token::Multiply)
                }
            }
            '!' => {
                if self.peek_at(1) == Some('=') {
                    self.advance(2);
                    Ok(Token::NotEq)
                } else {
                    Err(XPathError::new(XPathErrorCode::InvalidChar, "Invalid character '!'").at(start))
                }
            }
            '<' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Ok(Token::LtEq)
                } else {
                    Ok(Token::Lt)
                }
            }
            '>' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Ok(Token::GtEq)
                } else {
                    Ok(Token::Gt)
                }
            }
            ':' => {
                if self.peek_at(1) == Some(':') {
                    self.advance(2);
                    Ok(Token::DoubleColon)
                } else {
                    Err(XPathError::new(XPathErrorCode::ExpressionError, "Unexpected ':'").at(start))
                }
            }
            '$' => {
                self.advance(1);
                let name = self.read_qname();
                if name.is_empty() {
                    Err(XPathError::new(XPathErrorCode::ExpressionError, "Expected variable name").at(start))
                } else {
                    Ok(Token::Variable(name.to_string()))
                }
            }
            '"' | '\'' => self.read_literal(c),
            '0'..='9' => Ok(self.read_number()),
            _ if is_name_start_char(c) => Ok(self.read_name_or_keyword()),
            _ => Err(XPathError::new(XPathErrorCode::InvalidChar, format!("Invalid character '{}'", c)).at(start)),
        }
    }

    /// Digits ('.' Digits?)? | '.' Digits
    fn read_number(&mut self) -> Token {
        let start = self.pos;
        self.skip_digits();
        if self.peek() == Some('.') {
            self.advance(1);
            self.skip_digits();
        }
        let value = self.input[start..self.pos].parse().unwrap_or(f64::NAN);
        Token::Number(value)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(1);
        }
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let start = self.pos;
        self.advance(1);
        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.remaining()[..len].to_string();
                self.advance(len + 1);
                Ok(Token::Literal(value))
            }
            None => Err(XPathError::new(XPathErrorCode::UnfinishedLiteral, "Unfinished literal").at(start)),
        }
    }

    fn read_ncname(&mut self) -> &'a str {
        let start = self.pos;
        if self.peek().is_some_and(is_name_start_char) {
            while let Some(c) = self.peek() {
                if is_name_char(c) {
                    self.advance(c.len_utf8());
                } else {
                    break;
                }
            }
        }
        &self.input[start..self.pos]
    }

    fn read_qname(&mut self) -> &'a str {
        let start = self.pos;
        self.read_ncname();
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(is_name_start_char) {
            self.advance(1);
            self.read_ncname();
        }
        &self.input[start..self.pos]
    }

    fn read_name_or_keyword(&mut self) -> Token {
        let name = self.read_ncname();

        if !Token::expects_operand(self.prev.as_ref()) {
            match name {
                "and" => return Token::And,
                "or" => return Token::Or,
                "mod" => return Token::Mod,
                "div" => return Token::Div,
                _ => {}
            }
        }

        // prefix:* and prefix:local
        if self.peek() == Some(':') && self.peek_at(1) != Some(':') {
            if self.peek_at(1) == Some('*') {
                self.advance(2);
                return Token::NameTest(format!("{}:*", name));
            }
            if self.peek_at(1).is_some_and(is_name_start_char) {
                self.advance(1);
                let local = self.read_ncname();
                let qname = format!("{}:{}", name, local);
                let mark = self.pos;
                self.skip_whitespace();
                if self.peek() == Some('(') {
                    return Token::FunctionName(qname);
                }
                self.pos = mark;
                return Token::NameTest(qname);
            }
        }

        let mark = self.pos;
        self.skip_whitespace();
        if self.remaining().starts_with("::") {
            return Token::Axis(name.to_string());
        }
        if self.peek() == Some('(') {
            return match name {
                "node" | "text" | "comment" | "processing-instruction" => Token::NodeType(name.to_string()),
                _ => Token::FunctionName(name.to_string()),
            };
        }
        self.pos = mark;
        Token::Name(name.to_string())
    }

    /// Tokenize the entire input, pairing every token with its offset. The
    /// last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<(Token, usize)>, XPathError> {
        let mut tokens = Vec::new();
        loop {
            let position = self.position();
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push((token, position));
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_name_start_char(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}
