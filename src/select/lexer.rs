//! Attribute Expression Lexer
//!
//! Tokenizes the contents of a selector bracket group, e.g.
//! `@href^='http' and (rel='nofollow' or !title)`.

/// Attribute expression token types
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    LeftParen,  // (
    RightParen, // )
    At,         // @
    Not,        // !
    Eq,         // =
    NotEq,      // !=
    StartsWith, // ^=
    EndsWith,   // $=
    Contains,   // *=
    And,        // and
    Or,         // or

    // Literals
    Number(String),
    String(String),
    Name(String),

    /// Character that starts no token, or an unterminated string
    Invalid(char),

    // End of input
    Eof,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// Advance by n bytes
    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let c = match self.peek() {
            Some(c) => c,
            None => return Token::Eof,
        };

        match c {
            '(' => {
                self.advance(1);
                Token::LeftParen
            }
            ')' => {
                self.advance(1);
                Token::RightParen
            }
            '@' => {
                self.advance(1);
                Token::At
            }
            '=' => {
                self.advance(1);
                Token::Eq
            }
            '!' => {
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    Token::NotEq
                } else {
                    Token::Not
                }
            }
            '^' | '$' | '*' => {
                let token = match c {
                    '^' => Token::StartsWith,
                    '$' => Token::EndsWith,
                    _ => Token::Contains,
                };
                self.advance(1);
                if self.peek() == Some('=') {
                    self.advance(1);
                    token
                } else {
                    Token::Invalid(c)
                }
            }
            '"' | '\'' => self.read_string(c),
            _ if is_word_char(c) => self.read_word(),
            _ => {
                self.advance(c.len_utf8());
                Token::Invalid(c)
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Token {
        self.advance(1);
        let start = self.pos;

        match self.remaining().find(quote) {
            Some(len) => {
                let value = self.input[start..start + len].to_string();
                self.advance(len + 1);
                Token::String(value)
            }
            None => {
                self.pos = self.input.len();
                Token::Invalid(quote)
            }
        }
    }

    /// Read a name, keyword or number
    fn read_word(&mut self) -> Token {
        let start = self.pos;

        while let Some(c) = self.peek() {
            if is_word_char(c) {
                self.advance(c.len_utf8());
            } else {
                break;
            }
        }

        let word = &self.input[start..self.pos];
        match word {
            "and" => Token::And,
            "or" => Token::Or,
            _ if word.bytes().all(|b| b.is_ascii_digit()) => Token::Number(word.to_string()),
            _ => Token::Name(word.to_string()),
        }
    }
}

/// Characters of attribute names and unquoted values
#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')
}
