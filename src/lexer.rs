//! Lexical analysis.
//!
//! [`Lexer`] hands out one [`Token`] per call and never fails: characters it
//! does not recognise become [`TokenKind::Invalid`] tokens and the parser
//! decides what to do with them. The stream always ends with exactly one
//! [`TokenKind::End`] token.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Label,
    Int,
    Input,
    Output,
    Goto,
    If,
    Then,
    Equal,
    Plus,
    LessThan,
    Invalid,
    End,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Ident => "ident",
            TokenKind::Label => "label",
            TokenKind::Int => "int",
            TokenKind::Input => "input",
            TokenKind::Output => "output",
            TokenKind::Goto => "goto",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Equal => "equal",
            TokenKind::Plus => "plus",
            TokenKind::LessThan => "less_than",
            TokenKind::Invalid => "invalid",
            TokenKind::End => "end",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Present for identifiers, labels, integer literals and invalid characters.
    pub lexeme: Option<String>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Option<String>, line: usize, column: usize) -> Self {
        Token {
            kind,
            lexeme,
            line,
            column,
        }
    }

    /// Text used when the token shows up in a diagnostic.
    pub fn describe(&self) -> String {
        match &self.lexeme {
            Some(lexeme) if self.kind == TokenKind::Label => format!("label `:{lexeme}`"),
            Some(lexeme) => format!("{} `{lexeme}`", self.kind.name()),
            None => match self.kind {
                TokenKind::End => "end of input".to_string(),
                TokenKind::Equal => "`=`".to_string(),
                TokenKind::Plus => "`+`".to_string(),
                TokenKind::LessThan => "`<`".to_string(),
                kind => format!("`{}`", kind.name()),
            },
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.name())?;
        if let Some(lexeme) = &self.lexeme {
            write!(f, "({lexeme})")?;
        }
        Ok(())
    }
}

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            src,
            pos: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Token::new(TokenKind::End, None, line, column);
        };

        let simple = match c {
            '=' => Some(TokenKind::Equal),
            '+' => Some(TokenKind::Plus),
            '<' => Some(TokenKind::LessThan),
            _ => None,
        };
        if let Some(kind) = simple {
            self.bump();
            return Token::new(kind, None, line, column);
        }

        if c == ':' {
            self.bump();
            let name = self.eat_while(is_ident_char);
            if name.is_empty() {
                return Token::new(TokenKind::Invalid, Some(":".to_string()), line, column);
            }
            return Token::new(TokenKind::Label, Some(name.to_string()), line, column);
        }

        if c.is_ascii_digit() {
            let digits = self.eat_while(|c| c.is_ascii_digit());
            return Token::new(TokenKind::Int, Some(digits.to_string()), line, column);
        }

        if is_ident_char(c) {
            let word = self.eat_while(is_ident_char);
            let keyword = match word {
                "input" => Some(TokenKind::Input),
                "output" => Some(TokenKind::Output),
                "goto" => Some(TokenKind::Goto),
                "if" => Some(TokenKind::If),
                "then" => Some(TokenKind::Then),
                _ => None,
            };
            return match keyword {
                Some(kind) => Token::new(kind, None, line, column),
                None => Token::new(TokenKind::Ident, Some(word.to_string()), line, column),
            };
        }

        self.bump();
        Token::new(TokenKind::Invalid, Some(c.to_string()), line, column)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(char::is_whitespace);
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.kind == TokenKind::End;
        Some(token)
    }
}

/// Lex the whole source, end-of-input token included.
pub fn tokenize(src: &str) -> Vec<Token> {
    let tokens: Vec<Token> = Lexer::new(src)
        .inspect(|token| log::trace!("{}:{}: {token}", token.line, token.column))
        .collect();
    log::debug!("lexed {} tokens", tokens.len());
    tokens
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn classifies_every_token_kind() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = input\nif x < 10 then output x\n:top goto :top y + 1 ?"),
            vec![
                Ident, Equal, Input, If, Ident, LessThan, Int, Then, Output, Ident, Label, Goto,
                Label, Ident, Plus, Int, Invalid, End,
            ]
        );
    }

    #[test]
    fn keywords_carry_no_lexeme() {
        let tokens = tokenize("input output goto if then");
        assert!(tokens.iter().all(|t| t.lexeme.is_none()));
    }

    #[test]
    fn label_drops_the_colon() {
        let tokens = tokenize(":loop_1");
        assert_eq!(tokens[0].kind, TokenKind::Label);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("loop_1"));
    }

    #[test]
    fn bare_colon_is_invalid() {
        let tokens = tokenize(": x");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[0].lexeme.as_deref(), Some(":"));
        assert_eq!(tokens[1].kind, TokenKind::Ident);
    }

    #[test]
    fn digits_stop_at_letters() {
        let tokens = tokenize("12ab");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("12"));
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].lexeme.as_deref(), Some("ab"));
    }

    #[test]
    fn keyword_prefix_is_an_identifier() {
        let tokens = tokenize("iffy outputs _if");
        assert!(tokens[..3].iter().all(|t| t.kind == TokenKind::Ident));
    }

    #[test]
    fn lexemes_reproduce_source_words() {
        let src = "total = _acc + 0042\n:again";
        let words: Vec<String> = tokenize(src).into_iter().filter_map(|t| t.lexeme).collect();
        assert_eq!(words, ["total", "_acc", "0042", "again"]);
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = tokenize("x = 1\n  y = 2");
        let y = &tokens[3];
        assert_eq!((y.line, y.column), (2, 3));
    }

    #[test]
    fn end_is_produced_exactly_once() {
        let tokens: Vec<_> = Lexer::new("   \n\t").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::End);

        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::End);
        assert_eq!(lexer.next_token().kind, TokenKind::End);
    }

    #[test]
    fn non_ascii_is_a_single_invalid_token() {
        let tokens = tokenize("é");
        assert_eq!(tokens[0].kind, TokenKind::Invalid);
        assert_eq!(tokens[0].lexeme.as_deref(), Some("é"));
        assert_eq!(tokens[1].kind, TokenKind::End);
    }

    #[test]
    fn display_matches_token_dump_format() {
        let tokens = tokenize("x = 1");
        let dump: Vec<String> = tokens.iter().map(ToString::to_string).collect();
        assert_eq!(dump, ["ident(x)", "equal", "int(1)", "end"]);
    }
}
