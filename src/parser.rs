//! Recursive-descent parser with one token of lookahead.
//!
//! ```text
//! program     := statement+
//! statement   := assign | if_stmt | goto_stmt | output_stmt | label_stmt
//! assign      := IDENT '=' expr
//! if_stmt     := 'if' rel 'then' statement
//! goto_stmt   := 'goto' (LABEL | IDENT)
//! output_stmt := 'output' term
//! label_stmt  := LABEL
//! expr        := term ('+' term)?
//! rel         := term '<' term
//! term        := 'input' | INT | IDENT
//! ```
//!
//! Any mismatch stops the parse with [`CompileError::UnexpectedToken`]; no
//! partially built statement ever reaches the later passes.

use snafu::OptionExt;

use crate::{
    error::{CompileError, CompileResult, IntegerOutOfRangeSnafu, UnexpectedTokenSnafu},
    lexer::{Token, TokenKind},
    syntax::{Expr, Prog, Rel, Stmt, Symbol, Term},
};

pub fn parse(tokens: Vec<Token>) -> CompileResult<Prog> {
    let prog = Parser::new(tokens).parse_prog()?;
    log::debug!("parsed {} statements", prog.stmts.len());
    Ok(prog)
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::End) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::End, None, line, column));
        }
        Parser { tokens, pos: 0 }
    }

    pub fn parse_prog(&mut self) -> CompileResult<Prog> {
        let mut stmts = vec![self.parse_stmt()?];
        while self.peek().kind != TokenKind::End {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Prog { stmts })
    }

    fn parse_stmt(&mut self) -> CompileResult<Stmt> {
        match self.peek().kind {
            TokenKind::Ident => self.parse_assign(),
            TokenKind::If => self.parse_if(),
            TokenKind::Goto => self.parse_goto(),
            TokenKind::Output => self.parse_output(),
            TokenKind::Label => {
                let name = self.advance().lexeme;
                Ok(Stmt::Label(symbol(name)))
            }
            _ => Err(self.unexpected("a statement")),
        }
    }

    fn parse_assign(&mut self) -> CompileResult<Stmt> {
        let target = self.expect(TokenKind::Ident, "an identifier")?;
        self.expect(TokenKind::Equal, "`=`")?;
        let expr = self.parse_expr()?;
        Ok(Stmt::Assign(symbol(target.lexeme), expr))
    }

    /// Reads a whole run of `if ... then` prefixes before the statement they
    /// guard, then nests them innermost first.
    fn parse_if(&mut self) -> CompileResult<Stmt> {
        let mut rels = vec![];
        loop {
            self.expect(TokenKind::If, "`if`")?;
            rels.push(self.parse_rel()?);
            self.expect(TokenKind::Then, "`then`")?;
            if self.peek().kind != TokenKind::If {
                break;
            }
        }
        let body = self.parse_stmt()?;
        Ok(rels
            .into_iter()
            .rev()
            .fold(body, |body, rel| Stmt::If(rel, Box::new(body))))
    }

    fn parse_goto(&mut self) -> CompileResult<Stmt> {
        self.expect(TokenKind::Goto, "`goto`")?;
        match self.peek().kind {
            TokenKind::Label | TokenKind::Ident => {
                let target = self.advance().lexeme;
                Ok(Stmt::Goto(symbol(target)))
            }
            _ => Err(self.unexpected("a label")),
        }
    }

    fn parse_output(&mut self) -> CompileResult<Stmt> {
        self.expect(TokenKind::Output, "`output`")?;
        Ok(Stmt::Output(self.parse_term()?))
    }

    fn parse_expr(&mut self) -> CompileResult<Expr> {
        let lhs = self.parse_term()?;
        if self.peek().kind == TokenKind::Plus {
            self.advance();
            let rhs = self.parse_term()?;
            Ok(Expr::Plus(lhs, rhs))
        } else {
            Ok(Expr::Term(lhs))
        }
    }

    fn parse_rel(&mut self) -> CompileResult<Rel> {
        let lhs = self.parse_term()?;
        self.expect(TokenKind::LessThan, "`<`")?;
        let rhs = self.parse_term()?;
        Ok(Rel::Less(lhs, rhs))
    }

    fn parse_term(&mut self) -> CompileResult<Term> {
        match self.peek().kind {
            TokenKind::Input => {
                self.advance();
                Ok(Term::Input)
            }
            TokenKind::Int => {
                let tok = self.advance();
                let text = tok.lexeme.unwrap_or_default();
                let n = text.parse::<u64>().ok().context(IntegerOutOfRangeSnafu {
                    line: tok.line,
                    column: tok.column,
                    text: text.as_str(),
                })?;
                Ok(Term::Int(n))
            }
            TokenKind::Ident => {
                let name = self.advance().lexeme;
                Ok(Term::Var(symbol(name)))
            }
            _ => Err(self.unexpected("an int, `input` or an identifier")),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Consume the current token. The trailing end token is never consumed.
    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> CompileResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> CompileError {
        let tok = self.peek();
        UnexpectedTokenSnafu {
            line: tok.line,
            column: tok.column,
            expected,
            found: tok.describe(),
        }
        .build()
    }
}

fn symbol(lexeme: Option<String>) -> Symbol {
    Symbol::new(lexeme.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> CompileResult<Prog> {
        parse(tokenize(src))
    }

    fn var(name: &str) -> Term {
        Term::Var(Symbol::new(name))
    }

    #[test]
    fn parses_each_statement_kind() {
        let prog = parse_src("x = input\ny = x + 1\n:top\noutput y\ngoto :top").unwrap();
        assert_eq!(
            prog.stmts,
            vec![
                Stmt::Assign(Symbol::new("x"), Expr::Term(Term::Input)),
                Stmt::Assign(Symbol::new("y"), Expr::Plus(var("x"), Term::Int(1))),
                Stmt::Label(Symbol::new("top")),
                Stmt::Output(var("y")),
                Stmt::Goto(Symbol::new("top")),
            ]
        );
    }

    #[test]
    fn goto_accepts_a_bare_identifier() {
        let prog = parse_src("goto loop").unwrap();
        assert_eq!(prog.stmts, vec![Stmt::Goto(Symbol::new("loop"))]);
    }

    #[test]
    fn nested_ifs_own_their_bodies() {
        let prog = parse_src("if a < b then if b < 3 then output a").unwrap();
        let [Stmt::If(Rel::Less(a, b), inner)] = &prog.stmts[..] else {
            panic!("expected a single if, got {prog:?}");
        };
        assert_eq!((a, b), (&var("a"), &var("b")));
        assert_eq!(
            **inner,
            Stmt::If(
                Rel::Less(var("b"), Term::Int(3)),
                Box::new(Stmt::Output(var("a")))
            )
        );
    }

    #[test]
    fn missing_then_is_fatal() {
        let err = parse_src("if x < 1 output x").unwrap_err();
        match err {
            CompileError::UnexpectedToken {
                line,
                column,
                expected,
                found,
            } => {
                assert_eq!((line, column), (1, 10));
                assert_eq!(expected, "`then`");
                assert_eq!(found, "`output`");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn missing_equal_is_fatal() {
        let err = parse_src("x 1").unwrap_err();
        assert!(matches!(err, CompileError::UnexpectedToken { expected: "`=`", .. }));
    }

    #[test]
    fn chained_addition_is_rejected() {
        let err = parse_src("x = 1 + 2 + 3").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnexpectedToken { expected: "a statement", .. }
        ));
    }

    #[test]
    fn invalid_character_is_rejected() {
        let err = parse_src("x = 1 ; y = 2").unwrap_err();
        let CompileError::UnexpectedToken { found, .. } = err else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(found, "invalid `;`");
    }

    #[test]
    fn empty_program_is_rejected() {
        let err = parse_src("  \n ").unwrap_err();
        let CompileError::UnexpectedToken { found, .. } = err else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(found, "end of input");
    }

    #[test]
    fn truncated_statement_reports_end_of_input() {
        let err = parse_src("x = 1\ny =").unwrap_err();
        let CompileError::UnexpectedToken { found, line, .. } = err else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(found, "end of input");
        assert_eq!(line, 2);
    }

    #[test]
    fn oversized_literal_is_rejected() {
        let err = parse_src("x = 18446744073709551616").unwrap_err();
        assert!(matches!(err, CompileError::IntegerOutOfRange { .. }));
    }

    #[test]
    fn token_list_without_end_is_terminated() {
        let tokens = vec![Token::new(TokenKind::Label, Some("a".into()), 1, 1)];
        let prog = Parser::new(tokens).parse_prog().unwrap();
        assert_eq!(prog.stmts, vec![Stmt::Label(Symbol::new("a"))]);
    }

    #[test]
    fn long_if_chains_nest_outermost_first() {
        let src = format!("x = 1\n{}output x", "if x < 2 then ".repeat(100_000));
        let prog = parse_src(&src).unwrap();
        let (rels, inner) = prog.stmts[1].guards();
        assert_eq!(rels.len(), 100_000);
        assert_eq!(*inner, Stmt::Output(var("x")));
    }

    #[test]
    fn literals_cover_the_unsigned_range() {
        let prog = parse_src("x = 18446744073709551615").unwrap();
        assert_eq!(
            prog.stmts,
            vec![Stmt::Assign(Symbol::new("x"), Expr::Term(Term::Int(u64::MAX)))]
        );
    }

    #[test]
    fn display_round_trips_through_the_parser() {
        let src = "n = input\n:top\nif n < 10 then if 0 < n then output n\nn = n + 1\ngoto top\n";
        let prog = parse_src(src).unwrap();
        assert_eq!(parse_src(&prog.to_string()).unwrap(), prog);
    }
}
