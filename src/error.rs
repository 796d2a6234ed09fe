//! Diagnostics shared by every stage of the pipeline.
//!
//! The lexer never fails. Everything after it reports through
//! [`CompileError`]; parse errors carry the location of the offending token.

use snafu::Snafu;

use crate::syntax::Symbol;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("{line}:{column}: expected {expected}, but found {found}"))]
    UnexpectedToken {
        line: usize,
        column: usize,
        expected: &'static str,
        found: String,
    },

    #[snafu(display("{line}:{column}: integer literal `{text}` does not fit in 64 bits"))]
    IntegerOutOfRange {
        line: usize,
        column: usize,
        text: String,
    },

    #[snafu(display("identifier not defined: {name}"))]
    UndeclaredIdentifier { name: Symbol },

    #[snafu(display("label `{name}` is reserved for generated end-if labels"))]
    ReservedLabel { name: Symbol },

    #[snafu(display("stack frame for {count} variables does not fit in a 32-bit displacement"))]
    FrameTooLarge { count: usize },
}
