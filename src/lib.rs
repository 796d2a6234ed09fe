//! Compiler for a tiny goto language: integer variables, `+`, `<`,
//! `if ... then`, labels, `goto`, `input` and `output`.
//!
//! The pipeline runs strictly forward:
//! - `lexer` turns the source into tokens;
//! - `parser` builds the statement tree;
//! - `resolver` assigns stack slots and checks every read follows an assignment;
//! - `compiler` walks the tree again and emits FASM x86-64 assembly.

pub mod asm;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod syntax;

pub use compiler::CompileOptions;
pub use error::{CompileError, CompileResult};

/// Compile a whole source text into assembly.
pub fn compile_source(src: &str, opts: &CompileOptions) -> CompileResult<String> {
    let tokens = lexer::tokenize(src);
    let prog = parser::parse(tokens)?;
    let symbols = resolver::resolve(&prog)?;
    compiler::compile(&prog, &symbols, opts)
}

/// One line per token, `kind(lexeme)`.
pub fn dump_tokens(src: &str) -> String {
    lexer::Lexer::new(src)
        .map(|token| format!("{token}\n"))
        .collect()
}

/// The parsed program printed back in source form.
pub fn dump_ast(src: &str) -> CompileResult<String> {
    let prog = parser::parse(lexer::tokenize(src))?;
    Ok(prog.to_string())
}
