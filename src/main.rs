use std::{
    fs,
    io::{self, Read, Write},
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use gotoc::{compile_source, dump_ast, dump_tokens, CompileOptions};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Source file; reads standard input when absent or `-`
    input: Option<PathBuf>,

    /// Write the result here instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to produce
    #[arg(long, value_enum, default_value_t = Emit::Asm)]
    emit: Emit,

    /// Size in bytes of the buffer `input` reads a line into
    #[arg(long, default_value_t = CompileOptions::default().line_max)]
    line_max: u32,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all log output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    Asm,
    Tokens,
    Ast,
}

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run() -> Result<()> {
    let args = Args::parse();

    stderrlog::new()
        .module(module_path!())
        .quiet(args.quiet)
        .verbosity(usize::from(args.verbose) + 1)
        .init()
        .context("failed to initialise logging")?;

    let src = read_source(args.input.as_ref())?;
    log::info!("compiling {} bytes of source", src.len());

    let out = match args.emit {
        Emit::Tokens => dump_tokens(&src),
        Emit::Ast => dump_ast(&src)?,
        Emit::Asm => compile_source(
            &src,
            &CompileOptions {
                line_max: args.line_max,
            },
        )?,
    };

    match &args.output {
        Some(path) => fs::write(path, out)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(out.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

fn read_source(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut src = String::new();
            io::stdin()
                .read_to_string(&mut src)
                .context("failed to read standard input")?;
            Ok(src)
        }
    }
}
