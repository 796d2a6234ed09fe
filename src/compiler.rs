use std::sync::OnceLock;

use regex::Regex;
use snafu::OptionExt;

use crate::{
    asm::{
        instrs_to_string, Arg32, Arg64, BinArgs, Instr, MemRef, MovArgs,
        Reg::{self, *},
        Reg8,
    },
    error::{CompileResult, FrameTooLargeSnafu},
    mref,
    resolver::SymbolTable,
    syntax::{Expr, Prog, Rel, Stmt, Symbol, Term},
};

const WORD_SIZE: i32 = 8;

const RESULT: Reg = Rax;
const SCRATCH: Reg = Rdx;
const FRAME_BASE: Reg = Rbp;

const LINE_BUF: &str = "line";
const LINE_MAX: &str = "LINE_MAX";
const STDIN: i32 = 0;
const STDOUT: u64 = 1;
const SYS_EXIT: u64 = 60;

const READ_MACRO: &str = "read";
const STRLEN: &str = "strlen";
const PARSE_UINT: &str = "parse_uint";
const WRITE_UINT: &str = "write_uint";

const ENDIF_PREFIX: &str = "endif";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Size in bytes of the buffer `input` reads a line into.
    pub line_max: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { line_max: 1024 }
    }
}

struct Session<'a> {
    tag: u32,
    instrs: Vec<Instr>,
    symbols: &'a SymbolTable,
}

pub fn compile(prg: &Prog, symbols: &SymbolTable, opts: &CompileOptions) -> CompileResult<String> {
    let frame = frame_size(symbols.len())?;

    let mut sess = Session::new(symbols);
    sess.fun_entry(frame);
    for stmt in &prg.stmts {
        sess.compile_stmt(stmt)?;
    }
    sess.fun_exit(frame);
    log::debug!(
        "emitted {} instructions, {} end-if labels",
        sess.instrs.len(),
        sess.tag
    );

    Ok(format!(
        "\
format ELF64 executable
{LINE_MAX} equ {line_max}
segment readable executable
include \"linux.inc\"
include \"utils.inc\"
entry _start
_start:
{}segment readable writeable
{LINE_BUF} rb {LINE_MAX}
",
        instrs_to_string(&sess.instrs),
        line_max = opts.line_max,
    ))
}

impl<'a> Session<'a> {
    fn new(symbols: &'a SymbolTable) -> Session<'a> {
        Session {
            tag: 0,
            instrs: vec![],
            symbols,
        }
    }

    fn fun_entry(&mut self, frame: i32) {
        self.emit_instrs([
            Instr::Mov(MovArgs::ToReg(FRAME_BASE, Arg64::Reg(Rsp))),
            Instr::Sub(BinArgs::ToReg(Rsp, Arg32::Imm(frame))),
        ]);
    }

    fn fun_exit(&mut self, frame: i32) {
        self.emit_instrs([
            Instr::Add(BinArgs::ToReg(Rsp, Arg32::Imm(frame))),
            Instr::Mov(MovArgs::ToReg(Rax, Arg64::Imm(SYS_EXIT))),
            Instr::Xor(BinArgs::ToReg(Rdi, Arg32::Reg(Rdi))),
            Instr::Syscall,
        ]);
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let (rels, stmt) = stmt.guards();
        let mut end_lbls = Vec::with_capacity(rels.len());
        for rel in rels {
            self.compile_rel(rel)?;
            let end_lbl = endif_label(self.next_tag());
            self.emit_instrs([
                Instr::Test(BinArgs::ToReg(RESULT, Arg32::Reg(RESULT))),
                Instr::Jz(end_lbl.clone()),
            ]);
            end_lbls.push(end_lbl);
        }

        match stmt {
            Stmt::Assign(x, e) => {
                self.compile_expr(e)?;
                let mem = self.lookup(x)?;
                self.emit_instr(Instr::Mov(MovArgs::ToMem(mem, RESULT)));
            }
            Stmt::If(..) => unreachable!("guards unwinds every if"),
            Stmt::Goto(lbl) => self.emit_instr(Instr::Jmp(user_label(lbl))),
            Stmt::Output(t) => {
                self.compile_term(t)?;
                self.emit_instrs([
                    Instr::Mov(MovArgs::ToReg(Rdi, Arg64::Imm(STDOUT))),
                    Instr::Mov(MovArgs::ToReg(Rsi, Arg64::Reg(RESULT))),
                    Instr::Call(WRITE_UINT.to_string()),
                ]);
            }
            Stmt::Label(lbl) => self.emit_instr(Instr::Label(user_label(lbl))),
        }

        // Innermost if closes first.
        self.emit_instrs(end_lbls.into_iter().rev().map(Instr::Label));
        Ok(())
    }

    fn compile_expr(&mut self, e: &Expr) -> CompileResult<()> {
        match e {
            Expr::Term(t) => self.compile_term(t),
            Expr::Plus(t1, t2) => {
                self.compile_term(t1)?;
                self.emit_instr(Instr::Mov(MovArgs::ToReg(SCRATCH, Arg64::Reg(RESULT))));
                self.compile_term(t2)?;
                self.emit_instr(Instr::Add(BinArgs::ToReg(RESULT, Arg32::Reg(SCRATCH))));
                Ok(())
            }
        }
    }

    /// Leaves 1 in `rax` when the left term is less than the right one, 0 otherwise.
    fn compile_rel(&mut self, rel: &Rel) -> CompileResult<()> {
        match rel {
            Rel::Less(t1, t2) => {
                self.compile_term(t1)?;
                self.emit_instr(Instr::Mov(MovArgs::ToReg(SCRATCH, Arg64::Reg(RESULT))));
                self.compile_term(t2)?;
                self.emit_instrs([
                    Instr::Cmp(BinArgs::ToReg(SCRATCH, Arg32::Reg(RESULT))),
                    Instr::Setl(Reg8::Al),
                    Instr::AndByte(Reg8::Al, 1),
                    Instr::Movzx(RESULT, Reg8::Al),
                ]);
                Ok(())
            }
        }
    }

    fn compile_term(&mut self, t: &Term) -> CompileResult<()> {
        match t {
            Term::Input => self.emit_instrs([
                Instr::Macro(
                    READ_MACRO.to_string(),
                    vec![STDIN.to_string(), LINE_BUF.to_string(), LINE_MAX.to_string()],
                ),
                Instr::Mov(MovArgs::ToReg(Rdi, Arg64::Sym(LINE_BUF.to_string()))),
                Instr::Call(STRLEN.to_string()),
                Instr::Mov(MovArgs::ToReg(Rdi, Arg64::Sym(LINE_BUF.to_string()))),
                Instr::Mov(MovArgs::ToReg(Rsi, Arg64::Reg(Rax))),
                Instr::Call(PARSE_UINT.to_string()),
            ]),
            Term::Int(n) => self.emit_instr(Instr::Mov(MovArgs::ToReg(RESULT, Arg64::Imm(*n)))),
            Term::Var(x) => {
                let mem = self.lookup(x)?;
                self.emit_instr(Instr::Mov(MovArgs::ToReg(RESULT, Arg64::Mem(mem))));
            }
        }
        Ok(())
    }

    fn lookup(&self, x: &Symbol) -> CompileResult<MemRef> {
        let slot = self.symbols.lookup(x)?;
        let offset = slot_offset(slot).context(FrameTooLargeSnafu {
            count: self.symbols.len(),
        })?;
        Ok(mref![FRAME_BASE - %(offset)])
    }

    fn emit_instrs(&mut self, instrs: impl IntoIterator<Item = Instr>) {
        self.instrs.extend(instrs);
    }

    fn emit_instr(&mut self, instr: Instr) {
        self.instrs.push(instr)
    }

    fn next_tag(&mut self) -> u32 {
        self.tag += 1;
        self.tag - 1
    }
}

/// Distance below `rbp` of the given slot.
fn slot_offset(slot: usize) -> Option<i32> {
    i32::try_from(slot)
        .ok()?
        .checked_mul(WORD_SIZE)?
        .checked_add(WORD_SIZE)
}

fn frame_size(locals: usize) -> CompileResult<i32> {
    i32::try_from(locals)
        .ok()
        .and_then(|n| n.checked_mul(WORD_SIZE))
        .context(FrameTooLargeSnafu { count: locals })
}

fn endif_label(tag: u32) -> String {
    format!(".{ENDIF_PREFIX}{tag}")
}

fn user_label(lbl: &Symbol) -> String {
    format!(".{lbl}")
}

/// True when a user label would be emitted with the same name as a
/// generated end-if label.
pub fn is_reserved_label(lbl: &Symbol) -> bool {
    static RESERVED: OnceLock<Regex> = OnceLock::new();
    RESERVED
        .get_or_init(|| {
            Regex::new(&format!("^{ENDIF_PREFIX}[0-9]+$")).expect("end-if label pattern is valid")
        })
        .is_match(lbl.as_str())
}
