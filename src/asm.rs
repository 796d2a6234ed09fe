//! Typed subset of x86-64 used by the code generator, rendered in FASM
//! syntax.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    Rax,
    Rdx,
    Rsi,
    Rdi,
    Rsp,
    Rbp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Reg8 {
    Al,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemRef {
    pub reg: Reg,
    pub offset: i32,
}

#[macro_export]
macro_rules! mref {
    ($reg:ident - %($offset:expr)) => {{
        $crate::asm::MemRef {
            reg: $reg,
            offset: -($offset),
        }
    }};
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Arg64 {
    Reg(Reg),
    Imm(u64),
    Mem(MemRef),
    /// Address of a data label or an assembler constant.
    Sym(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arg32 {
    Reg(Reg),
    Imm(i32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MovArgs {
    ToReg(Reg, Arg64),
    ToMem(MemRef, Reg),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinArgs {
    ToReg(Reg, Arg32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instr {
    Mov(MovArgs),
    Movzx(Reg, Reg8),

    Add(BinArgs),
    Sub(BinArgs),
    Xor(BinArgs),
    AndByte(Reg8, u8),
    Cmp(BinArgs),
    Test(BinArgs),
    Setl(Reg8),

    Label(String),

    Call(String),
    Syscall,

    Jmp(String),
    Jz(String), // jump if result was 0

    /// Invocation of a macro from the runtime include files.
    Macro(String, Vec<String>),
}

pub fn reg_to_string(r: Reg) -> String {
    match r {
        Reg::Rax => String::from("rax"),
        Reg::Rdx => String::from("rdx"),
        Reg::Rsi => String::from("rsi"),
        Reg::Rdi => String::from("rdi"),
        Reg::Rsp => String::from("rsp"),
        Reg::Rbp => String::from("rbp"),
    }
}

pub fn reg8_to_string(r: Reg8) -> String {
    match r {
        Reg8::Al => String::from("al"),
    }
}

pub fn mem_ref_to_string(m: MemRef) -> String {
    format!("qword [{} {}]", reg_to_string(m.reg), offset_to_string(m.offset))
}

fn offset_to_string(n: i32) -> String {
    if n < 0 {
        format!("- {}", n.unsigned_abs())
    } else {
        format!("+ {}", n)
    }
}

pub fn arg32_to_string(arg: Arg32) -> String {
    match arg {
        Arg32::Reg(r) => reg_to_string(r),
        Arg32::Imm(i) => i.to_string(),
    }
}

pub fn arg64_to_string(arg: &Arg64) -> String {
    match arg {
        Arg64::Reg(r) => reg_to_string(*r),
        Arg64::Imm(i) => i.to_string(),
        Arg64::Mem(m) => mem_ref_to_string(*m),
        Arg64::Sym(s) => s.clone(),
    }
}

pub fn mov_args_to_string(args: &MovArgs) -> String {
    match args {
        MovArgs::ToReg(r, arg) => {
            format!("{}, {}", reg_to_string(*r), arg64_to_string(arg))
        }
        MovArgs::ToMem(mem, r) => {
            format!("{}, {}", mem_ref_to_string(*mem), reg_to_string(*r))
        }
    }
}

pub fn bin_args_to_string(args: BinArgs) -> String {
    match args {
        BinArgs::ToReg(r, arg) => {
            format!("{}, {}", reg_to_string(r), arg32_to_string(arg))
        }
    }
}

pub fn instr_to_string(i: &Instr) -> String {
    match i {
        Instr::Mov(args) => format!("    mov {}", mov_args_to_string(args)),
        Instr::Movzx(r, r8) => format!("    movzx {}, {}", reg_to_string(*r), reg8_to_string(*r8)),
        Instr::Add(args) => format!("    add {}", bin_args_to_string(*args)),
        Instr::Sub(args) => format!("    sub {}", bin_args_to_string(*args)),
        Instr::Xor(args) => format!("    xor {}", bin_args_to_string(*args)),
        Instr::AndByte(r8, imm) => format!("    and {}, {imm}", reg8_to_string(*r8)),
        Instr::Cmp(args) => format!("    cmp {}", bin_args_to_string(*args)),
        Instr::Test(args) => format!("    test {}", bin_args_to_string(*args)),
        Instr::Setl(r8) => format!("    setl {}", reg8_to_string(*r8)),
        Instr::Label(s) => format!("{}:", s),

        Instr::Call(s) => format!("    call {s}"),
        Instr::Syscall => "    syscall".to_string(),
        Instr::Jmp(s) => format!("    jmp {s}"),
        Instr::Jz(s) => format!("    jz {s}"),
        Instr::Macro(name, args) => format!("    {name} {}", args.join(", ")),
    }
}

pub fn instrs_to_string(is: &[Instr]) -> String {
    let mut buf = String::new();
    for i in is {
        buf.push_str(&instr_to_string(i));
        buf.push('\n');
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::Reg::*;
    use super::*;

    #[test]
    fn renders_stack_slots() {
        assert_eq!(mem_ref_to_string(mref!(Rbp - %(8))), "qword [rbp - 8]");
        assert_eq!(mem_ref_to_string(MemRef { reg: Rbp, offset: 16 }), "qword [rbp + 16]");
    }

    #[test]
    fn renders_instructions() {
        let instrs = [
            Instr::Mov(MovArgs::ToReg(Rax, Arg64::Mem(mref!(Rbp - %(24))))),
            Instr::Mov(MovArgs::ToMem(mref!(Rbp - %(8)), Rax)),
            Instr::Mov(MovArgs::ToReg(Rax, Arg64::Imm(u64::MAX))),
            Instr::Mov(MovArgs::ToReg(Rdi, Arg64::Sym("line".to_string()))),
            Instr::AndByte(Reg8::Al, 1),
            Instr::Movzx(Rax, Reg8::Al),
            Instr::Label(".endif0".to_string()),
            Instr::Macro("read".to_string(), vec!["0".into(), "line".into(), "LINE_MAX".into()]),
        ];
        assert_eq!(
            instrs_to_string(&instrs),
            "    mov rax, qword [rbp - 24]\n\
             \x20   mov qword [rbp - 8], rax\n\
             \x20   mov rax, 18446744073709551615\n\
             \x20   mov rdi, line\n\
             \x20   and al, 1\n\
             \x20   movzx rax, al\n\
             .endif0:\n\
             \x20   read 0, line, LINE_MAX\n"
        );
    }
}
