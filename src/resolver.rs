//! Variable resolution.
//!
//! A single forward walk over the program assigns every variable a stack slot
//! in order of first assignment and checks that each read refers to a
//! variable that has already been assigned somewhere earlier in the text.

use std::collections::HashSet;

use snafu::{ensure, OptionExt};

use crate::{
    compiler::is_reserved_label,
    error::{CompileResult, ReservedLabelSnafu, UndeclaredIdentifierSnafu},
    syntax::{Prog, Stmt, Symbol, Term},
};

/// Variables in slot order. Slot `i` lives at `[rbp - 8 * (i + 1)]`.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<Symbol>,
    slots: im::HashMap<Symbol, usize>,
}

impl SymbolTable {
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Returns the slot of `name`, allocating the next one on first sight.
    pub fn declare(&mut self, name: &Symbol) -> usize {
        if let Some(slot) = self.slots.get(name) {
            return *slot;
        }
        let slot = self.names.len();
        self.names.push(name.clone());
        self.slots.insert(name.clone(), slot);
        slot
    }

    pub fn slot(&self, name: &Symbol) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn lookup(&self, name: &Symbol) -> CompileResult<usize> {
        self.slot(name).context(UndeclaredIdentifierSnafu { name: name.clone() })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[Symbol] {
        &self.names
    }
}

pub fn resolve(prog: &Prog) -> CompileResult<SymbolTable> {
    let mut resolver = Resolver::default();
    for stmt in &prog.stmts {
        resolver.resolve_stmt(stmt)?;
    }
    resolver.report_labels();
    log::debug!("resolved {} variables", resolver.symbols.len());
    Ok(resolver.symbols)
}

#[derive(Default)]
struct Resolver {
    symbols: SymbolTable,
    labels: HashSet<Symbol>,
    gotos: Vec<Symbol>,
}

impl Resolver {
    fn resolve_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let (rels, stmt) = stmt.guards();
        for rel in rels {
            self.check_terms(rel.terms())?;
        }
        match stmt {
            Stmt::Assign(x, e) => {
                self.check_terms(e.terms())?;
                self.symbols.declare(x);
            }
            Stmt::If(..) => unreachable!("guards unwinds every if"),
            Stmt::Output(t) => self.check_terms([t])?,
            Stmt::Goto(lbl) => {
                ensure!(!is_reserved_label(lbl), ReservedLabelSnafu { name: lbl.clone() });
                self.gotos.push(lbl.clone());
            }
            Stmt::Label(lbl) => {
                ensure!(!is_reserved_label(lbl), ReservedLabelSnafu { name: lbl.clone() });
                if !self.labels.insert(lbl.clone()) {
                    log::warn!("label `{lbl}` is defined more than once");
                }
            }
        }
        Ok(())
    }

    fn check_terms<'a>(&self, terms: impl IntoIterator<Item = &'a Term>) -> CompileResult<()> {
        for x in terms.into_iter().filter_map(Term::var) {
            self.symbols.lookup(x)?;
        }
        Ok(())
    }

    /// Goto targets are not validated; a missing one is only reported.
    fn report_labels(&self) {
        for lbl in &self.gotos {
            if !self.labels.contains(lbl) {
                log::warn!("goto target `{lbl}` is not defined by any label");
            }
        }
    }
}
