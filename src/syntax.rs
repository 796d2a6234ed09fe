use std::{fmt, mem, sync::Arc};

/// A variable or label name.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

#[derive(Debug, Default, PartialEq)]
pub struct Prog {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, PartialEq)]
pub enum Stmt {
    Assign(Symbol, Expr),
    If(Rel, Box<Stmt>),
    Goto(Symbol),
    Output(Term),
    Label(Symbol),
}

#[derive(Debug, PartialEq)]
pub enum Expr {
    Term(Term),
    Plus(Term, Term),
}

#[derive(Debug, PartialEq)]
pub enum Rel {
    Less(Term, Term),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Input,
    Int(u64),
    Var(Symbol),
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Symbol {
        Symbol(Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Stmt {
    /// Splits a chain of nested ifs into its relations, outermost first, and
    /// the innermost statement, which is never an if.
    pub fn guards(&self) -> (Vec<&Rel>, &Stmt) {
        let mut rels = vec![];
        let mut stmt = self;
        while let Stmt::If(rel, body) = stmt {
            rels.push(rel);
            stmt = &**body;
        }
        (rels, stmt)
    }
}

// Unlinks nested ifs one level at a time so dropping a deep chain does not
// recurse.
impl Drop for Stmt {
    fn drop(&mut self) {
        let Stmt::If(_, body) = self else {
            return;
        };
        let mut next = mem::replace(&mut **body, Stmt::Output(Term::Input));
        while let Stmt::If(_, body) = &mut next {
            next = mem::replace(&mut **body, Stmt::Output(Term::Input));
        }
    }
}

impl Expr {
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        let (lhs, rhs) = match self {
            Expr::Term(t) => (t, None),
            Expr::Plus(t1, t2) => (t1, Some(t2)),
        };
        std::iter::once(lhs).chain(rhs)
    }
}

impl Rel {
    pub fn terms(&self) -> impl Iterator<Item = &Term> {
        let Rel::Less(lhs, rhs) = self;
        [lhs, rhs].into_iter()
    }
}

impl Term {
    /// The variable this term reads, if any.
    pub fn var(&self) -> Option<&Symbol> {
        match self {
            Term::Var(x) => Some(x),
            Term::Input | Term::Int(_) => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

// The `Display` impls below print source syntax, so a dumped program parses
// back to the same tree.

impl fmt::Display for Prog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.stmts {
            writeln!(f, "{stmt}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rels, stmt) = self.guards();
        for rel in rels {
            write!(f, "if {rel} then ")?;
        }
        match stmt {
            Stmt::Assign(x, e) => write!(f, "{x} = {e}"),
            Stmt::If(..) => unreachable!("guards unwinds every if"),
            Stmt::Goto(lbl) => write!(f, "goto :{lbl}"),
            Stmt::Output(t) => write!(f, "output {t}"),
            Stmt::Label(lbl) => write!(f, ":{lbl}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Term(t) => write!(f, "{t}"),
            Expr::Plus(t1, t2) => write!(f, "{t1} + {t2}"),
        }
    }
}

impl fmt::Display for Rel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rel::Less(t1, t2) => write!(f, "{t1} < {t2}"),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Input => write!(f, "input"),
            Term::Int(n) => write!(f, "{n}"),
            Term::Var(x) => write!(f, "{x}"),
        }
    }
}
