use std::fmt;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::span::Span;

type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label name -> index of the instruction that follows the label.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    table: FxMap<String, usize>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `index`. A later declaration of the same name rebinds it.
    pub fn insert(&mut self, name: &str, index: usize) {
        self.table.insert(name.to_string(), index);
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.table.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Labels in order of first declaration.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.table.iter().map(|(name, idx)| (name.as_str(), *idx))
    }
}

/// Arithmetic performed on the accumulator.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AccOp {
    Load,
    Add,
    Sub,
    Mul,
    Div,
}

/// Source of the second operand of an accumulator operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Operand {
    /// `C` prefix: the literal itself
    Const(i64),
    /// Value of register `n`
    Direct(usize),
    /// `IND` prefix: value of the register whose index is held in register `n`
    Indirect(usize),
}

/// Destination of a store.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    Direct(usize),
    Indirect(usize),
}

/// Comparison of the accumulator against a constant.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Cmp {
    pub fn from_symbol(symbol: &str) -> Option<Cmp> {
        Some(match symbol {
            "=" => Cmp::Eq,
            "!=" => Cmp::Ne,
            "<" => Cmp::Lt,
            ">" => Cmp::Gt,
            "<=" => Cmp::Le,
            ">=" => Cmp::Ge,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "!=",
            Cmp::Lt => "<",
            Cmp::Gt => ">",
            Cmp::Le => "<=",
            Cmp::Ge => ">=",
        }
    }

    pub fn holds(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }
}

/// Jump destination, kept by name and looked up when the jump is taken.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct JumpTarget {
    pub label: String,
    /// Location of the label operand, for diagnostics
    pub span: Span,
}

/// Single executable RAM statement.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// `LOAD`, `ADD`, `SUB`, `MUL`, `DIV` and their `C`/`IND` variants
    Acc { op: AccOp, operand: Operand },
    /// `STORE`, `INDSTORE`
    Store(Target),
    /// Print the first `count` registers
    Dump { count: usize },
    Goto(JumpTarget),
    /// Jump if `acc <cmp> value`
    If {
        cmp: Cmp,
        value: i64,
        target: JumpTarget,
    },
    End,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acc { op, operand } => {
                let name = match op {
                    AccOp::Load => "LOAD",
                    AccOp::Add => "ADD",
                    AccOp::Sub => "SUB",
                    AccOp::Mul => "MUL",
                    AccOp::Div => "DIV",
                };
                match operand {
                    Operand::Const(n) => write!(f, "C{} {}", name, n),
                    Operand::Direct(n) => write!(f, "{} {}", name, n),
                    Operand::Indirect(n) => write!(f, "IND{} {}", name, n),
                }
            }
            Self::Store(Target::Direct(n)) => write!(f, "STORE {}", n),
            Self::Store(Target::Indirect(n)) => write!(f, "INDSTORE {}", n),
            Self::Dump { count } => write!(f, "DUMP {}", count),
            Self::Goto(target) => write!(f, "GOTO {}", target.label),
            Self::If { cmp, value, target } => {
                write!(f, "IF {} {} GOTO {}", cmp.symbol(), value, target.label)
            }
            Self::End => write!(f, "END"),
        }
    }
}

impl Instruction {
    pub fn jump_target(&self) -> Option<&JumpTarget> {
        match self {
            Self::Goto(target) | Self::If { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Assembled instruction together with where it came from.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Stmt {
    pub instr: Instruction,
    /// 1-based source line
    pub line: usize,
    pub span: Span,
}

/// Fully assembled program. Immutable once built.
#[derive(Clone, Debug, Default)]
pub struct Program {
    stmts: Vec<Stmt>,
    labels: LabelTable,
}

impl Program {
    pub fn new(stmts: Vec<Stmt>, labels: LabelTable) -> Self {
        Program { stmts, labels }
    }

    pub fn get(&self, idx: usize) -> Option<&Stmt> {
        self.stmts.get(idx)
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stmt> {
        self.stmts.iter()
    }

    /// Jump targets that no label declaration defines.
    ///
    /// These only fail once the jump is actually taken, so a program containing them can
    /// still run to completion.
    pub fn undefined_labels(&self) -> Vec<&JumpTarget> {
        self.stmts
            .iter()
            .filter_map(|stmt| stmt.instr.jump_target())
            .filter(|target| !self.labels.contains(&target.label))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Stmt;
    type IntoIter = std::slice::Iter<'a, Stmt>;

    fn into_iter(self) -> Self::IntoIter {
        self.stmts.iter()
    }
}
