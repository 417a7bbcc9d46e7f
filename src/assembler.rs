use crate::{
    error::{AsmError, AsmErrorKind, SHAPE_END, SHAPE_GOTO, SHAPE_IF, SHAPE_OPERAND},
    lexer::{self, parse_number, Field, Line},
    program::{AccOp, Cmp, Instruction, JumpTarget, LabelTable, Operand, Program, Stmt, Target},
};

/// Assemble `src` into a runnable [`Program`] in a single pass.
///
/// Labels bind to the index of the next emitted instruction. Jump targets are kept by name,
/// so a label may be declared after the jump that refers to it.
pub fn assemble(src: &str) -> Result<Program, AsmError> {
    let mut asm = Assembler::new();
    for line in lexer::lines(src) {
        asm.line(&line)?;
    }
    Ok(asm.finish())
}

/// How the single numeric operand of an instruction is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Addressing {
    Const,
    Direct,
    Indirect,
}

/// Instructions taking exactly one numeric operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum OperandInstr {
    Acc(AccOp, Addressing),
    Store(Addressing),
    Dump,
}

impl OperandInstr {
    fn lookup(name: &str) -> Option<Self> {
        use AccOp::*;
        use Addressing::*;
        use OperandInstr::*;
        Some(match name {
            "STORE" => Store(Direct),
            "INDSTORE" => Store(Indirect),

            "LOAD" => Acc(Load, Direct),
            "CLOAD" => Acc(Load, Const),
            "INDLOAD" => Acc(Load, Indirect),

            "ADD" => Acc(Add, Direct),
            "CADD" => Acc(Add, Const),
            "INDADD" => Acc(Add, Indirect),

            "SUB" => Acc(Sub, Direct),
            "CSUB" => Acc(Sub, Const),
            "INDSUB" => Acc(Sub, Indirect),

            "MUL" => Acc(Mul, Direct),
            "CMUL" => Acc(Mul, Const),
            "INDMUL" => Acc(Mul, Indirect),

            "DIV" => Acc(Div, Direct),
            "CDIV" => Acc(Div, Const),
            "INDDIV" => Acc(Div, Indirect),

            "DUMP" => Dump,
            _ => return None,
        })
    }
}

struct Assembler {
    stmts: Vec<Stmt>,
    labels: LabelTable,
}

impl Assembler {
    fn new() -> Self {
        Assembler {
            stmts: Vec::new(),
            labels: LabelTable::new(),
        }
    }

    fn finish(self) -> Program {
        Program::new(self.stmts, self.labels)
    }

    fn line(&mut self, line: &Line) -> Result<(), AsmError> {
        if let Some(label) = line.label {
            self.labels.insert(label.text, self.stmts.len());
        }
        if line.is_label_only() {
            return Ok(());
        }

        let instr = match line.fields[0].text {
            "IF" => parse_if(line)?,
            "GOTO" => {
                expect_len(line, 2, SHAPE_GOTO)?;
                Instruction::Goto(jump_target(line.fields[1]))
            }
            "END" => {
                expect_len(line, 1, SHAPE_END)?;
                Instruction::End
            }
            name => parse_operand_instr(line, name)?,
        };

        self.stmts.push(Stmt {
            instr,
            line: line.number,
            span: line.span,
        });
        Ok(())
    }
}

fn parse_operand_instr(line: &Line, name: &str) -> Result<Instruction, AsmError> {
    let Some(kind) = OperandInstr::lookup(name) else {
        return Err(AsmError {
            line: line.number,
            span: line.fields[0].span,
            kind: AsmErrorKind::UnknownInstruction {
                name: name.to_string(),
            },
        });
    };
    expect_len(line, 2, SHAPE_OPERAND)?;

    let operand = line.fields[1];
    let value = number(line, operand)?;
    let index = || register_index(line, operand, name, value);

    Ok(match kind {
        OperandInstr::Acc(op, addressing) => Instruction::Acc {
            op,
            operand: match addressing {
                Addressing::Const => Operand::Const(value),
                Addressing::Direct => Operand::Direct(index()?),
                Addressing::Indirect => Operand::Indirect(index()?),
            },
        },
        OperandInstr::Store(Addressing::Indirect) => Instruction::Store(Target::Indirect(index()?)),
        OperandInstr::Store(_) => Instruction::Store(Target::Direct(index()?)),
        OperandInstr::Dump => Instruction::Dump { count: index()? },
    })
}

/// Operand used as a register index or dump count.
fn register_index(line: &Line, operand: Field, name: &str, value: i64) -> Result<usize, AsmError> {
    usize::try_from(value).map_err(|_| {
        let mnemonic = name.to_string();
        AsmError {
            line: line.number,
            span: operand.span,
            kind: if value < 0 {
                AsmErrorKind::NegativeOperand { mnemonic, value }
            } else {
                AsmErrorKind::OperandTooLarge { mnemonic, value }
            },
        }
    })
}

/// `IF <cmp> <n> GOTO <label>`
fn parse_if(line: &Line) -> Result<Instruction, AsmError> {
    let fields = &line.fields;
    if fields.len() != 5 || fields[3].text != "GOTO" {
        return Err(shape_error(line, SHAPE_IF));
    }

    let value = number(line, fields[2])?;
    let cmp = Cmp::from_symbol(fields[1].text).ok_or_else(|| AsmError {
        line: line.number,
        span: fields[1].span,
        kind: AsmErrorKind::UnknownComparison {
            op: fields[1].text.to_string(),
        },
    })?;

    Ok(Instruction::If {
        cmp,
        value,
        target: jump_target(fields[4]),
    })
}

fn jump_target(field: Field) -> JumpTarget {
    JumpTarget {
        label: field.text.to_string(),
        span: field.span,
    }
}

fn number(line: &Line, field: Field) -> Result<i64, AsmError> {
    parse_number(field.text).map_err(|error| AsmError {
        line: line.number,
        span: field.span,
        kind: AsmErrorKind::Literal(error),
    })
}

fn expect_len(line: &Line, len: usize, expected: &'static str) -> Result<(), AsmError> {
    if line.fields.len() != len {
        return Err(shape_error(line, expected));
    }
    Ok(())
}

fn shape_error(line: &Line, expected: &'static str) -> AsmError {
    AsmError {
        line: line.number,
        span: line.span,
        kind: AsmErrorKind::Shape { expected },
    }
}
