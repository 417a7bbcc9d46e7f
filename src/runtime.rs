use std::io::{self, Write};

use colored::Colorize;

use crate::{
    error::RunError,
    program::{AccOp, Instruction, JumpTarget, Operand, Program, Stmt, Target},
    registers::Registers,
};

/// Result of executing a single instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Continue,
    /// `END` was reached
    Halted,
}

/// Final state of a program that reached `END`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Halt {
    pub acc: i64,
    /// Instructions executed, including `END`
    pub steps: u64,
}

/// What the program counter does after an instruction.
enum Flow {
    Next,
    Jump(usize),
    Halt,
}

/// Complete program state during runtime.
pub struct Machine<'p> {
    program: &'p Program,
    regs: Registers,
    /// Program counter
    pc: usize,
    steps: u64,
    halted: bool,
    max_steps: Option<u64>,
    trace: bool,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_registers(program, Registers::new())
    }

    pub fn with_registers(program: &'p Program, regs: Registers) -> Self {
        Machine {
            program,
            regs,
            pc: 0,
            steps: 0,
            halted: false,
            max_steps: None,
            trace: false,
        }
    }

    /// Abort with [`RunError::StepLimit`] after `limit` instructions.
    pub fn set_max_steps(&mut self, limit: Option<u64>) {
        self.max_steps = limit;
    }

    /// Print every executed instruction to stderr.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn acc(&self) -> i64 {
        self.regs.acc()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run until `END`. Output of `DUMP` goes to `out`.
    pub fn run(&mut self, out: &mut impl Write) -> Result<Halt, RunError> {
        loop {
            if self.step(out)? == Step::Halted {
                return Ok(Halt {
                    acc: self.acc(),
                    steps: self.steps,
                });
            }
        }
    }

    /// Execute the instruction at the program counter.
    pub fn step(&mut self, out: &mut impl Write) -> Result<Step, RunError> {
        if self.halted {
            return Ok(Step::Halted);
        }
        let program = self.program;
        let Some(stmt) = program.get(self.pc) else {
            return Err(RunError::MissingEnd { acc: self.acc() });
        };
        if let Some(limit) = self.max_steps {
            if self.steps >= limit {
                return Err(RunError::StepLimit { limit, pc: self.pc });
            }
        }
        if self.trace {
            eprintln!("{:>6} {}", format!("{:04}", self.pc).dimmed(), stmt.instr);
        }

        self.steps += 1;
        match self.execute(stmt, out)? {
            Flow::Next => self.pc += 1,
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => {
                self.halted = true;
                return Ok(Step::Halted);
            }
        }
        Ok(Step::Continue)
    }

    fn execute(&mut self, stmt: &Stmt, out: &mut impl Write) -> Result<Flow, RunError> {
        match &stmt.instr {
            Instruction::Acc { op, operand } => {
                let rhs = self.operand(*operand, stmt)?;
                let acc = self.acc();
                let res = match op {
                    AccOp::Load => rhs,
                    AccOp::Add => acc.wrapping_add(rhs),
                    AccOp::Sub => acc.wrapping_sub(rhs),
                    AccOp::Mul => acc.wrapping_mul(rhs),
                    AccOp::Div => {
                        if rhs == 0 {
                            return Err(RunError::DivisionByZero {
                                line: stmt.line,
                                span: stmt.span,
                            });
                        }
                        acc.wrapping_div(rhs)
                    }
                };
                self.regs.set_acc(res);
            }
            Instruction::Store(target) => {
                let idx = match *target {
                    Target::Direct(idx) => idx,
                    Target::Indirect(idx) => self.indirect(idx, stmt)?,
                };
                let acc = self.acc();
                self.regs.set(idx, acc);
            }
            Instruction::Dump { count } => {
                self.dump(*count, out).map_err(|e| RunError::Output {
                    message: e.to_string(),
                })?;
            }
            Instruction::Goto(target) => return Ok(Flow::Jump(self.resolve(target, stmt)?)),
            Instruction::If { cmp, value, target } => {
                if cmp.holds(self.acc(), *value) {
                    return Ok(Flow::Jump(self.resolve(target, stmt)?));
                }
            }
            Instruction::End => return Ok(Flow::Halt),
        }
        Ok(Flow::Next)
    }

    fn operand(&self, operand: Operand, stmt: &Stmt) -> Result<i64, RunError> {
        Ok(match operand {
            Operand::Const(val) => val,
            Operand::Direct(idx) => self.regs.get(idx),
            Operand::Indirect(idx) => self.regs.get(self.indirect(idx, stmt)?),
        })
    }

    /// Register index held in register `idx`.
    fn indirect(&self, idx: usize, stmt: &Stmt) -> Result<usize, RunError> {
        let index = self.regs.get(idx);
        if index < 0 {
            return Err(RunError::NegativeRegister {
                index,
                line: stmt.line,
                span: stmt.span,
            });
        }
        usize::try_from(index).map_err(|_| RunError::RegisterTooLarge {
            index,
            line: stmt.line,
            span: stmt.span,
        })
    }

    /// Labels are looked up when the jump is taken, not when it is assembled.
    fn resolve(&self, target: &JumpTarget, stmt: &Stmt) -> Result<usize, RunError> {
        self.program
            .labels()
            .get(&target.label)
            .ok_or_else(|| RunError::UnresolvedLabel {
                label: target.label.clone(),
                line: stmt.line,
                span: target.span,
            })
    }

    fn dump(&self, count: usize, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "--- DUMP (PC: {}) ---", self.pc)?;
        for (i, val) in self.regs.iter(count) {
            writeln!(out, "c({}): \t{}", i, val)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    fn run_src(src: &str, regs: Registers) -> (Result<Halt, RunError>, Registers, String) {
        let program = assemble(src).unwrap();
        let mut machine = Machine::with_registers(&program, regs);
        machine.set_max_steps(Some(10_000));
        let mut out = Vec::new();
        let res = machine.run(&mut out);
        let regs = machine.registers().clone();
        (res, regs, String::from_utf8(out).unwrap())
    }

    fn acc_of(src: &str) -> i64 {
        run_src(src, Registers::new()).0.unwrap().acc
    }

    #[test]
    fn load_store_end() {
        let (res, regs, _) = run_src("CLOAD 5\nSTORE 1\nEND\n", Registers::new());
        assert_eq!(res.unwrap(), Halt { acc: 5, steps: 3 });
        assert_eq!(regs.get(1), 5);
    }

    #[test]
    fn forward_goto_skips() {
        assert_eq!(acc_of("GOTO skip\nCADD 99\nskip: END\n"), 0);
    }

    #[test]
    fn conditional_branch_taken() {
        assert_eq!(
            acc_of("CLOAD 3\nIF >= 3 GOTO done\nCADD 100\ndone: END\n"),
            3
        );
    }

    #[test]
    fn conditional_branch_not_taken() {
        assert_eq!(
            acc_of("CLOAD 2\nIF >= 3 GOTO done\nCADD 100\ndone: END\n"),
            102
        );
    }

    #[test]
    fn indirect_load() {
        let mut regs = Registers::new();
        regs.set(2, 7);
        regs.set(7, 42);
        let (res, _, _) = run_src("INDLOAD 2\nEND", regs);
        assert_eq!(res.unwrap().acc, 42);
    }

    #[test]
    fn indirect_store_and_arithmetic() {
        let src = "
            CLOAD 9
            STORE 1      # c(1) = 9
            CLOAD 3
            INDSTORE 1   # c(9) = 3
            CLOAD 10
            INDADD 1     # 10 + c(9)
            INDMUL 1     # 13 * 3
            INDSUB 1     # 39 - 3
            INDDIV 1     # 36 / 3
            END
        ";
        let (res, regs, _) = run_src(src, Registers::new());
        assert_eq!(res.unwrap().acc, 12);
        assert_eq!(regs.get(9), 3);
    }

    #[test]
    fn direct_arithmetic() {
        let regs = Registers::with_values([6, 4]);
        let (res, _, _) = run_src("LOAD 1\nADD 2\nMUL 2\nSUB 1\nDIV 2\nEND", regs);
        // ((6 + 4) * 4 - 6) / 4
        assert_eq!(res.unwrap().acc, 8);
    }

    #[test]
    fn division_truncates_toward_zero() {
        assert_eq!(acc_of("CLOAD -7\nCDIV 2\nEND"), -3);
    }

    #[test]
    fn wrapping_overflow() {
        assert_eq!(
            acc_of("CLOAD 0x7FFFFFFFFFFFFFFF\nCADD 1\nEND"),
            i64::MIN
        );
        assert_eq!(acc_of("CLOAD -9223372036854775808\nCDIV -1\nEND"), i64::MIN);
    }

    #[test]
    fn loop_counts_down() {
        let src = "
            CLOAD 0
            STORE 2
            LOAD 1
            loop:
              IF = 0 GOTO done
              CSUB 1
              STORE 1
              LOAD 2
              CADD 3
              STORE 2
              LOAD 1
              GOTO loop
            done:
              LOAD 2
              END
        ";
        let (res, _, _) = run_src(src, Registers::with_values([5]));
        assert_eq!(res.unwrap().acc, 15);
    }

    #[test]
    fn division_by_zero() {
        let (res, _, _) = run_src("CLOAD 1\nCDIV 0\nEND\n", Registers::new());
        assert!(matches!(res, Err(RunError::DivisionByZero { line: 2, .. })));
        let (res, _, _) = run_src("CLOAD 1\nDIV 5\nEND\n", Registers::new());
        assert!(matches!(res, Err(RunError::DivisionByZero { .. })));
    }

    #[test]
    fn missing_end() {
        let (res, _, _) = run_src("CLOAD 4\nCADD 1\n", Registers::new());
        assert_eq!(res, Err(RunError::MissingEnd { acc: 5 }));
        let (res, _, _) = run_src("", Registers::new());
        assert_eq!(res, Err(RunError::MissingEnd { acc: 0 }));
    }

    #[test]
    fn jump_to_trailing_label_falls_off() {
        let (res, _, _) = run_src("CLOAD 1\nGOTO out\nEND\nout:\n", Registers::new());
        assert_eq!(res, Err(RunError::MissingEnd { acc: 1 }));
    }

    #[test]
    fn unresolved_label_only_when_taken() {
        assert_eq!(acc_of("CLOAD 1\nIF = 0 GOTO nowhere\nEND"), 1);
        let (res, _, _) = run_src("CLOAD 0\nIF = 0 GOTO nowhere\nEND", Registers::new());
        assert!(matches!(
            res,
            Err(RunError::UnresolvedLabel { ref label, line: 2, .. }) if label == "nowhere"
        ));
    }

    #[test]
    fn negative_indirect_register() {
        let (res, _, _) = run_src("CLOAD -1\nSTORE 1\nINDLOAD 1\nEND", Registers::new());
        assert!(matches!(
            res,
            Err(RunError::NegativeRegister { index: -1, .. })
        ));
    }

    #[test]
    fn stores_to_far_registers() {
        let src = "
            CLOAD 1
            STORE 0x7FFFFFFFFFFFFFFF
            CLOAD 2
            STORE 10000000000
            CLOAD 3
            INDSTORE 1
            LOAD 0x7FFFFFFFFFFFFFFF
            ADD 10000000000
            INDADD 1
            END
        ";
        let (res, regs, _) = run_src(src, Registers::with_values([1_000_000_000_000]));
        assert_eq!(res.unwrap().acc, 6);
        assert_eq!(regs.get(i64::MAX as usize), 1);
        assert_eq!(regs.get(10_000_000_000), 2);
        assert_eq!(regs.get(1_000_000_000_000), 3);
        assert_eq!(regs.get(1), 1_000_000_000_000);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn dump_write_failure_is_an_error() {
        let program = assemble("DUMP 2\nEND\n").unwrap();
        let mut machine = Machine::new(&program);
        let res = machine.run(&mut BrokenPipe);
        assert!(matches!(res, Err(RunError::Output { .. })));
    }

    #[test]
    fn dump_output() {
        let (res, _, out) = run_src("CLOAD 3\nSTORE 2\nDUMP 4\nEND", Registers::new());
        assert!(res.is_ok());
        assert_eq!(
            out,
            "--- DUMP (PC: 2) ---\nc(0): \t3\nc(1): \t0\nc(2): \t3\nc(3): \t0\n"
        );
    }

    #[test]
    fn dump_zero_prints_header_only() {
        let (_, _, out) = run_src("DUMP 0\nEND", Registers::new());
        assert_eq!(out, "--- DUMP (PC: 0) ---\n");
    }

    #[test]
    fn step_limit() {
        let (res, _, _) = run_src("loop: GOTO loop\n", Registers::new());
        assert_eq!(
            res,
            Err(RunError::StepLimit {
                limit: 10_000,
                pc: 0
            })
        );
    }

    #[test]
    fn stepping_stops_after_end() {
        let program = assemble("CLOAD 1\nEND\nCLOAD 2\n").unwrap();
        let mut machine = Machine::new(&program);
        let mut out = io::sink();
        assert_eq!(machine.step(&mut out), Ok(Step::Continue));
        assert_eq!(machine.pc(), 1);
        assert_eq!(machine.step(&mut out), Ok(Step::Halted));
        assert_eq!(machine.step(&mut out), Ok(Step::Halted));
        assert_eq!(machine.acc(), 1);
        assert_eq!(machine.steps(), 2);
    }

    #[test]
    fn machines_are_independent() {
        let program = assemble("CADD 1\nSTORE 1\nEND").unwrap();
        let mut first = Machine::with_registers(&program, Registers::with_values([0]));
        let mut second = Machine::new(&program);
        first.run(&mut io::sink()).unwrap();
        first.set_trace(false);
        assert_eq!(first.registers().get(1), 1);
        assert_eq!(second.registers().get(1), 0);
        assert_eq!(second.run(&mut io::sink()).unwrap().acc, 1);
    }
}
