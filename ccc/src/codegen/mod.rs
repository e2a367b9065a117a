//! Code generation: a single walk over the validated IR emitting the
//! textual listing. The output starts with the bootloader, then global
//! data words, then each function; a final label marks the top of the
//! runtime stack.

pub mod alloc;
mod expr;
pub mod labels;
pub mod writer;

use crate::ast::{Function, LocalInit, Program, Stmt, Storage};
use alloc::Frame;
use arch::{Imm, Inst, Reg, INST_SIZE};
use expr::Dest;
use indexmap::IndexMap;
use labels::LabelBook;
use std::io::{self, Write};
use writer::Writer;

pub fn generate<W: Write>(program: &mut Program, out: W) -> io::Result<()> {
    // Storage assignment runs first, once per function.
    let frames: Vec<Option<Frame>> = program
        .functions
        .iter_mut()
        .map(|func| {
            if func.builtin.is_none() {
                Some(alloc::allocate(func))
            } else {
                None
            }
        })
        .collect();

    // Function and global labels are their source names. Registering
    // them up front keeps every label minted later unique against them.
    let mut book = LabelBook::new();
    let func_labels: Vec<String> = program
        .functions
        .iter()
        .map(|func| {
            if func.builtin.is_none() {
                book.unique(&func.name)
            } else {
                func.name.clone()
            }
        })
        .collect();
    for global in &program.globals {
        book.unique(&global.name);
    }
    let finish_label = book.unique("program_finished");
    let stack_label = book.unique("stack");

    let mut gen = CodeGen {
        writer: Writer::new(out),
        book,
        program,
        func_labels,
    };
    gen.bootloader(&finish_label, &stack_label)?;
    gen.globals()?;
    for (idx, frame) in frames.iter().enumerate() {
        if let Some(frame) = frame {
            gen.function(idx, frame)?;
        }
    }
    gen.writer.label(&stack_label)?;
    gen.writer.finish()
}

pub(crate) struct CodeGen<'a, W: Write> {
    pub(crate) writer: Writer<W>,
    pub(crate) book: LabelBook,
    pub(crate) program: &'a Program,
    pub(crate) func_labels: Vec<String>,
}

/// Per-function state while emitting statements.
struct FuncState<'a> {
    func: &'a Function,
    end_label: String,
    /// Source label to assembly label.
    labels: IndexMap<String, String>,
    /// (continue, break) targets of the enclosing loops.
    loops: Vec<(String, String)>,
}

impl<'a, W: Write> CodeGen<'a, W> {
    /// Execution begins by setting up the stack and calling main; a
    /// returning main lands on the self-jump.
    fn bootloader(&mut self, finish: &str, stack: &str) -> io::Result<()> {
        let main = self
            .program
            .function("main")
            .expect("resolver requires a main function");
        let main_label = self.func_labels[main].clone();
        self.writer
            .inst(Inst::MOVI(Reg::SP, Imm::Label(stack.to_string())))?;
        self.writer.inst(Inst::CALL(main_label))?;
        self.writer.label(finish)?;
        self.writer.inst(Inst::JMPI(finish.to_string()))
    }

    /// Scalars are one data word; arrays are the address of the body
    /// followed by the body values.
    fn globals(&mut self) -> io::Result<()> {
        let program = self.program;
        for global in &program.globals {
            self.writer.label(&global.name)?;
            if global.ty.is_array() {
                let body = self.writer.pos() + INST_SIZE;
                self.writer.data(body)?;
                for value in &global.values {
                    self.writer.data(*value)?;
                }
            } else {
                self.writer.data(global.value)?;
            }
        }
        Ok(())
    }

    fn function(&mut self, idx: usize, frame: &Frame) -> io::Result<()> {
        let program = self.program;
        let func = &program.functions[idx];
        let label = self.func_labels[idx].clone();
        self.writer.label(&label)?;

        // Callee-saved discipline: push the registers handed to locals,
        // then the caller's frame pointer, then claim the frame.
        let mut saved = frame.saved.clone();
        for reg in &frame.saved {
            self.writer.inst(Inst::PUSH(*reg))?;
        }
        self.writer.inst(Inst::PUSH(Reg::FP))?;
        saved.push(Reg::FP);
        self.writer.inst(Inst::MOV(Reg::FP, Reg::SP))?;

        // Register parameters whose address is taken move to memory.
        for (reg, offset) in &frame.spills {
            self.frame_address(*offset, Reg::M)?;
            self.writer.inst(Inst::STOR(*reg, Reg::M))?;
        }

        // Reserve frame storage for locals and array data.
        if frame.size > 0 {
            self.writer
                .inst(Inst::MOVI(Reg::M, Imm::Val(frame.size as u16)))?;
            self.writer.inst(Inst::ADD(Reg::SP, Reg::M))?;
        }

        let mut state = FuncState {
            func,
            end_label: self.book.unique(&format!("{}_end", func.name)),
            labels: IndexMap::new(),
            loops: Vec::new(),
        };
        for (label, _) in &func.labels {
            let asm = self.book.unique(&format!("{}_{}", func.name, label));
            state.labels.insert(label.clone(), asm);
        }

        self.local_inits(func)?;

        for stmt in &func.body {
            self.stmt(&mut state, stmt)?;
        }

        // The epilogue runs exactly once; returns jump here.
        self.writer.label(&state.end_label)?;
        self.writer.inst(Inst::MOV(Reg::SP, Reg::FP))?;
        for reg in saved.iter().rev() {
            self.writer.inst(Inst::POP(*reg))?;
        }
        let overflow = 2 * func.params.len().saturating_sub(Reg::ARGS) as u16;
        self.writer.inst(Inst::RET(match overflow {
            0 => None,
            n => Some(n),
        }))
    }

    /// Array locals first write their data address into their slot,
    /// then initialize element by element; scalars evaluate straight
    /// into their storage.
    fn local_inits(&mut self, func: &'a Function) -> io::Result<()> {
        for local in &func.locals {
            if let Some(data_offset) = local.data_offset {
                match local.var.storage {
                    Storage::Reg(reg) => self.frame_address(data_offset, reg)?,
                    Storage::Frame(slot) => {
                        self.frame_address(data_offset, Reg::M)?;
                        self.frame_address(slot, Reg::L)?;
                        self.writer.inst(Inst::STOR(Reg::M, Reg::L))?;
                    }
                    Storage::Unassigned => unreachable!("storage assigned by the allocator"),
                }
                if let LocalInit::Array(exprs) = &local.init {
                    for (i, elem) in exprs.iter().enumerate() {
                        let operand = self.eval(func, elem)?;
                        self.value_to_reg(operand, Reg::N)?;
                        self.frame_address(data_offset + 2 * i as i32, Reg::M)?;
                        self.writer.inst(Inst::STOR(Reg::N, Reg::M))?;
                    }
                }
            } else if let LocalInit::Scalar(expr) = &local.init {
                let dest = match local.var.storage {
                    Storage::Reg(reg) => Dest::Reg(reg),
                    Storage::Frame(offset) => Dest::Frame(offset),
                    Storage::Unassigned => unreachable!("storage assigned by the allocator"),
                };
                self.eval_to(func, expr, dest)?;
            }
        }
        Ok(())
    }

    fn stmt(&mut self, state: &mut FuncState<'a>, stmt: &'a Stmt) -> io::Result<()> {
        match stmt {
            Stmt::Null | Stmt::Local(_) => Ok(()),

            Stmt::Compound(stmts) => {
                for stmt in stmts {
                    self.stmt(state, stmt)?;
                }
                Ok(())
            }

            Stmt::Expr(expr) => {
                let operand = self.eval(state.func, expr)?;
                self.discard(operand)
            }

            Stmt::VoidCall(call) => {
                let operand = self.emit_call(state.func, call)?;
                self.discard(operand)
            }

            Stmt::If { cond, then, els } => {
                let false_label = self.book.unique("if_false");
                let end_label = self.book.unique("if_end");
                self.eval_to(state.func, cond, Dest::Reg(Reg::L))?;
                self.writer.inst(Inst::TST(Reg::L, Reg::L))?;
                self.writer.inst(Inst::JEQ(false_label.clone()))?;
                self.stmt(state, then)?;
                self.writer.inst(Inst::JMPI(end_label.clone()))?;
                self.writer.label(&false_label)?;
                if let Some(els) = els {
                    self.stmt(state, els)?;
                }
                self.writer.label(&end_label)
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                for expr in init {
                    let operand = self.eval(state.func, expr)?;
                    self.discard(operand)?;
                }
                let start = self.book.unique("for_start");
                let cont = self.book.unique("for_continue");
                let brk = self.book.unique("for_break");
                self.writer.label(&start)?;
                self.eval_to(state.func, cond, Dest::Reg(Reg::L))?;
                self.writer.inst(Inst::TST(Reg::L, Reg::L))?;
                self.writer.inst(Inst::JEQ(brk.clone()))?;
                state.loops.push((cont.clone(), brk.clone()));
                self.stmt(state, body)?;
                state.loops.pop();
                self.writer.label(&cont)?;
                for expr in step {
                    let operand = self.eval(state.func, expr)?;
                    self.discard(operand)?;
                }
                self.writer.inst(Inst::JMPI(start))?;
                self.writer.label(&brk)
            }

            Stmt::While { cond, body } => {
                let cont = self.book.unique("while_continue");
                let brk = self.book.unique("while_break");
                self.writer.label(&cont)?;
                self.eval_to(state.func, cond, Dest::Reg(Reg::L))?;
                self.writer.inst(Inst::TST(Reg::L, Reg::L))?;
                self.writer.inst(Inst::JEQ(brk.clone()))?;
                state.loops.push((cont.clone(), brk.clone()));
                self.stmt(state, body)?;
                state.loops.pop();
                self.writer.inst(Inst::JMPI(cont))?;
                self.writer.label(&brk)
            }

            // The continue label sits before the body, so a continue
            // restarts the body without retesting the condition.
            Stmt::DoWhile { body, cond } => {
                let cont = self.book.unique("do_while_continue");
                let brk = self.book.unique("do_while_break");
                self.writer.label(&cont)?;
                state.loops.push((cont.clone(), brk.clone()));
                self.stmt(state, body)?;
                state.loops.pop();
                self.eval_to(state.func, cond, Dest::Reg(Reg::L))?;
                self.writer.inst(Inst::TST(Reg::L, Reg::L))?;
                self.writer.inst(Inst::JNE(cont))?;
                self.writer.label(&brk)
            }

            Stmt::Break(_) => {
                let (_, brk) = state.loops.last().expect("parser rejects break outside loops");
                self.writer.inst(Inst::JMPI(brk.clone()))
            }

            Stmt::Continue(_) => {
                let (cont, _) = state.loops.last().expect("parser rejects continue outside loops");
                self.writer.inst(Inst::JMPI(cont.clone()))
            }

            Stmt::Return { value, .. } => {
                if let Some(expr) = value {
                    self.eval_to(state.func, expr, Dest::Reg(Reg::L))?;
                }
                self.writer.inst(Inst::JMPI(state.end_label.clone()))
            }

            Stmt::Label(name) => {
                let asm = state
                    .labels
                    .get(name)
                    .expect("labels assigned before the body")
                    .clone();
                self.writer.label(&asm)
            }

            Stmt::Goto { label, .. } => {
                let asm = state
                    .labels
                    .get(label)
                    .expect("gotos checked against labels at parse time")
                    .clone();
                self.writer.inst(Inst::JMPI(asm))
            }
        }
    }
}
