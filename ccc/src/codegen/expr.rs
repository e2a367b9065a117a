//! Expression lowering: a postfix walk pushing operand descriptors that
//! mirror the runtime value stack. Operands resolve into the scratch
//! registers M and N, results land in M (L for modulo) and are pushed
//! for the next consumer; the writer's peephole elides the pairs that
//! cancel out.

use super::CodeGen;
use crate::ast::{
    walk_postfix, Builtin, Callee, Expr, Function, FunctionCall, Op, PostfixVisitor, Storage,
    VarRef,
};
use arch::{Imm, Inst, Reg, Src};
use std::io::{self, Write};

/// Compile-time descriptor of where an operand lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operand {
    /// An address sits on the runtime stack.
    Address,
    /// A value sits on the runtime stack.
    Value,
    /// The value lives in a variable's register.
    Register(Reg),
    Literal(u16),
}

/// Destination of a finished expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dest {
    Reg(Reg),
    Frame(i32),
}

impl<'a, W: Write> CodeGen<'a, W> {
    /// Evaluates an expression, leaving its operand descriptor.
    pub(crate) fn eval(&mut self, func: &'a Function, expr: &Expr) -> io::Result<Operand> {
        let mut emitter = Emitter { gen: self, func };
        walk_postfix(&expr.postfix, &mut emitter)
    }

    /// Evaluates an expression into a named register or frame slot.
    pub(crate) fn eval_to(
        &mut self,
        func: &'a Function,
        expr: &Expr,
        dest: Dest,
    ) -> io::Result<()> {
        let operand = self.eval(func, expr)?;
        match dest {
            Dest::Reg(reg) => self.value_to_reg(operand, reg),
            Dest::Frame(offset) => {
                self.value_to_reg(operand, Reg::N)?;
                self.frame_address(offset, Reg::M)?;
                self.writer.inst(Inst::STOR(Reg::N, Reg::M))
            }
        }
    }

    /// Puts the operand's value in the given register. Only requires
    /// the use of the one register.
    pub(crate) fn value_to_reg(&mut self, operand: Operand, reg: Reg) -> io::Result<()> {
        match operand {
            Operand::Address => {
                self.writer.inst(Inst::POP(reg))?;
                self.writer.inst(Inst::LOAD(reg, reg))
            }
            Operand::Value => self.writer.inst(Inst::POP(reg)),
            Operand::Register(src) => self.writer.inst(Inst::MOV(reg, src)),
            Operand::Literal(value) => self.writer.inst(Inst::MOVI(reg, Imm::Val(value))),
        }
    }

    /// Drops an unused result, rebalancing the runtime stack.
    pub(crate) fn discard(&mut self, operand: Operand) -> io::Result<()> {
        match operand {
            Operand::Address | Operand::Value => self.writer.inst(Inst::POP(Reg::L)),
            Operand::Register(_) | Operand::Literal(_) => Ok(()),
        }
    }

    /// Leaves `FP + offset` in the given register.
    pub(crate) fn frame_address(&mut self, offset: i32, reg: Reg) -> io::Result<()> {
        self.writer.inst(Inst::MOVI(reg, Imm::Val(offset as u16)))?;
        self.writer.inst(Inst::ADD(reg, Reg::FP))
    }

    /// Normalizes a register to 0 or 1. Both operands of `&&`/`||` are
    /// always evaluated; there is no short circuit.
    fn normalize_bool(&mut self, reg: Reg) -> io::Result<()> {
        let done = self.book.unique("bool_done");
        self.writer.inst(Inst::TST(reg, reg))?;
        self.writer.inst(Inst::MOVI(reg, Imm::Val(1)))?;
        self.writer.inst(Inst::JNE(done.clone()))?;
        self.writer.inst(Inst::MOVI(reg, Imm::Val(0)))?;
        self.writer.label(&done)
    }

    /// The general call sequence: save the argument-register window,
    /// place the first four arguments in A..D, push the rest in reverse
    /// order, call, restore. The result arrives in L.
    pub(crate) fn emit_call(
        &mut self,
        func: &'a Function,
        call: &FunctionCall,
    ) -> io::Result<Operand> {
        let idx = match &call.callee {
            Callee::Function(idx) => *idx,
            Callee::Pending(_) => unreachable!("calls are resolved before code generation"),
        };
        let program = self.program;
        let callee = &program.functions[idx];
        if let Some(builtin) = callee.builtin {
            return self.emit_builtin(func, builtin, call);
        }

        let argc = call.args.len();
        let window = argc.min(Reg::ARGS);
        for i in 0..window {
            self.writer.inst(Inst::PUSH(Reg::arg(i)))?;
        }
        for i in 0..window {
            self.eval_to(func, &call.args[i], Dest::Reg(Reg::arg(i)))?;
        }
        // Overflow arguments go on the stack in reverse order, so the
        // callee sees them in source order below its frame pointer.
        for i in (Reg::ARGS..argc).rev() {
            self.eval_to(func, &call.args[i], Dest::Reg(Reg::L))?;
            self.writer.inst(Inst::PUSH(Reg::L))?;
        }
        self.writer.inst(Inst::CALL(self.func_labels[idx].clone()))?;
        for i in (0..window).rev() {
            self.writer.inst(Inst::POP(Reg::arg(i)))?;
        }
        if callee.ret.is_void() {
            Ok(Operand::Literal(0))
        } else {
            self.writer.inst(Inst::PUSH(Reg::L))?;
            Ok(Operand::Value)
        }
    }

    /// Builtins lower to their single device instruction instead of a
    /// call.
    fn emit_builtin(
        &mut self,
        func: &'a Function,
        builtin: Builtin,
        call: &FunctionCall,
    ) -> io::Result<Operand> {
        match builtin {
            Builtin::Color => {
                let c = self.eval(func, &call.args[0])?;
                self.value_to_reg(c, Reg::M)?;
                self.writer.inst(Inst::COLOR(Reg::M))?;
                Ok(Operand::Literal(0))
            }
            Builtin::Pixel => {
                let x = self.eval(func, &call.args[0])?;
                let y = self.eval(func, &call.args[1])?;
                self.value_to_reg(y, Reg::N)?;
                self.value_to_reg(x, Reg::M)?;
                self.writer.inst(Inst::PIXEL(Reg::M, Reg::N))?;
                Ok(Operand::Literal(0))
            }
            Builtin::Timerst => {
                self.writer.inst(Inst::TIMERST)?;
                Ok(Operand::Literal(0))
            }
            Builtin::Time => {
                self.writer.inst(Inst::TIME(Reg::L))?;
                self.writer.inst(Inst::PUSH(Reg::L))?;
                Ok(Operand::Value)
            }
            Builtin::Input => {
                let id = self.eval(func, &call.args[0])?;
                self.value_to_reg(id, Reg::M)?;
                self.writer.inst(Inst::INPUT(Reg::L, Reg::M))?;
                self.writer.inst(Inst::PUSH(Reg::L))?;
                Ok(Operand::Value)
            }
            Builtin::Rnd => {
                self.writer.inst(Inst::RND(Reg::L))?;
                self.writer.inst(Inst::PUSH(Reg::L))?;
                Ok(Operand::Value)
            }
        }
    }
}

struct Emitter<'g, 'a, W: Write> {
    gen: &'g mut CodeGen<'a, W>,
    func: &'a Function,
}

impl<'g, 'a, W: Write> PostfixVisitor for Emitter<'g, 'a, W> {
    type Operand = Operand;
    type Error = io::Error;

    fn literal(&mut self, value: u16) -> io::Result<Operand> {
        // Kept as a descriptor; materialized lazily via MOVI.
        Ok(Operand::Literal(value))
    }

    /// Register-resident variables stay implicit in their register;
    /// everything else pushes its address.
    fn variable(&mut self, var: &VarRef) -> io::Result<Operand> {
        let storage = match var {
            VarRef::Global(idx) => {
                let name = self.gen.program.globals[*idx].name.clone();
                self.gen
                    .writer
                    .inst(Inst::MOVI(Reg::L, Imm::Label(name)))?;
                self.gen.writer.inst(Inst::PUSH(Reg::L))?;
                return Ok(Operand::Address);
            }
            VarRef::Param(idx) => self.func.params[*idx].var.storage,
            VarRef::Local(idx) => self.func.locals[*idx].var.storage,
            VarRef::Pending(_) => unreachable!("names are resolved before code generation"),
        };
        match storage {
            Storage::Reg(reg) => Ok(Operand::Register(reg)),
            Storage::Frame(offset) => {
                self.gen.frame_address(offset, Reg::L)?;
                self.gen.writer.inst(Inst::PUSH(Reg::L))?;
                Ok(Operand::Address)
            }
            Storage::Unassigned => unreachable!("storage assigned by the allocator"),
        }
    }

    fn call(&mut self, call: &FunctionCall) -> io::Result<Operand> {
        self.gen.emit_call(self.func, call)
    }

    fn unary(&mut self, op: Op, operand: Operand) -> io::Result<Operand> {
        match op {
            Op::Pos => Ok(operand),

            Op::Neg => {
                self.gen.value_to_reg(operand, Reg::M)?;
                self.gen.writer.inst(Inst::MOVI(Reg::N, Imm::Val(0xffff)))?;
                self.gen.writer.inst(Inst::XOR(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::MOVI(Reg::N, Imm::Val(1)))?;
                self.gen.writer.inst(Inst::ADD(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            Op::BitNot => {
                self.gen.value_to_reg(operand, Reg::M)?;
                self.gen.writer.inst(Inst::MOVI(Reg::N, Imm::Val(0xffff)))?;
                self.gen.writer.inst(Inst::XOR(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            Op::Not => {
                self.gen.value_to_reg(operand, Reg::M)?;
                let done = self.gen.book.unique("not_done");
                self.gen.writer.inst(Inst::TST(Reg::M, Reg::M))?;
                self.gen.writer.inst(Inst::MOVI(Reg::M, Imm::Val(1)))?;
                self.gen.writer.inst(Inst::JEQ(done.clone()))?;
                self.gen.writer.inst(Inst::MOVI(Reg::M, Imm::Val(0)))?;
                self.gen.writer.label(&done)?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            // The value on the stack is reinterpreted as an address; a
            // stack-resident value needs no instruction at all.
            Op::Deref => match operand {
                Operand::Value => Ok(Operand::Address),
                Operand::Address => {
                    self.gen.value_to_reg(Operand::Address, Reg::M)?;
                    self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                    Ok(Operand::Address)
                }
                Operand::Register(reg) => {
                    self.gen.writer.inst(Inst::PUSH(reg))?;
                    Ok(Operand::Address)
                }
                Operand::Literal(value) => {
                    self.gen.writer.inst(Inst::MOVI(Reg::M, Imm::Val(value)))?;
                    self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                    Ok(Operand::Address)
                }
            },

            // The address on the stack becomes a plain value.
            Op::AddrOf => match operand {
                Operand::Address => Ok(Operand::Value),
                _ => unreachable!("address-taken variables are memory resident"),
            },

            _ => unreachable!("not a unary operator"),
        }
    }

    fn binary(&mut self, op: Op, lhs: Operand, rhs: Operand) -> io::Result<Operand> {
        match op {
            Op::Assign => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                match lhs {
                    Operand::Address => {
                        self.gen.writer.inst(Inst::POP(Reg::M))?;
                        self.gen.writer.inst(Inst::STOR(Reg::N, Reg::M))?;
                    }
                    Operand::Register(reg) => {
                        self.gen.writer.inst(Inst::MOV(reg, Reg::N))?;
                    }
                    _ => unreachable!("assignment targets are lvalue checked"),
                }
                self.gen.writer.inst(Inst::PUSH(Reg::N))?;
                Ok(Operand::Value)
            }

            Op::Subscript => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                self.gen.value_to_reg(lhs, Reg::M)?;
                self.gen.writer.inst(Inst::SHL(Reg::N, Src::Val(1)))?;
                self.gen.writer.inst(Inst::ADD(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Address)
            }

            Op::Mod => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                self.gen.value_to_reg(lhs, Reg::M)?;
                self.gen.writer.inst(Inst::MOV(Reg::L, Reg::M))?;
                self.gen.writer.inst(Inst::DIV(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::MUL(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::SUB(Reg::L, Reg::M))?;
                self.gen.writer.inst(Inst::PUSH(Reg::L))?;
                Ok(Operand::Value)
            }

            Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::BitAnd
            | Op::BitOr
            | Op::BitXor
            | Op::Shl
            | Op::Shr => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                self.gen.value_to_reg(lhs, Reg::M)?;
                let inst = match op {
                    Op::Add => Inst::ADD(Reg::M, Reg::N),
                    Op::Sub => Inst::SUB(Reg::M, Reg::N),
                    Op::Mul => Inst::MUL(Reg::M, Reg::N),
                    Op::Div => Inst::DIV(Reg::M, Reg::N),
                    Op::BitAnd => Inst::AND(Reg::M, Reg::N),
                    Op::BitOr => Inst::OR(Reg::M, Reg::N),
                    Op::BitXor => Inst::XOR(Reg::M, Reg::N),
                    Op::Shl => Inst::SHL(Reg::M, Src::Reg(Reg::N)),
                    Op::Shr => Inst::SHRL(Reg::M, Src::Reg(Reg::N)),
                    _ => unreachable!(),
                };
                self.gen.writer.inst(inst)?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            Op::Lt | Op::Le | Op::Gt | Op::Ge | Op::Eq | Op::Ne => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                self.gen.value_to_reg(lhs, Reg::M)?;
                let done = self.gen.book.unique("cmp_done");
                self.gen.writer.inst(Inst::CMP(Reg::M, Reg::N))?;
                self.gen.writer.inst(Inst::MOVI(Reg::M, Imm::Val(1)))?;
                let jump = match op {
                    Op::Lt => Inst::JB(done.clone()),
                    Op::Le => Inst::JBE(done.clone()),
                    Op::Gt => Inst::JA(done.clone()),
                    Op::Ge => Inst::JAE(done.clone()),
                    Op::Eq => Inst::JEQ(done.clone()),
                    Op::Ne => Inst::JNE(done.clone()),
                    _ => unreachable!(),
                };
                self.gen.writer.inst(jump)?;
                self.gen.writer.inst(Inst::MOVI(Reg::M, Imm::Val(0)))?;
                self.gen.writer.label(&done)?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            Op::LogAnd | Op::LogOr => {
                self.gen.value_to_reg(rhs, Reg::N)?;
                self.gen.value_to_reg(lhs, Reg::M)?;
                self.gen.normalize_bool(Reg::M)?;
                self.gen.normalize_bool(Reg::N)?;
                let inst = if op == Op::LogAnd {
                    Inst::AND(Reg::M, Reg::N)
                } else {
                    Inst::OR(Reg::M, Reg::N)
                };
                self.gen.writer.inst(inst)?;
                self.gen.writer.inst(Inst::PUSH(Reg::M))?;
                Ok(Operand::Value)
            }

            _ => unreachable!("not a binary operator"),
        }
    }
}
