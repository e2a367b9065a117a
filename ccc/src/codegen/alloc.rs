//! Register and stack allocation, run once per function at code-gen
//! entry, after the IR is fully built.

use crate::ast::{Function, Storage};
use arch::Reg;

/// Frame layout for one function.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Callee-saved registers handed to locals, in push order. The
    /// frame pointer is pushed separately after these.
    pub saved: Vec<Reg>,
    /// Total bytes of frame storage reserved past the frame pointer:
    /// spilled local slots, array data regions, and entry-spill slots
    /// for address-taken register parameters.
    pub size: i32,
    /// (entry register, frame offset) pairs for register parameters
    /// whose address is taken; the prologue stores them out.
    pub spills: Vec<(Reg, i32)>,
}

pub fn allocate(func: &mut Function) -> Frame {
    // Parameters are placed positionally: the first four in A..D, the
    // fifth onward at preliminary offsets -2, -4, ... below the frame
    // pointer (one machine word each).
    for (i, param) in func.params.iter_mut().enumerate() {
        if i < Reg::ARGS {
            let reg = Reg::arg(i);
            param.entry_reg = Some(reg);
            param.var.storage = Storage::Reg(reg);
        } else {
            param.var.storage = Storage::Frame(-2 * (i as i32 - 3));
        }
    }

    // Locals get E..K in declaration order, unless their address is
    // taken; the rest spill to offsets 0, 2, 4, ...
    let mut saved = Vec::new();
    let mut next_offset: i32 = 0;
    for local in func.locals.iter_mut() {
        if !local.var.address_taken && saved.len() < Reg::LOCALS {
            let reg = Reg::local(saved.len());
            local.var.storage = Storage::Reg(reg);
            saved.push(reg);
        } else {
            local.var.storage = Storage::Frame(next_offset);
            next_offset += 2;
        }
    }

    // Array locals own a data region after the slots; the slot holds
    // the region's address, so indexing lowers identically for any
    // storage class.
    for local in func.locals.iter_mut() {
        if let Some(len) = local.var.ty.array {
            local.data_offset = Some(next_offset);
            next_offset += 2 * len as i32;
        }
    }

    // A register parameter whose address is taken is additionally
    // spilled to a fresh slot at entry.
    let mut spills = Vec::new();
    for param in func.params.iter_mut() {
        if param.var.address_taken {
            if let Some(reg) = param.entry_reg {
                param.var.storage = Storage::Frame(next_offset);
                spills.push((reg, next_offset));
                next_offset += 2;
            }
        }
    }

    // Stack-resident parameters sit below the pushed return address,
    // callee-saved registers and frame pointer; lower their preliminary
    // offsets so they stay correct relative to FP.
    let adjust = 2 * (saved.len() as i32 + 2);
    for param in func.params.iter_mut() {
        if param.entry_reg.is_none() {
            if let Storage::Frame(offset) = param.var.storage {
                param.var.storage = Storage::Frame(offset - adjust);
            }
        }
    }

    Frame {
        saved,
        size: next_offset,
        spills,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Local, LocalInit, Param, Type, Variable};

    fn func_with(params: usize, locals: usize) -> Function {
        let mut func = Function::new(Type::VOID, "f", 1);
        for i in 0..params {
            func.params.push(Param::new(Variable::new(
                &format!("p{}", i),
                Type::UINT16,
            )));
        }
        for i in 0..locals {
            func.locals.push(Local {
                var: Variable::new(&format!("v{}", i), Type::UINT16),
                init: LocalInit::None,
                data_offset: None,
            });
        }
        func
    }

    #[test]
    fn parameters_fill_registers_then_stack() {
        let mut func = func_with(6, 0);
        let frame = allocate(&mut func);
        assert_eq!(func.params[0].var.storage, Storage::Reg(Reg::A));
        assert_eq!(func.params[3].var.storage, Storage::Reg(Reg::D));
        // No callee-saved pushes, so the preliminary -2, -4 move down
        // past the return address and frame pointer.
        assert_eq!(func.params[4].var.storage, Storage::Frame(-6));
        assert_eq!(func.params[5].var.storage, Storage::Frame(-8));
        assert!(frame.saved.is_empty());
        assert_eq!(frame.size, 0);
    }

    #[test]
    fn locals_fill_registers_then_frame() {
        let mut func = func_with(0, 9);
        let frame = allocate(&mut func);
        assert_eq!(func.locals[0].var.storage, Storage::Reg(Reg::E));
        assert_eq!(func.locals[6].var.storage, Storage::Reg(Reg::K));
        assert_eq!(func.locals[7].var.storage, Storage::Frame(0));
        assert_eq!(func.locals[8].var.storage, Storage::Frame(2));
        assert_eq!(frame.saved.len(), 7);
        assert_eq!(frame.size, 4);
    }

    #[test]
    fn address_taken_local_is_excluded_from_registers() {
        let mut func = func_with(0, 2);
        func.locals[0].var.address_taken = true;
        let frame = allocate(&mut func);
        assert_eq!(func.locals[0].var.storage, Storage::Frame(0));
        assert_eq!(func.locals[1].var.storage, Storage::Reg(Reg::E));
        assert_eq!(frame.saved, vec![Reg::E]);
    }

    #[test]
    fn address_taken_register_parameter_spills() {
        let mut func = func_with(2, 0);
        func.params[1].var.address_taken = true;
        let frame = allocate(&mut func);
        assert_eq!(func.params[1].entry_reg, Some(Reg::B));
        assert_eq!(func.params[1].var.storage, Storage::Frame(0));
        assert_eq!(frame.spills, vec![(Reg::B, 0)]);
        assert_eq!(frame.size, 2);
    }

    #[test]
    fn array_local_gets_a_data_region() {
        let mut func = func_with(0, 1);
        func.locals[0].var.ty = Type {
            base: crate::ast::Base::Uint16,
            array: Some(3),
        };
        let frame = allocate(&mut func);
        // The slot is register-resident; the data region starts at 0.
        assert_eq!(func.locals[0].var.storage, Storage::Reg(Reg::E));
        assert_eq!(func.locals[0].data_offset, Some(0));
        assert_eq!(frame.size, 6);
    }
}
