//! Post-parse resolution. Names that were not declared yet when an
//! expression was parsed are resolved here, so globals and functions may
//! be referenced both backward and forward. This pass also enforces the
//! checks that need the final tables: argument counts and void-ness of
//! forward calls, array/scalar coherence, and the `main` contract.

use crate::ast::{
    Callee, Expr, ExprNode, FunctionCall, LocalInit, Op, Program, Stmt, VarRef,
};
use crate::error::{ErrorKind, ParseError};

/// Light snapshot of the global tables, so function bodies can be
/// rewritten while lookups stay available.
struct Tables {
    /// (name, is_array) per global.
    globals: Vec<(String, bool)>,
    /// (name, is_void, parameter count) per function.
    functions: Vec<(String, bool, usize)>,
}

impl Tables {
    fn collect(program: &Program) -> Tables {
        Tables {
            globals: program
                .globals
                .iter()
                .map(|g| (g.name.clone(), g.ty.is_array()))
                .collect(),
            functions: program
                .functions
                .iter()
                .map(|f| (f.name.clone(), f.ret.is_void(), f.params.len()))
                .collect(),
        }
    }

    fn global(&self, name: &str) -> Option<usize> {
        self.globals.iter().position(|(n, _)| n == name)
    }

    fn function(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|(n, _, _)| n == name)
    }
}

/// (name, is_array) snapshots of the current function's parameters and
/// locals, for coherence checking while the bodies are rewritten.
struct Vars {
    params: Vec<(String, bool)>,
    locals: Vec<(String, bool)>,
}

pub fn resolve(program: &mut Program) -> Result<(), ParseError> {
    // There is exactly one void main() with zero parameters.
    match program.function("main") {
        None => return Err(ErrorKind::MissingMain.at(0)),
        Some(idx) => {
            let main = &program.functions[idx];
            if !main.ret.is_void() || !main.params.is_empty() {
                return Err(ErrorKind::MainSignature.at(main.line));
            }
        }
    }

    let tables = Tables::collect(program);
    for func in &mut program.functions {
        if func.builtin.is_some() {
            continue;
        }
        let vars = Vars {
            params: func
                .params
                .iter()
                .map(|p| (p.var.name.clone(), p.var.ty.is_array()))
                .collect(),
            locals: func
                .locals
                .iter()
                .map(|l| (l.var.name.clone(), l.var.ty.is_array()))
                .collect(),
        };
        for local in &mut func.locals {
            match &mut local.init {
                LocalInit::Scalar(expr) => resolve_expr(expr, &tables, &vars, false)?,
                LocalInit::Array(exprs) => {
                    for expr in exprs {
                        resolve_expr(expr, &tables, &vars, false)?;
                    }
                }
                LocalInit::None => {}
            }
        }
        let mut body = std::mem::take(&mut func.body);
        for stmt in &mut body {
            resolve_stmt(stmt, &tables, &vars)?;
        }
        func.body = body;
    }
    Ok(())
}

fn resolve_stmt(stmt: &mut Stmt, tables: &Tables, vars: &Vars) -> Result<(), ParseError> {
    match stmt {
        Stmt::Null | Stmt::Local(_) | Stmt::Break(_) | Stmt::Continue(_) => Ok(()),
        Stmt::Label(_) | Stmt::Goto { .. } => Ok(()),
        Stmt::Compound(stmts) => {
            for stmt in stmts {
                resolve_stmt(stmt, tables, vars)?;
            }
            Ok(())
        }
        // A void call is legal as the whole of an expression statement.
        Stmt::Expr(expr) => resolve_expr(expr, tables, vars, true),
        Stmt::VoidCall(call) => resolve_call(call, tables, vars, true),
        Stmt::If { cond, then, els } => {
            resolve_expr(cond, tables, vars, false)?;
            resolve_stmt(then, tables, vars)?;
            if let Some(els) = els {
                resolve_stmt(els, tables, vars)?;
            }
            Ok(())
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            for expr in init.iter_mut().chain(step.iter_mut()) {
                resolve_expr(expr, tables, vars, false)?;
            }
            resolve_expr(cond, tables, vars, false)?;
            resolve_stmt(body, tables, vars)
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            resolve_expr(cond, tables, vars, false)?;
            resolve_stmt(body, tables, vars)
        }
        Stmt::Return { value, line: _ } => match value {
            Some(expr) => resolve_expr(expr, tables, vars, false),
            None => Ok(()),
        },
    }
}

fn resolve_expr(
    expr: &mut Expr,
    tables: &Tables,
    vars: &Vars,
    void_root: bool,
) -> Result<(), ParseError> {
    let root_call = expr.postfix.len() == 1;
    let line = expr.line;
    for node in &mut expr.postfix {
        match node {
            ExprNode::Variable(var) => {
                if let VarRef::Pending(name) = var {
                    if let Some(idx) = tables.global(name) {
                        *var = VarRef::Global(idx);
                    } else if tables.function(name).is_some() {
                        return Err(ErrorKind::FunctionAsValue(name.clone()).at(line));
                    } else {
                        return Err(ErrorKind::Undeclared(name.clone()).at(line));
                    }
                }
            }
            ExprNode::Call(call) => {
                resolve_call(call, tables, vars, void_root && root_call)?;
            }
            _ => {}
        }
    }
    coherence(&expr.postfix, tables, vars, line)
}

fn resolve_call(
    call: &mut FunctionCall,
    tables: &Tables,
    vars: &Vars,
    may_be_void: bool,
) -> Result<(), ParseError> {
    for arg in &mut call.args {
        resolve_expr(arg, tables, vars, false)?;
    }
    if let Callee::Pending(name) = &call.callee {
        let idx = match tables.function(name) {
            Some(idx) => idx,
            None => return Err(ErrorKind::Undeclared(name.clone()).at(call.line)),
        };
        if name == "main" {
            return Err(ErrorKind::CallToMain.at(call.line));
        }
        let (_, is_void, expected) = &tables.functions[idx];
        if call.args.len() != *expected {
            return Err(
                ErrorKind::WrongArgCount(name.clone(), *expected, call.args.len()).at(call.line)
            );
        }
        if *is_void && !may_be_void {
            return Err(ErrorKind::VoidInExpression(name.clone()).at(call.line));
        }
        call.callee = Callee::Function(idx);
    }
    Ok(())
}

/// Array references may only appear as the base of `[]` or the operand
/// of `&`; everywhere a scalar is expected they are rejected. Runs on
/// the resolved postfix, so forward references are covered too.
fn coherence(
    nodes: &[ExprNode],
    tables: &Tables,
    vars: &Vars,
    line: u32,
) -> Result<(), ParseError> {
    // Stack entries carry the array's name when the operand is an array
    // variable reference.
    let mut stack: Vec<Option<String>> = Vec::new();
    let scalar = |entry: &Option<String>| -> Result<(), ParseError> {
        match entry {
            Some(name) => Err(ErrorKind::ArrayInScalarContext(name.clone()).at(line)),
            None => Ok(()),
        }
    };
    for node in nodes {
        match node {
            ExprNode::Literal(_) | ExprNode::Call(_) => stack.push(None),
            ExprNode::Variable(var) => stack.push(match var {
                VarRef::Global(idx) => {
                    let (name, is_array) = &tables.globals[*idx];
                    is_array.then(|| name.clone())
                }
                VarRef::Param(idx) => {
                    let (name, is_array) = &vars.params[*idx];
                    is_array.then(|| name.clone())
                }
                VarRef::Local(idx) => {
                    let (name, is_array) = &vars.locals[*idx];
                    is_array.then(|| name.clone())
                }
                VarRef::Pending(_) => None,
            }),
            ExprNode::Operator(op) if op.is_unary() => {
                let operand = stack.pop().expect("postfix arity checked at parse time");
                if *op != Op::AddrOf {
                    scalar(&operand)?;
                }
                stack.push(None);
            }
            ExprNode::Operator(op) => {
                let rhs = stack.pop().expect("postfix arity checked at parse time");
                let lhs = stack.pop().expect("postfix arity checked at parse time");
                scalar(&rhs)?;
                if *op != Op::Subscript {
                    scalar(&lhs)?;
                }
                stack.push(None);
            }
        }
    }
    Ok(())
}
