//! Infix to postfix expression parsing (shunting-yard), followed by the
//! three postfix passes: lvalue validation, address-taken flagging and
//! constant folding.

use super::Parser;
use crate::ast::{
    postfix_well_formed, walk_postfix, Callee, Expr, ExprNode, Function, FunctionCall, Global, Op,
    PostfixVisitor, VarRef,
};
use crate::error::{ErrorKind, ParseError, WarnKind, Warning};
use crate::ident;

/// What the previous atom contributed, for unary/binary disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev {
    None,
    Open,
    Op,
    Val,
    Close,
}

/// Operator stack entry: an operator, or an open paren/bracket marker.
enum StackOp {
    Op(Op),
    Open(char),
}

impl Parser {
    /// Parses one expression from the token stream. Stops without
    /// consuming the first atom that cannot extend the expression.
    pub(super) fn parse_expr(
        &mut self,
        mut scope: Option<&mut Function>,
    ) -> Result<Expr, ParseError> {
        let line = self.tokens.peek().line;
        let mut output: Vec<ExprNode> = Vec::new();
        let mut ops: Vec<StackOp> = Vec::new();
        let mut parens: Vec<char> = Vec::new();
        let mut prev = Prev::None;

        loop {
            let atom = self.tokens.peek();
            if atom.empty() {
                break;
            }
            match atom.text.as_str() {
                ";" | "{" | "}" => break,
                "," => {
                    if parens.is_empty() {
                        break;
                    }
                    return Err(ErrorKind::UnexpectedAtom(",".into()).at(atom.line));
                }
                "(" => {
                    if !matches!(prev, Prev::None | Prev::Open | Prev::Op) {
                        break;
                    }
                    self.tokens.next();
                    ops.push(StackOp::Open('('));
                    parens.push('(');
                    prev = Prev::Open;
                }
                ")" => {
                    if parens.is_empty() {
                        break;
                    }
                    if parens.last() == Some(&'[') {
                        return Err(
                            ErrorKind::UnexpectedToken(")".into(), "]".into()).at(atom.line)
                        );
                    }
                    if prev == Prev::Op || prev == Prev::Open {
                        return Err(ErrorKind::UnexpectedAtom(")".into()).at(atom.line));
                    }
                    self.tokens.next();
                    parens.pop();
                    while let Some(top) = ops.pop() {
                        match top {
                            StackOp::Op(op) => output.push(ExprNode::Operator(op)),
                            StackOp::Open(_) => break,
                        }
                    }
                    prev = Prev::Close;
                }
                "[" => {
                    // Subscript: binds tightest, so nothing pops first.
                    if !matches!(prev, Prev::Val | Prev::Close) {
                        return Err(ErrorKind::UnexpectedAtom("[".into()).at(atom.line));
                    }
                    self.tokens.next();
                    ops.push(StackOp::Open('['));
                    parens.push('[');
                    prev = Prev::Open;
                }
                "]" => {
                    if parens.last() != Some(&'[') {
                        break;
                    }
                    if prev == Prev::Op || prev == Prev::Open {
                        return Err(ErrorKind::UnexpectedAtom("]".into()).at(atom.line));
                    }
                    self.tokens.next();
                    parens.pop();
                    while let Some(top) = ops.pop() {
                        match top {
                            StackOp::Op(op) => output.push(ExprNode::Operator(op)),
                            StackOp::Open(_) => break,
                        }
                    }
                    output.push(ExprNode::Operator(Op::Subscript));
                    prev = Prev::Close;
                }
                text if Op::is_operator(text) => {
                    let op = match prev {
                        Prev::Val | Prev::Close => match Op::binary(text) {
                            Some(op) => op,
                            None => {
                                return Err(
                                    ErrorKind::UnexpectedAtom(text.to_string()).at(atom.line)
                                )
                            }
                        },
                        Prev::None | Prev::Open | Prev::Op => match Op::unary(text) {
                            Some(op) => op,
                            None => {
                                return Err(
                                    ErrorKind::UnexpectedAtom(text.to_string()).at(atom.line)
                                )
                            }
                        },
                    };
                    self.tokens.next();
                    while let Some(StackOp::Op(top)) = ops.last() {
                        let pop = if op.left_to_right() {
                            top.precedence() <= op.precedence()
                        } else {
                            top.precedence() < op.precedence()
                        };
                        if !pop {
                            break;
                        }
                        output.push(ExprNode::Operator(*top));
                        ops.pop();
                    }
                    ops.push(StackOp::Op(op));
                    prev = Prev::Op;
                }
                text => {
                    if !matches!(prev, Prev::None | Prev::Open | Prev::Op) {
                        // Two values in a row: the expression ends here.
                        break;
                    }
                    let first = text.chars().next().unwrap_or(' ');
                    if first.is_ascii_digit() {
                        let value = match ident::parse_literal(text) {
                            Some(value) => value,
                            None => {
                                return Err(
                                    ErrorKind::InvalidLiteral(text.to_string()).at(atom.line)
                                )
                            }
                        };
                        self.tokens.next();
                        output.push(ExprNode::Literal(value));
                    } else if ident::is_reserved(text) {
                        return Err(ErrorKind::UnexpectedAtom(text.to_string()).at(atom.line));
                    } else if ident::is_valid_name(text) {
                        let name = text.to_string();
                        self.tokens.next();
                        let node = self.name_node(&name, atom.line, scope.as_deref_mut())?;
                        output.push(node);
                    } else {
                        return Err(ErrorKind::UnexpectedAtom(text.to_string()).at(atom.line));
                    }
                    prev = Prev::Val;
                }
            }
        }

        while let Some(top) = ops.pop() {
            match top {
                StackOp::Op(op) => output.push(ExprNode::Operator(op)),
                StackOp::Open(c) => {
                    let closer = if c == '(' { ")" } else { "]" };
                    return Err(ErrorKind::UnexpectedEof(closer.into()).at(line));
                }
            }
        }
        if output.is_empty() || !postfix_well_formed(&output) {
            return Err(ErrorKind::InvalidExpression.at(line));
        }

        // Pass 1: lvalue rules.
        walk_postfix(&output, &mut LvalueChecker { line })?;

        // Pass 2: flag variables whose address is taken; they become
        // ineligible for register storage.
        if let Some(func) = scope.as_deref_mut() {
            flag_address_taken(&output, func);
        }

        // Pass 3: constant folding.
        let mut folder = Folder {
            globals: &self.program.globals,
            scope: scope.as_deref(),
            warnings: &mut self.warnings,
            line,
        };
        let folded = walk_postfix(&output, &mut folder)?;
        match folded.tag {
            FoldTag::Const(value) => Ok(Expr {
                postfix: vec![ExprNode::Literal(value)],
                line,
                value: Some(value),
            }),
            FoldTag::Array(ref var) => {
                let name = var_name(var, &self.program.globals, scope.as_deref());
                Err(ErrorKind::ArrayInScalarContext(name).at(line))
            }
            FoldTag::Runtime => Ok(Expr {
                postfix: folded.vnodes,
                line,
                value: None,
            }),
        }
    }

    /// A name inside an expression: a variable reference or a function
    /// call. Resolution consults globals, parameters, locals, then
    /// functions; unknown names are left pending for the resolver.
    fn name_node(
        &mut self,
        name: &str,
        line: u32,
        mut scope: Option<&mut Function>,
    ) -> Result<ExprNode, ParseError> {
        if let Some(idx) = self.program.global(name) {
            return Ok(ExprNode::Variable(VarRef::Global(idx)));
        }
        if let Some(func) = scope.as_deref_mut() {
            if let Some(idx) = func.param(name) {
                return Ok(ExprNode::Variable(VarRef::Param(idx)));
            }
            if let Some(idx) = func.local(name) {
                return Ok(ExprNode::Variable(VarRef::Local(idx)));
            }
        }
        if let Some(idx) = self.program.function(name) {
            if self.tokens.peek().text != "(" {
                return Err(ErrorKind::FunctionAsValue(name.to_string()).at(line));
            }
            if name == "main" {
                return Err(ErrorKind::CallToMain.at(line));
            }
            if self.program.functions[idx].ret.is_void() {
                return Err(ErrorKind::VoidInExpression(name.to_string()).at(line));
            }
            let expected = self.program.functions[idx].params.len();
            let args = self.parse_call_args(scope)?;
            if args.len() != expected {
                return Err(
                    ErrorKind::WrongArgCount(name.to_string(), expected, args.len()).at(line)
                );
            }
            return Ok(ExprNode::Call(FunctionCall {
                callee: Callee::Function(idx),
                args,
                line,
            }));
        }
        // Unknown name: forward reference, resolved after the whole
        // program has been parsed.
        if self.tokens.peek().text == "(" {
            let args = self.parse_call_args(scope)?;
            Ok(ExprNode::Call(FunctionCall {
                callee: Callee::Pending(name.to_string()),
                args,
                line,
            }))
        } else {
            Ok(ExprNode::Variable(VarRef::Pending(name.to_string())))
        }
    }

    /// call-args = "(" [ expr { "," expr } ] ")"
    pub(super) fn parse_call_args(
        &mut self,
        mut scope: Option<&mut Function>,
    ) -> Result<Vec<Expr>, ParseError> {
        self.expect("(")?;
        let mut args = Vec::new();
        if self.tokens.peek().text == ")" {
            self.tokens.next();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(scope.as_deref_mut())?);
            let atom = self.tokens.next();
            match atom.text.as_str() {
                "," => continue,
                ")" => break,
                "" => return Err(ErrorKind::UnexpectedEof(")".into()).at(atom.line)),
                _ => {
                    return Err(
                        ErrorKind::UnexpectedToken(atom.text.clone(), ")".into()).at(atom.line)
                    )
                }
            }
        }
        Ok(args)
    }
}

fn var_name(var: &VarRef, globals: &[Global], scope: Option<&Function>) -> String {
    match var {
        VarRef::Global(idx) => globals[*idx].name.clone(),
        VarRef::Param(idx) => scope
            .map(|f| f.params[*idx].var.name.clone())
            .unwrap_or_default(),
        VarRef::Local(idx) => scope
            .map(|f| f.locals[*idx].var.name.clone())
            .unwrap_or_default(),
        VarRef::Pending(name) => name.clone(),
    }
}

/// Marks every variable that appears as the sole operand of unary `&`.
fn flag_address_taken(nodes: &[ExprNode], func: &mut Function) {
    for i in 1..nodes.len() {
        if nodes[i] != ExprNode::Operator(Op::AddrOf) {
            continue;
        }
        match &nodes[i - 1] {
            ExprNode::Variable(VarRef::Param(idx)) => {
                func.params[*idx].var.address_taken = true;
            }
            ExprNode::Variable(VarRef::Local(idx)) => {
                func.locals[*idx].var.address_taken = true;
            }
            // Globals and pending names live in memory regardless.
            _ => {}
        }
    }
}

// ----------------------------------------------------------------------------
// Pass 1: lvalue validation
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Lvalue,
    Rvalue,
}

struct LvalueChecker {
    line: u32,
}

impl PostfixVisitor for LvalueChecker {
    type Operand = Tag;
    type Error = ParseError;

    fn literal(&mut self, _value: u16) -> Result<Tag, ParseError> {
        Ok(Tag::Rvalue)
    }

    fn variable(&mut self, _var: &VarRef) -> Result<Tag, ParseError> {
        Ok(Tag::Lvalue)
    }

    fn call(&mut self, _call: &FunctionCall) -> Result<Tag, ParseError> {
        Ok(Tag::Rvalue)
    }

    fn unary(&mut self, op: Op, operand: Tag) -> Result<Tag, ParseError> {
        match op {
            Op::Deref => Ok(Tag::Lvalue),
            Op::AddrOf => {
                if operand != Tag::Lvalue {
                    return Err(ErrorKind::AddressOfRvalue.at(self.line));
                }
                Ok(Tag::Rvalue)
            }
            _ => Ok(Tag::Rvalue),
        }
    }

    fn binary(&mut self, op: Op, lhs: Tag, _rhs: Tag) -> Result<Tag, ParseError> {
        match op {
            Op::Assign => {
                if lhs != Tag::Lvalue {
                    return Err(ErrorKind::LvalueRequired.at(self.line));
                }
                Ok(Tag::Rvalue)
            }
            Op::Subscript => Ok(Tag::Lvalue),
            _ => Ok(Tag::Rvalue),
        }
    }
}

// ----------------------------------------------------------------------------
// Pass 3: constant folding
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum FoldTag {
    Const(u16),
    /// A reference to an array variable; only valid under `[]` or `&`.
    Array(VarRef),
    Runtime,
}

/// Folding result for a subexpression. `vnodes` is the rebuilt postfix
/// for value contexts (constants collapse to literals); `lnodes` keeps
/// the variable reference intact for assignment targets and `&`.
struct FoldOperand {
    tag: FoldTag,
    vnodes: Vec<ExprNode>,
    lnodes: Vec<ExprNode>,
}

struct Folder<'a> {
    globals: &'a [Global],
    scope: Option<&'a Function>,
    warnings: &'a mut Vec<Warning>,
    line: u32,
}

impl<'a> Folder<'a> {
    fn scalar(&self, operand: &FoldOperand) -> Result<(), ParseError> {
        if let FoldTag::Array(var) = &operand.tag {
            let name = var_name(var, self.globals, self.scope);
            return Err(ErrorKind::ArrayInScalarContext(name).at(self.line));
        }
        Ok(())
    }

    fn warn(&mut self, kind: WarnKind) {
        self.warnings.push(Warning {
            line: self.line,
            kind,
        });
    }
}

impl<'a> PostfixVisitor for Folder<'a> {
    type Operand = FoldOperand;
    type Error = ParseError;

    fn literal(&mut self, value: u16) -> Result<FoldOperand, ParseError> {
        Ok(FoldOperand {
            tag: FoldTag::Const(value),
            vnodes: vec![ExprNode::Literal(value)],
            lnodes: vec![ExprNode::Literal(value)],
        })
    }

    fn variable(&mut self, var: &VarRef) -> Result<FoldOperand, ParseError> {
        let node = vec![ExprNode::Variable(var.clone())];
        match var {
            VarRef::Global(idx) => {
                let global = &self.globals[*idx];
                if global.ty.is_array() {
                    Ok(FoldOperand {
                        tag: FoldTag::Array(var.clone()),
                        vnodes: node.clone(),
                        lnodes: node,
                    })
                } else {
                    // Globals fold by their initial value anywhere; a
                    // value context collapses to a literal while an
                    // lvalue context keeps the reference.
                    Ok(FoldOperand {
                        tag: FoldTag::Const(global.value),
                        vnodes: vec![ExprNode::Literal(global.value)],
                        lnodes: node,
                    })
                }
            }
            VarRef::Param(_) => Ok(FoldOperand {
                tag: FoldTag::Runtime,
                vnodes: node.clone(),
                lnodes: node,
            }),
            VarRef::Local(idx) => {
                let is_array = self
                    .scope
                    .map(|f| f.locals[*idx].var.ty.is_array())
                    .unwrap_or(false);
                Ok(FoldOperand {
                    tag: if is_array {
                        FoldTag::Array(var.clone())
                    } else {
                        FoldTag::Runtime
                    },
                    vnodes: node.clone(),
                    lnodes: node,
                })
            }
            VarRef::Pending(_) => Ok(FoldOperand {
                tag: FoldTag::Runtime,
                vnodes: node.clone(),
                lnodes: node,
            }),
        }
    }

    fn call(&mut self, call: &FunctionCall) -> Result<FoldOperand, ParseError> {
        let node = vec![ExprNode::Call(call.clone())];
        Ok(FoldOperand {
            tag: FoldTag::Runtime,
            vnodes: node.clone(),
            lnodes: node,
        })
    }

    fn unary(&mut self, op: Op, operand: FoldOperand) -> Result<FoldOperand, ParseError> {
        match op {
            Op::AddrOf => {
                // The operand stays in its lvalue form; the result is a
                // plain (non-constant) address value.
                let mut nodes = operand.lnodes;
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
            Op::Deref => {
                self.scalar(&operand)?;
                let mut nodes = operand.vnodes;
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
            _ => {
                self.scalar(&operand)?;
                if let FoldTag::Const(value) = operand.tag {
                    let value = op.apply_unary(value);
                    return Ok(FoldOperand {
                        tag: FoldTag::Const(value),
                        vnodes: vec![ExprNode::Literal(value)],
                        lnodes: vec![ExprNode::Literal(value)],
                    });
                }
                let mut nodes = operand.vnodes;
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
        }
    }

    fn binary(
        &mut self,
        op: Op,
        lhs: FoldOperand,
        rhs: FoldOperand,
    ) -> Result<FoldOperand, ParseError> {
        match op {
            Op::Assign => {
                self.scalar(&lhs)?;
                self.scalar(&rhs)?;
                let mut nodes = lhs.lnodes;
                nodes.extend(rhs.vnodes);
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
            Op::Subscript => {
                self.scalar(&rhs)?;
                // A constant index into a constant global array folds to
                // the element value; out of range is a warning and makes
                // the expression non-constant.
                if let (FoldTag::Array(VarRef::Global(idx)), FoldTag::Const(index)) =
                    (&lhs.tag, &rhs.tag)
                {
                    let global = &self.globals[*idx];
                    if (*index as usize) < global.values.len() {
                        let value = global.values[*index as usize];
                        let mut lnodes = lhs.lnodes;
                        lnodes.extend(rhs.vnodes);
                        lnodes.push(ExprNode::Operator(op));
                        return Ok(FoldOperand {
                            tag: FoldTag::Const(value),
                            vnodes: vec![ExprNode::Literal(value)],
                            lnodes,
                        });
                    }
                    self.warn(WarnKind::IndexOutOfBounds(global.name.clone(), *index));
                }
                let mut nodes = lhs.vnodes;
                nodes.extend(rhs.vnodes);
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
            _ => {
                self.scalar(&lhs)?;
                self.scalar(&rhs)?;
                if let (FoldTag::Const(lv), FoldTag::Const(rv)) = (&lhs.tag, &rhs.tag) {
                    if *rv == 0 && op == Op::Div {
                        self.warn(WarnKind::DivisionByZero);
                    }
                    if *rv == 0 && op == Op::Mod {
                        self.warn(WarnKind::ModuloByZero);
                    }
                    let value = op.apply(*lv, *rv);
                    return Ok(FoldOperand {
                        tag: FoldTag::Const(value),
                        vnodes: vec![ExprNode::Literal(value)],
                        lnodes: vec![ExprNode::Literal(value)],
                    });
                }
                let mut nodes = lhs.vnodes;
                nodes.extend(rhs.vnodes);
                nodes.push(ExprNode::Operator(op));
                Ok(FoldOperand {
                    tag: FoldTag::Runtime,
                    vnodes: nodes.clone(),
                    lnodes: nodes,
                })
            }
        }
    }
}
