//! Statement parsing: a dispatcher keyed on the first atom of the
//! statement. Local declarations are only legal in the first run of
//! statements of a function body.

use super::Parser;
use crate::ast::{Callee, Expr, Function, FunctionCall, Local, LocalInit, Stmt, Variable};
use crate::error::{ErrorKind, ParseError};
use crate::ident;

impl Parser {
    /// body = { stmt } "}"
    ///
    /// The opening brace has already been consumed. Local declarations
    /// must come first.
    pub(super) fn parse_body(&mut self, func: &mut Function) -> Result<(), ParseError> {
        let mut decls = true;
        let mut body = Vec::new();
        loop {
            let atom = self.tokens.peek();
            if atom.empty() {
                return Err(ErrorKind::UnexpectedEof("}".into()).at(atom.line));
            }
            if atom.text == "}" {
                self.tokens.next();
                break;
            }
            body.push(self.parse_stmt(func, &mut decls, 0)?);
        }
        func.body = body;
        Ok(())
    }

    fn parse_stmt(
        &mut self,
        func: &mut Function,
        decls: &mut bool,
        depth: usize,
    ) -> Result<Stmt, ParseError> {
        let atom = self.tokens.peek();
        let line = atom.line;
        match atom.text.as_str() {
            ";" => {
                self.tokens.next();
                *decls = false;
                Ok(Stmt::Null)
            }

            // Compound statements may not declare locals.
            "{" => {
                self.tokens.next();
                *decls = false;
                let mut stmts = Vec::new();
                loop {
                    let next = self.tokens.peek();
                    if next.empty() {
                        return Err(ErrorKind::UnexpectedEof("}".into()).at(next.line));
                    }
                    if next.text == "}" {
                        self.tokens.next();
                        break;
                    }
                    let mut nested = false;
                    stmts.push(self.parse_stmt(func, &mut nested, depth)?);
                }
                Ok(Stmt::Compound(stmts))
            }

            "if" => {
                self.tokens.next();
                *decls = false;
                self.expect("(")?;
                let cond = self.parse_expr(Some(&mut *func))?;
                self.expect(")")?;
                let mut nested = false;
                let then = Box::new(self.parse_stmt(func, &mut nested, depth)?);
                let els = if self.tokens.peek().text == "else" {
                    self.tokens.next();
                    Some(Box::new(self.parse_stmt(func, &mut nested, depth)?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, els })
            }

            "while" => {
                self.tokens.next();
                *decls = false;
                self.expect("(")?;
                let cond = self.parse_expr(Some(&mut *func))?;
                self.expect(")")?;
                let mut nested = false;
                let body = Box::new(self.parse_stmt(func, &mut nested, depth + 1)?);
                Ok(Stmt::While { cond, body })
            }

            "do" => {
                self.tokens.next();
                *decls = false;
                let mut nested = false;
                let body = Box::new(self.parse_stmt(func, &mut nested, depth + 1)?);
                self.expect("while")?;
                self.expect("(")?;
                let cond = self.parse_expr(Some(&mut *func))?;
                self.expect(")")?;
                self.expect(";")?;
                Ok(Stmt::DoWhile { body, cond })
            }

            "for" => {
                self.tokens.next();
                *decls = false;
                self.expect("(")?;
                let init = self.parse_expr_list(func, ";")?;
                // An empty condition is an implicit 1.
                let cond = if self.tokens.peek().text == ";" {
                    let semi = self.tokens.next();
                    Expr::literal(1, semi.line)
                } else {
                    let cond = self.parse_expr(Some(&mut *func))?;
                    self.expect(";")?;
                    cond
                };
                let step = self.parse_expr_list(func, ")")?;
                let mut nested = false;
                let body = Box::new(self.parse_stmt(func, &mut nested, depth + 1)?);
                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                })
            }

            "break" => {
                self.tokens.next();
                *decls = false;
                if depth == 0 {
                    return Err(ErrorKind::OutsideLoop("break;").at(line));
                }
                self.expect(";")?;
                Ok(Stmt::Break(line))
            }

            "continue" => {
                self.tokens.next();
                *decls = false;
                if depth == 0 {
                    return Err(ErrorKind::OutsideLoop("continue;").at(line));
                }
                self.expect(";")?;
                Ok(Stmt::Continue(line))
            }

            "return" => {
                self.tokens.next();
                *decls = false;
                if self.tokens.peek().text == ";" {
                    self.tokens.next();
                    if !func.ret.is_void() {
                        return Err(ErrorKind::ReturnMissingValue.at(line));
                    }
                    Ok(Stmt::Return { value: None, line })
                } else {
                    if func.ret.is_void() {
                        return Err(ErrorKind::ReturnValueInVoid.at(line));
                    }
                    let value = self.parse_expr(Some(&mut *func))?;
                    self.expect(";")?;
                    Ok(Stmt::Return {
                        value: Some(value),
                        line,
                    })
                }
            }

            "goto" => {
                self.tokens.next();
                *decls = false;
                let label = self.tokens.next();
                if !ident::is_valid_name(&label.text) {
                    return Err(ErrorKind::InvalidName(label.text.clone()).at(label.line));
                }
                self.expect(";")?;
                func.gotos.push((label.text.clone(), line));
                Ok(Stmt::Goto {
                    label: label.text,
                    line,
                })
            }

            text if ident::is_type(text) => {
                if !*decls {
                    return Err(ErrorKind::LocalsAtTop.at(line));
                }
                self.parse_local(func)
            }

            text if ident::is_label_declaration(text) => {
                self.tokens.next();
                *decls = false;
                let name = text.trim_end_matches(':').to_string();
                if func.has_label(&name) {
                    return Err(ErrorKind::DuplicateLabel(name).at(line));
                }
                func.labels.push((name.clone(), line));
                Ok(Stmt::Label(name))
            }

            // A known void function name starts a void call statement;
            // everything else is an expression statement.
            text if ident::is_valid_name(text) && self.is_void_function(text) => {
                let name = text.to_string();
                self.tokens.next();
                *decls = false;
                if name == "main" {
                    return Err(ErrorKind::CallToMain.at(line));
                }
                let idx = self.program.function(&name).expect("checked by dispatcher");
                let expected = self.program.functions[idx].params.len();
                let args = self.parse_call_args(Some(&mut *func))?;
                if args.len() != expected {
                    return Err(ErrorKind::WrongArgCount(name, expected, args.len()).at(line));
                }
                self.expect(";")?;
                Ok(Stmt::VoidCall(FunctionCall {
                    callee: Callee::Function(idx),
                    args,
                    line,
                }))
            }

            _ => {
                *decls = false;
                let expr = self.parse_expr(Some(&mut *func))?;
                self.expect(";")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn is_void_function(&self, name: &str) -> bool {
        self.program
            .function(name)
            .map(|idx| self.program.functions[idx].ret.is_void())
            .unwrap_or(false)
    }

    /// Comma-separated expressions terminated by `terminal`, which is
    /// consumed. The list may be empty.
    fn parse_expr_list(
        &mut self,
        func: &mut Function,
        terminal: &str,
    ) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = Vec::new();
        if self.tokens.peek().text == terminal {
            self.tokens.next();
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr(Some(&mut *func))?);
            let atom = self.tokens.next();
            if atom.text == "," {
                continue;
            }
            if atom.text == terminal {
                break;
            }
            if atom.empty() {
                return Err(ErrorKind::UnexpectedEof(terminal.into()).at(atom.line));
            }
            return Err(
                ErrorKind::UnexpectedToken(atom.text.clone(), terminal.into()).at(atom.line)
            );
        }
        Ok(exprs)
    }

    /// local = type name [ "=" ( expr | array-expr ) ] ";"
    fn parse_local(&mut self, func: &mut Function) -> Result<Stmt, ParseError> {
        let ty = self.parse_type()?;
        let name = self.tokens.next();
        self.check_name(&name)?;
        if ty.is_void() {
            return Err(ErrorKind::VoidVariable.at(name.line));
        }
        if self.program.global(&name.text).is_some()
            || self.program.function(&name.text).is_some()
            || func.param(&name.text).is_some()
            || func.local(&name.text).is_some()
        {
            return Err(ErrorKind::Duplicate(name.text.clone()).at(name.line));
        }

        let init = match self.tokens.peek().text.as_str() {
            "=" => {
                self.tokens.next();
                if let Some(len) = ty.array {
                    if self.tokens.peek().text != "{" {
                        let next = self.tokens.peek();
                        return Err(ErrorKind::ArrayInitializer.at(next.line));
                    }
                    let exprs = self.parse_array_expr(Some(&mut *func))?;
                    if exprs.len() != len as usize {
                        return Err(ErrorKind::ArraySizeMismatch(len, exprs.len()).at(name.line));
                    }
                    LocalInit::Array(exprs)
                } else {
                    LocalInit::Scalar(self.parse_expr(Some(&mut *func))?)
                }
            }
            _ => LocalInit::None,
        };
        self.expect(";")?;

        func.locals.push(Local {
            var: Variable::new(&name.text, ty),
            init,
            data_offset: None,
        });
        Ok(Stmt::Local(func.locals.len() - 1))
    }
}
