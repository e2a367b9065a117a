//! Recursive-descent parser for declarations and statements, with a
//! shunting-yard expression parser (`expr`). Semantic checks run
//! interleaved with parsing; names that are not declared yet are left
//! pending for the resolver.

mod expr;
mod stmt;

use crate::ast::{Base, Expr, Function, Global, Param, Program, Type, Variable};
use crate::error::{ErrorKind, ParseError, Warning};
use crate::ident;
use crate::tokenizer::{Atom, Tokenizer};

pub struct Parser {
    tokens: Tokenizer,
    program: Program,
    warnings: Vec<Warning>,
}

impl Parser {
    pub fn new(tokens: Tokenizer) -> Self {
        Parser {
            tokens,
            program: Program {
                globals: Vec::new(),
                functions: Function::builtins(),
            },
            warnings: Vec::new(),
        }
    }

    /// Parses the whole token stream into a program. Stops at the first
    /// error; warnings are collected alongside.
    pub fn parse(mut self) -> Result<(Program, Vec<Warning>), ParseError> {
        loop {
            if self.tokens.peek().empty() {
                break;
            }
            let ty = self.parse_type()?;
            let name = self.tokens.next();
            if name.empty() {
                return Err(
                    ErrorKind::UnexpectedEof("a global or function name".into()).at(name.line)
                );
            }
            self.check_name(&name)?;
            if self.tokens.peek().text == "(" {
                self.parse_function(ty, name)?;
            } else {
                self.parse_global(ty, name)?;
            }
        }
        Ok((self.program, self.warnings))
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

impl Parser {
    /// Consumes the next atom, which must be exactly `text`.
    fn expect(&mut self, text: &str) -> Result<Atom, ParseError> {
        let atom = self.tokens.next();
        if atom.empty() {
            Err(ErrorKind::UnexpectedEof(text.into()).at(atom.line))
        } else if atom.text != text {
            Err(ErrorKind::UnexpectedToken(atom.text.clone(), text.into()).at(atom.line))
        } else {
            Ok(atom)
        }
    }

    /// A declared name must be well formed and not a reserved word.
    fn check_name(&self, atom: &Atom) -> Result<(), ParseError> {
        if !ident::is_valid_name(&atom.text) {
            Err(ErrorKind::InvalidName(atom.text.clone()).at(atom.line))
        } else if ident::is_reserved(&atom.text) {
            Err(ErrorKind::ReservedName(atom.text.clone()).at(atom.line))
        } else {
            Ok(())
        }
    }
}

// ----------------------------------------------------------------------------
// Declarations
// ----------------------------------------------------------------------------

impl Parser {
    /// type = ( "void" | "uint16" ) [ "[" const-expr "]" ]
    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let atom = self.tokens.next();
        if atom.empty() {
            return Err(ErrorKind::UnexpectedEof("a type".into()).at(atom.line));
        }
        let base = match atom.text.as_str() {
            "void" => Base::Void,
            "uint16" => Base::Uint16,
            _ => return Err(ErrorKind::ExpectedType(atom.text.clone()).at(atom.line)),
        };
        if self.tokens.peek().text != "[" {
            return Ok(Type { base, array: None });
        }
        self.tokens.next();
        let size = self.parse_expr(None)?;
        self.expect("]")?;
        if base == Base::Void {
            return Err(ErrorKind::VoidArray.at(atom.line));
        }
        let size = match size.value {
            Some(value) => value,
            None => return Err(ErrorKind::NonConstArraySize.at(size.line)),
        };
        if size == 0 {
            return Err(ErrorKind::ArraySizeZero.at(atom.line));
        }
        Ok(Type {
            base,
            array: Some(size),
        })
    }

    /// global = type name ( ";" | "=" ( const-expr | array-expr ) ";" )
    fn parse_global(&mut self, ty: Type, name: Atom) -> Result<(), ParseError> {
        if ty.is_void() {
            return Err(ErrorKind::VoidVariable.at(name.line));
        }
        if self.program.global(&name.text).is_some() || self.program.function(&name.text).is_some()
        {
            return Err(ErrorKind::Duplicate(name.text.clone()).at(name.line));
        }

        let mut global = Global {
            name: name.text.clone(),
            ty,
            value: 0,
            values: vec![0; ty.array.unwrap_or(0) as usize],
            line: name.line,
        };

        let atom = self.tokens.next();
        match atom.text.as_str() {
            ";" => {}
            "=" => {
                if let Some(len) = ty.array {
                    if self.tokens.peek().text != "{" {
                        let next = self.tokens.peek();
                        return Err(ErrorKind::ArrayInitializer.at(next.line));
                    }
                    let exprs = self.parse_array_expr(None)?;
                    if exprs.len() != len as usize {
                        return Err(ErrorKind::ArraySizeMismatch(len, exprs.len()).at(name.line));
                    }
                    let mut values = Vec::new();
                    for expr in &exprs {
                        match expr.value {
                            Some(value) => values.push(value),
                            None => {
                                return Err(ErrorKind::NonConstInitializer.at(expr.line));
                            }
                        }
                    }
                    global.values = values;
                } else {
                    let expr = self.parse_expr(None)?;
                    global.value = match expr.value {
                        Some(value) => value,
                        None => return Err(ErrorKind::NonConstInitializer.at(expr.line)),
                    };
                }
                self.expect(";")?;
            }
            "" => return Err(ErrorKind::UnexpectedEof(";".into()).at(atom.line)),
            _ => {
                return Err(ErrorKind::UnexpectedToken(atom.text.clone(), ";".into()).at(atom.line))
            }
        }

        self.program.globals.push(global);
        Ok(())
    }

    /// array-expr = "{" [ expr { "," expr } ] "}"
    fn parse_array_expr(
        &mut self,
        mut scope: Option<&mut Function>,
    ) -> Result<Vec<Expr>, ParseError> {
        self.expect("{")?;
        let mut exprs = Vec::new();
        if self.tokens.peek().text == "}" {
            self.tokens.next();
            return Ok(exprs);
        }
        loop {
            exprs.push(self.parse_expr(scope.as_deref_mut())?);
            let atom = self.tokens.next();
            match atom.text.as_str() {
                "," => continue,
                "}" => break,
                "" => return Err(ErrorKind::UnexpectedEof("}".into()).at(atom.line)),
                _ => {
                    return Err(
                        ErrorKind::UnexpectedToken(atom.text.clone(), "}".into()).at(atom.line)
                    )
                }
            }
        }
        Ok(exprs)
    }

    /// function = type name "(" [ param { "," param } ] ")" "{" body "}"
    fn parse_function(&mut self, ty: Type, name: Atom) -> Result<(), ParseError> {
        if ty.is_array() {
            return Err(ErrorKind::ArrayReturn.at(name.line));
        }
        if self.program.global(&name.text).is_some() || self.program.function(&name.text).is_some()
        {
            return Err(ErrorKind::Duplicate(name.text.clone()).at(name.line));
        }

        let mut func = Function::new(ty, &name.text, name.line);

        self.expect("(")?;
        if self.tokens.peek().text == ")" {
            self.tokens.next();
        } else {
            loop {
                let param_ty = self.parse_type()?;
                if param_ty.is_void() {
                    return Err(ErrorKind::VoidParameter.at(name.line));
                }
                if param_ty.is_array() {
                    return Err(ErrorKind::ArrayParameter.at(name.line));
                }
                let param_name = self.tokens.next();
                self.check_name(&param_name)?;
                if self.program.global(&param_name.text).is_some()
                    || self.program.function(&param_name.text).is_some()
                    || func.param(&param_name.text).is_some()
                {
                    return Err(ErrorKind::Duplicate(param_name.text.clone()).at(param_name.line));
                }
                func.params
                    .push(Param::new(Variable::new(&param_name.text, param_ty)));
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
        }

        self.expect("{")?;
        self.parse_body(&mut func)?;

        // Every goto must name a label declared in this function.
        for (label, line) in &func.gotos {
            if !func.has_label(label) {
                return Err(ErrorKind::UnknownLabel(label.clone()).at(*line));
            }
        }

        self.program.functions.push(func);
        Ok(())
    }
}
