use std::fmt;
use thiserror::Error;

/// Top-level compiler error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fatal diagnostic. Rendered as `Error:<line>: <message>`, with the
/// line part omitted when unknown (line 0).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub line: u32,
    pub kind: ErrorKind,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error:")?;
        if 0 < self.line {
            write!(f, "{}:", self.line)?;
        }
        write!(f, " {}", self.kind)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Lexical and syntax errors
    #[error("Unexpected EOF, expected '{0}'.")]
    UnexpectedEof(String),

    #[error("Unexpected token '{0}', expected '{1}'.")]
    UnexpectedToken(String, String),

    #[error("Unexpected token '{0}'.")]
    UnexpectedAtom(String),

    #[error("Invalid literal '{0}'.")]
    InvalidLiteral(String),

    #[error("Invalid expression.")]
    InvalidExpression,

    #[error("Expected a type, got '{0}'.")]
    ExpectedType(String),

    #[error("Cannot declare an array of void.")]
    VoidArray,

    // Naming errors
    #[error("Invalid name '{0}'.")]
    InvalidName(String),

    #[error("Cannot use reserved word '{0}' as a name.")]
    ReservedName(String),

    #[error("Duplicate declaration of '{0}'.")]
    Duplicate(String),

    #[error("Use of undeclared identifier '{0}'.")]
    Undeclared(String),

    #[error("Missing 'main' function.")]
    MissingMain,

    #[error("The 'main' function must be declared 'void main()'.")]
    MainSignature,

    #[error("The 'main' function cannot be called.")]
    CallToMain,

    #[error("Duplicate label '{0}'.")]
    DuplicateLabel(String),

    #[error("Label '{0}' was not declared in this function.")]
    UnknownLabel(String),

    // Typing errors
    #[error("Variables cannot be of type 'void'.")]
    VoidVariable,

    #[error("Function parameters cannot be of type 'void'.")]
    VoidParameter,

    #[error("Function parameters cannot be arrays.")]
    ArrayParameter,

    #[error("Functions cannot return arrays.")]
    ArrayReturn,

    #[error("Cannot use void function '{0}' in an expression.")]
    VoidInExpression(String),

    #[error("Cannot use function '{0}' as a value.")]
    FunctionAsValue(String),

    #[error("Cannot use array '{0}' in a scalar context.")]
    ArrayInScalarContext(String),

    #[error("Array variables must be initialized with a braced list.")]
    ArrayInitializer,

    #[error("Expected {0} array initializers, got {1}.")]
    ArraySizeMismatch(u16, usize),

    #[error("Initial value of a global variable must be a constant expression.")]
    NonConstInitializer,

    #[error("Array size must be a constant expression.")]
    NonConstArraySize,

    #[error("Array size must be greater than zero.")]
    ArraySizeZero,

    #[error("Function '{0}' takes {1} arguments, got {2}.")]
    WrongArgCount(String, usize, usize),

    #[error("The left hand side of an assignment must be an lvalue.")]
    LvalueRequired,

    #[error("Cannot take the address of an rvalue.")]
    AddressOfRvalue,

    #[error("Cannot return a value from a void function.")]
    ReturnValueInVoid,

    #[error("Non-void functions must return a value.")]
    ReturnMissingValue,

    #[error("Must be within a loop statement to use '{0}'.")]
    OutsideLoop(&'static str),

    #[error("Local variables must be declared at the top of a function body.")]
    LocalsAtTop,
}

impl ErrorKind {
    /// Attaches a source line, producing a reportable error.
    pub fn at(self, line: u32) -> ParseError {
        ParseError { line, kind: self }
    }
}

/// A non-fatal diagnostic. Rendered as `Warning:<line>: <message>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub line: u32,
    pub kind: WarnKind,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Warning:")?;
        if 0 < self.line {
            write!(f, "{}:", self.line)?;
        }
        write!(f, " {}", self.kind)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WarnKind {
    #[error("Division by zero in a constant expression.")]
    DivisionByZero,

    #[error("Modulo by zero in a constant expression.")]
    ModuloByZero,

    #[error("Array index {1} is out of bounds for '{0}'.")]
    IndexOutOfBounds(String, u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render() {
        let err = ErrorKind::OutsideLoop("break;").at(3);
        assert_eq!(
            err.to_string(),
            "Error:3: Must be within a loop statement to use 'break;'."
        );
        let err = ErrorKind::MissingMain.at(0);
        assert_eq!(err.to_string(), "Error: Missing 'main' function.");
        let warn = Warning {
            line: 7,
            kind: WarnKind::DivisionByZero,
        };
        assert_eq!(
            warn.to_string(),
            "Warning:7: Division by zero in a constant expression."
        );
    }
}
