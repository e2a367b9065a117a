pub mod ast;
pub mod codegen;
pub mod error;
pub mod ident;
pub mod parser;
pub mod resolver;
pub mod tokenizer;

pub use error::{Error, ParseError, Warning};
pub use parser::Parser;
pub use tokenizer::{Atom, Tokenizer};

/// Compiles Consolite C source text into an assembly listing. Returns
/// the listing and any warnings; stops at the first error.
pub fn compile(source: &str) -> Result<(String, Vec<Warning>), Error> {
    let parser = Parser::new(Tokenizer::new(source));
    let (mut program, warnings) = parser.parse()?;
    resolver::resolve(&mut program)?;
    let mut out = Vec::new();
    codegen::generate(&mut program, &mut out)?;
    Ok((String::from_utf8_lossy(&out).into_owned(), warnings))
}
