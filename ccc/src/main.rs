use ccc::{codegen, resolver, Parser, Tokenizer};
use clap::Parser as _;
use std::fs::File;
use std::io::BufWriter;
use std::process::exit;

#[derive(Debug, clap::Parser)]
#[clap(about = "Consolite C compiler")]
struct Args {
    /// Source file
    src: String,

    /// Destination file for the assembly listing
    dest: String,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(_) => {
            let name = std::env::args().next().unwrap_or_else(|| "ccc".to_string());
            eprintln!("Usage: {} SRC DEST", name);
            exit(1);
        }
    };

    let source = match std::fs::read_to_string(&args.src) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: Failed to open file: {}: {}", args.src, err);
            exit(1);
        }
    };

    let parser = Parser::new(Tokenizer::new(&source));
    let (mut program, warnings) = match parser.parse() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };
    for warning in &warnings {
        eprintln!("{}", warning);
    }
    if let Err(err) = resolver::resolve(&mut program) {
        eprintln!("{}", err);
        exit(1);
    }

    // The output file is only created once the front end has accepted
    // the program.
    let out = match File::create(&args.dest) {
        Ok(file) => BufWriter::new(file),
        Err(err) => {
            eprintln!("Error: Failed to open file: {}: {}", args.dest, err);
            exit(1);
        }
    };
    if let Err(err) = codegen::generate(&mut program, out) {
        eprintln!("Error: {}", err);
        exit(1);
    }
}
