use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::Parser as ClapParser;
use clap::Subcommand;

use rox::ast_printer::AstPrinter;
use rox::interpreter::Interpreter;
use rox::parser::Parser;
use rox::resolver::Resolver;
use rox::scanner::Scanner;
use rox::token::Token;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the token stream of the source file
    Tokenize { filename: PathBuf },

    /// Parse a single expression and print its AST
    Parse { filename: PathBuf },

    /// Evaluate a single expression and print its value
    Evaluate { filename: PathBuf },

    /// Execute a program
    Run { filename: PathBuf },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Cli = Cli::parse();

    match args.command {
        Commands::Tokenize { filename } => {
            let source = read_source(&filename)?;
            let mut had_error = false;

            for item in Scanner::new(&source) {
                match item {
                    Ok(token) => println!("{}", token),

                    Err(e) => {
                        had_error = true;
                        eprintln!("{}", e);
                    }
                }
            }

            if had_error {
                process::exit(65);
            }
        }

        Commands::Parse { filename } => {
            let source = read_source(&filename)?;
            let tokens = scan_all(&source);

            match Parser::new(tokens).parse_expression() {
                Ok(expr) => println!("{}", AstPrinter::print(&expr)),

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            }
        }

        Commands::Evaluate { filename } => {
            let source = read_source(&filename)?;
            let tokens = scan_all(&source);

            let expr = match Parser::new(tokens).parse_expression() {
                Ok(expr) => expr,

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();
            let mut stdout = std::io::stdout();

            match interpreter.evaluate_expression(&expr, &mut stdout) {
                Ok(value) => println!("{}", value),

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(70);
                }
            }
        }

        Commands::Run { filename } => {
            let source = read_source(&filename)?;
            let tokens = scan_all(&source);

            let statements = match Parser::new(tokens).parse_program() {
                Ok(statements) => statements,

                Err(e) => {
                    eprintln!("{}", e);
                    process::exit(65);
                }
            };

            let mut interpreter = Interpreter::new();

            if let Err(errors) = Resolver::new(&mut interpreter).resolve(&statements) {
                for e in errors {
                    eprintln!("{}", e);
                }
                process::exit(65);
            }

            let mut stdout = std::io::stdout();

            if let Err(e) = interpreter.interpret(&statements, &mut stdout) {
                eprintln!("{}", e);
                process::exit(70);
            }
        }
    }

    Ok(())
}

/// Scan the whole source, printing every lexical error to standard error.
/// The presence of any lexical error aborts the pipeline with exit 65.
fn scan_all(source: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut had_error = false;

    for item in Scanner::new(source) {
        match item {
            Ok(token) => tokens.push(token),

            Err(e) => {
                had_error = true;
                eprintln!("{}", e);
            }
        }
    }

    if had_error {
        process::exit(65);
    }

    tokens
}

fn read_source(filename: &Path) -> anyhow::Result<Vec<u8>> {
    let file = File::open(filename)
        .with_context(|| format!("could not read {}", filename.display()))?;

    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(file);
    reader.read_to_end(&mut buf)?;

    Ok(buf)
}
