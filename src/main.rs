use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};

use crate::transpiler::Transpiler;

mod ast;
mod lexer;
mod parser;
mod token;
mod transpiler;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut dump_tree = false;
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-tree" => dump_tree = true,
            _ if arg.starts_with('-') => bail!("Unknown flag '{arg}'"),
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let tokens = lexer::tokenize(&source)?;
    let program = parser::parse_tokens(tokens)?;

    if dump_tree {
        println!("{program:#?}");
        return Ok(());
    }

    let transpiler = Transpiler;
    let output = transpiler.transpile(&program)?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
