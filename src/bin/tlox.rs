//! Lox interpreter command-line.
//!
//! When called without argument it drops into an interactive read-evaluate-print loop where
//! variables persist from one line to the next.
//!
//! When called with a script, it runs it and exits with 65 on compile errors and 70 on
//! runtime errors.

use std::fs;
use std::io::{self, Stderr};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{self, Context};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use tlox::diag::{Diagnostics, Reporter};
use tlox::interpreter::{Interpreter, LoxError};
use tlox::{parser, printer, scanner};

/// Tree-walk interpreter for the Lox language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to run.  Starts an interactive session when omitted.
    script: Option<PathBuf>,

    /// Print the scanned tokens instead of running the code.
    #[arg(long, conflicts_with = "ast")]
    tokens: bool,

    /// Print the syntax tree as s-expressions instead of running the code.
    #[arg(long)]
    ast: bool,
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let mut diag = Diagnostics::new(io::stderr());
    match &args.script {
        Some(path) => run_file(&args, path, &mut diag)?,
        None => run_prompt(&args, &mut diag)?,
    }

    let code = diag.exit_code();
    if code != 0 {
        process::exit(code);
    }
    Ok(())
}

fn run_file(args: &Args, path: &Path, diag: &mut Diagnostics<Stderr>) -> anyhow::Result<()> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    if !dump(args, &source, diag) {
        let mut stdout = io::stdout();
        let mut interp = Interpreter::new(&mut stdout);
        if let Err(e) = interp.run(&source) {
            report(e, diag);
        }
    }
    Ok(())
}

fn run_prompt(args: &Args, diag: &mut Diagnostics<Stderr>) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("cannot start line editor")?;
    let mut interp_stdout = io::stdout();
    let mut interp = Interpreter::new(&mut interp_stdout);

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("cannot read input"),
        };
        rl.add_history_entry(line.as_str())?;

        if !dump(args, &line, diag) {
            match interp.run_repl_line(&line) {
                Ok(Some(value)) => println!("= {}", value),
                Ok(None) => (),
                Err(e) => report(e, diag),
            }
        }
        // Errors do not outlive the line, variables do.
        diag.reset();
    }

    Ok(())
}

/// Handle `--tokens` and `--ast`.  Returns whether the source was dumped.
fn dump(args: &Args, source: &str, diag: &mut Diagnostics<Stderr>) -> bool {
    if args.tokens {
        for token in scanner::scan(source, diag) {
            println!("{}", token);
        }
    } else if args.ast {
        let tokens = scanner::scan(source, diag);
        let prg = parser::parse(tokens, diag);
        if !diag.had_error() {
            println!("{}", printer::sexpr_program(&prg));
        }
    } else {
        return false;
    }
    true
}

fn report(error: LoxError, diag: &mut Diagnostics<Stderr>) {
    match error {
        LoxError::Compile(errors) => errors.into_iter().for_each(|e| diag.report(e)),
        LoxError::Runtime(e) => diag.runtime_error(&e),
    }
}
