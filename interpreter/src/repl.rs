use anyhow::Result;
use prism_lib::Interpreter;
use rustyline::{error::ReadlineError, DefaultEditor};

/// Every line is compiled and run on its own, so nothing carries over between
/// lines.
pub fn run(interpreter: &Interpreter) -> Result<()> {
    println!("Prism v{}", env!("CARGO_PKG_VERSION"));
    let mut rl = DefaultEditor::new()?;
    loop {
        use ReadlineError::*;
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" {
                    return Ok(());
                }
                rl.add_history_entry(line)?;
                if let Err(e) = interpreter.interpret(line, "repl") {
                    eprintln!("{}", e);
                }
            }
            Err(Interrupted | Eof) => return Ok(()),
            Err(other) => return Err(other.into()),
        }
    }
}
