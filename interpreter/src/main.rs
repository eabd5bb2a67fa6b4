use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;

use prism_lib::vm::VmConfig;
use prism_lib::Interpreter;

use std::path::PathBuf;

#[cfg(feature = "dev")]
mod debugger;
mod repl;

const EXIT_USAGE: i32 = 64;
const EXIT_IO_ERROR: i32 = 74;
/// the terminal or line editor failed
const EXIT_OS_ERROR: i32 = 71;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// script to run, starts the REPL if omitted
    script: Option<PathBuf>,

    /// enter the REPL after running the script
    #[arg(short, long)]
    interactive: bool,

    /// maximum number of values on the operand stack
    #[arg(long, default_value_t = 256)]
    stack_size: usize,

    /// maximum call depth
    #[arg(long, default_value_t = 256)]
    max_frames: usize,

    /// more log output, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[cfg(feature = "dev")]
    #[arg(long)]
    show_tokens: bool,

    #[cfg(feature = "dev")]
    #[arg(long)]
    show_ast: bool,

    #[cfg(feature = "dev")]
    #[arg(long)]
    show_byte_code: bool,

    #[cfg(feature = "dev")]
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn vm_config(&self) -> VmConfig {
        VmConfig {
            stack_max: self.stack_size,
            frames_max: self.max_frames,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(if e.use_stderr() { EXIT_USAGE } else { 0 });
        }
    };
    if let Err(e) = SimpleLogger::new()
        .with_level(log_level(cli.verbose))
        .env()
        .init()
    {
        eprintln!("Could not set up logging: {}", e);
    }

    std::process::exit(exit_status(run(&cli)));
}

/// unreadable scripts are handled inside `run`, any error left over is the host's
fn exit_status(res: Result<i32>) -> i32 {
    match res {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_OS_ERROR
        }
    }
}

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let interpreter = Interpreter::new(cli.vm_config());
    let Some(path) = &cli.script else {
        repl::run(&interpreter)?;
        return Ok(0);
    };

    let src = match std::fs::read_to_string(path) {
        Ok(src) => src,
        Err(e) => {
            eprintln!("Could not open file '{}': {}", path.display(), e);
            return Ok(EXIT_IO_ERROR);
        }
    };
    let file = path.display().to_string();

    #[cfg(feature = "dev")]
    if let Some(code) = dev::run(cli, &interpreter, &src, &file)? {
        return Ok(code);
    }

    let code = match interpreter.interpret(&src, &file) {
        Ok(_) => 0,
        Err(e) => {
            eprintln!("{}", e);
            e.exit_code()
        }
    };
    if code == 0 && cli.interactive {
        repl::run(&interpreter)?;
    }
    Ok(code)
}

#[cfg(feature = "dev")]
mod dev {
    use anyhow::Result;
    use crossterm::{self as ct, terminal};

    use prism_lib::diagnostics::Diagnostics;
    use prism_lib::{disasm, lexer, parser, Interpreter, EXIT_COMPILE_ERROR, EXIT_RUNTIME_ERROR};

    use std::io::stdout;

    use crate::debugger::{self, Outcome};
    use crate::Cli;

    fn report(diagnostics: &Diagnostics) -> Option<i32> {
        if !diagnostics.has_errors() {
            return None;
        }
        for d in diagnostics.iter() {
            eprintln!("{}", d);
        }
        Some(EXIT_COMPILE_ERROR)
    }

    /// Handles the developer flags. Returns `None` if none is set and the script
    /// should run normally.
    pub fn run(cli: &Cli, interpreter: &Interpreter, src: &str, file: &str) -> Result<Option<i32>> {
        if !(cli.show_tokens || cli.show_ast || cli.show_byte_code || cli.debug) {
            return Ok(None);
        }

        let mut diagnostics = Diagnostics::new();
        let tokens = lexer::scan(src, file, &mut diagnostics);
        if cli.show_tokens {
            for token in &tokens {
                println!("{}", token);
            }
        }
        if let Some(code) = report(&diagnostics) {
            return Ok(Some(code));
        }

        let program = parser::parse(&tokens, file, &mut diagnostics);
        if cli.show_ast {
            println!("{:#?}", program);
        }
        if let Some(code) = report(&diagnostics) {
            return Ok(Some(code));
        }

        let module = match interpreter.generator().generate(&program, file) {
            Ok(module) => module,
            Err(d) => {
                eprintln!("{}", d);
                return Ok(Some(EXIT_COMPILE_ERROR));
            }
        };
        if cli.show_byte_code {
            print!("{}", disasm::module(&module));
        }

        if !cli.debug {
            return Ok(Some(0));
        }
        let mut stdout = stdout();
        ct::execute!(stdout, terminal::EnterAlternateScreen)?;
        let res = debugger::run(&module, interpreter.config(), src, &mut stdout);
        ct::execute!(stdout, terminal::LeaveAlternateScreen)?;
        Ok(Some(match res? {
            Outcome::Finished(value) => {
                println!("Finished with {}", value);
                0
            }
            Outcome::Failed(e) => {
                eprintln!("{}", e);
                EXIT_RUNTIME_ERROR
            }
            Outcome::Quit => 0,
        }))
    }
}
