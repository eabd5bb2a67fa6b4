use anyhow::{anyhow, bail, Context, Result};
use glob::glob;
use std::result::Result as StdResult;

use std::fs;
use std::path::Path;
use std::process::Command;

const INTERPRETER: &str = "../target/release/prism";
const EXIT_MARKER: &str = "!! exit:";

fn main() -> Result<()> {
    compile_prism().context("compiling interpreter")?;

    let scripts: Vec<_> = glob("tests/*.prism")?.collect::<StdResult<_, _>>()?;
    let mut failed = 0;
    for script in &scripts {
        if !run_script(script)? {
            failed += 1;
        }
    }
    println!("{} of {} scripts passed", scripts.len() - failed, scripts.len());
    if failed > 0 {
        bail!("{} script(s) failed", failed);
    }
    Ok(())
}

/// compares stdout with the `.out` file next to the script and the exit code
/// with the script's `!! exit:` line, 0 if there is none
fn run_script(script: &Path) -> Result<bool> {
    let source = fs::read_to_string(script)
        .with_context(|| format!("loading script: {}", script.display()))?;
    let expected_code = expected_exit_code(&source)?;
    let expected_output_path = script.with_extension("out");
    let expected_output = fs::read_to_string(&expected_output_path).with_context(|| {
        format!("loading expected output: {}", expected_output_path.display())
    })?;

    let result = Command::new(INTERPRETER)
        .arg(script)
        .output()
        .with_context(|| format!("running script {}", script.display()))?;
    let output = String::from_utf8(result.stdout)?;
    let code = result.status.code();

    if output == expected_output && code == Some(expected_code) {
        println!("{}: passed", script.display());
        Ok(true)
    } else {
        println!(
            "{}: failed (exit code {:?}, expected {})\nactual output:\n{}",
            script.display(),
            code,
            expected_code,
            output
        );
        Ok(false)
    }
}

fn expected_exit_code(source: &str) -> Result<i32> {
    match source
        .lines()
        .find_map(|l| l.trim().strip_prefix(EXIT_MARKER))
    {
        Some(code) => code
            .trim()
            .parse()
            .map_err(|e| anyhow!("bad exit marker '{}': {}", code.trim(), e)),
        None => Ok(0),
    }
}

fn compile_prism() -> Result<()> {
    let st = Command::new("cargo")
        .args(["build", "--release", "-p", "prism"])
        .current_dir("..")
        .status()?;
    if st.success() {
        Ok(())
    } else {
        Err(anyhow!("compiling the interpreter failed"))
    }
}
