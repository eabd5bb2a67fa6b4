use std::io::{Stdout, Write};

use anyhow::{anyhow, bail, Result};
use crossterm::{self as ct, terminal};
use prism_lib::core::{Module, Value};
use prism_lib::disasm;
use prism_lib::vm::{ExecOutcome, Frame, RuntimeError, Vm, VmConfig};
use rustyline::{error::ReadlineError, DefaultEditor};

#[derive(Debug, PartialEq, Clone)]
enum UserCommand {
    Next,
    LastCommand,
    ShowStack,
    ShowSlots,
    ShowConstants,
    ShowFrames,
    ShowStackAt(usize),
    ShowSlotAt(usize),
    Quit,
}

/// how a debugging session ended
pub enum Outcome {
    Finished(Value),
    Failed(RuntimeError),
    Quit,
}

pub fn run(module: &Module, config: VmConfig, src: &str, stdout: &mut Stdout) -> Result<Outcome> {
    let mut vm = Vm::new(module, config);
    let mut rl = DefaultEditor::new()?;
    let mut last_cmd = None;

    use UserCommand::*;
    loop {
        render_state(stdout, &vm, src)?;
        stdout.flush()?;
        let mut cmd = read_line(&mut rl)?;
        if cmd == LastCommand {
            match &last_cmd {
                Some(last) => cmd = last.clone(),
                None => continue,
            }
        }
        match &cmd {
            LastCommand => {}
            Next => match vm.step() {
                Ok(ExecOutcome::Continue) => {}
                Ok(ExecOutcome::Done(value)) => return Ok(Outcome::Finished(value)),
                Err(e) => return Ok(Outcome::Failed(e)),
            },
            ShowStack => print_indexed(vm.stack().iter().enumerate().rev()),
            ShowSlots => print_indexed(vm.slots().iter().enumerate()),
            ShowConstants => {
                let (chunk, _) = vm.position();
                if let Some(chunk) = module.chunks.get(chunk) {
                    print_indexed(chunk.constants.iter().enumerate());
                }
            }
            ShowFrames => {
                for (i, frame) in vm.frames().iter().enumerate().rev() {
                    println!("{}: {}", i, describe_frame(module, frame));
                }
            }
            ShowStackAt(i) => match vm.stack().get(*i) {
                Some(v) => println!("{:?}", v),
                None => println!("Invalid stack index"),
            },
            ShowSlotAt(i) => match vm.slots().get(*i) {
                Some(v) => println!("{:?}", v),
                None => println!("Invalid slot"),
            },
            Quit => return Ok(Outcome::Quit),
        }
        last_cmd = Some(cmd);
    }
}

fn print_indexed<'a>(values: impl Iterator<Item = (usize, &'a Value)>) {
    for (i, v) in values {
        println!("{}: {:?}", i, v);
    }
}

fn describe_frame(module: &Module, frame: &Frame) -> String {
    let name = module
        .chunks
        .get(frame.chunk)
        .map(|c| c.name.as_str())
        .unwrap_or("?");
    format!("return to {}@{:04}, base {}", name, frame.ip, frame.stack_base)
}

fn read_line(rl: &mut DefaultEditor) -> Result<UserCommand> {
    loop {
        let line = rl.readline("> ");
        use ReadlineError::*;
        match line {
            Ok(line) => match parse_line(&line) {
                Ok(cmd) => return Ok(cmd),
                Err(e) => eprintln!("Error: {}", e),
            },
            Err(Interrupted | Eof) => return Ok(UserCommand::Quit),
            Err(other) => return Err(other.into()),
        }
    }
}

fn parse_line(line: &str) -> Result<UserCommand> {
    use UserCommand::*;
    let elems: Vec<_> = line.split_whitespace().collect();
    let Some((&first, rest)) = elems.split_first() else {
        return Ok(LastCommand);
    };
    let index = match rest {
        [] => None,
        [i] => Some(i.parse::<usize>()?),
        _ => bail!("Too many arguments"),
    };
    Ok(match (first, index) {
        ("n" | "next", None) => Next,
        ("s" | "stack", None) => ShowStack,
        ("s" | "stack", Some(i)) => ShowStackAt(i),
        ("v" | "slots", None) => ShowSlots,
        ("v" | "slots", Some(i)) => ShowSlotAt(i),
        ("c" | "constants", None) => ShowConstants,
        ("f" | "frames", None) => ShowFrames,
        ("q" | "quit", None) => Quit,
        _ => return Err(anyhow!("Invalid Command")),
    })
}

struct Rect {
    w: u16,
    h: u16,
    x: u16,
    y: u16,
}

struct Rects {
    bc: Rect,
    src: Rect,
    stack: Rect,
    slots: Rect,
}

impl Rect {
    pub fn render(
        &self,
        stdout: &mut Stdout,
        lines: impl IntoIterator<Item = String>,
    ) -> Result<()> {
        let wu = self.w as usize;
        let mut lines = lines.into_iter();
        for row in 0..self.h {
            let line: String = lines.next().unwrap_or_default().chars().take(wu).collect();
            let pad = wu - line.chars().count();
            ct::queue!(stdout, ct::cursor::MoveTo(self.x, self.y + row))?;
            write!(stdout, "{}{}", line, " ".repeat(pad))?;
        }
        Ok(())
    }
}

fn render_state(stdout: &mut Stdout, vm: &Vm, src: &str) -> Result<()> {
    let curr_cursor = ct::cursor::position()?;
    let rects = compute_rects(terminal::size()?);
    let (chunk, ip) = vm.position();
    let module = vm.module();
    let line = module.chunks.get(chunk).map(|c| c.line_at(ip)).unwrap_or(0);

    render_src(stdout, &rects.src, src, line)?;
    render_bc(stdout, &rects.bc, module, chunk, ip)?;
    render_stack(stdout, &rects.stack, vm.stack())?;
    render_slots(stdout, &rects.slots, vm.slots())?;
    ct::queue!(stdout, ct::cursor::MoveTo(curr_cursor.0, curr_cursor.1))?;
    Ok(())
}

fn render_src(stdout: &mut Stdout, rect: &Rect, src: &str, current_line: u32) -> Result<()> {
    let lines = src.lines().enumerate().map(|(i, l)| {
        let marker = if i + 1 == current_line as usize { '>' } else { ' ' };
        format!("{}{:4} {}", marker, i + 1, l)
    });
    rect.render(stdout, lines)
}

fn render_bc(stdout: &mut Stdout, rect: &Rect, module: &Module, chunk: usize, ip: usize) -> Result<()> {
    let Some(chunk) = module.chunks.get(chunk) else {
        return rect.render(stdout, ["<no chunk>".to_owned()]);
    };
    let mut lines = vec![format!("{} (arity {}):", chunk.name, chunk.arity)];
    let mut offset = ip;
    while offset < chunk.len() && lines.len() < rect.h as usize {
        let (text, next) = disasm::instruction(chunk, offset);
        lines.push(text);
        offset = next;
    }
    rect.render(stdout, lines)
}

fn render_stack(stdout: &mut Stdout, rect: &Rect, stack: &[Value]) -> Result<()> {
    let lines_offset = (rect.h as usize).saturating_sub(stack.len() + 1);
    let stack_lines = stack
        .iter()
        .enumerate()
        .rev()
        .map(|(i, entry)| format!("{}: {}", i, entry));
    rect.render(
        stdout,
        std::iter::once("Stack:".into())
            .chain(std::iter::repeat(String::new()).take(lines_offset))
            .chain(stack_lines),
    )
}

fn render_slots(stdout: &mut Stdout, rect: &Rect, slots: &[Value]) -> Result<()> {
    let lines = std::iter::once("Slots:".into()).chain(
        slots
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}: {:?}", i, v)),
    );
    rect.render(stdout, lines)
}

fn compute_rects((term_w, term_h): (u16, u16)) -> Rects {
    let width14 = term_w / 4;
    let width12 = term_w / 2;
    let width34 = term_w * 3 / 4;
    let height45 = term_h * 4 / 5;
    let height12 = term_h / 2;

    Rects {
        src: Rect {
            x: 0,
            y: 0,
            w: width12,
            h: height45,
        },
        bc: Rect {
            x: width12,
            y: 0,
            w: width14,
            h: height45,
        },
        stack: Rect {
            x: width34,
            y: 0,
            w: width14,
            h: height12,
        },
        slots: Rect {
            x: width34,
            y: height12,
            w: width14,
            h: height12,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use UserCommand::*;

    #[test]
    fn commands() {
        assert_eq!(parse_line("n").unwrap(), Next);
        assert_eq!(parse_line("  ").unwrap(), LastCommand);
        assert_eq!(parse_line("stack").unwrap(), ShowStack);
        assert_eq!(parse_line("s 3").unwrap(), ShowStackAt(3));
        assert_eq!(parse_line("v 0").unwrap(), ShowSlotAt(0));
        assert_eq!(parse_line("c").unwrap(), ShowConstants);
        assert_eq!(parse_line("f").unwrap(), ShowFrames);
        assert_eq!(parse_line("q").unwrap(), Quit);
    }

    #[test]
    fn bad_commands() {
        assert!(parse_line("x").is_err());
        assert!(parse_line("s x").is_err());
        assert!(parse_line("s 1 2").is_err());
        assert!(parse_line("n 1").is_err());
    }

    #[test]
    fn panes_do_not_overlap() {
        let r = compute_rects((80, 40));
        assert_eq!(r.src.x + r.src.w, r.bc.x);
        assert_eq!(r.bc.x + r.bc.w, r.stack.x);
        assert_eq!(r.stack.y + r.stack.h, r.slots.y);
    }
}
