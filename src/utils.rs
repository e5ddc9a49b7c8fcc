use crate::handlers::vps::Vm;
use crate::{PanelError, Result};
use crossterm::event::{self, Event};
use crossterm::terminal;
use std::io::{BufRead, IsTerminal, Write};

/// Interactive prompts, generic over the streams so tests can script them.
pub mod prompt {
    use super::*;
    use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

    pub fn line<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
        write!(output, "{}", prompt)?;
        output.flush()?;

        let mut buf = String::new();
        if input.read_line(&mut buf)? == 0 {
            return Err(PanelError::Cancelled);
        }
        Ok(buf.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Collects typed characters until Enter. Nothing is echoed. Esc,
    /// Ctrl-C and Ctrl-D on an empty line cancel.
    pub fn secret<I>(events: I) -> Result<String>
    where
        I: IntoIterator<Item = std::io::Result<Event>>,
    {
        let mut secret = String::new();
        for event in events {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event?
            else {
                continue;
            };
            if kind == KeyEventKind::Release {
                continue;
            }

            let ctrl = modifiers.contains(KeyModifiers::CONTROL);
            match code {
                KeyCode::Enter => return Ok(secret),
                KeyCode::Esc => return Err(PanelError::Cancelled),
                KeyCode::Char('c') if ctrl => return Err(PanelError::Cancelled),
                KeyCode::Char('d') if ctrl && secret.is_empty() => {
                    return Err(PanelError::Cancelled);
                }
                KeyCode::Backspace => {
                    secret.pop();
                }
                KeyCode::Char(c) if !ctrl => secret.push(c),
                _ => {}
            }
        }
        Err(PanelError::Cancelled)
    }

    /// `[y/N]` question; anything but `y` declines.
    pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
        writeln!(output, "{}", question)?;
        match line(input, output, "[y/N]: ") {
            Ok(answer) => Ok(answer.trim() == "y"),
            Err(PanelError::Cancelled) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Numbered VPS menu. A single VPS is chosen without asking.
    pub fn select_vm<R: BufRead, W: Write>(
        mut vms: Vec<Vm>,
        input: &mut R,
        output: &mut W,
    ) -> Result<Vm> {
        match vms.len() {
            0 => return Err(PanelError::InvalidArgument("no VPS in this account".into())),
            1 => return Ok(vms.remove(0)),
            _ => {}
        }

        for (i, vm) in vms.iter().enumerate() {
            writeln!(output, "[{}] {}", i + 1, vm.label)?;
        }

        let answer = line(
            input,
            output,
            &format!("Please select VPS no. [1-{}]: ", vms.len()),
        )?;
        let no: usize = answer
            .trim()
            .parse()
            .map_err(|_| PanelError::InvalidArgument(format!("not a number: {:?}", answer)))?;

        if (1..=vms.len()).contains(&no) {
            Ok(vms.remove(no - 1))
        } else {
            Err(PanelError::InvalidArgument("Invalid input (out of range).".into()))
        }
    }
}

pub fn prompt_stdin(prompt: &str) -> Result<String> {
    prompt::line(&mut std::io::stdin().lock(), &mut std::io::stderr(), prompt)
}

/// Password prompt. On a terminal the input is read in raw mode so it is
/// not echoed; piped input is read as a plain line.
pub fn password_stdin(prompt: &str) -> Result<String> {
    if !std::io::stdin().is_terminal() {
        return prompt_stdin(prompt);
    }

    let mut err = std::io::stderr();
    write!(err, "{}", prompt)?;
    err.flush()?;

    terminal::enable_raw_mode()?;
    let secret = prompt::secret(std::iter::repeat_with(event::read));
    terminal::disable_raw_mode()?;
    writeln!(err)?;
    secret
}

pub fn confirm_stdin(question: &str) -> Result<bool> {
    prompt::confirm(&mut std::io::stdin().lock(), &mut std::io::stderr(), question)
}

pub fn select_vm_stdin(vms: Vec<Vm>) -> Result<Vm> {
    prompt::select_vm(vms, &mut std::io::stdin().lock(), &mut std::io::stderr())
}
