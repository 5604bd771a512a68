//! Operator input lines for the interactive console.

use tayka::types::{Module, Scalar};

pub(crate) const HELP_TEXT: &str = "commands: start [seed] | approve <BORAN|ALBATUR|KARMA|YURA> | end | health | status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConsoleInput {
    Empty,
    Start(Option<Scalar>),
    Approve(Module),
    End,
    Health,
    Status,
    Help,
    Quit,
}

/// Parse one input line. A leading `/` is accepted.
pub(crate) fn parse_console_input(line: &str) -> Result<ConsoleInput, String> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head.to_ascii_lowercase().as_str() {
        "" => Ok(ConsoleInput::Empty),
        "start" | "run" => Ok(ConsoleInput::Start(Scalar::parse(rest))),
        "approve" | "a" => {
            if rest.is_empty() {
                return Err("usage: approve <BORAN|ALBATUR|KARMA|YURA>".to_string());
            }
            rest.parse::<Module>().map(ConsoleInput::Approve)
        }
        "end" | "abort" | "stop" => Ok(ConsoleInput::End),
        "health" => Ok(ConsoleInput::Health),
        "status" => Ok(ConsoleInput::Status),
        "help" | "?" => Ok(ConsoleInput::Help),
        "quit" | "exit" | "q" => Ok(ConsoleInput::Quit),
        other => Err(format!("unknown command `{other}` ({HELP_TEXT})")),
    }
}
