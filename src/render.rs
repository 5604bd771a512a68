//! Rendering contract and the default terminal renderer.
//!
//! `RenderSink` is the UI contract consumed by the console frontend. Tests
//! substitute a recording sink without coupling to stdout/stderr.

use crossterm::style::{Color, Stylize};

use crate::telemetry::{tone_for, Tone};

const INDENT: &str = "  ";
const LABEL_WARNING: &str = "warning:";
const LABEL_ERROR: &str = "error:";
const LABEL_APPROVAL: &str = "approval:";

/// Injectable rendering interface.
pub trait RenderSink: Send + Sync {
    /// Render the input prompt.
    fn prompt(&self);
    /// Render one operator output line, colored by its tone.
    fn output(&self, line: &str);
    /// Render a titled section divider.
    fn section(&self, title: &str);
    /// Render one key/value field row.
    fn field(&self, key: &str, value: &str);
    /// Render connection and lifecycle chatter.
    fn activity(&self, text: &str);
    /// Render an approval prompt or notice.
    fn approval(&self, text: &str);
    fn warn(&self, msg: &str);
    fn error(&self, msg: &str);
}

/// Terminal renderer. Output lines go to stdout, everything else to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn tone_color(tone: Tone) -> Color {
        match tone {
            Tone::Danger => Color::Red,
            Tone::Warn => Color::Yellow,
            Tone::Ok => Color::Green,
            Tone::Info => Color::Reset,
        }
    }
}

impl RenderSink for Renderer {
    fn prompt(&self) {
        if self.color {
            eprint!("{} ", "tayka>".with(Color::Cyan).bold());
        } else {
            eprint!("tayka> ");
        }
    }

    fn output(&self, line: &str) {
        if self.color {
            let tone = tone_for(line);
            println!("{}", line.with(Self::tone_color(tone)));
        } else {
            println!("{line}");
        }
    }

    fn section(&self, title: &str) {
        if self.color {
            eprintln!("{} {}", "•".with(Color::DarkGrey), title.bold());
        } else {
            eprintln!("{title}:");
        }
    }

    fn field(&self, key: &str, value: &str) {
        if self.color {
            eprintln!("{INDENT}{}: {value}", key.with(Color::DarkGrey));
        } else {
            eprintln!("{INDENT}{key}: {value}");
        }
    }

    fn activity(&self, text: &str) {
        if self.color {
            eprintln!("{}", text.with(Color::DarkGrey));
        } else {
            eprintln!("{text}");
        }
    }

    fn approval(&self, text: &str) {
        if self.color {
            eprintln!("{} {text}", LABEL_APPROVAL.with(Color::Magenta).bold());
        } else {
            eprintln!("{LABEL_APPROVAL} {text}");
        }
    }

    fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(Color::Yellow).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(Color::Red).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_colors_are_distinct_for_alerts() {
        assert_eq!(Renderer::tone_color(Tone::Danger), Color::Red);
        assert_eq!(Renderer::tone_color(Tone::Warn), Color::Yellow);
        assert_ne!(
            Renderer::tone_color(Tone::Ok),
            Renderer::tone_color(Tone::Info)
        );
    }
}
