use std::io::{self, BufRead, Write};

/// Confirmation and prompt dialogs, injected so gestures can run headless.
pub trait UserInteraction {
    fn confirm(&mut self, question: &str) -> bool;

    /// `None` means the user cancelled the prompt.
    fn prompt(&mut self, question: &str, default: &str) -> Option<String>;
}

/// Line-based dialogs on stdin/stdout for one-shot commands.
pub struct TerminalInteraction<R, W> {
    input: R,
    output: W,
}

impl TerminalInteraction<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        TerminalInteraction::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalInteraction<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalInteraction { input, output }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

impl<R: BufRead, W: Write> UserInteraction for TerminalInteraction<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        let _ = write!(self.output, "{} [y/N] ", question);
        let _ = self.output.flush();
        matches!(
            self.read_line().map(|s| s.trim().to_lowercase()).as_deref(),
            Some("y") | Some("yes")
        )
    }

    fn prompt(&mut self, question: &str, default: &str) -> Option<String> {
        let _ = write!(self.output, "{} [{}] ", question, default);
        let _ = self.output.flush();
        let answer = self.read_line()?;
        if answer.trim().is_empty() {
            Some(default.to_string())
        } else {
            Some(answer.trim().to_string())
        }
    }
}

/// Answers dialogs from a fixed script; records every question asked.
#[cfg(test)]
#[derive(Default)]
pub struct ScriptedInteraction {
    pub confirms: std::collections::VecDeque<bool>,
    pub answers: std::collections::VecDeque<Option<String>>,
    pub asked: Vec<String>,
}

#[cfg(test)]
impl ScriptedInteraction {
    pub fn accepting() -> Self {
        ScriptedInteraction {
            confirms: [true].into(),
            ..Default::default()
        }
    }

    pub fn declining() -> Self {
        ScriptedInteraction {
            confirms: [false].into(),
            ..Default::default()
        }
    }

    pub fn with_answers(mut self, answers: &[Option<&str>]) -> Self {
        self.answers = answers.iter().map(|a| a.map(str::to_string)).collect();
        self
    }
}

#[cfg(test)]
impl UserInteraction for ScriptedInteraction {
    fn confirm(&mut self, question: &str) -> bool {
        self.asked.push(question.to_string());
        self.confirms.pop_front().unwrap_or(false)
    }

    fn prompt(&mut self, question: &str, _default: &str) -> Option<String> {
        self.asked.push(question.to_string());
        self.answers.pop_front().flatten()
    }
}
