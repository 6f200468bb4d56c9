//! Operator confirmation gates: the pause between the patch and forge passes,
//! and the periodic throttle inside the forge pass.

use anyhow::Result;
use dialoguer::{Input, theme::ColorfulTheme};

/// Answers that let a paused run continue, compared case-insensitively.
pub const AFFIRMATIVE: &[&str] = &["y", "yes", "ok", "c", "continue"];

pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    AFFIRMATIVE.contains(&answer.as_str())
}

/// Blocks the run until the operator agrees to go on.
pub trait ConfirmGate: Send {
    fn wait_for_ok(&mut self, message: &str) -> Result<()>;
}

/// Asks on the terminal, re-asking until the answer is affirmative.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl ConfirmGate for TerminalPrompt {
    fn wait_for_ok(&mut self, message: &str) -> Result<()> {
        loop {
            let answer: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt(message)
                .allow_empty(true)
                .interact_text()?;
            if is_affirmative(&answer) {
                return Ok(());
            }
        }
    }
}

/// Never blocks; counts how often it was asked (`--no-pause`, tests).
#[derive(Debug, Default)]
pub struct AutoConfirm {
    pub asked: usize,
}

impl ConfirmGate for AutoConfirm {
    fn wait_for_ok(&mut self, message: &str) -> Result<()> {
        self.asked += 1;
        println!("  {} {}", console::style("Auto-approved").dim(), message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_yes_variants() {
        for answer in ["y", "YES", "Ok", "c", "continue", " yes \n"] {
            assert!(is_affirmative(answer), "{answer:?}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for answer in ["", "n", "no", "yep", "cont"] {
            assert!(!is_affirmative(answer), "{answer:?}");
        }
    }

    #[test]
    fn auto_confirm_counts() {
        let mut gate = AutoConfirm::default();
        gate.wait_for_ok("Continue?").unwrap();
        gate.wait_for_ok("Continue?").unwrap();
        assert_eq!(gate.asked, 2);
    }
}
