//! Configuration wizard form

use super::terminal::KeyInput;
use crate::config::{FIELDS, WizardConfig};

/// Result of feeding one key to the form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormOutcome {
    Editing,
    Submitted(WizardConfig),
}

/// Text inputs for every configuration field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigForm {
    base: WizardConfig,
    inputs: Vec<String>,
    focus: usize,
    error: Option<String>,
}

impl ConfigForm {
    pub fn new(config: &WizardConfig) -> Self {
        Self {
            base: config.clone(),
            inputs: FIELDS.iter().map(|field| config.value(field.key)).collect(),
            focus: 0,
            error: None,
        }
    }

    pub fn handle(&mut self, key: KeyInput) -> FormOutcome {
        match key {
            KeyInput::Up => self.focus = self.focus.saturating_sub(1),
            KeyInput::Down => self.focus = (self.focus + 1).min(FIELDS.len() - 1),
            KeyInput::Tab => self.focus = (self.focus + 1) % FIELDS.len(),
            KeyInput::Char(c) => self.inputs[self.focus].push(c),
            KeyInput::Backspace => {
                self.inputs[self.focus].pop();
            }
            KeyInput::Enter => return self.submit(),
            KeyInput::Escape | KeyInput::CtrlC | KeyInput::Other => {}
        }
        FormOutcome::Editing
    }

    fn submit(&mut self) -> FormOutcome {
        let mut config = self.base.clone();

        for (position, (field, input)) in FIELDS.iter().zip(&self.inputs).enumerate() {
            if let Err(reason) = config.set_value(field.key, input) {
                self.focus = position;
                self.error = Some(format!("{}: {}", field.label, reason));
                return FormOutcome::Editing;
            }
        }

        self.error = None;
        FormOutcome::Submitted(config)
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fields paired with their current input, masked where secret
    pub fn rows(&self) -> impl Iterator<Item = (&'static str, String, bool)> + '_ {
        FIELDS
            .iter()
            .zip(&self.inputs)
            .enumerate()
            .map(|(position, (field, input))| {
                let shown = if field.secret {
                    "*".repeat(input.chars().count())
                } else {
                    input.clone()
                };
                (field.label, shown, position == self.focus)
            })
    }
}
