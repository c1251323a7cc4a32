//! Scripted executor double for unit tests.

use crate::errors::VboxResult;
use crate::manage::{CommandExecutor, CommandOutput, VboxCommand};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Script {
    rules: Vec<(String, VecDeque<CommandOutput>)>,
    issued: Vec<VboxCommand>,
}

/// Replays canned outputs and records every command issued.
///
/// Responses are keyed by a prefix of the rendered command line; the longest
/// matching prefix wins. Queued responses are consumed in order and the last
/// one repeats. Commands with no matching rule succeed with empty output.
#[derive(Clone, Default)]
pub(crate) struct ScriptedExecutor {
    script: Arc<Mutex<Script>>,
}

impl ScriptedExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, prefix: &str, output: CommandOutput) {
        let mut script = self.script.lock().unwrap();
        match script.rules.iter_mut().find(|(p, _)| p == prefix) {
            Some((_, queue)) => queue.push_back(output),
            None => script
                .rules
                .push((prefix.to_string(), VecDeque::from([output]))),
        }
    }

    pub(crate) fn ok(&self, prefix: &str, text: &str) {
        self.respond(prefix, CommandOutput::new(Some(0), text));
    }

    pub(crate) fn fail(&self, prefix: &str, text: &str) {
        self.respond(prefix, CommandOutput::new(Some(1), text));
    }

    /// Rendered command lines, in issue order.
    pub(crate) fn issued(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script.issued.iter().map(ToString::to_string).collect()
    }

    /// Rendered command lines that change hypervisor state.
    pub(crate) fn mutations(&self) -> Vec<String> {
        let script = self.script.lock().unwrap();
        script
            .issued
            .iter()
            .filter(|c| c.is_mutation())
            .map(ToString::to_string)
            .collect()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn execute(&self, command: &VboxCommand) -> VboxResult<CommandOutput> {
        let mut script = self.script.lock().unwrap();
        script.issued.push(command.clone());

        let line = command.to_string();
        let rule = script
            .rules
            .iter_mut()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());

        let output = match rule {
            Some((_, queue)) if queue.len() > 1 => queue.pop_front(),
            Some((_, queue)) => queue.front().cloned(),
            None => None,
        };
        Ok(output.unwrap_or_else(|| CommandOutput::new(Some(0), "")))
    }
}
