//! Feedback messages appended to the conversation after each engine action.
//!
//! These strings are what the model reads on its next turn, so their
//! wording is part of the protocol surface and lives in templates rather
//! than scattered format calls.

use anyhow::Result;
use minijinja::{Environment, context};

const COMMAND_RESULT_TEMPLATE: &str = include_str!("prompts/command_result.md");
const NO_COMMAND_TEMPLATE: &str = include_str!("prompts/no_command.md");
const AUTHORING_RESULT_TEMPLATE: &str = include_str!("prompts/authoring_result.md");
const TRANSPORT_FAILURE_TEMPLATE: &str = include_str!("prompts/transport_failure.md");

/// Template engine wrapper around minijinja.
pub struct FeedbackEngine {
    env: Environment<'static>,
}

impl FeedbackEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("command_result", COMMAND_RESULT_TEMPLATE)
            .expect("command_result template should be valid");
        env.add_template("no_command", NO_COMMAND_TEMPLATE)
            .expect("no_command template should be valid");
        env.add_template("authoring_result", AUTHORING_RESULT_TEMPLATE)
            .expect("authoring_result template should be valid");
        env.add_template("transport_failure", TRANSPORT_FAILURE_TEMPLATE)
            .expect("transport_failure template should be valid");
        Self { env }
    }

    /// Feedback carrying a dispatched command's result string.
    pub fn command_result(&self, result: &str) -> Result<String> {
        let rendered = self
            .env
            .get_template("command_result")?
            .render(context! { result => result.trim_end() })?;
        Ok(rendered)
    }

    /// Nudge sent when a turn carried no command at all.
    pub fn no_command(&self) -> Result<String> {
        Ok(self.env.get_template("no_command")?.render(context! {})?)
    }

    /// Feedback closing an authoring session, success or failure.
    pub fn authoring_result(&self, result: &str) -> Result<String> {
        let rendered = self
            .env
            .get_template("authoring_result")?
            .render(context! { result => result })?;
        Ok(rendered)
    }

    /// Feedback recorded when the completion request itself failed.
    pub fn transport_failure(&self, error: &str) -> Result<String> {
        let rendered = self
            .env
            .get_template("transport_failure")?
            .render(context! { error => error })?;
        Ok(rendered)
    }
}

impl Default for FeedbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_result_embeds_the_result_text() {
        let feedback = FeedbackEngine::new();
        let rendered = feedback.command_result("hello\n").expect("render");
        assert!(rendered.contains("The result of your last command was:"));
        assert!(rendered.contains("hello"));
        assert!(rendered.contains("what is your next action?"));
    }

    #[test]
    fn authoring_result_embeds_the_synthesis_outcome() {
        let feedback = FeedbackEngine::new();
        let rendered = feedback
            .authoring_result("[SUCCESS] Command 'greet' created.")
            .expect("render");
        assert!(rendered.contains("create_command_begin"));
        assert!(rendered.contains("[SUCCESS] Command 'greet' created."));
    }

    #[test]
    fn no_command_nudges_for_an_action() {
        let feedback = FeedbackEngine::new();
        let rendered = feedback.no_command().expect("render");
        assert!(rendered.contains("did not contain a command"));
    }
}
