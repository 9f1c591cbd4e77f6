//! Invocation routing: control commands, reserved shell execution, and
//! registered handlers.

use std::time::Duration;

use tracing::debug;

use crate::core::parser::Invocation;
use crate::core::types::Authoring;
use crate::io::config::EngineConfig;
use crate::io::executor::CommandRunner;
use crate::io::registry::HandlerRegistry;

/// Opens a handler-authoring session for the named command.
pub const CREATE_COMMAND_BEGIN: &str = "create_command_begin";
/// Signals that the whole task is finished.
pub const TASK_COMPLETE: &str = "task_complete";
/// Signals that the model needs an answer from the user.
pub const REQUEST_USER_INPUT: &str = "request_user_input";
/// Reserved for direct local shell execution; never resolvable as a handler.
pub const RUN_SHELL: &str = "run_shell";

const DEFAULT_COMPLETION_MESSAGE: &str = "Task completed.";
const DEFAULT_INPUT_PROMPT: &str = "What is your next step?";

/// Joins `args` with spaces, falling back to `default` when there are none.
fn joined_or(args: &[String], default: &str) -> String {
    if args.is_empty() {
        default.to_string()
    } else {
        args.join(" ")
    }
}

/// How the loop driver must proceed after a dispatch.
///
/// Flow signals are ordinary values inspected by the caller, so no
/// unwinding is involved in ending a task or pausing for input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Feed the result string back to the model and keep stepping.
    Continue(String),
    /// The model declared the task finished; reset to awaiting a new goal.
    Finished(String),
    /// The model needs an answer from the user before it can continue.
    NeedsInput(String),
}

/// True for names the dispatcher claims before any registry lookup.
pub fn is_control_name(name: &str) -> bool {
    matches!(
        name,
        CREATE_COMMAND_BEGIN | TASK_COMPLETE | REQUEST_USER_INPUT | RUN_SHELL
    )
}

/// Routes parsed invocations to control actions, the local shell, or
/// registered handlers. Recoverable problems come back as tagged strings
/// inside [`Flow::Continue`]; nothing here is fatal to the loop.
pub struct Dispatcher<'a> {
    config: &'a EngineConfig,
    registry: &'a HandlerRegistry,
    runner: CommandRunner,
}

impl<'a> Dispatcher<'a> {
    pub fn new(config: &'a EngineConfig, registry: &'a HandlerRegistry) -> Self {
        let runner = CommandRunner::new(
            Duration::from_secs(config.command_timeout_secs),
            config.output_limit_bytes,
        );
        Self {
            config,
            registry,
            runner,
        }
    }

    /// Map one invocation to an effect.
    pub fn dispatch(&self, invocation: &Invocation, authoring: &mut Authoring) -> Flow {
        debug!(name = %invocation.name, args = invocation.args.len(), "dispatching");
        match invocation.name.as_str() {
            CREATE_COMMAND_BEGIN => Flow::Continue(self.begin_authoring(invocation, authoring)),
            TASK_COMPLETE => Flow::Finished(joined_or(&invocation.args, DEFAULT_COMPLETION_MESSAGE)),
            REQUEST_USER_INPUT => {
                Flow::NeedsInput(joined_or(&invocation.args, DEFAULT_INPUT_PROMPT))
            }
            RUN_SHELL => Flow::Continue(self.run_shell(invocation)),
            _ => Flow::Continue(self.run_registered(invocation)),
        }
    }

    fn begin_authoring(&self, invocation: &Invocation, authoring: &mut Authoring) -> String {
        let [name] = invocation.args.as_slice() else {
            return format!(
                "[ERROR] '{CREATE_COMMAND_BEGIN}' requires exactly one argument: the new command name."
            );
        };
        if is_control_name(name) {
            return format!("[ERROR] '{name}' is a reserved command name.");
        }
        if !HandlerRegistry::validate_name(name) {
            return format!("[ERROR] '{name}' is not a valid command name (use A-Za-z0-9._- only).");
        }
        *authoring = Authoring::begin(name.clone());
        format!("[INFO] Entering code mode for new command '{name}'. Awaiting the code block.")
    }

    fn run_shell(&self, invocation: &Invocation) -> String {
        if invocation.args.is_empty() {
            return format!("[ERROR] No command provided to {RUN_SHELL}.");
        }
        let command_line = invocation.args.join(" ");
        match self.runner.run_shell(&self.config.shell.command, &command_line) {
            Ok(result) => self.runner.render_result(RUN_SHELL, &result),
            Err(err) => format!("[EXECUTION ERROR] Failed to execute {RUN_SHELL}: {err:#}"),
        }
    }

    fn run_registered(&self, invocation: &Invocation) -> String {
        let name = &invocation.name;
        let Some(script) = self.registry.resolve(name) else {
            return format!("[ERROR] Unknown command: '{name}'");
        };
        match self
            .runner
            .run_handler(&self.config.handler.interpreter, &script, &invocation.args)
        {
            Ok(result) => self.runner.render_result(name, &result),
            Err(err) => {
                format!("[EXECUTION ERROR] An unexpected error occurred while running '{name}': {err:#}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invocation(name: &str, args: &[&str]) -> Invocation {
        Invocation {
            name: name.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn shell_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.handler.interpreter = vec!["sh".to_string()];
        config.handler.extension = "sh".to_string();
        config
    }

    #[test]
    fn task_complete_without_args_uses_default_payload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(TASK_COMPLETE, &[]), &mut authoring);
        assert_eq!(flow, Flow::Finished("Task completed.".to_string()));
    }

    #[test]
    fn task_complete_joins_argument_payload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(TASK_COMPLETE, &["done", "now"]), &mut authoring);
        assert_eq!(flow, Flow::Finished("done now".to_string()));
    }

    #[test]
    fn request_user_input_raises_needs_input() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(REQUEST_USER_INPUT, &[]), &mut authoring);
        assert_eq!(flow, Flow::NeedsInput("What is your next step?".to_string()));

        let flow = dispatcher.dispatch(
            &invocation(REQUEST_USER_INPUT, &["which", "file?"]),
            &mut authoring,
        );
        assert_eq!(flow, Flow::NeedsInput("which file?".to_string()));
    }

    #[test]
    fn create_command_begin_requires_exactly_one_argument() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        for args in [&[] as &[&str], &["a", "b"]] {
            let flow = dispatcher.dispatch(&invocation(CREATE_COMMAND_BEGIN, args), &mut authoring);
            assert!(matches!(&flow, Flow::Continue(msg) if msg.starts_with("[ERROR]")));
            assert_eq!(authoring, Authoring::Inactive);
        }
    }

    #[test]
    fn create_command_begin_enters_authoring_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(CREATE_COMMAND_BEGIN, &["greet"]), &mut authoring);
        assert!(matches!(&flow, Flow::Continue(msg) if msg.starts_with("[INFO]")));
        assert_eq!(authoring, Authoring::begin("greet"));
    }

    #[test]
    fn reserved_names_cannot_be_authored() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow =
            dispatcher.dispatch(&invocation(CREATE_COMMAND_BEGIN, &[RUN_SHELL]), &mut authoring);
        assert!(matches!(&flow, Flow::Continue(msg) if msg.contains("reserved")));
        assert_eq!(authoring, Authoring::Inactive);
    }

    #[test]
    fn unknown_command_names_the_missing_handler() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation("ghost", &["x"]), &mut authoring);
        assert_eq!(
            flow,
            Flow::Continue("[ERROR] Unknown command: 'ghost'".to_string())
        );
    }

    #[test]
    fn run_shell_requires_a_command_line() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(RUN_SHELL, &[]), &mut authoring);
        assert!(matches!(&flow, Flow::Continue(msg) if msg.starts_with("[ERROR]")));
    }

    #[test]
    fn run_shell_executes_and_returns_stdout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation(RUN_SHELL, &["echo", "hi"]), &mut authoring);
        assert_eq!(flow, Flow::Continue("hi\n".to_string()));
    }

    #[test]
    fn registered_handler_runs_with_positional_args() {
        let temp = tempfile::tempdir().expect("tempdir");
        let config = shell_config();
        let registry = HandlerRegistry::new(temp.path(), "sh");
        registry
            .create("greet", "echo \"greeting: $1\"\n")
            .expect("create");
        let dispatcher = Dispatcher::new(&config, &registry);
        let mut authoring = Authoring::Inactive;

        let flow = dispatcher.dispatch(&invocation("greet", &["world"]), &mut authoring);
        assert_eq!(flow, Flow::Continue("greeting: world\n".to_string()));
    }
}
