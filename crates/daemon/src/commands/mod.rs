//! Command registry, dispatcher and help synthesis
//!
//! Every controller-invocable operation is described by a [`Command`]:
//! a name, a usage prototype, a description, worked examples, and the
//! handler function. The full set is registered once at daemon start-up
//! and immutable afterwards; `help` and the HTML reference are
//! synthesized from the same descriptors.
//!
//! Dispatch is an exact match on the first whitespace-delimited token of
//! the request line — no prefixes, no abbreviations. The matched handler
//! receives the daemon core (under the daemon mutex, held by the caller)
//! and the raw remainder of the line, parses its own arguments, and
//! returns exactly one [`Response`].

mod call;
mod codec;
mod misc;
mod register;
mod settings;
mod stream;

use tracing::debug;

use crate::core::DaemonCore;
use crate::protocol::{Request, Response};

/// Handler signature shared by all commands.
///
/// The registry reference lets `help` render the command set; most
/// handlers ignore it.
pub type Handler = fn(&mut DaemonCore, &CommandRegistry, &str) -> Response;

/// A worked example shown by `help <command>`.
#[derive(Debug, Clone, Copy)]
pub struct CommandExample {
    /// The request line as typed by a controller.
    pub input: &'static str,
    /// The exact expected output.
    pub output: &'static str,
}

/// Immutable descriptor of one controller-invocable operation.
pub struct Command {
    name: &'static str,
    proto: &'static str,
    description: &'static str,
    examples: Vec<CommandExample>,
    handler: Handler,
}

impl Command {
    /// Describe a command. Examples are attached with [`Command::example`].
    pub fn new(
        name: &'static str,
        proto: &'static str,
        description: &'static str,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            proto,
            description,
            examples: Vec::new(),
            handler,
        }
    }

    /// Append a worked example.
    pub fn example(mut self, input: &'static str, output: &'static str) -> Self {
        self.examples.push(CommandExample { input, output });
        self
    }

    /// The exact-match dispatch name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The usage prototype shown in help listings.
    pub fn proto(&self) -> &'static str {
        self.proto
    }
}

/// The ordered set of registered commands.
pub struct CommandRegistry {
    // Kept sorted by usage prototype for the unfiltered help listing.
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Add a command at start-up. Registration order does not matter for
    /// dispatch; the listing stays sorted by prototype.
    pub fn register(&mut self, command: Command) {
        self.commands.push(command);
        self.commands.sort_by_key(|c| c.proto);
    }

    fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.name == name)
    }

    /// Route one request line to its handler, or report an unknown
    /// command. The caller holds the daemon mutex for the whole call.
    pub fn dispatch(&self, core: &mut DaemonCore, line: &str) -> Response {
        let request = Request::parse(line);
        match self.find(request.name()) {
            Some(command) => {
                debug!(command = command.name, "dispatching");
                (command.handler)(core, self, request.raw_args())
            }
            None => Response::error("Unknown command."),
        }
    }

    /// Render help text.
    ///
    /// With a matching command name: that command's prototype,
    /// description and worked examples. Otherwise: every prototype, one
    /// per line, sorted.
    pub fn help(&self, filter: &str) -> String {
        if let Some(command) = self.find(filter.trim()) {
            let mut out = format!("{}\n  {}\n", command.proto, command.description);
            for example in &command.examples {
                out.push_str(&format!("\n> {}\n{}\n", example.input, example.output));
            }
            return out;
        }
        let mut out = String::new();
        for command in &self.commands {
            out.push_str(command.proto);
            out.push('\n');
        }
        out
    }

    /// The full command reference as a standalone HTML page, for
    /// external documentation generation.
    pub fn dump_help_html(&self) -> String {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html>\n<head><title>voipd commands</title></head>\n<body>\n\
             <h1>voipd command reference</h1>\n<dl>\n",
        );
        for command in &self.commands {
            out.push_str(&format!(
                "<dt><code>{}</code></dt>\n<dd><p>{}</p>\n",
                escape_html(command.proto),
                escape_html(command.description)
            ));
            for example in &command.examples {
                out.push_str(&format!(
                    "<pre>&gt; {}\n{}</pre>\n",
                    escape_html(example.input),
                    escape_html(example.output)
                ));
            }
            out.push_str("</dd>\n");
        }
        out.push_str("</dl>\n</body>\n</html>\n");
        out
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Build the daemon's full command set.
pub fn build_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    misc::register_commands(&mut registry);
    call::register_commands(&mut registry);
    register::register_commands(&mut registry);
    codec::register_commands(&mut registry);
    stream::register_commands(&mut registry);
    settings::register_commands(&mut registry);
    registry
}

// ---- Shared argument parsing helpers ----

/// Parse a decimal controller handle.
fn parse_handle(token: &str) -> Option<u32> {
    token.parse::<u32>().ok().filter(|&h| h > 0)
}

/// The single expected token of an argument string, if there is exactly
/// one.
fn single_token(args: &str) -> Option<&str> {
    let mut tokens = args.split_whitespace();
    let first = tokens.next()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use voipd_engine_core::{SoftEngine, SoftEngineConfig};

    fn core() -> DaemonCore {
        let (engine, _controller) = SoftEngine::new(SoftEngineConfig::default());
        DaemonCore::new(Box::new(engine))
    }

    #[test]
    fn dispatch_matches_exact_name_with_raw_args() {
        fn probe(_core: &mut DaemonCore, _reg: &CommandRegistry, args: &str) -> Response {
            Response::ok().with_body(format!("args={args}"))
        }
        let mut registry = CommandRegistry::new();
        registry.register(Command::new("foo", "foo <x>", "probe", probe));

        let mut core = core();
        let response = registry.dispatch(&mut core, "foo bar baz");
        assert_eq!(response.body(), Some("args=bar baz"));
    }

    #[test]
    fn unknown_command_is_an_error_response() {
        let registry = build_registry();
        let mut core = core();
        let response = registry.dispatch(&mut core, "no-such-command 1 2 3");
        assert_eq!(response.status(), Status::Error);
        assert_eq!(response.reason(), Some("Unknown command."));
    }

    #[test]
    fn no_prefix_matching() {
        let registry = build_registry();
        let mut core = core();
        let response = registry.dispatch(&mut core, "vers");
        assert_eq!(response.status(), Status::Error);
    }

    #[test]
    fn unfiltered_help_lists_every_proto_sorted() {
        let registry = build_registry();
        let listing = registry.help("");
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), registry.len());
        let mut sorted = lines.clone();
        sorted.sort_unstable();
        assert_eq!(lines, sorted);
    }

    #[test]
    fn filtered_help_includes_examples() {
        let registry = build_registry();
        let text = registry.help("version");
        assert!(text.contains("version"));
        assert!(text.contains("> version"));
    }

    #[test]
    fn html_dump_escapes_angle_brackets() {
        let registry = build_registry();
        let html = registry.dump_help_html();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("&lt;sip-address&gt;") || html.contains("&lt;"));
        assert!(!registry.is_empty());
    }
}
