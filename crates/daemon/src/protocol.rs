//! Request and response model for the textual control protocol
//!
//! A request is one text line: a command name, optionally followed by
//! whitespace and a raw argument string that the matched command parses
//! itself. A response renders as:
//!
//! ```text
//! Status: Ok|Error
//! [Reason: <one-line reason>]
//!
//! [<multi-line body>]
//! ```
//!
//! A blank line separates the status/reason block from the body; when
//! there is no body, neither the blank line nor a body section is
//! emitted. `reason` carries short one-line errors, `body` structured
//! success payloads; the type does not enforce the distinction.

use std::fmt;

/// A parsed request line: command name plus the unparsed remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    name: &'a str,
    raw_args: &'a str,
}

impl<'a> Request<'a> {
    /// Split the first whitespace-delimited token off `line`.
    ///
    /// No validation happens here; the remainder is handed verbatim to
    /// the matched command.
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some((name, rest)) => Self {
                name,
                raw_args: rest.trim_start(),
            },
            None => Self {
                name: line,
                raw_args: "",
            },
        }
    }

    /// The candidate command name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The raw argument string, possibly empty.
    pub fn raw_args(&self) -> &'a str {
        self.raw_args
    }
}

/// Outcome of a request or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// The operation failed; `reason` says why.
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => f.write_str("Ok"),
            Self::Error => f.write_str("Error"),
        }
    }
}

/// A composed response, either to a request or describing an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: Status,
    reason: Option<String>,
    body: Option<String>,
}

impl Response {
    /// A bare success response.
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            reason: None,
            body: None,
        }
    }

    /// An error response with a one-line reason.
    pub fn error(reason: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            reason: Some(reason.into()),
            body: None,
        }
    }

    /// Attach a multi-line body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The response status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The reason line, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The body, if any.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Render the wire form.
    pub fn render(&self) -> String {
        let mut out = format!("Status: {}\n", self.status);
        if let Some(reason) = &self.reason {
            out.push_str("Reason: ");
            out.push_str(reason);
            out.push('\n');
        }
        if let Some(body) = &self.body {
            out.push('\n');
            out.push_str(body);
            if !body.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_splits_first_token() {
        let req = Request::parse("foo bar baz");
        assert_eq!(req.name(), "foo");
        assert_eq!(req.raw_args(), "bar baz");
    }

    #[test]
    fn request_without_args_has_empty_remainder() {
        let req = Request::parse("version");
        assert_eq!(req.name(), "version");
        assert_eq!(req.raw_args(), "");
    }

    #[test]
    fn request_trims_surrounding_whitespace() {
        let req = Request::parse("  answer   3 \n");
        assert_eq!(req.name(), "answer");
        assert_eq!(req.raw_args(), "3");
    }

    #[test]
    fn ok_without_body_renders_status_only() {
        assert_eq!(Response::ok().render(), "Status: Ok\n");
    }

    #[test]
    fn error_with_reason_has_no_blank_line() {
        let rendered = Response::error("No call with such id.").render();
        assert_eq!(rendered, "Status: Error\nReason: No call with such id.\n");
    }

    #[test]
    fn body_is_separated_by_exactly_one_blank_line() {
        let rendered = Response::ok().with_body("Version: 1.0").render();
        assert_eq!(rendered, "Status: Ok\n\nVersion: 1.0\n");
    }

    #[test]
    fn body_with_trailing_newline_is_not_doubled() {
        let rendered = Response::ok().with_body("Line\n").render();
        assert_eq!(rendered, "Status: Ok\n\nLine\n");
    }
}
