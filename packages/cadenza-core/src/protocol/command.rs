//! Request line construction.
//!
//! A request is a command name followed by its arguments on a single line.
//! Arguments that would otherwise split or confuse the tokenizer are
//! double-quoted, with `"` and `\` escaped by a backslash.

use std::borrow::Cow;
use std::fmt;

use crate::protocol_constants::CMD_PASSWORD;

/// Builder for a single protocol request.
///
/// # Example
/// ```ignore
/// let command = Command::new("find")
///     .arg("albumartist")
///     .arg("Leonard Bernstein");
/// assert_eq!(command.to_line(), "find albumartist \"Leonard Bernstein\"\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Command {
    name: String,
    args: Vec<String>,
}

impl Command {
    /// Creates a command without arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument.
    ///
    /// Arguments are rendered in the order they are added.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Appends an argument only when it is present.
    #[must_use]
    pub fn arg_opt(self, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.arg(value),
            None => self,
        }
    }

    /// Appends every argument from an iterator.
    #[must_use]
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(values.into_iter().map(Into::into));
        self
    }

    /// Returns the command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the arguments in order.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Renders the request line, including the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let mut line = self.name.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote_arg(arg));
        }
        line.push('\n');
        line
    }
}

/// Formats the command for logs. Credentials are masked.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.name == CMD_PASSWORD {
            return write!(f, " ******");
        }
        for arg in &self.args {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

/// Quotes an argument when the server tokenizer would otherwise split it.
///
/// Control characters are dropped; a newline would end the request line.
pub(crate) fn quote_arg(arg: &str) -> Cow<'_, str> {
    let arg: Cow<'_, str> = if arg.chars().any(char::is_control) {
        Cow::Owned(arg.chars().filter(|c| !c.is_control()).collect())
    } else {
        Cow::Borrowed(arg)
    };

    let needs_quotes = arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || c == '"' || c == '\\' || c == '\'');
    if !needs_quotes {
        return arg;
    }

    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for c in arg.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_command_renders_name_only() {
        assert_eq!(Command::new("status").to_line(), "status\n");
    }

    #[test]
    fn plain_arguments_are_not_quoted() {
        let command = Command::new("idle").args(["player", "mixer"]);
        assert_eq!(command.to_line(), "idle player mixer\n");
    }

    #[test]
    fn arguments_with_spaces_are_quoted() {
        let command = Command::new("find")
            .arg("albumartist")
            .arg("Leonard Bernstein");
        assert_eq!(
            command.to_line(),
            "find albumartist \"Leonard Bernstein\"\n"
        );
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        let command = Command::new("find").arg("title").arg(r#"say "hi" \o/"#);
        assert_eq!(
            command.to_line(),
            "find title \"say \\\"hi\\\" \\\\o/\"\n"
        );
    }

    #[test]
    fn empty_argument_is_quoted() {
        assert_eq!(Command::new("update").arg("").to_line(), "update \"\"\n");
    }

    #[test]
    fn control_characters_cannot_end_the_line_early() {
        let line = Command::new("find")
            .arg("Title")
            .arg("x\nclear")
            .arg("Blue\r\n Note")
            .to_line();
        assert_eq!(line, "find Title xclear \"Blue Note\"\n");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn optional_argument_is_skipped_when_absent() {
        let command = Command::new("update").arg_opt(None::<String>);
        assert!(command.arguments().is_empty());
    }

    #[test]
    fn display_masks_password() {
        let command = Command::new("password").arg("hunter2");
        assert_eq!(command.to_string(), "password ******");
        assert_eq!(command.to_line(), "password hunter2\n");
    }
}
