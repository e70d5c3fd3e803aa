//! Line-oriented command dispatch used by instrument simulators
//!
//! A request is one text line, `<COMMAND> <argument>`. The command name is
//! case-folded before lookup; everything after it is rejoined with single
//! spaces to form the argument.

/// A parsed request line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine<'a> {
    /// Command name as sent, before case folding
    pub command: &'a str,
    /// Remaining tokens joined by single spaces; may be empty
    pub argument: String,
}

impl CommandLine<'_> {
    /// Lowercased command name used for table lookup
    pub fn key(&self) -> String {
        self.command.to_lowercase()
    }
}

/// Split a request line into command and argument
pub fn parse(line: &str) -> CommandLine<'_> {
    let mut tokens = line.split_whitespace();
    let command = tokens.next().unwrap_or("");
    let argument = tokens.collect::<Vec<_>>().join(" ");
    CommandLine { command, argument }
}

/// Reply sent for any command missing from a simulator's table
pub fn invalid_command(command: &str) -> String {
    format!("Invalid Command \"{}\"", command)
}
