/// Formatting options for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonOptions {
    /// Put every entry on its own line.
    pub pretty: bool,
    /// Indentation per nesting level when `pretty` is set.
    pub indent: &'static str,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            indent: "  ",
        }
    }
}

impl JsonOptions {
    /// Compact output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables indented output.
    pub const fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    /// Sets the indentation string. Implies `pretty`.
    pub const fn indent(mut self, indent: &'static str) -> Self {
        self.indent = indent;
        self.pretty = true;
        self
    }
}
