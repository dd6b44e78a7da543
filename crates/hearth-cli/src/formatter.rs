//! Output format selection.

use serde::Serialize;

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Colored, human-readable.
    #[default]
    Pretty,
    /// One pretty-printed JSON document on stdout.
    Json,
}

impl OutputFormat {
    /// Parse the `--format` flag. Anything but `json` is pretty.
    pub(crate) fn from_flag(flag: &str) -> Self {
        if flag.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }

    pub(crate) fn is_json(self) -> bool {
        self == Self::Json
    }
}

/// Print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
