//! CLI theme and styling.

use colored::Colorize;
use hearth_approval::ProposalStatus;
use hearth_audit::AuditStatus;
use hearth_core::{RiskLevel, Timestamp};

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Box around a proposal, colored by its risk.
    pub(crate) fn proposal_box(title: &str, content: &str, risk: RiskLevel) -> String {
        let color_fn = match risk {
            RiskLevel::Low => |s: &str| s.green().to_string(),
            RiskLevel::Medium => |s: &str| s.yellow().to_string(),
            RiskLevel::High => |s: &str| s.red().to_string(),
            RiskLevel::Critical => |s: &str| s.red().bold().to_string(),
        };

        let width: usize = 72;
        let inner = width.saturating_sub(2);
        let top = format!("╭{}╮", "─".repeat(inner));
        let bottom = format!("╰{}╯", "─".repeat(inner));
        let empty = format!("│{:w$}│", "", w = inner);

        let pad_line = |text: &str| -> String {
            let visible_len = strip_ansi(text).chars().count();
            let padding = width.saturating_sub(4).saturating_sub(visible_len);
            format!("│ {text}{:p$} │", "", p = padding)
        };

        let mut lines = vec![
            color_fn(&top),
            pad_line(&title.bold().to_string()),
            color_fn(&empty),
        ];
        for line in content.lines() {
            lines.push(pad_line(line));
        }
        lines.push(color_fn(&bottom));
        lines.join("\n")
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a risk level.
    pub(crate) fn risk_level(level: RiskLevel) -> String {
        Self::risk_cell(level, 0)
    }

    /// Format a risk level left-aligned in a column of `width`.
    pub(crate) fn risk_cell(level: RiskLevel, width: usize) -> String {
        let text = format!("{:<width$}", level.as_str().to_uppercase());
        match level {
            RiskLevel::Low => text.green().to_string(),
            RiskLevel::Medium => text.yellow().to_string(),
            RiskLevel::High => text.red().to_string(),
            RiskLevel::Critical => text.red().bold().to_string(),
        }
    }

    /// Format a proposal status.
    pub(crate) fn proposal_status(status: ProposalStatus) -> String {
        let text = status.to_string();
        match status {
            ProposalStatus::Pending => text.cyan().to_string(),
            ProposalStatus::Approved | ProposalStatus::PartiallyApproved => {
                text.green().to_string()
            },
            ProposalStatus::Rejected | ProposalStatus::Expired => text.dimmed().to_string(),
        }
    }

    /// Format an audit status.
    pub(crate) fn audit_status(status: AuditStatus) -> String {
        let text = status.to_string();
        match status {
            AuditStatus::Started => text.yellow().to_string(),
            AuditStatus::Succeeded => text.green().to_string(),
            AuditStatus::Failed => text.red().to_string(),
            AuditStatus::Undone => text.dimmed().to_string(),
        }
    }

    /// Format an id (the uuid part, shortened).
    pub(crate) fn short_id(id: &impl std::fmt::Display) -> String {
        let full = id.to_string();
        let bare = full.rsplit(':').next().unwrap_or(&full);
        let short: String = bare.chars().take(8).collect();
        format!("{}", short.cyan())
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(ts: &Timestamp) -> String {
        ts.0.format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
            .to_string()
    }
}

/// Strip ANSI escape codes from a string for visible-length calculation.
fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            result.push(c);
        }
    }
    result
}
