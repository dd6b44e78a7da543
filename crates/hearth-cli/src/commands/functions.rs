//! `hearth functions` - the function catalog with effective risk.

use anyhow::Result;
use colored::Colorize;

use crate::context::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

/// List every catalog function with its effective classification.
pub(crate) fn list_functions(ctx: &CliContext) -> Result<()> {
    let functions = ctx.engine.functions();
    if ctx.format.is_json() {
        return print_json(&functions);
    }

    println!("\n{}", Theme::header("Functions"));
    println!(
        "{:<28} {:<10} {:<11} {}",
        "NAME".dimmed(),
        "RISK".dimmed(),
        "REVERSIBLE".dimmed(),
        "CONFIRM AT".dimmed()
    );
    println!("{}", Theme::separator());
    for f in functions {
        // Pad before coloring; ANSI codes break width specifiers.
        println!(
            "{:<28} {} {:<11} {}",
            f.name,
            Theme::risk_cell(f.risk_level, 10),
            if f.is_reversible { "yes" } else { "no" },
            f.requires_confirmation_above
        );
    }
    println!();
    Ok(())
}
