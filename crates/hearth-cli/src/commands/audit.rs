//! Audit command - view the AI audit log and undo actions.

use anyhow::{Context as _, Result};
use colored::Colorize;
use hearth_audit::AuditEntryId;

use crate::context::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

fn parse_audit_id(raw: &str) -> Result<AuditEntryId> {
    raw.parse().context("invalid audit entry id")
}

/// List audit entries, oldest first, or only undoable ones, newest first.
pub(crate) async fn list_entries(ctx: &CliContext, undoable: bool) -> Result<()> {
    let entries = if undoable {
        ctx.engine.undoable_entries(ctx.household).await?
    } else {
        ctx.engine.audit_entries(ctx.household).await?
    };
    if ctx.format.is_json() {
        return print_json(&entries);
    }
    if entries.is_empty() {
        println!("{}", Theme::info("No audit entries"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Audit Entries"));
    println!(
        "{:<20} {:<10} {:<28} {:<10} {}",
        "STARTED".dimmed(),
        "ID".dimmed(),
        "FUNCTION".dimmed(),
        "RISK".dimmed(),
        "STATUS".dimmed()
    );
    println!("{}", Theme::separator());
    for entry in &entries {
        println!(
            "{:<20} {:<10} {:<28} {} {}",
            Theme::timestamp(&entry.started_at),
            Theme::short_id(&entry.id),
            entry.function_name,
            Theme::risk_cell(entry.risk_level, 10),
            Theme::audit_status(entry.status)
        );
    }
    println!();
    Ok(())
}

/// Show one audit entry in full.
pub(crate) async fn show_entry(ctx: &CliContext, id: &str) -> Result<()> {
    let entry = ctx
        .engine
        .audit_entry(ctx.household, &parse_audit_id(id)?)
        .await?;
    if ctx.format.is_json() {
        return print_json(&entry);
    }

    println!("\n{}", Theme::header(&format!("Audit entry {}", entry.id.0)));
    println!("{}", Theme::kv("Function", &entry.function_name));
    println!("{}", Theme::kv("Status", &Theme::audit_status(entry.status)));
    println!("{}", Theme::kv("Risk", &Theme::risk_level(entry.risk_level)));
    println!("{}", Theme::kv("Arguments", &entry.arguments.to_string()));
    println!("{}", Theme::kv("Started", &Theme::timestamp(&entry.started_at)));
    if let Some(at) = &entry.completed_at {
        println!("{}", Theme::kv("Completed", &Theme::timestamp(at)));
    }
    if let Some(proposal) = &entry.proposal_id {
        println!("{}", Theme::kv("Proposal", &proposal.to_string()));
    }
    if let Some(error) = &entry.error {
        println!("{}", Theme::kv("Error", &error.red().to_string()));
    }
    if let Some(at) = &entry.undone_at {
        println!("{}", Theme::kv("Undone", &Theme::timestamp(at)));
    }
    println!(
        "{}",
        Theme::kv("Undoable", if entry.is_undoable() { "yes" } else { "no" })
    );
    println!();
    Ok(())
}

/// Revert one executed action.
pub(crate) async fn undo(ctx: &CliContext, id: &str) -> Result<()> {
    let result = ctx
        .engine
        .undo(ctx.household, &parse_audit_id(id)?, ctx.actor)
        .await?;
    if ctx.format.is_json() {
        return print_json(&result);
    }
    println!(
        "{}",
        Theme::success(&format!(
            "Undid {} ({} entities restored)",
            result.function_name, result.restored_entities
        ))
    );
    Ok(())
}
