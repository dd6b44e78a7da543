//! Proposal commands - create, inspect, decide and execute proposals.

use anyhow::{Context as _, Result};
use colored::Colorize;
use hearth_approval::{AiProposal, ProposalDecision, ProposalExecutionResult};
use hearth_core::{ActionId, ProposalId, SessionId};

use crate::context::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

fn parse_proposal_id(raw: &str) -> Result<ProposalId> {
    raw.parse().context("invalid proposal id")
}

/// Print a proposal with its actions.
pub(crate) fn print_proposal(proposal: &AiProposal) {
    let mut body = vec![
        Theme::kv("Status", &Theme::proposal_status(proposal.status)),
        Theme::kv("Risk", &Theme::risk_level(proposal.risk_level)),
        Theme::kv("Expires", &Theme::timestamp(&proposal.expires_at)),
        String::new(),
    ];
    for (i, action) in proposal.actions.iter().enumerate() {
        body.push(format!(
            "{}. {} {}",
            i.saturating_add(1),
            action.description,
            Theme::dimmed(&format!("[{}]", action.risk_level))
        ));
        body.push(format!(
            "   {} {}",
            Theme::dimmed("action"),
            Theme::short_id(&action.id)
        ));
    }
    let title = format!("Proposal {}: {}", Theme::short_id(&proposal.id), proposal.summary);
    println!("{}", Theme::proposal_box(&title, &body.join("\n"), proposal.risk_level));
}

/// Print what an execution did.
pub(crate) fn print_execution(result: &ProposalExecutionResult) {
    for action in &result.executed_actions {
        let line = format!(
            "{} (audit {})",
            action.function_name,
            action.audit_log_id.0
        );
        if action.success {
            println!("{}", Theme::success(&line));
        } else {
            println!("{}", Theme::error(&line));
            if let Some(error) = &action.error {
                println!("    {}", error.red());
            }
        }
        for warning in &action.warnings {
            println!("    {}", Theme::warning(warning));
        }
    }
    if result.failed_at == Some(result.executed_actions.len())
        && let Some(error) = &result.error
    {
        println!("{}", Theme::error(error));
    }
    let summary = format!(
        "{}: {}/{} actions applied",
        result.outcome(),
        result.succeeded(),
        result.executed_actions.len()
    );
    if result.error.is_some() {
        println!("{}", Theme::warning(&summary));
    } else {
        println!("{}", Theme::info(&summary));
    }
}

/// Store a new pending proposal.
pub(crate) async fn propose(
    ctx: &CliContext,
    session: Option<&str>,
    intents: &str,
    summary: Option<String>,
) -> Result<()> {
    let session = match session {
        Some(raw) => raw.parse::<SessionId>().context("invalid session id")?,
        None => SessionId::new(),
    };
    let intents = super::parse_intents(intents)?;
    let proposal = ctx
        .engine
        .propose_with_summary(ctx.household, session, &intents, summary)
        .await?;
    if ctx.format.is_json() {
        return print_json(&proposal);
    }
    print_proposal(&proposal);
    Ok(())
}

/// List proposals of the household.
pub(crate) async fn list_proposals(ctx: &CliContext, all: bool) -> Result<()> {
    let proposals = if all {
        ctx.engine.proposals(ctx.household).await?
    } else {
        ctx.engine.pending_proposals(ctx.household).await?
    };
    if ctx.format.is_json() {
        return print_json(&proposals);
    }
    if proposals.is_empty() {
        println!("{}", Theme::info("No proposals"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Proposals"));
    println!(
        "{:<10} {:<20} {:<10} {:>7}  {}",
        "ID".dimmed(),
        "STATUS".dimmed(),
        "RISK".dimmed(),
        "ACTIONS".dimmed(),
        "SUMMARY".dimmed()
    );
    println!("{}", Theme::separator());
    for p in &proposals {
        println!(
            "{:<10} {:<20} {} {:>7}  {}",
            Theme::short_id(&p.id),
            p.status.to_string(),
            Theme::risk_cell(p.risk_level, 10),
            p.actions.len(),
            p.summary
        );
    }
    println!();
    Ok(())
}

/// Show one proposal.
pub(crate) async fn show_proposal(ctx: &CliContext, id: &str) -> Result<()> {
    let proposal = ctx
        .engine
        .proposal(ctx.household, &parse_proposal_id(id)?)
        .await?;
    if ctx.format.is_json() {
        return print_json(&proposal);
    }
    print_proposal(&proposal);
    Ok(())
}

/// Approve all actions, or only `select`.
pub(crate) async fn approve(ctx: &CliContext, id: &str, select: &[String]) -> Result<()> {
    let selected = if select.is_empty() {
        None
    } else {
        Some(
            select
                .iter()
                .map(|s| s.parse::<ActionId>().context("invalid action id"))
                .collect::<Result<Vec<_>>>()?,
        )
    };
    decide(ctx, id, ProposalDecision::Approve { selected }).await
}

/// Reject a proposal.
pub(crate) async fn reject(ctx: &CliContext, id: &str) -> Result<()> {
    decide(ctx, id, ProposalDecision::Reject).await
}

async fn decide(ctx: &CliContext, id: &str, decision: ProposalDecision) -> Result<()> {
    let proposal = ctx
        .engine
        .resolve_proposal(ctx.household, &parse_proposal_id(id)?, decision, ctx.actor)
        .await?;
    if ctx.format.is_json() {
        return print_json(&proposal);
    }
    println!(
        "{}",
        Theme::success(&format!(
            "Proposal {} is now {}",
            Theme::short_id(&proposal.id),
            Theme::proposal_status(proposal.status)
        ))
    );
    Ok(())
}

/// Execute an approved proposal.
pub(crate) async fn execute(ctx: &CliContext, id: &str) -> Result<()> {
    let result = ctx
        .engine
        .execute_proposal(ctx.household, &parse_proposal_id(id)?, ctx.actor)
        .await?;
    if ctx.format.is_json() {
        return print_json(&result);
    }
    print_execution(&result);
    Ok(())
}

/// Delete resolved proposals older than `older_than_secs`.
pub(crate) async fn purge(ctx: &CliContext, older_than_secs: u64) -> Result<()> {
    let removed = ctx
        .engine
        .purge_proposals(ctx.household, older_than_secs)
        .await?;
    if ctx.format.is_json() {
        return print_json(&serde_json::json!({ "removed": removed }));
    }
    println!(
        "{}",
        Theme::success(&format!("Removed {removed} resolved proposals"))
    );
    Ok(())
}
