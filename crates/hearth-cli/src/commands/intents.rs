//! Single-intent commands: `evaluate` and `run`.

use anyhow::{Context as _, Result};
use hearth_approval::IntentOutcome;
use hearth_core::SessionId;
use hearth_household::FunctionIntent;

use crate::context::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

use super::proposals::{print_execution, print_proposal};

/// Report whether an intent would run without confirmation.
pub(crate) async fn evaluate(
    ctx: &CliContext,
    function: &str,
    arguments: Option<&str>,
) -> Result<()> {
    let intent = FunctionIntent::new(function, super::parse_arguments(arguments)?);
    let evaluation = ctx.engine.evaluate(ctx.household, &intent).await?;
    if ctx.format.is_json() {
        return print_json(&evaluation);
    }

    println!(
        "{}",
        Theme::kv("Risk", &Theme::risk_level(evaluation.function.risk_level))
    );
    println!(
        "{}",
        Theme::kv(
            "Reversible",
            if evaluation.function.is_reversible { "yes" } else { "no" }
        )
    );
    let verdict = format!("{}", evaluation.reason);
    if evaluation.auto_execute {
        println!("{}", Theme::success(&format!("Runs automatically: {verdict}")));
    } else {
        println!("{}", Theme::warning(&format!("Needs approval: {verdict}")));
    }
    Ok(())
}

/// Execute an intent if trust allows it, otherwise store a proposal.
pub(crate) async fn run(
    ctx: &CliContext,
    function: &str,
    arguments: Option<&str>,
    session: Option<&str>,
) -> Result<()> {
    let session = match session {
        Some(raw) => raw.parse::<SessionId>().context("invalid session id")?,
        None => SessionId::new(),
    };
    let intent = FunctionIntent::new(function, super::parse_arguments(arguments)?);
    let outcome = ctx
        .engine
        .handle_intent(ctx.household, session, &intent, ctx.actor)
        .await?;
    if ctx.format.is_json() {
        return print_json(&outcome);
    }

    match outcome {
        IntentOutcome::Executed { result } => print_execution(&result),
        IntentOutcome::Proposed { proposal, reason } => {
            println!("{}", Theme::warning(&format!("Needs approval: {reason}")));
            print_proposal(&proposal);
            println!(
                "{}",
                Theme::dimmed(&format!(
                    "Approve with: hearth proposals approve {}",
                    proposal.id.0
                ))
            );
        },
    }
    Ok(())
}
