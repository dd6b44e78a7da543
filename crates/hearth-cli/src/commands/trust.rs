//! Trust commands - show and change a household's autonomy settings.

use anyhow::Result;
use hearth_approval::TrustSettingsUpdate;
use hearth_core::RiskLevel;

use crate::context::CliContext;
use crate::formatter::print_json;
use crate::theme::Theme;

/// Show trust settings and the remaining rate budget.
pub(crate) async fn show_trust(ctx: &CliContext) -> Result<()> {
    let trust = ctx.engine.trust_settings(ctx.household).await?;
    let remaining = ctx.engine.remaining_actions(ctx.household).await?;
    if ctx.format.is_json() {
        return print_json(&serde_json::json!({
            "trust": trust,
            "remaining_actions": remaining,
        }));
    }

    println!("\n{}", Theme::header("Household trust"));
    println!("{}", Theme::kv("Household", &trust.household_id.to_string()));
    println!(
        "{}",
        Theme::kv(
            "Auto-approve up to",
            &Theme::risk_level(trust.auto_approve_threshold)
        )
    );
    println!(
        "{}",
        Theme::kv(
            "Rate limit",
            &format!(
                "{} actions per {}s",
                trust.max_actions_per_window, trust.window_seconds
            )
        )
    );
    println!("{}", Theme::kv("Remaining now", &remaining.to_string()));
    println!();
    Ok(())
}

/// Apply a partial update.
pub(crate) async fn set_trust(
    ctx: &CliContext,
    threshold: Option<RiskLevel>,
    max_actions: Option<u32>,
    window_secs: Option<u64>,
) -> Result<()> {
    let update = TrustSettingsUpdate {
        auto_approve_threshold: threshold,
        max_actions_per_window: max_actions,
        window_seconds: window_secs,
    };
    if update == TrustSettingsUpdate::default() {
        println!("{}", Theme::warning("Nothing to change"));
        return Ok(());
    }
    let trust = ctx
        .engine
        .update_trust_settings(ctx.household, &update)
        .await?;
    if ctx.format.is_json() {
        return print_json(&trust);
    }
    println!("{}", Theme::success("Trust settings updated"));
    Ok(())
}
