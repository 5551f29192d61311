//! `seamless authenticate`: run the authentication chain and greet the user.

use miette::Result;
use owo_colors::OwoColorize;
use seamless_auth::{Profile, Tier};
use seamless_core::config::SeamlessConfig;
use seamless_core::{AuthOutcome, Orchestrator};

use crate::output::{Output, format_relative_time};

pub async fn run(config: &SeamlessConfig) -> Result<()> {
    let output = Output::new();
    output.status("Starting seamless authentication...");

    let orchestrator = Orchestrator::from_config(config)?;
    let outcome = match orchestrator.authenticate().await {
        Ok(outcome) => outcome,
        Err(e) => {
            output.error(&format!("Seamless authentication failed: {}", e));
            return Err(e.into());
        }
    };

    if outcome.reused {
        output.success("Already authenticated");
        show_summary(&output, &outcome);
    } else {
        output.success(&format!(
            "Authenticated via {}",
            outcome.path.as_str().bright_cyan()
        ));
        show_welcome(&output, &outcome.profile, &config.platform.upgrade_url);
    }

    if let Some(err) = &outcome.persistence_error {
        output.warning(&format!(
            "{}; you will be asked to authenticate again next time",
            err
        ));
    }

    Ok(())
}

fn show_summary(output: &Output, outcome: &AuthOutcome) {
    let profile = &outcome.profile;
    output.info("Authenticated as:", profile.display_label());
    output.info("Subscription tier:", profile.tier.as_str());
    output.info(
        "Available features:",
        &format!("{} features", profile.features.len()),
    );
    output.info(
        "Session expires:",
        &format_relative_time(outcome.session.expires_at()),
    );
}

fn show_welcome(output: &Output, profile: &Profile, upgrade_url: &str) {
    output.section("Welcome!");
    output.kv("Account", &profile.handle);
    output.kv("Email", profile.email.as_deref().unwrap_or("Not provided"));
    output.kv("Tier", &profile.tier.as_str().to_uppercase().bold().to_string());
    output.kv("Features", &format!("{} available", profile.features.len()));

    if profile.is_new {
        output.print("");
        output.status("Your account was created automatically from your GitHub identity.");
    }
    if let Some(hint) = upgrade_hint(profile) {
        output.print("");
        output.warning(hint);
        output.info("Visit:", upgrade_url);
    }

    output.print("");
    output.status("Available commands:");
    output.list_item("Check status: seamless status");
    output.list_item("Configure editor chat models: seamless editor");
    output.list_item("Get help: seamless help");
}

/// Upgrade nudge for local accounts and new free accounts.
pub(crate) fn upgrade_hint(profile: &Profile) -> Option<&'static str> {
    if !profile.is_new {
        return None;
    }
    if profile.is_local() {
        Some("Local account created - upgrade to a full platform account for cloud sync")
    } else if profile.tier == Tier::Free {
        Some("Upgrade your subscription to unlock more features")
    } else {
        None
    }
}
