//! `seamless status`: show the stored session and whether it is still accepted.

use std::sync::Arc;

use miette::Result;
use owo_colors::OwoColorize;
use seamless_auth::AccountOrigin;
use seamless_core::config::SeamlessConfig;
use seamless_core::{HttpPlatformClient, SessionValidator, Validation};

use crate::output::{Output, format_relative_time};

pub async fn run(config: &SeamlessConfig) -> Result<()> {
    let output = Output::new();
    let store = config.storage.session_store();

    let session = match store.load().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            output.error("Not authenticated. Run: seamless authenticate");
            return Ok(());
        }
        Err(e) => {
            output.error(&format!("Could not read stored session: {}", e));
            output.status("Run: seamless authenticate");
            return Ok(());
        }
    };

    let platform = HttpPlatformClient::new(&config.platform, &config.timeouts)?;
    let validation = SessionValidator::new(Arc::new(platform))
        .check(&session)
        .await;

    output.section("Authentication Status");
    output.kv("Session", &validation_label(validation));
    output.kv("Issued via", session.issuing_path().as_str());
    let expiry = format_relative_time(session.expires_at());
    if session.is_expired() {
        output.kv("Expired", &expiry);
    } else {
        output.kv("Expires", &expiry);
    }

    match store.load_profile().await {
        Ok(Some(profile)) => {
            output.kv("Account", profile.display_label());
            output.kv("Tier", profile.tier.as_str());
            output.kv("Features", &format!("{} features", profile.features.len()));
            let origin = match profile.origin {
                AccountOrigin::Remote => "platform account",
                AccountOrigin::Local => "local account",
            };
            output.kv("Origin", origin);
        }
        Ok(None) => output.warning("No stored profile"),
        Err(e) => output.warning(&format!("Could not read stored profile: {}", e)),
    }

    if !validation.is_accepted() {
        output.print("");
        output.status("Run `seamless authenticate` to refresh the session.");
    }

    Ok(())
}

fn validation_label(validation: Validation) -> String {
    match validation {
        Validation::Accepted => "VALID".bright_green().to_string(),
        Validation::Rejected(reason) => format!("{} ({})", "REJECTED".bright_red().bold(), reason),
    }
}
