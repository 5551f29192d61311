//! `seamless editor`: point the editor's chat at GitHub Models.
//!
//! Patches the user `settings.json` of the first editor install that can be
//! prepared, using the same GitHub credential the authentication chain uses.

use std::io;
use std::path::{Path, PathBuf};

use miette::Result;
use serde_json::{Map, Value, json};
use seamless_core::config::SeamlessConfig;
use tracing::{debug, warn};

use crate::helpers::discover_credential;
use crate::output::Output;

pub const MODELS_BASE_URL: &str = "https://models.github.ai/inference";
pub const DEFAULT_MODEL_ID: &str = "openai/gpt-4.1";
const DEFAULT_MODEL_NAME: &str = "GPT-4.1 (GitHub Models)";

const CUSTOM_MODELS_KEY: &str = "github.copilot.chat.customOAIModels";
const INLINE_MODEL_KEY: &str = "inlineChat.defaultModel";

/// Credentials shorter than this are treated as absent.
const MIN_CREDENTIAL_LEN: usize = 10;

/// What happened to the editor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorOutcome {
    Updated(PathBuf),
    Unchanged(PathBuf),
    NoPathReady,
}

/// User settings locations, remote server installs first.
pub fn candidate_paths(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join(".vscode-server/data/User/settings.json"),
        home.join(".vscode-server-data/data/User/settings.json"),
        home.join(".config/Code/User/settings.json"),
    ]
}

fn desired_settings(api_key: &str) -> [(&'static str, Value); 2] {
    [
        (
            CUSTOM_MODELS_KEY,
            json!([{
                "baseUrl": MODELS_BASE_URL,
                "apiKey": api_key,
                "models": [{ "id": DEFAULT_MODEL_ID, "name": DEFAULT_MODEL_NAME }]
            }]),
        ),
        (INLINE_MODEL_KEY, json!(DEFAULT_MODEL_ID)),
    ]
}

/// Set the model keys. Returns whether anything changed.
pub fn apply_model_settings(settings: &mut Map<String, Value>, api_key: &str) -> bool {
    let mut changed = false;
    for (key, value) in desired_settings(api_key) {
        if settings.get(key) != Some(&value) {
            settings.insert(key.to_string(), value);
            changed = true;
        }
    }
    changed
}

async fn load_settings(path: &Path) -> io::Result<Map<String, Value>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(e),
    };
    match serde_json::from_str(&raw) {
        Ok(Value::Object(settings)) => Ok(settings),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "settings root is not an object",
        )),
        Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

/// Patch one settings file. `Ok(true)` when it was rewritten.
async fn configure_path(path: &Path, api_key: &str) -> io::Result<bool> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut settings = load_settings(path).await?;
    if !apply_model_settings(&mut settings, api_key) {
        return Ok(false);
    }
    let content = serde_json::to_string_pretty(&Value::Object(settings))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    tokio::fs::write(path, content).await?;
    Ok(true)
}

/// Try each path in order; the first one that works wins.
pub async fn configure(paths: &[PathBuf], api_key: &str) -> EditorOutcome {
    for path in paths {
        match configure_path(path, api_key).await {
            Ok(true) => return EditorOutcome::Updated(path.clone()),
            Ok(false) => return EditorOutcome::Unchanged(path.clone()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Skipping {}: {}", path.display(), e);
            }
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    EditorOutcome::NoPathReady
}

pub async fn run(config: &SeamlessConfig) -> Result<()> {
    let output = Output::new();

    let Some(credential) = discover_credential(config)
        .filter(|c| c.expose().len() >= MIN_CREDENTIAL_LEN)
    else {
        output.status("GitHub credential not set; skipping editor model configuration.");
        return Ok(());
    };
    let Some(home) = dirs::home_dir() else {
        output.warning("Could not determine the home directory; skipping editor model configuration.");
        return Ok(());
    };

    match configure(&candidate_paths(&home), credential.expose()).await {
        EditorOutcome::Updated(path) => {
            output.success(&format!("Updated: {}", path.display()));
        }
        EditorOutcome::Unchanged(path) => {
            output.status(&format!("Already configured: {}", path.display()));
        }
        EditorOutcome::NoPathReady => {
            output.warning(
                "No settings file written (paths not ready). Run again after opening the Chat view once.",
            );
        }
    }
    Ok(())
}
