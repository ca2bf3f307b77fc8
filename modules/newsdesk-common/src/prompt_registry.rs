use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

use crate::error::NewsdeskError;
use crate::file_config::FileConfig;
use crate::template::{render_template, validate_template};

/// Runtime variables the dedup user prompt may reference.
pub const DEDUP_USER_VARS: &[&str] = &[
    "title_a", "source_a", "date_a", "title_b", "source_b", "date_b",
];

const BUILTIN_DEDUP_SYSTEM: &str = r#"You are a news deduplication assistant. Decide whether two articles from different outlets report the SAME SPECIFIC EVENT.

Same event means the same underlying occurrence: the same earnings release, the same announcement, the same incident, the same ruling. Different angles, headlines, wording, or outlets do not make them different stories.

NOT the same event:
- Two stories about the same company or topic that describe different occurrences
- A follow-up or analysis piece versus the original breaking report of a different development
- Recurring events in different periods (Q3 results vs Q4 results)

Respond with:
- is_duplicate: true only if both articles cover the same specific event
- confidence: 0.0 to 1.0, how certain you are of your answer
- reason: one short sentence (under 200 characters)"#;

const BUILTIN_DEDUP_USER: &str = r#"Are these two articles about the same specific event?

Article A
Title: {{title_a}}
Source: {{source_a}}
Date: {{date_a}}

Article B
Title: {{title_b}}
Source: {{source_b}}
Date: {{date_b}}"#;

/// The two fields of an article that a comparison prompt shows, plus its date.
#[derive(Debug, Clone, Copy)]
pub struct PromptArticle<'a> {
    pub title: &'a str,
    pub source: &'a str,
    pub date: &'a str,
}

/// Holds validated prompt templates for the dedup oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRegistry {
    dedup_system: String,
    dedup_user: String,
}

impl PromptRegistry {
    /// Prompts compiled into the binary.
    pub fn builtin() -> Self {
        Self {
            dedup_system: BUILTIN_DEDUP_SYSTEM.to_string(),
            dedup_user: BUILTIN_DEDUP_USER.to_string(),
        }
    }

    /// Load both prompt files named in the config.
    pub fn load(config: &FileConfig, config_dir: &Path) -> Result<Self> {
        let dedup_system = load_prompt(&config.prompts.dedup_system, config_dir, &[], "dedup_system")?;
        let dedup_user = load_prompt(
            &config.prompts.dedup_user,
            config_dir,
            DEDUP_USER_VARS,
            "dedup_user",
        )?;

        Ok(Self {
            dedup_system,
            dedup_user,
        })
    }

    /// Like [`load`](Self::load), but a missing or invalid prompt file falls
    /// back to the built-in text instead of failing.
    pub fn load_or_default(config: &FileConfig, config_dir: &Path) -> Self {
        match Self::load(config, config_dir) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Prompt config unavailable, using built-in dedup prompts");
                Self::builtin()
            }
        }
    }

    pub fn dedup_system_prompt(&self) -> &str {
        &self.dedup_system
    }

    pub fn dedup_user_prompt(&self, a: PromptArticle<'_>, b: PromptArticle<'_>) -> String {
        render_template(
            &self.dedup_user,
            &HashMap::from([
                ("title_a", a.title),
                ("source_a", a.source),
                ("date_a", a.date),
                ("title_b", b.title),
                ("source_b", b.source),
                ("date_b", b.date),
            ]),
        )
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn load_prompt(
    relative_path: &Path,
    config_dir: &Path,
    allowed_vars: &[&str],
    prompt_name: &str,
) -> Result<String> {
    let full_path = config_dir.join(relative_path);
    let content = std::fs::read_to_string(&full_path).with_context(|| {
        format!(
            "Failed to read {} prompt file: {}",
            prompt_name,
            full_path.display()
        )
    })?;

    if content.trim().is_empty() {
        return Err(NewsdeskError::Prompt(format!(
            "{} prompt file is empty: {}",
            prompt_name,
            full_path.display()
        ))
        .into());
    }

    validate_template(&content, allowed_vars).with_context(|| {
        format!(
            "Template validation failed for {} prompt: {}",
            prompt_name,
            full_path.display()
        )
    })?;

    Ok(content.trim().to_string())
}
