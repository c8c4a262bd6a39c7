#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input};
use std::time::Duration;

use super::{Config, ProviderConfig, RetrievalConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Report Search Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Embedding Provider").bold().yellow());
    eprintln!("Must be the same model that embedded the report pages.");
    eprintln!();
    configure_provider(&mut config.embedding, "Embedding")?;

    eprintln!();
    eprintln!("{}", style("Completion Provider").bold().yellow());
    eprintln!("Used to stream answers from the retrieved pages.");
    eprintln!();
    configure_provider(&mut config.completion, "Completion")?;

    eprintln!();
    eprintln!("{}", style("Retrieval").bold().yellow());
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    for (label, provider) in [
        ("Embedding", &config.embedding),
        ("Completion", &config.completion),
    ] {
        if test_provider_connection(provider) {
            eprintln!("{}", style(format!("✓ {label} provider reachable")).green());
        } else {
            eprintln!(
                "{}",
                style(format!("⚠ Warning: could not reach {label} provider")).yellow()
            );
        }
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    for (label, provider) in [
        ("Embedding", &config.embedding),
        ("Completion", &config.completion),
    ] {
        eprintln!("{}", style(format!("{label} Settings:")).bold().yellow());
        eprintln!("  URL: {}", style(&provider.base_url).cyan());
        eprintln!("  Model: {}", style(&provider.model).cyan());
        eprintln!("  Timeout: {}s", style(provider.timeout_seconds).cyan());
        match provider.api_key() {
            Ok(Some(_)) => eprintln!(
                "  API key: {} ({})",
                style("set").green(),
                provider.api_key_env
            ),
            Ok(None) => eprintln!("  API key: {}", style("not required").dim()),
            Err(e) => eprintln!("  API key: {} ({})", style("missing").red(), e),
        }
        eprintln!();
    }

    let retrieval = &config.retrieval;
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!(
        "  Minimum page length: {} chars",
        style(retrieval.min_content_chars).cyan()
    );
    eprintln!("  Pages per answer: {}", style(retrieval.top_k).cyan());
    eprintln!(
        "  Max documents per question: {}",
        style(retrieval.max_documents).cyan()
    );
    match retrieval.embedding_dimension {
        Some(dim) => eprintln!("  Embedding dimension: {}", style(dim).cyan()),
        None => eprintln!("  Embedding dimension: {}", style("unchecked").dim()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_provider(provider: &mut ProviderConfig, label: &str) -> Result<()> {
    let base_url: String = Input::new()
        .with_prompt(format!("{label} API base URL"))
        .default(provider.base_url.to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            let mut candidate = provider.clone();
            candidate.set_base_url(input).map_err(|e| e.to_string())
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt(format!("{label} model"))
        .default(provider.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let api_key_env: String = Input::new()
        .with_prompt(format!(
            "Environment variable holding the {label} API key (blank for none)"
        ))
        .default(provider.api_key_env.clone())
        .allow_empty(true)
        .interact_text()?;

    let timeout_seconds: u64 = Input::new()
        .with_prompt(format!("{label} request timeout (seconds)"))
        .default(provider.timeout_seconds)
        .validate_with(|input: &u64| -> Result<(), &str> {
            if (1..=600).contains(input) {
                Ok(())
            } else {
                Err("Timeout must be between 1 and 600 seconds")
            }
        })
        .interact_text()?;

    provider.set_base_url(&base_url)?;
    provider.set_model(model)?;
    provider.set_timeout_seconds(timeout_seconds)?;
    provider.api_key_env = api_key_env.trim().to_string();

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let min_content_chars: usize = Input::new()
        .with_prompt("Minimum page length in characters (shorter pages are ignored)")
        .default(retrieval.min_content_chars)
        .interact_text()?;

    let top_k: usize = Input::new()
        .with_prompt("Pages used per answer")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 50")
            }
        })
        .interact_text()?;

    let max_documents: usize = Input::new()
        .with_prompt("Maximum documents per question")
        .default(retrieval.max_documents)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=20).contains(input) {
                Ok(())
            } else {
                Err("Must be between 1 and 20")
            }
        })
        .interact_text()?;

    retrieval.min_content_chars = min_content_chars;
    retrieval.set_top_k(top_k)?;
    retrieval.set_max_documents(max_documents)?;

    Ok(())
}

fn test_provider_connection(provider: &ProviderConfig) -> bool {
    let Ok(url) = provider.base_url.join("models") else {
        return false;
    };

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(url.as_str()).call() {
        Ok(_) => true,
        // Reachable, just unauthenticated or without a models listing
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
