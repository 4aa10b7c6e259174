//! Config command handlers

use anyhow::{Context, Result};
use colored::Colorize;

use super::Config;
use crate::cli::{ConfigAction, ConfigArgs};

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => show_config(),
        ConfigAction::Init { force } => init_config(force),
        ConfigAction::Set { key, value } => set_config(&key, &value),
        ConfigAction::Get { key } => get_config(&key),
        ConfigAction::Path => show_path(),
        ConfigAction::Edit => edit_config(),
    }
}

fn show_config() -> Result<()> {
    let mut config = Config::load()?;
    config.api.deepl_api_key = config.api.deepl_api_key.map(|k| mask_key(&k));
    let content = toml::to_string_pretty(&config)?;

    println!("{}", "[Config]".green());
    println!("{}", content);

    Ok(())
}

fn init_config(force: bool) -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;

    if path.exists() && !force {
        println!(
            "{}",
            format!("Config file already exists: {}", path.display()).yellow()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let saved_path = Config::default().save()?;

    println!("{}", "[Config] Initialized".green());
    println!("  Created: {}", saved_path.display());

    Ok(())
}

/// Applies `key = value` to `config`.
pub fn set_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
    let parse_err = || format!("Invalid value for {}: {}", key, value);

    match parts.as_slice() {
        ["api", "provider"] => config.api.provider = value.to_string(),
        ["api", "deepl_api_key"] => config.api.deepl_api_key = optional(value),
        ["api", "timeout_secs"] => config.api.timeout_secs = value.parse().with_context(parse_err)?,
        ["translation", "source_language"] => config.translation.source_language = value.to_string(),
        ["translation", "default_language"] => config.translation.default_language = value.to_string(),
        ["translation", "batch_size"] => {
            config.translation.batch_size = value.parse().with_context(parse_err)?
        }
        ["translation", "concurrency"] => {
            config.translation.concurrency = value.parse().with_context(parse_err)?
        }
        ["translation", "max_retries"] => {
            config.translation.max_retries = value.parse().with_context(parse_err)?
        }
        ["translation", "retry_base_delay_ms"] => {
            config.translation.retry_base_delay_ms = value.parse().with_context(parse_err)?
        }
        ["translation", "max_length_ratio"] => {
            config.translation.max_length_ratio = value.parse().with_context(parse_err)?
        }
        ["translation", "length_slack"] => {
            config.translation.length_slack = value.parse().with_context(parse_err)?
        }
        ["translation", "use_cache"] => {
            config.translation.use_cache = value.parse().with_context(parse_err)?
        }
        ["translation", "skip_symbol_cells"] => {
            config.translation.skip_symbol_cells = value.parse().with_context(parse_err)?
        }
        ["glossary", "database"] => config.glossary.database = optional(value),
        ["glossary", "category"] => config.glossary.category = value.to_string(),
        ["glossary", "substring_match_languages"] => {
            config.glossary.substring_match_languages = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    Ok(())
}

/// Reads `key` from `config`; secrets are masked.
pub fn get_value(config: &Config, key: &str) -> Result<Option<String>> {
    let parts: Vec<&str> = key.split('.').collect();
    let t = &config.translation;

    let value = match parts.as_slice() {
        ["api", "provider"] => Some(config.api.provider.clone()),
        ["api", "deepl_api_key"] => config.api.deepl_api_key.as_deref().map(mask_key),
        ["api", "timeout_secs"] => Some(config.api.timeout_secs.to_string()),
        ["translation", "source_language"] => Some(t.source_language.clone()),
        ["translation", "default_language"] => Some(t.default_language.clone()),
        ["translation", "batch_size"] => Some(t.batch_size.to_string()),
        ["translation", "concurrency"] => Some(t.concurrency.to_string()),
        ["translation", "max_retries"] => Some(t.max_retries.to_string()),
        ["translation", "retry_base_delay_ms"] => Some(t.retry_base_delay_ms.to_string()),
        ["translation", "max_length_ratio"] => Some(t.max_length_ratio.to_string()),
        ["translation", "length_slack"] => Some(t.length_slack.to_string()),
        ["translation", "use_cache"] => Some(t.use_cache.to_string()),
        ["translation", "skip_symbol_cells"] => Some(t.skip_symbol_cells.to_string()),
        ["glossary", "database"] => config.glossary.database.clone(),
        ["glossary", "category"] => Some(config.glossary.category.clone()),
        ["glossary", "substring_match_languages"] => {
            Some(config.glossary.substring_match_languages.join(","))
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    };

    Ok(value)
}

fn set_config(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    set_value(&mut config, key, value)?;
    config.save()?;

    let shown = if key.ends_with("api_key") {
        mask_key(value)
    } else {
        value.to_string()
    };
    println!("{}", format!("[Config] Set {} = {}", key, shown).green());

    Ok(())
}

fn get_config(key: &str) -> Result<()> {
    let config = Config::load()?;

    match get_value(&config, key)? {
        Some(v) => println!("{} = {}", key, v),
        None => println!("{} = (not set)", key),
    }

    Ok(())
}

fn show_path() -> Result<()> {
    match Config::config_path() {
        Some(path) => {
            println!("{}", path.display());
            if path.exists() {
                println!("{}", "(exists)".green());
            } else {
                println!("{}", "(not created)".yellow());
            }
        }
        None => {
            println!("{}", "Could not determine config path".red());
        }
    }
    Ok(())
}

fn edit_config() -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;

    if !path.exists() {
        Config::default().save()?;
        println!("{}", "[Config] Created default config".green());
    }

    let editor = std::env::var("EDITOR")
        .or_else(|_| std::env::var("VISUAL"))
        .unwrap_or_else(|_| {
            if cfg!(windows) {
                "notepad".to_string()
            } else {
                "nano".to_string()
            }
        });

    println!("Opening config with: {}", editor);
    println!("Path: {}", path.display());

    std::process::Command::new(&editor)
        .arg(&path)
        .status()
        .context(format!("Failed to open editor: {}", editor))?;

    Ok(())
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
