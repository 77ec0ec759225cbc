use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Password, Select};

use super::{Config, StorageMode};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    println!("{}", style("🔧 Docchat Configuration Setup").bold().cyan());
    println!();

    let mut config = load_existing_config()?;

    println!("{}", style("Provider credentials").bold().yellow());
    println!("Keys may be left blank here and supplied via OPENAI_API_KEY / GEMINI_API_KEY.");
    println!();

    configure_keys(&mut config)?;
    configure_chunking(&mut config)?;
    configure_storage(&mut config)?;

    println!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        println!("{}", style("✓ Configuration saved successfully!").green());

        let config_path = Config::config_file_path().context("Failed to get config file path")?;
        println!(
            "Configuration saved to: {}",
            style(config_path.display()).cyan()
        );
    } else {
        println!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    println!("{}", style("📋 Current Configuration").bold().cyan());
    println!();

    println!("{}", style("Providers:").bold().yellow());
    println!("  OpenAI key: {}", style(mask_key(&config.openai.api_key)).cyan());
    println!("  Gemini key: {}", style(mask_key(&config.gemini.api_key)).cyan());
    println!(
        "  Embedding model: {} ({} dims)",
        style(&config.embedding.model).cyan(),
        config.embedding.dimension
    );

    println!();
    println!("{}", style("Chunking:").bold().yellow());
    println!("  Chunk size: {}", style(config.chunking.chunk_size).cyan());
    println!(
        "  Chunk overlap: {}",
        style(config.chunking.chunk_overlap).cyan()
    );

    println!();
    println!("{}", style("Storage:").bold().yellow());
    match config.storage.mode {
        StorageMode::Embedded => {
            println!("  Mode: {}", style("embedded").cyan());
            match config.vector_db_uri() {
                Ok(uri) => println!("  Vector index: {}", style(uri).cyan()),
                Err(e) => println!("  Vector index: {} ({})", style("invalid").red(), e),
            }
        }
        StorageMode::Remote => {
            println!("  Mode: {}", style("remote").cyan());
            println!(
                "  Remote URI: {}",
                style(config.storage.remote_uri.as_deref().unwrap_or("unset")).cyan()
            );
        }
    }

    let config_path = Config::config_file_path().context("Failed to get config file path")?;
    println!();
    println!("Config file: {}", style(config_path.display()).dim());

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            println!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            println!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_keys(config: &mut Config) -> Result<()> {
    let openai_key: String = Password::new()
        .with_prompt("OpenAI API key (empty to keep current)")
        .allow_empty_password(true)
        .interact()?;
    if !openai_key.trim().is_empty() {
        config.openai.api_key = openai_key.trim().to_string();
    }

    let gemini_key: String = Password::new()
        .with_prompt("Gemini API key (empty to keep current)")
        .allow_empty_password(true)
        .interact()?;
    if !gemini_key.trim().is_empty() {
        config.gemini.api_key = gemini_key.trim().to_string();
    }

    Ok(())
}

fn configure_chunking(config: &mut Config) -> Result<()> {
    println!();
    println!("{}", style("Chunking").bold().yellow());

    let chunk_size: usize = Input::new()
        .with_prompt("Chunk size (characters)")
        .default(config.chunking.chunk_size)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let chunk_overlap: usize = Input::new()
        .with_prompt("Chunk overlap (characters)")
        .default(config.chunking.chunk_overlap)
        .validate_with(|input: &usize| -> Result<(), String> {
            if *input >= chunk_size {
                Err(format!("Overlap must be smaller than chunk size ({chunk_size})"))
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    config.chunking.chunk_size = chunk_size;
    config.chunking.chunk_overlap = chunk_overlap;

    Ok(())
}

fn configure_storage(config: &mut Config) -> Result<()> {
    println!();
    println!("{}", style("Vector index storage").bold().yellow());

    let modes = ["embedded (on-disk)", "remote (LanceDB URI)"];
    let default_index = match config.storage.mode {
        StorageMode::Embedded => 0,
        StorageMode::Remote => 1,
    };
    let selected = Select::new()
        .with_prompt("Storage mode")
        .items(&modes)
        .default(default_index)
        .interact()?;

    if selected == 1 {
        let uri: String = Input::new()
            .with_prompt("Remote LanceDB URI")
            .default(config.storage.remote_uri.clone().unwrap_or_default())
            .validate_with(|input: &String| -> Result<(), &str> {
                if input.trim().is_empty() {
                    Err("Remote URI cannot be empty")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;
        config.storage.mode = StorageMode::Remote;
        config.storage.remote_uri = Some(uri.trim().to_string());
    } else {
        config.storage.mode = StorageMode::Embedded;
    }

    Ok(())
}

fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "unset".to_string()
    } else {
        let visible: String = key.chars().take(6).collect();
        format!("{visible}…")
    }
}
