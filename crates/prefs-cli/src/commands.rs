use anyhow::Context;
use colored::Colorize;
use prefs_core::{FieldPreference, PrefStore, PrefsConfig};
use serde_json::{Map, Value};
use tracing::debug;

use crate::cli::*;
use crate::path;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Keygen(args) => cmd_keygen(args),
        Command::Get(args) => cmd_get(&open_store(&cli).await?, args).await,
        Command::Set(args) => cmd_set(&open_store(&cli).await?, args).await,
        Command::Reset(args) => cmd_reset(&open_store(&cli).await?, args).await,
        Command::Export(args) => cmd_export(&open_store(&cli).await?, args).await,
        Command::Import(args) => cmd_import(&open_store(&cli).await?, args).await,
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<PrefsConfig> {
    let mut config = match &cli.config {
        Some(file) => PrefsConfig::load(file)
            .with_context(|| format!("loading configuration from {}", file.display()))?,
        None => PrefsConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.path = store.clone();
    }
    if let Some(key) = &cli.key {
        config.encryption.key = Some(key.clone());
    }
    Ok(config)
}

async fn open_store(cli: &Cli) -> anyhow::Result<PrefStore<Value>> {
    let config = resolve_config(cli)?;
    debug!(?config, "resolved configuration");
    config
        .open(Value::Object(Map::new()))
        .await
        .with_context(|| format!("opening store {}", config.path.display()))
}

/// The value at a dotted path as its own preference. `Null` means absent.
fn path_field(
    prefs: &PrefStore<Value>,
    dotted: &str,
) -> anyhow::Result<FieldPreference<Value, Value>> {
    let segments = path::parse(dotted)?;
    let read = segments.clone();
    Ok(prefs.field(
        dotted,
        Value::Null,
        move |doc: &Value| path::lookup(doc, &read),
        move |doc: Value, value: Value| path::assign(doc, &segments, value),
    ))
}

fn cmd_keygen(args: &KeygenArgs) -> anyhow::Result<()> {
    println!("{}", prefs_crypto::generate_key(args.algorithm.into()));
    Ok(())
}

async fn cmd_get(prefs: &PrefStore<Value>, args: &GetArgs) -> anyhow::Result<()> {
    let value = match &args.path {
        Some(dotted) => path_field(prefs, dotted)?.get().await?,
        None => prefs.data().get().await?,
    };
    if value.is_null() {
        if let Some(dotted) = &args.path {
            println!("{} = {}", dotted.bold(), "(not set)".dimmed());
            return Ok(());
        }
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn cmd_set(prefs: &PrefStore<Value>, args: &SetArgs) -> anyhow::Result<()> {
    let value: Value =
        serde_json::from_str(&args.value).unwrap_or_else(|_| Value::String(args.value.clone()));
    let field = path_field(prefs, &args.path)?;
    field.set(value.clone()).await?;
    println!("{} Set {} = {}", "✓".green().bold(), args.path.bold(), value.to_string().cyan());
    Ok(())
}

async fn cmd_reset(prefs: &PrefStore<Value>, args: &ResetArgs) -> anyhow::Result<()> {
    path_field(prefs, &args.path)?.reset_to_default().await?;
    println!("{} Reset {}", "✓".green().bold(), args.path.bold());
    Ok(())
}

async fn cmd_export(prefs: &PrefStore<Value>, args: &ExportArgs) -> anyhow::Result<()> {
    let text = prefs.export_json().await?;
    match &args.out {
        Some(file) => {
            std::fs::write(file, text).with_context(|| format!("writing {}", file.display()))?;
            println!("{} Exported to {}", "✓".green().bold(), file.display().to_string().bold());
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn cmd_import(prefs: &PrefStore<Value>, args: &ImportArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    prefs.import_json(&text).await?;
    println!("{} Imported {}", "✓".green().bold(), args.file.display().to_string().bold());
    Ok(())
}
