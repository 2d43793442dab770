//! pgnode CLI - レジストリの確認用コマンド
//!
//! タグ定義ソースの取り込み結果や、設定ファイルの検証結果を表示する。

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pgnode_registry::{load_registries, JsonConfig, SpecialMemberRegistry, TypeRegistry};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// pgnode - PostgreSQL node inspector tools
#[derive(Parser)]
#[command(name = "pgnode")]
#[command(version = "0.1.0")]
#[command(about = "Inspect the registries used to expand PostgreSQL nodes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a tag definition source (nodetags.h) and report new node tags
    ScanTags {
        /// Path to the tag definition source
        source: PathBuf,
    },

    /// Validate a configuration file and report what would be loaded
    CheckConfig {
        /// Path to the JSON configuration file
        config: PathBuf,

        /// Tag definition source to scan before applying the configuration
        #[arg(short, long)]
        tags: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::ScanTags { source } => scan_tags(&source),
        Command::CheckConfig { config, tags } => check_config(&config, tags.as_deref()),
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// タグ定義ソースを既定のレジストリに取り込む
fn scan_tags(source: &Path) -> Result<()> {
    let text = read(source)?;
    let mut types = TypeRegistry::new();
    let before = types.tag_count();
    let added = types.update_from_source(text.lines());
    debug!("scanned {}", source.display());

    println!("{} new node tags ({} built in, {} total)", added, before, types.tag_count());
    Ok(())
}

/// 設定ファイルを検証し、読み込まれるルールの数を表示する
fn check_config(config: &Path, tags: Option<&Path>) -> Result<()> {
    let provider = JsonConfig::new(read(config)?);
    let (mut types, special, errors) = load_registries(&provider)?;

    if let Some(tags) = tags {
        let added = types.update_from_source(read(tags)?.lines());
        println!("{} new node tags from {}", added, tags.display());
    }

    print_summary(&types, &special);

    if !errors.is_empty() {
        for error in &errors {
            warn!("{}", error);
            println!("rejected: {}", error);
        }
        bail!("{} rule(s) rejected in {}", errors.len(), config.display());
    }
    println!("{}: ok", config.display());
    Ok(())
}

fn print_summary(types: &TypeRegistry, special: &SpecialMemberRegistry) {
    println!("node tags:             {}", types.tag_count());
    println!("type aliases:          {}", types.alias_count());
    println!("array members:         {}", special.array_rule_count());
    println!("list element types:    {}", special.list_rule_count());
    println!("bitmapset references:  {}", special.bitmapset_reference_count());
    println!("bitmask members:       {}", special.bitmask_rule_count());
}
