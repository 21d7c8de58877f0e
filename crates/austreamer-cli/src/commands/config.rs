//! Configuration blob commands.

#![allow(clippy::print_literal)] // Table headers use literal strings

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

use austreamer_config::{ConfigBlock, ConfigStore, ParamBlock, SubBlockRole};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print every record of a blob
    Dump {
        /// Blob file
        #[arg(value_name = "BLOB")]
        path: PathBuf,
    },

    /// Write the factory defaults to a blob
    Defaults {
        /// Blob file to create
        #[arg(value_name = "BLOB")]
        path: PathBuf,
    },
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Dump { path } => dump(&path),
        ConfigCommand::Defaults { path } => {
            let block = ConfigStore::defaults().to_block();
            block
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {} records to {}", block.records.len(), path.display());
            Ok(())
        }
    }
}

fn dump(path: &std::path::Path) -> anyhow::Result<()> {
    let block = ConfigBlock::load(path).with_context(|| format!("loading {}", path.display()))?;
    println!("{} (version {:#06x}, {} records)", path.display(), block.version, block.records.len());
    println!();
    println!("  {:6}  {:>3}  {:22}  {}", "Id", "Len", "Role", "Value");
    println!("  {:6}  {:>3}  {:22}  {}", "--", "---", "----", "-----");
    for record in &block.records {
        let role = SubBlockRole::of(record.id).map_or_else(|| "unknown".to_string(), describe);
        let value = match ParamBlock::decode(record.id, record.payload()) {
            Ok(param) => format!("{param:?}"),
            Err(err) => format!("<{err}>"),
        };
        println!("  {:#06x}  {:>3}  {:22}  {}", record.id, record.len, role, value);
    }
    Ok(())
}

fn describe(role: SubBlockRole) -> String {
    match role {
        SubBlockRole::Config(kind) => format!("{kind} config"),
        SubBlockRole::Sniffer(kind) => format!("{kind} sniffer"),
        SubBlockRole::Mcps(kind) => format!("{kind} mcps"),
        SubBlockRole::Bypass(kind) => format!("{kind} bypass"),
        SubBlockRole::SnifferActivate => "sniffer activate".to_string(),
        SubBlockRole::Prompt => "prompt".to_string(),
        SubBlockRole::AllConfig => "all config".to_string(),
        SubBlockRole::AllMcps => "mcps query".to_string(),
    }
}
