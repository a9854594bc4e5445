use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use pushpull::{
    config::{Config, KNOWN_KEYS},
    types::{OutputFmt, emit},
};

use crate::cli::ConfigCmd;

pub fn handle(cmd: ConfigCmd, config_path: &Path, fmt: OutputFmt) -> Result<()> {
    let mut cfg = Config::load(config_path)?;

    match cmd {
        ConfigCmd::List => emit(fmt, &cfg, || {
            if cfg.map.is_empty() {
                println!("{}", "(no config set)".dimmed());
            } else {
                println!("{}", "Config:".cyan().bold());
                for (k, v) in &cfg.map {
                    println!("  {} = {}", k.green(), v);
                }
            }
        }),

        ConfigCmd::Get { key } => match cfg.get(&key) {
            Some(val) => println!("{val}"),
            None => println!("{} key `{}` not found", "warning:".yellow().bold(), key),
        },

        ConfigCmd::Set { key, val } => {
            cfg.set(&key, &val)?;
            cfg.save(config_path)?;
            println!("{} set `{}` = `{}`", "info:".blue().bold(), key.green(), val);
            if !KNOWN_KEYS.contains(&key.as_str()) {
                println!(
                    "{} `{}` is not used by pushpull (known keys: {})",
                    "warning:".yellow().bold(),
                    key,
                    KNOWN_KEYS.join(", ")
                );
            }
        }

        ConfigCmd::Unset { key } => {
            if cfg.unset(&key).is_some() {
                cfg.save(config_path)?;
                println!("{} removed `{}`", "info:".blue().bold(), key.green());
            } else {
                println!("{} key `{}` not found", "warning:".yellow().bold(), key);
            }
        }
    }

    Ok(())
}
