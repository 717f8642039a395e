//! `funnelbot config` subcommands.

use std::path::Path;

use anyhow::Result;
use console::style;

use funnelbot_infra::config::{CONFIG_FILE, load_funnel_config, render_funnel_config, write_default_config};

use super::ConfigAction;

pub async fn run(data_dir: &Path, action: ConfigAction, json: bool) -> Result<()> {
    match action {
        ConfigAction::Show => show(data_dir, json).await,
        ConfigAction::Init => init(data_dir, json).await,
        ConfigAction::Path => {
            let path = data_dir.join(CONFIG_FILE);
            if json {
                println!("{}", serde_json::json!({ "path": path.display().to_string() }));
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

async fn show(data_dir: &Path, json: bool) -> Result<()> {
    let config = load_funnel_config(data_dir).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", render_funnel_config(&config)?);
    }
    Ok(())
}

async fn init(data_dir: &Path, json: bool) -> Result<()> {
    let (path, written) = write_default_config(data_dir).await?;

    if json {
        let out = serde_json::json!({ "path": path.display().to_string(), "written": written });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if written {
        println!();
        println!("  {} Wrote {}", style("✓").green().bold(), style(path.display()).cyan());
        println!();
    } else {
        println!();
        println!(
            "  {} {} already exists, left untouched",
            style("•").dim(),
            style(path.display()).cyan()
        );
        println!();
    }
    Ok(())
}
