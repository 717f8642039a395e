//! Interactive funnel simulator.
//!
//! Reads lines from stdin as messages from one user and prints the bot's
//! replies. Uses the configured funnel and a local credential issuer, and
//! keeps its contacts under `{data_dir}/simulate/` so the real CRM is never
//! touched.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use console::style;
use tokio::io::{AsyncBufReadExt, BufReader};

use funnelbot_core::port::ChatTransport;
use funnelbot_infra::config::load_funnel_config;
use funnelbot_infra::contact::JsonContactStore;
use funnelbot_infra::issuer::LocalIssuer;
use funnelbot_types::error::TransportError;
use funnelbot_types::message::InboundMessage;

use crate::state::{build_dispatcher, build_service};

/// Prints outbound messages instead of sending them.
pub struct ConsoleTransport {
    user_id: String,
    json: bool,
}

impl ConsoleTransport {
    pub fn new(user_id: impl Into<String>, json: bool) -> Self {
        Self {
            user_id: user_id.into(),
            json,
        }
    }

    fn format(&self, to: &str, text: &str) -> String {
        if self.json {
            return serde_json::json!({ "to": to, "text": text }).to_string();
        }
        if to == self.user_id {
            format!("\n{} {}\n", style("bot ›").green().bold(), text)
        } else {
            format!("\n{} {}\n", style(format!("para {to} ›")).yellow().bold(), style(text).dim())
        }
    }
}

impl ChatTransport for ConsoleTransport {
    async fn send(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        println!("{}", self.format(user_id, text));
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SimCommand {
    Say(String),
    Media(String),
    State,
    Release,
    Metrics,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Option<SimCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Some(SimCommand::Say(line.to_string()));
    };
    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    Some(match name {
        "media" => SimCommand::Media(rest.trim().to_string()),
        "state" => SimCommand::State,
        "release" => SimCommand::Release,
        "metrics" => SimCommand::Metrics,
        "quit" | "exit" => SimCommand::Quit,
        "help" => SimCommand::Help,
        _ => SimCommand::Say(line.to_string()),
    })
}

fn print_help() {
    println!("  {}", style("/media [legenda]  envia uma imagem (comprovante)").dim());
    println!("  {}", style("/state            mostra o estado da conversa").dim());
    println!("  {}", style("/release          devolve a conversa ao bot").dim());
    println!("  {}", style("/metrics          mostra os contadores").dim());
    println!("  {}", style("/quit             sai").dim());
}

pub async fn run(data_dir: &Path, user: String, seed: Option<u64>, no_delay: bool, json: bool) -> Result<()> {
    let mut config = load_funnel_config(data_dir).await;
    if no_delay {
        config.timing.follow_up_delay_ms = 0;
    }
    let config = Arc::new(config);

    let sim_dir = data_dir.join("simulate");
    tokio::fs::create_dir_all(&sim_dir).await?;
    let contacts = Arc::new(JsonContactStore::open_in(&sim_dir).await?);
    let issuer = Arc::new(match seed {
        Some(seed) => LocalIssuer::seeded(config.issuer.clone(), seed),
        None => LocalIssuer::new(config.issuer.clone()),
    });

    let brand = config.brand.name.clone();
    let dispatcher = build_dispatcher(config, contacts, issuer)?;
    let service = build_service(dispatcher, Arc::new(ConsoleTransport::new(&user, json)));

    if !json {
        println!();
        println!(
            "  {} {} simulator, talking as {}",
            style("⚡").bold(),
            style(&brand).cyan().bold(),
            style(&user).cyan()
        );
        println!("  {}", style("Type /help for commands, /quit to exit").dim());
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = parse_line(&line) else {
            continue;
        };
        match command {
            SimCommand::Say(text) => service.handle_message(InboundMessage::text(&user, text)).await,
            SimCommand::Media(caption) => service.handle_message(InboundMessage::media(&user, caption)).await,
            SimCommand::State => match service.snapshot(&user).await {
                Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
                None => println!("  {}", style("no conversation yet").dim()),
            },
            SimCommand::Release => match service.release(&user).await {
                Some(stage) => println!("  {} resumed in {stage}", style("✓").green()),
                None => println!("  {}", style("conversation is not under human takeover").dim()),
            },
            SimCommand::Metrics => println!("{}", serde_json::to_string_pretty(&service.metrics().snapshot())?),
            SimCommand::Help => print_help(),
            SimCommand::Quit => break,
        }
    }

    Ok(())
}
