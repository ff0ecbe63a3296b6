//! # Valorant Live Data Test
//!
//! Fetches agents and buddies from valorant-api.com through lib_valorant and
//! prints what came back, along with every request attempt the dispatcher
//! made. Looks up a Riot account as well when `RIOT_API_KEY` and a Riot ID
//! are given.
//!
//! Usage: `test_valorant_live [--riot-region euw1] [gameName#tagLine]`

use std::sync::Arc;

use anyhow::Context;
use lib_valorant::configs::ClientConfig;
use lib_valorant::loggers::setup_logging;
use lib_valorant::Language;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // // Statement: Pick up VALORANT_TOKEN / RIOT_API_KEY from a local .env, if any
    dotenvy::dotenv().ok();

    // // Statement: A trailing `name#tag` is not a flag; split it off before clap sees the args
    let mut args: Vec<String> = std::env::args().collect();
    let riot_id = if args.len() > 1 && args.last().is_some_and(|a| a.contains('#')) {
        args.pop()
    } else {
        None
    };

    let config = ClientConfig::load_from(args).context("loading configuration")?;
    let _guard = setup_logging(
        config.log_level.as_deref().unwrap_or("info"),
        config.log_dir.as_deref(),
    )?;
    let client = config.build_client()?;

    // // Statement: Echo every attempt so retries are visible
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("[~] attempt {} {} {}", event.attempt, event.method, event.url);
        }
    });

    println!("[*] Requesting playable agents from valorant-api.com...");
    let agents = client.fetch_agents(Some(Language::EnglishUs), Some(true)).await?;
    println!("\n[SUCCESS] {} agents received:", agents.len());
    println!("-----------------------------------------------");
    for agent in &agents {
        let role = agent.role.as_ref().map(|r| r.display_name.as_str()).unwrap_or("-");
        println!("{:<12} {:<12} {}", agent.display_name, role, agent.uuid);
    }
    println!("-----------------------------------------------");

    // // Statement: A second fetch must hand back the cached instance
    if let Some(first) = agents.first() {
        let again = client.fetch_agent(&first.uuid, None).await?;
        println!("[INFO] Refetched {} shares the cached instance: {}", again.display_name, Arc::ptr_eq(first, &again));
    }

    let buddies = client.fetch_buddies(None).await?;
    println!(
        "[INFO] {} buddies, {} buddy levels cached",
        buddies.len(),
        client.state().buddy_levels().len()
    );

    if let Some(riot_id) = riot_id {
        let (name, tag) = riot_id.split_once('#').context("Riot ID must look like name#tag")?;
        match client.fetch_account_by_riot_id(name, tag).await {
            Ok(account) => println!("\n[SUCCESS] Account:\n{}", serde_json::to_string_pretty(&*account)?),
            Err(e) => {
                eprintln!("\n[ERROR] Account lookup failed:");
                eprintln!(">>> {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
