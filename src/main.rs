mod client;
mod config;
mod data;
mod error;
mod execution;
mod monitoring;
mod wallet;

use anyhow::Result;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use client::ExchangeClient;
use config::{Config, EnvConfig};
use data::types::{Coin, Event, Order, OrderType, Outcome};
use error::ClientError;
use execution::types::TxResponse;
use execution::units::UDecimal;

#[derive(Parser, Debug)]
#[command(name = "binary-exchange-client")]
#[command(about = "Back/lay betting on binary events against the exchange contract")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the contract's on-chain configuration
    Config,
    /// Preview the funds an order needs without sending anything
    Quote {
        #[arg(long = "type")]
        order_type: OrderType,
        #[arg(long)]
        stake: String,
        #[arg(long)]
        odds: String,
    },
    /// List events
    Events {
        #[arg(long)]
        start_after: Option<u64>,
        #[arg(long)]
        limit: Option<u32>,
        /// Only show events still accepting orders
        #[arg(long)]
        open: bool,
    },
    /// Show one event
    Event { id: u64 },
    /// Show one order
    Order { id: u64 },
    /// List the orders of an event
    Orders {
        event_id: u64,
        #[arg(long)]
        start_after: Option<u64>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List the matched bets of an event
    Bets {
        event_id: u64,
        #[arg(long)]
        start_after: Option<u64>,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Propose a new binary event
    CreateEvent {
        #[arg(long)]
        description: String,
        #[arg(long)]
        oracle: Option<String>,
        /// RFC 3339, YYYY-MM-DD[THH:MM[:SS]] (UTC) or unix seconds
        #[arg(long)]
        deadline: Option<String>,
    },
    /// Place a back or lay order
    PlaceOrder {
        #[arg(long)]
        event: String,
        #[arg(long = "type")]
        order_type: OrderType,
        #[arg(long)]
        outcome: Outcome,
        #[arg(long)]
        stake: String,
        #[arg(long)]
        odds: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config)?;
    let env_config = EnvConfig::load()?;
    config.apply_env(&env_config);

    tracing::info!("Dry run mode: {}", config.system.dry_run);

    let default_limit = config.system.default_page_limit;
    let mut client = ExchangeClient::from_config(config, &env_config)?;
    let decimals = client.config().minor_unit_decimals().ok();

    match args.command {
        Command::Config => {
            let config = client.contract_config().await?;
            println!("admin:         {}", config.admin);
            println!("betting denom: {}", config.betting_denom);
            println!(
                "next ids:      event {} / order {} / bet {}",
                config.next_event_id, config.next_order_id, config.next_bet_id
            );
        }
        Command::Quote { order_type, stake, odds } => {
            let quote = client.quote(order_type, &stake, &odds)?;
            println!("{} {} @ {}", quote.order_type, quote.stake, quote.odds);
            println!("funds required: {}", quote.funds_required);
            println!("backer payout:  {}", quote.backer_payout);
            println!("backer profit:  {}", quote.backer_profit);
        }
        Command::Events { start_after, limit, open } => {
            let events: Vec<Event> = client
                .list_events(start_after, Some(limit.unwrap_or(default_limit)))
                .await?
                .into_iter()
                .filter(|e| !open || e.is_open())
                .collect();
            if events.is_empty() {
                println!("No events found");
            }
            for event in &events {
                print_event(event);
            }
        }
        Command::Event { id } => {
            print_event(&client.get_event(id).await?);
        }
        Command::Order { id } => {
            print_order(&client.get_order(id).await?, decimals);
        }
        Command::Orders { event_id, start_after, limit } => {
            let orders = client
                .list_orders(event_id, start_after, Some(limit.unwrap_or(default_limit)))
                .await?;
            for order in &orders {
                print_order(order, decimals);
            }
        }
        Command::Bets { event_id, start_after, limit } => {
            let bets = client
                .list_matched_bets(event_id, start_after, Some(limit.unwrap_or(default_limit)))
                .await?;
            for bet in &bets {
                println!(
                    "#{} {} @ {} backer {} ({}) layer {} ({})",
                    bet.id,
                    bet.outcome_backed,
                    bet.odds,
                    bet.backer_addr,
                    display_amount(&bet.backer_stake, decimals),
                    bet.lay_addr,
                    display_amount(&bet.layer_liability, decimals)
                );
            }
        }
        Command::CreateEvent { description, oracle, deadline } => {
            connect(&mut client).await?;
            let result = client
                .create_event(&description, oracle.as_deref(), deadline.as_deref())
                .await;
            report(result)?;
        }
        Command::PlaceOrder { event, order_type, outcome, stake, odds } => {
            connect(&mut client).await?;
            let result = client
                .place_order(&event, order_type, outcome, &stake, &odds)
                .await;
            report(result)?;
        }
    }

    client.disconnect();
    Ok(())
}

async fn connect(client: &mut ExchangeClient) -> Result<()> {
    client.connect().await?;
    let session = client.session();
    println!(
        "Connected as {} on {}",
        session.address.as_deref().unwrap_or("?"),
        session.chain_id
    );
    Ok(())
}

/// Major units when the minor-unit scale is configured, raw coins otherwise.
fn display_amount(coin: &Coin, decimals: Option<u32>) -> String {
    match decimals.map(|d| UDecimal::from_minor_units(coin.amount, d)) {
        Some(amount) => format!("{} {}", amount, coin.denom),
        None => coin.to_string(),
    }
}

fn print_order(order: &Order, decimals: Option<u32>) {
    println!(
        "#{}{} {} {} @ {} remaining {} of {} [{}] by {}",
        order.id,
        if order.is_matchable() { "*" } else { "" },
        order.order_type,
        order.outcome,
        order.odds,
        display_amount(&order.remaining_backer_stake, decimals),
        display_amount(&order.initial_backer_stake, decimals),
        order.status,
        order.owner
    );
}

/// RFC 3339, or "none" when absent or outside chrono's range.
fn format_deadline(secs: Option<u64>) -> String {
    secs.and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "none".to_string())
}

fn print_event(event: &Event) {
    let deadline = format_deadline(event.resolution_deadline);
    let winner = event
        .winning_outcome
        .map(|o| o.to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "#{} [{}] {} (winner: {}, deadline: {}, oracle: {})",
        event.id, event.status, event.description, winner, deadline, event.oracle
    );
}

fn report(result: Result<TxResponse, ClientError>) -> Result<()> {
    match result {
        Ok(tx) => {
            println!("✅ Submitted: {}", tx.tx_hash);
            Ok(())
        }
        Err(e) => {
            if e.may_have_submitted() {
                eprintln!("⚠️  The transaction may have reached the chain; check before retrying");
            } else {
                eprintln!("Nothing was submitted");
            }
            Err(e.into())
        }
    }
}
