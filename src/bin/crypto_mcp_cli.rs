//! crypto-mcp: 工具桥命令行：列出工具、调用工具、查询与清理调用历史
//!
//! Usage:
//!   crypto-mcp list                                  List registered tools
//!   crypto-mcp call <tool> [json-args] [--user U]    Call a tool
//!   crypto-mcp history <user> [--limit N] [--skip N] Show durable call history
//!   crypto-mcp clear-history <user>                  Delete durable call history

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use crypto_mcp_bridge::types::JsonObject;
use crypto_mcp_bridge::{
    BinanceExchange, BridgeConfig, ExchangeClient, McpBridge, MemoryLedger, StaticExchange,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_USER: &str = "default_user";

fn print_usage() {
    println!(
        r#"crypto-mcp: 加密货币工具桥命令行

USAGE:
    crypto-mcp [--live] [--config <file>] <COMMAND> [OPTIONS]

COMMANDS:
    list                                 List registered tools with their input schemas
    call <tool> [json-args] [--user U]   Call a tool, e.g. call get_crypto_price '{{"symbol":"btc"}}'
    history <user> [--limit N] [--skip N]
                                         Show durable call history, newest first
    clear-history <user>                 Delete a user's durable call history
    version                              Show version information
    help                                 Show this help message

OPTIONS:
    --live                  Use Binance market data instead of fixed prices
    --config <file>         Load configuration from YAML (environment is ignored)

ENVIRONMENT:
    CRYPTO_MCP_HISTORY_PATH JSONL history file (history is in-memory otherwise)
    CRYPTO_MCP_*            See the config module for every override
    RUST_LOG                Log filter (default: info)"#
    );
}

/// Remove `--name value` from `args`, returning the value.
fn take_option(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{name} requires a value");
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

fn take_switch(args: &mut Vec<String>, name: &str) -> bool {
    match args.iter().position(|a| a == name) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn parse_usize(raw: Option<String>, name: &str, default: usize) -> anyhow::Result<usize> {
    raw.map(|s| s.parse::<usize>().with_context(|| format!("{name} must be a non-negative integer")))
        .transpose()
        .map(|v| v.unwrap_or(default))
}

fn build_bridge(config: BridgeConfig, live: bool) -> anyhow::Result<McpBridge> {
    let exchange: Arc<dyn ExchangeClient> = if live {
        Arc::new(BinanceExchange::new(
            &config.exchange.base_url,
            config.exchange.timeout(),
        )?)
    } else {
        Arc::new(StaticExchange::default())
    };
    let ledger = Arc::new(MemoryLedger::new(config.initial_usd_balance));
    Ok(McpBridge::builder()
        .with_config(config)
        .with_default_tools(exchange, ledger)?
        .build()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let live = take_switch(&mut args, "--live");
    let config = match take_option(&mut args, "--config")? {
        Some(path) => BridgeConfig::from_yaml_file(&path)?,
        None => BridgeConfig::from_env(),
    };

    let Some(command) = args.first().cloned() else {
        print_usage();
        std::process::exit(1);
    };
    let mut rest: Vec<String> = args[1..].to_vec();

    match command.as_str() {
        "list" => {
            let bridge = build_bridge(config, live)?;
            let user = take_option(&mut rest, "--user")?.unwrap_or_else(|| DEFAULT_USER.into());
            let listing = bridge.list_tools(&user);
            bridge.flush().await;
            println!("{}", serde_json::to_string_pretty(&listing.result.tools)?);
        }
        "call" => {
            let user = take_option(&mut rest, "--user")?.unwrap_or_else(|| DEFAULT_USER.into());
            let tool = rest
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("call requires a tool name"))?;
            let arguments: JsonObject = match rest.get(1) {
                Some(raw) => serde_json::from_str(raw)
                    .with_context(|| format!("arguments must be a JSON object, got {raw}"))?,
                None => JsonObject::new(),
            };
            let bridge = build_bridge(config, live)?;
            let envelope = bridge.call_tool_envelope(&user, &tool, arguments).await;
            // process::exit skips the runtime; drain queued history first.
            bridge.flush().await;
            println!("{}", envelope.text());
            if envelope.is_error() {
                std::process::exit(2);
            }
        }
        "history" => {
            let limit = parse_usize(take_option(&mut rest, "--limit")?, "--limit", 20)?;
            let skip = parse_usize(take_option(&mut rest, "--skip")?, "--skip", 0)?;
            let user = rest
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("history requires a user id"))?;
            let bridge = build_bridge(config, live)?;
            let entries = bridge.get_history(&user, limit, skip).await?;
            if entries.is_empty() {
                println!("No history for {user}.");
            }
            for entry in entries {
                let tool = entry
                    .request
                    .params
                    .as_ref()
                    .map(|p| p.name.as_str())
                    .unwrap_or("-");
                let status = if entry.response.is_error() { "error" } else { "ok" };
                println!(
                    "{}  #{:<6} {:<11} {:<22} {}",
                    entry.created_at, entry.request.id, entry.call_type, tool, status
                );
            }
        }
        "clear-history" => {
            let user = rest
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("clear-history requires a user id"))?;
            let bridge = build_bridge(config, live)?;
            let deleted = bridge.delete_history(&user).await?;
            println!("Deleted {deleted} entries for {user}.");
        }
        "version" | "--version" | "-V" => {
            println!("crypto-mcp {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_take_option() {
        let mut a = args(&["call", "check_balance", "--user", "bob"]);
        assert_eq!(take_option(&mut a, "--user").unwrap(), Some("bob".into()));
        assert_eq!(a, args(&["call", "check_balance"]));
        assert!(take_option(&mut args(&["--user"]), "--user").is_err());
    }

    #[test]
    fn test_take_switch() {
        let mut a = args(&["--live", "list"]);
        assert!(take_switch(&mut a, "--live"));
        assert!(!take_switch(&mut a, "--live"));
        assert_eq!(a, args(&["list"]));
    }

    #[test]
    fn test_parse_usize() {
        assert_eq!(parse_usize(None, "--limit", 20).unwrap(), 20);
        assert_eq!(parse_usize(Some("5".into()), "--limit", 20).unwrap(), 5);
        assert!(parse_usize(Some("-1".into()), "--limit", 20).is_err());
    }
}
