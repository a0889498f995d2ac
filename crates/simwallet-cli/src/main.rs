use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use simwallet_data::blocks::RpcBlockClient;
use simwallet_data::explorer::{ExplorerClient, DEFAULT_EXPLORER_URL};
use simwallet_data::{format_address, format_eth};
use simwallet_engine::attestation::LocalAttestationSigner;
use simwallet_engine::config::{
    RateLimitConfig, DEFAULT_EXPANSION_CONCURRENCY, DEFAULT_MATCH_TOLERANCE_SECS,
    DEFAULT_RADIUS_BLOCKS, DEFAULT_SCORE_THRESHOLD, DEFAULT_TIME_TOLERANCE_SECS,
};
use simwallet_engine::{
    compare_histories, CorrelationConfig, SimilarWalletsReport, SimilarityEngine, SimilarityMatch,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct AppContext {
    rpc_url: Option<String>,
    explorer_url: String,
    explorer_api_key: Option<String>,
    signer_key: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "simwallet")]
#[command(about = "Find wallets whose on-chain activity correlates with a given wallet")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank wallets that repeatedly transact next to the given wallet.
    Similar(SimilarArgs),
    /// List matched transactions between two wallets.
    Compare(CompareArgs),
}

/// Arguments for the `similar` subcommand.
///
/// Requires `SIMWALLET_RPC_URL` for block data.
#[derive(Args, Debug)]
struct SimilarArgs {
    /// Subject wallet address.
    #[arg(long)]
    address: String,

    /// Blocks searched on each side of every subject transaction.
    #[arg(long, default_value_t = DEFAULT_RADIUS_BLOCKS)]
    radius_blocks: u64,

    /// Max seconds between a neighborhood block and the subject transaction.
    #[arg(long, default_value_t = DEFAULT_TIME_TOLERANCE_SECS)]
    time_tolerance: u64,

    /// Minimum score reported.
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    threshold: u32,

    /// Block RPC requests allowed per second.
    #[arg(long, default_value_t = RateLimitConfig::default().max_requests)]
    rate_limit: usize,

    /// Subject transactions expanded concurrently.
    #[arg(long, default_value_t = DEFAULT_EXPANSION_CONCURRENCY)]
    concurrency: usize,

    /// Re-score candidates with an exact pairwise comparison.
    #[arg(long)]
    verify: bool,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

/// Arguments for the `compare` subcommand.
#[derive(Args, Debug)]
struct CompareArgs {
    /// First wallet; its transactions drive the match.
    #[arg(long)]
    wallet_a: String,

    /// Second wallet.
    #[arg(long)]
    wallet_b: String,

    /// Max seconds between two matched transactions.
    #[arg(long, default_value_t = DEFAULT_MATCH_TOLERANCE_SECS)]
    tolerance: u64,

    /// Output format: table (default) or json.
    #[arg(long, default_value = "table")]
    output: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        rpc_url: std::env::var("SIMWALLET_RPC_URL").ok(),
        explorer_url: std::env::var("SIMWALLET_EXPLORER_URL")
            .unwrap_or_else(|_| DEFAULT_EXPLORER_URL.to_string()),
        explorer_api_key: std::env::var("SIMWALLET_EXPLORER_API_KEY").ok(),
        signer_key: std::env::var("SIMWALLET_SIGNER_KEY").ok(),
    };

    match cli.command {
        Commands::Similar(args) => handle_similar(&ctx, args).await,
        Commands::Compare(args) => handle_compare(&ctx, args).await,
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn handle_similar(ctx: &AppContext, args: SimilarArgs) -> Result<()> {
    let rpc_url = ctx
        .rpc_url
        .as_deref()
        .ok_or_else(|| eyre!("SIMWALLET_RPC_URL is required for similar command"))?;

    let config = CorrelationConfig {
        radius_blocks: args.radius_blocks,
        time_tolerance_secs: args.time_tolerance,
        score_threshold: args.threshold,
        batch_size: args.rate_limit,
        expansion_concurrency: args.concurrency,
        verify_pairwise: args.verify,
        rate_limit: RateLimitConfig {
            max_requests: args.rate_limit,
            ..RateLimitConfig::default()
        },
        ..CorrelationConfig::default()
    };

    let explorer = ExplorerClient::new(&ctx.explorer_url, ctx.explorer_api_key.clone())
        .wrap_err("failed to create explorer client")?;
    let blocks = RpcBlockClient::new(rpc_url).wrap_err("failed to create RPC client")?;

    let mut engine =
        SimilarityEngine::new(explorer, blocks, config).wrap_err("invalid correlation config")?;
    if let Some(key) = ctx.signer_key.as_deref() {
        let signer = LocalAttestationSigner::from_hex(key).wrap_err("failed to load signer key")?;
        info!(signer = %format_address(&signer.signer_address()), "attestation signer loaded");
        engine = engine.with_attestation_signer(Arc::new(signer));
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message("scanning block neighborhoods");
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = engine.compute_similar_wallets(&args.address).await;
    pb.finish_and_clear();
    let report = result.wrap_err("similar-wallet search failed")?;

    match args.output.to_lowercase().as_str() {
        "table" => print_report_table(&report),
        "json" => print_report_json(&report)?,
        _ => {
            return Err(eyre!(
                "unknown output format '{}'; use 'table' or 'json'",
                args.output
            ))
        }
    }

    info!(
        address = %format_address(&report.address),
        transactions_scanned = report.transactions_scanned,
        similar_wallets = report.similar_wallets.len(),
        attested = report.attestation.is_some(),
        "similar command completed"
    );

    Ok(())
}

async fn handle_compare(ctx: &AppContext, args: CompareArgs) -> Result<()> {
    let explorer = ExplorerClient::new(&ctx.explorer_url, ctx.explorer_api_key.clone())
        .wrap_err("failed to create explorer client")?;

    let matches = compare_histories(&explorer, &args.wallet_a, &args.wallet_b, args.tolerance)
        .await
        .wrap_err("wallet comparison failed")?;

    match args.output.to_lowercase().as_str() {
        "table" => print_matches_table(&matches),
        "json" => print_matches_json(&matches)?,
        _ => {
            return Err(eyre!(
                "unknown output format '{}'; use 'table' or 'json'",
                args.output
            ))
        }
    }

    info!(matches = matches.len(), "compare command completed");
    Ok(())
}

fn print_report_table(report: &SimilarWalletsReport) {
    if report.similar_wallets.is_empty() {
        println!(
            "\nNo similar wallets found for {} ({} transactions scanned, {} candidates below threshold).",
            format_address(&report.address),
            report.transactions_scanned,
            report.candidates_scored
        );
        if let Some(signature) = &report.attestation {
            println!("Attestation: {signature}");
        }
        println!();
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Wallet", "Score"]);

    for (rank, wallet) in report.similar_wallets.iter().enumerate() {
        table.add_row(vec![
            (rank + 1).to_string(),
            format_address(&wallet.address),
            wallet.score.to_string(),
        ]);
    }

    println!("\n{}\n", table);
    println!(
        "Summary: {} similar wallets for {} ({} transactions scanned, {} candidates scored)\n",
        report.similar_wallets.len(),
        format_address(&report.address),
        report.transactions_scanned,
        report.candidates_scored
    );
}

fn print_report_json(report: &SimilarWalletsReport) -> Result<()> {
    #[derive(Serialize)]
    struct JsonOutput {
        address: String,
        transactions_scanned: usize,
        candidates_scored: usize,
        similar_wallets: Vec<JsonWallet>,
        #[serde(skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    }

    #[derive(Serialize)]
    struct JsonWallet {
        address: String,
        score: u32,
    }

    let output = JsonOutput {
        address: format_address(&report.address),
        transactions_scanned: report.transactions_scanned,
        candidates_scored: report.candidates_scored,
        similar_wallets: report
            .similar_wallets
            .iter()
            .map(|wallet| JsonWallet {
                address: format_address(&wallet.address),
                score: wallet.score,
            })
            .collect(),
        signature: report.attestation.clone(),
    };

    let json_str = serde_json::to_string_pretty(&output).wrap_err("failed to serialize JSON")?;
    println!("{}", json_str);
    Ok(())
}

fn print_matches_table(matches: &[SimilarityMatch]) {
    if matches.is_empty() {
        println!("\nNo similar transactions found.\n");
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Time (UTC)",
        "Contract",
        "Method A",
        "Method B",
        "Value A",
        "Value B",
        "Tx A",
        "Tx B",
    ]);

    for m in matches {
        table.add_row(vec![
            format_timestamp(m.timestamp),
            format_address(&m.contract_address),
            m.method_signature.clone(),
            m.transaction_b.method_signature(),
            format_eth(m.value),
            format_eth(m.transaction_b.value),
            truncate_hash(&m.transaction_a.hash.to_string()),
            truncate_hash(&m.transaction_b.hash.to_string()),
        ]);
    }

    println!("\n{}\n", table);
    println!("{} similar transactions\n", matches.len());
}

fn print_matches_json(matches: &[SimilarityMatch]) -> Result<()> {
    #[derive(Serialize)]
    struct JsonMatch {
        timestamp: u64,
        time: String,
        contract_address: String,
        method_signature: String,
        value_wei: String,
        wallet_a_tx: String,
        wallet_b_tx: String,
        wallet_b_method_signature: String,
        wallet_b_value_wei: String,
    }

    let output: Vec<JsonMatch> = matches
        .iter()
        .map(|m| JsonMatch {
            timestamp: m.timestamp,
            time: format_timestamp(m.timestamp),
            contract_address: format_address(&m.contract_address),
            method_signature: m.method_signature.clone(),
            value_wei: m.value.to_string(),
            wallet_a_tx: m.transaction_a.hash.to_string(),
            wallet_b_tx: m.transaction_b.hash.to_string(),
            wallet_b_method_signature: m.transaction_b.method_signature(),
            wallet_b_value_wei: m.transaction_b.value.to_string(),
        })
        .collect();

    let json_str = serde_json::to_string_pretty(&output).wrap_err("failed to serialize JSON")?;
    println!("{}", json_str);
    Ok(())
}

fn format_timestamp(timestamp: u64) -> String {
    chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

fn truncate_hash(hash: &str) -> String {
    if hash.len() > 14 {
        format!("{}…{}", &hash[..10], &hash[hash.len() - 4..])
    } else {
        hash.to_string()
    }
}
