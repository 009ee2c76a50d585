mod basic;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use bigdecimal::BigDecimal;
use clap::{ArgAction, Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use eth_client::contract_id::{read_contract_id, write_contract_id};
use eth_client::keystore::private_key_by_key_file;
use eth_client::{Client, DialedBackend, SentTransaction, TransactionFailed};
use eth_currency::rates::{default_rates, default_rates_date, CMC_BASE_URL};
use eth_currency::report::{format_block, format_receipt};
use eth_currency::units::{format_plain, format_usd, u256_to_bigint, wei_to_gwei, Converter};
use eth_currency::{
    ExchangeRates, RateFetchError, RateOrigin, RateSource, RateSourceConfig, ReceiptSummary,
    Reporter,
};
use indicatif::{ProgressBar, ProgressStyle};
use num_bigint::BigInt;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::basic::Basic;

#[derive(Debug, Clone)]
struct AppContext {
    rpc_url: String,
    keystore: Option<PathBuf>,
    passphrase: Option<String>,
    rates: RateSourceConfig,
    timeout: Duration,
    cid_file: PathBuf,
}

#[derive(Parser, Debug)]
#[command(name = "contract")]
#[command(about = "Deploy and exercise a contract with cost reports in GWei and USD")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// JSON-RPC endpoint of the node.
    #[arg(long, global = true, env = "ETH_RPC_URL", default_value = "http://localhost:8545")]
    rpc_url: String,

    /// Encrypted V3 keystore of the sending account.
    #[arg(long, global = true, env = "ETH_KEYSTORE")]
    keystore: Option<PathBuf>,

    #[arg(long, global = true, env = "ETH_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,

    /// CoinMarketCap API key; without one the default rates are used.
    #[arg(long, global = true, env = "CMC_API_KEY", hide_env_values = true)]
    cmc_api_key: Option<String>,

    #[arg(long, global = true, default_value = CMC_BASE_URL)]
    cmc_url: String,

    /// Seconds to wait for a transaction to be mined.
    #[arg(long, global = true, default_value_t = 120)]
    timeout_secs: u64,

    /// Where the deployed contract address is kept between runs.
    #[arg(long, global = true, default_value = "zarf/ethereum/basic.cid")]
    cid_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the exchange rates in use and sample conversions.
    Rates,
    /// Show the account balance.
    Balance,
    /// Deploy the contract and save its address.
    Deploy(DeployArgs),
    /// Store a value in the deployed contract.
    Write(WriteArgs),
    /// Read the contract version and a stored value.
    Read(ReadArgs),
}

#[derive(Args, Debug, Clone)]
struct TxArgs {
    #[arg(long, default_value_t = 1_600_000)]
    gas_limit: u64,

    /// Gas price in GWei; 0 asks the node.
    #[arg(long, default_value = "39.576")]
    gas_price_gwei: BigDecimal,

    #[arg(long, default_value = "0")]
    value_gwei: BigDecimal,
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Hex-encoded creation bytecode.
    #[arg(long, default_value = "zarf/ethereum/basic.bin")]
    bin: PathBuf,

    /// Contract ABI, used to decode receipt logs.
    #[arg(long, default_value = "zarf/ethereum/basic.abi")]
    abi: PathBuf,

    #[command(flatten)]
    tx: TxArgs,
}

#[derive(Args, Debug)]
struct WriteArgs {
    #[arg(long)]
    key: String,

    #[arg(long)]
    value: U256,

    #[arg(long, default_value = "zarf/ethereum/basic.abi")]
    abi: PathBuf,

    #[command(flatten)]
    tx: TxArgs,
}

#[derive(Args, Debug)]
struct ReadArgs {
    #[arg(long)]
    key: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let timeout = Duration::from_secs(cli.timeout_secs);
    let ctx = AppContext {
        rpc_url: cli.rpc_url,
        keystore: cli.keystore,
        passphrase: cli.passphrase,
        rates: RateSourceConfig {
            base_url: cli.cmc_url,
            timeout,
            ..RateSourceConfig::with_api_key(cli.cmc_api_key)
        },
        timeout,
        cid_file: cli.cid_file,
    };

    match cli.command {
        Commands::Rates => handle_rates(&ctx).await,
        Commands::Balance => handle_balance(&ctx).await,
        Commands::Deploy(args) => handle_deploy(&ctx, args).await,
        Commands::Write(args) => handle_write(&ctx, args).await,
        Commands::Read(args) => handle_read(&ctx, args).await,
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

/// Live rates when a key is configured and the API answers, defaults otherwise.
async fn load_converter(ctx: &AppContext) -> Converter {
    let rates = load_rates(RateSource::new(ctx.rates.clone())).await;
    info!(origin = %rates.origin, "exchange rates ready");
    Converter::new(rates)
}

async fn load_rates(source: Result<RateSource, RateFetchError>) -> ExchangeRates {
    match source {
        Ok(source) => source.rates_or_default().await,
        Err(error) => {
            warn!(%error, "price API client unavailable, using default rates");
            default_rates()
        }
    }
}

async fn connect(ctx: &AppContext) -> Result<Client> {
    let keystore = ctx
        .keystore
        .as_deref()
        .ok_or_else(|| eyre!("--keystore (or ETH_KEYSTORE) is required for chain commands"))?;
    let passphrase = ctx.passphrase.as_deref().unwrap_or_default();

    let signer = private_key_by_key_file(keystore, passphrase)?;
    let address = signer.address();
    let backend = DialedBackend::connect(&ctx.rpc_url, signer).await?;

    Client::new(Arc::new(backend), address).await
}

fn rates_block(converter: &Converter) -> String {
    let (eth_to_usd, usd_to_eth) = converter.values();
    let mut origin = converter.rates().origin.to_string();
    if converter.rates().origin == RateOrigin::Default {
        if let Some(date) = default_rates_date() {
            origin = format!("{origin} ({date})");
        }
    }

    format_block(
        "Conversion Rates",
        &[
            ("origin", origin),
            ("1 ETH to USD", format_plain(eth_to_usd)),
            ("1 USD to ETH", format_plain(usd_to_eth)),
            ("1 GWei to USD", format_plain(converter.one_gwei_to_usd())),
            ("1 USD to GWei", format_plain(converter.one_usd_to_gwei())),
        ],
    )
}

fn input_block(client: &Client, tx: &TxArgs) -> String {
    let gas_price = if tx.gas_price_gwei == BigDecimal::from(0) {
        "suggested by node".to_string()
    } else {
        format!("{} GWei", format_plain(&tx.gas_price_gwei))
    };

    format_block(
        "Input Values",
        &[
            ("network", client.network().to_string()),
            ("chain id", client.chain_id().to_string()),
            ("from", client.address().to_checksum(None)),
            ("gas limit", tx.gas_limit.to_string()),
            ("gas price", gas_price),
            ("value", format!("{} GWei", format_plain(&tx.value_gwei))),
        ],
    )
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Waits for `sent` and prints its receipt. A failed receipt is printed
/// before the failure is returned.
async fn wait_and_report(
    ctx: &AppContext,
    client: &Client,
    reporter: &Reporter,
    sent: &SentTransaction,
) -> Result<ReceiptSummary> {
    let pb = spinner("waiting for transaction to be mined")?;
    let outcome = client.wait_mined(sent, ctx.timeout).await;
    pb.finish_and_clear();

    match outcome {
        Ok(receipt) => {
            print!("{}", reporter.fmt_receipt(&receipt));
            Ok(receipt)
        }
        Err(error) => {
            if let Some(failed) = error.downcast_ref::<TransactionFailed>() {
                print!(
                    "{}",
                    format_receipt(&reporter.converter().receipt_details(&failed.receipt))
                );
            }
            Err(error)
        }
    }
}

/// Prints the balance sheet for `starting` against the current balance.
async fn print_balance_sheet(client: &Client, reporter: &Reporter, starting: U256) {
    match client.balance().await {
        Ok(ending) => print!("{}", reporter.fmt_balance_sheet(starting, ending)),
        Err(error) => warn!(%error, "unable to read ending balance"),
    }
}

fn read_abi(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(abi) => abi,
        Err(error) => {
            warn!(path = %path.display(), %error, "ABI not readable, logs will not be decoded");
            String::new()
        }
    }
}

fn read_bytecode(path: &Path) -> Result<Bytes> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read bytecode {}", path.display()))?;
    let code = alloy::hex::decode(text.trim())
        .wrap_err_with(|| format!("bytecode in {} is not hex", path.display()))?;
    if code.is_empty() {
        return Err(eyre!("bytecode in {} is empty", path.display()));
    }
    Ok(Bytes::from(code))
}

async fn handle_rates(ctx: &AppContext) -> Result<()> {
    let converter = load_converter(ctx).await;
    print!("{}", rates_block(&converter));

    let one_eth = BigInt::from(10u64).pow(18);
    let transfer = BigInt::from(21_000u64) * BigInt::from(39_576_000_000u64);

    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Amount", "GWei", "USD"]);
    table.add_row(vec![
        "1 ETH".to_string(),
        format_plain(&wei_to_gwei(&one_eth)),
        format_usd(&converter.wei_to_usd(&one_eth)),
    ]);
    table.add_row(vec![
        "21000 gas @ 39.576 GWei".to_string(),
        format_plain(&wei_to_gwei(&transfer)),
        format_usd(&converter.wei_to_usd(&transfer)),
    ]);
    table.add_row(vec![
        "1 USD".to_string(),
        format_plain(&converter.usd_to_gwei(&BigDecimal::from(1))),
        "1.00".to_string(),
    ]);
    println!("\n{table}\n");

    Ok(())
}

async fn handle_balance(ctx: &AppContext) -> Result<()> {
    let converter = load_converter(ctx).await;
    let client = connect(ctx).await?;

    let balance = u256_to_bigint(client.balance().await?);
    print!(
        "{}",
        format_block(
            "Balance",
            &[
                ("account", client.address().to_checksum(None)),
                ("balance", format!("{} GWei", format_plain(&wei_to_gwei(&balance)))),
                ("balance", format!("{} USD", format_usd(&converter.wei_to_usd(&balance)))),
            ],
        )
    );

    Ok(())
}

async fn handle_deploy(ctx: &AppContext, args: DeployArgs) -> Result<()> {
    let converter = load_converter(ctx).await;
    let reporter = Reporter::new(converter, read_abi(&args.abi));
    let bytecode = read_bytecode(&args.bin)?;

    let client = connect(ctx).await?;
    print!("{}", input_block(&client, &args.tx));
    print!("{}", rates_block(reporter.converter()));

    let starting = client.balance().await.wrap_err("reading starting balance")?;
    let outcome = deploy(ctx, &client, &reporter, &args.tx, bytecode).await;
    print_balance_sheet(&client, &reporter, starting).await;
    outcome
}

async fn deploy(
    ctx: &AppContext,
    client: &Client,
    reporter: &Reporter,
    tx: &TxArgs,
    bytecode: Bytes,
) -> Result<()> {
    let opts = client
        .transact_opts(tx.gas_limit, &tx.gas_price_gwei, &tx.value_gwei)
        .await?;
    let sent = client.deploy(&opts, bytecode).await?;
    print!("{}", reporter.fmt_transaction(&sent.summary));

    let address = opts.create_address();
    write_contract_id(&ctx.cid_file, address)?;
    print!(
        "{}",
        format_block("Contract", &[("contract id", address.to_checksum(None))])
    );

    let receipt = wait_and_report(ctx, client, reporter, &sent).await?;
    match receipt.contract_address {
        Some(mined) if mined != address => {
            warn!(expected = %address, %mined, "contract mined at another address");
            write_contract_id(&ctx.cid_file, mined)?;
        }
        Some(_) => {}
        None => return Err(eyre!("receipt for {} has no contract address", receipt.hash)),
    }
    Ok(())
}

async fn handle_write(ctx: &AppContext, args: WriteArgs) -> Result<()> {
    let converter = load_converter(ctx).await;
    let reporter = Reporter::new(converter, read_abi(&args.abi));
    let contract = read_contract_id(&ctx.cid_file)?;

    let client = connect(ctx).await?;
    print!("{}", input_block(&client, &args.tx));
    print!("{}", rates_block(reporter.converter()));

    let starting = client.balance().await.wrap_err("reading starting balance")?;
    let outcome = write_item(ctx, &client, &reporter, contract, &args).await;
    print_balance_sheet(&client, &reporter, starting).await;
    outcome
}

async fn write_item(
    ctx: &AppContext,
    client: &Client,
    reporter: &Reporter,
    contract: Address,
    args: &WriteArgs,
) -> Result<()> {
    let opts = client
        .transact_opts(args.tx.gas_limit, &args.tx.gas_price_gwei, &args.tx.value_gwei)
        .await?;
    let calldata = Basic::SetItemCall {
        key: args.key.clone(),
        value: args.value,
    }
    .abi_encode();
    let sent = client.transact(&opts, contract, calldata.into()).await?;
    print!("{}", reporter.fmt_transaction(&sent.summary));

    wait_and_report(ctx, client, reporter, &sent).await?;
    Ok(())
}

async fn handle_read(ctx: &AppContext, args: ReadArgs) -> Result<()> {
    let contract = read_contract_id(&ctx.cid_file)?;
    let client = connect(ctx).await?;

    let output = client
        .call(contract, Basic::VersionCall {}.abi_encode().into())
        .await
        .wrap_err("calling Version")?;
    let version = Basic::VersionCall::abi_decode_returns(&output, true)
        .wrap_err("decoding Version result")?
        ._0;

    let output = client
        .call(
            contract,
            Basic::ItemsCall {
                key: args.key.clone(),
            }
            .abi_encode()
            .into(),
        )
        .await
        .wrap_err("calling Items")?;
    let value = Basic::ItemsCall::abi_decode_returns(&output, true)
        .wrap_err("decoding Items result")?
        ._0;

    print!(
        "{}",
        format_block(
            "Contract",
            &[
                ("contract id", contract.to_checksum(None)),
                ("version", version),
                (args.key.as_str(), value.to_string()),
            ],
        )
    );

    Ok(())
}
