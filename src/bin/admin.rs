use std::collections::VecDeque;

use anyhow::Context;
use serde::Serialize;

use carbon_registry::domain::{parse_amount, short_address};
use carbon_registry::telemetry::{init_telemetry, TelemetryConfig};
use carbon_registry::{
    AccountPermissions, Address, Amount, BalanceLookup, BatchAggregator, BatchId, BatchOverview,
    ContractStatus, HolderBalance, NewBatch, RegistryActions, RegistryQueries, SessionConfig,
    SessionManager, Submission,
};

fn print_help() {
    eprintln!(
        "\
carbon-registry-admin

USAGE:
  carbon-registry-admin <command> [options]

READ COMMANDS:
  status                          Contract status (paused, owner, next batch id)
  permissions                     Roles of the connected account
  batches                         List all batches with minted/remaining supply
  balances                        List positive balances of an account
  batch                           Show one batch
  balance                         Balance of an account in one batch

TRANSACTION COMMANDS:
  create-batch                    Create a batch (authorized verification bodies)
  verify-batch                    Verify a batch you created
  mint                            Mint credits of a verified batch (owner)
  retire                          Retire and burn credits you hold
  transfer                        Transfer credits you hold
  authorize                       Authorize a verification body (owner)
  authorize-self                  Authorize the connected account (owner)
  pause / unpause                 Pause or resume the contract (owner)
  transfer-ownership              Hand the contract to a new owner (owner)
  renounce-ownership              Leave the contract without owner (owner)

COMMON OPTIONS:
  --rpc-url <url>                 (defaults to env CARBON_RPC_URL)
  --contract <address>            (defaults to env CARBON_CONTRACT_ADDRESS)
  --account <address>             Read-only account (defaults to env CARBON_ACCOUNT)
  --json                          Print results as JSON
  --verbose                       Debug logging
  --yes                           Confirm irreversible commands

COMMAND OPTIONS:
  balances       [--holder <address>]           (default: connected account)
  batch          --id <n>
  balance        --holder <address> --id <n>
  create-batch   --project <name> --amount <tons> --doc-hash <cid> [--expiry <unix>]
  verify-batch   --id <n>
  mint           --to <address> --id <n> --amount <tons>
  retire         --id <n> --amount <tons> [--esg-ref <text>]
  transfer       --to <address> --id <n> --amount <tons>
  authorize      --address <address>
  transfer-ownership --new-owner <address>

ENV:
  CARBON_PRIVATE_KEY              Signing key for transaction commands
  LOG_LEVEL / RUST_LOG, LOG_JSON  Logging
"
    );
}

#[derive(Debug, Default)]
struct Options {
    rpc_url: Option<String>,
    contract: Option<Address>,
    account: Option<Address>,
    json: bool,
    verbose: bool,
    yes: bool,
    id: Option<BatchId>,
    holder: Option<Address>,
    to: Option<Address>,
    address: Option<Address>,
    new_owner: Option<Address>,
    amount: Option<Amount>,
    project: Option<String>,
    doc_hash: Option<String>,
    expiry: Option<u64>,
    esg_ref: Option<String>,
}

fn parse_address(flag: &str, raw: &str) -> anyhow::Result<Address> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid address for {flag}: {raw}"))
}

fn parse_options(mut args: VecDeque<String>) -> anyhow::Result<Option<Options>> {
    let mut opts = Options::default();

    while let Some(arg) = args.pop_front() {
        let mut value = |flag: &str| {
            args.pop_front()
                .ok_or_else(|| anyhow::anyhow!("missing value for {flag}"))
        };

        match arg.as_str() {
            "--rpc-url" => opts.rpc_url = Some(value("--rpc-url")?),
            "--contract" => {
                opts.contract = Some(parse_address("--contract", &value("--contract")?)?)
            }
            "--account" => opts.account = Some(parse_address("--account", &value("--account")?)?),
            "--holder" => opts.holder = Some(parse_address("--holder", &value("--holder")?)?),
            "--to" => opts.to = Some(parse_address("--to", &value("--to")?)?),
            "--address" => opts.address = Some(parse_address("--address", &value("--address")?)?),
            "--new-owner" => {
                opts.new_owner = Some(parse_address("--new-owner", &value("--new-owner")?)?)
            }
            "--id" => {
                let raw = value("--id")?;
                opts.id = Some(raw.parse().with_context(|| format!("invalid batch id: {raw}"))?);
            }
            "--amount" => {
                let raw = value("--amount")?;
                opts.amount = Some(
                    parse_amount(&raw)
                        .ok_or_else(|| anyhow::anyhow!("amount must be a whole number: {raw}"))?,
                );
            }
            "--expiry" => {
                let raw = value("--expiry")?;
                opts.expiry = Some(raw.parse().with_context(|| format!("invalid expiry: {raw}"))?);
            }
            "--project" => opts.project = Some(value("--project")?),
            "--doc-hash" => opts.doc_hash = Some(value("--doc-hash")?),
            "--esg-ref" => opts.esg_ref = Some(value("--esg-ref")?),
            "--json" => opts.json = true,
            "--verbose" => opts.verbose = true,
            "--yes" => opts.yes = true,
            "-h" | "--help" => return Ok(None),
            other => anyhow::bail!("unexpected argument: {other}"),
        }
    }

    Ok(Some(opts))
}

fn require<T>(value: Option<T>, flag: &str) -> anyhow::Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("{flag} is required"))
}

fn require_confirmation(opts: &Options, what: &str) -> anyhow::Result<()> {
    if !opts.yes {
        anyhow::bail!("{what} cannot be undone; re-run with --yes to confirm");
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_batches(batches: &[BatchOverview]) {
    if batches.is_empty() {
        println!("No batches");
        return;
    }
    for overview in batches {
        let batch = &overview.batch;
        println!("Batch #{}: {}", batch.id, batch.project_name);
        println!(
            "  status:            {}",
            if batch.is_verified { "verified" } else { "not verified" }
        );
        println!("  total reduction:   {} tons CO2", batch.total_emission_reduction);
        println!("  minted:            {} tons CO2", overview.total_minted);
        println!("  remaining:         {} tons CO2", overview.remaining_supply);
        println!("  retired:           {} tons CO2", batch.burned_amount);
        println!("  expiry:            {}", batch.expiry());
        println!("  verification body: {}", short_address(&batch.verification_body));
    }
}

fn print_batch_details(overview: &BatchOverview) {
    let batch = &overview.batch;
    println!("Batch #{}", batch.id);
    println!("  project:           {}", batch.project_name);
    println!("  verification body: {}", short_address(&batch.verification_body));
    println!("  total reduction:   {} tons CO2", batch.total_emission_reduction);
    println!("  minted:            {} tons CO2", overview.total_minted);
    println!("  remaining to mint: {} tons CO2", overview.remaining_supply);
    println!("  retired:           {} tons CO2", batch.burned_amount);
    match batch.issued_at() {
        Some(at) => println!("  issued:            {}", at.to_rfc3339()),
        None => println!("  issued:            unknown"),
    }
    println!("  expiry:            {}", batch.expiry());
    println!(
        "  verification:      {}",
        if batch.is_verified { "verified" } else { "not verified" }
    );
    println!("  document hash:     {}", batch.verification_doc_hash);
}

fn print_balances(balances: &[HolderBalance]) {
    if balances.is_empty() {
        println!("No balance");
        return;
    }
    for balance in balances {
        println!(
            "Batch {}: {} tons CO2 ({})",
            balance.batch_id, balance.balance, balance.project_name
        );
    }
}

fn print_balance_lookup(lookup: &BalanceLookup) {
    println!("Address:  {}", short_address(&lookup.holder));
    println!("Batch:    {} ({})", lookup.batch_id, lookup.project_name);
    println!("Balance:  {} tons CO2", lookup.balance);
    println!(
        "Status:   {}",
        if lookup.has_balance() { "has balance" } else { "no balance" }
    );
}

fn print_status(status: &ContractStatus) {
    println!(
        "Contract status: {}",
        if status.paused { "paused" } else { "running" }
    );
    println!("Contract owner:  {}", short_address(&status.owner));
    println!("Next batch id:   {}", status.next_batch_id);
    println!("Contract:        {}", short_address(&status.contract_address));
}

fn print_permissions(permissions: &AccountPermissions) {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    println!("Account:                        {}", short_address(&permissions.account));
    println!("Contract owner:                 {}", yes_no(permissions.is_owner));
    println!(
        "Authorized verification body:   {}",
        yes_no(permissions.is_authorized_verification_body)
    );
    println!(
        "Contract status:                {}",
        if permissions.paused { "paused" } else { "running" }
    );
    if permissions.can_self_authorize() {
        println!("Hint: run `authorize-self --yes` before creating batches");
    }
}

fn print_submission(submission: &Submission) {
    match submission {
        Submission::Confirmed(receipt) => println!(
            "ok: {} confirmed in tx {} (block {})",
            receipt.action,
            receipt.tx_hash,
            receipt
                .block_number
                .map(|n| n.to_string())
                .unwrap_or_else(|| "pending".to_string())
        ),
        Submission::Unchanged { reason } => println!("unchanged: {reason}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args: VecDeque<String> = std::env::args().skip(1).collect();
    let Some(command) = args.pop_front() else {
        print_help();
        return Ok(());
    };

    if matches!(command.as_str(), "-h" | "--help" | "help") {
        print_help();
        return Ok(());
    }

    let Some(opts) = parse_options(args)? else {
        print_help();
        return Ok(());
    };

    let mut telemetry = TelemetryConfig::from_env();
    if opts.verbose {
        telemetry = telemetry.verbose();
    }
    init_telemetry(&telemetry).map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let mut config = SessionConfig::from_env()?;
    if let Some(rpc_url) = opts.rpc_url.clone() {
        config.rpc_url = rpc_url;
    }
    if let Some(contract) = opts.contract {
        config.contract_address = contract;
    }
    if opts.account.is_some() {
        config.account = opts.account;
    }

    let mut sessions = SessionManager::new();
    sessions
        .connect_chain(&config)
        .context("failed to connect")?;
    let session = sessions.active().ok();

    match command.as_str() {
        "status" => {
            let status = RegistryQueries::for_session(session)?
                .contract_status()
                .await
                .context("failed to load dashboard")?;
            if opts.json {
                print_json(&status)?;
            } else {
                print_status(&status);
            }
        }
        "permissions" => {
            let account = sessions.active()?.account();
            let permissions = RegistryQueries::for_session(session)?
                .permissions(account)
                .await
                .context("failed to check permissions")?;
            if opts.json {
                print_json(&permissions)?;
            } else {
                print_permissions(&permissions);
            }
        }
        "batches" => {
            let batches = BatchAggregator::for_session(session)?
                .list_all_batches()
                .await
                .context("failed to load batch list")?;
            if opts.json {
                print_json(&batches)?;
            } else {
                print_batches(&batches);
            }
        }
        "balances" => {
            let aggregator = BatchAggregator::for_session(session)?;
            let balances = match opts.holder {
                Some(holder) => aggregator.list_balances_for(holder).await,
                None => aggregator.list_my_balances().await,
            }
            .context("failed to load balances")?;
            if opts.json {
                print_json(&balances)?;
            } else {
                print_balances(&balances);
            }
        }
        "batch" => {
            let id = require(opts.id, "--id")?;
            let details = RegistryQueries::for_session(session)?
                .batch_details(id)
                .await
                .context("batch does not exist or query failed")?;
            if opts.json {
                print_json(&details)?;
            } else {
                print_batch_details(&details);
            }
        }
        "balance" => {
            let holder = require(opts.holder, "--holder")?;
            let id = require(opts.id, "--id")?;
            let lookup = RegistryQueries::for_session(session)?
                .balance_of(holder, id)
                .await
                .context("query failed or batch does not exist")?;
            if opts.json {
                print_json(&lookup)?;
            } else {
                print_balance_lookup(&lookup);
            }
        }
        transaction => {
            let actions = RegistryActions::for_session(session)?;
            let submission = match transaction {
                "create-batch" => {
                    let batch = NewBatch {
                        project_name: require(opts.project.clone(), "--project")?,
                        total_emission_reduction: require(opts.amount, "--amount")?,
                        expiry_date: opts.expiry.unwrap_or(0),
                        verification_doc_hash: require(opts.doc_hash.clone(), "--doc-hash")?,
                    };
                    actions.create_batch(&batch).await
                }
                "verify-batch" => actions.verify_batch(require(opts.id, "--id")?).await,
                "mint" => {
                    actions
                        .mint(
                            require(opts.to, "--to")?,
                            require(opts.id, "--id")?,
                            require(opts.amount, "--amount")?,
                        )
                        .await
                }
                "retire" => {
                    actions
                        .retire(
                            require(opts.id, "--id")?,
                            require(opts.amount, "--amount")?,
                            opts.esg_ref.as_deref().unwrap_or(""),
                        )
                        .await
                }
                "transfer" => {
                    actions
                        .transfer(
                            require(opts.to, "--to")?,
                            require(opts.id, "--id")?,
                            require(opts.amount, "--amount")?,
                        )
                        .await
                }
                "authorize" => {
                    actions
                        .authorize_verification_body(require(opts.address, "--address")?)
                        .await
                }
                "authorize-self" => {
                    require_confirmation(&opts, "authorizing this account")?;
                    actions.authorize_self().await
                }
                "pause" => {
                    require_confirmation(&opts, "pausing the contract")?;
                    actions.pause().await
                }
                "unpause" => actions.unpause().await,
                "transfer-ownership" => {
                    let new_owner = require(opts.new_owner, "--new-owner")?;
                    require_confirmation(
                        &opts,
                        &format!("transferring ownership to {}", short_address(&new_owner)),
                    )?;
                    actions.transfer_ownership(new_owner).await
                }
                "renounce-ownership" => {
                    require_confirmation(&opts, "renouncing ownership")?;
                    actions.renounce_ownership().await
                }
                other => {
                    print_help();
                    anyhow::bail!("unknown command: {other}");
                }
            }
            .with_context(|| format!("{transaction} failed"))?;

            if opts.json {
                print_json(&submission)?;
            } else {
                print_submission(&submission);
            }
        }
    }

    sessions.disconnect();
    Ok(())
}
