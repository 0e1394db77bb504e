use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chansweep_core::lookback_cutoff;
use chansweep_engine::{
    ActionExecutor, ActionOutcome, ChannelInfo, DiscoveryEngine, DiscoveryTuning, FilterCriteria,
    RateLimiter, WorkspaceClient, DEFAULT_LEAVE_PACING,
};
use chrono::Utc;
use dialoguer::Confirm;
use tokio::sync::watch;

use crate::cli_args::{Cli, Commands, ConfigCommands, DiscoverArgs, LeaveArgs, SkiplistCommands};
use crate::config_store::{config_path, AppConfig};
use crate::render;
use crate::skip_list::SkipList;

const REQUEST_TIMEOUT_MS: u64 = 30_000;

struct Globals {
    state_dir: PathBuf,
    token: Option<String>,
    api_base: String,
    verbose: bool,
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let Cli {
        state_dir,
        token,
        api_base,
        verbose,
        command,
    } = cli;
    let globals = Globals {
        state_dir,
        token,
        api_base,
        verbose,
    };
    match command {
        Commands::Discover(args) => run_discover(&globals, args).await,
        Commands::Leave(args) => run_leave(&globals, args).await,
        Commands::Skiplist { command } => run_skiplist(&globals, command),
        Commands::Config { command } => run_config(&globals, command),
    }
}

async fn run_discover(globals: &Globals, args: DiscoverArgs) -> Result<()> {
    let mut config = AppConfig::load(&globals.state_dir)?;
    apply_discover_overrides(&mut config, &args);
    config.validate()?;
    let skiplist = SkipList::load(&globals.state_dir)?;
    let verbose = globals.verbose || config.verbose;

    let client = Arc::new(build_client(globals)?);
    let limiter = Arc::new(RateLimiter::new(verbose));
    let engine = build_engine(client, limiter, &config, &skiplist);

    let mut stale = engine.discover_until(cancel_on_ctrl_c()).await?;
    render::sort_oldest_first(&mut stale);

    if args.json {
        let report = render::render_json(&stale).context("failed to encode report")?;
        println!("{report}");
        return Ok(());
    }
    if stale.is_empty() {
        println!("no stale channels found (quiet for {}d or more)", config.days);
        return Ok(());
    }
    print!("{}", render::render_table(&stale, Utc::now()));
    println!("\n{} channel(s) quiet for more than {}d", stale.len(), config.days);
    Ok(())
}

async fn run_leave(globals: &Globals, args: LeaveArgs) -> Result<()> {
    if args.all && !args.channels.is_empty() {
        bail!("pass channel names or --all, not both");
    }
    if !args.all && args.channels.is_empty() {
        bail!("nothing to leave: name channels or pass --all");
    }
    let config = AppConfig::load(&globals.state_dir)?;
    config.validate()?;
    let skiplist = SkipList::load(&globals.state_dir)?;
    let verbose = globals.verbose || config.verbose;

    let client = Arc::new(build_client(globals)?);
    let limiter = Arc::new(RateLimiter::new(verbose));
    let engine = build_engine(Arc::clone(&client), Arc::clone(&limiter), &config, &skiplist);

    println!("discovering stale channels...");
    let mut stale = engine.discover_until(cancel_on_ctrl_c()).await?;
    render::sort_oldest_first(&mut stale);
    let targets = select_targets(stale, &args.channels)?;
    if targets.is_empty() {
        println!("no stale channels to leave");
        return Ok(());
    }

    print!("{}", render::render_table(&targets, Utc::now()));
    if !args.yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Leave {} channel(s)?", targets.len()))
            .default(false)
            .interact()
            .context("confirmation prompt failed; pass --yes for non-interactive runs")?;
        if !confirmed {
            println!("aborted, nothing left");
            return Ok(());
        }
    }

    let executor = ActionExecutor::new(client, limiter, DEFAULT_LEAVE_PACING, verbose);
    match executor.leave_all(&targets).await {
        Ok(results) => {
            print!("{}", render::render_results(&results));
            println!("left {} channel(s)", results.len());
            Ok(())
        }
        Err(error) => {
            print!("{}", render::render_results(&error.results));
            let left = error
                .results
                .iter()
                .filter(|result| matches!(result.outcome, ActionOutcome::Left))
                .count();
            eprintln!("stopped after {left} of {} channel(s)", targets.len());
            Err(error.into())
        }
    }
}

fn run_skiplist(globals: &Globals, command: SkiplistCommands) -> Result<()> {
    match command {
        SkiplistCommands::List => {
            let skiplist = SkipList::load(&globals.state_dir)?;
            if skiplist.is_empty() {
                println!("skip list is empty");
            } else {
                for name in skiplist.names() {
                    println!("{name}");
                }
            }
        }
        SkiplistCommands::Add { name } => {
            let name = normalize_channel_name(&name)?;
            let mut skiplist = SkipList::load(&globals.state_dir)?;
            if skiplist.add(&name) {
                skiplist.save(&globals.state_dir)?;
                println!("protected #{name} ({} total)", skiplist.len());
            } else {
                println!("#{name} is already protected");
            }
        }
        SkiplistCommands::Remove { name } => {
            let name = normalize_channel_name(&name)?;
            let mut skiplist = SkipList::load(&globals.state_dir)?;
            if skiplist.remove(&name) {
                skiplist.save(&globals.state_dir)?;
                println!("unprotected #{name}");
            } else {
                println!("#{name} was not protected");
            }
        }
    }
    Ok(())
}

fn run_config(globals: &Globals, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = AppConfig::load(&globals.state_dir)?;
            println!("days     {}", config.days);
            println!("limit    {}", config.limit);
            println!("types    {}", config.types.join(","));
            println!("verbose  {}", config.verbose);
            let keyword = if config.keyword.is_empty() {
                "(none)"
            } else {
                config.keyword.as_str()
            };
            println!("keyword  {keyword}");
        }
        ConfigCommands::Set(args) => {
            if args.is_empty() {
                bail!(
                    "nothing to set; pass at least one of --days, --limit, --types, \
                     --keyword, --verbose"
                );
            }
            let mut config = AppConfig::load(&globals.state_dir)?;
            if let Some(days) = args.days {
                config.days = days;
            }
            if let Some(limit) = args.limit {
                config.limit = limit;
            }
            if let Some(types) = args.types {
                config.types = types
                    .iter()
                    .map(|name| name.trim().to_ascii_lowercase())
                    .filter(|name| !name.is_empty())
                    .collect();
            }
            if let Some(keyword) = &args.keyword {
                config.set_keyword(keyword);
            }
            if let Some(verbose) = args.verbose {
                config.verbose = verbose;
            }
            config.save(&globals.state_dir)?;
            println!("config saved to {}", config_path(&globals.state_dir).display());
        }
    }
    Ok(())
}

fn build_client(globals: &Globals) -> Result<WorkspaceClient> {
    let Some(token) = globals
        .token
        .as_deref()
        .filter(|token| !token.trim().is_empty())
    else {
        bail!("no workspace token; set WORKSPACE_API_TOKEN (or pass --token)");
    };
    WorkspaceClient::new(&globals.api_base, token, REQUEST_TIMEOUT_MS)
        .context("failed to build workspace client")
}

fn build_engine(
    client: Arc<WorkspaceClient>,
    limiter: Arc<RateLimiter>,
    config: &AppConfig,
    skiplist: &SkipList,
) -> DiscoveryEngine {
    let criteria = FilterCriteria {
        stale_cutoff: lookback_cutoff(config.days),
        keyword: config.keyword.clone(),
        skip_set: skiplist.clone().into_set(),
        type_mask: config.type_mask(),
    };
    let tuning = DiscoveryTuning {
        page_limit: config.limit,
        ..DiscoveryTuning::default()
    };
    DiscoveryEngine::new(client, limiter, criteria, tuning)
}

fn apply_discover_overrides(config: &mut AppConfig, args: &DiscoverArgs) {
    if let Some(days) = args.days {
        config.days = days;
    }
    if let Some(limit) = args.limit {
        config.limit = limit;
    }
    if let Some(types) = &args.types {
        config.types = types.clone();
    }
    if let Some(keyword) = &args.keyword {
        config.set_keyword(keyword);
    }
}

/// Picks the channels to leave out of the discovery report. With no names
/// the whole report is taken (`--all`); otherwise each requested name must
/// be present in the report, in which case targets keep the requested order.
fn select_targets(stale: Vec<ChannelInfo>, requested: &[String]) -> Result<Vec<ChannelInfo>> {
    if requested.is_empty() {
        return Ok(stale);
    }
    let mut wanted: Vec<String> = Vec::new();
    for raw in requested {
        let name = raw.trim().trim_start_matches('#').to_string();
        if !name.is_empty() && !wanted.contains(&name) {
            wanted.push(name);
        }
    }
    let mut targets = Vec::new();
    let mut missing = Vec::new();
    for name in &wanted {
        match stale.iter().find(|channel| &channel.name == name) {
            Some(channel) => targets.push(channel.clone()),
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        bail!(
            "not in the stale report (still active, protected, or unknown): {}",
            missing.join(", ")
        );
    }
    Ok(targets)
}

fn normalize_channel_name(raw: &str) -> Result<String> {
    let name = raw.trim().trim_start_matches('#').to_string();
    if name.is_empty() {
        bail!("channel name must not be empty");
    }
    Ok(name)
}

fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !forward_interrupt(&cancel_tx) {
                // Nothing is listening once discovery returns; exit the way
                // a plain interrupt would (128 + SIGINT).
                std::process::exit(130);
            }
            eprintln!("interrupt received, stopping discovery...");
        }
    });
    cancel_rx
}

/// Forwards one interrupt to the discovery cancel signal. Returns `false`
/// when discovery has dropped its receiver and the signal has nowhere to go.
fn forward_interrupt(cancel_tx: &watch::Sender<bool>) -> bool {
    cancel_tx.send(true).is_ok()
}
