use anyhow::{Context, Result};
use psychodrama::cli::commands::{
    ResultsCommand, RunCommand, RunnerArgs, ServeCommand, SimulateCommand, ValidateCommand,
};
use psychodrama::cli::output::*;
use psychodrama::cli::{Cli, Command};
use psychodrama::core::{BranchFilter, PushEvent, RunConfig, RunStatus};
use psychodrama::execution::{
    CondaProvisioner, ControllerActions, GitWorkingCopies, PipelineEngine, Provisioner, Runner,
    SkipProvisioning, SourceProvider, StaticSource,
};
use psychodrama::persistence::{InMemoryOutcomeStore, OutcomeStore, Reporter, SqliteOutcomeStore};
use psychodrama::{server, simulator};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run(cmd).await?,
        Command::Serve(cmd) => serve(cmd).await?,
        Command::Simulate(cmd) => simulate(cmd).await?,
        Command::Results(cmd) => show_results(cmd).await?,
        Command::Validate(cmd) => validate(cmd)?,
    }

    Ok(())
}

async fn open_store(db: Option<&PathBuf>) -> Result<SqliteOutcomeStore> {
    match db {
        Some(path) => SqliteOutcomeStore::new(path).await,
        None => SqliteOutcomeStore::with_default_path().await,
    }
}

async fn build_runner(args: &RunnerArgs) -> Result<Arc<Runner<ControllerActions>>> {
    let filter = BranchFilter::new(args.branch.as_slice()).context("Invalid branch pattern")?;

    let store: Arc<dyn OutcomeStore> = if args.no_history {
        Arc::new(InMemoryOutcomeStore::new())
    } else {
        Arc::new(open_store(args.db.as_ref()).await?)
    };

    let source: Arc<dyn SourceProvider> = match &args.working_copy {
        Some(path) => Arc::new(StaticSource::new(path)),
        None => Arc::new(GitWorkingCopies::new(&args.workspace)),
    };
    let provisioner: Arc<dyn Provisioner> = if args.skip_provision {
        Arc::new(SkipProvisioning)
    } else {
        Arc::new(CondaProvisioner::new(&args.conda))
    };

    let mut engine = PipelineEngine::new(ControllerActions::new());
    engine.add_event_handler(|event| println!("{}", format_execution_event(&event)));

    Ok(Arc::new(
        Runner::new(engine, source, provisioner, Reporter::new(store)).with_branch_filter(filter),
    ))
}

async fn run(cmd: &RunCommand) -> Result<()> {
    let payload = std::fs::read_to_string(&cmd.payload)
        .with_context(|| format!("Failed to read payload {}", cmd.payload.display()))?;
    let event = PushEvent::from_json(&payload).context("Failed to parse push event")?;

    let runner = build_runner(&cmd.runner).await?;

    println!(
        "{}Push to {} ({})",
        INFO,
        style(&event.repository.name).bold(),
        style(&event.git_ref).dim()
    );

    let Some(handle) = runner.trigger(event) else {
        println!("{}Branch does not match the trigger filter; nothing to do", WARN);
        return Ok(());
    };
    let result = handle.await.context("Run task panicked")?;

    if let Some(outcome) = &result.outcome {
        println!("\n{}", format_outcome(outcome));
    } else {
        println!("\n{}{} {}", WARN, format_status(result.status), result.message);
    }

    if result.status == RunStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn serve(cmd: &ServeCommand) -> Result<()> {
    // One runner for the whole process, so same-branch runs are serialized
    let runner = build_runner(&cmd.runner).await?;
    let addr = SocketAddr::new(cmd.host, cmd.port);

    println!(
        "{}Receiving push webhooks on http://{}{}",
        INFO,
        addr,
        server::PAYLOAD_PATH
    );

    tokio::select! {
        result = server::serve(runner, addr) => {
            result.context("Webhook receiver failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down webhook receiver");
        }
    }

    Ok(())
}

async fn simulate(cmd: &SimulateCommand) -> Result<()> {
    info!(
        valve_port = cmd.valve_port,
        spectrometer_port = cmd.spectrometer_port,
        "starting simulators on {}", cmd.host
    );

    tokio::select! {
        result = simulator::serve_all(cmd.host.octets(), cmd.valve_port, cmd.spectrometer_port) => {
            result.context("Simulator server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down simulators");
        }
    }

    Ok(())
}

async fn show_results(cmd: &ResultsCommand) -> Result<()> {
    let store = open_store(cmd.db.as_ref()).await?;
    let outcomes = store.list(cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "outcomes": outcomes });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if outcomes.is_empty() {
        println!("{}No runs recorded", INFO);
        return Ok(());
    }

    println!("{}Run results (latest {}):", INFO, outcomes.len());
    for outcome in &outcomes {
        println!("  {}", format_outcome(outcome));
    }

    Ok(())
}

fn validate(cmd: &ValidateCommand) -> Result<()> {
    println!("{}Validating {}...", INFO, cmd.file.display());

    let result = RunConfig::from_file(&cmd.file).and_then(|config| {
        config.endpoint()?;
        Ok(config)
    });

    match result {
        Ok(config) => {
            println!("{}Descriptor is valid!", CHECK);
            for line in format_config_summary(&config) {
                println!("  {}", line);
            }

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{}Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}
