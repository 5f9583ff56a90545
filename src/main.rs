use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use batch_lite::bench::run_benchmark;
use batch_lite::cli::{parse_line, Request, HELP};
use batch_lite::config::{ExecutorConfig, ExecutorKind, SchedulerConfig};
use batch_lite::metrics::MetricsReport;
use batch_lite::node::{Node, StatusRow};
use batch_lite::scheduler::Policy;
use batch_lite::shutdown::{install_shutdown_handler, DrainMode};

#[derive(Parser, Debug)]
#[command(name = "batch-lite")]
#[command(version)]
#[command(about = "A single-node batch job scheduler with FCFS, SJF and priority policies")]
struct Args {
    /// Maximum number of pending jobs; submissions block beyond this
    #[arg(long, default_value = "10")]
    capacity: usize,

    /// Scheduling policy at startup
    #[arg(long, value_enum, default_value = "fcfs")]
    policy: Policy,

    /// How jobs are executed
    #[arg(long, value_enum, default_value = "process")]
    executor: ExecutorKind,

    /// Shell used to run job commands
    #[arg(long, default_value = "sh")]
    shell: String,

    /// Working directory for job processes
    #[arg(long)]
    workdir: Option<PathBuf>,

    /// Milliseconds per burst second for the sleep executor
    #[arg(long, default_value = "1000")]
    sleep_unit_ms: u64,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

enum Flow {
    Continue,
    Quit,
}

// =============================================================================
// Output
// =============================================================================

fn print_report(report: &MetricsReport, output: &OutputFormat) -> batch_lite::error::Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => print!("{}", report),
    }
    Ok(())
}

fn print_status(
    rows: &[StatusRow],
    policy: Policy,
    pending: usize,
    output: &OutputFormat,
) -> batch_lite::error::Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Table => {
            println!("Total number of jobs in the queue: {}", pending);
            println!("Scheduling Policy: {}.", policy);
            if rows.is_empty() {
                println!("No jobs found.");
                return Ok(());
            }
            println!(
                "{:<20} {:>8} {:>4}  {:<19}  STATE",
                "NAME", "CPU_TIME", "PRI", "ARRIVAL"
            );
            println!("{}", "-".repeat(66));
            for row in rows {
                let name = if row.name.chars().count() > 20 {
                    format!("{}...", row.name.chars().take(17).collect::<String>())
                } else {
                    row.name.clone()
                };
                println!(
                    "{:<20} {:>8} {:>4}  {:<19}  {}",
                    name,
                    row.burst,
                    row.priority,
                    row.arrival.format("%Y-%m-%d %H:%M:%S"),
                    row.state
                );
            }
        }
    }
    Ok(())
}

fn prompt() {
    print!("> [? for menu]: ");
    let _ = std::io::stdout().flush();
}

// =============================================================================
// Request handling
// =============================================================================

async fn handle_request(
    node: &Node,
    request: Request,
    output: &OutputFormat,
) -> Result<Flow, Box<dyn std::error::Error>> {
    match request {
        Request::Run {
            name,
            burst,
            priority,
        } => match node.submit_job(&name, burst, priority).await {
            Ok(admission) => {
                println!("Job {} was submitted.", name);
                println!("Total number of jobs in the queue: {}", admission.queue_depth);
                println!(
                    "Expected waiting time: {} seconds",
                    admission.estimated_wait.as_secs()
                );
                println!("Scheduling Policy: {}.", admission.policy);
            }
            Err(e) => eprintln!("Error: {}", e),
        },
        Request::List => {
            let rows = node.list_status().await;
            let pending = node.queue.len().await;
            print_status(&rows, node.policy().await, pending, output)?;
        }
        Request::ChangePolicy(policy) => {
            node.change_policy(policy).await;
            println!(
                "Scheduling policy is switched to {}. All the {} waiting jobs have been rescheduled.",
                policy,
                node.queue.len().await
            );
        }
        Request::Report => print_report(&node.report().await, output)?,
        Request::Test(spec) => {
            println!(
                "Running benchmark {} with {} jobs under {}...",
                spec.name, spec.num_jobs, spec.policy
            );
            match run_benchmark(node, &spec).await {
                Ok(report) => print_report(&report, output)?,
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        Request::Quit(mode) => {
            println!("Draining ({}), please wait...", mode);
            let report = node.drain_and_quit(mode).await;
            print_report(&report, output)?;
            return Ok(Flow::Quit);
        }
        Request::Help => println!("{}", HELP),
    }
    Ok(Flow::Continue)
}

async fn shell(
    node: &Node,
    shutdown: CancellationToken,
    output: &OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt();
        let line = tokio::select! {
            _ = shutdown.cancelled() => None,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            // EOF or signal: finish the running job, then stop
            println!();
            let report = node.drain_and_quit(DrainMode::AfterCurrent).await;
            print_report(&report, output)?;
            return Ok(());
        };

        let request = match parse_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                continue;
            }
        };

        let flow = tokio::select! {
            _ = shutdown.cancelled() => {
                let report = node.drain_and_quit(DrainMode::AfterCurrent).await;
                print_report(&report, output)?;
                Flow::Quit
            }
            flow = handle_request(node, request, output) => flow?,
        };
        if let Flow::Quit = flow {
            return Ok(());
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Default to warn so the interactive shell stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut executor = ExecutorConfig {
        kind: args.executor,
        sleep_unit: Duration::from_millis(args.sleep_unit_ms),
        ..ExecutorConfig::default()
    }
    .with_shell(args.shell);
    if let Some(dir) = args.workdir {
        executor = executor.with_working_dir(dir);
    }
    let config = SchedulerConfig::new(args.capacity, args.policy).with_executor(executor);

    let shutdown = install_shutdown_handler()?;
    let node = Node::start(config);

    println!("Welcome to batch-lite. Type 'help' for the menu.");
    shell(&node, shutdown, &args.output).await
}
