use std::{env, process, thread};

use serde_json::json;
use sqlkv::{
    ConnectionProvider, ExecutorStats, SqlKvError,
    cli::{Command, CommandLineConfig},
    workload::{self, WorkloadReport, WorkloadSpec},
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let cli = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            eprint!("{}", CommandLineConfig::help());
            process::exit(2);
        }
    };
    let config = match cli.client_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };

    if cli.command == Command::Config {
        match serde_json::to_string_pretty(&config) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        }
        return;
    }

    let spec = cli.workload(&config);
    let provider = ConnectionProvider::new(config);
    match run(&provider, &spec, cli.command, cli.threads) {
        Ok((report, stats)) => {
            let summary = json!({
                "command": format!("{:?}", cli.command).to_lowercase(),
                "operations": report.operations,
                "executor": stats,
            });
            println!("{summary:#}");
        }
        Err(err) => {
            eprintln!("command failed: {err}");
            process::exit(1);
        }
    }
}

fn run(
    provider: &ConnectionProvider,
    spec: &WorkloadSpec,
    command: Command,
    threads: usize,
) -> Result<(WorkloadReport, ExecutorStats), SqlKvError> {
    // Every connection to a private in-memory database sees its own empty
    // table, so load and run share a single worker.
    if provider.config().is_in_memory() {
        let client = provider.client()?;
        let mut report = workload::run_load(&client, spec, 0..spec.record_count)?;
        if command == Command::Run {
            report = workload::run_operations(&client, spec, 0)?;
        }
        let stats = client.stats();
        client.close()?;
        return Ok((report, stats));
    }

    let results: Vec<Result<(WorkloadReport, ExecutorStats), SqlKvError>> =
        thread::scope(|scope| {
            let handles: Vec<_> = (0..threads as u64)
                .map(|worker| {
                    scope.spawn(move || -> Result<(WorkloadReport, ExecutorStats), SqlKvError> {
                        let client = provider.client()?;
                        let report = match command {
                            Command::Load => {
                                let range = partition(spec.record_count, threads as u64, worker);
                                workload::run_load(&client, spec, range)?
                            }
                            _ => workload::run_operations(&client, spec, worker)?,
                        };
                        let stats = client.stats();
                        client.close()?;
                        Ok((report, stats))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(SqlKvError::execution("worker panicked")))
                })
                .collect()
        });

    let mut report = WorkloadReport::default();
    let mut stats = ExecutorStats::default();
    for result in results {
        let (worker_report, worker_stats) = result?;
        report.merge(&worker_report);
        stats.merge(&worker_stats);
    }
    Ok((report, stats))
}

fn partition(total: u64, workers: u64, worker: u64) -> std::ops::Range<u64> {
    let per = total / workers;
    let start = worker * per;
    let end = if worker + 1 == workers { total } else { start + per };
    start..end
}
