//! Entry point for proctop. Runs the monitor against the host, or replays a report log.

mod host;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use proctop_core::{persist, top, Config, Controller, OptionsUpdate, OutputTarget};
use tracing::info;
use tracing_subscriber::EnvFilter;

use host::HostProvider;

const DEFAULT_FILTER: &str = "proctop=info,proctop_core=info";

enum Mode {
    Run { count: Option<u64> },
    Load { path: PathBuf, top: Option<usize> },
}

struct ParsedArgs {
    mode: Mode,
    // key/value option pairs, validated later by OptionsUpdate
    options: Vec<(String, String)>,
}

enum ArgsError {
    Help(String),
    Invalid(String),
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--interval MS|-i MS] [--first-interval MS] [--sort FIELD|-s FIELD] [--human|-H] \
         [--file PATH|-f PATH] [--format text|structured] [--length N|-n N] [--count N] [--debug]\n       \
         {prog} --load PATH [--top N] [--sort FIELD] [--human] [--length N]"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgsError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop".into());
    let mut options: Vec<(String, String)> = Vec::new();
    let mut count: Option<u64> = None;
    let mut load: Option<PathBuf> = None;
    let mut top_n: Option<usize> = None;

    let value = |flag: &str, it: &mut I::IntoIter| {
        it.next()
            .ok_or_else(|| ArgsError::Invalid(format!("{flag} needs a value\n{}", usage(&prog))))
    };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(ArgsError::Help(usage(&prog))),
            "--interval" | "-i" => options.push(("interval".into(), value(&arg, &mut it)?)),
            "--first-interval" => options.push(("first_interval".into(), value(&arg, &mut it)?)),
            "--sort" | "-s" => options.push(("sort".into(), value(&arg, &mut it)?)),
            "--file" | "-f" => options.push(("file".into(), value(&arg, &mut it)?)),
            "--format" => options.push(("format".into(), value(&arg, &mut it)?)),
            "--length" | "-n" => options.push(("length".into(), value(&arg, &mut it)?)),
            "--human" | "-H" => options.push(("human".into(), "true".into())),
            "--debug" => options.push(("debug".into(), "true".into())),
            "--count" => {
                let v = value(&arg, &mut it)?;
                count = Some(
                    v.parse()
                        .map_err(|_| ArgsError::Invalid(format!("invalid --count value {v:?}")))?,
                );
            }
            "--load" => load = Some(PathBuf::from(value(&arg, &mut it)?)),
            "--top" => {
                let v = value(&arg, &mut it)?;
                top_n = Some(
                    v.parse()
                        .map_err(|_| ArgsError::Invalid(format!("invalid --top value {v:?}")))?,
                );
            }
            _ => {
                return Err(ArgsError::Invalid(format!(
                    "Unexpected argument {arg:?}. {}",
                    usage(&prog)
                )))
            }
        }
    }

    let mode = match load {
        Some(path) => Mode::Load { path, top: top_n },
        None if top_n.is_some() => {
            return Err(ArgsError::Invalid(format!("--top only applies with --load\n{}", usage(&prog))))
        }
        None => Mode::Run { count },
    };
    Ok(ParsedArgs { mode, options })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgsError::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(ArgsError::Invalid(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    init_tracing();

    let update = OptionsUpdate::from_pairs(parsed.options.iter().map(|(k, v)| (k, v)))?;
    let config = Config::default().apply(&update)?;

    match parsed.mode {
        Mode::Load { path, top: top_n } => {
            let mut reports =
                persist::replay(&path).with_context(|| format!("loading {}", path.display()))?;
            if let Some(n) = top_n {
                reports = top(&reports, n);
            }
            proctop_core::print(&reports, &OutputTarget::Stdout, &config.render_options())?;
        }
        Mode::Run { count } => run(config, count).await?,
    }
    Ok(())
}

async fn run(config: Config, count: Option<u64>) -> anyhow::Result<()> {
    let controller = Controller::spawn(Arc::new(HostProvider::new()));
    controller.start(Some(config)).await?;

    let mut poll = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("waiting for ctrl-c")?;
                info!("interrupted");
                break;
            }
            _ = poll.tick(), if count.is_some() => {
                let detailed = controller.status_detailed().await?;
                if count.is_some_and(|n| detailed.counters.passes >= n) {
                    break;
                }
            }
        }
    }

    let detailed = controller.status_detailed().await?;
    controller.stop().await?;
    info!(
        passes = detailed.counters.passes,
        skipped = detailed.counters.skipped_ticks,
        write_failures = detailed.counters.write_failures,
        "monitor finished"
    );
    Ok(())
}
