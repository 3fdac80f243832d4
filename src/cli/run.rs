//! taskvault run / watch command implementation

use crate::cli::{SourceArgs, VaultContext};
use crate::cycle::{duration_from_minutes, CycleController, Schedule};
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::lock::VaultLock;
use crate::output::{emit, OutputOptions};
use crate::planner::TemplatePlanner;

pub struct RunOptions {
    pub context: VaultContext,
    pub source: SourceArgs,
    pub events: Option<EventSink>,
    pub output: OutputOptions,
}

pub struct WatchOptions {
    pub run: RunOptions,
    pub interval_mins: Option<u64>,
    pub retry_mins: Option<u64>,
    pub max_cycles: Option<u64>,
}

/// Controller plus the lock that makes it the vault's only writer
struct LockedController {
    controller: CycleController,
    _lock: VaultLock,
}

fn build_controller(options: RunOptions) -> Result<(LockedController, OutputOptions)> {
    let RunOptions {
        context,
        source,
        events,
        output,
    } = options;

    context.require_initialized()?;
    if source.max == Some(0) {
        return Err(Error::InvalidArgument("--max must be >= 1".to_string()));
    }
    let lock = VaultLock::acquire(context.vault.root())?;

    let mail = context.mail_source(&source)?;
    let mut cycle_config = context.config.cycle.clone();
    if let Some(max) = source.max {
        cycle_config.max_results = max;
    }

    let mut controller = CycleController::new(
        context.store,
        context.dashboard,
        mail,
        Box::new(TemplatePlanner),
        &cycle_config,
    );
    if let Some(sink) = events {
        controller = controller.with_events(sink);
    }

    Ok((
        LockedController {
            controller,
            _lock: lock,
        },
        output,
    ))
}

pub fn run_once(options: RunOptions) -> Result<()> {
    let (mut locked, output) = build_controller(options)?;
    let report = locked.controller.run_cycle()?;
    emit(output, "run", &report)
}

pub fn run_watch(options: WatchOptions) -> Result<()> {
    let mut schedule = Schedule::from_config(&options.run.context.config.cycle)?;
    if let Some(mins) = options.interval_mins {
        schedule.interval = minutes("--interval-mins", mins)?;
    }
    if let Some(mins) = options.retry_mins {
        schedule.retry_backoff = minutes("--retry-mins", mins)?;
    }
    if options.max_cycles == Some(0) {
        return Err(Error::InvalidArgument("--max-cycles must be >= 1".to_string()));
    }
    schedule.max_cycles = options.max_cycles;

    let (mut locked, output) = build_controller(options.run)?;

    // The listener task registers the handler before the first cycle runs,
    // so Ctrl-C mid-cycle is seen at the next sleep instead of killing the
    // process.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;
    let report = runtime.block_on(async {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(());
            }
        });
        let shutdown = async move {
            let _ = rx.await;
        };
        locked.controller.monitor(schedule, shutdown).await
    });

    emit(output, "watch", &report)
}

fn minutes(flag: &str, mins: u64) -> Result<std::time::Duration> {
    if mins == 0 {
        return Err(Error::InvalidArgument(format!("{flag} must be >= 1")));
    }
    duration_from_minutes(mins)
        .ok_or_else(|| Error::InvalidArgument(format!("{flag} is too large: {mins}")))
}
