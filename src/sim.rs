//! Batch and benchmark runners.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::cli::{BenchArgs, RunArgs};
use crate::delivery::Delivery;
use crate::dispatcher::{Dispatcher, TaskOutcome};
use crate::error::{AppError, SubmitError};
use crate::input;
use crate::order::Order;
use crate::request::WorkRequest;
use crate::types::{Amount, COLORS, Capacities};
use crate::warehouse::{WarehouseSnapshot, Warehouses};

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

fn build_dispatcher(
    warehouses: Arc<Warehouses>,
    workers: Option<u16>,
) -> Result<Dispatcher, AppError> {
    Ok(match workers {
        Some(workers) => Dispatcher::with_workers(warehouses, usize::from(workers))?,
        None => Dispatcher::new(warehouses),
    })
}

/// Read requests, run them all, then print manifests in submission order.
///
/// `stdin` is only consulted when `args.input` is unset. Rejected lines are
/// reported on `err` as they arrive; nothing reaches `out` until every task
/// has finished.
pub fn run_batch<R: BufRead>(
    args: &RunArgs,
    stdin: R,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<(), AppError> {
    let capacities = args
        .capacities()
        .ok_or_else(|| AppError::InvalidConfig("three warehouse capacities are required".into()))?;
    let warehouses = Arc::new(Warehouses::new(capacities));
    info!(?capacities, "warehouses ready");
    let mut dispatcher = build_dispatcher(Arc::clone(&warehouses), args.workers)?;

    let mut rejected = 0usize;
    let on_line = |line: &str| match dispatcher.submit_line(line) {
        Ok(_) => {}
        Err(SubmitError::Request(e)) => {
            rejected += 1;
            // Diagnostics are best effort; a closed stderr must not stop the run.
            let _ = writeln!(err, "ERROR: {e}");
        }
        Err(SubmitError::Spawn(e)) => {
            rejected += 1;
            warn!(error = %e, line, "could not schedule task");
            let _ = writeln!(err, "ERROR: failed to schedule task: {e}");
        }
    };
    match &args.input {
        Some(path) => input::feed_file(path, on_line)?,
        None => input::feed_stdin_or_named_file(stdin, on_line)?,
    }
    info!(tasks = dispatcher.submitted(), rejected, "input exhausted");

    let failed = report(dispatcher.finish(), out, err)?;
    if args.summary {
        for warehouse in warehouses.iter() {
            writeln!(out, "{}", warehouse.describe())?;
        }
    }
    out.flush()?;

    if failed > 0 {
        return Err(AppError::TasksFailed(failed));
    }
    Ok(())
}

/// Print each manifest, or the reason its task failed. Returns the failure count.
fn report(
    outcomes: Vec<TaskOutcome>,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<usize, AppError> {
    let mut failed = 0;
    for (id, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(manifest) => writeln!(out, "{manifest}")?,
            Err(e) => {
                failed += 1;
                writeln!(err, "ERROR: task {id}: {e}")?;
            }
        }
    }
    Ok(failed)
}

/// Balanced workload: each delivery is followed by an order taking the same
/// amount of the same color, so every color nets to zero.
pub fn balanced_workload(pairs: usize, max_amount: Amount) -> Vec<WorkRequest> {
    debug_assert!(max_amount > 0, "max_amount must be > 0");
    let mut requests = Vec::with_capacity(pairs * 2);
    for i in 0..pairs {
        let color = COLORS[i % COLORS.len()];
        let amount = (i as Amount % max_amount) + 1;
        let mut amounts = [0; 3];
        amounts[color.index()] = amount;
        requests.push(WorkRequest::Delivery(Delivery::new(amount, color)));
        requests.push(WorkRequest::Order(Order::new(amounts)));
    }
    requests
}

/// Per-color units moved by a workload, as (delivered, ordered).
fn expected_totals(requests: &[WorkRequest]) -> [(Amount, Amount); 3] {
    let mut totals = [(0, 0); 3];
    for request in requests {
        match request {
            WorkRequest::Delivery(delivery) => totals[delivery.color.index()].0 += delivery.amount,
            WorkRequest::Order(order) => {
                for color in COLORS {
                    totals[color.index()].1 += order.amount(color);
                }
            }
        }
    }
    totals
}

/// Describe every way the final state differs from the expected totals.
fn check_final_state(
    snapshots: &[WarehouseSnapshot],
    expected: &[(Amount, Amount); 3],
) -> Vec<String> {
    let mut problems = Vec::new();
    for snap in snapshots {
        let (delivered, ordered) = expected[snap.color.index()];
        if !snap.is_consistent() {
            problems.push(format!("conservation,{snap}"));
        }
        if snap.received != delivered {
            problems.push(format!("received,{},{}!={delivered}", snap.color, snap.received));
        }
        if snap.ordered != ordered {
            problems.push(format!("ordered,{},{}!={ordered}", snap.color, snap.ordered));
        }
        if snap.stock != delivered.saturating_sub(ordered) {
            problems.push(format!("stock,{},{}", snap.color, snap.stock));
        }
    }
    problems
}

/// Run a generated workload and print one CSV row.
pub fn run_bench(
    args: &BenchArgs,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<(), AppError> {
    if args.max_amount == 0 {
        return Err(AppError::InvalidConfig("max_amount must be > 0".into()));
    }
    if args.max_amount > args.capacity {
        return Err(AppError::InvalidConfig(format!(
            "max_amount {} exceeds capacity {}; orders could never complete",
            args.max_amount, args.capacity
        )));
    }

    let requests = balanced_workload(args.tasks, args.max_amount);
    let expected = expected_totals(&requests);
    let warehouses = Arc::new(Warehouses::new(Capacities::uniform(args.capacity)));
    let mut dispatcher = build_dispatcher(Arc::clone(&warehouses), args.workers)?;

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    for request in &requests {
        dispatcher.submit(*request)?;
    }
    let outcomes = dispatcher.finish();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    let problems = check_final_state(&warehouses.snapshots(), &expected);
    let throughput = if elapsed_ms > 0.0 {
        requests.len() as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user, cpu_sys) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => (
            format!("{:.4}", user_end - user_start),
            format!("{:.4}", sys_end - sys_start),
        ),
        _ => ("NA".to_string(), "NA".to_string()),
    };
    let workers = args
        .workers
        .map(|w| w.to_string())
        .unwrap_or_else(|| "per-task".to_string());

    writeln!(
        out,
        "tasks,workers,capacity,elapsed_ms,throughput_tasks_per_s,cpu_user_s,cpu_sys_s,consistent"
    )?;
    writeln!(
        out,
        "{},{},{},{:.2},{:.2},{},{},{}",
        requests.len(),
        workers,
        args.capacity,
        elapsed_ms,
        throughput,
        cpu_user,
        cpu_sys,
        problems.is_empty() && failed == 0
    )?;
    out.flush()?;

    if failed > 0 {
        writeln!(err, "# violation,failed_tasks,{failed}")?;
    }
    if args.validate {
        for problem in &problems {
            writeln!(err, "# violation,{problem}")?;
        }
        if !problems.is_empty() {
            return Err(AppError::Validation(problems.join("; ")));
        }
    }
    if failed > 0 {
        return Err(AppError::TasksFailed(failed));
    }
    Ok(())
}
