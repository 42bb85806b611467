//! Schedules work requests as concurrent tasks and collects their manifests.
//!
//! By default every request gets its own named thread. With a worker count,
//! requests queue on a [`TaskQueue`] and a fixed set of workers runs them;
//! a worker stuck in a blocked task is unavailable until that task finishes.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::{SubmitError, TaskError, WarehouseError};
use crate::manifest::Manifest;
use crate::request::{WorkRequest, parse_request};
use crate::task_queue::TaskQueue;
use crate::types::COLORS;
use crate::warehouse::Warehouses;

/// Result of one task, reported in submission order.
pub type TaskOutcome = Result<Manifest, TaskError>;

struct Job {
    id: usize,
    request: WorkRequest,
    reply: mpsc::Sender<TaskOutcome>,
}

enum Pending {
    Thread(JoinHandle<TaskOutcome>),
    Queued(mpsc::Receiver<TaskOutcome>),
}

enum Mode {
    PerTask,
    Pool {
        queue: Arc<TaskQueue<Job>>,
        workers: Vec<JoinHandle<()>>,
    },
}

pub struct Dispatcher {
    warehouses: Arc<Warehouses>,
    mode: Mode,
    pending: Vec<Pending>,
}

impl Dispatcher {
    /// One thread per submitted task.
    pub fn new(warehouses: Arc<Warehouses>) -> Self {
        Self {
            warehouses,
            mode: Mode::PerTask,
            pending: Vec::new(),
        }
    }

    /// A fixed pool of `workers` threads fed by an unbounded queue.
    ///
    /// An empty pool is rejected. If a worker cannot be spawned, the ones
    /// already running are shut down before the error is returned.
    pub fn with_workers(warehouses: Arc<Warehouses>, workers: usize) -> io::Result<Self> {
        if workers == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker pool must not be empty",
            ));
        }
        let queue: Arc<TaskQueue<Job>> = Arc::new(TaskQueue::new());
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            match spawn_worker(worker_id, &queue, &warehouses) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(worker = worker_id, error = %e, "could not start worker pool");
                    shutdown_pool(&queue, handles);
                    return Err(e);
                }
            }
        }
        info!(workers, "worker pool started");
        Ok(Self {
            warehouses,
            mode: Mode::Pool {
                queue,
                workers: handles,
            },
            pending: Vec::new(),
        })
    }

    /// Number of tasks scheduled so far.
    pub fn submitted(&self) -> usize {
        self.pending.len()
    }

    /// Parse and schedule one input line. Blank lines are ignored and yield
    /// `Ok(None)`; rejected lines schedule nothing.
    pub fn submit_line(&mut self, line: &str) -> Result<Option<usize>, SubmitError> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        let request = parse_request(line)?;
        Ok(Some(self.submit(request)?))
    }

    /// Schedule a request without waiting for it. Returns its task id.
    pub fn submit(&mut self, request: WorkRequest) -> io::Result<usize> {
        let id = self.pending.len();
        self.warn_if_unsatisfiable(id, &request);
        let pending = match &self.mode {
            Mode::PerTask => {
                let warehouses = Arc::clone(&self.warehouses);
                let handle = thread::Builder::new()
                    .name(format!("{}-{id}", request.kind()))
                    .spawn(move || execute(&request, &warehouses).map_err(TaskError::from))?;
                Pending::Thread(handle)
            }
            Mode::Pool { queue, .. } => {
                let (reply, outcome) = mpsc::channel();
                if queue.push(Job { id, request, reply }).is_err() {
                    return Err(io::Error::other("task queue closed"));
                }
                debug!(task = id, queued = queue.len(), "task queued");
                Pending::Queued(outcome)
            }
        };
        debug!(task = id, kind = request.kind(), "task submitted");
        self.pending.push(pending);
        Ok(id)
    }

    /// Wait for every task and return outcomes in submission order.
    ///
    /// Does not return while any task is still blocked on a warehouse.
    pub fn finish(self) -> Vec<TaskOutcome> {
        let Dispatcher { mode, pending, .. } = self;
        if let Mode::Pool { queue, .. } = &mode {
            queue.close();
        }
        info!(tasks = pending.len(), "waiting for all tasks");

        let outcomes = pending
            .into_iter()
            .enumerate()
            .map(|(id, pending)| match pending {
                Pending::Thread(handle) => handle
                    .join()
                    .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload)))),
                Pending::Queued(outcome) => outcome
                    .recv()
                    .unwrap_or(Err(TaskError::Disconnected(id))),
            })
            .collect();

        if let Mode::Pool { queue, workers } = mode {
            shutdown_pool(&queue, workers);
        }
        outcomes
    }

    fn warn_if_unsatisfiable(&self, id: usize, request: &WorkRequest) {
        match request {
            WorkRequest::Order(order) => {
                for color in COLORS {
                    let capacity = self.warehouses.get(color).capacity();
                    if order.amount(color) > capacity {
                        warn!(
                            task = id,
                            %color,
                            amount = order.amount(color),
                            capacity,
                            "order exceeds warehouse capacity and will never complete"
                        );
                    }
                }
            }
            WorkRequest::Delivery(delivery) => {
                if delivery.amount > 0 && self.warehouses.get(delivery.color).capacity() == 0 {
                    warn!(
                        task = id,
                        color = %delivery.color,
                        "delivery targets a zero-capacity warehouse and will never complete"
                    );
                }
            }
        }
    }
}

fn spawn_worker(
    worker_id: usize,
    queue: &Arc<TaskQueue<Job>>,
    warehouses: &Arc<Warehouses>,
) -> io::Result<JoinHandle<()>> {
    let queue = Arc::clone(queue);
    let warehouses = Arc::clone(warehouses);
    thread::Builder::new()
        .name(format!("worker-{worker_id}"))
        .spawn(move || {
            while let Some(job) = queue.pop_blocking_or_closed() {
                debug!(task = job.id, kind = job.request.kind(), "worker picked up task");
                let outcome = run_guarded(&job.request, &warehouses);
                // The receiver only goes away if the dispatcher was dropped unfinished.
                let _ = job.reply.send(outcome);
            }
        })
}

/// Close the queue and join every worker once it has drained.
fn shutdown_pool(queue: &TaskQueue<Job>, workers: Vec<JoinHandle<()>>) {
    queue.close();
    for worker in workers {
        if worker.join().is_err() {
            warn!("worker thread panicked");
        }
    }
}

fn execute(request: &WorkRequest, warehouses: &Warehouses) -> Result<Manifest, WarehouseError> {
    match request {
        WorkRequest::Delivery(delivery) => delivery.complete(warehouses),
        WorkRequest::Order(order) => order.complete(warehouses),
    }
}

/// Run a task on a pool worker without letting a panic take the worker down.
fn run_guarded(request: &WorkRequest, warehouses: &Warehouses) -> TaskOutcome {
    match panic::catch_unwind(AssertUnwindSafe(|| execute(request, warehouses))) {
        Ok(result) => result.map_err(TaskError::from),
        Err(payload) => Err(TaskError::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::manifest::ManifestKind;
    use crate::types::{Capacities, Color};

    fn kinds(outcomes: &[TaskOutcome]) -> Vec<ManifestKind> {
        outcomes
            .iter()
            .map(|outcome| outcome.as_ref().expect("task failed").kind.clone())
            .collect()
    }

    #[test]
    fn manifests_come_back_in_submission_order() {
        let warehouses = Arc::new(Warehouses::new(Capacities::uniform(10)));
        let mut dispatcher = Dispatcher::new(Arc::clone(&warehouses));
        // The order is submitted first but can only finish after the delivery.
        dispatcher.submit_line("order 4 0 0").expect("valid");
        dispatcher.submit_line("delivery 4 orange").expect("valid");
        assert_eq!(dispatcher.submitted(), 2);

        let outcomes = dispatcher.finish();
        assert_eq!(
            kinds(&outcomes),
            vec![
                ManifestKind::Order { amounts: [4, 0, 0] },
                ManifestKind::Delivery {
                    amount: 4,
                    color: Color::Orange
                },
            ]
        );
        let snap = warehouses.get(Color::Orange).snapshot();
        assert_eq!((snap.stock, snap.received, snap.ordered), (0, 4, 4));
    }

    #[test]
    fn rejected_and_blank_lines_schedule_nothing() {
        let warehouses = Arc::new(Warehouses::new(Capacities::uniform(10)));
        let mut dispatcher = Dispatcher::new(warehouses);
        assert!(matches!(
            dispatcher.submit_line("deliver five orange"),
            Err(SubmitError::Request(RequestError::InvalidAmount { .. }))
        ));
        assert!(matches!(
            dispatcher.submit_line("delivery 1 teal"),
            Err(SubmitError::Request(RequestError::UnknownColor(_)))
        ));
        assert!(matches!(dispatcher.submit_line("   "), Ok(None)));
        assert_eq!(dispatcher.submitted(), 0);
        assert!(dispatcher.finish().is_empty());
    }

    #[test]
    fn capacity_bound_scenario_finishes_with_expected_counters() {
        let warehouses = Arc::new(Warehouses::new(Capacities::new(5, 0, 0)));
        let mut dispatcher = Dispatcher::new(Arc::clone(&warehouses));
        dispatcher.submit_line("delivery 8 orange").expect("valid");
        dispatcher.submit_line("order 3 0 0").expect("valid");
        let outcomes = dispatcher.finish();
        assert!(outcomes.iter().all(Result::is_ok));

        let snap = warehouses.get(Color::Orange).snapshot();
        assert_eq!((snap.stock, snap.received, snap.ordered), (5, 8, 3));
    }

    #[test]
    fn worker_pool_runs_queued_tasks_in_order() {
        let warehouses = Arc::new(Warehouses::new(Capacities::uniform(10)));
        let mut dispatcher =
            Dispatcher::with_workers(Arc::clone(&warehouses), 2).expect("spawn workers");
        for color in COLORS {
            for _ in 0..4 {
                dispatcher
                    .submit_line(&format!("delivery 2 {color}"))
                    .expect("valid");
                dispatcher.submit_line("order 0 0 0").expect("valid");
            }
        }
        // Blocks one worker until every delivery has landed; the other keeps draining the queue.
        dispatcher.submit_line("order 8 8 8").expect("valid");

        let outcomes = dispatcher.finish();
        assert_eq!(outcomes.len(), 25);
        assert!(outcomes.iter().all(Result::is_ok));
        for snap in warehouses.snapshots() {
            assert_eq!((snap.stock, snap.received, snap.ordered), (0, 8, 8));
        }
    }

    #[test]
    fn empty_worker_pool_is_rejected() {
        let warehouses = Arc::new(Warehouses::new(Capacities::uniform(10)));
        let err = Dispatcher::with_workers(warehouses, 0)
            .err()
            .expect("zero workers must be rejected");
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn shutdown_releases_idle_workers() {
        let warehouses = Arc::new(Warehouses::new(Capacities::uniform(10)));
        let queue: Arc<TaskQueue<Job>> = Arc::new(TaskQueue::new());
        let workers: Vec<_> = (0..3)
            .map(|id| spawn_worker(id, &queue, &warehouses).expect("spawn worker"))
            .collect();

        let (done_tx, done_rx) = mpsc::channel();
        thread::spawn(move || {
            shutdown_pool(&queue, workers);
            let _ = done_tx.send(());
        });
        done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("idle workers never exited");
    }

    #[test]
    fn panic_payloads_become_messages() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(7u8)), "unknown panic payload");
    }
}
