//! Deferred-call facility
//!
//! A deferred emission is handed over as one boxed unit of work. Units are
//! never interleaved: each runs to completion before the next one starts.

use std::cell::RefCell;
use std::collections::VecDeque;

use tracing::debug;

/// One scheduled unit of work
pub type Task = Box<dyn FnOnce()>;

/// Host facility that runs deferred units later, in FIFO order
pub trait Scheduler {
    fn schedule(&self, task: Task);

    /// Run up to `budget` queued units and return how many ran
    ///
    /// Schedulers driven by an external event loop run nothing here.
    fn run_pending(&self, budget: usize) -> usize {
        let _ = budget;
        0
    }

    /// Number of units waiting to run
    fn pending(&self) -> usize {
        0
    }
}

/// FIFO queue drained explicitly through `run_pending`
#[derive(Default)]
pub struct QueueScheduler {
    queue: RefCell<VecDeque<Task>>,
}

impl QueueScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, task: Task) {
        self.queue.borrow_mut().push_back(task);
    }

    fn run_pending(&self, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            // Units may schedule more units; never hold the queue while running one
            let Some(task) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            task();
            ran += 1;
        }
        debug!(ran, left = self.pending(), "QueueScheduler::run_pending: drained");
        ran
    }

    fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Runs each unit as a tokio local task
///
/// Must be used from within a [`tokio::task::LocalSet`]; the local set
/// polls spawned tasks in FIFO order.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTaskScheduler;

impl Scheduler for LocalTaskScheduler {
    fn schedule(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_queue_is_fifo_and_bounded() {
        let scheduler = Rc::new(QueueScheduler::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..5 {
            let order = order.clone();
            scheduler.schedule(Box::new(move || order.borrow_mut().push(n)));
        }
        assert_eq!(scheduler.pending(), 5);

        assert_eq!(scheduler.run_pending(3), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(scheduler.run_pending(10), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_units_scheduled_while_running_run_later() {
        let scheduler = Rc::new(QueueScheduler::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let inner_scheduler = scheduler.clone();
        let inner_order = order.clone();
        scheduler.schedule(Box::new(move || {
            inner_order.borrow_mut().push("outer");
            let order = inner_order.clone();
            inner_scheduler.schedule(Box::new(move || order.borrow_mut().push("inner")));
        }));

        assert_eq!(scheduler.run_pending(1), 1);
        assert_eq!(*order.borrow(), vec!["outer"]);
        assert_eq!(scheduler.run_pending(1), 1);
        assert_eq!(*order.borrow(), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn test_local_task_scheduler_runs_in_order() {
        let local = tokio::task::LocalSet::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        let scheduled = order.clone();
        local
            .run_until(async move {
                for n in 0..3 {
                    let order = scheduled.clone();
                    LocalTaskScheduler.schedule(Box::new(move || order.borrow_mut().push(n)));
                }
            })
            .await;
        local.await;

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}
