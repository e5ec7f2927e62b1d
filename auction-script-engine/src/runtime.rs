//! Cooperative microtask draining with a wall-clock deadline: JS async
//! evaluation is cooperative microtask draining bounded by a wall-clock
//! deadline. Grounded directly on `jstz_core::Runtime`'s
//! `JobQueue`/`poll_promise` pair.

use std::{
    cell::RefCell,
    collections::VecDeque,
    time::{Duration, Instant},
};

use boa_engine::{Context, JsError, JsValue, job::NativeJob};

use auction_core::AuctionError;

/// A FIFO microtask queue, enqueued by `boa_engine` whenever a promise
/// callback (`.then`/`.catch`/async function continuation) is scheduled.
/// `run_jobs` drains whatever is currently queued once; callers loop it
/// themselves so they can check a deadline between drains.
#[derive(Default)]
pub(crate) struct JobQueue(RefCell<VecDeque<NativeJob>>);

impl boa_engine::job::JobQueue for JobQueue {
    fn enqueue_promise_job(&self, job: NativeJob, _context: &mut Context) {
        self.0.borrow_mut().push_back(job);
    }

    fn run_jobs(&self, context: &mut Context) {
        while let Some(job) = self.0.borrow_mut().pop_front() {
            // A job that schedules further jobs is fine; they're pushed to
            // the back of the same queue and drained on the next pass.
            let _ = job.call(context);
        }
    }
}

/// Drain the microtask queue until `value` (if it is a Promise) settles, or
/// `async_wait` elapses (`kAsyncWait`, default 50ms).
///
/// If `value` is not a Promise, it is returned unchanged. Most bidding and
/// scoring functions are synchronous, and this is a no-op for them.
pub(crate) fn drain_promise(
    context: &mut Context,
    value: JsValue,
    async_wait: Duration,
) -> Result<JsValue, AuctionError> {
    let Some(promise) = value.as_promise().cloned() else {
        return Ok(value);
    };

    let deadline = Instant::now() + async_wait;
    loop {
        match promise.state().map_err(js_error_to_invalid_argument)? {
            boa_engine::builtins::promise::PromiseState::Fulfilled(result) => return Ok(result),
            boa_engine::builtins::promise::PromiseState::Rejected(reason) => {
                let message = reason.display().to_string();
                return Err(AuctionError::invalid_argument(format!(
                    "promise rejected: {message}"
                )));
            }
            boa_engine::builtins::promise::PromiseState::Pending => {
                if Instant::now() >= deadline {
                    return Err(AuctionError::invalid_argument(
                        "invocation timed out waiting for a promise to settle",
                    ));
                }
                context.run_jobs();
            }
        }
    }
}

fn js_error_to_invalid_argument(err: JsError) -> AuctionError {
    AuctionError::invalid_argument(format!("{err}"))
}
