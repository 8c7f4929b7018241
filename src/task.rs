//! Background jobs whose results the UI thread picks up once per frame.
//!
//! A job runs on a [`Spawner`] and reports through a oneshot channel. The
//! caller keeps the [`Pending`] end and polls it; dropping it discards the
//! result, which is how superseded work is abandoned.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use log::error;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub trait Spawner: Send + Sync {
    fn spawn(&self, name: &str, job: Job);
}

/// One named OS thread per job. When built with an egui context, a repaint
/// is requested after each job so the result is polled promptly.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    repaint: Option<egui::Context>,
}

impl ThreadSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repaint(ctx: egui::Context) -> Self {
        Self { repaint: Some(ctx) }
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(&self, name: &str, job: Job) {
        let repaint = self.repaint.clone();
        let result = std::thread::Builder::new().name(name.to_owned()).spawn(move || {
            job();
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
        if let Err(err) = result {
            // the job is dropped with its sender, so the waiting side sees a lost task
            error!("Failed to spawn {name}: {err}");
        }
    }
}

/// Runs each job to completion on the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSpawner;

impl Spawner for InlineSpawner {
    fn spawn(&self, _name: &str, job: Job) {
        job();
    }
}

/// The job ended without producing a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("background task was lost before it finished")]
pub struct TaskLost;

/// Receiving end of a spawned job
#[derive(Debug)]
pub struct Pending<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Pending<T> {
    /// `Ok(None)` while the job is still running
    pub fn try_take(&mut self) -> Result<Option<T>, TaskLost> {
        self.receiver.try_recv().map_err(|_| TaskLost)
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, TaskLost>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|result| result.map_err(|_| TaskLost))
    }
}

pub fn spawn_task<T, F>(spawner: &dyn Spawner, name: &str, f: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    spawner.spawn(
        name,
        Box::new(move || {
            // the receiver may be gone if the result was superseded
            let _ = sender.send(f());
        }),
    );
    Pending { receiver }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_result_is_ready_immediately() {
        let mut pending = spawn_task(&InlineSpawner, "inline", || 6 * 7);
        assert_eq!(pending.try_take(), Ok(Some(42)));
    }

    #[test]
    fn test_thread_result_can_be_awaited() {
        let pending = spawn_task(&ThreadSpawner::new(), "worker", || "done".to_owned());
        assert_eq!(futures::executor::block_on(pending), Ok("done".to_owned()));
    }

    #[test]
    fn test_dropped_job_reports_lost() {
        struct Dropping;
        impl Spawner for Dropping {
            fn spawn(&self, _name: &str, _job: Job) {}
        }
        let mut pending = spawn_task(&Dropping, "never", || 1);
        assert_eq!(pending.try_take(), Err(TaskLost));
    }
}
