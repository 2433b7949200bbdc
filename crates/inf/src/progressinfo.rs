//! Progress reporting for long running computations.
//!
//! Computations call [`AsyncProgressNotification::tick`] from any thread, the callback decides whether the computation continues.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputationStatus {
    Continue,
    Abort,
}

pub trait AsyncProgressNotification: Send + Sync {
    /// Starts a new computation consisting of `ticks` steps
    fn reset(&self, ticks: u64);

    /// Marks one step as done, fails with `Error::Cancelled` when the observer aborts
    fn tick(&self) -> Result;

    fn done(&self) -> Result;
}

/// Progress notification that ignores all updates
#[derive(Default, Clone, Copy)]
pub struct DummyProgress;

impl AsyncProgressNotification for DummyProgress {
    fn reset(&self, _ticks: u64) {}

    fn tick(&self) -> Result {
        Ok(())
    }

    fn done(&self) -> Result {
        Ok(())
    }
}

/// Reports the progress as a fraction in the range [0.0, 1.0] to a callback
pub struct CallbackProgress<F>
where
    F: Fn(f64) -> ComputationStatus + Send + Sync,
{
    cb: F,
    total: AtomicU64,
    current: AtomicU64,
}

impl<F> CallbackProgress<F>
where
    F: Fn(f64) -> ComputationStatus + Send + Sync,
{
    pub fn with_cb(cb: F) -> Self {
        CallbackProgress {
            cb,
            total: AtomicU64::new(0),
            current: AtomicU64::new(0),
        }
    }

    fn notify(&self, progress: f64) -> Result {
        match (self.cb)(progress.clamp(0.0, 1.0)) {
            ComputationStatus::Continue => Ok(()),
            ComputationStatus::Abort => Err(Error::Cancelled),
        }
    }
}

impl<F> AsyncProgressNotification for CallbackProgress<F>
where
    F: Fn(f64) -> ComputationStatus + Send + Sync,
{
    fn reset(&self, ticks: u64) {
        self.total.store(ticks, Ordering::SeqCst);
        self.current.store(0, Ordering::SeqCst);
    }

    fn tick(&self) -> Result {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.total.load(Ordering::SeqCst);
        if total == 0 {
            return Ok(());
        }

        self.notify(current as f64 / total as f64)
    }

    fn done(&self) -> Result {
        self.notify(1.0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn callback_receives_fraction() -> Result {
        let seen = Mutex::new(Vec::new());
        let progress = CallbackProgress::with_cb(|pos| {
            seen.lock().expect("poisoned").push(pos);
            ComputationStatus::Continue
        });

        progress.reset(4);
        progress.tick()?;
        progress.tick()?;
        progress.done()?;

        assert_eq!(*seen.lock().expect("poisoned"), vec![0.25, 0.5, 1.0]);
        Ok(())
    }

    #[test]
    fn abort_cancels() {
        let progress = CallbackProgress::with_cb(|_| ComputationStatus::Abort);
        progress.reset(10);
        assert!(matches!(progress.tick(), Err(Error::Cancelled)));
    }

    #[test]
    fn ticks_without_reset_are_ignored() -> Result {
        let progress = CallbackProgress::with_cb(|_| ComputationStatus::Abort);
        progress.tick()
    }
}
