//! Background proximity sampling.
//!
//! Spawns a thread that owns the `ProximitySensor`, reads it at a fixed rate
//! and pushes `(left, right)` pairs through a bounded channel. The controller
//! drains whatever has accumulated once per follow period.
//!
//! Each `Sampler` owns exactly one thread, joined when the `Sampler` drops.
use cart_traits::ProximitySensor;
use cart_traits::clock::Clock;
use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub struct Sampler {
    rx: xch::Receiver<(i32, i32)>,
    /// Readings that failed and were skipped.
    errors: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    /// Start sampling at `hz`. `capacity` bounds how many readings may queue
    /// up between drains; once full, the newest readings are dropped.
    pub fn spawn<P, C>(mut sensor: P, hz: u32, capacity: usize, clock: C) -> Self
    where
        P: ProximitySensor + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (tx, rx) = xch::bounded(capacity.max(1));
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let errors = Arc::new(AtomicU64::new(0));
        let errors_clone = errors.clone();
        let period = crate::util::period(hz);

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match sensor.read() {
                    Ok(pair) => match tx.try_send(pair) {
                        Ok(()) | Err(xch::TrySendError::Full(_)) => {}
                        Err(xch::TrySendError::Disconnected(_)) => {
                            tracing::debug!("sampler consumer disconnected, exiting thread");
                            break;
                        }
                    },
                    Err(e) => {
                        errors_clone.fetch_add(1, Ordering::Relaxed);
                        tracing::trace!(error = %e, "proximity read failed, skipping");
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            rx,
            errors,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Everything queued since the last drain, oldest first.
    pub fn drain(&self) -> Vec<(i32, i32)> {
        self.rx.try_iter().collect()
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        // The thread exits between reads, or after the read in progress.
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("sampler thread joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "sampler thread panicked during shutdown");
                }
            }
        }
    }
}
