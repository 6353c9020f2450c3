//! Periodic expiry sweep.
//!
//! # Invariants
//! - Sweeps and mutations share one mutex, so a sweep never interleaves
//!   with a save or delete.
//! - Stopping wakes the worker immediately; no sweep starts after `stop()`
//!   returns.

use super::property_map::PropertyMap;
use crate::clock::Clock;
use crate::highlight::surface::MapSurface;
use crate::storage::KvStorage;
use log::{error, info};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Property map shared between the caller and the sweeper thread.
pub type SharedPropertyMap<S, M, C> = Arc<Mutex<PropertyMap<S, M, C>>>;

/// Background thread running `PropertyMap::sweep` on a fixed interval.
pub struct ExpirySweeper {
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    pub fn spawn<S, M, C>(shared: SharedPropertyMap<S, M, C>, interval: Duration) -> Self
    where
        S: KvStorage + Send + 'static,
        M: MapSurface + Send + 'static,
        C: Clock + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let worker = std::thread::spawn(move || {
            info!(
                "event=sweeper_start module=service status=ok interval_ms={}",
                interval.as_millis()
            );
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                match shared.lock() {
                    Ok(mut map) => {
                        map.sweep();
                    }
                    Err(_) => {
                        error!("event=sweeper_tick module=service status=error error=poisoned_lock");
                        break;
                    }
                }
            }
            info!("event=sweeper_stop module=service status=ok");
        });

        Self {
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        }
    }

    /// Stops the worker and waits for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=sweeper_stop module=service status=error error=worker_panicked");
            }
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
