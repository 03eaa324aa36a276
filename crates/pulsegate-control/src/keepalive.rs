//! Waveform keep-alive
//!
//! Periodically plays a waveform on both channels so the device keeps an
//! active pattern loaded. Sends are skipped while the device is unlinked and
//! failures are logged without stopping the loop.

use std::sync::Arc;

use parking_lot::Mutex;
use pulsegate_common::{ChannelTarget, DeviceDriver};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::KeepaliveConfig;

pub struct WaveformKeepalive {
    driver: Arc<dyn DeviceDriver>,
    config: KeepaliveConfig,
    task: Mutex<Option<(watch::Sender<bool>, JoinHandle<()>)>>,
}

impl WaveformKeepalive {
    pub fn new(driver: Arc<dyn DeviceDriver>, config: KeepaliveConfig) -> Self {
        Self {
            driver,
            config,
            task: Mutex::new(None),
        }
    }

    /// Start sending; the first waveform goes out immediately.
    ///
    /// Returns `false` if already running or the interval is zero.
    pub fn start(&self) -> bool {
        if self.config.interval.is_zero() {
            warn!("Waveform keep-alive interval is zero, not starting");
            return false;
        }

        let mut slot = self.task.lock();
        if let Some((_, handle)) = slot.as_ref()
            && !handle.is_finished()
        {
            return false;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let driver = self.driver.clone();
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                send_once(driver.as_ref(), &config).await;
            }
            debug!("Waveform keep-alive exited");
        });

        *slot = Some((stop_tx, handle));
        info!(
            waveform = %self.config.waveform.name,
            interval_secs = self.config.interval.as_secs(),
            "Waveform keep-alive started"
        );
        true
    }

    /// Returns `false` if not running
    pub fn stop(&self) -> bool {
        let Some((stop_tx, _handle)) = self.task.lock().take() else {
            return false;
        };
        let _ = stop_tx.send(true);
        info!("Waveform keep-alive stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}

async fn send_once(driver: &dyn DeviceDriver, config: &KeepaliveConfig) {
    if !driver.is_linked() {
        debug!("Device not linked, skipping keep-alive waveform");
        return;
    }
    if let Err(e) = driver
        .send_waveform(&config.waveform, config.duration_secs, ChannelTarget::Both)
        .await
    {
        error!(
            waveform = %config.waveform.name,
            error = %e,
            "Error sending keep-alive waveform"
        );
    }
}
