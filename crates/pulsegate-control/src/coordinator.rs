//! Control coordinator
//!
//! Owns the per-channel rate limiter, the global enable gate and the safety
//! reset loop. Inbound intensity updates are translated into strength
//! commands here; the reset loop independently drives idle channels back to
//! zero so stimulation cannot persist once the control stream goes quiet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use pulsegate_common::{Channel, DeviceDriver, DriverError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ControlConfig;
use crate::limiter::ChannelRateLimiter;

/// What happened to a single inbound update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The global gate was closed
    Disabled,
    /// The path is not a channel tag
    UnknownPath,
    /// The value was not a number
    InvalidValue,
    /// Another command for the channel was accepted within the interval
    RateLimited,
    /// The driver accepted the command
    Sent { channel: Channel, strength: u32 },
    /// The command was accepted but the driver call failed
    Failed {
        channel: Channel,
        strength: u32,
        error: DriverError,
    },
}

/// Translate a raw intensity signal into a device strength.
///
/// The raw value is clamped to `[0.0, 1.0]` before scaling, so the result is
/// always within `[0, max_strength]`. Returns `None` for NaN.
pub fn target_strength(max_strength: u32, raw_value: f32) -> Option<u32> {
    if raw_value.is_nan() {
        return None;
    }
    let scaled = (f64::from(max_strength) * f64::from(raw_value.clamp(0.0, 1.0))).floor();
    Some((scaled as u32).min(max_strength))
}

struct ResetLoopHandle {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Command dispatch and safety reset coordinator
pub struct ControlCoordinator {
    driver: Arc<dyn DeviceDriver>,
    config: ControlConfig,
    enabled: AtomicBool,
    limiter: Mutex<ChannelRateLimiter>,
    reset_loop: Mutex<Option<ResetLoopHandle>>,
}

impl ControlCoordinator {
    pub fn new(driver: Arc<dyn DeviceDriver>, config: ControlConfig) -> Self {
        Self {
            driver,
            enabled: AtomicBool::new(config.enabled_on_start),
            limiter: Mutex::new(ChannelRateLimiter::new(config.rate_limit_interval)),
            reset_loop: Mutex::new(None),
            config,
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Open or close the global gate for subsequent updates
    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Control gate toggled");
        }
    }

    /// Last accepted command time for a channel
    pub fn last_send(&self, channel: Channel) -> Option<Instant> {
        self.limiter.lock().last_send(channel)
    }

    /// Handle one intensity update for a channel tag (`"A"` or `"B"`).
    ///
    /// Never fails: unknown paths and rate-limited updates are dropped and
    /// driver errors are logged and reported in the returned outcome.
    pub async fn handle_update(&self, path: &str, raw_value: f32) -> UpdateOutcome {
        if !self.is_enabled() {
            debug!(path, raw_value, "Control disabled, ignoring update");
            return UpdateOutcome::Disabled;
        }

        let Ok(channel) = path.parse::<Channel>() else {
            debug!(path, "Ignoring update for unknown channel path");
            return UpdateOutcome::UnknownPath;
        };

        let Some(strength) = target_strength(self.config.max_strength, raw_value) else {
            debug!(channel = %channel, "Ignoring non-numeric intensity value");
            return UpdateOutcome::InvalidValue;
        };

        // Lock is released before the driver call; it is never held across an await
        let accepted = self.limiter.lock().try_accept(channel, Instant::now());
        if !accepted {
            debug!(channel = %channel, "Skipping command due to rate limit");
            return UpdateOutcome::RateLimited;
        }

        info!(channel = %channel, raw_value, strength, "Setting channel strength");
        match self.driver.set_strength(channel, strength).await {
            Ok(()) => UpdateOutcome::Sent { channel, strength },
            Err(e) => {
                error!(
                    channel = %channel,
                    strength,
                    raw_value,
                    error = %e,
                    "Failed to set channel strength"
                );
                UpdateOutcome::Failed {
                    channel,
                    strength,
                    error: e,
                }
            }
        }
    }

    /// Start the safety reset loop.
    ///
    /// Returns `false` if the loop was already running or the configured
    /// interval is zero.
    pub fn start_reset_loop(self: &Arc<Self>) -> bool {
        if self.config.reset_interval.is_zero() {
            warn!("Reset interval is zero, not starting reset loop");
            return false;
        }

        let mut slot = self.reset_loop.lock();
        if let Some(running) = slot.as_ref()
            && !running.handle.is_finished()
        {
            debug!("Reset loop already running");
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(Self::run_reset_loop(
            Arc::downgrade(self),
            self.config.reset_interval,
            stop_rx,
        ));
        *slot = Some(ResetLoopHandle { stop_tx, handle });

        info!(
            interval_ms = self.config.reset_interval.as_millis() as u64,
            "Reset loop started"
        );
        true
    }

    /// Stop the safety reset loop.
    ///
    /// A tick already issuing driver calls finishes them; only the wait for
    /// the next tick is cancelled. Returns `false` if the loop was not running.
    pub fn stop_reset_loop(&self) -> bool {
        let Some(running) = self.reset_loop.lock().take() else {
            return false;
        };
        let _ = running.stop_tx.send(true);
        info!("Reset loop stopped");
        true
    }

    pub fn is_reset_loop_running(&self) -> bool {
        self.reset_loop
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    async fn run_reset_loop(
        coordinator: Weak<Self>,
        period: Duration,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(coordinator) = coordinator.upgrade() else {
                break;
            };
            coordinator.reset_idle_channels().await;
        }

        debug!("Reset loop exited");
    }

    /// Run one reset tick: zero every channel that has gone idle.
    ///
    /// Skipped entirely while the device is unlinked. Zero commands bypass the
    /// rate limiter and leave the last-send bookkeeping untouched. Idleness is
    /// checked per channel right before its zero is issued, so a command
    /// accepted while an earlier channel's zero was in flight is not undone.
    /// Returns the number of channels successfully zeroed.
    pub async fn reset_idle_channels(&self) -> usize {
        if !self.driver.is_linked() {
            debug!("Device not linked, skipping reset tick");
            return 0;
        }

        let mut zeroed = 0;
        for channel in Channel::ALL {
            if !self.limiter.lock().is_idle(channel, Instant::now()) {
                continue;
            }
            match self.driver.set_strength(channel, 0).await {
                Ok(()) => {
                    zeroed += 1;
                    debug!(channel = %channel, "Reset idle channel to zero");
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "Failed to reset channel");
                }
            }
        }
        zeroed
    }

    /// Drive both channels to zero now, regardless of link state or idleness.
    ///
    /// Returns the number of channels successfully zeroed.
    pub async fn force_zero(&self) -> usize {
        let mut zeroed = 0;
        for channel in Channel::ALL {
            match self.driver.set_strength(channel, 0).await {
                Ok(()) => zeroed += 1,
                Err(e) => {
                    error!(channel = %channel, error = %e, "Failed to force channel to zero");
                }
            }
        }
        info!(zeroed, "Forced device channels to zero");
        zeroed
    }
}

impl Drop for ControlCoordinator {
    fn drop(&mut self) {
        if let Some(running) = self.reset_loop.get_mut().take() {
            let _ = running.stop_tx.send(true);
        }
    }
}
