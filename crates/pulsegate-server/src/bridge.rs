//! Wiring between the OSC transport and the control coordinator
//!
//! Startup: connect to the device, wait for the companion app, register the
//! OSC handlers, then start the event pump, keep-alive and reset loop.
//! Shutdown runs in reverse: close the listener, drain queued events, stop
//! the periodic tasks and force both channels to zero.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pulsegate_common::DeviceDriver;
use pulsegate_control::{
    ControlConfig, ControlCoordinator, EventPump, EventSender, KeepaliveConfig,
    WaveformKeepalive, event_channel,
};
use pulsegate_osc::value::{first_bool, first_f32};
use pulsegate_osc::{Dispatcher, OscError, OscServer, StatusSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ChannelMap, Configuration, OscConfig};
use crate::error::{BridgeError, ConfigError};
use crate::startup::{ShutdownSignal, run_with_shutdown};

/// Upper bound on draining queued events and status text during shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything the bridge needs, validated up front
#[derive(Debug, Clone)]
pub struct BridgeSettings {
    pub channels: ChannelMap,
    pub control: ControlConfig,
    pub osc: OscConfig,
    pub keepalive: KeepaliveConfig,
}

impl BridgeSettings {
    pub fn from_configuration(configuration: &Configuration) -> Result<Self, ConfigError> {
        Ok(Self {
            channels: configuration.channel_map()?,
            control: configuration.control_config()?,
            osc: configuration.osc_config()?,
            keepalive: configuration.keepalive_config()?,
        })
    }
}

/// Map every configured parameter address and the switch address.
///
/// Handlers only enqueue events; they run on the OSC I/O thread. Returns the
/// number of handlers registered.
pub fn register_handlers(
    dispatcher: &mut Dispatcher,
    channels: &ChannelMap,
    osc: &OscConfig,
    events: &EventSender,
    status: Option<StatusSender>,
) -> Result<usize, OscError> {
    let mut registered = 0;

    for (channel, suffix) in channels.iter() {
        let address = osc.parameter_address(suffix);
        info!(%channel, address = %address, "Registering parameter handler");

        let events = events.clone();
        dispatcher.map(address, move |addr, args| match first_f32(args) {
            Some(value) => {
                events.intensity(channel.as_str(), value);
            }
            None => debug!(address = %addr, ?args, "Ignoring non-numeric parameter value"),
        })?;
        registered += 1;
    }

    let events = events.clone();
    dispatcher.map(osc.switch_address.clone(), move |addr, args| {
        let Some(enabled) = first_bool(args) else {
            debug!(address = %addr, ?args, "Ignoring switch message without a boolean value");
            return;
        };
        events.set_enabled(enabled);
        if let Some(status) = &status {
            let _ = status.send(if enabled {
                "Pulsegate output enabled"
            } else {
                "Pulsegate output disabled"
            });
        }
    })?;
    registered += 1;

    info!(handlers = registered, "OSC handlers registered");
    Ok(registered)
}

/// A running bridge
pub struct Bridge {
    coordinator: Arc<ControlCoordinator>,
    server: OscServer,
    pump: JoinHandle<()>,
    keepalive: Option<WaveformKeepalive>,
    status: Option<(StatusSender, JoinHandle<()>)>,
}

impl Bridge {
    /// Bring the bridge up.
    ///
    /// Device connection and app link waits are abandoned with
    /// [`BridgeError::Interrupted`] if `shutdown` fires first.
    pub async fn start(
        settings: BridgeSettings,
        driver: Arc<dyn DeviceDriver>,
        shutdown: &ShutdownSignal,
    ) -> Result<Self, BridgeError> {
        info!("Connecting to device...");
        run_with_shutdown(driver.connect_and_wait(), shutdown)
            .await
            .ok_or(BridgeError::Interrupted)??;

        info!("Waiting for companion app link...");
        run_with_shutdown(driver.wait_for_app_link(), shutdown)
            .await
            .ok_or(BridgeError::Interrupted)??;
        info!("Device linked");

        let status = if settings.osc.status_messages {
            Some(StatusSender::connect(settings.osc.send_to).await?)
        } else {
            None
        };

        let coordinator = Arc::new(ControlCoordinator::new(driver.clone(), settings.control));
        let (events, receiver) = event_channel();
        let pump = EventPump::new(coordinator.clone(), receiver).spawn();

        let mut dispatcher = Dispatcher::new();
        register_handlers(
            &mut dispatcher,
            &settings.channels,
            &settings.osc,
            &events,
            status.as_ref().map(|(sender, _)| sender.clone()),
        )?;
        // Handlers own the remaining senders, so the pump ends with the server
        drop(events);
        let server = OscServer::bind(settings.osc.listen, Arc::new(dispatcher))?;

        let keepalive = settings.keepalive.enabled.then(|| {
            let keepalive = WaveformKeepalive::new(driver.clone(), settings.keepalive);
            keepalive.start();
            keepalive
        });

        if coordinator.config().reset_enabled {
            coordinator.start_reset_loop();
        } else {
            warn!("Safety reset loop disabled by configuration");
        }

        if let Some((sender, _)) = &status {
            let _ = sender.send(format!(
                "Pulsegate connected, output {}",
                if coordinator.is_enabled() { "enabled" } else { "disabled" }
            ));
        }
        info!(listen = %server.local_addr(), "Bridge started");

        Ok(Self {
            coordinator,
            server,
            pump,
            keepalive,
            status,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn coordinator(&self) -> &Arc<ControlCoordinator> {
        &self.coordinator
    }

    /// Stop everything and leave both channels at zero
    pub async fn shutdown(self) {
        let Self {
            coordinator,
            mut server,
            mut pump,
            keepalive,
            status,
        } = self;

        // Joining the I/O thread drops the dispatcher and with it the senders
        if let Err(e) = tokio::task::spawn_blocking(move || server.close()).await {
            warn!(error = %e, "Failed to close OSC server");
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut pump).await.is_err() {
            warn!("Event pump did not drain in time, aborting");
            pump.abort();
        }

        coordinator.stop_reset_loop();
        if let Some(keepalive) = &keepalive {
            keepalive.stop();
        }

        coordinator.force_zero().await;

        if let Some((sender, task)) = status {
            let _ = sender.send("Pulsegate stopped");
            drop(sender);
            if tokio::time::timeout(DRAIN_TIMEOUT, task).await.is_err() {
                warn!("Status sender did not drain in time");
            }
        }
        info!("Bridge stopped");
    }
}

/// Run the bridge until `shutdown` fires
pub async fn run(
    settings: BridgeSettings,
    driver: Arc<dyn DeviceDriver>,
    shutdown: ShutdownSignal,
) -> Result<(), BridgeError> {
    let bridge = match Bridge::start(settings, driver, &shutdown).await {
        Ok(bridge) => bridge,
        Err(BridgeError::Interrupted) => {
            info!("Shutdown requested before the bridge started");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    shutdown.wait().await;
    bridge.shutdown().await;
    Ok(())
}
