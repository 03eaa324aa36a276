//! In-process simulated device
//!
//! Records every accepted command and tracks the strength each channel would
//! be at. Link state and failures can be toggled to exercise the bridge's
//! error paths without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::DeviceDriver;
use crate::DEVICE_STRENGTH_LIMIT;
use crate::channel::{Channel, ChannelTarget};
use crate::error::{DriverError, Result};
use crate::waveform::Waveform;

/// A command the simulated device accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    Strength {
        channel: Channel,
        strength: u32,
    },
    Waveform {
        name: String,
        duration_secs: u32,
        target: ChannelTarget,
        frames: Vec<String>,
    },
}

/// Simulated device used for dry runs and tests
pub struct SimulatedDevice {
    connected: AtomicBool,
    linked: AtomicBool,
    failing: AtomicBool,
    strength_attempts: AtomicUsize,
    strengths: Mutex<[u32; 2]>,
    waveforms: Mutex<[Option<String>; 2]>,
    commands: Mutex<Vec<DeviceCommand>>,
}

impl SimulatedDevice {
    /// Create a disconnected, unlinked device
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            linked: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            strength_attempts: AtomicUsize::new(0),
            strengths: Mutex::new([0; 2]),
            waveforms: Mutex::new([None, None]),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Create a device that is already connected and linked
    pub fn linked() -> Self {
        let device = Self::new();
        device.connected.store(true, Ordering::SeqCst);
        device.linked.store(true, Ordering::SeqCst);
        device
    }

    /// Simulate the companion app linking or dropping
    pub fn set_linked(&self, linked: bool) {
        self.linked.store(linked, Ordering::SeqCst);
    }

    /// Make every subsequent command fail with a transport error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Accepted commands in arrival order
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.lock().clone()
    }

    /// Accepted strength values for one channel in arrival order
    pub fn strength_history(&self, channel: Channel) -> Vec<u32> {
        self.commands
            .lock()
            .iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::Strength {
                    channel: c,
                    strength,
                } if *c == channel => Some(*strength),
                _ => None,
            })
            .collect()
    }

    /// Number of `set_strength` calls, including failed ones
    pub fn strength_attempts(&self) -> usize {
        self.strength_attempts.load(Ordering::SeqCst)
    }

    /// Current strength of a channel
    pub fn current_strength(&self, channel: Channel) -> u32 {
        self.strengths.lock()[channel.index()]
    }

    /// Name of the last waveform played on a channel
    pub fn active_waveform(&self, channel: Channel) -> Option<String> {
        self.waveforms.lock()[channel.index()].clone()
    }

    /// Forget all recorded commands and attempts
    pub fn clear(&self) {
        self.commands.lock().clear();
        self.strength_attempts.store(0, Ordering::SeqCst);
    }

    fn check_ready(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DriverError::Transport("simulated failure".to_string()));
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DriverError::NotConnected);
        }
        if !self.linked.load(Ordering::SeqCst) {
            return Err(DriverError::NotLinked);
        }
        Ok(())
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceDriver for SimulatedDevice {
    async fn connect_and_wait(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Simulated device connected");
        Ok(())
    }

    async fn wait_for_app_link(&self) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(DriverError::NotConnected);
        }
        self.linked.store(true, Ordering::SeqCst);
        info!("Simulated device linked");
        Ok(())
    }

    fn is_linked(&self) -> bool {
        self.linked.load(Ordering::SeqCst)
    }

    async fn set_strength(&self, channel: Channel, strength: u32) -> Result<()> {
        self.strength_attempts.fetch_add(1, Ordering::SeqCst);
        self.check_ready()?;
        if strength > DEVICE_STRENGTH_LIMIT {
            return Err(DriverError::StrengthOutOfRange {
                strength,
                limit: DEVICE_STRENGTH_LIMIT,
            });
        }

        self.strengths.lock()[channel.index()] = strength;
        self.commands
            .lock()
            .push(DeviceCommand::Strength { channel, strength });
        debug!(channel = %channel, strength, "Simulated strength applied");
        Ok(())
    }

    async fn send_waveform(
        &self,
        waveform: &Waveform,
        duration_secs: u32,
        target: ChannelTarget,
    ) -> Result<()> {
        self.check_ready()?;
        if waveform.frames.is_empty() {
            return Err(DriverError::Rejected(format!(
                "waveform {} has no frames",
                waveform.name
            )));
        }

        {
            let mut waveforms = self.waveforms.lock();
            for channel in target.channels() {
                waveforms[channel.index()] = Some(waveform.name.clone());
            }
        }
        self.commands.lock().push(DeviceCommand::Waveform {
            name: waveform.name.clone(),
            duration_secs,
            target,
            frames: waveform.hex_frames(),
        });
        debug!(
            waveform = %waveform.name,
            duration_secs,
            target = %target,
            period_ms = waveform.period_ms(),
            "Simulated waveform played"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_link_workflow() {
        let device = SimulatedDevice::new();
        assert!(!device.is_linked());
        assert_eq!(
            device.wait_for_app_link().await,
            Err(DriverError::NotConnected)
        );

        device.connect_and_wait().await.unwrap();
        device.wait_for_app_link().await.unwrap();
        assert!(device.is_linked());
    }

    #[tokio::test]
    async fn test_strength_recorded() {
        let device = SimulatedDevice::linked();
        device.set_strength(Channel::A, 5).await.unwrap();
        device.set_strength(Channel::B, 7).await.unwrap();
        device.set_strength(Channel::A, 0).await.unwrap();

        assert_eq!(device.strength_history(Channel::A), vec![5, 0]);
        assert_eq!(device.strength_history(Channel::B), vec![7]);
        assert_eq!(device.current_strength(Channel::A), 0);
        assert_eq!(device.current_strength(Channel::B), 7);
        assert_eq!(device.strength_attempts(), 3);
    }

    #[tokio::test]
    async fn test_failures_counted_but_not_recorded() {
        let device = SimulatedDevice::linked();
        device.set_failing(true);
        assert!(matches!(
            device.set_strength(Channel::A, 3).await,
            Err(DriverError::Transport(_))
        ));

        device.set_failing(false);
        device.set_linked(false);
        assert_eq!(
            device.set_strength(Channel::A, 3).await,
            Err(DriverError::NotLinked)
        );

        assert_eq!(device.strength_attempts(), 2);
        assert!(device.commands().is_empty());
    }

    #[tokio::test]
    async fn test_strength_limit() {
        let device = SimulatedDevice::linked();
        let result = device.set_strength(Channel::B, DEVICE_STRENGTH_LIMIT + 1).await;
        assert!(matches!(
            result,
            Err(DriverError::StrengthOutOfRange { .. })
        ));
        device.set_strength(Channel::B, DEVICE_STRENGTH_LIMIT).await.unwrap();
    }

    #[tokio::test]
    async fn test_waveform_recorded() {
        let device = SimulatedDevice::linked();
        device
            .send_waveform(&Waveform::breath(), 10, ChannelTarget::Both)
            .await
            .unwrap();
        assert_eq!(
            device.commands(),
            vec![DeviceCommand::Waveform {
                name: "breath".to_string(),
                duration_secs: 10,
                target: ChannelTarget::Both,
                frames: Waveform::breath().hex_frames(),
            }]
        );
        assert_eq!(device.active_waveform(Channel::A).as_deref(), Some("breath"));
        assert_eq!(device.active_waveform(Channel::B).as_deref(), Some("breath"));

        device.clear();
        assert!(device.commands().is_empty());
    }

    #[tokio::test]
    async fn test_waveform_single_channel() {
        let device = SimulatedDevice::linked();
        device
            .send_waveform(&Waveform::breath(), 5, ChannelTarget::B)
            .await
            .unwrap();

        assert_eq!(device.active_waveform(Channel::A), None);
        assert_eq!(device.active_waveform(Channel::B).as_deref(), Some("breath"));
        match &device.commands()[0] {
            DeviceCommand::Waveform { frames, .. } => {
                assert_eq!(frames.len(), Waveform::breath().frames.len());
                assert!(frames.iter().all(|frame| frame.len() == 16));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_waveform_rejected() {
        let device = SimulatedDevice::linked();
        let result = device
            .send_waveform(&Waveform::new("silence", Vec::new()), 5, ChannelTarget::Both)
            .await;
        assert!(matches!(result, Err(DriverError::Rejected(_))));
        assert!(device.commands().is_empty());
        assert_eq!(device.active_waveform(Channel::A), None);
    }
}
