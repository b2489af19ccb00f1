//! Live event capture
//!
//! [`LiveCapture`] turns the device into a push source: attendance
//! events are registered for, and every incoming REG_EVENT frame is
//! acknowledged and decoded into [`Attendance`] records. A quiet device
//! periodically yields [`LiveEvent::Idle`] so the consumer loop gets a
//! chance to observe cancellation; the cancel flag itself is shareable
//! across tasks through [`CancelHandle`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use bioterm_core::codec::decode_live_events;
use bioterm_core::constants::{EventFlags, LIVE_CAPTURE_TIMEOUT};
use bioterm_core::Command;
use bioterm_types::{Attendance, User};

use crate::device::Device;
use crate::error::Result;

/// One item from the live stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveEvent {
    /// A decoded attendance punch.
    Attendance(Attendance),

    /// Nothing happened for one idle interval. Emitted so consumers can
    /// run periodic work and notice cancellation on a quiet device.
    Idle,
}

/// Clonable flag that stops a running [`LiveCapture`] from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Request the capture to stop. The stream observes the flag on its
    /// next wakeup and shuts down before yielding `None`.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// An active event subscription on a device.
///
/// Holds the device exclusively for its lifetime; the subscription is
/// deregistered when [`LiveCapture::next`] observes cancellation or
/// [`LiveCapture::stop`] is called directly.
pub struct LiveCapture<'a> {
    device: &'a mut Device,
    users: Vec<User>,
    cancelled: Arc<AtomicBool>,
    pending: VecDeque<Attendance>,
    idle_timeout: Duration,
    was_enabled: bool,
    finished: bool,
}

impl Device {
    /// Subscribe to live attendance events.
    ///
    /// Reads the user table first so events can be resolved to both
    /// identifier forms, clears any pending capture, puts the device in
    /// verification mode and registers for attendance events.
    pub async fn live_capture(&mut self) -> Result<LiveCapture<'_>> {
        let users = self.get_users().await?;
        self.cancel_capture().await?;
        self.start_verify().await?;

        let was_enabled = self.enabled;
        if !self.enabled {
            self.enable_device().await?;
        }
        self.reg_event(EventFlags::ATTLOG).await?;
        info!(users = users.len(), "live capture started");

        Ok(LiveCapture {
            device: self,
            users,
            cancelled: Arc::new(AtomicBool::new(false)),
            pending: VecDeque::new(),
            idle_timeout: Duration::from_secs(LIVE_CAPTURE_TIMEOUT),
            was_enabled,
            finished: false,
        })
    }
}

impl LiveCapture<'_> {
    /// Set how long a quiet device waits before yielding
    /// [`LiveEvent::Idle`].
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Handle for stopping this capture from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(Arc::clone(&self.cancelled))
    }

    /// Request the capture to stop on its next wakeup.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for the next stream item.
    ///
    /// Returns `Ok(None)` exactly once the capture has shut down; every
    /// call after that answers `None` immediately.
    pub async fn next(&mut self) -> Result<Option<LiveEvent>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            if self.cancelled.load(Ordering::SeqCst) {
                self.stop().await?;
                return Ok(None);
            }
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(LiveEvent::Attendance(record)));
            }

            let packet = match self.device.recv_packet_within(self.idle_timeout).await {
                Ok(packet) => packet,
                Err(e) if e.is_timeout() => return Ok(Some(LiveEvent::Idle)),
                Err(e) => return Err(e),
            };

            // Every event frame is acknowledged, understood or not
            self.device.ack_event().await?;
            if packet.command != Command::RegEvent {
                debug!(code = %packet.command, "non-event frame during capture");
                continue;
            }

            for record in decode_live_events(&packet.payload)? {
                let uid = self
                    .users
                    .iter()
                    .find(|u| u.user_id == record.user_id)
                    .map(|u| u.uid)
                    .unwrap_or_else(|| record.user_id.parse().unwrap_or_default());
                self.pending.push_back(Attendance::new(
                    uid,
                    record.user_id,
                    record.timestamp,
                    record.status,
                    record.punch,
                ));
            }
            // An unrecognized payload decodes to nothing; wait again
        }
    }

    /// Deregister the event subscription and restore the device's
    /// enabled state. Idempotent.
    pub async fn stop(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.device.reg_event(EventFlags::empty()).await?;
        if !self.was_enabled {
            self.device.disable_device().await?;
        }
        info!("live capture stopped");
        Ok(())
    }
}
