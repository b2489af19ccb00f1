//! High-level device handle
//!
//! [`Device`] owns one transport and one session and drives the strict
//! one-request-one-reply exchange. Every reply's echoed counter becomes
//! the base of the next outgoing envelope, so all operations take
//! `&mut self` and run sequentially.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use bioterm_core::{
    checksum,
    clock,
    codec,
    auth::make_commkey,
    constants::{EventFlags, DEFAULT_TIMEOUT, EVENT_REPLY_ID},
    Command, Packet, Session,
};
use bioterm_transport::{TcpTransport, Transport, UdpTransport};
use bioterm_types::{DeviceGeneration, DeviceInfo, DeviceSizes};

use crate::error::{Error, Result};

/// Tick constant mixed into the commkey scramble.
const COMMKEY_TICKS: u8 = 50;

/// A classified successful reply.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub code: Command,
    pub payload: Bytes,
}

/// Handle to one terminal.
///
/// Created with [`Device::tcp`] or [`Device::udp`] (or any custom
/// [`Transport`] via [`Device::with_transport`]), then opened with
/// [`Device::connect`].
pub struct Device {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) session: Session,
    pub(crate) timeout: Duration,
    password: u32,
    pub(crate) generation: DeviceGeneration,
    pub(crate) sizes: Option<DeviceSizes>,
    pub(crate) enabled: bool,
    pub(crate) next_uid: u16,
    pub(crate) next_user_id: u32,
}

impl Device {
    /// Create a device handle over TCP.
    pub fn tcp(addr: impl Into<String>, port: u16) -> Self {
        Self::with_transport(Box::new(TcpTransport::new(addr, port)))
    }

    /// Create a device handle over UDP.
    pub fn udp(addr: impl Into<String>, port: u16) -> Self {
        Self::with_transport(Box::new(UdpTransport::new(addr, port)))
    }

    /// Create a device handle over an already-constructed transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> Self {
        // Until the first user read pins it, the record layout is guessed
        // from the socket mode: TCP firmware generations use the wide
        // layout, UDP-only ones the narrow layout.
        let generation = if transport.is_tcp() {
            DeviceGeneration::Extended
        } else {
            DeviceGeneration::Compact
        };
        Self {
            transport,
            session: Session::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            password: 0,
            generation,
            sizes: None,
            enabled: true,
            next_uid: 1,
            next_user_id: 1,
        }
    }

    /// Set the communication password used when the device demands AUTH.
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Set the per-reply read timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Device address as `ip:port`.
    pub fn remote_addr(&self) -> String {
        self.transport.remote_addr()
    }

    /// Whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Record layout the device is believed to use.
    pub fn generation(&self) -> DeviceGeneration {
        self.generation
    }

    /// Last capacity snapshot read via [`Device::read_sizes`].
    pub fn sizes(&self) -> Option<&DeviceSizes> {
        self.sizes.as_ref()
    }

    // ---- wire plumbing ----------------------------------------------------

    pub(crate) async fn send_command(&mut self, command: Command, payload: Bytes) -> Result<()> {
        let packet = Packet::with_payload(
            command,
            self.session.session_id(),
            self.session.reply_id(),
            payload,
        );
        debug!(%packet, "send");
        self.transport.send_frame(&packet.encode()).await?;
        Ok(())
    }

    pub(crate) async fn recv_packet(&mut self) -> Result<Packet> {
        self.recv_packet_within(self.timeout).await
    }

    pub(crate) async fn recv_packet_within(&mut self, timeout: Duration) -> Result<Packet> {
        let frame = self.transport.recv_frame(timeout).await?;
        let packet = Packet::decode(frame)?;
        debug!(%packet, "recv");
        self.session.sync_reply(packet.reply_id);
        Ok(packet)
    }

    /// One raw request/reply exchange, no classification.
    pub(crate) async fn exchange(&mut self, command: Command, payload: Bytes) -> Result<Packet> {
        self.send_command(command, payload).await?;
        self.recv_packet().await
    }

    /// One exchange on an established session, classified by reply code.
    pub(crate) async fn execute(&mut self, command: Command, payload: Bytes) -> Result<Reply> {
        self.session
            .require_connected()
            .map_err(|_| Error::NotConnected)?;
        let packet = self.exchange(command, payload).await?;
        if packet.is_success() {
            Ok(Reply {
                code: packet.command,
                payload: packet.payload,
            })
        } else {
            Err(Error::Refused {
                command,
                code: packet.command.into(),
            })
        }
    }

    /// Acknowledge a live event frame.
    ///
    /// Event acks are fire-and-forget and carry the reserved event reply
    /// id verbatim rather than the successor of the session counter, so
    /// the envelope is built by hand here.
    pub(crate) async fn ack_event(&mut self) -> Result<()> {
        let session_id = self.session.session_id();
        let sum = checksum::calculate(Command::AckOk.into(), session_id, EVENT_REPLY_ID, &[]);
        let mut buf = BytesMut::with_capacity(Packet::HEADER_SIZE);
        buf.put_u16_le(Command::AckOk.into());
        buf.put_u16_le(sum);
        buf.put_u16_le(session_id);
        buf.put_u16_le(EVENT_REPLY_ID);
        self.transport.send_frame(&buf).await?;
        Ok(())
    }

    /// Recover the device's command parser after a refused option query.
    ///
    /// Some firmware wedges its parser when asked for an option key it
    /// does not know. The reference unwedge sequence is an ACK_ERROR
    /// probe followed by three ACK_UNKNOWN probes, replies ignored.
    pub(crate) async fn clear_error(&mut self) -> Result<()> {
        let probe = Bytes::from_static(&[0u8; 8]);
        self.exchange(Command::AckError, probe.clone()).await?;
        for _ in 0..3 {
            self.exchange(Command::AckUnknown, probe.clone()).await?;
        }
        Ok(())
    }

    // ---- session lifecycle ------------------------------------------------

    /// Connect the socket and establish a session.
    ///
    /// When the device answers the handshake with ACK_UNAUTH, a commkey
    /// derived from the configured password and the assigned session id
    /// is presented once; a second rejection fails the connect.
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await?;
        self.session.reset_for_connect();

        let reply = match self.exchange(Command::Connect, Bytes::new()).await {
            Ok(packet) => packet,
            Err(e) => {
                self.teardown().await;
                return Err(e);
            }
        };
        let session_id = reply.session_id;

        match reply.command {
            Command::AckOk => {
                self.session.open(session_id).map_err(Error::Core)?;
            }
            Command::AckUnauth => {
                self.session.adopt_session_id(session_id);
                let key = make_commkey(self.password, session_id, COMMKEY_TICKS);
                debug!(session_id, "device demands authentication");
                let auth = match self.exchange(Command::Auth, key).await {
                    Ok(packet) => packet,
                    Err(e) => {
                        self.teardown().await;
                        return Err(e);
                    }
                };
                if auth.command != Command::AckOk {
                    self.teardown().await;
                    return Err(Error::AuthenticationFailed);
                }
                self.session.open(session_id).map_err(Error::Core)?;
            }
            other => {
                self.teardown().await;
                return Err(Error::Refused {
                    command: Command::Connect,
                    code: other.into(),
                });
            }
        }

        self.enabled = true;
        info!(
            addr = %self.transport.remote_addr(),
            session_id,
            tcp = self.transport.is_tcp(),
            "session established"
        );
        Ok(())
    }

    /// End the session and close the socket.
    ///
    /// The EXIT command is best-effort: the socket is closed and the
    /// session torn down even when the device no longer answers.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.session.is_connected() {
            if let Err(e) = self.execute(Command::Exit, Bytes::new()).await {
                warn!(error = %e, "device did not acknowledge session exit");
            }
        }
        self.teardown().await;
        Ok(())
    }

    async fn teardown(&mut self) {
        self.session.close();
        if let Err(e) = self.transport.disconnect().await {
            warn!(error = %e, "transport close failed");
        }
    }

    /// Lock the device UI while the host manipulates its database.
    pub async fn disable_device(&mut self) -> Result<()> {
        self.execute(Command::DisableDevice, Bytes::new()).await?;
        self.enabled = false;
        Ok(())
    }

    /// Re-enable the device UI.
    pub async fn enable_device(&mut self) -> Result<()> {
        self.execute(Command::EnableDevice, Bytes::new()).await?;
        self.enabled = true;
        Ok(())
    }

    /// Reboot the device. The session dies with it.
    pub async fn restart(&mut self) -> Result<()> {
        self.execute(Command::Restart, Bytes::new()).await?;
        self.teardown().await;
        Ok(())
    }

    /// Power the device off. The session dies with it.
    pub async fn poweroff(&mut self) -> Result<()> {
        self.execute(Command::PowerOff, Bytes::new()).await?;
        self.teardown().await;
        Ok(())
    }

    /// Ask the device to re-read its own database after host writes.
    pub async fn refresh_data(&mut self) -> Result<()> {
        self.execute(Command::RefreshData, Bytes::new()).await?;
        Ok(())
    }

    /// Play one of the built-in voice prompts.
    pub async fn test_voice(&mut self, index: u32) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32_le(index);
        self.execute(Command::TestVoice, payload.freeze()).await?;
        Ok(())
    }

    /// Trigger the door relay for `seconds`.
    pub async fn unlock(&mut self, seconds: u32) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32_le(seconds * 10);
        self.execute(Command::Unlock, payload.freeze()).await?;
        Ok(())
    }

    // ---- device information -----------------------------------------------

    /// Firmware version string.
    pub async fn get_firmware_version(&mut self) -> Result<String> {
        let reply = self.execute(Command::GetVersion, Bytes::new()).await?;
        Ok(codec::decode_str(&reply.payload))
    }

    /// Query one option key.
    ///
    /// Returns `None` when the firmware does not know the key; the
    /// refusal wedges some parsers, so the unwedge sequence runs before
    /// reporting the miss.
    pub async fn get_option(&mut self, key: &str) -> Result<Option<String>> {
        let mut payload = BytesMut::with_capacity(key.len() + 1);
        payload.put_slice(key.as_bytes());
        payload.put_u8(0);
        match self.execute(Command::OptionsRrq, payload.freeze()).await {
            Ok(reply) => Ok(codec::parse_option_value(&reply.payload)),
            Err(Error::Refused { .. }) => {
                debug!(key, "option key refused");
                self.clear_error().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Device serial number.
    pub async fn get_serial_number(&mut self) -> Result<Option<String>> {
        self.get_option("~SerialNumber").await
    }

    /// Hardware platform name.
    pub async fn get_platform(&mut self) -> Result<Option<String>> {
        self.get_option("~Platform").await
    }

    /// Model name.
    pub async fn get_device_name(&mut self) -> Result<Option<String>> {
        self.get_option("~DeviceName").await
    }

    /// MAC address of the device's network interface.
    pub async fn get_mac(&mut self) -> Result<Option<String>> {
        self.get_option("MAC").await
    }

    /// IP address the device believes it has.
    pub async fn get_ip(&mut self) -> Result<Option<String>> {
        self.get_option("IPAddress").await
    }

    /// Collect the common identity options into one struct.
    pub async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        let mut info = DeviceInfo::new(self.get_firmware_version().await?);
        info.serial_number = self.get_serial_number().await?;
        info.platform = self.get_platform().await?;
        info.device_name = self.get_device_name().await?;
        info.mac_address = self.get_mac().await?;
        info.ip_address = self.get_ip().await?;
        Ok(info)
    }

    /// Maximum user id digit count the firmware accepts.
    pub async fn get_pin_width(&mut self) -> Result<u8> {
        let reply = self
            .execute(Command::GetPinWidth, Bytes::from_static(b" P"))
            .await?;
        reply
            .payload
            .first()
            .copied()
            .ok_or_else(|| Error::MalformedReply("empty pin-width reply".into()))
    }

    /// Read record counts and capacities, refreshing the cached snapshot.
    pub async fn read_sizes(&mut self) -> Result<DeviceSizes> {
        let reply = self.execute(Command::GetFreeSizes, Bytes::new()).await?;
        let sizes = codec::decode_sizes(&reply.payload)?;
        debug!(%sizes, "capacity snapshot");
        self.sizes = Some(sizes.clone());
        Ok(sizes)
    }

    // ---- clock ------------------------------------------------------------

    /// Read the device clock.
    pub async fn get_time(&mut self) -> Result<NaiveDateTime> {
        let reply = self.execute(Command::GetTime, Bytes::new()).await?;
        if reply.payload.len() < 4 {
            return Err(Error::MalformedReply("short clock reply".into()));
        }
        let packed = u32::from_le_bytes([
            reply.payload[0],
            reply.payload[1],
            reply.payload[2],
            reply.payload[3],
        ]);
        Ok(clock::decode_time(packed)?)
    }

    /// Set the device clock.
    pub async fn set_time(&mut self, t: NaiveDateTime) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32_le(clock::encode_time(t)?);
        self.execute(Command::SetTime, payload.freeze()).await?;
        Ok(())
    }

    // ---- capture control --------------------------------------------------

    pub(crate) async fn reg_event(&mut self, flags: EventFlags) -> Result<()> {
        let mut payload = BytesMut::with_capacity(4);
        payload.put_u32_le(flags.bits());
        self.execute(Command::RegEvent, payload.freeze()).await?;
        Ok(())
    }

    pub(crate) async fn cancel_capture(&mut self) -> Result<()> {
        // Some generations refuse this when no capture is pending.
        let packet = self.exchange(Command::CancelCapture, Bytes::new()).await?;
        if !packet.is_success() {
            debug!(code = %packet.command, "cancel-capture refused");
        }
        Ok(())
    }

    pub(crate) async fn start_verify(&mut self) -> Result<()> {
        self.execute(Command::StartVerify, Bytes::new()).await?;
        Ok(())
    }
}
