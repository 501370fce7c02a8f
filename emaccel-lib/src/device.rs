use crate::bases::BaseLineSet;
use crate::capture::RawCapture;
use crate::command::{Ack, Command, find_delimiter};
use crate::config::DeviceConfig;
use crate::constants::ACK_DELIMITER;
use crate::error::{AccelError, Result};
use crate::transport::{LinkTransport, SerialLink, open_serial};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Command/acknowledgement driver for one accelerator controller.
///
/// Every device exchange takes `&mut self`, so only one command is ever in
/// flight. Share an engine between tasks behind a `tokio::sync::Mutex`.
pub struct ProtocolEngine<T> {
    config: DeviceConfig,
    transport: Option<T>,
    // Bytes read past the last acknowledgement
    rx: BytesMut,
    bases: BaseLineSet,
    recording: watch::Sender<bool>,
}

impl<T: LinkTransport> ProtocolEngine<T> {
    pub fn new(config: DeviceConfig) -> Self {
        let (recording, _) = watch::channel(false);
        Self {
            config,
            transport: None,
            rx: BytesMut::new(),
            bases: BaseLineSet::default(),
            recording,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_recording(&self) -> bool {
        *self.recording.borrow()
    }

    /// Receiver notified on every recording state transition
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.recording.subscribe()
    }

    pub fn bases(&self) -> BaseLineSet {
        self.bases
    }

    /// Take ownership of an open transport and bring the device to a known
    /// state: recording stopped, all base lines at their default.
    pub async fn attach(&mut self, transport: T) -> Result<()> {
        self.rx.clear();
        self.initialize(transport).await
    }

    /// Ping first and only initialize a device that answers like a
    /// compatible unit. A rejected transport is dropped without any other
    /// command written to it.
    pub async fn probe_and_attach(&mut self, mut transport: T) -> Result<()> {
        self.rx.clear();
        ping(&mut transport, &mut self.rx, &self.config).await?;
        self.initialize(transport).await
    }

    async fn initialize(&mut self, transport: T) -> Result<()> {
        self.transport = Some(transport);
        self.set_recording(false);

        info!("--- Stopping recorder for a clean state ---");
        match self.stop_recording().await {
            Ok(()) => {}
            Err(e @ (AccelError::ProtocolMismatch { .. } | AccelError::Timeout(_))) => {
                warn!("Device did not confirm the initial stop: {}", e);
            }
            Err(e) => return Err(e),
        }

        info!("--- Resetting base lines ---");
        self.reset_bases().await?;

        info!("Device initialized and ready.");
        Ok(())
    }

    /// Signal that the current recording is over without talking to the
    /// device, e.g. when the user abandons it.
    pub fn cancel_recording(&mut self) {
        if self.is_recording() {
            info!("Recording cancelled");
        }
        self.set_recording(false);
    }

    pub async fn start_recording(&mut self, duration_seconds: u32) -> Result<()> {
        self.exchange(
            Command::StartLog {
                seconds: duration_seconds,
            },
            Ack::StartSuccess,
        )
        .await?;
        self.set_recording(true);
        info!(duration_seconds, "Recording started");
        Ok(())
    }

    pub async fn stop_recording(&mut self) -> Result<()> {
        self.exchange(Command::StopLog, Ack::StopFinished).await?;
        self.set_recording(false);
        info!("Recording stopped");
        Ok(())
    }

    /// Change one base line and push the whole bitmap.
    ///
    /// If the push fails the local bit stays changed, so a later
    /// [`update_bases`](Self::update_bases) retries it.
    pub async fn set_base(&mut self, index: usize, disabled: bool) -> Result<()> {
        self.bases.set(index, disabled)?;
        debug!(index, disabled, bitmap = %self.bases, "Base line changed");
        self.update_bases().await
    }

    pub async fn update_bases(&mut self) -> Result<()> {
        self.exchange(Command::SetBases(self.bases), Ack::BasesSet).await
    }

    /// Put every base line back to its default and push the bitmap once.
    // The handler this replaces reset index 0 six times; whether per-index
    // pushes were intended is unknown, so the full bitmap is sent instead.
    pub async fn reset_bases(&mut self) -> Result<()> {
        self.bases.reset();
        self.update_bases().await
    }

    /// Drain everything the device has buffered.
    ///
    /// Reads `chunk_size` bytes at a time until a read comes back short; a read
    /// that times out counts as a zero-length read.
    pub async fn get_whole_buffer(&mut self) -> Result<RawCapture> {
        let chunk_size = self.config.chunk_size.max(1);
        let chunk_timeout = self.config.chunk_timeout();
        let limit = self.config.max_capture_bytes;
        let transport = self.transport.as_mut().ok_or(AccelError::NotConnected)?;

        let mut buffer = self.rx.split();
        let mut chunk = vec![0u8; chunk_size];
        let mut reads = 0usize;
        loop {
            let n = match timeout(chunk_timeout, transport.read(&mut chunk)).await {
                Ok(read) => read?,
                Err(_) => 0,
            };
            reads += 1;

            if buffer.len() + n > limit {
                warn!(limit, "Capture limit exceeded, aborting drain");
                return Err(AccelError::CaptureTooLarge { limit });
            }
            buffer.extend_from_slice(&chunk[..n]);

            if n < chunk_size {
                break;
            }
        }

        info!(bytes = buffer.len(), reads, "Drained device buffer");
        Ok(RawCapture::new(buffer.freeze()))
    }

    /// Release the transport. The local session state goes with it.
    pub async fn close(&mut self) -> Result<()> {
        let mut transport = self.transport.take().ok_or(AccelError::NotConnected)?;
        self.rx.clear();
        self.bases.reset();
        self.set_recording(false);
        transport.shutdown().await?;
        info!("Transport closed");
        Ok(())
    }

    fn set_recording(&self, state: bool) {
        self.recording.send_if_modified(|current| {
            let changed = *current != state;
            *current = state;
            changed
        });
    }

    async fn exchange(&mut self, command: Command, expected: Ack) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(AccelError::NotConnected)?;
        write_command(transport, &command).await?;
        let ack = read_ack(transport, &mut self.rx, &self.config).await?;

        if ack != expected {
            warn!(%command, %ack, "Unexpected acknowledgement");
            return Err(AccelError::mismatch(expected.to_string(), ack.to_string()));
        }
        debug!(%command, %ack, "Command acknowledged");
        Ok(())
    }
}

/// Engine bound to a real serial port
pub type SerialEngine = ProtocolEngine<SerialLink>;

impl SerialEngine {
    /// Open `port_name` and initialize the device, see [`attach`](Self::attach).
    pub async fn connect(&mut self, port_name: &str) -> Result<()> {
        if self.transport.take().is_some() {
            info!("Dropping previous connection");
        }
        let stream = open_serial(port_name)?;
        self.attach(stream).await
    }

    /// [`connect`](Self::connect), refusing ports where the ping fails.
    pub async fn probe_and_connect(&mut self, port_name: &str) -> Result<()> {
        if self.transport.take().is_some() {
            info!("Dropping previous connection");
        }
        let stream = open_serial(port_name)?;
        self.probe_and_attach(stream).await
    }
}

/// Check whether a compatible device listens on `port_name`.
///
/// The port is opened only for the duration of the probe.
pub async fn probe(port_name: &str, config: &DeviceConfig) -> Result<()> {
    let mut stream = open_serial(port_name)?;
    let result = probe_transport(&mut stream, config).await;
    drop(stream);
    result
}

/// Ping over an already open transport.
///
/// Note the polarity: the device answers `sPingTest` when it is *not* a
/// compatible unit, so that reply is the failure and anything else passes.
pub async fn probe_transport<T: LinkTransport>(transport: &mut T, config: &DeviceConfig) -> Result<()> {
    ping(transport, &mut BytesMut::new(), config).await
}

async fn ping<T: LinkTransport>(transport: &mut T, rx: &mut BytesMut, config: &DeviceConfig) -> Result<()> {
    write_command(transport, &Command::Ping).await?;
    let ack = read_ack(transport, rx, config).await?;

    if ack == Ack::PingFailure {
        warn!(%ack, "Probe rejected");
        return Err(AccelError::mismatch(format!("not {}", Ack::PingFailure), ack.to_string()));
    }
    info!(%ack, "Device present");
    Ok(())
}

async fn write_command<T: LinkTransport>(transport: &mut T, command: &Command) -> Result<()> {
    let bytes = command.to_bytes();
    debug!(bytes = hex::encode(&bytes), "Serial Write");
    transport.write_all(&bytes).await?;
    transport.flush().await?;
    Ok(())
}

/// Read one acknowledgement line, bounded by the ack timeout.
///
/// A reply cut short by the timeout or by `max_reply_len` is taken as it
/// is; a timeout with nothing received is an error.
async fn read_ack<T: LinkTransport>(transport: &mut T, rx: &mut BytesMut, config: &DeviceConfig) -> Result<Ack> {
    let max = config.max_reply_len.max(1);
    let framed = timeout(config.ack_timeout(), fill_reply(transport, rx, max)).await;
    match framed {
        Ok(read) => read?,
        Err(elapsed) if rx.is_empty() => return Err(elapsed.into()),
        Err(_) => warn!(bytes = rx.len(), "Acknowledgement timed out before CRLF"),
    }

    let reply = match find_delimiter(rx) {
        Some(end) => rx.split_to(end + ACK_DELIMITER.len()),
        None => rx.split_to(rx.len().min(max)),
    };
    debug!(bytes = hex::encode(&reply), "Serial Read");
    Ok(Ack::from_reply(&reply))
}

async fn fill_reply<T: LinkTransport>(transport: &mut T, rx: &mut BytesMut, max: usize) -> Result<()> {
    let mut chunk = [0u8; 64];
    while find_delimiter(rx).is_none() && rx.len() < max {
        let n = transport.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        rx.extend_from_slice(&chunk[..n]);
    }
    Ok(())
}
