//! Common test utilities and shared imports

// Shared across test files - not every item is used in each one
#[allow(unused_imports)]
pub use emaccel_lib::error::AccelError;
#[allow(unused_imports)]
pub use emaccel_lib::{DeviceConfig, ProtocolEngine, RawCapture};

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Room for a few multi-chunk captures in flight
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Short timeouts so failing exchanges do not stall the suite
#[allow(dead_code)]
pub fn test_config() -> DeviceConfig {
    DeviceConfig {
        ack_timeout_ms: 100,
        chunk_timeout_ms: 50,
        ..DeviceConfig::default()
    }
}

/// The device end of an in-memory serial link.
///
/// Replies are queued before the host sends its command, so every exchange
/// is deterministic without a separate task.
pub struct FakeDevice {
    pub stream: DuplexStream,
}

#[allow(dead_code)]
impl FakeDevice {
    pub async fn reply(&mut self, text: &str) {
        self.stream.write_all(text.as_bytes()).await.expect("device write failed");
    }

    pub async fn emit(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.expect("device write failed");
    }

    /// Assert the host sent exactly `expected` next
    pub async fn expect_command(&mut self, expected: &str) {
        let mut buf = vec![0u8; expected.len()];
        self.stream.read_exact(&mut buf).await.expect("device read failed");
        assert_eq!(String::from_utf8_lossy(&buf), expected, "unexpected command on the wire");
    }
}

/// Route library logs to the test harness; `RUST_LOG` selects the level
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// An engine attached to a fake device that accepted the start-up sequence
#[allow(dead_code)]
pub async fn attached_engine(config: DeviceConfig) -> (ProtocolEngine<DuplexStream>, FakeDevice) {
    init_tracing();
    let (host, stream) = tokio::io::duplex(PIPE_CAPACITY);
    let mut device = FakeDevice { stream };
    let mut engine = ProtocolEngine::new(config);

    device.reply("slf\r\nsb\r\n").await;
    engine.attach(host).await.expect("attach failed");
    device.expect_command("l-1\nb000000\n").await;

    (engine, device)
}
