use crate::constants::BAUD_RATE;
use crate::error::Result;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};
use tracing::{debug, info};

pub use tokio_serial::SerialStream as SerialLink;

/// Anything the protocol engine can talk through: a serial stream in
/// production, an in-memory pipe in tests.
pub trait LinkTransport: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> LinkTransport for T {}

/// Open `port_name` as 8N1 without flow control at the fixed line speed
pub fn open_serial(port_name: &str) -> Result<SerialLink> {
    info!(port = port_name, baud = BAUD_RATE, "Opening serial port");
    let stream = tokio_serial::new(port_name, BAUD_RATE)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(io::Error::from)?;
    Ok(stream)
}

/// Names of the serial ports the OS currently reports
pub fn available_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(io::Error::from)?;
    debug!("Found {} serial port(s)", ports.len());
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}
