use anyhow::Result;
use emaccel_lib::available_ports;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Listing serial ports...\n");

    let ports = available_ports()?;
    for (count, port) in ports.iter().enumerate() {
        info!("Port #{}: {}", count + 1, port);
    }
    if ports.is_empty() {
        info!("No serial ports found.");
    }
    Ok(())
}
