pub mod bases;
pub mod capture;
pub mod command;
pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod export;
pub mod extract;
pub mod monitor;
pub mod transport;


pub use bases::BaseLineSet;
pub use capture::RawCapture;
pub use command::{Ack, Command};
pub use config::DeviceConfig;
pub use device::{ProtocolEngine, SerialEngine, probe, probe_transport};
pub use error::AccelError;
pub use extract::{DataPoint, StateSample, StateVector, extract_data_points};
pub use monitor::{MonitorOutcome, Progress, RecordingMonitor};
pub use transport::{LinkTransport, SerialLink, available_ports, open_serial};
