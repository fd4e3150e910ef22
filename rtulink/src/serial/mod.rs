use tokio_serial::SerialPortBuilderExt;

use crate::common::phys::PhysLayer;
use crate::config::{DataBits, Parity, SerialEndpoint, StopBits};

pub(crate) mod frame;

/// Opens the physical layer described by an endpoint
///
/// Sessions and discovery open ports exclusively through this trait so that
/// tests and simulators can substitute their own streams.
pub trait PortOpener: Send + Sync {
    /// Open the endpoint, or report why it could not be opened
    fn open(&self, endpoint: &SerialEndpoint) -> Result<PhysLayer, std::io::Error>;
}

/// Opens real serial ports through the operating system
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPorts;

impl PortOpener for SystemPorts {
    fn open(&self, endpoint: &SerialEndpoint) -> Result<PhysLayer, std::io::Error> {
        let stream = open(endpoint).map_err(std::io::Error::from)?;
        Ok(PhysLayer::new_serial(stream))
    }
}

fn open(endpoint: &SerialEndpoint) -> tokio_serial::Result<tokio_serial::SerialStream> {
    tokio_serial::new(&endpoint.path, endpoint.baud_rate)
        .data_bits(endpoint.data_bits.into())
        .parity(endpoint.parity.into())
        .stop_bits(endpoint.stop_bits.into())
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(endpoint.timeout)
        .open_native_async()
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(value: DataBits) -> Self {
        match value {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(value: Parity) -> Self {
        match value {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(value: StopBits) -> Self {
        match value {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}
