use std::time::Duration;

use crate::client::requests::read_bits::ReadBits;
use crate::client::requests::read_registers::ReadRegisters;
use crate::constants::defaults;
use crate::error::RequestError;
use crate::transport::FrameTransport;
use crate::types::UnitId;

/// Decides whether a Modbus slave answers on an open line
///
/// Every unit is tried at every address: first a single coil, then a single
/// holding register. Any valid response counts, so a slave that only has one
/// of the two tables is still found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveProbe {
    units: Vec<UnitId>,
    addresses: Vec<u16>,
    timeout: Duration,
}

impl Default for SlaveProbe {
    fn default() -> Self {
        Self {
            units: defaults::PROBE_UNITS.into_iter().map(UnitId::new).collect(),
            addresses: defaults::PROBE_ADDRESSES.to_vec(),
            timeout: defaults::PROBE_TIMEOUT,
        }
    }
}

impl SlaveProbe {
    /// Probe units 1, 2 and 3 at addresses 0 and 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Units to try, in order
    pub fn with_units(self, units: Vec<UnitId>) -> Self {
        Self { units, ..self }
    }

    /// Try `unit` before all others, keeping the remaining units in order
    pub fn with_preferred_unit(mut self, unit: UnitId) -> Self {
        self.units.retain(|x| *x != unit);
        self.units.insert(0, unit);
        self
    }

    /// Addresses to try for each unit, in order
    pub fn with_addresses(self, addresses: Vec<u16>) -> Self {
        Self { addresses, ..self }
    }

    /// Response timeout of each attempt, capped at the default
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            timeout: timeout.min(defaults::PROBE_TIMEOUT),
            ..self
        }
    }

    /// Timeout applied to each request
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` on the first valid response
    ///
    /// An I/O error means the port is unusable and ends the probe with `false`.
    pub async fn probe(&self, transport: &mut FrameTransport) -> bool {
        for &unit in &self.units {
            for &address in &self.addresses {
                match self.attempt(transport, unit, address).await {
                    Ok(()) => return true,
                    Err(err) if err.is_fatal() => {
                        tracing::debug!("probe aborted: {}", err);
                        return false;
                    }
                    Err(_) => {}
                }
            }
        }
        false
    }

    async fn attempt(
        &self,
        transport: &mut FrameTransport,
        unit: UnitId,
        address: u16,
    ) -> Result<(), RequestError> {
        tracing::debug!("probing unit {} at address {}", unit, address);

        let coil = ReadBits::coils(address, 1)?;
        let err = match transport.execute(unit, &coil, self.timeout).await {
            Ok(_) => return Ok(()),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => err,
        };
        tracing::debug!("no coil response ({}), trying a holding register", err);

        let register = ReadRegisters::holding(address, 1)?;
        transport.execute(unit, &register, self.timeout).await?;
        Ok(())
    }
}
