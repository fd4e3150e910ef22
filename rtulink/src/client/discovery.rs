use std::sync::Arc;

use crate::client::probe::SlaveProbe;
use crate::config::SerialEndpoint;
use crate::constants::defaults;
use crate::decode::DecodeLevel;
use crate::serial::{PortOpener, SystemPorts};
use crate::transport::FrameTransport;

const DEVICE_DIR: &str = "/dev";
const FAMILIES: [&str; 2] = ["ttyACM", "ttyUSB"];

type Candidates = Box<dyn Fn() -> Vec<String> + Send + Sync>;

/// Finds the serial port and baud rate a Modbus slave answers on
///
/// Ports are tried one at a time. Each attempt opens the port, runs the
/// [`SlaveProbe`] and closes the port again before the next attempt.
pub struct PortDiscovery {
    opener: Arc<dyn PortOpener>,
    candidates: Candidates,
    probe: SlaveProbe,
    template: SerialEndpoint,
    decode: DecodeLevel,
}

impl std::fmt::Debug for PortDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortDiscovery")
            .field("probe", &self.probe)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

impl Default for PortDiscovery {
    fn default() -> Self {
        Self {
            opener: Arc::new(SystemPorts),
            candidates: Box::new(system_candidate_paths),
            probe: SlaveProbe::default(),
            template: SerialEndpoint::default(),
            decode: DecodeLevel::nothing(),
        }
    }
}

impl PortDiscovery {
    /// Scan the USB serial adapters of this machine
    pub fn new() -> Self {
        Self::default()
    }

    /// Open ports through `opener`
    pub fn with_opener(self, opener: Arc<dyn PortOpener>) -> Self {
        Self { opener, ..self }
    }

    /// Replace the enumeration of candidate paths
    pub fn with_candidates<F>(self, candidates: F) -> Self
    where
        F: Fn() -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            candidates: Box::new(candidates),
            ..self
        }
    }

    /// Probe used on every attempt
    pub fn with_probe(self, probe: SlaveProbe) -> Self {
        Self { probe, ..self }
    }

    /// Framing and timeout of the returned endpoint, path and baud rate are replaced
    pub fn with_template(self, template: SerialEndpoint) -> Self {
        Self { template, ..self }
    }

    /// Decode level of the probe traffic
    pub fn with_decode_level(self, decode: DecodeLevel) -> Self {
        Self { decode, ..self }
    }

    /// Try every baud rate of `baud_rates` on each candidate path in turn
    ///
    /// An empty ladder means 9600, 19200, 38400, 57600 and 115200. Returns
    /// the first endpoint a slave answers on, `None` if there is none.
    pub async fn discover(&self, baud_rates: &[u32]) -> Option<SerialEndpoint> {
        let ladder = if baud_rates.is_empty() {
            &defaults::BAUD_RATES[..]
        } else {
            baud_rates
        };

        let paths = (self.candidates)();
        if paths.is_empty() {
            tracing::warn!("no candidate serial ports");
            return None;
        }

        for path in &paths {
            for &baud_rate in ladder {
                let endpoint = self
                    .template
                    .clone()
                    .with_path(path.as_str())
                    .with_baud_rate(baud_rate);
                if self.attempt(&endpoint).await {
                    tracing::info!("found a Modbus slave on {}", endpoint);
                    return Some(endpoint);
                }
            }
        }

        tracing::warn!(
            "no Modbus slave answered on {} port(s) at {:?}",
            paths.len(),
            ladder
        );
        None
    }

    async fn attempt(&self, endpoint: &SerialEndpoint) -> bool {
        tracing::debug!("trying {} @ {}", endpoint.path, endpoint.baud_rate);

        let probing = endpoint.clone().with_timeout(self.probe.timeout());
        let phys = match self.opener.open(&probing) {
            Ok(phys) => phys,
            Err(err) => {
                tracing::debug!("unable to open {}: {}", endpoint.path, err);
                return false;
            }
        };

        // the transport, and with it the port, is dropped before the next attempt
        let mut transport = FrameTransport::new(phys, self.decode);
        self.probe.probe(&mut transport).await
    }
}

/// `/dev/ttyACM*` followed by `/dev/ttyUSB*`, each in numeric order
pub fn system_candidate_paths() -> Vec<String> {
    let entries = match std::fs::read_dir(DEVICE_DIR) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("unable to list {}: {}", DEVICE_DIR, err);
            return Vec::new();
        }
    };

    candidate_paths(
        entries
            .filter_map(Result::ok)
            .filter_map(|entry| entry.file_name().into_string().ok()),
    )
}

fn candidate_paths(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut ranked: Vec<(usize, u32, String)> = names
        .into_iter()
        .filter_map(|name| {
            let family = FAMILIES
                .iter()
                .position(|prefix| name.starts_with(prefix))?;
            let number = name[FAMILIES[family].len()..]
                .parse()
                .unwrap_or(u32::MAX);
            Some((family, number, name))
        })
        .collect();

    ranked.sort();
    ranked
        .into_iter()
        .map(|(_, _, name)| format!("{DEVICE_DIR}/{name}"))
        .collect()
}
