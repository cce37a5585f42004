//! Channel and bus configuration with their default parameters.

use std::fmt;
use std::str::FromStr;

/// How concurrent transfers share a channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransferMode {
    /// Active transfers split the bandwidth equally.
    #[default]
    Interleaving,
    /// One transfer at a time at full bandwidth; the rest queue FIFO.
    Blocking,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interleaving => write!(f, "interleaving"),
            Self::Blocking => write!(f, "blocking"),
        }
    }
}

impl FromStr for TransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interleaving" => Ok(Self::Interleaving),
            "blocking" => Ok(Self::Blocking),
            other => Err(format!(
                "unknown transfer mode '{other}' (expected interleaving or blocking)"
            )),
        }
    }
}

/// Configuration for a plain [`Channel`](crate::Channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Bytes per tick. Default: 128. Must be > 0.
    pub bandwidth: u64,
    /// Propagation latency in ticks after the data drains. Default: 5.
    pub latency: u64,
    /// Sharing policy. Default: interleaving.
    pub transfer_mode: TransferMode,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bandwidth: 128,
            latency: 5,
            transfer_mode: TransferMode::Interleaving,
        }
    }
}

/// Configuration for a read bus.
///
/// A read is a request leg carrying no data followed by a response leg
/// that streams the data back at `data_response_bandwidth`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadBusConfig {
    /// Ticks for the request to reach memory. Default: 5.
    pub read_request_latency: u64,
    /// Ticks for response data to reach the requester once streamed. Default: 5.
    pub data_response_latency: u64,
    /// Response bytes per tick. Default: 128. Must be > 0.
    pub data_response_bandwidth: u64,
    /// Sharing policy of the response leg. Default: interleaving.
    pub transfer_mode: TransferMode,
}

impl Default for ReadBusConfig {
    fn default() -> Self {
        Self {
            read_request_latency: 5,
            data_response_latency: 5,
            data_response_bandwidth: 128,
            transfer_mode: TransferMode::Interleaving,
        }
    }
}

/// Configuration for a write bus.
///
/// A write is a request leg, a data leg at `write_bandwidth`, and an
/// acknowledgement leg carrying no data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteBusConfig {
    /// Ticks for the write request to reach memory. Default: 5.
    pub write_request_latency: u64,
    /// Write data bytes per tick. Default: 128. Must be > 0.
    pub write_bandwidth: u64,
    /// Ticks for the acknowledgement to return. Default: 5.
    pub write_response_latency: u64,
    /// Sharing policy of the data leg. Default: interleaving.
    pub transfer_mode: TransferMode,
}

impl Default for WriteBusConfig {
    fn default() -> Self {
        Self {
            write_request_latency: 5,
            write_bandwidth: 128,
            write_response_latency: 5,
            transfer_mode: TransferMode::Interleaving,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ChannelConfig::default();
        assert_eq!((c.bandwidth, c.latency), (128, 5));
        assert_eq!(c.transfer_mode, TransferMode::Interleaving);

        let r = ReadBusConfig::default();
        assert_eq!(r.read_request_latency, 5);
        assert_eq!(r.data_response_latency, 5);
        assert_eq!(r.data_response_bandwidth, 128);

        let w = WriteBusConfig::default();
        assert_eq!(w.write_request_latency, 5);
        assert_eq!(w.write_bandwidth, 128);
        assert_eq!(w.write_response_latency, 5);
    }

    #[test]
    fn transfer_mode_parses_names() {
        assert_eq!("blocking".parse(), Ok(TransferMode::Blocking));
        assert_eq!("interleaving".parse(), Ok(TransferMode::Interleaving));
        assert!("round-robin".parse::<TransferMode>().is_err());
    }
}
