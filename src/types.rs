// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported proof-of-work algorithms
///
/// This enum identifies the chained-hash variants the miner can run.
/// Each variant maps to one entry in the algorithm registry with its
/// own pipeline, scratch geometry and difficulty scaling rule.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum AlgorithmType {
    /// Helix v2 algorithm (current)
    ///
    /// Seven-stage chain with a 1.5 MiB memory-hard mixing stage.
    /// The representative algorithm of this miner.
    #[clap(name = "helix-v2")]
    HelixV2,

    /// Helix v1 algorithm (legacy)
    ///
    /// Earlier five-stage chain with a 128 KiB mixing stage.
    /// Kept for chains that have not switched to v2 yet.
    #[clap(name = "helix-v1")]
    HelixV1,
}

impl fmt::Display for AlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmType::HelixV2 => write!(f, "helix-v2"),
            AlgorithmType::HelixV1 => write!(f, "helix-v1"),
        }
    }
}

impl FromStr for AlgorithmType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hx2" | "helix-v2" => Ok(AlgorithmType::HelixV2),
            "hx1" | "helix-v1" => Ok(AlgorithmType::HelixV1),
            _ => Err(format!("Unknown algorithm: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for algo in [AlgorithmType::HelixV2, AlgorithmType::HelixV1] {
            let parsed: AlgorithmType = algo.to_string().parse().unwrap();
            assert_eq!(parsed, algo);
        }
    }

    #[test]
    fn parse_accepts_short_names() {
        assert_eq!("hx2".parse::<AlgorithmType>().unwrap(), AlgorithmType::HelixV2);
        assert_eq!("HX1".parse::<AlgorithmType>().unwrap(), AlgorithmType::HelixV1);
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!("scrypt".parse::<AlgorithmType>().is_err());
    }
}
