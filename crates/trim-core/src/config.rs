//! Stage configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sequence::SequenceSpace;
use crate::{
    ANCHOR_COUNT, DEFAULT_MAX_PAYLOAD, DEFAULT_REF_ID_SPACE, DEFAULT_SEQUENCE_MODULUS,
    DEFAULT_STORE_CAPACITY,
};

/// Divisors of 10 000 tried, largest first, as the wire space multiple.
const WIRE_SPACE_FACTORS: [u64; 19] = [
    1000, 625, 500, 400, 250, 200, 125, 100, 80, 50, 40, 25, 20, 16, 10, 8, 5, 4, 2,
];

/// Errors from configuration validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Store capacity is zero
    #[error("store capacity must be non-zero")]
    ZeroCapacity,

    /// Maximum payload size is zero or exceeds the 16-bit offset range
    #[error("max payload {0} must be in 1..=65536")]
    InvalidMaxPayload(usize),

    /// SequenceId modulus does not divide evenly into store slots
    #[error("sequence modulus {modulus} is not a multiple of store capacity {capacity}")]
    ModulusNotSlotAligned {
        /// Configured modulus
        modulus: u64,
        /// Configured capacity
        capacity: usize,
    },

    /// Wire reference space does not fit the descriptor or the modulus
    #[error("ref id space {space} must fit in 32 bits, divide modulus {modulus} and exceed capacity {capacity}")]
    InvalidRefIdSpace {
        /// Configured wire space
        space: u64,
        /// Configured modulus
        modulus: u64,
        /// Configured capacity
        capacity: usize,
    },

    /// Fingerprint index limit is below the number of live records
    #[error("index limit {limit} is below the live record bound {live}")]
    IndexLimitTooSmall {
        /// Configured limit
        limit: usize,
        /// Maximum number of live records
        live: usize,
    },
}

/// Configuration for one encoder or decoder context.
///
/// All values are fixed at construction; both ends of a link must use the
/// same configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimConfig {
    /// Number of payload slots in the store
    pub store_capacity: usize,
    /// Maximum payload size in bytes (also the slot size)
    pub max_payload: usize,
    /// SequenceId modulus
    pub sequence_modulus: u64,
    /// Modulus of the reference id written into descriptors
    pub ref_id_space: u64,
    /// Fingerprint index entry limit (defaults to twice the live bound)
    pub index_limit: Option<usize>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            store_capacity: DEFAULT_STORE_CAPACITY,
            max_payload: DEFAULT_MAX_PAYLOAD,
            sequence_modulus: DEFAULT_SEQUENCE_MODULUS,
            ref_id_space: DEFAULT_REF_ID_SPACE,
            index_limit: None,
        }
    }
}

impl TrimConfig {
    /// Creates a configuration with the given store capacity, scaling the
    /// sequence and wire spaces the same way the defaults relate to the
    /// default capacity.
    ///
    /// When `capacity * 1000` does not fit the 32-bit descriptor field, the
    /// wire space shrinks to the largest `capacity * k` that does, with `k`
    /// a divisor of 10 000 and at least 2. Capacities above 2^31 have no
    /// such space and fail validation.
    pub fn with_capacity(store_capacity: usize) -> Self {
        let capacity = store_capacity as u64;
        let wire_max = u64::from(u32::MAX) + 1;
        let ref_id_space = WIRE_SPACE_FACTORS
            .iter()
            .map(|&k| capacity.saturating_mul(k))
            .find(|&space| space <= wire_max)
            .unwrap_or_else(|| capacity.saturating_mul(1_000));
        Self {
            store_capacity,
            sequence_modulus: capacity.saturating_mul(10_000),
            ref_id_space,
            ..Default::default()
        }
    }

    /// Maximum number of fingerprint records that can reference resident
    /// payloads at once.
    pub fn live_index_bound(&self) -> usize {
        self.store_capacity.saturating_mul(ANCHOR_COUNT)
    }

    /// Returns the effective fingerprint index limit.
    pub fn index_limit(&self) -> usize {
        self.index_limit
            .unwrap_or_else(|| self.live_index_bound().saturating_mul(2))
    }

    /// Returns the SequenceId space described by this configuration.
    pub fn sequence_space(&self) -> SequenceSpace {
        SequenceSpace::new(
            self.sequence_modulus,
            self.store_capacity as u64,
            self.ref_id_space,
        )
    }

    /// Checks the relationships between the configured values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.max_payload == 0 || self.max_payload > usize::from(u16::MAX) + 1 {
            return Err(ConfigError::InvalidMaxPayload(self.max_payload));
        }
        let capacity = self.store_capacity as u64;
        if self.sequence_modulus == 0 || self.sequence_modulus % capacity != 0 {
            return Err(ConfigError::ModulusNotSlotAligned {
                modulus: self.sequence_modulus,
                capacity: self.store_capacity,
            });
        }
        let space = self.ref_id_space;
        if space == 0
            || space > u64::from(u32::MAX) + 1
            || self.sequence_modulus % space != 0
            || space <= capacity
        {
            return Err(ConfigError::InvalidRefIdSpace {
                space,
                modulus: self.sequence_modulus,
                capacity: self.store_capacity,
            });
        }
        let live = self.live_index_bound();
        if self.index_limit() <= live {
            return Err(ConfigError::IndexLimitTooSmall {
                limit: self.index_limit(),
                live,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = TrimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.index_limit(), 2 * 16 * 1_000_000);
    }

    #[test]
    fn test_with_capacity_matches_default_ratios() {
        assert_eq!(TrimConfig::with_capacity(DEFAULT_STORE_CAPACITY), TrimConfig::default());
        assert!(TrimConfig::with_capacity(8).validate().is_ok());
    }

    #[test]
    fn test_with_capacity_keeps_wire_space_in_u32() {
        let config = TrimConfig::with_capacity(5_000_000);
        assert_eq!(config.ref_id_space, 3_125_000_000);
        assert!(config.validate().is_ok());

        let config = TrimConfig::with_capacity(4_294_967);
        assert_eq!(config.ref_id_space, 4_294_967_000);
        assert!(config.validate().is_ok());

        let config = TrimConfig::with_capacity(1 << 31);
        assert_eq!(config.ref_id_space, 1 << 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_misaligned_modulus() {
        let config = TrimConfig {
            store_capacity: 3,
            sequence_modulus: 10,
            ref_id_space: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ModulusNotSlotAligned { .. })
        ));
    }

    #[test]
    fn test_rejects_wire_space_beyond_u32() {
        let config = TrimConfig {
            ref_id_space: DEFAULT_SEQUENCE_MODULUS,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRefIdSpace { .. })
        ));
    }

    #[test]
    fn test_rejects_small_index_limit() {
        let config = TrimConfig {
            index_limit: Some(16),
            ..TrimConfig::with_capacity(4)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IndexLimitTooSmall { .. })
        ));
    }

    #[test]
    fn test_toml_partial_override() {
        let config: TrimConfig = toml::from_str(
            "store_capacity = 100\nsequence_modulus = 1000000\nref_id_space = 100000\n",
        )
        .unwrap();
        assert_eq!(config.store_capacity, 100);
        assert_eq!(config.max_payload, DEFAULT_MAX_PAYLOAD);
        assert!(config.validate().is_ok());
    }
}
