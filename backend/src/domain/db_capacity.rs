//! PostgreSQL parameters derived from instance memory.
//!
//! Memory values are kilobytes throughout. The parameter group renders
//! `shared_buffers`, `effective_cache_size`, and `temp_buffers` as 8 kB
//! blocks, which is the unit PostgreSQL reads them in.

use std::collections::BTreeMap;

/// Instance class used when none is configured.
pub const DEFAULT_INSTANCE_TYPE: &str = "m5.large";

const BYTES_PER_CONNECTION: u64 = 9_531_392;
const MAX_CONNECTIONS_CAP: u64 = 5_000;
const BLOCK_SIZE_KB: u64 = 8;

/// Memory of RDS instance classes in MiB, without the `db.` prefix.
const INSTANCE_MEMORY_MIB: &[(&str, u64)] = &[
    ("m5.12xlarge", 196_608),
    ("m5.16xlarge", 262_144),
    ("m5.24xlarge", 393_216),
    ("m5.2xlarge", 32_768),
    ("m5.4xlarge", 65_536),
    ("m5.8xlarge", 131_072),
    ("m5.large", 8_192),
    ("m5.xlarge", 16_384),
    ("m6g.12xlarge", 196_608),
    ("m6g.16xlarge", 262_144),
    ("m6g.2xlarge", 32_768),
    ("m6g.4xlarge", 65_536),
    ("m6g.8xlarge", 131_072),
    ("m6g.large", 8_192),
    ("m6g.xlarge", 16_384),
    ("m6i.12xlarge", 196_608),
    ("m6i.16xlarge", 262_144),
    ("m6i.24xlarge", 393_216),
    ("m6i.2xlarge", 32_768),
    ("m6i.32xlarge", 524_288),
    ("m6i.4xlarge", 65_536),
    ("m6i.8xlarge", 131_072),
    ("m6i.large", 8_192),
    ("m6i.xlarge", 16_384),
    ("m7g.12xlarge", 196_608),
    ("m7g.16xlarge", 262_144),
    ("m7g.2xlarge", 32_768),
    ("m7g.4xlarge", 65_536),
    ("m7g.8xlarge", 131_072),
    ("m7g.large", 8_192),
    ("m7g.xlarge", 16_384),
    ("r5.12xlarge", 393_216),
    ("r5.16xlarge", 524_288),
    ("r5.24xlarge", 786_432),
    ("r5.2xlarge", 65_536),
    ("r5.4xlarge", 131_072),
    ("r5.8xlarge", 262_144),
    ("r5.large", 16_384),
    ("r5.xlarge", 32_768),
    ("r6g.12xlarge", 393_216),
    ("r6g.16xlarge", 524_288),
    ("r6g.2xlarge", 65_536),
    ("r6g.4xlarge", 131_072),
    ("r6g.8xlarge", 262_144),
    ("r6g.large", 16_384),
    ("r6g.xlarge", 32_768),
    ("r6i.12xlarge", 393_216),
    ("r6i.16xlarge", 524_288),
    ("r6i.24xlarge", 786_432),
    ("r6i.2xlarge", 65_536),
    ("r6i.32xlarge", 1_048_576),
    ("r6i.4xlarge", 131_072),
    ("r6i.8xlarge", 262_144),
    ("r6i.large", 16_384),
    ("r6i.xlarge", 32_768),
    ("r7g.12xlarge", 393_216),
    ("r7g.16xlarge", 524_288),
    ("r7g.2xlarge", 65_536),
    ("r7g.4xlarge", 131_072),
    ("r7g.8xlarge", 262_144),
    ("r7g.large", 16_384),
    ("r7g.xlarge", 32_768),
    ("t3.2xlarge", 32_768),
    ("t3.large", 8_192),
    ("t3.medium", 4_096),
    ("t3.micro", 1_024),
    ("t3.small", 2_048),
    ("t3.xlarge", 16_384),
    ("t4g.2xlarge", 32_768),
    ("t4g.large", 8_192),
    ("t4g.medium", 4_096),
    ("t4g.micro", 1_024),
    ("t4g.small", 2_048),
    ("t4g.xlarge", 16_384),
];

/// The requested instance class is not in the memory table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown instance type '{instance_type}'")]
pub struct UnknownInstanceType {
    /// The class as requested, prefix included.
    pub instance_type: String,
}

/// Instance memory lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceMemory {
    mib: u64,
}

impl InstanceMemory {
    /// Look up an instance class, accepting an optional `db.` prefix.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::InstanceMemory;
    ///
    /// let memory = InstanceMemory::for_instance_type("db.m5.large").expect("known class");
    /// assert_eq!(memory.kilobytes(), 8 * 1024 * 1024);
    /// ```
    pub fn for_instance_type(instance_type: &str) -> Result<Self, UnknownInstanceType> {
        let name = instance_type.strip_prefix("db.").unwrap_or(instance_type);
        INSTANCE_MEMORY_MIB
            .binary_search_by(|(candidate, _)| candidate.cmp(&name))
            .map(|index| Self {
                mib: INSTANCE_MEMORY_MIB[index].1,
            })
            .map_err(|_| UnknownInstanceType {
                instance_type: instance_type.to_owned(),
            })
    }

    /// Every known class name, sorted.
    pub fn known_instance_types() -> impl Iterator<Item = &'static str> {
        INSTANCE_MEMORY_MIB.iter().map(|(name, _)| *name)
    }

    /// Memory in kB, the unit [`derive_database_parameters`] takes.
    pub fn kilobytes(self) -> u64 {
        self.mib * 1024
    }
}

/// Operator overrides. Overridden values feed the derivations that
/// depend on them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseParameterOverrides {
    /// Also the divisor for the derived `work_mem`.
    pub max_connections: Option<u64>,
    /// Shared buffers in kB. Feeds `work_mem` and `maintenance_work_mem`.
    pub shared_buffers_kb: Option<u64>,
    pub effective_cache_size_kb: Option<u64>,
    pub work_mem_kb: Option<u64>,
    pub maintenance_work_mem_kb: Option<u64>,
    pub max_locks_per_transaction: Option<u64>,
    pub temp_buffers_kb: Option<u64>,
    pub seq_page_cost: Option<f64>,
    pub random_page_cost: Option<f64>,
}

/// Derived PostgreSQL settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseParameters {
    /// One connection per 9,531,392 bytes of memory, capped at 5000.
    pub max_connections: u64,
    /// A quarter of instance memory.
    pub shared_buffers_kb: u64,
    /// Three quarters of instance memory.
    pub effective_cache_size_kb: u64,
    /// `shared_buffers_kb / max_connections`, rounded down.
    pub work_mem_kb: u64,
    /// A quarter of `shared_buffers_kb`.
    pub maintenance_work_mem_kb: u64,
    pub max_locks_per_transaction: u64,
    pub temp_buffers_kb: u64,
    pub seq_page_cost: f64,
    pub random_page_cost: f64,
}

/// Derive settings for an instance with `instance_memory_kb` of memory.
///
/// # Examples
/// ```
/// use stac_backend::domain::{DatabaseParameterOverrides, derive_database_parameters};
///
/// let params = derive_database_parameters(8 * 1024 * 1024, &DatabaseParameterOverrides::default());
/// assert_eq!(params.max_connections, 901);
/// assert_eq!(params.shared_buffers_kb, 2_097_152);
/// assert_eq!(params.work_mem_kb, 2_097_152 / 901);
/// ```
pub fn derive_database_parameters(
    instance_memory_kb: u64,
    overrides: &DatabaseParameterOverrides,
) -> DatabaseParameters {
    let max_connections = overrides.max_connections.unwrap_or_else(|| {
        round_ratio(u128::from(instance_memory_kb) * 1024, BYTES_PER_CONNECTION)
            .min(MAX_CONNECTIONS_CAP)
    });
    let shared_buffers_kb = overrides
        .shared_buffers_kb
        .unwrap_or_else(|| round_ratio(u128::from(instance_memory_kb), 4));
    let effective_cache_size_kb = overrides
        .effective_cache_size_kb
        .unwrap_or_else(|| round_ratio(u128::from(instance_memory_kb) * 3, 4));
    let work_mem_kb = overrides.work_mem_kb.unwrap_or_else(|| {
        shared_buffers_kb
            .checked_div(max_connections)
            .unwrap_or_default()
    });
    let maintenance_work_mem_kb = overrides
        .maintenance_work_mem_kb
        .unwrap_or_else(|| round_ratio(u128::from(shared_buffers_kb), 4));

    DatabaseParameters {
        max_connections,
        shared_buffers_kb,
        effective_cache_size_kb,
        work_mem_kb,
        maintenance_work_mem_kb,
        max_locks_per_transaction: overrides.max_locks_per_transaction.unwrap_or(1024),
        temp_buffers_kb: overrides.temp_buffers_kb.unwrap_or(128 * 1024),
        seq_page_cost: overrides.seq_page_cost.unwrap_or(1.0),
        random_page_cost: overrides.random_page_cost.unwrap_or(1.1),
    }
}

/// `numerator / denominator` rounded half away from zero, saturating at
/// `u64::MAX`. Widened so memory sizes near the top of `u64` cannot wrap.
fn round_ratio(numerator: u128, denominator: u64) -> u64 {
    let denominator = u128::from(denominator);
    u64::try_from((numerator + denominator / 2) / denominator).unwrap_or(u64::MAX)
}

impl DatabaseParameters {
    /// Render as a parameter group keyed by PostgreSQL setting name.
    pub fn to_parameter_group(&self) -> BTreeMap<String, String> {
        [
            ("max_connections", self.max_connections.to_string()),
            ("shared_buffers", (self.shared_buffers_kb / BLOCK_SIZE_KB).to_string()),
            (
                "effective_cache_size",
                (self.effective_cache_size_kb / BLOCK_SIZE_KB).to_string(),
            ),
            ("work_mem", self.work_mem_kb.to_string()),
            ("maintenance_work_mem", self.maintenance_work_mem_kb.to_string()),
            (
                "max_locks_per_transaction",
                self.max_locks_per_transaction.to_string(),
            ),
            ("temp_buffers", (self.temp_buffers_kb / BLOCK_SIZE_KB).to_string()),
            ("seq_page_cost", self.seq_page_cost.to_string()),
            ("random_page_cost", self.random_page_cost.to_string()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect()
    }
}
