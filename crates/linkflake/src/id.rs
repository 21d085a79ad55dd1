use core::fmt;
use core::time::Duration;

/// A 64-bit Snowflake ID as minted for short-link records.
///
/// - 1 bit reserved (always zero, so the value also fits an `i64`)
/// - 41 bits timestamp (ms since the generator's epoch, by default
///   [`TWITTER_EPOCH`])
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21             17 16         12 11             0
///              +--------------+----------------+-----------------+-------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5)  | worker (5)  | sequence (12) |
///              +--------------+----------------+-----------------+-------------+---------------+
///              |<------------------ MSB ------------- 64 bits ------------- LSB ---------------->|
/// ```
///
/// # Example
///
/// ```
/// use linkflake::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 3, 7, 0);
/// assert_eq!(id.to_raw(), 4_194_725_888);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 3);
/// assert_eq!(id.worker_id(), 7);
/// assert_eq!(id.sequence(), 0);
/// ```
///
/// [`TWITTER_EPOCH`]: crate::TWITTER_EPOCH
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for extracting the 5-bit datacenter ID field. Occupies bits 17
    /// through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 5-bit worker ID field. Occupies bits 12
    /// through 16.
    pub const WORKER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u64 = 22;

    /// Number of bits to shift the datacenter ID to its correct position (bit
    /// 17).
    pub const DATACENTER_ID_SHIFT: u64 = 17;

    /// Number of bits to shift the worker ID to its correct position (bit 12).
    pub const WORKER_ID_SHIFT: u64 = 12;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Packs the four fields into an ID. Each value is masked to its field
    /// width.
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Wraps a raw value, e.g. a primary key read back from storage.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the packed integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Extracts the timestamp (ms since the epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the datacenter ID from the packed ID.
    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    /// Extracts the worker ID from the packed ID.
    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    pub const fn max_datacenter_id() -> u64 {
        Self::DATACENTER_ID_MASK
    }

    pub const fn max_worker_id() -> u64 {
        Self::WORKER_ID_MASK
    }

    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// Absolute Unix time (ms) at which this ID was minted, given the epoch
    /// its generator used.
    pub const fn unix_millis(&self, epoch: Duration) -> u64 {
        self.timestamp() + epoch.as_millis() as u64
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<u64> for SnowflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("raw", &format_args!("0x{:016x} ({})", self.id, self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
