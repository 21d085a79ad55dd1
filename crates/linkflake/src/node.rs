use std::{fs, path::PathBuf};

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

use crate::{Error, NodeField, Result, SnowflakeId, SystemClock, TimeSource};

/// Worker ID used when the host exposes no usable hardware address.
///
/// Fixed rather than random so that restarts of the same node keep their
/// worker ID. Every such host shares it, so deployments without distinct
/// hardware addresses should set the worker ID explicitly.
pub const FALLBACK_WORKER_ID: u64 = 1;

/// The identity of the node minting IDs: the datacenter and worker fields of
/// every [`SnowflakeId`] it produces.
///
/// Both values are range-checked on construction and immutable afterwards, so
/// a generator can share the identity without locking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIdentity {
    datacenter_id: u64,
    worker_id: u64,
}

/// Externally supplied node configuration. Unset fields are derived from the
/// host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeConfig {
    pub datacenter_id: Option<i64>,
    pub worker_id: Option<i64>,
}

impl NodeIdentity {
    /// Builds an identity from explicit values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either value is outside `0..=31`.
    pub fn new(datacenter_id: i64, worker_id: i64) -> Result<Self> {
        Ok(Self {
            datacenter_id: check_range(
                NodeField::DatacenterId,
                datacenter_id,
                SnowflakeId::max_datacenter_id(),
            )?,
            worker_id: check_range(NodeField::WorkerId, worker_id, SnowflakeId::max_worker_id())?,
        })
    }

    /// Resolves the identity of this host.
    ///
    /// The worker ID is derived from the first non-loopback network interface
    /// (see [`SysfsHardwareAddress`]), the datacenter ID is
    /// `explicit_datacenter_id` when given and a best-effort clock-derived
    /// value otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `explicit_datacenter_id` is outside
    /// `0..=31`.
    pub fn resolve(explicit_datacenter_id: Option<i64>) -> Result<Self> {
        let config = NodeConfig {
            datacenter_id: explicit_datacenter_id,
            worker_id: None,
        };
        Self::resolve_with(
            &config,
            &SysfsHardwareAddress::default(),
            &SystemClock::default(),
        )
    }

    /// Resolves an identity from `config`, deriving unset fields from
    /// `hardware` and `time`.
    ///
    /// - worker ID: explicit value, else the folded hardware address modulo
    ///   32, else [`FALLBACK_WORKER_ID`].
    /// - datacenter ID: explicit value, else the low five bits of the current
    ///   time. The latter differs between restarts and only exists so a node
    ///   can start without configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if an explicit value is outside
    /// `0..=31`.
    pub fn resolve_with(
        config: &NodeConfig,
        hardware: &impl HardwareAddressSource,
        time: &impl TimeSource,
    ) -> Result<Self> {
        let worker_id = match config.worker_id {
            Some(worker_id) => worker_id,
            None => derive_worker_id(hardware) as i64,
        };

        let datacenter_id = match config.datacenter_id {
            Some(datacenter_id) => datacenter_id,
            None => {
                let derived = time.current_millis() & SnowflakeId::max_datacenter_id();
                #[cfg(feature = "tracing")]
                warn!(
                    datacenter_id = derived,
                    "no datacenter id configured, derived one from the clock"
                );
                derived as i64
            }
        };

        let identity = Self::new(datacenter_id, worker_id)?;
        #[cfg(feature = "tracing")]
        debug!(
            datacenter_id = identity.datacenter_id,
            worker_id = identity.worker_id,
            "resolved node identity"
        );
        Ok(identity)
    }

    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }
}

fn check_range(field: NodeField, value: i64, max: u64) -> Result<u64> {
    u64::try_from(value)
        .ok()
        .filter(|value| *value <= max)
        .ok_or(Error::Configuration { field, value, max })
}

fn derive_worker_id(hardware: &impl HardwareAddressSource) -> u64 {
    match hardware.hardware_address() {
        Some(address) => {
            let worker_id = worker_id_from_address(&address);
            #[cfg(feature = "tracing")]
            debug!(worker_id, "derived worker id from hardware address");
            worker_id
        }
        None => {
            #[cfg(feature = "tracing")]
            warn!(
                worker_id = FALLBACK_WORKER_ID,
                "no hardware address available, using the fallback worker id; \
                 nodes without one collide unless a worker id is configured"
            );
            FALLBACK_WORKER_ID
        }
    }
}

/// Folds address bytes big-endian into an integer and reduces it to the
/// worker ID range.
///
/// ```
/// use linkflake::worker_id_from_address;
///
/// assert_eq!(worker_id_from_address(&[0x02, 0x42, 0xac, 0x11, 0x00, 0x27]), 7);
/// ```
pub fn worker_id_from_address(address: &[u8]) -> u64 {
    let folded = address
        .iter()
        .fold(0u64, |acc, byte| (acc << 8).wrapping_add(u64::from(*byte)));
    folded % (SnowflakeId::max_worker_id() + 1)
}

/// A source of a stable link-layer address for this host.
pub trait HardwareAddressSource {
    /// Returns the address bytes, or `None` if the host has no usable address.
    fn hardware_address(&self) -> Option<Vec<u8>>;
}

impl<F> HardwareAddressSource for F
where
    F: Fn() -> Option<Vec<u8>>,
{
    fn hardware_address(&self) -> Option<Vec<u8>> {
        self()
    }
}

/// Reads MAC addresses from `/sys/class/net/<iface>/address`.
///
/// Interfaces are visited in name order, skipping `lo` and all-zero
/// addresses; the first parsable address wins. Hosts without sysfs (non-Linux,
/// restricted sandboxes) yield `None`.
#[derive(Clone, Debug)]
pub struct SysfsHardwareAddress {
    root: PathBuf,
}

impl Default for SysfsHardwareAddress {
    fn default() -> Self {
        Self::with_root("/sys/class/net")
    }
}

impl SysfsHardwareAddress {
    /// Reads interfaces below `root` instead of `/sys/class/net`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl HardwareAddressSource for SysfsHardwareAddress {
    fn hardware_address(&self) -> Option<Vec<u8>> {
        let mut interfaces: Vec<_> = fs::read_dir(&self.root)
            .ok()?
            .filter_map(|entry| entry.ok().map(|entry| entry.file_name()))
            .filter(|name| name != "lo")
            .collect();
        interfaces.sort();

        interfaces.into_iter().find_map(|name| {
            let raw = fs::read_to_string(self.root.join(&name).join("address")).ok()?;
            parse_mac(raw.trim())
        })
    }
}

fn parse_mac(raw: &str) -> Option<Vec<u8>> {
    let bytes = raw
        .split(':')
        .map(|octet| u8::from_str_radix(octet, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    if bytes.iter().all(|byte| *byte == 0) {
        return None;
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    struct FixedTime(u64);

    impl TimeSource for FixedTime {
        fn current_millis(&self) -> u64 {
            self.0
        }
    }

    fn no_address() -> Option<Vec<u8>> {
        None
    }

    #[test]
    fn new_accepts_full_range() {
        let node = NodeIdentity::new(0, 31).unwrap();
        assert_eq!(node.datacenter_id(), 0);
        assert_eq!(node.worker_id(), 31);

        let node = NodeIdentity::new(31, 0).unwrap();
        assert_eq!(node.datacenter_id(), 31);
        assert_eq!(node.worker_id(), 0);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert_eq!(
            NodeIdentity::new(32, 0),
            Err(Error::Configuration {
                field: NodeField::DatacenterId,
                value: 32,
                max: 31
            })
        );
        assert_eq!(
            NodeIdentity::new(-1, 0),
            Err(Error::Configuration {
                field: NodeField::DatacenterId,
                value: -1,
                max: 31
            })
        );
        assert_eq!(
            NodeIdentity::new(0, 32),
            Err(Error::Configuration {
                field: NodeField::WorkerId,
                value: 32,
                max: 31
            })
        );
    }

    #[test]
    fn explicit_datacenter_out_of_range_is_rejected() {
        for bad in [32, -1, i64::MAX, i64::MIN] {
            let config = NodeConfig {
                datacenter_id: Some(bad),
                worker_id: None,
            };
            let err = NodeIdentity::resolve_with(&config, &no_address, &FixedTime(0)).unwrap_err();
            assert!(
                matches!(
                    err,
                    Error::Configuration {
                        field: NodeField::DatacenterId,
                        ..
                    }
                ),
                "{bad}: {err}"
            );
        }
        assert!(NodeIdentity::resolve(Some(32)).is_err());
        assert!(NodeIdentity::resolve(Some(-1)).is_err());
    }

    #[test]
    fn worker_id_folds_address_bytes() {
        // 0x0242ac110027 % 32 == 0x27 % 32 == 7
        let mac = [0x02, 0x42, 0xac, 0x11, 0x00, 0x27];
        assert_eq!(worker_id_from_address(&mac), 7);
        assert_eq!(worker_id_from_address(&[0xff]), 31);
        assert_eq!(worker_id_from_address(&[]), 0);
        // Long addresses wrap instead of overflowing.
        assert!(worker_id_from_address(&[0xff; 20]) <= 31);
    }

    #[test]
    fn resolve_with_derives_from_hardware_and_explicit_datacenter() {
        let config = NodeConfig {
            datacenter_id: Some(3),
            worker_id: None,
        };
        let hardware = || Some(vec![0x02, 0x42, 0xac, 0x11, 0x00, 0x27]);
        let node = NodeIdentity::resolve_with(&config, &hardware, &FixedTime(0)).unwrap();
        assert_eq!(node, NodeIdentity::new(3, 7).unwrap());
    }

    #[test]
    fn resolve_with_falls_back_without_hardware_address() {
        let node =
            NodeIdentity::resolve_with(&NodeConfig::default(), &no_address, &FixedTime(0x45))
                .unwrap();
        assert_eq!(node.worker_id(), FALLBACK_WORKER_ID);
        // 0x45 & 0x1f
        assert_eq!(node.datacenter_id(), 5);
    }

    #[test]
    fn explicit_worker_id_wins_over_hardware() {
        let config = NodeConfig {
            datacenter_id: Some(1),
            worker_id: Some(30),
        };
        let hardware = || Some(vec![0x00, 0x01]);
        let node = NodeIdentity::resolve_with(&config, &hardware, &FixedTime(0)).unwrap();
        assert_eq!(node.worker_id(), 30);

        let config = NodeConfig {
            datacenter_id: Some(1),
            worker_id: Some(40),
        };
        assert!(NodeIdentity::resolve_with(&config, &hardware, &FixedTime(0)).is_err());
    }

    #[test]
    fn parse_mac_rejects_garbage_and_zero() {
        assert_eq!(parse_mac("02:42:ac:11:00:27"), Some(vec![2, 0x42, 0xac, 0x11, 0, 0x27]));
        assert_eq!(parse_mac("00:00:00:00:00:00"), None);
        assert_eq!(parse_mac(""), None);
        assert_eq!(parse_mac("zz:00"), None);
    }

    #[test]
    fn sysfs_source_skips_loopback_and_sorts_interfaces() {
        let root = std::env::temp_dir().join(format!("linkflake-sysfs-{}", process::id()));
        let _ = fs::remove_dir_all(&root);
        for (iface, address) in [
            ("lo", "00:00:00:00:00:00\n"),
            ("eth1", "02:00:00:00:00:02\n"),
            ("eth0", "02:00:00:00:00:01\n"),
            ("dummy0", "00:00:00:00:00:00\n"),
        ] {
            fs::create_dir_all(root.join(iface)).unwrap();
            fs::write(root.join(iface).join("address"), address).unwrap();
        }

        let source = SysfsHardwareAddress::with_root(&root);
        assert_eq!(source.hardware_address(), Some(vec![2, 0, 0, 0, 0, 1]));

        fs::remove_dir_all(&root).unwrap();
        assert_eq!(source.hardware_address(), None);
    }
}
