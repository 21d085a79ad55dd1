use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::bail;
use clap::{Parser, Subcommand};
use linkflake::{NodeConfig, SnowflakeId, TWITTER_EPOCH};

/// Command line arguments for the `linkflake` binary.
///
/// Node settings can come from flags, the environment or a `.env` file in the
/// working directory. Unset node ids are derived from the host.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "linkflake",
    version,
    about = "Mint and inspect Snowflake-style primary keys"
)]
pub struct CliArgs {
    /// Explicit datacenter id, `0..=31`.
    ///
    /// When unset, a value is derived from the clock. That value changes
    /// between restarts, so production nodes should always set it.
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", allow_negative_numbers = true)]
    pub datacenter_id: Option<i64>,

    /// Explicit worker id, `0..=31`.
    ///
    /// When unset, the worker id is derived from the first network interface's
    /// hardware address.
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", allow_negative_numbers = true)]
    pub worker_id: Option<i64>,

    /// Epoch of the timestamp field, in milliseconds since 1970-01-01 UTC.
    ///
    /// Every node sharing an id space must use the same value.
    ///
    /// Environment variable: `EPOCH_MS`
    #[arg(long, env = "EPOCH_MS", default_value_t = TWITTER_EPOCH.as_millis() as u64)]
    pub epoch_ms: u64,

    /// Give up on an id after waiting this long for the clock.
    ///
    /// Only applies to clock rollbacks and exhausted sequences; without it a
    /// large rollback blocks until the clock catches up.
    ///
    /// Environment variable: `DEADLINE_MS`
    #[arg(long, env = "DEADLINE_MS")]
    pub deadline_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Mint ids and print one per line.
    Mint {
        /// Number of ids to mint.
        #[arg(short, long, default_value_t = 1)]
        count: usize,

        /// Number of threads sharing one generator.
        #[arg(short, long, default_value_t = 1)]
        threads: usize,
    },
    /// Print the fields of existing ids.
    Decode {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Print the node identity this host resolves to.
    Node,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub node: NodeConfig,
    pub epoch: Duration,
    pub deadline: Option<Duration>,
    pub command: Command,
}

impl TryFrom<CliArgs> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64);

        if args.epoch_ms > now_ms {
            bail!(
                "EPOCH_MS ({}) is in the future (now = {})",
                args.epoch_ms,
                now_ms
            );
        }

        if now_ms - args.epoch_ms > SnowflakeId::max_timestamp() {
            bail!(
                "EPOCH_MS ({}) is too far in the past: the 41-bit timestamp field is exhausted",
                args.epoch_ms
            );
        }

        if let Command::Mint { count, threads } = args.command {
            if count == 0 {
                bail!("--count must be greater than 0");
            }
            if threads == 0 {
                bail!("--threads must be greater than 0");
            }
            if threads > count {
                bail!("--threads ({threads}) exceeds --count ({count})");
            }
        }

        if args.deadline_ms == Some(0) {
            bail!("DEADLINE_MS must be greater than 0");
        }

        Ok(Self {
            node: NodeConfig {
                datacenter_id: args.datacenter_id,
                worker_id: args.worker_id,
            },
            epoch: Duration::from_millis(args.epoch_ms),
            deadline: args.deadline_ms.map(Duration::from_millis),
            command: args.command,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(core::iter::once("linkflake").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let args = parse(&["mint"]);
        assert_eq!(args.epoch_ms, 1_288_834_974_657);
        assert_eq!(args.datacenter_id, None);
        assert_eq!(args.deadline_ms, None);

        let config = AppConfig::try_from(args).unwrap();
        assert_eq!(config.node, NodeConfig::default());
        assert_eq!(config.epoch, TWITTER_EPOCH);
        assert_eq!(
            config.command,
            Command::Mint {
                count: 1,
                threads: 1
            }
        );
    }

    #[test]
    fn node_flags_are_passed_through() {
        let args = parse(&[
            "--datacenter-id",
            "3",
            "--worker-id",
            "7",
            "--deadline-ms",
            "50",
            "node",
        ]);
        let config = AppConfig::try_from(args).unwrap();
        assert_eq!(
            config.node,
            NodeConfig {
                datacenter_id: Some(3),
                worker_id: Some(7),
            }
        );
        assert_eq!(config.deadline, Some(Duration::from_millis(50)));
        assert_eq!(config.command, Command::Node);
    }

    #[test]
    fn out_of_range_node_ids_reach_the_library() {
        // Range checks belong to `NodeIdentity`; the CLI only forwards.
        let args = parse(&["--datacenter-id", "-1", "node"]);
        let config = AppConfig::try_from(args).unwrap();
        assert_eq!(config.node.datacenter_id, Some(-1));
    }

    #[test]
    fn rejects_zero_count() {
        let args = parse(&["mint", "--count", "0"]);
        assert!(AppConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_zero_threads() {
        let args = parse(&["mint", "--count", "10", "--threads", "0"]);
        assert!(AppConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_more_threads_than_ids() {
        let args = parse(&["mint", "--count", "2", "--threads", "4"]);
        assert!(AppConfig::try_from(args).is_err());
    }

    #[test]
    fn rejects_future_epoch() {
        let args = parse(&["--epoch-ms", "99999999999999", "node"]);
        let err = AppConfig::try_from(args).unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn rejects_zero_deadline() {
        let args = parse(&["--deadline-ms", "0", "mint"]);
        assert!(AppConfig::try_from(args).is_err());
    }

    #[test]
    fn decode_requires_ids() {
        assert!(CliArgs::try_parse_from(["linkflake", "decode"]).is_err());
        let args = parse(&["decode", "4194725888", "1"]);
        assert_eq!(
            args.command,
            Command::Decode {
                ids: vec![4_194_725_888, 1]
            }
        );
    }
}
