use core::time::Duration;
use std::{io::Write, thread, time::Instant};

use anyhow::{Context, anyhow, bail};
use linkflake::{
    LockSnowflakeGenerator, NodeIdentity, SnowflakeId, SysfsHardwareAddress, SystemClock,
    TimeSource,
};
use tracing::info;

use super::config::{AppConfig, Command};

/// Executes the configured subcommand, writing its output to `out`.
pub fn run(config: &AppConfig, out: &mut impl Write) -> anyhow::Result<()> {
    match &config.command {
        Command::Mint { count, threads } => mint(config, *count, *threads, out),
        Command::Decode { ids } => decode(config.epoch, ids, out),
        Command::Node => node(config, out),
    }
}

/// Mints `count` ids from one generator shared by `threads` threads.
///
/// Ids are printed in commit order, which for a single generator is ascending
/// numeric order.
fn mint(
    config: &AppConfig,
    count: usize,
    threads: usize,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let generator =
        LockSnowflakeGenerator::from_config(&config.node, SystemClock::with_epoch(config.epoch))
            .context("failed to resolve the node identity")?;
    let node = generator.node();
    info!(
        datacenter_id = node.datacenter_id(),
        worker_id = node.worker_id(),
        count,
        threads,
        "minting ids"
    );

    let deadline = config.deadline;
    let started = Instant::now();
    let batches = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|i| {
                let share = count / threads + usize::from(i < count % threads);
                let generator = &generator;
                s.spawn(move || mint_batch(generator, share, deadline))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| -> anyhow::Result<Vec<SnowflakeId>> {
                let batch = handle
                    .join()
                    .map_err(|_| anyhow!("minting thread panicked"))??;
                Ok(batch)
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;

    let mut ids: Vec<SnowflakeId> = batches.into_iter().flatten().collect();
    ids.sort_unstable();
    info!(elapsed = ?started.elapsed(), minted = ids.len(), "done");

    for id in ids {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

fn mint_batch<T: TimeSource>(
    generator: &LockSnowflakeGenerator<T>,
    count: usize,
    deadline: Option<Duration>,
) -> linkflake::Result<Vec<SnowflakeId>> {
    (0..count)
        .map(|_| match deadline {
            Some(deadline) => generator.next_id_with_deadline(Instant::now() + deadline),
            None => generator.next_id(),
        })
        .collect()
}

fn decode(epoch: Duration, ids: &[u64], out: &mut impl Write) -> anyhow::Result<()> {
    for &raw in ids {
        if raw >> 63 != 0 {
            bail!("{raw} is not a linkflake id: the reserved top bit is set");
        }
        let id = SnowflakeId::from_raw(raw);
        writeln!(
            out,
            "{} timestamp={} datacenter_id={} worker_id={} sequence={} unix_ms={}",
            id.to_padded_string(),
            id.timestamp(),
            id.datacenter_id(),
            id.worker_id(),
            id.sequence(),
            id.unix_millis(epoch),
        )?;
    }
    Ok(())
}

fn node(config: &AppConfig, out: &mut impl Write) -> anyhow::Result<()> {
    let identity = NodeIdentity::resolve_with(
        &config.node,
        &SysfsHardwareAddress::default(),
        &SystemClock::with_epoch(config.epoch),
    )
    .context("failed to resolve the node identity")?;

    writeln!(out, "datacenter_id={}", identity.datacenter_id())?;
    writeln!(out, "worker_id={}", identity.worker_id())?;
    Ok(())
}
