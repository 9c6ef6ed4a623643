use anyhow::{bail, Context, Result};
use blockdelta::partition::{RangeState, SharedRangeTracker};
use blockdelta::reconstruct::FileReconstructor;
use blockdelta::sync::{BlockFingerprintBuilder, BlockMatcher, DeltaConfig};
use std::fs::File;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    blockdelta::metrics::init_metrics();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: blockdelta <reference> <candidate> [block_length]");
    }
    let reference = PathBuf::from(&args[1]);
    let candidate = PathBuf::from(&args[2]);

    let mut config = DeltaConfig::default();
    if let Some(block_length) = args.get(3) {
        config = config.block_length(
            block_length
                .parse()
                .context("block length must be a positive integer")?,
        );
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    // Fingerprint the reference and scan the candidate off the async runtime
    let (record, matches) = {
        let cancel = cancel.clone();
        let reference = reference.clone();
        let candidate = candidate.clone();

        tokio::task::spawn_blocking(move || -> Result<_> {
            let mut file = File::open(&reference)
                .with_context(|| format!("opening {}", reference.display()))?;
            let record = BlockFingerprintBuilder::from_config(&config)?
                .build_from_reader(&mut file, &cancel)?;

            let mut file = File::open(&candidate)
                .with_context(|| format!("opening {}", candidate.display()))?;
            let matches = BlockMatcher::new(&record)?.match_reader(&mut file, &cancel)?;
            Ok((record, matches))
        })
        .await??
    };

    println!(
        "Reference: {} bytes, {} blocks of {} bytes ({} {})",
        record.stream_length,
        record.block_count(),
        record.block_length,
        record.algorithm,
        hex::encode(&record.stream_digest)
    );
    println!("Candidate: {} matching blocks", matches.len());

    let output = PathBuf::from(format!("{}.partial", reference.display()));
    let tracker = SharedRangeTracker::new(record.stream_length);
    let report = FileReconstructor::for_record(&record)?
        .with_cancellation(cancel)
        .reconstruct_file(matches, candidate, output.clone(), tracker.clone())
        .await?;

    let needed = tracker.count(RangeState::Needed);
    println!(
        "Reconstructed {} bytes into {} ({} matches applied{})",
        report.bytes_copied,
        output.display(),
        report.matches_applied,
        if report.cancelled { ", cancelled" } else { "" }
    );
    if tracker.is_completed() {
        println!("Complete: nothing left to fetch");
    } else {
        println!(
            "Still needed: {} bytes in {} ranges",
            needed,
            tracker.with(|t| t
                .ranges()
                .filter(|(_, state)| *state == RangeState::Needed)
                .count())
        );
    }

    Ok(())
}
