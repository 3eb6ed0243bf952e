//! `hlsget inspect`: resolve an index and list what a download would fetch.

use anyhow::{Context, Result};
use hlsget_core::manifest::{IndexSource, SegmentSource};
use std::time::Duration;

pub fn run_inspect(index: &str) -> Result<()> {
    let mut source = IndexSource::new(index, Duration::from_secs(30));
    let map = source
        .resolve()
        .with_context(|| format!("resolve segment index from {}", index))?;

    println!("{} segments", map.len());
    for (i, url) in map.iter() {
        println!("{:>6}  {}", i, url);
    }
    Ok(())
}
