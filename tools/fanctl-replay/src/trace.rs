//! Recorded temperature traces.
//!
//! A trace is a CSV file with an `elapsed_s,temperature_c` header, one row
//! per sample, in chronological order. Logging a thermal zone with
//! `while sleep 1; do echo "$SECONDS,$(cat temp)"; done` and dividing by 1000
//! produces one.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Sample {
    pub elapsed_s: f64,
    pub temperature_c: f64,
}

pub fn load(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    read(file).with_context(|| format!("cannot parse {}", path.display()))
}

pub fn read<R: Read>(reader: R) -> Result<Vec<Sample>> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut samples: Vec<Sample> = Vec::new();
    for (index, record) in csv.deserialize::<Sample>().enumerate() {
        let sample = record.with_context(|| format!("bad sample #{}", index + 1))?;

        if let Some(previous) = samples.last() {
            if sample.elapsed_s < previous.elapsed_s {
                bail!(
                    "sample #{} goes back in time ({} s after {} s)",
                    index + 1,
                    sample.elapsed_s,
                    previous.elapsed_s
                );
            }
        }

        samples.push(sample);
    }

    Ok(samples)
}
