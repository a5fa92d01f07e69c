//! Ad record aggregation with record/replay of the reduce phase
//!
//! Runs a small in-process MapReduce over synthetic ad-view records,
//! summing clicks and revenue per view id. Pass the recorder mode as the
//! first argument:
//!
//! ```text
//! cargo run --example ad_records -- record ad_records.rlog
//! cargo run --example ad_records -- replay ad_records.rlog
//! ```
//!
//! In replay mode the reduce phase reads the recorded groups instead of
//! the freshly shuffled ones, so a reduce bug that depends on value order
//! shows up the same way on every run.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use rewind_core::prelude::*;

const WORKERS: usize = 4;
const STATES: [&str; 10] = ["AL", "AK", "AZ", "CA", "CO", "DE", "FL", "NY", "TX", "WA"];

#[derive(Debug, Clone, Default, PartialEq)]
struct AdRecord {
    view_id: String,
    state: String,
    ad_id: String,
    clicks: u64,
    revenue: f64,
}

impl Codec for AdRecord {
    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        self.view_id.encode(w)?;
        self.state.encode(w)?;
        self.ad_id.encode(w)?;
        self.clicks.encode(w)?;
        self.revenue.encode(w)
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(AdRecord {
            view_id: String::decode(r)?,
            state: String::decode(r)?,
            ad_id: String::decode(r)?,
            clicks: u64::decode(r)?,
            revenue: f64::decode(r)?,
        })
    }
}

/// Deterministic pseudo-random input, so record and replay runs see the same data.
fn generate_input(views: usize) -> Vec<String> {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    let mut lines = Vec::new();
    for _ in 0..views {
        let view_id = format!("{:08X}", next() as u32 | 0x1000_0000);
        let state = STATES[(next() % STATES.len() as u64) as usize];
        let ad_id = format!("{:4}", next() % 10_000);
        for _ in 0..(next() % 20) {
            let clicks = next() % 10;
            let revenue = (next() % 10_000) as f64 / 100.0;
            lines.push(format!("{view_id}\t{state}\t{ad_id}\t{clicks}\t{revenue}"));
        }
    }
    lines
}

fn parse(line: &str) -> Option<AdRecord> {
    let mut parts = line.split('\t');
    Some(AdRecord {
        view_id: parts.next()?.to_string(),
        state: parts.next()?.to_string(),
        ad_id: parts.next()?.to_string(),
        clicks: parts.next()?.parse().ok()?,
        revenue: parts.next()?.parse().ok()?,
    })
}

fn reduce(values: ValueView<'_, std::vec::IntoIter<AdRecord>>) -> AdRecord {
    values.fold(AdRecord::default(), |mut acc, v| {
        acc.view_id = v.view_id;
        acc.state = v.state;
        acc.ad_id = v.ad_id;
        acc.clicks += v.clicks;
        acc.revenue += v.revenue;
        acc
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "passthrough".to_string());
    let log_path = args.next().unwrap_or_else(|| "ad_records.rlog".to_string());
    let recorder_config = match mode.as_str() {
        "passthrough" => RecorderConfig::passthrough(),
        "record" => RecorderConfig::record(&log_path),
        "replay" => RecorderConfig::replay(&log_path),
        other => anyhow::bail!("unknown mode '{other}', expected passthrough|record|replay"),
    };

    let config = ConfigBuilder::new().recorder(recorder_config).build()?;
    let tracer = EventTracer::open(&config.trace)?;
    let recorder = ReduceRecorder::<String, AdRecord>::open(&config.recorder)?;

    let input = generate_input(1000);
    println!("Input has {} records", input.len());

    // Map: each worker parses a chunk into its own partition
    tracer.master("map_phase_begin");
    let chunk_size = input.len().div_ceil(WORKERS).max(1);
    let shuffled: Mutex<HashMap<String, Vec<AdRecord>>> = Mutex::new(HashMap::new());
    std::thread::scope(|s| {
        for (worker, chunk) in input.chunks(chunk_size).enumerate() {
            let tracer = &tracer;
            let shuffled = &shuffled;
            s.spawn(move || {
                tracer.map(worker, worker, "begin");
                let mut local: HashMap<String, Vec<AdRecord>> = HashMap::new();
                for record in chunk.iter().filter_map(|line| parse(line)) {
                    local.entry(record.view_id.clone()).or_default().push(record);
                }
                // Merge order depends on which worker finishes first
                tracer.merge(worker, worker, "begin");
                let mut global = shuffled.lock();
                for (key, mut values) in local {
                    global.entry(key).or_default().append(&mut values);
                }
                tracer.map(worker, worker, "end");
            });
        }
    });
    tracer.master("map_phase_end");

    // Reduce: workers pull keys from a shared counter
    let groups: Vec<(String, Vec<AdRecord>)> = shuffled.into_inner().into_iter().collect();
    let next_group = AtomicUsize::new(0);
    let results = Mutex::new(Vec::with_capacity(groups.len()));
    tracer.master("reduce_phase_begin");
    std::thread::scope(|s| {
        for worker in 0..WORKERS {
            let (tracer, recorder) = (&tracer, &recorder);
            let (groups, next_group, results) = (&groups, &next_group, &results);
            s.spawn(move || {
                tracer.worker(worker, "reduce_begin");
                loop {
                    let i = next_group.fetch_add(1, Ordering::Relaxed);
                    let Some((key, values)) = groups.get(i) else {
                        break;
                    };
                    tracer.reduce(worker, key, "begin");
                    let mut live = values.clone().into_iter();
                    let total = reduce(recorder.get_sequence(key, &mut live));
                    results.lock().push(total);
                    tracer.reduce(worker, key, "end");
                }
                tracer.worker(worker, "reduce_end");
            });
        }
    });
    tracer.master("reduce_phase_end");

    let mut results = results.into_inner();
    results.sort_by(|a, b| a.view_id.cmp(&b.view_id));
    for r in results.iter().take(10) {
        println!(
            "{}\t{}\t{}\t{}\t{:.2}",
            r.view_id, r.state, r.ad_id, r.clicks, r.revenue
        );
    }
    println!("{} view ids reduced in {} mode", results.len(), recorder.mode());

    recorder.finish()?;
    tracer.close()?;
    Ok(())
}
