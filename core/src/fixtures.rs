//! Deterministic in-memory granules shared by the unit tests.

use crate::source::{BeamSource, Dataset, Entry, LvisL2Table, MemoryBeamGroup, MemoryGranule};
use crate::waveform::{GediSources, LvisSources, LVIS_SHOT_FIELD};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, OnceLock};
use std::thread::{self, ThreadId};

pub const SAMPLES_PER_SHOT: usize = 200;
pub const ELEV_TOP: f64 = 140.0;
pub const ELEV_BOTTOM: f64 = 110.0;
pub const ELEV_GROUND: f64 = 115.0;
pub const MEAN_NOISE: f64 = 10.0;
pub const CANOPY_TOP: f64 = 18.0;
pub const LVIS_LFID: i64 = 1_552_301;
pub const BEAM: &str = "BEAM0000";

fn gauss(x: f64, mu: f64, sd: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sd * sd)).exp()
}

/// Small repeatable ripple standing in for detector noise.
fn ripple(i: usize) -> f64 {
    ((i * 37) % 11) as f64 / 10.0 - 0.5
}

/// Height above ground of each bin of the synthetic waveform.
pub fn heights() -> Vec<f64> {
    let step = (ELEV_TOP - ELEV_BOTTOM) / (SAMPLES_PER_SHOT - 1) as f64;
    (0..SAMPLES_PER_SHOT)
        .map(|i| ELEV_TOP - step * i as f64 - ELEV_GROUND)
        .collect()
}

/// Noise floor plus a ground peak at 0 m and a canopy layer around 12 m.
pub fn canopy_waveform() -> Vec<f64> {
    heights()
        .iter()
        .enumerate()
        .map(|(i, &h)| MEAN_NOISE + ripple(i) + 120.0 * gauss(h, 0.0, 0.9) + 60.0 * gauss(h, 12.0, 3.0))
        .collect()
}

/// Relative heights RH0..RH100 ending at the canopy top.
pub fn rh_row() -> Vec<f64> {
    (0..=100)
        .map(|i| -2.0 + (CANOPY_TOP + 2.0) * i as f64 / 100.0)
        .collect()
}

fn repeat<T: Clone>(value: T, n: usize) -> Vec<T> {
    vec![value; n]
}

pub fn l1b_beam(shots: &[i64]) -> Entry {
    let n = shots.len();
    let rx: Vec<f64> = (0..n).flat_map(|_| canopy_waveform()).collect();
    let starts: Vec<i64> = (0..n).map(|i| (i * SAMPLES_PER_SHOT) as i64 + 1).collect();
    let build = || -> crate::prelude::NmbimResult<Entry> {
        Entry::default()
            .with("shot_number", Dataset::int1(shots.to_vec()))?
            .with(
                "geolocation/longitude_bin0",
                Dataset::float1((0..n).map(|i| -120.0 + 0.001 * i as f64).collect()),
            )?
            .with(
                "geolocation/latitude_bin0",
                Dataset::float1((0..n).map(|i| 38.0 + 0.001 * i as f64).collect()),
            )?
            .with("geolocation/elevation_bin0", Dataset::float1(repeat(ELEV_TOP, n)))?
            .with("geolocation/elevation_lastbin", Dataset::float1(repeat(ELEV_BOTTOM, n)))?
            .with(
                "geolocation/delta_time",
                Dataset::float1((0..n).map(|i| 1.3e8 + i as f64 * 0.02).collect()),
            )?
            .with("rx_sample_start_index", Dataset::int1(starts))?
            .with("rx_sample_count", Dataset::int1(repeat(SAMPLES_PER_SHOT as i64, n)))?
            .with("rxwaveform", Dataset::float1(rx))?
            .with("noise_mean_corrected", Dataset::float1(repeat(MEAN_NOISE, n)))
    };
    build().expect("l1b fixture")
}

pub fn l2a_beam(shots: &[i64]) -> Entry {
    let n = shots.len();
    let rh: Vec<f64> = (0..n).flat_map(|_| rh_row()).collect();
    let build = || -> crate::prelude::NmbimResult<Entry> {
        Entry::default()
            .with("shot_number", Dataset::int1(shots.to_vec()))?
            .with("quality_flag", Dataset::int1(repeat(1, n)))?
            .with("surface_flag", Dataset::int1(repeat(1, n)))?
            .with("num_detectedmodes", Dataset::int1(repeat(2, n)))?
            .with("elev_lowestmode", Dataset::float1(repeat(ELEV_GROUND, n)))?
            .with("rh", Dataset::float2(n, 101, rh)?)?
            .with("land_cover_data/modis_treecover", Dataset::float1(repeat(45.0, n)))?
            .with("land_cover_data/modis_nonvegetated", Dataset::float1(repeat(5.0, n)))?
            .with("land_cover_data/landsat_treecover", Dataset::float1(repeat(50.0, n)))
    };
    build().expect("l2a fixture")
}

pub fn l4a_beam(shots: &[i64]) -> Entry {
    let n = shots.len();
    Entry::default()
        .with("shot_number", Dataset::int1(shots.to_vec()))
        .and_then(|entry| entry.with("agbd", Dataset::float1(repeat(85.5, n))))
        .and_then(|entry| entry.with("l4_quality_flag", Dataset::int1(repeat(1, n))))
        .expect("l4a fixture")
}

fn source(path: &str, beam: Entry, cache: bool, shot_field: &str) -> BeamSource {
    let group = Box::new(MemoryBeamGroup::new(path, BEAM, beam));
    BeamSource::open(group, cache, shot_field).expect("fixture source")
}

/// L1B over `l1_shots`; L2A and L4A over `l2_shots`.
pub fn gedi_sources(l1_shots: &[i64], l2_shots: &[i64], cache: bool) -> GediSources {
    GediSources::new(
        source("l1b.h5", l1b_beam(l1_shots), cache, "shot_number"),
        source("l2a.h5", l2a_beam(l2_shots), cache, "shot_number"),
        Some(source("l4a.h5", l4a_beam(l2_shots), cache, "shot_number")),
    )
}

/// L1B, L2A and L4A granules holding the same shots on every beam.
pub fn gedi_granules(beams: &[&str], shots: &[i64]) -> (MemoryGranule, MemoryGranule, MemoryGranule) {
    let mut l1b = MemoryGranule::new("l1b.h5").with_beam("METADATA", Entry::default());
    let mut l2a = MemoryGranule::new("l2a.h5");
    let mut l4a = MemoryGranule::new("l4a.h5");
    for beam in beams {
        l1b = l1b.with_beam(*beam, l1b_beam(shots));
        l2a = l2a.with_beam(*beam, l2a_beam(shots));
        l4a = l4a.with_beam(*beam, l4a_beam(shots));
    }
    (l1b, l2a, l4a)
}

pub fn lvis_l1_beam(shots: &[i64]) -> Entry {
    let n = shots.len();
    let rx: Vec<f64> = (0..n).flat_map(|_| canopy_waveform()).collect();
    let tx: Vec<f64> = (0..n).flat_map(|_| (0..8).map(|i| gauss(i as f64, 4.0, 1.0))).collect();
    let build = || -> crate::prelude::NmbimResult<Entry> {
        Entry::default()
            .with(LVIS_SHOT_FIELD, Dataset::int1(shots.to_vec()))?
            .with("LFID", Dataset::int1(repeat(LVIS_LFID, n)))?
            .with("LON0", Dataset::float1(repeat(-72.0, n)))?
            .with("LAT0", Dataset::float1(repeat(43.0, n)))?
            .with("Z0", Dataset::float1(repeat(ELEV_TOP, n)))?
            .with("LON1023", Dataset::float1(repeat(-72.0002, n)))?
            .with("LAT1023", Dataset::float1(repeat(43.0002, n)))?
            .with("Z1023", Dataset::float1(repeat(ELEV_BOTTOM, n)))?
            .with("TIME", Dataset::float1((0..n).map(|i| 5000.0 + i as f64).collect()))?
            .with("AZIMUTH", Dataset::float1(repeat(12.0, n)))?
            .with("INCIDENTANGLE", Dataset::float1(repeat(1.5, n)))?
            .with("RANGE", Dataset::float1(repeat(9000.0, n)))?
            .with("SIGMEAN", Dataset::float1(repeat(MEAN_NOISE, n)))?
            .with("RXWAVE", Dataset::float2(n, SAMPLES_PER_SHOT, rx)?)?
            .with("TXWAVE", Dataset::float2(n, 8, tx)?)
    };
    build().expect("lvis l1 fixture")
}

pub fn lvis_l2_text(shots: &[i64]) -> String {
    let mut text = String::from("# LVIS L2 synthetic\n# LFID SHOTNUMBER TIME ZG ZH ZT RH50 RH75 RH90 RH95 RH100\n");
    for shot in shots {
        text.push_str(&format!(
            "{} {} 5000.0 {} {} {} 6.0 9.0 12.0 14.0 {}\n",
            LVIS_LFID,
            shot,
            ELEV_GROUND,
            ELEV_GROUND + CANOPY_TOP,
            ELEV_GROUND + CANOPY_TOP + 0.5,
            CANOPY_TOP
        ));
    }
    text
}

pub fn lvis_sources(l1_shots: &[i64], l2_shots: &[i64], cache: bool) -> LvisSources {
    let l2 = LvisL2Table::parse("l2.txt", lvis_l2_text(l2_shots).as_bytes()).expect("l2 fixture");
    LvisSources::new(source("l1.h5", lvis_l1_beam(l1_shots), cache, LVIS_SHOT_FIELD), l2)
}

/// Warn-level records, tagged with the emitting thread so parallel tests
/// only see their own.
struct WarnCapture;

static WARNINGS: OnceLock<Mutex<Vec<(ThreadId, String)>>> = OnceLock::new();
static CAPTURE: WarnCapture = WarnCapture;

impl Log for WarnCapture {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Some(warnings) = WARNINGS.get() {
            let mut guard = warnings.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.push((thread::current().id(), format!("{}", record.args())));
        }
    }

    fn flush(&self) {}
}

/// Runs `f` and returns its result with the warnings it logged on this thread.
pub fn capture_warnings<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let warnings = WARNINGS.get_or_init(|| Mutex::new(Vec::new()));
    let _ = log::set_logger(&CAPTURE);
    log::set_max_level(LevelFilter::Warn);
    let me = thread::current().id();
    let drain = || {
        let mut guard = warnings.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (mine, rest): (Vec<_>, Vec<_>) = guard.drain(..).partition(|(id, _)| *id == me);
        *guard = rest;
        mine.into_iter().map(|(_, message)| message).collect::<Vec<_>>()
    };
    drain();
    let result = f();
    (result, drain())
}
