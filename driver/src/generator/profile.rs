use crate::workflow::inputs::{GranuleSet, LvisInputs};
use anyhow::Context;
use nmbimcore::source::{Dataset, Entry, LvisL2Table, MemoryGranule};
use nmbimcore::waveform::LVIS_SHOT_FIELD;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The eight GEDI beam group names.
pub const GEDI_BEAMS: [&str; 8] = [
    "BEAM0000", "BEAM0001", "BEAM0010", "BEAM0011", "BEAM0101", "BEAM0110", "BEAM1000", "BEAM1011",
];

/// Configuration for generating synthetic GEDI granules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub beams: Vec<String>,
    pub shots_per_beam: usize,
    pub samples: usize,
    /// Vertical extent of one sample, in metres.
    pub sample_spacing: f64,
    pub mean_noise: f64,
    pub noise: f64,
    pub seed: u64,
    pub with_l4a: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            beams: GEDI_BEAMS.iter().map(|b| b.to_string()).collect(),
            shots_per_beam: 32,
            samples: 600,
            sample_spacing: 0.15,
            mean_noise: 230.0,
            noise: 2.0,
            seed: 0,
            with_l4a: true,
        }
    }
}

/// One simulated footprint.
struct Shot {
    number: i64,
    lon: f64,
    lat: f64,
    delta_time: f64,
    /// Elevation of the first sample.
    top: f64,
    ground: f64,
    canopy: f64,
    quality: i64,
    modes: i64,
    treecover: f64,
    wf: Vec<f64>,
}

fn bell(x: f64, mu: f64, sd: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sd * sd)).exp()
}

fn simulate_shot(config: &GeneratorConfig, rng: &mut StdRng, beam_index: usize, i: usize) -> Shot {
    let ground = rng.gen_range(100.0..1500.0);
    let canopy: f64 = rng.gen_range(8.0..35.0);
    let span = config.samples.saturating_sub(1) as f64 * config.sample_spacing;
    // keep the ground peak inside the recorded window
    let top = (ground + canopy + rng.gen_range(5.0..15.0)).min(ground + span - 5.0);
    let canopy_peak = rng.gen_range(0.5..0.8) * canopy;
    let ground_amp = rng.gen_range(80.0..300.0);
    let canopy_amp = rng.gen_range(20.0..150.0);

    let wf = (0..config.samples)
        .map(|s| {
            let ht = top - s as f64 * config.sample_spacing - ground;
            let jitter = rng.gen_range(-config.noise..=config.noise);
            config.mean_noise
                + jitter
                + ground_amp * bell(ht, 0.0, 1.0)
                + canopy_amp * bell(ht, canopy_peak, canopy / 5.0)
        })
        .collect();

    Shot {
        number: (beam_index as i64 + 1) * 1_000_000 + i as i64,
        lon: -75.0 + 0.0005 * i as f64 + 0.01 * beam_index as f64,
        lat: 5.0 + 0.0004 * i as f64,
        delta_time: 1.4e8 + 0.0165 * i as f64,
        top,
        ground,
        canopy,
        quality: if rng.gen_bool(0.9) { 1 } else { 0 },
        modes: rng.gen_range(1..=4),
        treecover: rng.gen_range(0.0..100.0),
        wf,
    }
}

fn l1b_entry(config: &GeneratorConfig, shots: &[Shot]) -> anyhow::Result<Entry> {
    let span = config.samples.saturating_sub(1) as f64 * config.sample_spacing;
    let tops: Vec<f64> = shots.iter().map(|s| s.top).collect();
    let starts = (0..shots.len()).map(|i| (i * config.samples) as i64 + 1).collect();
    let entry = Entry::default()
        .with("shot_number", Dataset::int1(shots.iter().map(|s| s.number).collect()))?
        .with("geolocation/longitude_bin0", Dataset::float1(shots.iter().map(|s| s.lon).collect()))?
        .with("geolocation/latitude_bin0", Dataset::float1(shots.iter().map(|s| s.lat).collect()))?
        .with("geolocation/elevation_bin0", Dataset::float1(tops.clone()))?
        .with("geolocation/elevation_lastbin", Dataset::float1(tops.iter().map(|t| t - span).collect()))?
        .with("geolocation/delta_time", Dataset::float1(shots.iter().map(|s| s.delta_time).collect()))?
        .with("rx_sample_start_index", Dataset::int1(starts))?
        .with("rx_sample_count", Dataset::int1(vec![config.samples as i64; shots.len()]))?
        .with("rxwaveform", Dataset::float1(shots.iter().flat_map(|s| s.wf.iter().copied()).collect()))?
        .with("noise_mean_corrected", Dataset::float1(vec![config.mean_noise; shots.len()]))?;
    Ok(entry)
}

impl Shot {
    fn rh(&self) -> Vec<f64> {
        (0..=100).map(|p| -2.0 + (self.canopy + 2.0) * p as f64 / 100.0).collect()
    }
}

fn l2a_entry(shots: &[Shot]) -> anyhow::Result<Entry> {
    let n = shots.len();
    let rh = shots.iter().flat_map(|s| s.rh()).collect();
    let entry = Entry::default()
        .with("shot_number", Dataset::int1(shots.iter().map(|s| s.number).collect()))?
        .with("quality_flag", Dataset::int1(shots.iter().map(|s| s.quality).collect()))?
        .with("surface_flag", Dataset::int1(vec![1; n]))?
        .with("num_detectedmodes", Dataset::int1(shots.iter().map(|s| s.modes).collect()))?
        .with("elev_lowestmode", Dataset::float1(shots.iter().map(|s| s.ground).collect()))?
        .with("rh", Dataset::float2(n, 101, rh)?)?
        .with(
            "land_cover_data/modis_treecover",
            Dataset::float1(shots.iter().map(|s| s.treecover).collect()),
        )?
        .with(
            "land_cover_data/modis_nonvegetated",
            Dataset::float1(shots.iter().map(|s| 100.0 - s.treecover).collect()),
        )?
        .with(
            "land_cover_data/landsat_treecover",
            Dataset::float1(shots.iter().map(|s| s.treecover * 0.9).collect()),
        )?;
    Ok(entry)
}

fn l4a_entry(shots: &[Shot]) -> anyhow::Result<Entry> {
    let entry = Entry::default()
        .with("shot_number", Dataset::int1(shots.iter().map(|s| s.number).collect()))?
        .with("agbd", Dataset::float1(shots.iter().map(|s| 2.5 * s.canopy.powf(1.4)).collect()))?
        .with("l4_quality_flag", Dataset::int1(shots.iter().map(|s| s.quality).collect()))?;
    Ok(entry)
}

/// Builds L1B, L2A and optionally L4A granules with aligned shots on every beam.
pub fn build_granules(config: &GeneratorConfig) -> anyhow::Result<GranuleSet> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut l1b = MemoryGranule::new("synthetic_l1b.h5").with_beam("METADATA", Entry::default());
    let mut l2a = MemoryGranule::new("synthetic_l2a.h5");
    let mut l4a = MemoryGranule::new("synthetic_l4a.h5");

    for (beam_index, beam) in config.beams.iter().enumerate() {
        let shots: Vec<Shot> = (0..config.shots_per_beam)
            .map(|i| simulate_shot(config, &mut rng, beam_index, i))
            .collect();
        l1b = l1b.with_beam(beam.as_str(), l1b_entry(config, &shots).with_context(|| format!("L1B beam {}", beam))?);
        l2a = l2a.with_beam(beam.as_str(), l2a_entry(&shots).with_context(|| format!("L2A beam {}", beam))?);
        l4a = l4a.with_beam(beam.as_str(), l4a_entry(&shots).with_context(|| format!("L4A beam {}", beam))?);
    }

    Ok(GranuleSet {
        l1b,
        l2a,
        l4a: config.with_l4a.then_some(l4a),
    })
}

/// LVIS flight line identifier stamped on generated shots.
pub const LVIS_LFID: i64 = 1_900_001;
/// L1 group holding the generated LVIS arrays.
pub const LVIS_GROUP: &str = "LVIS1B";

/// Every shot at this position in a run of eight has no L2 row.
const LVIS_L2_GAP: usize = 7;

/// Generated LVIS L1B granule plus the L2 table text as it would sit on disk.
#[derive(Debug, Clone)]
pub struct LvisProducts {
    pub l1: MemoryGranule,
    pub l2_text: String,
}

impl LvisProducts {
    pub fn into_inputs(self) -> anyhow::Result<LvisInputs> {
        let l2 = LvisL2Table::parse("synthetic_LVIS2.TXT", self.l2_text.as_bytes())
            .context("parsing synthetic LVIS L2")?;
        Ok(LvisInputs { l1: self.l1, l2 })
    }
}

fn lvis_l1_entry(config: &GeneratorConfig, shots: &[Shot]) -> anyhow::Result<Entry> {
    let n = shots.len();
    let span = config.samples.saturating_sub(1) as f64 * config.sample_spacing;
    let column = |f: fn(&Shot) -> f64| Dataset::float1(shots.iter().map(f).collect());
    let tx: Vec<f64> = (0..n).flat_map(|_| (0..16).map(|i| bell(i as f64, 8.0, 2.0))).collect();
    let entry = Entry::default()
        .with(LVIS_SHOT_FIELD, Dataset::int1(shots.iter().map(|s| s.number).collect()))?
        .with("LFID", Dataset::int1(vec![LVIS_LFID; n]))?
        .with("LON0", column(|s| s.lon))?
        .with("LAT0", column(|s| s.lat))?
        .with("Z0", column(|s| s.top))?
        .with("LON1023", column(|s| s.lon + 0.00001))?
        .with("LAT1023", column(|s| s.lat + 0.00001))?
        .with("Z1023", Dataset::float1(shots.iter().map(|s| s.top - span).collect()))?
        .with("TIME", column(|s| s.delta_time))?
        .with("AZIMUTH", Dataset::float1(vec![180.0; n]))?
        .with("INCIDENTANGLE", Dataset::float1(vec![2.0; n]))?
        .with("RANGE", Dataset::float1(vec![8500.0; n]))?
        .with("SIGMEAN", Dataset::float1(vec![config.mean_noise; n]))?
        .with(
            "RXWAVE",
            Dataset::float2(n, config.samples, shots.iter().flat_map(|s| s.wf.iter().copied()).collect())?,
        )?
        .with("TXWAVE", Dataset::float2(n, 16, tx)?)?;
    Ok(entry)
}

fn lvis_l2_text(shots: &[Shot]) -> String {
    let mut text = String::from(
        "# Synthetic LVIS L2\n# LFID SHOTNUMBER TIME ZG ZH ZT RH50 RH75 RH90 RH95 RH100\n",
    );
    for (i, shot) in shots.iter().enumerate() {
        if i % 8 == LVIS_L2_GAP {
            continue;
        }
        let rh = shot.rh();
        text.push_str(&format!(
            "{} {} {:.4} {:.3} {:.3} {:.3} {:.3} {:.3} {:.3} {:.3} {:.3}\n",
            LVIS_LFID,
            shot.number,
            shot.delta_time,
            shot.ground,
            shot.ground + shot.canopy,
            shot.ground + shot.canopy,
            rh[50],
            rh[75],
            rh[90],
            rh[95],
            rh[100]
        ));
    }
    text
}

/// Builds one LVIS flight line of `shots_per_beam` shots; beams are ignored.
pub fn build_lvis(config: &GeneratorConfig) -> anyhow::Result<LvisProducts> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let shots: Vec<Shot> = (0..config.shots_per_beam)
        .map(|i| simulate_shot(config, &mut rng, 0, i))
        .collect();
    let l1 = MemoryGranule::new("synthetic_LVIS1B.h5")
        .with_beam(LVIS_GROUP, lvis_l1_entry(config, &shots).context("LVIS L1B")?);
    Ok(LvisProducts {
        l1,
        l2_text: lvis_l2_text(&shots),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nmbimcore::collection::{CollectionOptions, GediGranules, WaveformCollection};
    use nmbimcore::source::GranuleFile;

    fn small() -> GeneratorConfig {
        GeneratorConfig {
            beams: vec!["BEAM0000".into(), "BEAM0101".into()],
            shots_per_beam: 5,
            seed: 7,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn generator_builds_aligned_beams() {
        let set = build_granules(&small()).unwrap();
        assert_eq!(set.l1b.beam_names(), vec!["BEAM0000".to_string(), "BEAM0101".to_string()]);
        let granules = GediGranules::new(&set.l1b, &set.l2a, set.l4a.as_ref().map(|g| g as &dyn GranuleFile));
        let collection = WaveformCollection::from_gedi(&granules, CollectionOptions::default()).unwrap();
        assert_eq!(collection.len(), 10);
        let first = &collection.waveforms()[0];
        assert_eq!(first.get_array("raw/wf").unwrap().len(), 600);
        assert!(first.has("raw/agbd"));
    }

    #[test]
    fn same_seed_repeats_waveforms() {
        let a = build_granules(&small()).unwrap();
        let b = build_granules(&small()).unwrap();
        assert_eq!(a.l1b.beams, b.l1b.beams);
        let other = build_granules(&GeneratorConfig { seed: 8, ..small() }).unwrap();
        assert_ne!(a.l1b.beams, other.l1b.beams);
    }

    #[test]
    fn lvis_line_joins_l2_except_gaps() {
        let config = GeneratorConfig {
            shots_per_beam: 10,
            ..small()
        };
        let inputs = build_lvis(&config).unwrap().into_inputs().unwrap();
        assert_eq!(inputs.l1.beam_names(), vec![LVIS_GROUP.to_string()]);
        assert_eq!(inputs.l2.len(), 9);
        let l1 = inputs.l1.open_beam(LVIS_GROUP).unwrap();
        let collection = WaveformCollection::from_lvis(l1, inputs.l2, CollectionOptions::default()).unwrap();
        assert_eq!(collection.len(), 10);
        let loaded: Vec<bool> = collection
            .iter()
            .map(|w| w.get_ref("metadata/flags/l2_loaded").unwrap().as_bool().unwrap())
            .collect();
        assert_eq!(loaded.iter().filter(|l| !**l).count(), 1);
        assert!(!loaded[LVIS_L2_GAP]);
        let first = &collection.waveforms()[0];
        assert_eq!(first.file_id(), LVIS_LFID.to_string());
        assert!(first.get_f64("raw/rh/rh100").unwrap() >= 8.0);
    }

    #[test]
    fn ground_lies_inside_the_recorded_window() {
        let set = build_granules(&small()).unwrap();
        let granules = GediGranules::new(&set.l1b, &set.l2a, None);
        let collection = WaveformCollection::from_gedi(&granules, CollectionOptions::default()).unwrap();
        for waveform in &collection {
            let top = waveform.get_f64("raw/elev/top").unwrap();
            let bottom = waveform.get_f64("raw/elev/bottom").unwrap();
            let ground = waveform.get_f64("raw/elev/ground").unwrap();
            assert!(bottom < ground && ground < top, "{} {} {}", bottom, ground, top);
        }
    }
}
