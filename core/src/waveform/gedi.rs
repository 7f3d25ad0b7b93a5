use crate::prelude::{NmbimError, NmbimResult};
use crate::source::BeamSource;
use crate::store::{map_of, GeoPoint, Value};
use crate::waveform::Waveform;

/// Seconds from the Unix epoch to the GEDI reference epoch, 2018-01-01T00:00:00Z.
pub const GEDI_EPOCH_OFFSET: f64 = 1_514_764_800.0;

pub const LAND_COVER_FIELDS: [&str; 3] = ["modis_nonvegetated", "modis_treecover", "landsat_treecover"];

/// The per-beam sources of one GEDI granule set.
#[derive(Debug)]
pub struct GediSources {
    pub l1b: BeamSource,
    pub l2a: BeamSource,
    pub l4a: Option<BeamSource>,
}

impl GediSources {
    pub fn new(l1b: BeamSource, l2a: BeamSource, l4a: Option<BeamSource>) -> Self {
        Self { l1b, l2a, l4a }
    }

    pub fn beam_name(&self) -> &str {
        self.l1b.beam_name()
    }

    /// `(product, source)` pairs in L1B, L2A, L4A order.
    pub fn products(&self) -> Vec<(&'static str, &BeamSource)> {
        let mut products = vec![("L1B", &self.l1b), ("L2A", &self.l2a)];
        if let Some(l4a) = &self.l4a {
            products.push(("L4A", l4a));
        }
        products
    }

    /// Resolves the shot's position in every product; they must agree.
    pub fn shot_index(&self, shot_number: i64) -> NmbimResult<usize> {
        let mut resolved: Option<(&str, usize)> = None;
        for (product, source) in self.products() {
            let index = source.where_shot(shot_number)?.ok_or_else(|| NmbimError::ShotAlignment {
                shot_number,
                detail: format!("shot missing from {} beam {}", product, source.beam_name()),
            })?;
            match resolved {
                None => resolved = Some((product, index)),
                Some((first, expected)) if expected != index => {
                    return Err(NmbimError::ShotAlignment {
                        shot_number,
                        detail: format!(
                            "{} index {} != {} index {}",
                            first, expected, product, index
                        ),
                    })
                }
                Some(_) => {}
            }
        }
        resolved
            .map(|(_, index)| index)
            .ok_or_else(|| NmbimError::InvalidInput("no products to resolve against".into()))
    }
}

impl Waveform {
    /// Builds the waveform for `shot_number` from a GEDI L1B/L2A(/L4A) beam.
    pub fn from_gedi(shot_number: i64, sources: &GediSources) -> NmbimResult<Self> {
        let l1b = &sources.l1b;
        let l2a = &sources.l2a;
        if l1b.beam_name() != l2a.beam_name() {
            return Err(NmbimError::InvalidInput(format!(
                "beam mismatch: L1B {} != L2A {}",
                l1b.beam_name(),
                l2a.beam_name()
            )));
        }
        let shot_index = sources.shot_index(shot_number)?;
        let file_id = format!("{}:{}", l1b.file_path(), l1b.beam_name());
        let mut waveform = Waveform::new(file_id, shot_number)?;

        waveform.save("metadata/beam", l1b.beam_name())?;
        waveform.save("metadata/l1b_path", l1b.file_path())?;
        waveform.save("metadata/l2a_path", l2a.file_path())?;
        waveform.save("metadata/shot_index", shot_index)?;

        let lon = l1b.extract_f64("geolocation/longitude_bin0", shot_index)?;
        let lat = l1b.extract_f64("geolocation/latitude_bin0", shot_index)?;
        waveform.save("metadata/coords", map_of([("lon", lon), ("lat", lat)]))?;
        waveform.save("metadata/point_geom", GeoPoint::new(lon, lat))?;

        let delta_time = l1b.extract_f64("geolocation/delta_time", shot_index)?;
        waveform.save("metadata/timestamp", delta_time + GEDI_EPOCH_OFFSET)?;

        waveform.save(
            "metadata/flags",
            map_of([
                ("quality", l2a.extract_value("quality_flag", shot_index)?),
                ("surface", l2a.extract_value("surface_flag", shot_index)?),
                ("l2_loaded", Value::Bool(true)),
            ]),
        )?;
        waveform.save(
            "metadata/modes/num_modes",
            l2a.extract_value("num_detectedmodes", shot_index)?,
        )?;
        let mut landcover = Vec::with_capacity(LAND_COVER_FIELDS.len());
        for field in LAND_COVER_FIELDS {
            let path = format!("land_cover_data/{}", field);
            landcover.push((field, l2a.extract_value(&path, shot_index)?));
        }
        waveform.save("metadata/landcover", map_of(landcover))?;

        // rx_sample_start_index is 1-based
        let start = l1b.extract_i64("rx_sample_start_index", shot_index)?;
        let count = l1b.extract_i64("rx_sample_count", shot_index)?;
        if start < 1 || count < 0 {
            return Err(NmbimError::MalformedSource(format!(
                "shot {}: sample start {} count {}",
                shot_number, start, count
            )));
        }
        let wf = l1b.extract_slice("rxwaveform", (start - 1) as usize, count as usize)?;
        waveform.save_raw("raw/wf", wf)?;
        waveform.save_raw(
            "raw/mean_noise",
            l1b.extract_f64("noise_mean_corrected", shot_index)?,
        )?;
        waveform.save_raw("raw/rh", l2a.extract_row("rh", shot_index)?)?;
        waveform.save_raw(
            "raw/elev",
            map_of([
                ("top", l1b.extract_f64("geolocation/elevation_bin0", shot_index)?),
                ("bottom", l1b.extract_f64("geolocation/elevation_lastbin", shot_index)?),
                ("ground", l2a.extract_f64("elev_lowestmode", shot_index)?),
            ]),
        )?;

        if let Some(l4a) = &sources.l4a {
            waveform.save("metadata/l4a_path", l4a.file_path())?;
            waveform.save_raw("raw/agbd", l4a.extract_f64("agbd", shot_index)?)?;
            waveform.save(
                "metadata/flags/l4_quality",
                l4a.extract_value("l4_quality_flag", shot_index)?,
            )?;
        }
        Ok(waveform)
    }
}
