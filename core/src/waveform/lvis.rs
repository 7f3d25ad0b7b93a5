use crate::prelude::{NmbimError, NmbimResult};
use crate::source::{BeamSource, LvisL2Table};
use crate::store::{map_of, GeoPoint};
use crate::waveform::Waveform;
use log::warn;

pub const LVIS_SHOT_FIELD: &str = "SHOTNUMBER";

const RH_FIELDS: [&str; 5] = ["RH50", "RH75", "RH90", "RH95", "RH100"];

/// How an LVIS shot is picked out of the L1 arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotSelector {
    Number(i64),
    Index(usize),
}

/// An LVIS L1 source and the matching L2 table.
#[derive(Debug)]
pub struct LvisSources {
    pub l1: BeamSource,
    pub l2: LvisL2Table,
}

impl LvisSources {
    pub fn new(l1: BeamSource, l2: LvisL2Table) -> Self {
        Self { l1, l2 }
    }
}

impl Waveform {
    /// Builds one LVIS footprint; L2 values are joined on `(LFID, shot)`.
    pub fn from_lvis(sources: &LvisSources, selector: ShotSelector) -> NmbimResult<Self> {
        let l1 = &sources.l1;
        let (shot_number, shot_index) = match selector {
            ShotSelector::Index(index) => (l1.extract_i64(LVIS_SHOT_FIELD, index)?, index),
            ShotSelector::Number(shot_number) => {
                let index = l1.where_shot(shot_number)?.ok_or_else(|| NmbimError::ShotAlignment {
                    shot_number,
                    detail: format!("shot missing from LVIS L1 {}", l1.file_path()),
                })?;
                (shot_number, index)
            }
        };

        let lfid = l1.extract_i64("LFID", shot_index)?;
        let mut waveform = Waveform::new(lfid.to_string(), shot_number)?;
        waveform.save("metadata/shot_index", shot_index)?;
        waveform.save("metadata/lfid", lfid)?;

        let field = |name: &str| l1.extract_f64(name, shot_index);
        let (lon0, lat0, z0) = (field("LON0")?, field("LAT0")?, field("Z0")?);
        let (lon1023, lat1023, z1023) = (field("LON1023")?, field("LAT1023")?, field("Z1023")?);
        let (lon, lat) = ((lon0 + lon1023) / 2.0, (lat0 + lat1023) / 2.0);
        waveform.save("metadata/coords_top", map_of([("lon", lon0), ("lat", lat0), ("z", z0)]))?;
        waveform.save(
            "metadata/coords_bottom",
            map_of([("lon", lon1023), ("lat", lat1023), ("z", z1023)]),
        )?;
        waveform.save(
            "metadata/coords",
            map_of([("lon", lon), ("lat", lat), ("z", (z0 + z1023) / 2.0)]),
        )?;
        waveform.save("metadata/point_geom", GeoPoint::new(lon, lat))?;
        waveform.save("metadata/time", field("TIME")?)?;
        waveform.save("metadata/azimuth", field("AZIMUTH")?)?;
        waveform.save("metadata/incident_angle", field("INCIDENTANGLE")?)?;
        waveform.save("metadata/range", field("RANGE")?)?;

        waveform.save_raw("raw/wf", l1.extract_row("RXWAVE", shot_index)?)?;
        waveform.save_raw("raw/tx_wave", l1.extract_row("TXWAVE", shot_index)?)?;
        waveform.save_raw("raw/mean_noise", field("SIGMEAN")?)?;
        waveform.save_raw("raw/elev", map_of([("top", z0), ("bottom", z1023)]))?;

        let l2 = &sources.l2;
        let l2_loaded = l2.has_row(lfid, shot_number);
        if l2_loaded {
            let rh: Vec<(String, f64)> = RH_FIELDS
                .iter()
                .filter_map(|name| {
                    l2.value(lfid, shot_number, name)
                        .map(|value| (name.to_lowercase(), value))
                })
                .collect();
            waveform.save_raw("raw/rh", map_of(rh))?;
            for (name, path) in [
                ("ZG", "raw/elev/ground"),
                ("ZH", "raw/elev/highest"),
                ("ZT", "raw/elev/canopy_top"),
            ] {
                if let Some(value) = l2.value(lfid, shot_number, name) {
                    waveform.save_raw(path, value)?;
                }
            }
        } else {
            warn!(
                "no L2 row for LFID {} shot {} in {}",
                lfid,
                shot_number,
                l2.path()
            );
        }
        waveform.save("metadata/flags/l2_loaded", l2_loaded)?;
        Ok(waveform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::store::Value;

    #[test]
    fn lvis_waveform_joins_l2_on_lfid_and_shot() {
        let sources = fixtures::lvis_sources(&[11, 12, 13], &[11, 13], false);
        let waveform = Waveform::from_lvis(&sources, ShotSelector::Number(13)).unwrap();
        assert_eq!(waveform.file_id(), fixtures::LVIS_LFID.to_string());
        assert_eq!(waveform.get_ref("metadata/shot_index").unwrap(), &Value::Int(2));
        assert_eq!(waveform.get_ref("metadata/flags/l2_loaded").unwrap(), &Value::Bool(true));
        assert_eq!(waveform.get_f64("raw/elev/top").unwrap(), fixtures::ELEV_TOP);
        assert_eq!(waveform.get_f64("raw/elev/ground").unwrap(), fixtures::ELEV_GROUND);
        assert!(waveform.has("raw/rh/rh100"));
        assert!(waveform.has("raw/elev/canopy_top"));
        assert_eq!(waveform.get_array("raw/wf").unwrap().len(), fixtures::SAMPLES_PER_SHOT);
    }

    #[test]
    fn missing_l2_row_is_flagged_not_fatal() {
        let sources = fixtures::lvis_sources(&[11, 12, 13], &[11, 13], true);
        let waveform = Waveform::from_lvis(&sources, ShotSelector::Index(1)).unwrap();
        assert_eq!(waveform.shot_number(), 12);
        assert_eq!(waveform.get_ref("metadata/flags/l2_loaded").unwrap(), &Value::Bool(false));
        assert!(!waveform.has("raw/elev/ground"));
        assert!(waveform.has("raw/elev/bottom"));
    }

    #[test]
    fn unknown_shot_number_is_an_alignment_error() {
        let sources = fixtures::lvis_sources(&[11, 12], &[11, 12], false);
        assert!(matches!(
            Waveform::from_lvis(&sources, ShotSelector::Number(99)),
            Err(NmbimError::ShotAlignment { shot_number: 99, .. })
        ));
    }
}
