use crate::algorithms::{
    calc_biomass_index, calc_biomass_index_simple, calc_dp_dz, calc_dz, calc_gap_prob, calc_height,
    create_ground_return, isolate_vegetation, normalize_waveform, remove_noise, separate_veg_ground,
    smooth_waveform, truncate_waveform, SeparationParams,
};
use crate::prelude::{NmbimError, NmbimResult};
use crate::store::Value;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of every algorithm a processing stage can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    CalcHeight,
    CalcDz,
    RemoveNoise,
    NormalizeWaveform,
    SmoothWaveform,
    CalcDpDz,
    SeparateVegGround,
    CalcGapProb,
    CalcBiomassIndex,
    CalcBiomassIndexSimple,
    TruncateWaveform,
    CreateGroundReturn,
    IsolateVegetation,
}

impl Algorithm {
    pub const ALL: [Algorithm; 13] = [
        Algorithm::CalcHeight,
        Algorithm::CalcDz,
        Algorithm::RemoveNoise,
        Algorithm::NormalizeWaveform,
        Algorithm::SmoothWaveform,
        Algorithm::CalcDpDz,
        Algorithm::SeparateVegGround,
        Algorithm::CalcGapProb,
        Algorithm::CalcBiomassIndex,
        Algorithm::CalcBiomassIndexSimple,
        Algorithm::TruncateWaveform,
        Algorithm::CreateGroundReturn,
        Algorithm::IsolateVegetation,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Algorithm::CalcHeight => "calc_height",
            Algorithm::CalcDz => "calc_dz",
            Algorithm::RemoveNoise => "remove_noise",
            Algorithm::NormalizeWaveform => "normalize_waveform",
            Algorithm::SmoothWaveform => "smooth_waveform",
            Algorithm::CalcDpDz => "calc_dp_dz",
            Algorithm::SeparateVegGround => "separate_veg_ground",
            Algorithm::CalcGapProb => "calc_gap_prob",
            Algorithm::CalcBiomassIndex => "calc_biomass_index",
            Algorithm::CalcBiomassIndexSimple => "calc_biomass_index_simple",
            Algorithm::TruncateWaveform => "truncate_waveform",
            Algorithm::CreateGroundReturn => "create_ground_return",
            Algorithm::IsolateVegetation => "isolate_vegetation",
        }
    }

    pub fn from_id(id: &str) -> NmbimResult<Self> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.id() == id)
            .ok_or_else(|| NmbimError::Config(format!("unknown algorithm '{}'", id)))
    }

    /// Arguments the algorithm cannot run without.
    pub fn required(self) -> &'static [&'static str] {
        match self {
            Algorithm::CalcHeight => &["wf", "elev_top", "elev_bottom", "elev_ground"],
            Algorithm::CalcDz => &["ht"],
            Algorithm::RemoveNoise => &["wf", "mean_noise"],
            Algorithm::NormalizeWaveform => &["wf"],
            Algorithm::SmoothWaveform => &["wf", "sd"],
            Algorithm::CalcDpDz => &["wf", "dz"],
            Algorithm::SeparateVegGround => &["wf", "ht", "dz", "rh", "min_veg_bottom", "max_veg_bottom"],
            Algorithm::CalcGapProb => &["wf_per_height", "veg_first_idx", "veg_last_idx", "ground_last_idx"],
            Algorithm::CalcBiomassIndex => &["dp_dz", "dz", "ht", "hse", "n_modes"],
            Algorithm::CalcBiomassIndexSimple => &["dp_dz", "dz", "ht", "floor", "ceiling", "hse"],
            Algorithm::TruncateWaveform => &["wf", "ht", "floor", "ceiling"],
            Algorithm::CreateGroundReturn => &["wf", "ht", "ground_bottom", "sd_ratio"],
            Algorithm::IsolateVegetation => &["wf", "ht", "veg_top", "ground_return"],
        }
    }

    pub fn optional(self) -> &'static [&'static str] {
        match self {
            Algorithm::SeparateVegGround => &["veg_buffer"],
            _ => &[],
        }
    }

    pub fn accepts(self, name: &str) -> bool {
        self.required().contains(&name) || self.optional().contains(&name)
    }

    pub fn run(self, args: &AlgorithmArgs) -> NmbimResult<Value> {
        let value: Value = match self {
            Algorithm::CalcHeight => calc_height(
                args.array("wf")?,
                args.float("elev_top")?,
                args.float("elev_bottom")?,
                args.float("elev_ground")?,
            )
            .into(),
            Algorithm::CalcDz => calc_dz(args.array("ht")?)?.into(),
            Algorithm::RemoveNoise => remove_noise(args.array("wf")?, args.float("mean_noise")?).into(),
            Algorithm::NormalizeWaveform => normalize_waveform(args.array("wf")?).into(),
            Algorithm::SmoothWaveform => smooth_waveform(args.array("wf")?, args.float("sd")?)?.into(),
            Algorithm::CalcDpDz => calc_dp_dz(args.array("wf")?, args.float("dz")?)?.into(),
            Algorithm::SeparateVegGround => separate_veg_ground(
                args.array("wf")?,
                args.array("ht")?,
                args.float("dz")?,
                args.rh100("rh")?,
                SeparationParams {
                    min_veg_bottom: args.float("min_veg_bottom")?,
                    max_veg_bottom: args.float("max_veg_bottom")?,
                    veg_buffer: args.float_or("veg_buffer", 0.0)?,
                },
            )?
            .into(),
            Algorithm::CalcGapProb => calc_gap_prob(
                args.array("wf_per_height")?,
                args.index("veg_first_idx")?,
                args.index("veg_last_idx")?,
                args.index("ground_last_idx")?,
            )?
            .into(),
            Algorithm::CalcBiomassIndex => {
                let n_modes = args.int("n_modes")?;
                if n_modes == 1 {
                    Value::Float(0.0)
                } else {
                    calc_biomass_index(
                        args.array("dp_dz")?,
                        args.float("dz")?,
                        args.array("ht")?,
                        args.float("hse")?,
                        n_modes,
                    )?
                    .into()
                }
            }
            Algorithm::CalcBiomassIndexSimple => calc_biomass_index_simple(
                args.array("dp_dz")?,
                args.float("dz")?,
                args.array("ht")?,
                args.float("floor")?,
                args.float("ceiling")?,
                args.float("hse")?,
            )?
            .into(),
            Algorithm::TruncateWaveform => truncate_waveform(
                args.array("wf")?,
                args.array("ht")?,
                args.float("floor")?,
                args.float("ceiling")?,
            )?
            .into(),
            Algorithm::CreateGroundReturn => create_ground_return(
                args.array("wf")?,
                args.array("ht")?,
                args.float("ground_bottom")?,
                args.float("sd_ratio")?,
            )?
            .into(),
            Algorithm::IsolateVegetation => isolate_vegetation(
                args.array("wf")?,
                args.array("ht")?,
                args.float("veg_top")?,
                args.array("ground_return")?,
            )?
            .into(),
        };
        Ok(value)
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Named arguments bound for one algorithm call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlgorithmArgs {
    values: BTreeMap<String, Value>,
}

impl AlgorithmArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> NmbimResult<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| NmbimError::InvalidInput(format!("missing argument '{}'", name)))
    }

    fn mismatch(name: &str, expected: &str, found: &Value) -> NmbimError {
        NmbimError::TypeMismatch(format!(
            "argument '{}' must be {}, found {}",
            name,
            expected,
            found.type_name()
        ))
    }

    pub fn array(&self, name: &str) -> NmbimResult<ArrayView1<'_, f64>> {
        let value = self.get(name)?;
        value
            .as_array()
            .map(|array| array.view())
            .ok_or_else(|| Self::mismatch(name, "an array", value))
    }

    pub fn float(&self, name: &str) -> NmbimResult<f64> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| Self::mismatch(name, "a number", value))
    }

    pub fn float_or(&self, name: &str, default: f64) -> NmbimResult<f64> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(default),
            Some(_) => self.float(name),
        }
    }

    pub fn int(&self, name: &str) -> NmbimResult<i64> {
        let value = self.get(name)?;
        value.as_i64().ok_or_else(|| Self::mismatch(name, "an integer", value))
    }

    pub fn index(&self, name: &str) -> NmbimResult<usize> {
        let value = self.int(name)?;
        usize::try_from(value)
            .map_err(|_| NmbimError::InvalidInput(format!("argument '{}' is negative: {}", name, value)))
    }

    /// RH100 from a full RH array (element 100) or a scalar.
    pub fn rh100(&self, name: &str) -> NmbimResult<f64> {
        match self.get(name)? {
            Value::Array(rh) => rh.get(100).copied().ok_or_else(|| {
                NmbimError::InvalidInput(format!(
                    "argument '{}' has {} relative heights, need 101",
                    name,
                    rh.len()
                ))
            }),
            other => other
                .as_f64()
                .ok_or_else(|| Self::mismatch(name, "an RH array or number", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_serde() {
        for alg in Algorithm::ALL {
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.id()));
            assert_eq!(Algorithm::from_id(alg.id()).unwrap(), alg);
        }
        assert!(matches!(Algorithm::from_id("nope"), Err(NmbimError::Config(_))));
    }

    #[test]
    fn run_binds_named_arguments() {
        let args = AlgorithmArgs::new()
            .with("wf", vec![12.0, 9.0, 15.0])
            .with("mean_noise", 10_i64);
        let out = Algorithm::RemoveNoise.run(&args).unwrap();
        assert_eq!(out, Value::from(vec![2.0, 0.0, 5.0]));
    }

    #[test]
    fn missing_and_mistyped_arguments_are_reported() {
        let args = AlgorithmArgs::new().with("wf", 1.0);
        assert!(matches!(
            Algorithm::NormalizeWaveform.run(&args),
            Err(NmbimError::TypeMismatch(_))
        ));
        assert!(matches!(
            Algorithm::CalcDz.run(&args),
            Err(NmbimError::InvalidInput(_))
        ));
    }

    #[test]
    fn rh100_accepts_array_or_scalar() {
        let rh: Vec<f64> = (0..=100).map(f64::from).collect();
        let args = AlgorithmArgs::new().with("rh", rh).with("rh_scalar", 17.5);
        assert_eq!(args.rh100("rh").unwrap(), 100.0);
        assert_eq!(args.rh100("rh_scalar").unwrap(), 17.5);
        let short = AlgorithmArgs::new().with("rh", vec![1.0, 2.0]);
        assert!(short.rh100("rh").is_err());
    }

    #[test]
    fn single_mode_biomass_skips_array_checks() {
        let args = AlgorithmArgs::new().with("n_modes", 1_i64);
        assert_eq!(Algorithm::CalcBiomassIndex.run(&args).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn separation_result_becomes_a_map() {
        let ht: Vec<f64> = (0..61).map(|i| 3.0 - 0.1 * i as f64).collect();
        let args = AlgorithmArgs::new()
            .with("wf", vec![1.0; 61])
            .with("ht", ht)
            .with("dz", 0.1)
            .with("rh", 2.0)
            .with("min_veg_bottom", 0.5)
            .with("max_veg_bottom", 5.0);
        let out = Algorithm::SeparateVegGround.run(&args).unwrap();
        let map = out.as_map().unwrap();
        assert!(map.contains_key("ground_bottom"));
        assert_eq!(map.get("veg_first_idx").and_then(Value::as_i64), Some(10));
    }
}
