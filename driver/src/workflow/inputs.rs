use anyhow::Context;
use nmbimcore::source::{LvisL2Table, MemoryGranule};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// The products of one GEDI acquisition.
#[derive(Debug, Clone)]
pub struct GranuleSet {
    pub l1b: MemoryGranule,
    pub l2a: MemoryGranule,
    pub l4a: Option<MemoryGranule>,
}

impl GranuleSet {
    /// Loads granules dumped to JSON.
    pub fn load(l1b: &Path, l2a: &Path, l4a: Option<&Path>) -> anyhow::Result<Self> {
        Ok(Self {
            l1b: load_granule(l1b)?,
            l2a: load_granule(l2a)?,
            l4a: l4a.map(load_granule).transpose()?,
        })
    }
}

/// An LVIS L1B granule and its L2 text product.
#[derive(Debug, Clone)]
pub struct LvisInputs {
    pub l1: MemoryGranule,
    pub l2: LvisL2Table,
}

impl LvisInputs {
    /// Loads the L1B JSON dump and parses the L2 table.
    pub fn load(l1: &Path, l2: &Path) -> anyhow::Result<Self> {
        let file = File::open(l2).with_context(|| format!("opening LVIS L2 {}", l2.display()))?;
        let table = LvisL2Table::parse(l2.display().to_string(), BufReader::new(file))
            .with_context(|| format!("reading LVIS L2 {}", l2.display()))?;
        Ok(Self {
            l1: load_granule(l1)?,
            l2: table,
        })
    }
}

fn load_granule(path: &Path) -> anyhow::Result<MemoryGranule> {
    let file = File::open(path).with_context(|| format!("opening granule {}", path.display()))?;
    let mut granule = MemoryGranule::from_json_reader(BufReader::new(file))
        .with_context(|| format!("reading granule {}", path.display()))?;
    if granule.path.is_empty() {
        granule.path = path.display().to_string();
    }
    Ok(granule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::{build_granules, build_lvis, GeneratorConfig};
    use nmbimcore::source::GranuleFile;
    use tempfile::tempdir;

    #[test]
    fn json_granules_load_back() {
        let set = build_granules(&GeneratorConfig {
            beams: vec!["BEAM0110".into()],
            shots_per_beam: 2,
            samples: 50,
            with_l4a: false,
            ..GeneratorConfig::default()
        })
        .unwrap();
        let dir = tempdir().unwrap();
        let l1b = dir.path().join("l1b.json");
        let l2a = dir.path().join("l2a.json");
        let mut unnamed = set.l2a.clone();
        unnamed.path.clear();
        serde_json::to_writer(File::create(&l1b).unwrap(), &set.l1b).unwrap();
        serde_json::to_writer(File::create(&l2a).unwrap(), &unnamed).unwrap();

        let loaded = GranuleSet::load(&l1b, &l2a, None).unwrap();
        assert_eq!(loaded.l1b.beams, set.l1b.beams);
        assert_eq!(loaded.l1b.beam_names(), vec!["BEAM0110".to_string()]);
        assert_eq!(loaded.l2a.path, l2a.display().to_string());
        assert!(loaded.l4a.is_none());
    }

    #[test]
    fn lvis_inputs_load_from_json_and_text() {
        let config = GeneratorConfig {
            shots_per_beam: 4,
            samples: 80,
            ..GeneratorConfig::default()
        };
        let products = build_lvis(&config).unwrap();
        let dir = tempdir().unwrap();
        let l1 = dir.path().join("LVIS1B.json");
        let l2 = dir.path().join("LVIS2.TXT");
        serde_json::to_writer(File::create(&l1).unwrap(), &products.l1).unwrap();
        std::fs::write(&l2, &products.l2_text).unwrap();

        let loaded = LvisInputs::load(&l1, &l2).unwrap();
        assert_eq!(loaded.l1.beams, products.l1.beams);
        assert_eq!(loaded.l2.len(), products.into_inputs().unwrap().l2.len());
        assert_eq!(loaded.l2.path(), l2.display().to_string());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = GranuleSet::load(Path::new("/nonexistent/l1b.json"), Path::new("l2a.json"), None).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/l1b.json"));
    }
}
