use anyhow::Context;
use nmbimcore::telemetry::MetricsSnapshot;
use nmbimcore::waveform::Waveform;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

pub type Row = BTreeMap<String, Json>;

#[derive(Debug, Clone, Serialize)]
pub struct BeamReport {
    pub beam: String,
    pub waveforms: usize,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub beams: Vec<BeamReport>,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    pub fn waveform_count(&self) -> usize {
        self.beams.iter().map(|b| b.waveforms).sum()
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = File::create(path_ref).with_context(|| format!("creating report {}", path_ref.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("writing report {}", path_ref.display()))
    }
}

/// One report row: shot number, file id and each requested column.
///
/// Columns whose path is absent are written as null.
pub fn row(waveform: &Waveform, columns: &BTreeMap<String, String>) -> Row {
    let mut row = Row::new();
    row.insert("shot_number".into(), Json::from(waveform.shot_number()));
    row.insert("file_id".into(), Json::from(waveform.file_id()));
    for (name, path) in columns {
        let value = match waveform.get(path) {
            Ok(value) => serde_json::to_value(value).unwrap_or(Json::Null),
            Err(err) => {
                log::debug!("shot {}: column {} empty: {}", waveform.shot_number(), name, err);
                Json::Null
            }
        };
        row.insert(name.clone(), value);
    }
    row
}
