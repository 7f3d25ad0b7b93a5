use crate::prelude::{NmbimError, NmbimResult};
use crate::store::Value;
use ndarray::{Array1, Array2, ArrayD, Axis};
use serde::{Deserialize, Serialize};

/// One array read from a product group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    Float(ArrayD<f64>),
    Int(ArrayD<i64>),
    Text(Vec<String>),
}

impl Dataset {
    pub fn float1(values: Vec<f64>) -> Self {
        Dataset::Float(Array1::from(values).into_dyn())
    }

    pub fn int1(values: Vec<i64>) -> Self {
        Dataset::Int(Array1::from(values).into_dyn())
    }

    /// Row-major 2-D float dataset, one row per shot.
    pub fn float2(rows: usize, cols: usize, values: Vec<f64>) -> NmbimResult<Self> {
        Array2::from_shape_vec((rows, cols), values)
            .map(|array| Dataset::Float(array.into_dyn()))
            .map_err(|err| NmbimError::MalformedSource(format!("bad 2-D shape: {}", err)))
    }

    pub fn ndim(&self) -> usize {
        match self {
            Dataset::Float(array) => array.ndim(),
            Dataset::Int(array) => array.ndim(),
            Dataset::Text(_) => 1,
        }
    }

    /// Length along the first (shot) axis.
    pub fn len(&self) -> usize {
        match self {
            Dataset::Float(array) => array.shape().first().copied().unwrap_or(1),
            Dataset::Int(array) => array.shape().first().copied().unwrap_or(1),
            Dataset::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_index(&self, index: usize) -> NmbimResult<()> {
        if index >= self.len() {
            return Err(NmbimError::MalformedSource(format!(
                "index {} out of range for dataset of length {}",
                index,
                self.len()
            )));
        }
        Ok(())
    }

    fn require_ndim(&self, ndim: usize) -> NmbimResult<()> {
        if self.ndim() != ndim {
            return Err(NmbimError::TypeMismatch(format!(
                "expected a {}-D dataset, found {}-D",
                ndim,
                self.ndim()
            )));
        }
        Ok(())
    }

    /// Scalar at `index` of a 1-D dataset.
    pub fn element(&self, index: usize) -> NmbimResult<Value> {
        self.require_ndim(1)?;
        self.check_index(index)?;
        let value = match self {
            Dataset::Float(array) => array.get(&[index][..]).copied().map(Value::Float),
            Dataset::Int(array) => array.get(&[index][..]).copied().map(Value::Int),
            Dataset::Text(values) => values.get(index).cloned().map(Value::Text),
        };
        value.ok_or_else(|| NmbimError::MalformedSource(format!("no element at {}", index)))
    }

    /// Row `index` of a 2-D numeric dataset, as floats.
    pub fn row(&self, index: usize) -> NmbimResult<Array1<f64>> {
        self.require_ndim(2)?;
        self.check_index(index)?;
        match self {
            Dataset::Float(array) => Ok(array.index_axis(Axis(0), index).iter().copied().collect()),
            Dataset::Int(array) => Ok(array
                .index_axis(Axis(0), index)
                .iter()
                .map(|&value| value as f64)
                .collect()),
            Dataset::Text(_) => Err(NmbimError::TypeMismatch("text dataset has no rows".into())),
        }
    }

    /// `count` elements of a 1-D numeric dataset starting at `start`.
    pub fn slice(&self, start: usize, count: usize) -> NmbimResult<Array1<f64>> {
        self.require_ndim(1)?;
        let end = start.checked_add(count).unwrap_or(usize::MAX);
        if end > self.len() {
            return Err(NmbimError::MalformedSource(format!(
                "slice [{}, {}) exceeds dataset length {}",
                start,
                end,
                self.len()
            )));
        }
        match self {
            Dataset::Float(array) => Ok(array.iter().skip(start).take(count).copied().collect()),
            Dataset::Int(array) => Ok(array
                .iter()
                .skip(start)
                .take(count)
                .map(|&value| value as f64)
                .collect()),
            Dataset::Text(_) => Err(NmbimError::TypeMismatch("text dataset cannot be sliced".into())),
        }
    }

    /// Whole 1-D dataset as integers (shot numbers, LFIDs).
    pub fn to_i64_vec(&self) -> NmbimResult<Vec<i64>> {
        self.require_ndim(1)?;
        match self {
            Dataset::Int(array) => Ok(array.iter().copied().collect()),
            Dataset::Float(array) => array
                .iter()
                .map(|&value| {
                    Value::Float(value).as_i64().ok_or_else(|| {
                        NmbimError::TypeMismatch(format!("{} is not an integer", value))
                    })
                })
                .collect(),
            Dataset::Text(_) => Err(NmbimError::TypeMismatch("text dataset is not integral".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_slices_are_bounds_checked() {
        let rh = Dataset::float2(2, 3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(rh.len(), 2);
        assert_eq!(rh.row(1).unwrap().to_vec(), vec![3.0, 4.0, 5.0]);
        assert!(matches!(rh.row(2), Err(NmbimError::MalformedSource(_))));
        assert!(matches!(rh.element(0), Err(NmbimError::TypeMismatch(_))));

        let wf = Dataset::float1(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(wf.slice(1, 2).unwrap().to_vec(), vec![2.0, 3.0]);
        assert!(wf.slice(3, 2).is_err());
    }

    #[test]
    fn integral_floats_become_shot_numbers() {
        let shots = Dataset::float1(vec![10.0, 11.0]);
        assert_eq!(shots.to_i64_vec().unwrap(), vec![10, 11]);
        assert!(Dataset::float1(vec![1.5]).to_i64_vec().is_err());
    }
}
