use crate::algorithms::Algorithm;
use crate::prelude::{NmbimError, NmbimResult};
use crate::store::Value;
use crate::waveform::Namespace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Literal stage parameter as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<f64>),
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Bool(value) => Value::Bool(*value),
            Literal::Int(value) => Value::Int(*value),
            Literal::Float(value) => Value::Float(*value),
            Literal::Text(value) => Value::Text(value.clone()),
            Literal::List(values) => Value::from(values.clone()),
        }
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// One processing stage: algorithm, argument paths, literals and output path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "alg_fun")]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub input_map: BTreeMap<String, String>,
    pub output_path: String,
    #[serde(default)]
    pub params: BTreeMap<String, Literal>,
}

impl StageConfig {
    pub fn new(name: impl Into<String>, algorithm: Algorithm, output_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            algorithm,
            input_map: BTreeMap::new(),
            output_path: output_path.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn input(mut self, argument: &str, path: &str) -> Self {
        self.input_map.insert(argument.to_string(), path.to_string());
        self
    }

    pub fn param(mut self, argument: &str, literal: impl Into<Literal>) -> Self {
        self.params.insert(argument.to_string(), literal.into());
        self
    }

    /// Checks argument binding and output namespace before any waveform is touched.
    pub fn validate(&self) -> NmbimResult<()> {
        let fail = |detail: String| Err(NmbimError::Config(format!("stage '{}': {}", self.name, detail)));

        if let Some(name) = self.input_map.keys().find(|name| self.params.contains_key(*name)) {
            return fail(format!("'{}' is bound both to a path and to a literal", name));
        }
        let algorithm = self.algorithm;
        if let Some(name) = self
            .input_map
            .keys()
            .chain(self.params.keys())
            .find(|name| !algorithm.accepts(name))
        {
            return fail(format!("{} takes no argument '{}'", algorithm, name));
        }
        if let Some(name) = algorithm
            .required()
            .iter()
            .find(|name| !self.input_map.contains_key(**name) && !self.params.contains_key(**name))
        {
            return fail(format!("{} needs argument '{}'", algorithm, name));
        }
        match Namespace::of(&self.output_path) {
            Ok(Namespace::Raw) | Err(_) => fail(format!(
                "output '{}' must be under processed, results or metadata",
                self.output_path
            )),
            Ok(_) => Ok(()),
        }
    }
}
