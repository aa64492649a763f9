//! Named quantizer states for a whole model

use super::quantizer::{QuantizerState, TensorQuantizer};
use crate::error::{Error, Result};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// State of every registered quantizer, keyed by site name
///
/// Serializable, so a caller can persist calibration between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantizerStore {
    states: BTreeMap<String, QuantizerState>,
}

impl QuantizerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize state for `quantizer`; a name can only be registered once
    pub fn register(&mut self, quantizer: &TensorQuantizer) -> Result<()> {
        if self.states.contains_key(quantizer.name()) {
            return Err(Error::InvalidState(format!(
                "quantizer '{}' is already registered",
                quantizer.name()
            )));
        }
        self.states
            .insert(quantizer.name().to_string(), quantizer.init()?);
        tracing::debug!(quantizer = %quantizer.name(), "registered");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&QuantizerState> {
        self.states.get(name)
    }

    /// Fold one sample into the named state
    pub fn update(
        &mut self,
        quantizer: &TensorQuantizer,
        sample: &ArrayD<f32>,
        weight: &ArrayD<f32>,
        event_count: i64,
    ) -> Result<&QuantizerState> {
        let slot = self.states.get_mut(quantizer.name()).ok_or_else(|| {
            Error::InvalidState(format!(
                "quantizer '{}' is not registered",
                quantizer.name()
            ))
        })?;
        *slot = quantizer.update(slot, sample, weight, event_count)?;
        Ok(slot)
    }

    /// Switch every quantizer to inference
    pub fn freeze_all(&mut self) {
        for state in self.states.values_mut() {
            *state = state.freeze();
        }
        tracing::info!(quantizers = self.states.len(), "all quantizers frozen");
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
