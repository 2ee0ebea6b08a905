//! Settings for indispensability computations.
//!
//! Options can be built in code or loaded from a JSON file. Missing fields in
//! the file fall back to the defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How an expression is turned into an indispensability array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IndispensabilityOptions {
    /// Scale the result to `[0, 1]`, with the downbeat at exactly 1.0.
    pub normalize: bool,

    /// Split every group larger than 3 into 2s and a trailing 3 (Barlow's rule).
    pub break_up_large_numbers: bool,

    /// Rank the pickup to each beat ahead of the remaining pulses of longer
    /// groups. Turn off to reproduce Barlow's original ordering.
    pub upbeats_before_group_length: bool,
}

impl Default for IndispensabilityOptions {
    fn default() -> Self {
        Self {
            normalize: false,
            break_up_large_numbers: false,
            upbeats_before_group_length: true,
        }
    }
}

impl IndispensabilityOptions {
    /// Options that reproduce Barlow's published indispensability values.
    pub fn barlow() -> Self {
        Self {
            normalize: false,
            break_up_large_numbers: true,
            upbeats_before_group_length: false,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn with_break_up_large_numbers(mut self, break_up: bool) -> Self {
        self.break_up_large_numbers = break_up;
        self
    }

    pub fn with_upbeats_before_group_length(mut self, upbeats_first: bool) -> Self {
        self.upbeats_before_group_length = upbeats_first;
        self
    }

    /// Serializes the options to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses options from JSON. Absent fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns error if parsing fails
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Saves the options to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }

    /// Loads options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file reading or parsing fails
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
