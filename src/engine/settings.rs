//! Engine settings store
//!
//! The engine exposes its configuration as a nested container per category:
//! a list of subcategories, each holding a list of named parameters. Every
//! access fetches the container, mutates it in place, and writes it back only
//! when a value actually changed, so repeated configuration is idempotent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::Engine;
use crate::error::{Result, SessionError};

/// Settings for one category, as returned by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsContainer {
    pub subcategories: Vec<SubCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    #[serde(rename = "nameSubCategory")]
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "currentValue")]
    pub current_value: Value,
    /// Legal values for enumerable parameters, each a single-entry
    /// `{label: value}` map
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<serde_json::Map<String, Value>>,
}

impl SettingsContainer {
    /// Find a parameter, optionally restricted to one subcategory
    pub fn find(&self, subcategory: Option<&str>, parameter: &str) -> Option<&Parameter> {
        self.subcategories
            .iter()
            .filter(|sub| subcategory.map_or(true, |name| sub.name == name))
            .flat_map(|sub| sub.parameters.iter())
            .find(|p| p.name == parameter)
    }

    pub fn find_mut(&mut self, subcategory: Option<&str>, parameter: &str) -> Option<&mut Parameter> {
        self.subcategories
            .iter_mut()
            .filter(|sub| subcategory.map_or(true, |name| sub.name == name))
            .flat_map(|sub| sub.parameters.iter_mut())
            .find(|p| p.name == parameter)
    }

    pub fn subcategory(&self, name: &str) -> Option<&SubCategory> {
        self.subcategories.iter().find(|sub| sub.name == name)
    }
}

impl Parameter {
    /// Legal values in engine order, unwrapped from their `{label: value}` maps
    pub fn available_values(&self) -> Vec<Value> {
        self.values
            .iter()
            .filter_map(|entry| entry.values().next().cloned())
            .collect()
    }
}

/// Key path to a single setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingPath {
    pub category: String,
    /// When `None`, every subcategory of the category is searched
    pub subcategory: Option<String>,
    pub parameter: String,
}

impl SettingPath {
    pub fn new(category: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            subcategory: None,
            parameter: parameter.into(),
        }
    }

    pub fn in_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }
}

impl std::fmt::Display for SettingPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.subcategory {
            Some(sub) => write!(f, "{}/{}/{}", self.category, sub, self.parameter),
            None => write!(f, "{}/{}", self.category, self.parameter),
        }
    }
}

/// Read-modify-write access to the engine's settings
///
/// Implemented for every [`Engine`]. Assumes this process is the only writer
/// of a category while a call is in flight.
pub trait SettingsStore {
    /// Current value of a setting, or `None` if the path does not exist
    fn get(&mut self, path: &SettingPath) -> Result<Option<Value>>;

    /// Assign a setting, saving the category only if the value changed.
    /// Returns whether a write was issued.
    fn set(&mut self, path: &SettingPath, value: Value) -> Result<bool>;

    /// Assign `parameter` wherever it lives in `category`
    fn set_setting(&mut self, category: &str, parameter: &str, value: impl Into<Value>) -> Result<bool> {
        self.set(&SettingPath::new(category, parameter), value.into())
    }

    /// Ordered legal values of an enumerable parameter
    fn lookup_available_values(
        &mut self,
        category: &str,
        subcategory: &str,
        parameter: &str,
    ) -> Result<Vec<Value>>;

    /// Like [`SettingsStore::lookup_available_values`], but a failed lookup
    /// is logged and yields an empty list
    fn get_available_values(&mut self, category: &str, subcategory: &str, parameter: &str) -> Vec<Value> {
        match self.lookup_available_values(category, subcategory, parameter) {
            Ok(values) => values,
            Err(e) => {
                warn!("{}", e);
                Vec::new()
            }
        }
    }
}

impl<E: Engine + ?Sized> SettingsStore for E {
    fn get(&mut self, path: &SettingPath) -> Result<Option<Value>> {
        let container = self.get_settings(&path.category)?;
        Ok(container
            .find(path.subcategory.as_deref(), &path.parameter)
            .map(|p| p.current_value.clone()))
    }

    fn set(&mut self, path: &SettingPath, value: Value) -> Result<bool> {
        let mut container = self.get_settings(&path.category)?;

        let Some(parameter) = container.find_mut(path.subcategory.as_deref(), &path.parameter) else {
            debug!("Setting {} not found, nothing to write", path);
            return Ok(false);
        };

        let old_value = std::mem::replace(&mut parameter.current_value, value);
        if old_value == parameter.current_value {
            debug!("Setting {} already {}", path, old_value);
            return Ok(false);
        }

        debug!(
            "Setting {}: {} -> {}",
            path, old_value, parameter.current_value
        );
        self.save_settings(&path.category, &container)?;
        Ok(true)
    }

    fn lookup_available_values(
        &mut self,
        category: &str,
        subcategory: &str,
        parameter: &str,
    ) -> Result<Vec<Value>> {
        let container = self.get_settings(category).map_err(|e| {
            SessionError::ConfigurationLookup(format!("category {} unavailable: {:#}", category, e))
        })?;

        let sub = container.subcategory(subcategory).ok_or_else(|| {
            SessionError::ConfigurationLookup(format!(
                "subcategory {} not found in {}",
                subcategory, category
            ))
        })?;

        let param = sub
            .parameters
            .iter()
            .find(|p| p.name == parameter)
            .ok_or_else(|| {
                SessionError::ConfigurationLookup(format!(
                    "parameter {} not found in {}/{}",
                    parameter, category, subcategory
                ))
            })?;

        Ok(param.available_values())
    }
}
