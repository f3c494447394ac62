//! Built-in model tables and the model registry.
//!
//! Each vendor module exposes one constructor per model. [`ModelRegistry`]
//! collects them for lookup by name and accepts additional tables loaded
//! from TOML files at runtime.
//!
//! # Example
//!
//! ```
//! use rust_ivi::models::ModelRegistry;
//!
//! let registry = ModelRegistry::builtin().unwrap();
//! let model = registry.find("pst-3202").unwrap();
//! assert_eq!(model.channel_count(), 3);
//! // instrument models listed by a table resolve to that table
//! assert_eq!(registry.find("62024P-80-60").unwrap().name, "62000P");
//! assert_eq!(registry.find("LT264").unwrap().name, "WaveRunner-2");
//! ```

pub mod agilent;
pub mod chroma;
pub mod gwinstek;
pub mod lecroy;
pub mod prodigit;
pub mod scope;
pub mod scpi;

use crate::error::{IviError, IviResult};
use crate::model::ModelDescription;
use std::path::Path;
use tracing::{debug, warn};

/// Every built-in model table.
///
/// # Errors
///
/// [`IviError::InvalidModel`] if a built-in table is inconsistent.
pub fn builtin_models() -> IviResult<Vec<ModelDescription>> {
    Ok(vec![
        gwinstek::pst3201()?,
        gwinstek::pst3202()?,
        chroma::chroma_62000p()?,
        chroma::chroma_62012p_80_60()?,
        prodigit::prodigit_3311c()?,
        prodigit::prodigit_3000()?,
        scpi::generic_dcload(1)?,
        agilent::u3606a()?,
        agilent::dsox2000a()?,
        agilent::agilent_8590e()?,
        lecroy::waverunner()?,
        lecroy::waverunner2()?,
    ])
}

/// Look up a built-in model by name.
///
/// # Errors
///
/// [`IviError::UnknownModel`] when no built-in table matches.
pub fn find_model(name: &str) -> IviResult<ModelDescription> {
    ModelRegistry::builtin()?.find(name).cloned()
}

/// Set of model tables available to a process.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelDescription>,
}

impl ModelRegistry {
    /// Registry without any tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in tables.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] if a built-in table is inconsistent.
    pub fn builtin() -> IviResult<Self> {
        Ok(Self {
            models: builtin_models()?,
        })
    }

    /// Add a table, replacing any table with the same name.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the table does not validate.
    pub fn register(&mut self, model: ModelDescription) -> IviResult<()> {
        model.validate()?;
        if let Some(existing) = self
            .models
            .iter_mut()
            .find(|m| m.name.eq_ignore_ascii_case(&model.name))
        {
            warn!("Replacing model table '{}'", existing.name);
            *existing = model;
        } else {
            debug!("Registered model table '{}'", model.name);
            self.models.push(model);
        }
        Ok(())
    }

    /// Load a TOML table from `path` and register it. Returns the model name.
    ///
    /// # Errors
    ///
    /// [`IviError::InvalidModel`] when the file cannot be read or parsed.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> IviResult<String> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| IviError::InvalidModel(format!("{}: {e}", path.display())))?;
        let model = ModelDescription::from_toml_str(&source)
            .map_err(|e| IviError::InvalidModel(format!("{}: {e}", path.display())))?;
        let name = model.name.clone();
        self.register(model)?;
        Ok(name)
    }

    /// Find a table by model name, then by supported instrument model.
    /// Both comparisons ignore ASCII case.
    ///
    /// # Errors
    ///
    /// [`IviError::UnknownModel`] when nothing matches.
    pub fn find(&self, name: &str) -> IviResult<&ModelDescription> {
        self.models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                self.models.iter().find(|m| {
                    m.supported_models
                        .iter()
                        .any(|s| s.eq_ignore_ascii_case(name))
                })
            })
            .ok_or_else(|| IviError::UnknownModel(name.to_string()))
    }

    /// Whether a table resolves for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_ok()
    }

    /// Registered tables in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescription> {
        self.models.iter()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_test::traced_test;

    #[test]
    fn test_builtin_names_are_unique() {
        let registry = ModelRegistry::builtin().unwrap();
        let mut names: Vec<_> = registry.iter().map(|m| m.name.to_ascii_lowercase()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), registry.len());
    }

    #[test]
    fn test_unknown_model() {
        assert!(matches!(find_model("HP-6632B"), Err(IviError::UnknownModel(_))));
    }

    #[test]
    fn test_load_file_registers_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
name = "BENCH-1"
class = "power_supply"

[[channels]]
ovp_max = 33.0
ocp_max = 3.0
voltage_max = 30.0
current_max = 3.0

[[attributes]]
name = "voltage_level"
kind = {{ type = "float" }}
query = "volt?"
write = "volt {{value}}"
limit = {{ ceiling = "voltage" }}
"#
        )
        .unwrap();

        let mut registry = ModelRegistry::new();
        assert_eq!(registry.load_file(file.path()).unwrap(), "BENCH-1");
        assert!(registry.contains("bench-1"));
    }

    #[test]
    fn test_load_file_reports_path() {
        let mut registry = ModelRegistry::new();
        let err = registry.load_file("/nonexistent/model.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/model.toml"));
    }

    #[test]
    #[traced_test]
    fn test_register_replaces_same_name() {
        let mut registry = ModelRegistry::builtin().unwrap();
        let before = registry.len();
        let mut model = gwinstek::pst3202().unwrap();
        model.description = "patched".to_string();
        registry.register(model).unwrap();
        assert_eq!(registry.len(), before);
        assert_eq!(registry.find("PST-3202").unwrap().description, "patched");
        assert!(logs_contain("Replacing model table 'PST-3202'"));
    }
}
