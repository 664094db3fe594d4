//! Loader for configuration split across several files.
//!
//! The entry file may list other files under a top-level `include` key;
//! included files may include further files. Every file is read with
//! environment references resolved, and its top-level sections are merged
//! into one table. A section may be defined by exactly one file.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use toml::Table;

/// Loads a configuration file together with everything it includes.
pub struct ConfigLoader {
	base_path: PathBuf,
	visited: HashSet<PathBuf>,
}

impl ConfigLoader {
	/// Creates a loader resolving relative paths against `base_path`.
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			visited: HashSet::new(),
		}
	}

	/// Loads, merges and validates the configuration rooted at `config_path`.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let mut merged = Table::new();
		let mut owners: HashMap<String, PathBuf> = HashMap::new();
		let mut pending = VecDeque::from([self.resolve_path(config_path)?]);

		while let Some(path) = pending.pop_front() {
			let mut table = self.read_table(&path).await?;
			for include in take_includes(&mut table)? {
				pending.push_back(self.resolve_path(include)?);
			}
			merge_sections(&mut merged, &mut owners, table, &path)?;
		}

		let text = toml::to_string(&merged)
			.map_err(|e| ConfigError::Parse(format!("Failed to serialize merged config: {}", e)))?;
		text.parse()
	}

	/// Reads one file, resolving environment references, and rejects files
	/// that were already loaded.
	async fn read_table(&mut self, path: &Path) -> Result<Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;
		if !self.visited.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical.display()
			)));
		}

		let content = tokio::fs::read_to_string(&canonical).await?;
		let resolved = resolve_env_vars(&content)?;
		Ok(toml::from_str(&resolved)?)
	}

	fn resolve_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
		let path = path.as_ref();
		let resolved = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_path.join(path)
		};

		if !resolved.exists() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", resolved.display()),
			)));
		}
		Ok(resolved)
	}
}

/// Removes the `include` key from `table` and returns the listed paths.
fn take_includes(table: &mut Table) -> Result<Vec<PathBuf>, ConfigError> {
	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(ConfigError::Validation(
					"Include array must contain only strings".into(),
				)),
			})
			.collect(),
		Some(_) => Err(ConfigError::Validation(
			"Include must be a string or array of strings".into(),
		)),
	}
}

/// Moves every top-level section of `table` into `merged`, failing when a
/// section was already defined by another file.
fn merge_sections(
	merged: &mut Table,
	owners: &mut HashMap<String, PathBuf>,
	table: Table,
	source: &Path,
) -> Result<(), ConfigError> {
	for (key, value) in table {
		if let Some(existing) = owners.get(&key) {
			return Err(ConfigError::Validation(format!(
				"Duplicate section '{}' found in {} and {}. \
				Each top-level section must be unique across all configuration files.",
				key,
				existing.display(),
				source.display()
			)));
		}
		owners.insert(key.clone(), source.to_path_buf());
		merged.insert(key, value);
	}
	Ok(())
}
