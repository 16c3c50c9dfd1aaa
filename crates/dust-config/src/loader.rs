//! Multi-file configuration loading.
//!
//! The entry file may list other files under `include`. Included files are
//! merged section by section; a top-level section defined in two files is an
//! error, as is a file that is reached twice.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub struct ConfigLoader {
	/// Directory relative includes are resolved against.
	base_path: PathBuf,
	/// Canonical paths of files already read.
	loaded_files: HashSet<PathBuf>,
	/// File each top-level section came from, for error messages.
	section_sources: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_path: impl AsRef<Path>) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
			loaded_files: HashSet::new(),
			section_sources: HashMap::new(),
		}
	}

	/// Loads `config_path` and everything it includes into a validated
	/// [`Config`].
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let config_path = self.resolve_path(config_path)?;

		let main_content = self.load_file(&config_path).await?;
		let main_toml: toml::Value = toml::from_str(&main_content)?;

		let includes = self.extract_includes(&main_toml)?;
		if includes.is_empty() {
			return main_content.parse();
		}

		let combined = self
			.load_and_combine(main_toml, includes, config_path)
			.await?;
		let combined_str = toml::to_string(&combined).map_err(|e| {
			ConfigError::Parse(format!("Failed to serialize combined config: {}", e))
		})?;
		combined_str.parse()
	}

	async fn load_file(&mut self, path: &Path) -> Result<String, ConfigError> {
		let canonical_path = path.canonicalize().map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Cannot resolve path {}: {}", path.display(), e),
			))
		})?;

		if !self.loaded_files.insert(canonical_path.clone()) {
			return Err(ConfigError::Validation(format!(
				"Circular include detected: {} was already loaded",
				canonical_path.display()
			)));
		}

		let content = tokio::fs::read_to_string(path).await?;
		resolve_env_vars(&content)
	}

	fn extract_includes(&self, toml: &toml::Value) -> Result<Vec<PathBuf>, ConfigError> {
		match toml.get("include") {
			None => Ok(Vec::new()),
			Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
			Some(toml::Value::Array(items)) => items
				.iter()
				.map(|item| {
					item.as_str().map(PathBuf::from).ok_or_else(|| {
						ConfigError::Validation("Include array must contain only strings".into())
					})
				})
				.collect(),
			Some(_) => Err(ConfigError::Validation(
				"Include must be a string or array of strings".into(),
			)),
		}
	}

	async fn load_and_combine(
		&mut self,
		mut main_toml: toml::Value,
		includes: Vec<PathBuf>,
		main_file_path: PathBuf,
	) -> Result<toml::Value, ConfigError> {
		let main_table = main_toml
			.as_table_mut()
			.ok_or_else(|| ConfigError::Validation("Config root must be a table".into()))?;
		main_table.remove("include");
		for key in main_table.keys() {
			self.section_sources
				.insert(key.clone(), main_file_path.clone());
		}

		for include_path in includes {
			let resolved_path = self.resolve_path(&include_path)?;
			let include_content = self.load_file(&resolved_path).await?;
			let include_toml: toml::Table = toml::from_str(&include_content)?;

			for (key, value) in include_toml {
				if let Some(existing_source) = self.section_sources.get(&key) {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' found in {} and {}. \
						Each top-level section must be unique across all configuration files.",
						key,
						existing_source.display(),
						resolved_path.display()
					)));
				}
				self.section_sources
					.insert(key.clone(), resolved_path.clone());
				main_table.insert(key, value);
			}
		}

		Ok(main_toml)
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::tests::VALID_CONFIG;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		fs::write(&config_path, VALID_CONFIG).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.aggregator.id, "test-aggregator");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let (main_part, prices_part) = VALID_CONFIG
			.split_once("[prices]")
			.unwrap();
		let (prices_part, rest) = prices_part.split_once("[delivery]").unwrap();

		let main_config = format!(
			"include = [\"prices.toml\"]\n{}\n[delivery]{}",
			main_part, rest
		);
		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(
			temp_dir.path().join("prices.toml"),
			format!("[prices]{}", prices_part),
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.aggregator.id, "test-aggregator");
		assert_eq!(config.prices.primary, "static");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let main_config = "include = [\"duplicate.toml\"]\n\n[aggregator]\nid = \"one\"\n";
		let duplicate_config = "[aggregator]\nid = \"two\"\n";

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("duplicate.toml"), duplicate_config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("main.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("Duplicate section 'aggregator'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		let config = "include = [\"self.toml\"]\n\n[aggregator]\nid = \"loop\"\n";
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let error_msg = loader
			.load_config("self.toml")
			.await
			.unwrap_err()
			.to_string();
		assert!(error_msg.contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			"include = \"missing.toml\"\n",
		)
		.unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let result = loader.load_config("main.toml").await;
		assert!(matches!(result, Err(ConfigError::Io(_))));
	}
}
