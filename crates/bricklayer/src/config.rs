//! # Universe Configuration
//!
//! One TOML file with a table per unit:
//!
//! ```toml
//! import_units = 32
//!
//! [client]
//! server_url = "http://localhost:8080/lego"
//! network_enabled = true
//!
//! [voxelizer]
//! seed = 42
//! palette = ["red", "blue"]
//! ```

use std::path::Path;

use bricklayer_networking::ClientConfig;
use bricklayer_voxel::{VoxelizerConfig, MAX_RESOLUTION};
use serde::{Deserialize, Serialize};

use crate::error::{BricklayerError, BricklayerResult};

/// Everything a [`Universe`](crate::Universe) needs at startup.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Replication settings.
    pub client: ClientConfig,
    /// Mesh import settings.
    pub voxelizer: VoxelizerConfig,
    /// Default voxels along a mesh's longest axis.
    pub import_units: Option<u32>,
}

impl UniverseConfig {
    /// Voxels along the longest axis when the caller does not say.
    pub const DEFAULT_IMPORT_UNITS: u32 = 32;

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Malformed TOML, an invalid client section, or `import_units`
    /// outside `1..=MAX_RESOLUTION`.
    pub fn from_toml_str(text: &str) -> BricklayerResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| BricklayerError::Config(format!("failed to parse config: {e}")))?;
        config.client.validate()?;
        if let Some(units) = config.import_units {
            if units == 0 || units > MAX_RESOLUTION {
                return Err(BricklayerError::Config(format!(
                    "import_units must be in 1..={MAX_RESOLUTION}, got {units}"
                )));
            }
        }
        Ok(config)
    }

    /// Reads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Unreadable file or invalid contents.
    pub fn load(path: impl AsRef<Path>) -> BricklayerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BricklayerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Resolution used by [`Universe::import_mesh`](crate::Universe::import_mesh).
    #[must_use]
    pub fn import_units(&self) -> u32 {
        self.import_units.unwrap_or(Self::DEFAULT_IMPORT_UNITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bricklayer_core::Palette;

    #[test]
    fn test_sections_default_independently() {
        let config = UniverseConfig::from_toml_str(
            "import_units = 16\n[client]\nnetwork_enabled = false\n[voxelizer]\nseed = 42\npalette = [\"red\", \"blue\"]\n",
        )
        .unwrap();
        assert_eq!(config.import_units(), 16);
        assert!(!config.client.network_enabled);
        assert_eq!(config.client.server_url, ClientConfig::default().server_url);
        assert_eq!(config.voxelizer.seed, 42);
        assert_eq!(config.voxelizer.palette, vec![Palette::Red, Palette::Blue]);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(UniverseConfig::from_toml_str("").unwrap(), UniverseConfig::default());
        assert_eq!(UniverseConfig::default().import_units(), 32);
    }

    #[test]
    fn test_invalid_client_section() {
        let err = UniverseConfig::from_toml_str("[client]\ngrid_min = [0, 0, 0]\ngrid_max = [-1, 0, 0]\n");
        assert!(matches!(err, Err(BricklayerError::Replication(_))));
        assert!(matches!(UniverseConfig::from_toml_str("client = 3"), Err(BricklayerError::Config(_))));
    }

    #[test]
    fn test_import_units_range() {
        for bad in ["import_units = 0", "import_units = 257", "import_units = 4294967295"] {
            assert!(matches!(UniverseConfig::from_toml_str(bad), Err(BricklayerError::Config(_))), "{bad}");
        }
        assert_eq!(UniverseConfig::from_toml_str("import_units = 256").unwrap().import_units(), 256);
    }
}
