//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::{Config, LOG_FORMATS, LOG_LEVELS};

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.image_formats.iter().all(|f| f.trim().is_empty()) {
            return Err(ConfigError::NoImageFormats);
        }
        if self.thumbnail_size == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnailSize must be > 0".into(),
            ));
        }
        if self.optimised_image_sizes.contains(&0) {
            return Err(ConfigError::ValidationError(
                "optimisedImageSizes entries must be > 0".into(),
            ));
        }
        if !(1..=100).contains(&self.optimised_image_colour_quality) {
            return Err(ConfigError::ValidationError(
                "optimisedImageColourQuality must be between 1 and 100".into(),
            ));
        }
        if self.optimised_image_compression_level > 9 {
            return Err(ConfigError::ValidationError(
                "optimisedImageCompressionLevel must be between 0 and 9".into(),
            ));
        }
        if self.optimised_images_directory.trim_matches('/').is_empty() {
            return Err(ConfigError::ValidationError(
                "optimisedImagesDirectory must not be empty".into(),
            ));
        }
        if self
            .optimised_images_directory
            .split(['/', '\\'])
            .any(|segment| segment == "..")
        {
            return Err(ConfigError::ValidationError(
                "optimisedImagesDirectory must not contain '..' segments".into(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be one of {}",
                LOG_FORMATS.join(", ")
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_formats() {
        let mut config = Config::default();
        config.image_formats.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NoImageFormats));
    }

    #[test]
    fn test_validate_rejects_zero_thumbnail_size() {
        let mut config = Config::default();
        config.thumbnail_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("thumbnailSize"));
    }

    #[test]
    fn test_validate_rejects_zero_variant_size() {
        let mut config = Config::default();
        config.optimised_image_sizes = vec![640, 0];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("optimisedImageSizes"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.optimised_image_colour_quality = 0;
        assert!(config.validate().is_err());
        config.optimised_image_colour_quality = 101;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("optimisedImageColourQuality"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_compression() {
        let mut config = Config::default();
        config.optimised_image_compression_level = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("optimisedImageCompressionLevel"));
    }

    #[test]
    fn test_validate_rejects_parent_segments_in_output_dir() {
        let mut config = Config::default();
        for dir in ["..", "../site", "img/../../x", "img\\..\\.."] {
            config.optimised_images_directory = dir.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("optimisedImagesDirectory"), "{dir}");
        }
        config.optimised_images_directory = "img/..hidden".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }
}
