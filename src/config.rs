//! Configuration for the accessibility analyzer.

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Emit debug-level logging for each indicator as it is evaluated.
    pub verbose: bool,

    /// Cross-validate `/Alt`/`/ActualText` image tagging against the
    /// actual image XObject (e.g. flag a present-but-empty alt string).
    pub validate_images: bool,

    /// Treat 1-bit (bilevel) images as exempt from alt-text requirements.
    pub ignore_single_bit_images: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerConfig {
    /// Create a new configuration with defaults (all options disabled).
    pub fn new() -> Self {
        Self {
            verbose: false,
            validate_images: false,
            ignore_single_bit_images: false,
        }
    }

    /// Enable verbose per-indicator logging.
    pub fn with_verbose(mut self, enable: bool) -> Self {
        self.verbose = enable;
        self
    }

    /// Enable image cross-validation.
    pub fn with_validate_images(mut self, enable: bool) -> Self {
        self.validate_images = enable;
        self
    }

    /// Exempt single-bit images from alt-text checks.
    pub fn with_ignore_single_bit_images(mut self, enable: bool) -> Self {
        self.ignore_single_bit_images = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_disabled() {
        let config = AnalyzerConfig::default();
        assert!(!config.verbose);
        assert!(!config.validate_images);
        assert!(!config.ignore_single_bit_images);
    }

    #[test]
    fn builder_methods_set_flags() {
        let config = AnalyzerConfig::new()
            .with_verbose(true)
            .with_validate_images(true)
            .with_ignore_single_bit_images(true);
        assert!(config.verbose);
        assert!(config.validate_images);
        assert!(config.ignore_single_bit_images);
    }
}
