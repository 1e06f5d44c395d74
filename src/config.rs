// binfronts/src/config.rs

use crate::align::{AlignOptions, Quantization};
use crate::geometry::Window;
use crate::{DEFAULT_NROWS, DEFAULT_SENTINEL};
use derive_builder::Builder;

/// Settings of one detection run, validated once and shared by every granule.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct DetectionConfig {
    /// Row count of the binning scheme.
    #[builder(default = "DEFAULT_NROWS")]
    nrows: usize,
    /// Detection context.
    #[builder(default)]
    window: Window,
    /// Records outside this window are dropped after classification.
    #[builder(default, setter(strip_option))]
    output_window: Option<Window>,
    #[builder(default)]
    quantize: bool,
    #[builder(default)]
    log_transform: bool,
    #[builder(default = "DEFAULT_SENTINEL")]
    sentinel: f64,
    #[builder(default = "String::from(\"sst\")", setter(into))]
    sensor: String,
}

impl DetectionConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.nrows == Some(0) {
            return Err("nrows must be positive".to_string());
        }
        if self.log_transform == Some(true) && self.quantize != Some(true) {
            return Err("log_transform requires quantize".to_string());
        }
        if let Some(sentinel) = self.sentinel {
            // codes carry the sentinel as an i32
            if !sentinel.is_finite() || sentinel.fract() != 0.0 || sentinel.abs() > i32::MAX as f64 {
                return Err(format!("sentinel must be an integral value, got {}", sentinel));
            }
            if self.quantize == Some(true) && (0.0..=255.0).contains(&sentinel) {
                return Err(format!(
                    "sentinel {} collides with the quantized range [0, 255]",
                    sentinel
                ));
            }
        }
        if let Some(sensor) = &self.sensor {
            if sensor.is_empty() || sensor.contains(std::path::is_separator) {
                return Err(format!("invalid sensor name '{}'", sensor));
            }
        }
        Ok(())
    }
}

impl DetectionConfig {
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn output_window(&self) -> Option<&Window> {
        self.output_window.as_ref()
    }

    pub fn quantize(&self) -> bool {
        self.quantize
    }

    pub fn log_transform(&self) -> bool {
        self.log_transform
    }

    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    /// Window named in output file names: the output window when set.
    pub fn window_tag(&self) -> String {
        self.output_window.unwrap_or(self.window).tag()
    }

    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            sentinel: self.sentinel,
            quantization: self.quantize.then_some(Quantization {
                log_transform: self.log_transform,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectionConfigBuilder::default().build().unwrap();
        assert_eq!(config.nrows(), 4320);
        assert_eq!(config.window(), &Window::global());
        assert!(config.output_window().is_none());
        assert_eq!(config.sentinel(), -999.0);
        assert_eq!(config.sensor(), "sst");
        assert_eq!(config.align_options(), AlignOptions::default());
        assert_eq!(config.window_tag(), "90S90N_180W180E");
    }

    #[test]
    fn test_chlorophyll_config() {
        let window = Window::new(20.0, 80.0, -180.0, -120.5).unwrap();
        let output = Window::new(30.0, 70.0, -170.0, -130.0).unwrap();
        let config = DetectionConfigBuilder::default()
            .nrows(2160)
            .window(window)
            .output_window(output)
            .quantize(true)
            .log_transform(true)
            .sensor("chlor_a")
            .build()
            .unwrap();
        assert_eq!(config.output_window(), Some(&output));
        assert_eq!(
            config.align_options().quantization,
            Some(Quantization { log_transform: true })
        );
        assert_eq!(config.window_tag(), "30N70N_170W130W");
    }

    #[test]
    fn test_invalid_configs_are_rejected() {
        assert!(DetectionConfigBuilder::default().nrows(0).build().is_err());
        assert!(DetectionConfigBuilder::default().log_transform(true).build().is_err());
        assert!(DetectionConfigBuilder::default().sentinel(f64::NAN).build().is_err());
        assert!(DetectionConfigBuilder::default().sentinel(-0.5).build().is_err());
        assert!(DetectionConfigBuilder::default()
            .quantize(true)
            .sentinel(0.0)
            .build()
            .is_err());
        assert!(DetectionConfigBuilder::default().sensor("").build().is_err());
        assert!(DetectionConfigBuilder::default().sensor("a/b").build().is_err());
    }
}
