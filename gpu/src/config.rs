//! Context configuration.
//!
//! Defaults pick the best compiled-in GPU backend and fall back to the host
//! backend. Both knobs can be overridden from the environment:
//!
//! ```bash
//! TENSOR_GPU_BACKEND=host cargo test      # auto | metal | wgpu | host
//! TENSOR_GPU_POWER=low-power cargo bench  # high-performance | low-power
//! ```

use std::str::FromStr;

use crate::error::{Error, Result};

pub const BACKEND_ENV: &str = "TENSOR_GPU_BACKEND";
pub const POWER_ENV: &str = "TENSOR_GPU_POWER";

/// Which backend a `GpuContext` should create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// First available of Metal, wgpu, then host.
    #[default]
    Auto,
    Metal,
    Wgpu,
    Host,
}

impl FromStr for BackendPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "metal" => Ok(BackendPreference::Metal),
            "wgpu" | "webgpu" => Ok(BackendPreference::Wgpu),
            "host" | "cpu" => Ok(BackendPreference::Host),
            other => Err(Error::invalid_argument(
                "backend",
                format!("unknown backend '{other}'"),
            )),
        }
    }
}

/// Adapter selection hint for the wgpu backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    #[default]
    HighPerformance,
    LowPower,
}

impl FromStr for PowerPreference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high-performance" | "high" => Ok(PowerPreference::HighPerformance),
            "low-power" | "low" => Ok(PowerPreference::LowPower),
            other => Err(Error::invalid_argument(
                "power",
                format!("unknown power preference '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpuConfig {
    pub backend: BackendPreference,
    pub power: PowerPreference,
}

impl GpuConfig {
    /// Defaults overridden by `TENSOR_GPU_BACKEND` / `TENSOR_GPU_POWER`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = GpuConfig::default();
        if let Some(value) = lookup(BACKEND_ENV) {
            match value.parse() {
                Ok(backend) => config.backend = backend,
                Err(e) => log::warn!("ignoring {BACKEND_ENV}: {e}"),
            }
        }
        if let Some(value) = lookup(POWER_ENV) {
            match value.parse() {
                Ok(power) => config.power = power,
                Err(e) => log::warn!("ignoring {POWER_ENV}: {e}"),
            }
        }
        config
    }

    pub fn with_backend(mut self, backend: BackendPreference) -> Self {
        self.backend = backend;
        self
    }
}
