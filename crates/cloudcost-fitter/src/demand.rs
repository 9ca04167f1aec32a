//! Per-job resource demand.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;

use crate::error::{FitError, FitterResult};

/// Resources one job used, as fed to the fitter.
///
/// Validated on construction and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceDemand {
    cpus: u32,
    gpus: u32,
    mem_mb: f64,
    nodes: u32,
    duration_minutes: f64,
    #[serde(skip)]
    duration: Decimal,
}

impl ResourceDemand {
    pub fn new(
        cpus: u32,
        gpus: u32,
        mem_mb: f64,
        nodes: u32,
        duration_minutes: f64,
    ) -> FitterResult<Self> {
        if !mem_mb.is_finite() || mem_mb < 0.0 {
            return Err(FitError::InvalidDemand(format!(
                "memory must be a non-negative number of MB, got {mem_mb}"
            )));
        }
        if nodes == 0 {
            return Err(FitError::InvalidDemand("node count must be at least 1".to_string()));
        }
        if !duration_minutes.is_finite() || duration_minutes < 0.0 {
            return Err(FitError::InvalidDemand(format!(
                "duration must be a non-negative number of minutes, got {duration_minutes}"
            )));
        }
        let duration = Decimal::from_f64(duration_minutes).ok_or_else(|| {
            FitError::InvalidDemand(format!("duration {duration_minutes} is out of range"))
        })?;

        Ok(Self {
            cpus,
            gpus,
            mem_mb,
            nodes,
            duration_minutes,
            duration,
        })
    }

    pub fn cpus(&self) -> u32 {
        self.cpus
    }

    pub fn gpus(&self) -> u32 {
        self.gpus
    }

    pub fn mem_mb(&self) -> f64 {
        self.mem_mb
    }

    pub fn nodes(&self) -> u32 {
        self.nodes
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Duration as an exact decimal for pricing.
    pub fn duration(&self) -> Decimal {
        self.duration
    }

    /// No cpus, gpus or memory requested.
    pub fn is_zero(&self) -> bool {
        self.cpus == 0 && self.gpus == 0 && self.mem_mb == 0.0
    }

    /// Copy of this demand with a different value for one resource.
    pub fn with_cpus(&self, cpus: u32) -> Self {
        Self { cpus, ..*self }
    }

    pub fn with_gpus(&self, gpus: u32) -> Self {
        Self { gpus, ..*self }
    }

    pub fn with_mem_mb(&self, mem_mb: f64) -> FitterResult<Self> {
        Self::new(self.cpus, self.gpus, mem_mb, self.nodes, self.duration_minutes)
    }
}
