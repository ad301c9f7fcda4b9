//! Run health classification

use serde::{Deserialize, Serialize};

/// Health of a run, from its overall success rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Success rate below 50%
    Critical,
    /// Success rate below 90%
    Warning,
    /// Everything else
    Healthy,
}

impl Severity {
    /// Below this success rate a run is critical
    pub const CRITICAL_BELOW: f64 = 0.5;
    /// Below this success rate a run needs attention
    pub const WARNING_BELOW: f64 = 0.9;

    /// Classify a success rate given as a fraction in `[0, 1]`
    pub fn from_success_rate(rate: f64) -> Self {
        if rate < Self::CRITICAL_BELOW {
            Severity::Critical
        } else if rate < Self::WARNING_BELOW {
            Severity::Warning
        } else {
            Severity::Healthy
        }
    }

    /// Label shown in the banner
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::Warning => "Warning",
            Severity::Healthy => "Healthy",
        }
    }

    /// CSS class of the banner
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Healthy => "healthy",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
