use std::path::PathBuf;

use crate::delta::MissingValuePolicy;
use crate::form::{DEFAULT_WINDOW, FormConfig, PointsPerspective};
use crate::optimizer::{DEFAULT_MAX_ITER, DEFAULT_TOLERANCE};

pub const DEFAULT_DB_PATH: &str = "database.db";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_TEST_ROWS: usize = 40;

/// Default statistics regressed on by the delta model.
pub const DEFAULT_STATS: &[&str] = &[
    "forced_drop_outs",
    "kick_meters",
    "line_breaks",
    "meters_gained",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub models_dir: PathBuf,
    pub form_window: usize,
    pub test_rows: usize,
    pub missing_policy: MissingValuePolicy,
    pub perspective: PointsPerspective,
    pub tolerance: f64,
    pub max_iter: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            form_window: DEFAULT_WINDOW,
            test_rows: DEFAULT_TEST_ROWS,
            missing_policy: MissingValuePolicy::ZeroFill,
            perspective: PointsPerspective::Stored,
            tolerance: DEFAULT_TOLERANCE,
            max_iter: DEFAULT_MAX_ITER,
        }
    }
}

impl PipelineConfig {
    /// Reads `NRL_*` variables, falling back to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            db_path: text("NRL_DB_PATH").map(PathBuf::from).unwrap_or(d.db_path),
            models_dir: text("NRL_MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.models_dir),
            form_window: text("NRL_FORM_WINDOW")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(d.form_window)
                .clamp(1, 50),
            test_rows: text("NRL_TEST_ROWS")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(d.test_rows)
                .max(1),
            missing_policy: text("NRL_MISSING_POLICY")
                .and_then(|v| MissingValuePolicy::parse(&v))
                .unwrap_or(d.missing_policy),
            perspective: text("NRL_FORM_PERSPECTIVE")
                .and_then(|v| PointsPerspective::parse(&v))
                .unwrap_or(d.perspective),
            tolerance: text("NRL_OPT_TOLERANCE")
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(d.tolerance),
            max_iter: text("NRL_OPT_MAX_ITER")
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(d.max_iter)
                .clamp(1, 10_000),
        }
    }

    pub fn form_config(&self) -> FormConfig {
        FormConfig::default()
            .with_window(self.form_window)
            .with_perspective(self.perspective)
    }

    pub fn default_stats() -> Vec<String> {
        DEFAULT_STATS.iter().map(|s| s.to_string()).collect()
    }
}
