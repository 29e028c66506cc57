use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SieveError;
use crate::segmenter::Range;

/// Which side of the number field sieve the siever works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Algebraic,
    Rational,
}

impl Side {
    /// Siever flag letter (`-a` / `-r`).
    pub fn flag(self) -> &'static str {
        match self {
            Side::Algebraic => "a",
            Side::Rational => "r",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Algebraic => "algebraic",
            Side::Rational => "rational",
        }
    }
}

/// Optional factor-base preparation step (section `[factor_base]` in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorBaseConfig {
    /// Program to run once before sieving, looked up on `PATH`.
    pub program: String,
    /// Generation mode passed as `-<mode>`.
    #[serde(default = "default_fb_mode")]
    pub mode: String,
}

fn default_fb_mode() -> String {
    "F".to_string()
}

/// Global configuration loaded from `~/.config/latsieve/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveConfig {
    /// Prefix prepended to the siever name given on the command line.
    pub siever_prefix: String,
    /// Default outer save-batch length when `-d` is not given.
    pub save_delta: u64,
    /// Nice value for siever processes on Unix (Windows uses idle priority class).
    pub niceness: i32,
    /// Write the relations file as concatenated gzip members (`<name>.rels.gz`).
    #[serde(default)]
    pub compress_results: bool,
    /// Remove the checkpoint once the requested range is done. When false the
    /// final checkpoint is kept so repeating a finished command is a no-op.
    #[serde(default)]
    pub clear_on_completion: bool,
    /// Optional factor-base preparation step.
    #[serde(default)]
    pub factor_base: Option<FactorBaseConfig>,
}

impl Default for SieveConfig {
    fn default() -> Self {
        Self {
            siever_prefix: "gnfs-".to_string(),
            save_delta: 10_000,
            niceness: 19,
            compress_results: false,
            clear_on_completion: false,
            factor_base: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("latsieve")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<SieveConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = SieveConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: SieveConfig = toml::from_str(&data)?;
    Ok(cfg)
}

/// How a siever (or the factor-base tool) is started: the program plus any
/// arguments that precede the generated ones (e.g. a wrapper script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSpec {
    pub program: PathBuf,
    pub leading_args: Vec<String>,
}

impl ProgramSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    pub fn with_leading_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.leading_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Display form used in log lines.
    pub fn display_name(&self) -> String {
        self.program.display().to_string()
    }
}

/// Everything one run needs, fixed at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// First q of the requested range.
    pub q_start: u64,
    /// Length of the requested range.
    pub q_length: u64,
    /// Worker budget per batch.
    pub workers: usize,
    pub side: Side,
    /// Run-unique name; prefixes every file the run creates.
    pub unique_name: String,
    pub siever: ProgramSpec,
    /// Outer save-batch length.
    pub save_delta: u64,
    /// Shared polynomial description handed to every siever.
    pub poly: PathBuf,
    /// Directory holding the result store, checkpoint and temporaries.
    pub work_dir: PathBuf,
    pub niceness: i32,
    pub compress_results: bool,
    pub clear_on_completion: bool,
    pub factor_base: Option<FactorBaseStep>,
}

/// Resolved factor-base preparation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorBaseStep {
    pub program: ProgramSpec,
    pub mode: String,
}

impl RunConfig {
    /// The requested range `[q_start, q_start + q_length)`; fails when its
    /// end does not fit in a `u64`.
    pub fn requested_range(&self) -> Result<Range, SieveError> {
        Range::try_new(self.q_start, self.q_length)
    }

    /// Cumulative relations file.
    pub fn results_path(&self) -> PathBuf {
        let ext = if self.compress_results { "rels.gz" } else { "rels" };
        self.work_dir.join(format!("{}.{}", self.unique_name, ext))
    }

    /// Current checkpoint file; `.old` and `.tmp` siblings live next to it.
    pub fn checkpoint_path(&self) -> PathBuf {
        checkpoint_path_for(&self.work_dir, &self.unique_name)
    }

    /// Debug log written next to the results.
    pub fn log_path(&self) -> PathBuf {
        self.work_dir.join(format!("{}.log", self.unique_name))
    }

    /// Per-unit siever output for `[start, start + length)`.
    pub fn unit_output_path(&self, start: u64, length: u64) -> PathBuf {
        self.work_dir
            .join(format!("{}_{}_{}.out", self.unique_name, start, length))
    }

    /// Private copy of the polynomial file for one slot.
    pub fn slot_poly_path(&self, slot: usize) -> PathBuf {
        self.work_dir
            .join(format!("{}.poly.t{}", self.unique_name, slot))
    }
}

/// Checkpoint path for a run name, usable without a full `RunConfig`.
pub fn checkpoint_path_for(work_dir: &Path, unique_name: &str) -> PathBuf {
    work_dir.join(format!("{}.resume", unique_name))
}
