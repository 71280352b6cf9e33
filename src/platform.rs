//! Platform identification.
//!
//! The self-test asks two questions of the platform: which board is this, and does
//! it expose a serial subsystem at all. [`SysfsProbe`] answers them from the device
//! tree; [`FixedProbe`] answers them from whatever a test tells it.

use crate::board::Board;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Device-tree model string on Linux boards.
pub const DEFAULT_MODEL_PATH: &str = "/proc/device-tree/model";

/// Fallback source for the board name.
pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Identity of the hardware we are running on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformId {
    Artik5,
    Artik10,
    /// Anything else, carrying the model string that was detected.
    Other(String),
}

impl PlatformId {
    /// The supported board this platform corresponds to, if any.
    pub fn board(&self) -> Option<Board> {
        match self {
            PlatformId::Artik5 => Some(Board::Artik5),
            PlatformId::Artik10 => Some(Board::Artik10),
            PlatformId::Other(_) => None,
        }
    }

    /// Classify a free-form model string such as
    /// `"Samsung Artik5 board based on Exynos3250"`.
    pub fn from_model(model: &str) -> Self {
        let normalized: String = model
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();

        // Later ARTIK modules (530, 710) share the prefix but not the UART layout.
        if normalized.contains("artik10") {
            PlatformId::Artik10
        } else if normalized.contains("artik5") && !normalized.contains("artik530") {
            PlatformId::Artik5
        } else {
            PlatformId::Other(model.trim().to_string())
        }
    }
}

impl FromStr for PlatformId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PlatformId::from_model(s))
    }
}

impl From<Board> for PlatformId {
    fn from(board: Board) -> Self {
        match board {
            Board::Artik5 => PlatformId::Artik5,
            Board::Artik10 => PlatformId::Artik10,
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformId::Artik5 => write!(f, "{}", Board::Artik5),
            PlatformId::Artik10 => write!(f, "{}", Board::Artik10),
            PlatformId::Other(model) if model.is_empty() => write!(f, "unknown platform"),
            PlatformId::Other(model) => write!(f, "{model}"),
        }
    }
}

/// A hardware subsystem a platform may or may not expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Serial,
    Gpio,
}

/// Subsystems wired out on both ARTIK development boards.
const ARTIK_CAPABILITIES: &[Capability] = &[Capability::Serial, Capability::Gpio];

/// Answers platform questions for the self-test.
pub trait PlatformProbe: Send + Sync {
    fn detect_platform(&self) -> PlatformId;

    fn is_capability_available(&self, capability: Capability) -> bool;
}

/// Probe backed by procfs.
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    model_path: PathBuf,
    cpuinfo_path: PathBuf,
    forced: Option<PlatformId>,
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH, DEFAULT_CPUINFO_PATH)
    }
}

impl SysfsProbe {
    pub fn new(model_path: impl Into<PathBuf>, cpuinfo_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            cpuinfo_path: cpuinfo_path.into(),
            forced: None,
        }
    }

    /// Skip detection and report `platform` instead.
    pub fn with_forced(mut self, platform: Option<PlatformId>) -> Self {
        self.forced = platform;
        self
    }

    fn read_model(path: &Path) -> Option<String> {
        let raw = std::fs::read(path).ok()?;
        // Device-tree strings are NUL terminated.
        let text = String::from_utf8_lossy(&raw);
        let model = text.trim_end_matches('\0').trim();
        (!model.is_empty()).then(|| model.to_string())
    }

    fn read_cpuinfo_hardware(path: &Path) -> Option<String> {
        let content = std::fs::read_to_string(path).ok()?;
        content.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            (key == "Hardware" || key == "Model").then(|| value.trim().to_string())
        })
    }
}

impl PlatformProbe for SysfsProbe {
    fn detect_platform(&self) -> PlatformId {
        if let Some(forced) = &self.forced {
            debug!(platform = %forced, "platform forced by configuration");
            return forced.clone();
        }

        let mut detected = PlatformId::Other(String::new());
        if let Some(model) = Self::read_model(&self.model_path) {
            debug!(%model, path = %self.model_path.display(), "device-tree model");
            detected = PlatformId::from_model(&model);
        }
        if detected.board().is_none() {
            if let Some(hardware) = Self::read_cpuinfo_hardware(&self.cpuinfo_path) {
                debug!(%hardware, "cpuinfo hardware");
                let from_cpuinfo = PlatformId::from_model(&hardware);
                if from_cpuinfo.board().is_some() || detected == PlatformId::Other(String::new()) {
                    detected = from_cpuinfo;
                }
            }
        }
        detected
    }

    fn is_capability_available(&self, capability: Capability) -> bool {
        if self.detect_platform().board().is_some() {
            return ARTIK_CAPABILITIES.contains(&capability);
        }
        match capability {
            Capability::Serial => serialport::available_ports()
                .map(|ports| !ports.is_empty())
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Probe that reports a fixed answer.
#[derive(Debug, Clone)]
pub struct FixedProbe {
    platform: PlatformId,
    capabilities: Vec<Capability>,
}

impl FixedProbe {
    pub fn new(platform: PlatformId, capabilities: &[Capability]) -> Self {
        Self {
            platform,
            capabilities: capabilities.to_vec(),
        }
    }

    /// A supported board with every subsystem present.
    pub fn board(board: Board) -> Self {
        Self::new(board.into(), ARTIK_CAPABILITIES)
    }
}

impl PlatformProbe for FixedProbe {
    fn detect_platform(&self) -> PlatformId {
        self.platform.clone()
    }

    fn is_capability_available(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
