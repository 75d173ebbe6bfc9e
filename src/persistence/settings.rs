use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // Keep label styles on disk between runs instead of only for this session
    #[serde(default)]
    pub persist_styles: bool,
    // If None, the file-backed style store lives under the OS temp dir
    #[serde(default)]
    pub style_store_override: Option<PathBuf>,
    // If None, use OS temporary directory for exports
    #[serde(default)]
    pub export_override: Option<PathBuf>,
    #[serde(default = "AppSettings::default_recenter_delay_ms")]
    pub recenter_delay_ms: u64,
    #[serde(default = "AppSettings::default_sidebar_animation_secs")]
    pub sidebar_animation_secs: f32,
    #[serde(default = "AppSettings::default_dark_mode")]
    pub dark_mode: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            persist_styles: false,
            style_store_override: None,
            export_override: None,
            recenter_delay_ms: Self::default_recenter_delay_ms(),
            sidebar_animation_secs: Self::default_sidebar_animation_secs(),
            dark_mode: Self::default_dark_mode(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Graph-Lens
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Graph-Lens");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Graph-Lens
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Graph-Lens");
            }
            return PathBuf::from("Graph-Lens");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Graph-Lens or ~/.config/Graph-Lens
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Graph-Lens");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Graph-Lens");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        let json_path = Self::config_dir().join("settings.json");
        if !json_path.exists() {
            return Ok(Self::default());
        }
        let mut f = fs::File::open(json_path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let dir = Self::config_dir();
        fs::create_dir_all(&dir)?;
        let path = dir.join("settings.json");
        let s = serde_json::to_string_pretty(self)?;
        let mut f = fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Example: {temp_dir}/Graph-Lens/session
    pub fn style_store_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Lens");
        p.push("session");
        p
    }

    pub fn style_store_dir(&self) -> PathBuf {
        if let Some(p) = &self.style_store_override { return p.clone(); }
        Self::style_store_default_dir()
    }

    /// Default export directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Graph-Lens/exports
    pub fn export_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Graph-Lens");
        p.push("exports");
        p
    }

    /// Effective export directory honoring user override or falling back to OS temp.
    pub fn export_dir(&self) -> PathBuf {
        if let Some(p) = &self.export_override { return p.clone(); }
        Self::export_default_dir()
    }

    pub fn recenter_delay(&self) -> Duration {
        Duration::from_millis(self.recenter_delay_ms)
    }

    pub(crate) fn default_recenter_delay_ms() -> u64 { 100 }
    pub(crate) fn default_sidebar_animation_secs() -> f32 { 0.25 }
    pub(crate) fn default_dark_mode() -> bool { true }
}
