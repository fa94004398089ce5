use crate::model::MotionRules;
use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::warn;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "retropet")]
#[command(about = "A bouncing pixel pig that naps when you tell it to")]
pub(crate) struct Cli {
    /// Frames per second (10..=240)
    #[arg(long)]
    pub(crate) fps: Option<u32>,

    /// Directory holding pig-left.png, pig-right.png, pig-sleep.png, pig-sleepR.png
    #[arg(long)]
    pub(crate) sprites: Option<PathBuf>,

    /// Sprite edge length in braille sub-pixels
    #[arg(long)]
    pub(crate) sprite_size: Option<u32>,

    /// Force monochrome (no colors)
    #[arg(long, default_value_t = false)]
    pub(crate) mono: bool,

    /// Ignore care buttons while the pig is napping
    #[arg(long, default_value_t = false)]
    pub(crate) lock_controls: bool,

    /// Log file (default: retropet.log in the data directory)
    #[arg(long)]
    pub(crate) log: Option<PathBuf>,
}

/// Largest sprite edge, in sub-pixels, a run will draw.
const MAX_SPRITE_EDGE: u32 = 256;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) sprite_dir: PathBuf,
    pub(crate) sprite_size: u32,
    pub(crate) lock_controls_while_sleeping: bool,
    pub(crate) motion: MotionRules,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 60,
            enable_color: true,
            sprite_dir: PathBuf::from("icon"),
            sprite_size: 24,
            lock_controls_while_sleeping: false,
            motion: MotionRules::default(),
        }
    }
}

impl Settings {
    /// Command-line values win for this run only.
    pub(crate) fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(fps) = cli.fps {
            self.fps_cap = fps;
        }
        if let Some(dir) = &cli.sprites {
            self.sprite_dir = dir.clone();
        }
        if let Some(size) = cli.sprite_size {
            self.sprite_size = size;
        }
        if cli.mono {
            self.enable_color = false;
        }
        if cli.lock_controls {
            self.lock_controls_while_sleeping = true;
        }
        self
    }

    pub(crate) fn frame_fps(&self) -> u32 {
        self.fps_cap.clamp(10, 240)
    }

    /// Sprite edge in braille sub-pixels.
    pub(crate) fn sprite_edge(&self) -> f32 {
        self.sprite_size.clamp(4, MAX_SPRITE_EDGE) as f32
    }
}

pub(crate) struct Paths {
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
    pub(crate) cache_root: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "retropet", "RetroPet")
        .context("could not resolve project directories")?;
    let data = proj.data_local_dir().to_path_buf();
    let cache = proj.cache_dir().to_path_buf();
    fs::create_dir_all(&data).with_context(|| format!("creating {}", data.display()))?;
    fs::create_dir_all(&cache).with_context(|| format!("creating {}", cache.display()))?;
    Ok(Paths {
        settings_path: data.join("settings.json"),
        log_path: data.join("retropet.log"),
        cache_root: cache,
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    let Ok(s) = fs::read_to_string(path) else {
        return Settings::default();
    };
    match serde_json::from_str::<Settings>(&s) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> Result<()> {
    // rename-over-existing fails on Windows
    if to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)?;
    Ok(())
}
