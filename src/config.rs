use crate::geom::{Point, Size};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TagWeights {
    pub(crate) img: f32,
    pub(crate) paragraph: f32,
    pub(crate) link: f32,
}

impl Default for TagWeights {
    fn default() -> Self {
        Self {
            img: 5.0,
            paragraph: 3.0,
            link: 1.0,
        }
    }
}

/// Behaviour tuning for the pet. Distances are in terminal cells.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct PetConfig {
    pub(crate) start: Point,
    pub(crate) size: Size,
    pub(crate) padding: f32,
    pub(crate) speed: f32,
    pub(crate) chase_speed: f32,
    pub(crate) wake_distance: f32,
    pub(crate) arrive_epsilon: f32,
    pub(crate) drag_threshold: f32,
    pub(crate) jitter: Point,
    pub(crate) min_target_size: Size,
    pub(crate) weights: TagWeights,
    pub(crate) band_refresh_ms: u64,
    pub(crate) stamina_max: f32,
    pub(crate) drain_per_unit: f32,
    pub(crate) chase_cost_multiplier: f32,
    pub(crate) idle_regen: f32,
    pub(crate) sleep_regen: f32,
    pub(crate) disturb_block_ms: u64,
    pub(crate) min_nap_ms: u64,
    pub(crate) idle_sleep_ms: u64,
    pub(crate) dwell_min_ms: u64,
    pub(crate) dwell_max_ms: u64,
    pub(crate) eat_ms: u64,
    pub(crate) escape_rate_per_sec: f32,
    pub(crate) escape_check_ms: u64,
    pub(crate) drag_chatter_ms: u64,
    pub(crate) max_frame_ms: u64,
    pub(crate) tail_char: char,
}

impl Default for PetConfig {
    fn default() -> Self {
        Self {
            start: Point::new(4.0, 6.0),
            size: Size::new(3.0, 1.0),
            padding: 1.0,
            speed: 12.0,
            chase_speed: 20.0,
            wake_distance: 8.0,
            arrive_epsilon: 0.5,
            drag_threshold: 0.5,
            jitter: Point::new(2.0, 0.5),
            min_target_size: Size::new(3.0, 1.0),
            weights: TagWeights::default(),
            band_refresh_ms: 1_200,
            stamina_max: 100.0,
            drain_per_unit: 0.25,
            chase_cost_multiplier: 1.8,
            idle_regen: 1.5,
            sleep_regen: 6.0,
            disturb_block_ms: 2_500,
            min_nap_ms: 3_000,
            idle_sleep_ms: 6_000,
            dwell_min_ms: 800,
            dwell_max_ms: 8_000,
            eat_ms: 2_500,
            escape_rate_per_sec: 0.1,
            escape_check_ms: 400,
            drag_chatter_ms: 1_500,
            max_frame_ms: 32,
            tail_char: '~',
        }
    }
}

impl PetConfig {
    pub(crate) fn band_refresh(&self) -> Duration {
        Duration::from_millis(self.band_refresh_ms)
    }
    pub(crate) fn idle_sleep(&self) -> Duration {
        Duration::from_millis(self.idle_sleep_ms)
    }
    pub(crate) fn eat(&self) -> Duration {
        Duration::from_millis(self.eat_ms)
    }
    pub(crate) fn escape_check(&self) -> Duration {
        Duration::from_millis(self.escape_check_ms.max(1))
    }
    pub(crate) fn max_frame(&self) -> Duration {
        Duration::from_millis(self.max_frame_ms.max(1))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    /// 0 picks a fresh seed every run.
    pub(crate) seed: u64,
    pub(crate) pet: PetConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fps_cap: 30,
            enable_color: true,
            seed: 0,
            pet: PetConfig::default(),
        }
    }
}

pub(crate) struct Paths {
    pub(crate) pantry_path: PathBuf,
    pub(crate) consent_path: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

pub(crate) fn project_paths() -> Result<Paths> {
    let proj = ProjectDirs::from("com", "webcat", "WebCat")
        .context("could not resolve project directories")?;
    let dir = proj.data_local_dir().to_path_buf();
    fs::create_dir_all(&dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    Ok(Paths {
        pantry_path: dir.join("pantry.json"),
        consent_path: dir.join("consent.json"),
        settings_path: dir.join("settings.json"),
        log_path: dir.join("webcat.log"),
    })
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    match fs::read_to_string(path) {
        Ok(s) => match serde_json::from_str::<Settings>(&s) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data)?;
    atomic_rename(&tmp, path)?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> std::io::Result<()> {
    // rename-over-existing fails on Windows
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "fps_cap": 60, "pet": { "speed": 3.5 } }"#).unwrap();
        let s = load_settings(&path);
        assert_eq!(s.fps_cap, 60);
        assert_eq!(s.pet.speed, 3.5);
        assert_eq!(s.pet.escape_check_ms, 400);
        assert!(s.enable_color);
    }

    #[test]
    fn corrupt_settings_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(&path).fps_cap, 30);
    }

    #[test]
    fn settings_survive_atomic_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.seed = 42;
        s.pet.tail_char = '@';
        save_settings_atomic(&path, &s).unwrap();
        save_settings_atomic(&path, &s).unwrap();
        let back = load_settings(&path);
        assert_eq!(back.seed, 42);
        assert_eq!(back.pet.tail_char, '@');
        assert!(!path.with_extension("json.tmp").exists());
    }
}
