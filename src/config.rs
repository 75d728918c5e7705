use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::models::{WeaponProfile, number_of_targets};

/// ライフル 40/60 以外で使う1的あたりの弾数
pub const DEFAULT_EXERCISE_MODE: u32 = 5;

pub const DEFAULT_SMALL_TARGET_IMAGE: &str = "мишень скрин 8х8см.png";
pub const DEFAULT_LARGE_TARGET_IMAGE: &str = "мишень скрин 17х17см.png";

/// 的画像のパス
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// 8×8cm の的
    pub small_target: PathBuf,
    /// 17×17cm の的
    pub large_target: PathBuf,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            small_target: PathBuf::from(DEFAULT_SMALL_TARGET_IMAGE),
            large_target: PathBuf::from(DEFAULT_LARGE_TARGET_IMAGE),
        }
    }
}

/// 設定ファイル (全項目省略可)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfig {
    pub weapon: Option<WeaponProfile>,
    pub exercise: Option<u32>,
    pub exercise_mode: Option<u32>,
    pub shifts: Option<u32>,
    pub shields: Option<Vec<u32>>,
    pub images: Option<ImageConfig>,
    pub output_dir: Option<PathBuf>,
}

impl RawConfig {
    /// YAMLファイルから読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::from_yaml(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
    }

    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// コマンドラインの指定で上書き (指定がある項目のみ)
    pub fn merge(self, overrides: RawConfig) -> RawConfig {
        RawConfig {
            weapon: overrides.weapon.or(self.weapon),
            exercise: overrides.exercise.or(self.exercise),
            exercise_mode: overrides.exercise_mode.or(self.exercise_mode),
            shifts: overrides.shifts.or(self.shifts),
            shields: overrides.shields.or(self.shields),
            images: overrides.images.or(self.images),
            output_dir: overrides.output_dir.or(self.output_dir),
        }
    }

    /// 必須項目を確認して生成設定に変換
    pub fn into_config(self) -> Result<GenerationConfig, ConfigError> {
        let config = GenerationConfig {
            weapon: self.weapon.ok_or(ConfigError::Missing("weapon"))?,
            exercise: self.exercise.ok_or(ConfigError::Missing("exercise"))?,
            exercise_mode: self.exercise_mode,
            shifts: self.shifts.ok_or(ConfigError::Missing("shifts"))?,
            shields: self.shields.ok_or(ConfigError::Missing("shields"))?,
            images: self.images.unwrap_or_default(),
            output_dir: self.output_dir.unwrap_or_else(|| PathBuf::from(".")),
        };

        config.validate()?;
        Ok(config)
    }
}

/// 的シート生成の設定
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub weapon: WeaponProfile,
    /// 練習の総弾数 (20/30/40/60)
    pub exercise: u32,
    /// 1的あたりの弾数 (ライフル 40/60 のみ有効)
    pub exercise_mode: Option<u32>,
    /// 交代数
    pub shifts: u32,
    /// 標的台の番号 (指定順)
    pub shields: Vec<u32>,
    pub images: ImageConfig,
    pub output_dir: PathBuf,
}

impl GenerationConfig {
    /// ライフルで弾数を選択する練習か (40/60)
    pub fn has_selectable_mode(&self) -> bool {
        self.weapon == WeaponProfile::Rifle && matches!(self.exercise, 40 | 60)
    }

    /// 実際に使う1的あたりの弾数
    pub fn exercise_mode(&self) -> u32 {
        if self.has_selectable_mode() {
            self.exercise_mode.unwrap_or(DEFAULT_EXERCISE_MODE)
        } else {
            DEFAULT_EXERCISE_MODE
        }
    }

    /// 1人あたりの的の数
    pub fn number_of_targets(&self) -> u32 {
        number_of_targets(self.exercise, self.exercise_mode())
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exercise == 0 {
            return Err(ConfigError::Validation("exercise must be positive".to_string()));
        }
        if self.shifts == 0 {
            return Err(ConfigError::Validation("shifts must be positive".to_string()));
        }
        if self.shields.iter().all(|&s| s == 0) {
            return Err(ConfigError::Validation("shields must contain a non-zero number".to_string()));
        }

        if self.has_selectable_mode() {
            match self.exercise_mode {
                Some(1) | Some(2) => {}
                Some(mode) => {
                    return Err(ConfigError::Validation(format!(
                        "exercise_mode must be 1 or 2 for rifle {} (got {})",
                        self.exercise, mode
                    )));
                }
                None => {
                    return Err(ConfigError::Validation(format!(
                        "exercise_mode (1 or 2) is required for rifle {}",
                        self.exercise
                    )));
                }
            }
        } else if let Some(mode) = self.exercise_mode {
            if mode != DEFAULT_EXERCISE_MODE {
                warn!(
                    "exercise_mode {} は {} {} では使われません ({}発で計算します)",
                    mode, self.weapon, self.exercise, DEFAULT_EXERCISE_MODE
                );
            }
        }

        Ok(())
    }

    /// 標的台の一覧を `[1, 2, 5]` の形式で表示
    pub fn shields_label(&self) -> String {
        let items: Vec<String> = self.shields.iter().map(|s| s.to_string()).collect();
        format!("[{}]", items.join(", "))
    }

    /// 設定の概要を表示
    pub fn print_summary(&self) {
        println!("--------------------------------");
        println!("=== 設定情報 ===");
        println!("武器: {}", self.weapon);
        println!("練習: {}", self.exercise);
        println!("1的あたりの弾数: {}", self.exercise_mode());
        println!("交代数: {}", self.shifts);
        println!("標的台: {}", self.shields_label());
        println!("1人あたりの的の数: {}", self.number_of_targets());
        println!("--------------------------------");
    }
}

/// 設定読み込みエラー
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("必須項目がありません: {0}")]
    Missing(&'static str),

    #[error("設定検証エラー: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rifle(exercise: u32, exercise_mode: Option<u32>) -> GenerationConfig {
        GenerationConfig {
            weapon: WeaponProfile::Rifle,
            exercise,
            exercise_mode,
            shifts: 2,
            shields: vec![2, 5],
            images: ImageConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
weapon: винтовка
exercise: 40
exercise_mode: 2
shifts: 3
shields: [1, 0, 5]
images:
  small_target: small.png
"#;
        let config = RawConfig::from_yaml(yaml).unwrap().into_config().unwrap();
        assert_eq!(config.weapon, WeaponProfile::Rifle);
        assert_eq!(config.shields, vec![1, 0, 5]);
        assert_eq!(config.images.small_target, PathBuf::from("small.png"));
        assert_eq!(config.images.large_target, PathBuf::from(DEFAULT_LARGE_TARGET_IMAGE));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.number_of_targets(), 20);
    }

    #[test]
    fn test_unknown_weapon_is_parse_error() {
        assert!(RawConfig::from_yaml("weapon: bow").is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = RawConfig::from_yaml("weapon: pistol\nexercise: 30\nshifts: 2\nshields: [1]").unwrap();
        let overrides = RawConfig {
            shifts: Some(4),
            shields: Some(vec![3, 4]),
            ..RawConfig::default()
        };
        let config = base.merge(overrides).into_config().unwrap();
        assert_eq!(config.weapon, WeaponProfile::Pistol);
        assert_eq!(config.shifts, 4);
        assert_eq!(config.shields, vec![3, 4]);
    }

    #[test]
    fn test_missing_required_field() {
        let raw = RawConfig::from_yaml("weapon: pistol\nexercise: 30\nshields: [1]").unwrap();
        assert!(matches!(raw.into_config(), Err(ConfigError::Missing("shifts"))));
    }

    #[test]
    fn test_exercise_mode_rules() {
        assert_eq!(rifle(40, Some(1)).exercise_mode(), 1);
        assert_eq!(rifle(60, Some(2)).number_of_targets(), 30);
        assert_eq!(rifle(20, Some(2)).exercise_mode(), 5);
        assert_eq!(rifle(20, None).number_of_targets(), 4);

        let mut pistol = rifle(30, Some(1));
        pistol.weapon = WeaponProfile::Pistol;
        assert_eq!(pistol.exercise_mode(), 5);
        assert!(pistol.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        assert!(rifle(40, Some(2)).validate().is_ok());
        assert!(matches!(rifle(40, None).validate(), Err(ConfigError::Validation(_))));
        assert!(matches!(rifle(60, Some(3)).validate(), Err(ConfigError::Validation(_))));
        assert!(rifle(0, None).validate().is_err());

        let mut config = rifle(20, None);
        config.shifts = 0;
        assert!(config.validate().is_err());

        config.shifts = 1;
        config.shields = vec![0, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shields_label() {
        assert_eq!(rifle(20, None).shields_label(), "[2, 5]");
    }

    #[test]
    fn test_from_file_not_found() {
        let result = RawConfig::from_file("no/such/config.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
