//! # Layout モジュール
//!
//! 武器プロファイルごとに、どのラベルでどの画像をページ上のどの位置へ
//! 配置するかを決定します。
//!
//! ## ライフル
//!
//! 小さい的 (8cm) を6枚、6ラベルごと (カウンタ 0, 6, 12, …) に配置します。
//! 2列 × 3行 の配置で、行間隔は 227.5pt と 2×227pt が混在しています。
//! 印刷済みの用紙と位置を合わせるため、この値はそのまま維持します。
//!
//! ## ピストル
//!
//! ラベルごとに大きい的 (17cm) 1枚と小さい的 2枚を配置します。

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::models::common::Emu;

/// ページ原点からの基準オフセット (pt)
const BASE_OFFSET_X_PT: f64 = 70.0;
const RIFLE_BASE_OFFSET_Y_PT: f64 = 55.0;
const PISTOL_BASE_OFFSET_Y_PT: f64 = 68.0;
/// 大きい的の上端 (ページ上端からの固定値)
const PISTOL_LARGE_TOP_PT: f64 = 40.0;

const INSET_PT: f64 = 1.0;
const COLUMN_PITCH_PT: f64 = 227.5;
const ROW_PITCH_PT: f64 = 227.5;
const WIDE_ROW_PITCH_PT: f64 = 227.0 * 2.0;

/// ライフルで画像を配置する間隔 (ラベル数)
pub const RIFLE_CADENCE: usize = 6;

const SMALL_TARGET_WIDTH_CM: f64 = 8.0;
const LARGE_TARGET_WIDTH_CM: f64 = 17.0;

/// 武器プロファイル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponProfile {
    #[serde(alias = "винтовка")]
    Rifle,
    #[serde(alias = "пистолет")]
    Pistol,
}

impl WeaponProfile {
    /// 出力ファイル名に使う2文字の武器コード
    pub fn code(&self) -> &'static str {
        match self {
            WeaponProfile::Rifle => "ВП",
            WeaponProfile::Pistol => "ПП",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WeaponProfile::Rifle => "винтовка",
            WeaponProfile::Pistol => "пистолет",
        }
    }
}

impl FromStr for WeaponProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rifle" | "винтовка" => Ok(WeaponProfile::Rifle),
            "pistol" | "пистолет" => Ok(WeaponProfile::Pistol),
            _ => Err(format!("無効な武器: {}. 利用可能: rifle, pistol", s)),
        }
    }
}

impl fmt::Display for WeaponProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// 配置する的画像の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetImage {
    /// 8×8cm の的
    Small,
    /// 17×17cm の的
    Large,
}

impl TargetImage {
    /// 表示幅 (高さは画像の縦横比から決まる)
    pub fn display_width(&self) -> Emu {
        match self {
            TargetImage::Small => Emu::from_cm(SMALL_TARGET_WIDTH_CM),
            TargetImage::Large => Emu::from_cm(LARGE_TARGET_WIDTH_CM),
        }
    }
}

/// 1枚の画像の配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub offset_x: Emu,
    pub offset_y: Emu,
    pub image: TargetImage,
    pub display_width: Emu,
}

impl Placement {
    fn at_pt(image: TargetImage, x_pt: f64, y_pt: f64) -> Self {
        Self {
            offset_x: Emu::from_pt(x_pt),
            offset_y: Emu::from_pt(y_pt),
            image,
            display_width: image.display_width(),
        }
    }
}

/// ラベルカウンタ (0始まり) に対する配置一覧を返す
///
/// (profile, label_counter) のみに依存する純粋関数です。
pub fn placements_for(profile: WeaponProfile, label_counter: usize) -> Vec<Placement> {
    match profile {
        WeaponProfile::Rifle => rifle_placements(label_counter),
        WeaponProfile::Pistol => pistol_placements(),
    }
}

fn rifle_placements(label_counter: usize) -> Vec<Placement> {
    if label_counter % RIFLE_CADENCE != 0 {
        return Vec::new();
    }

    let columns = [INSET_PT, COLUMN_PITCH_PT];
    let rows = [INSET_PT, ROW_PITCH_PT, WIDE_ROW_PITCH_PT];

    columns
        .iter()
        .flat_map(|&x| {
            rows.iter().map(move |&y| {
                Placement::at_pt(
                    TargetImage::Small,
                    x + BASE_OFFSET_X_PT,
                    y + RIFLE_BASE_OFFSET_Y_PT,
                )
            })
        })
        .collect()
}

fn pistol_placements() -> Vec<Placement> {
    let bottom_row_pt = WIDE_ROW_PITCH_PT + PISTOL_BASE_OFFSET_Y_PT;

    vec![
        Placement::at_pt(
            TargetImage::Large,
            INSET_PT + BASE_OFFSET_X_PT,
            INSET_PT + PISTOL_LARGE_TOP_PT,
        ),
        Placement::at_pt(TargetImage::Small, INSET_PT + BASE_OFFSET_X_PT, bottom_row_pt),
        Placement::at_pt(TargetImage::Small, COLUMN_PITCH_PT + BASE_OFFSET_X_PT, bottom_row_pt),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rifle_cadence() {
        for n in 0..40 {
            let expected = if n % 6 == 0 { 6 } else { 0 };
            assert_eq!(placements_for(WeaponProfile::Rifle, n).len(), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_rifle_offsets_keep_row_pitch_quirk() {
        let placements = placements_for(WeaponProfile::Rifle, 12);
        let coords: Vec<(f64, f64)> = placements
            .iter()
            .map(|p| (p.offset_x.as_pt(), p.offset_y.as_pt()))
            .collect();

        assert_eq!(
            coords,
            vec![
                (71.0, 56.0),
                (71.0, 282.5),
                (71.0, 509.0),
                (297.5, 56.0),
                (297.5, 282.5),
                (297.5, 509.0),
            ]
        );
        assert!(placements.iter().all(|p| p.image == TargetImage::Small));
        assert!(placements.iter().all(|p| p.display_width == Emu(2_880_000)));
    }

    #[test]
    fn test_pistol_always_three() {
        for n in 0..20 {
            assert_eq!(placements_for(WeaponProfile::Pistol, n).len(), 3);
        }
    }

    #[test]
    fn test_pistol_offsets() {
        let placements = placements_for(WeaponProfile::Pistol, 3);

        assert_eq!(placements[0].image, TargetImage::Large);
        assert_eq!(placements[0].offset_x, Emu::from_pt(71.0));
        assert_eq!(placements[0].offset_y, Emu::from_pt(41.0));
        assert_eq!(placements[0].display_width, Emu(6_120_000));

        assert_eq!(placements[1].image, TargetImage::Small);
        assert_eq!(placements[1].offset_x, Emu::from_pt(71.0));
        assert_eq!(placements[1].offset_y, Emu::from_pt(522.0));
        assert_eq!(placements[2].offset_x, Emu::from_pt(297.5));
        assert_eq!(placements[2].offset_y, Emu::from_pt(522.0));
    }

    #[test]
    fn test_placements_are_pure() {
        assert_eq!(
            placements_for(WeaponProfile::Rifle, 6),
            placements_for(WeaponProfile::Rifle, 0)
        );
        assert_eq!(
            placements_for(WeaponProfile::Pistol, 1),
            placements_for(WeaponProfile::Pistol, 99)
        );
    }

    #[test]
    fn test_weapon_profile_from_str() {
        assert_eq!(WeaponProfile::from_str("rifle"), Ok(WeaponProfile::Rifle));
        assert_eq!(WeaponProfile::from_str("Пистолет"), Ok(WeaponProfile::Pistol));
        assert!(WeaponProfile::from_str("bow").is_err());
        assert_eq!(WeaponProfile::Rifle.code(), "ВП");
        assert_eq!(WeaponProfile::Pistol.code(), "ПП");
    }
}
