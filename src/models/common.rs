use std::fmt;
use std::ops::{Add, Mul, Sub};

/// 1ポイントあたりのEMU
pub const EMUS_PER_PT: f64 = 12_700.0;
/// 1センチメートルあたりのEMU
pub const EMUS_PER_CM: f64 = 360_000.0;
/// 1インチあたりのEMU
pub const EMUS_PER_INCH: f64 = 914_400.0;
/// 1 twip あたりのEMU (1/20 pt)
pub const EMUS_PER_TWIP: f64 = 635.0;

/// OOXML の長さ単位 (English Metric Unit)
///
/// 小数のポイント・センチメートルからの変換は 0 方向へ切り捨てます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Emu(pub i64);

impl Emu {
    pub const ZERO: Emu = Emu(0);

    pub fn from_pt(pt: f64) -> Self {
        Emu((pt * EMUS_PER_PT) as i64)
    }

    pub fn from_cm(cm: f64) -> Self {
        Emu((cm * EMUS_PER_CM) as i64)
    }

    pub fn from_inches(inches: f64) -> Self {
        Emu((inches * EMUS_PER_INCH) as i64)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_pt(&self) -> f64 {
        self.0 as f64 / EMUS_PER_PT
    }

    pub fn as_cm(&self) -> f64 {
        self.0 as f64 / EMUS_PER_CM
    }

    /// WordprocessingML の段落間隔 (twip) へ変換
    pub fn as_twips(&self) -> i64 {
        (self.0 as f64 / EMUS_PER_TWIP) as i64
    }
}

impl Add for Emu {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Emu(self.0 + other.0)
    }
}

impl Sub for Emu {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Emu(self.0 - other.0)
    }
}

impl Mul<f64> for Emu {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Emu((self.0 as f64 * scalar).round() as i64)
    }
}

impl fmt::Display for Emu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 的の番号 (交代・標的台・的)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetIndex {
    pub shift: u32,
    pub shield: u32,
    pub target: u32,
}

impl TargetIndex {
    pub fn new(shift: u32, shield: u32, target: u32) -> Self {
        Self { shift, shield, target }
    }

    /// 各要素を2桁ゼロ埋めして連結した番号コード
    pub fn code(&self) -> String {
        format!("{:02}{:02}{:02}", self.shift, self.shield, self.target)
    }
}

impl fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emu_conversions_truncate() {
        assert_eq!(Emu::from_pt(1.0), Emu(12_700));
        assert_eq!(Emu::from_pt(297.5), Emu(3_778_250));
        assert_eq!(Emu::from_cm(8.0), Emu(2_880_000));
        assert_eq!(Emu::from_cm(17.0), Emu(6_120_000));
        assert_eq!(Emu::from_inches(1.0), Emu(914_400));
        assert_eq!(Emu::from_pt(0.00001), Emu(0));
    }

    #[test]
    fn test_emu_twips() {
        assert_eq!(Emu::from_pt(0.0).as_twips(), 0);
        assert_eq!(Emu::from_pt(12.0).as_twips(), 240);
    }

    #[test]
    fn test_target_index_code() {
        assert_eq!(TargetIndex::new(1, 2, 3).code(), "010203");
        assert_eq!(TargetIndex::new(12, 10, 30).code(), "121030");
    }

    #[test]
    fn test_code_does_not_truncate_wide_components() {
        // 3桁以上の要素はそのまま出力
        assert_eq!(TargetIndex::new(1, 100, 1).code(), "0110001");
        assert_eq!(TargetIndex::new(1, 100, 1).to_string(), "0110001");
        assert_eq!(TargetIndex::new(123, 4, 5).code(), "1230405");
    }
}
