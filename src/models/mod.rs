// 長さ単位と番号の基本型
pub mod common;

// 番号の生成
pub mod index;

// 武器プロファイルごとの画像配置
pub mod layout;

// 便利な re-export
pub use common::*;
pub use index::{generate, number_of_targets};
pub use layout::{TargetImage, WeaponProfile, placements_for};
