//! # Assembler モジュール
//!
//! 的シート文書の組み立てを行います。
//!
//! 番号コードを順に取り出し、ラベルごとに画像の配置を問い合わせ、
//! 浮動画像とラベルのランを文書へ追記します。
//!
//! ## 処理の流れ
//!
//! 1. **番号生成**: 交代・標的台・的から6桁の番号を生成
//! 2. **配置決定**: ラベルカウンタと武器プロファイルから画像の位置を決定
//! 3. **画像登録**: 画像パーツを登録し表示サイズを算出
//! 4. **アンカー生成**: ページ基準の浮動画像を現在の段落へ追加
//! 5. **ラベル追加**: 番号のランを追加し、プロファイルごとに改段落
//!
//! ## 使用例
//!
//! ```ignore
//! use targetsheet::assembler::DocumentAssembler;
//! use targetsheet::config::RawConfig;
//!
//! let config = RawConfig::from_file("config/rifle40.yaml")?.into_config()?;
//!
//! let mut assembler = DocumentAssembler::new(&config, 1);
//! assembler.assemble()?;
//! assembler.save_to_dir(&config, chrono::Local::now().naive_local())?;
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::config::{ConfigError, GenerationConfig};
use crate::docx::{Document, DocxError, LineSpacing};
use crate::models::{Emu, TargetImage, WeaponProfile, generate, placements_for};

const LABEL_FONT: &str = "Calibri";
const RIFLE_LABEL_SIZE_PT: f64 = 18.0;
const PISTOL_LABEL_SIZE_PT: f64 = 28.0;

/// ライフル: 1行あたりのラベル数
const RIFLE_LABELS_PER_LINE: usize = 2;
/// ライフル: ブロック間の空段落の行間 (倍数)
const RIFLE_SPACER_LINE_SPACING: f64 = 14.9;
/// ピストル: 段落間の行間 (倍数)
const PISTOL_LINE_SPACING: f64 = 30.0;

/// ライフル: 行の1つ目のラベルの前後
const RIFLE_FIRST_LEAD: usize = 28;
const RIFLE_FIRST_GAP: usize = 42;
/// ライフル: 新しいブロックの先頭ラベルの前後
const RIFLE_BLOCK_LEAD: usize = 27;
const RIFLE_BLOCK_TRAIL: usize = 44;

const TIMESTAMP_FORMAT: &str = "%d.%m.%Y_%H.%M";

/// 生成処理のエラー
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Docx(#[from] DocxError),
}

fn spaces(count: usize) -> String {
    " ".repeat(count)
}

/// 出力ファイル名
///
/// `{武器コード}{練習} смен {交代数} щиты {標的台} {DD.MM.YYYY_HH.MM}.docx`
pub fn output_file_name(config: &GenerationConfig, timestamp: NaiveDateTime) -> String {
    format!(
        "{}{} смен {} щиты {} {}.docx",
        config.weapon.code(),
        config.exercise,
        config.shifts,
        config.shields_label(),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

pub struct DocumentAssembler {
    pub profile: WeaponProfile,
    pub codes: Vec<String>,
    pub small_target: PathBuf,
    pub large_target: PathBuf,
    pub verbose_level: u8,
    pub document: Document,
}

impl DocumentAssembler {
    pub fn new(config: &GenerationConfig, verbose_level: u8) -> Self {
        let codes = generate(config.shifts, &config.shields, config.number_of_targets());

        let mut document = Document::new();
        document.core_properties.title = format!("{}{}", config.weapon.code(), config.exercise);

        Self {
            profile: config.weapon,
            codes,
            small_target: config.images.small_target.clone(),
            large_target: config.images.large_target.clone(),
            verbose_level,
            document,
        }
    }

    /// 全ラベルを文書へ追加
    pub fn assemble(&mut self) -> Result<(), GenerateError> {
        info!("=== 文書の組み立て開始 ({}: {}ラベル) ===", self.profile, self.codes.len());

        match self.profile {
            WeaponProfile::Rifle => self.assemble_rifle()?,
            WeaponProfile::Pistol => self.assemble_pistol()?,
        }

        info!("=== 組み立て完了 ===");
        info!("段落数: {}", self.document.paragraphs().len());
        if self.document.images().is_empty() {
            info!("画像パーツ: なし");
        } else {
            info!("画像パーツ: {}", self.document.images().len());
        }

        if self.verbose_level > 2 {
            for (index, paragraph) in self.document.paragraphs().iter().enumerate() {
                trace!(
                    "段落 {}: {:?} (ラン {}, 画像 {})",
                    index,
                    paragraph.text().trim(),
                    paragraph.runs().len(),
                    paragraph.anchors().count()
                );
            }
        }

        Ok(())
    }

    fn image_path(&self, image: TargetImage) -> &Path {
        match image {
            TargetImage::Small => &self.small_target,
            TargetImage::Large => &self.large_target,
        }
    }

    /// ラベルカウンタに対応する画像を現在の段落へ追加
    fn place_images(&mut self, label_counter: usize) -> Result<usize, DocxError> {
        let placements = placements_for(self.profile, label_counter);

        for placement in &placements {
            let path = self.image_path(placement.image).to_path_buf();
            self.document.add_float_picture(
                &path,
                Some(placement.display_width),
                None,
                placement.offset_x,
                placement.offset_y,
            )?;
        }

        if !placements.is_empty() && self.verbose_level > 1 {
            debug!("ラベル {}: 画像 {}枚を配置", label_counter, placements.len());
        }

        Ok(placements.len())
    }

    fn add_label(&mut self, code: &str, size_pt: f64) {
        self.document
            .current_paragraph()
            .add_run(code)
            .set_font(LABEL_FONT, size_pt);
    }

    /// ライフル: 1行に2ラベル、ブロックの間に空段落
    fn assemble_rifle(&mut self) -> Result<(), DocxError> {
        self.document.add_paragraph("");
        let codes = self.codes.clone();
        let mut labels_on_line = 0;

        for (label_counter, code) in codes.iter().enumerate() {
            labels_on_line += 1;

            if labels_on_line <= RIFLE_LABELS_PER_LINE {
                self.document.current_paragraph().add_run(&spaces(RIFLE_FIRST_LEAD));
                self.add_label(code, RIFLE_LABEL_SIZE_PT);
                if labels_on_line < RIFLE_LABELS_PER_LINE {
                    self.document.current_paragraph().add_run(&spaces(RIFLE_FIRST_GAP));
                }
            } else {
                labels_on_line = 1;

                let spacer = self.document.add_paragraph("");
                spacer.format.space_after = Some(Emu::ZERO);
                spacer.format.line_spacing = Some(LineSpacing(RIFLE_SPACER_LINE_SPACING));

                self.document.add_paragraph("").add_run(&spaces(RIFLE_BLOCK_LEAD));
                self.add_label(code, RIFLE_LABEL_SIZE_PT);
                self.document.current_paragraph().add_run(&spaces(RIFLE_BLOCK_TRAIL));
            }

            if self.verbose_level > 2 {
                trace!("ラベル {}: {}", label_counter, code);
            }

            self.place_images(label_counter)?;
        }

        Ok(())
    }

    /// ピストル: 1段落に1ラベル、ラベルごとに画像3枚
    fn assemble_pistol(&mut self) -> Result<(), DocxError> {
        self.document.add_paragraph("");
        let codes = self.codes.clone();

        for (label_counter, code) in codes.iter().enumerate() {
            self.place_images(label_counter)?;

            self.document.current_paragraph().add_run("");
            self.add_label(code, PISTOL_LABEL_SIZE_PT);

            if self.verbose_level > 2 {
                trace!("ラベル {}: {}", label_counter, code);
            }

            // 最後のラベルの後には段落を作らない
            if label_counter + 1 < codes.len() {
                let paragraph = self.document.current_paragraph();
                paragraph.format.space_after = Some(Emu::ZERO);
                paragraph.format.line_spacing = Some(LineSpacing(PISTOL_LINE_SPACING));
                self.document.add_paragraph("");
            }
        }

        Ok(())
    }

    /// 出力ディレクトリへ保存し、保存先のパスを返す
    pub fn save_to_dir(&self, config: &GenerationConfig, timestamp: NaiveDateTime) -> Result<PathBuf, GenerateError> {
        let path = config.output_dir.join(output_file_name(config, timestamp));
        self.document.save(&path)?;
        Ok(path)
    }
}
