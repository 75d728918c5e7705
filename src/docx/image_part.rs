//! 画像パーツの登録
//!
//! 同じ画像は何度参照されても1度だけパッケージに格納し、同じリレーションシップIDを返します。

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::docx::DocxError;
use crate::models::Emu;

/// 画像本来のサイズを求める解像度 (埋め込みの密度情報は使わない)
const IMAGE_DPI: f64 = 72.0;

/// パッケージ内の画像パーツ
#[derive(Debug, Clone)]
pub struct ImagePart {
    /// `word/` からの相対パス (例: `media/image1.png`)
    pub partname: String,
    /// 元のファイル名 (`pic:cNvPr` の name 属性)
    pub filename: String,
    pub extension: &'static str,
    pub content_type: &'static str,
    pub blob: Vec<u8>,
    pub px_width: u32,
    pub px_height: u32,
}

impl ImagePart {
    /// 画像本来の幅
    pub fn native_width(&self) -> Emu {
        Emu::from_inches(self.px_width as f64 / IMAGE_DPI)
    }

    /// 画像本来の高さ
    pub fn native_height(&self) -> Emu {
        Emu::from_inches(self.px_height as f64 / IMAGE_DPI)
    }

    /// 表示サイズを計算
    ///
    /// 幅・高さの一方だけが指定された場合、もう一方は縦横比を保って算出します。
    /// どちらも指定されない場合は本来のサイズを返します。
    pub fn scaled_dimensions(&self, width: Option<Emu>, height: Option<Emu>) -> (Emu, Emu) {
        let native_width = self.native_width();
        let native_height = self.native_height();

        match (width, height) {
            (None, None) => (native_width, native_height),
            (Some(width), None) => {
                if native_width.value() == 0 {
                    return (width, Emu::ZERO);
                }
                let factor = width.value() as f64 / native_width.value() as f64;
                (width, native_height * factor)
            }
            (None, Some(height)) => {
                if native_height.value() == 0 {
                    return (Emu::ZERO, height);
                }
                let factor = height.value() as f64 / native_height.value() as f64;
                (native_width * factor, height)
            }
            (Some(width), Some(height)) => (width, height),
        }
    }
}

fn format_info(format: ImageFormat) -> Option<(&'static str, &'static str)> {
    match format {
        ImageFormat::Png => Some(("png", "image/png")),
        ImageFormat::Jpeg => Some(("jpeg", "image/jpeg")),
        ImageFormat::Gif => Some(("gif", "image/gif")),
        ImageFormat::Bmp => Some(("bmp", "image/bmp")),
        _ => None,
    }
}

/// 画像パーツのレジストリ
#[derive(Debug)]
pub struct ImagePartRegistry {
    parts: Vec<ImagePart>,
    by_path: HashMap<PathBuf, usize>,
    by_digest: HashMap<String, usize>,
    first_rel_id: u32,
}

impl ImagePartRegistry {
    /// `first_rel_id` 以降の番号を画像のリレーションシップIDに使う
    pub fn new(first_rel_id: u32) -> Self {
        Self {
            parts: Vec::new(),
            by_path: HashMap::new(),
            by_digest: HashMap::new(),
            first_rel_id,
        }
    }

    /// 画像ファイルを登録し、リレーションシップIDと画像パーツを返す
    pub fn get_or_add_image(&mut self, path: &Path) -> Result<(String, &ImagePart), DocxError> {
        let index = match self.by_path.get(path) {
            Some(&index) => index,
            None => {
                let blob = fs::read(path).map_err(|source| DocxError::ImageRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());

                let index = self.index_for_blob(&filename, blob)?;
                self.by_path.insert(path.to_path_buf(), index);
                index
            }
        };

        Ok((self.rel_id(index), &self.parts[index]))
    }

    /// メモリ上の画像を登録
    #[cfg(test)]
    pub fn get_or_add_blob(&mut self, filename: &str, blob: Vec<u8>) -> Result<(String, &ImagePart), DocxError> {
        let index = self.index_for_blob(filename, blob)?;
        Ok((self.rel_id(index), &self.parts[index]))
    }

    fn index_for_blob(&mut self, filename: &str, blob: Vec<u8>) -> Result<usize, DocxError> {
        let sha256 = format!("{:x}", Sha256::digest(&blob));
        if let Some(&index) = self.by_digest.get(&sha256) {
            return Ok(index);
        }

        let reader = ImageReader::new(Cursor::new(&blob)).with_guessed_format()?;
        let format = reader
            .format()
            .ok_or_else(|| DocxError::UnsupportedImage(filename.to_string()))?;
        let (extension, content_type) =
            format_info(format).ok_or_else(|| DocxError::UnsupportedImage(filename.to_string()))?;
        let (px_width, px_height) = reader.into_dimensions().map_err(|source| DocxError::ImageDecode {
            name: filename.to_string(),
            source,
        })?;

        let index = self.parts.len();
        let partname = format!("media/image{}.{}", index + 1, extension);
        debug!("画像パーツ登録: {} -> {} ({}x{}px)", filename, partname, px_width, px_height);

        self.parts.push(ImagePart {
            partname,
            filename: filename.to_string(),
            extension,
            content_type,
            blob,
            px_width,
            px_height,
        });
        self.by_digest.insert(sha256, index);

        Ok(index)
    }

    fn rel_id(&self, index: usize) -> String {
        format!("rId{}", self.first_rel_id as usize + index)
    }

    /// 登録順に (リレーションシップID, 画像パーツ) を返す
    pub fn parts(&self) -> impl Iterator<Item = (String, &ImagePart)> {
        self.parts
            .iter()
            .enumerate()
            .map(|(index, part)| (self.rel_id(index), part))
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([shade, shade, shade]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_same_blob_is_registered_once() {
        let mut registry = ImagePartRegistry::new(2);
        let (first, _) = registry.get_or_add_blob("a.png", png_bytes(4, 3, 10)).unwrap();
        let (second, _) = registry.get_or_add_blob("b.png", png_bytes(4, 3, 10)).unwrap();
        let (third, part) = registry.get_or_add_blob("c.png", png_bytes(4, 3, 200)).unwrap();

        assert_eq!(first, "rId2");
        assert_eq!(second, "rId2");
        assert_eq!(third, "rId3");
        assert_eq!(part.partname, "media/image2.png");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_same_path_is_registered_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("мишень.png");
        fs::write(&path, png_bytes(16, 8, 0)).unwrap();

        let mut registry = ImagePartRegistry::new(2);
        let (first, part) = registry.get_or_add_image(&path).unwrap();
        assert_eq!(part.filename, "мишень.png");
        assert_eq!((part.px_width, part.px_height), (16, 8));
        assert_eq!(part.content_type, "image/png");

        let (second, _) = registry.get_or_add_image(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        let mut registry = ImagePartRegistry::new(2);
        let result = registry.get_or_add_image(Path::new("does/not/exist.png"));
        assert!(matches!(result, Err(DocxError::ImageRead { .. })));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_non_image_is_error() {
        let mut registry = ImagePartRegistry::new(2);
        let result = registry.get_or_add_blob("notes.txt", b"just some text".to_vec());
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_scaled_dimensions_width_only_keeps_ratio() {
        let mut registry = ImagePartRegistry::new(2);
        let (_, part) = registry.get_or_add_blob("t.png", png_bytes(300, 200, 0)).unwrap();

        let (cx, cy) = part.scaled_dimensions(Some(Emu::from_cm(8.0)), None);
        assert_eq!(cx, Emu(2_880_000));
        assert_eq!(cy, Emu(1_920_000));

        let ratio = cy.value() as f64 / cx.value() as f64;
        assert!((ratio - 200.0 / 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_scaled_dimensions_height_only_keeps_ratio() {
        let mut registry = ImagePartRegistry::new(2);
        let (_, part) = registry.get_or_add_blob("t.png", png_bytes(301, 157, 0)).unwrap();

        let (cx, cy) = part.scaled_dimensions(None, Some(Emu::from_cm(17.0)));
        assert_eq!(cy, Emu(6_120_000));
        let ratio = cx.value() as f64 / cy.value() as f64;
        assert!((ratio - 301.0 / 157.0).abs() < 1e-5);
    }

    #[test]
    fn test_native_size_is_pixels_at_72_dpi() {
        let mut registry = ImagePartRegistry::new(2);
        let (_, part) = registry.get_or_add_blob("wide.png", png_bytes(144, 36, 0)).unwrap();

        assert_eq!(part.native_width(), Emu::from_inches(2.0));
        assert_eq!(part.native_height(), Emu::from_inches(0.5));
    }

    #[test]
    fn test_scaled_dimensions_native_and_explicit() {
        let mut registry = ImagePartRegistry::new(2);
        let (_, part) = registry.get_or_add_blob("t.png", png_bytes(72, 144, 0)).unwrap();

        assert_eq!(part.scaled_dimensions(None, None), (Emu(914_400), Emu(1_828_800)));
        assert_eq!(
            part.scaled_dimensions(Some(Emu(5)), Some(Emu(7))),
            (Emu(5), Emu(7))
        );
    }
}
