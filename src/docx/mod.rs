//! # Docx モジュール
//!
//! 的シートの出力に必要な WordprocessingML (.docx) の最小限の実装です。
//!
//! - `anchor`: ページ基準の浮動画像 (`wp:anchor`) の生成
//! - `registry`: タグ名からパーサーへの静的な対応表
//! - `image_part`: 画像パーツの登録と表示サイズの計算
//! - `document`: 段落・ランの追加とパッケージ (zip) の書き出し

use std::path::PathBuf;

use thiserror::Error;

pub mod anchor;
pub mod document;
pub mod image_part;
pub mod package;
pub mod registry;

pub use document::{Document, LineSpacing};

pub const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// `a:graphicData` の uri (画像)
pub const PICTURE_URI: &str = NS_PIC;

/// docx 生成時のエラー
#[derive(Error, Debug)]
pub enum DocxError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("画像ファイルを読み込めません {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("画像を解析できません {name}: {source}")]
    ImageDecode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("未対応の画像形式: {0}")]
    UnsupportedImage(String),

    #[error("ZIP書き込みエラー: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XMLエラー: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("要素が見つかりません: {0}")]
    MissingElement(&'static str),

    #[error("無効な属性値 {name}=\"{value}\"")]
    InvalidAttribute { name: String, value: String },

    #[error("未登録の要素: {0}")]
    UnknownElement(String),
}

impl From<quick_xml::events::attributes::AttrError> for DocxError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DocxError::Xml(err.into())
    }
}
