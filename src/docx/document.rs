//! 追記専用の文書モデル
//!
//! 段落とランを追加していき、最後に一度だけパッケージとして書き出します。
//! 追加済みの段落は「現在の段落」(末尾) 以外は変更しません。

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesText, Event};
use tracing::{debug, info};

use crate::docx::anchor::{Anchor, AnchorSpec};
use crate::docx::image_part::ImagePartRegistry;
use crate::docx::{DocxError, NS_A, NS_PIC, NS_R, NS_W, NS_WP, package};
use crate::models::Emu;

/// styles.xml が rId1 を使うため、画像は rId2 から
const FIRST_IMAGE_REL_ID: u32 = 2;

/// ランの書式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Font {
    pub name: Option<String>,
    /// ポイント
    pub size: Option<f64>,
}

/// 行間 (行の倍数、`w:lineRule="auto"`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSpacing(pub f64);

impl LineSpacing {
    /// `w:line` の値 (1行 = 240)
    fn value(&self) -> i64 {
        (self.0 * 240.0).round() as i64
    }
}

/// 段落の書式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormat {
    pub space_after: Option<Emu>,
    pub line_spacing: Option<LineSpacing>,
}

impl ParagraphFormat {
    fn is_empty(&self) -> bool {
        self.space_after.is_none() && self.line_spacing.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunContent {
    Text(String),
    Drawing(Anchor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub content: RunContent,
    pub font: Font,
}

impl Run {
    pub fn set_font(&mut self, name: &str, size_pt: f64) -> &mut Self {
        self.font.name = Some(name.to_string());
        self.font.size = Some(size_pt);
        self
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            RunContent::Text(text) => Some(text),
            RunContent::Drawing(_) => None,
        }
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let has_props = self.font.name.is_some() || self.font.size.is_some();
        if !has_props && matches!(&self.content, RunContent::Text(text) if text.is_empty()) {
            writer.create_element("w:r").write_empty()?;
            return Ok(());
        }

        writer.create_element("w:r").write_inner_content(|w| {
            if has_props {
                w.create_element("w:rPr").write_inner_content(|w| {
                    if let Some(name) = &self.font.name {
                        w.create_element("w:rFonts")
                            .with_attributes([("w:ascii", name.as_str()), ("w:hAnsi", name.as_str())])
                            .write_empty()?;
                    }
                    if let Some(size) = self.font.size {
                        let half_points = ((size * 2.0).round() as i64).to_string();
                        w.create_element("w:sz")
                            .with_attribute(("w:val", half_points.as_str()))
                            .write_empty()?;
                    }
                    Ok::<(), quick_xml::Error>(())
                })?;
            }
            match &self.content {
                RunContent::Text(text) if text.is_empty() => {}
                RunContent::Text(text) => {
                    w.create_element("w:t")
                        .with_attribute(("xml:space", "preserve"))
                        .write_text_content(BytesText::new(text))?;
                }
                RunContent::Drawing(anchor) => {
                    w.create_element("w:drawing")
                        .write_inner_content(|w| anchor.write_xml(w))?;
                }
            }
            Ok::<(), quick_xml::Error>(())
        })?;

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    pub format: ParagraphFormat,
    runs: Vec<Run>,
}

impl Paragraph {
    /// テキストのランを末尾に追加
    pub fn add_run(&mut self, text: &str) -> &mut Run {
        self.push(RunContent::Text(text.to_string()))
    }

    /// 浮動画像を含むランを末尾に追加
    pub fn add_drawing(&mut self, anchor: Anchor) -> &mut Run {
        self.push(RunContent::Drawing(anchor))
    }

    fn push(&mut self, content: RunContent) -> &mut Run {
        self.runs.push(Run {
            content,
            font: Font::default(),
        });
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// ランのテキストを連結
    pub fn text(&self) -> String {
        self.runs.iter().filter_map(Run::text).collect()
    }

    pub fn anchors(&self) -> impl Iterator<Item = &Anchor> {
        self.runs.iter().filter_map(|run| match &run.content {
            RunContent::Drawing(anchor) => Some(anchor),
            RunContent::Text(_) => None,
        })
    }

    fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        if self.format.is_empty() && self.runs.is_empty() {
            writer.create_element("w:p").write_empty()?;
            return Ok(());
        }

        writer.create_element("w:p").write_inner_content(|w| {
            if !self.format.is_empty() {
                w.create_element("w:pPr").write_inner_content(|w| {
                    let after = self.format.space_after.map(|s| s.as_twips().to_string());
                    let line = self.format.line_spacing.map(|l| l.value().to_string());

                    let mut spacing = w.create_element("w:spacing");
                    if let Some(after) = &after {
                        spacing = spacing.with_attribute(("w:after", after.as_str()));
                    }
                    if let Some(line) = &line {
                        spacing = spacing
                            .with_attribute(("w:line", line.as_str()))
                            .with_attribute(("w:lineRule", "auto"));
                    }
                    spacing.write_empty()?;
                    Ok::<(), quick_xml::Error>(())
                })?;
            }
            for run in &self.runs {
                run.write_xml(w)?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;

        Ok(())
    }
}

/// 文書のプロパティ (docProps/core.xml)
#[derive(Debug, Clone)]
pub struct CoreProperties {
    pub title: String,
    pub creator: String,
    pub created: DateTime<Utc>,
}

impl Default for CoreProperties {
    fn default() -> Self {
        Self {
            title: String::new(),
            creator: env!("CARGO_PKG_NAME").to_string(),
            created: Utc::now(),
        }
    }
}

/// 出力文書
#[derive(Debug)]
pub struct Document {
    pub core_properties: CoreProperties,
    paragraphs: Vec<Paragraph>,
    images: ImagePartRegistry,
    next_shape_id: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            core_properties: CoreProperties::default(),
            paragraphs: Vec::new(),
            images: ImagePartRegistry::new(FIRST_IMAGE_REL_ID),
            next_shape_id: 1,
        }
    }

    /// 段落を末尾に追加 (空文字列の場合ランは作らない)
    pub fn add_paragraph(&mut self, text: &str) -> &mut Paragraph {
        let mut paragraph = Paragraph::default();
        if !text.is_empty() {
            paragraph.add_run(text);
        }
        self.paragraphs.push(paragraph);
        self.current_paragraph()
    }

    /// 末尾の段落 (段落がなければ作成)
    pub fn current_paragraph(&mut self) -> &mut Paragraph {
        if self.paragraphs.is_empty() {
            self.paragraphs.push(Paragraph::default());
        }
        let last = self.paragraphs.len() - 1;
        &mut self.paragraphs[last]
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    pub fn images(&self) -> &ImagePartRegistry {
        &self.images
    }

    fn next_shape_id(&mut self) -> u32 {
        let id = self.next_shape_id;
        self.next_shape_id += 1;
        id
    }

    /// 画像を登録し、ページ基準の浮動画像アンカーを生成
    pub fn new_pic_anchor(
        &mut self,
        image_path: &Path,
        width: Option<Emu>,
        height: Option<Emu>,
        pos_x: Emu,
        pos_y: Emu,
    ) -> Result<Anchor, DocxError> {
        let (relationship_id, image) = self.images.get_or_add_image(image_path)?;
        let (cx, cy) = image.scaled_dimensions(width, height);
        let filename = image.filename.clone();

        let spec = AnchorSpec {
            width: cx,
            height: cy,
            shape_id: self.next_shape_id(),
            relationship_id,
            filename,
            pos_x,
            pos_y,
        };
        Ok(Anchor::from_spec(&spec))
    }

    /// 現在の段落に浮動画像を追加
    pub fn add_float_picture(
        &mut self,
        image_path: &Path,
        width: Option<Emu>,
        height: Option<Emu>,
        pos_x: Emu,
        pos_y: Emu,
    ) -> Result<(), DocxError> {
        let anchor = self.new_pic_anchor(image_path, width, height, pos_x, pos_y)?;
        self.current_paragraph().add_drawing(anchor);
        Ok(())
    }

    /// word/document.xml
    pub fn document_xml(&self) -> Result<String, DocxError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

        writer
            .create_element("w:document")
            .with_attributes([
                ("xmlns:w", NS_W),
                ("xmlns:wp", NS_WP),
                ("xmlns:a", NS_A),
                ("xmlns:pic", NS_PIC),
                ("xmlns:r", NS_R),
            ])
            .write_inner_content(|w| {
                w.create_element("w:body").write_inner_content(|w| {
                    for paragraph in &self.paragraphs {
                        paragraph.write_xml(w)?;
                    }
                    package::write_section_properties(w)
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;

        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// パッケージ (zip) をメモリ上に生成
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let document_xml = self.document_xml()?;
        package::write_package(&document_xml, &self.images, &self.core_properties)
    }

    /// パッケージをファイルへ書き出し
    ///
    /// パッケージ全体を生成してから一度に書き込むため、途中で失敗した場合はファイルを作りません。
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DocxError> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        debug!("パッケージ生成: {} バイト", bytes.len());

        fs::write(path, bytes)?;
        info!("文書を保存しました: {}", path.display());
        Ok(())
    }
}
