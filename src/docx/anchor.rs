//! ページ左上を基準とした浮動画像 (`wp:anchor`) の生成
//!
//! 通常のインライン画像 (`wp:inline`) では、ページ基準の絶対位置・テキストの背面・
//! 折り返しなしの配置ができないため、アンカー要素を直接組み立てます。

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::BytesText;

use crate::docx::{NS_A, NS_PIC, NS_R, NS_WP, PICTURE_URI};
use crate::models::Emu;

/// `pic:pic` 要素
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// Word は参照しないが省略もしない
    pub pic_id: u32,
    pub filename: String,
    pub relationship_id: String,
    pub cx: Emu,
    pub cy: Emu,
}

impl Picture {
    pub fn new(filename: &str, relationship_id: &str, cx: Emu, cy: Emu) -> Self {
        Self {
            pic_id: 0,
            filename: filename.to_string(),
            relationship_id: relationship_id.to_string(),
            cx,
            cy,
        }
    }

    pub fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let pic_id = self.pic_id.to_string();
        let cx = self.cx.to_string();
        let cy = self.cy.to_string();

        writer
            .create_element("pic:pic")
            .with_attribute(("xmlns:pic", NS_PIC))
            .write_inner_content(|w| {
                w.create_element("pic:nvPicPr").write_inner_content(|w| {
                    w.create_element("pic:cNvPr")
                        .with_attributes([("id", pic_id.as_str()), ("name", self.filename.as_str())])
                        .write_empty()?;
                    w.create_element("pic:cNvPicPr").write_empty()?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                w.create_element("pic:blipFill").write_inner_content(|w| {
                    w.create_element("a:blip")
                        .with_attribute(("r:embed", self.relationship_id.as_str()))
                        .write_empty()?;
                    w.create_element("a:stretch").write_inner_content(|w| {
                        w.create_element("a:fillRect").write_empty()?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                w.create_element("pic:spPr").write_inner_content(|w| {
                    w.create_element("a:xfrm").write_inner_content(|w| {
                        w.create_element("a:off")
                            .with_attributes([("x", "0"), ("y", "0")])
                            .write_empty()?;
                        w.create_element("a:ext")
                            .with_attributes([("cx", cx.as_str()), ("cy", cy.as_str())])
                            .write_empty()?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
                    w.create_element("a:prstGeom")
                        .with_attribute(("prst", "rect"))
                        .write_inner_content(|w| {
                            w.create_element("a:avLst").write_empty()?;
                            Ok::<(), quick_xml::Error>(())
                        })?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;

        Ok(())
    }
}

/// アンカー1つ分の幾何情報と参照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorSpec {
    pub width: Emu,
    pub height: Emu,
    pub shape_id: u32,
    pub relationship_id: String,
    pub filename: String,
    pub pos_x: Emu,
    pub pos_y: Emu,
}

/// `wp:anchor` 要素
///
/// 固定属性: 周囲との距離0、`behindDoc=1`、`simplePos=0`、`locked=0`、
/// `layoutInCell=1`、`allowOverlap=1`、位置は水平・垂直ともページ基準、
/// 折り返しなし (`wp:wrapNone`)。
///
/// 値の検証は行いません。幅・高さが0以下でもそのまま出力されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub width: Emu,
    pub height: Emu,
    pub shape_id: u32,
    pub pos_x: Emu,
    pub pos_y: Emu,
    pub picture: Picture,
}

impl Anchor {
    pub fn build(
        width: Emu,
        height: Emu,
        shape_id: u32,
        picture: Picture,
        pos_x: Emu,
        pos_y: Emu,
    ) -> Self {
        Self {
            width,
            height,
            shape_id,
            pos_x,
            pos_y,
            picture,
        }
    }

    /// `pic:pic` を含むアンカーを生成
    pub fn from_spec(spec: &AnchorSpec) -> Self {
        let picture = Picture::new(&spec.filename, &spec.relationship_id, spec.width, spec.height);
        Self::build(spec.width, spec.height, spec.shape_id, picture, spec.pos_x, spec.pos_y)
    }

    /// `wp:docPr` の name 属性
    pub fn name(&self) -> String {
        format!("Picture {}", self.shape_id)
    }

    pub fn write_xml<W: Write>(&self, writer: &mut Writer<W>) -> quick_xml::Result<()> {
        let pos_x = self.pos_x.to_string();
        let pos_y = self.pos_y.to_string();
        let cx = self.width.to_string();
        let cy = self.height.to_string();
        let shape_id = self.shape_id.to_string();
        let name = self.name();

        writer
            .create_element("wp:anchor")
            .with_attributes([
                ("distT", "0"),
                ("distB", "0"),
                ("distL", "0"),
                ("distR", "0"),
                ("simplePos", "0"),
                ("relativeHeight", "0"),
                ("behindDoc", "1"),
                ("locked", "0"),
                ("layoutInCell", "1"),
                ("allowOverlap", "1"),
                ("xmlns:wp", NS_WP),
                ("xmlns:a", NS_A),
                ("xmlns:pic", NS_PIC),
                ("xmlns:r", NS_R),
            ])
            .write_inner_content(|w| {
                w.create_element("wp:simplePos")
                    .with_attributes([("x", "0"), ("y", "0")])
                    .write_empty()?;
                w.create_element("wp:positionH")
                    .with_attribute(("relativeFrom", "page"))
                    .write_inner_content(|w| {
                        w.create_element("wp:posOffset")
                            .write_text_content(BytesText::new(&pos_x))?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
                w.create_element("wp:positionV")
                    .with_attribute(("relativeFrom", "page"))
                    .write_inner_content(|w| {
                        w.create_element("wp:posOffset")
                            .write_text_content(BytesText::new(&pos_y))?;
                        Ok::<(), quick_xml::Error>(())
                    })?;
                w.create_element("wp:extent")
                    .with_attributes([("cx", cx.as_str()), ("cy", cy.as_str())])
                    .write_empty()?;
                w.create_element("wp:wrapNone").write_empty()?;
                w.create_element("wp:docPr")
                    .with_attributes([("id", shape_id.as_str()), ("name", name.as_str())])
                    .write_empty()?;
                w.create_element("wp:cNvGraphicFramePr").write_inner_content(|w| {
                    w.create_element("a:graphicFrameLocks")
                        .with_attribute(("noChangeAspect", "1"))
                        .write_empty()?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                w.create_element("a:graphic").write_inner_content(|w| {
                    w.create_element("a:graphicData")
                        .with_attribute(("uri", PICTURE_URI))
                        .write_inner_content(|w| self.picture.write_xml(w))?;
                    Ok::<(), quick_xml::Error>(())
                })?;
                Ok::<(), quick_xml::Error>(())
            })?;

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::docx::registry::{ParsedElement, parse_fragment};

    /// 単独のXML断片として出力
    pub(crate) fn anchor_xml(anchor: &Anchor) -> String {
        let mut writer = Writer::new(Vec::new());
        anchor.write_xml(&mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    fn sample_spec() -> AnchorSpec {
        AnchorSpec {
            width: Emu::from_cm(8.0),
            height: Emu(2_875_500),
            shape_id: 7,
            relationship_id: "rId3".to_string(),
            filename: "мишень скрин 8х8см.png".to_string(),
            pos_x: Emu::from_pt(297.5),
            pos_y: Emu::from_pt(509.0),
        }
    }

    #[test]
    fn test_anchor_fixed_attributes() {
        let xml = anchor_xml(&Anchor::from_spec(&sample_spec()));

        assert!(xml.starts_with("<wp:anchor distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\" simplePos=\"0\""));
        assert!(xml.contains("behindDoc=\"1\""));
        assert!(xml.contains("locked=\"0\""));
        assert!(xml.contains("layoutInCell=\"1\""));
        assert!(xml.contains("allowOverlap=\"1\""));
        assert!(xml.contains("<wp:simplePos x=\"0\" y=\"0\"/>"));
        assert!(xml.contains("<wp:positionH relativeFrom=\"page\"><wp:posOffset>3778250</wp:posOffset></wp:positionH>"));
        assert!(xml.contains("<wp:positionV relativeFrom=\"page\"><wp:posOffset>6464300</wp:posOffset></wp:positionV>"));
        assert!(xml.contains("<wp:extent cx=\"2880000\" cy=\"2875500\"/>"));
        assert!(xml.contains("<wp:wrapNone/>"));
        assert!(xml.contains("<wp:docPr id=\"7\" name=\"Picture 7\"/>"));
        assert!(xml.contains("uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\""));
        assert!(xml.contains("<a:blip r:embed=\"rId3\"/>"));
    }

    #[test]
    fn test_anchor_contains_single_picture() {
        let xml = anchor_xml(&Anchor::from_spec(&sample_spec()));
        assert_eq!(xml.matches("<pic:pic ").count(), 1);
    }

    #[test]
    fn test_anchor_round_trip() {
        let spec = sample_spec();
        let xml = anchor_xml(&Anchor::from_spec(&spec));

        match parse_fragment(&xml).unwrap() {
            ParsedElement::Anchor(parsed) => {
                assert_eq!(parsed.width, spec.width);
                assert_eq!(parsed.height, spec.height);
                assert_eq!(parsed.pos_x, spec.pos_x);
                assert_eq!(parsed.pos_y, spec.pos_y);
                assert_eq!(parsed, spec);
            }
            other => panic!("unexpected element: {:?}", other),
        }
    }

    #[test]
    fn test_degenerate_size_is_not_corrected() {
        let mut spec = sample_spec();
        spec.width = Emu(0);
        spec.height = Emu(-5);
        let xml = anchor_xml(&Anchor::from_spec(&spec));
        assert!(xml.contains("<wp:extent cx=\"0\" cy=\"-5\"/>"));
    }

    #[test]
    fn test_filename_is_escaped() {
        let mut spec = sample_spec();
        spec.filename = "a&b<c>.png".to_string();
        let xml = anchor_xml(&Anchor::from_spec(&spec));
        assert!(xml.contains("name=\"a&amp;b&lt;c&gt;.png\""));

        match parse_fragment(&xml).unwrap() {
            ParsedElement::Anchor(parsed) => assert_eq!(parsed.filename, "a&b<c>.png"),
            other => panic!("unexpected element: {:?}", other),
        }
    }
}
