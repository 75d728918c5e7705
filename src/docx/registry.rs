//! タグ名から要素パーサーへの対応表
//!
//! 対応表はプロセス内で一度だけ構築され、以後は読み取り専用です。

use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::docx::anchor::{AnchorSpec, Picture};
use crate::docx::DocxError;
use crate::models::Emu;

/// 解析済みの要素
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedElement {
    Anchor(AnchorSpec),
    Picture(Picture),
}

pub type ElementParser = fn(&str) -> Result<ParsedElement, DocxError>;

static ELEMENT_PARSERS: LazyLock<HashMap<&'static str, ElementParser>> = LazyLock::new(|| {
    HashMap::from([
        ("wp:anchor", parse_anchor as ElementParser),
        ("pic:pic", parse_picture as ElementParser),
    ])
});

/// タグ名に対応するパーサーを返す
pub fn parser_for(tag: &str) -> Option<ElementParser> {
    ELEMENT_PARSERS.get(tag).copied()
}

/// XML断片のルート要素を判別して解析
pub fn parse_fragment(xml: &str) -> Result<ParsedElement, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let parser = parser_for(&tag).ok_or(DocxError::UnknownElement(tag))?;
                return parser(xml);
            }
            Event::Eof => return Err(DocxError::MissingElement("root")),
            _ => {}
        }
    }
}

/// 文書中の登録済み要素 (`wp:anchor`) をすべて解析
pub fn find_anchors(xml: &str) -> Result<Vec<AnchorSpec>, DocxError> {
    let mut anchors = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<wp:anchor ") {
        let end = rest[start..]
            .find("</wp:anchor>")
            .ok_or(DocxError::MissingElement("</wp:anchor>"))?
            + start
            + "</wp:anchor>".len();

        if let ParsedElement::Anchor(spec) = parse_fragment(&rest[start..end])? {
            anchors.push(spec);
        }
        rest = &rest[end..];
    }

    Ok(anchors)
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>, DocxError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn required_attr(e: &BytesStart, key: &'static str) -> Result<String, DocxError> {
    attr_value(e, key.as_bytes())?.ok_or(DocxError::MissingElement(key))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, DocxError> {
    value.trim().parse().map_err(|_| DocxError::InvalidAttribute {
        name: name.to_string(),
        value: value.to_string(),
    })
}

#[derive(Clone, Copy, PartialEq)]
enum Axis {
    Horizontal,
    Vertical,
}

fn parse_anchor(xml: &str) -> Result<ParsedElement, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut extent = None;
    let mut shape_id = None;
    let mut pos_x = None;
    let mut pos_y = None;
    let mut filename = None;
    let mut relationship_id = None;
    let mut axis = None;
    let mut in_offset = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"wp:positionH" => axis = Some(Axis::Horizontal),
                b"wp:positionV" => axis = Some(Axis::Vertical),
                b"wp:posOffset" => in_offset = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"wp:extent" => {
                    let cx = required_attr(&e, "cx")?;
                    let cy = required_attr(&e, "cy")?;
                    extent = Some((Emu(parse_number("cx", &cx)?), Emu(parse_number("cy", &cy)?)));
                }
                b"wp:docPr" => {
                    let id = required_attr(&e, "id")?;
                    shape_id = Some(parse_number::<u32>("id", &id)?);
                }
                b"pic:cNvPr" => filename = Some(required_attr(&e, "name")?),
                b"a:blip" => relationship_id = Some(required_attr(&e, "r:embed")?),
                _ => {}
            },
            Event::Text(t) if in_offset => {
                let text = t.unescape()?;
                let value = Emu(parse_number("posOffset", &text)?);
                match axis {
                    Some(Axis::Horizontal) => pos_x = Some(value),
                    Some(Axis::Vertical) => pos_y = Some(value),
                    None => {}
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"wp:posOffset" => in_offset = false,
                b"wp:positionH" | b"wp:positionV" => axis = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let (width, height) = extent.ok_or(DocxError::MissingElement("wp:extent"))?;

    Ok(ParsedElement::Anchor(AnchorSpec {
        width,
        height,
        shape_id: shape_id.ok_or(DocxError::MissingElement("wp:docPr"))?,
        relationship_id: relationship_id.ok_or(DocxError::MissingElement("a:blip"))?,
        filename: filename.ok_or(DocxError::MissingElement("pic:cNvPr"))?,
        pos_x: pos_x.ok_or(DocxError::MissingElement("wp:positionH"))?,
        pos_y: pos_y.ok_or(DocxError::MissingElement("wp:positionV"))?,
    }))
}

fn parse_picture(xml: &str) -> Result<ParsedElement, DocxError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut pic_id = None;
    let mut filename = None;
    let mut relationship_id = None;
    let mut ext = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"pic:cNvPr" => {
                    pic_id = Some(parse_number::<u32>("id", &required_attr(&e, "id")?)?);
                    filename = Some(required_attr(&e, "name")?);
                }
                b"a:blip" => relationship_id = Some(required_attr(&e, "r:embed")?),
                b"a:ext" => {
                    let cx = required_attr(&e, "cx")?;
                    let cy = required_attr(&e, "cy")?;
                    ext = Some((Emu(parse_number("cx", &cx)?), Emu(parse_number("cy", &cy)?)));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    let (cx, cy) = ext.ok_or(DocxError::MissingElement("a:ext"))?;

    Ok(ParsedElement::Picture(Picture {
        pic_id: pic_id.ok_or(DocxError::MissingElement("pic:cNvPr"))?,
        filename: filename.ok_or(DocxError::MissingElement("pic:cNvPr"))?,
        relationship_id: relationship_id.ok_or(DocxError::MissingElement("a:blip"))?,
        cx,
        cy,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::anchor::Anchor;
    use crate::docx::anchor::tests::anchor_xml;

    #[test]
    fn test_registered_tags() {
        assert!(parser_for("wp:anchor").is_some());
        assert!(parser_for("pic:pic").is_some());
        assert!(parser_for("wp:inline").is_none());
    }

    #[test]
    fn test_unknown_root_is_rejected() {
        let result = parse_fragment("<wp:inline distT=\"0\"/>");
        assert!(matches!(result, Err(DocxError::UnknownElement(tag)) if tag == "wp:inline"));
    }

    #[test]
    fn test_parse_picture_fragment() {
        let picture = Picture::new("small.png", "rId2", Emu(100), Emu(200));
        let mut writer = quick_xml::Writer::new(Vec::new());
        picture.write_xml(&mut writer).unwrap();
        let xml = String::from_utf8(writer.into_inner()).unwrap();

        assert_eq!(parse_fragment(&xml).unwrap(), ParsedElement::Picture(picture));
    }

    #[test]
    fn test_missing_extent_is_error() {
        let xml = "<wp:anchor><wp:docPr id=\"1\" name=\"Picture 1\"/></wp:anchor>";
        assert!(matches!(
            parse_fragment(xml),
            Err(DocxError::MissingElement("wp:extent"))
        ));
    }

    #[test]
    fn test_find_anchors_in_body() {
        let spec = |id: u32, x: i64| AnchorSpec {
            width: Emu(10),
            height: Emu(20),
            shape_id: id,
            relationship_id: "rId2".to_string(),
            filename: "t.png".to_string(),
            pos_x: Emu(x),
            pos_y: Emu(5),
        };
        let body = format!(
            "<w:body><w:p><w:r><w:drawing>{}</w:drawing></w:r><w:r><w:drawing>{}</w:drawing></w:r></w:p></w:body>",
            anchor_xml(&Anchor::from_spec(&spec(1, 100))),
            anchor_xml(&Anchor::from_spec(&spec(2, 200))),
        );

        let anchors = find_anchors(&body).unwrap();
        assert_eq!(anchors, vec![spec(1, 100), spec(2, 200)]);
    }
}
