//! docx パッケージ (zip) の組み立て

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesDecl, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::docx::anchor::AnchorSpec;
use crate::docx::document::CoreProperties;
use crate::docx::image_part::ImagePartRegistry;
use crate::docx::registry::find_anchors;
use crate::docx::DocxError;

const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_XML: &str = "application/xml";
const CT_DOCUMENT: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const RT_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const RT_CORE: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const RT_APP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const RT_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const RT_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// ページ設定 (twip): Letter、上下 1440 / 左右 1800
const PAGE_WIDTH: &str = "12240";
const PAGE_HEIGHT: &str = "15840";
const MARGIN_TOP_BOTTOM: &str = "1440";
const MARGIN_LEFT_RIGHT: &str = "1800";
const MARGIN_HEADER_FOOTER: &str = "720";

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:eastAsia="Calibri" w:hAnsi="Calibri" w:cs="Times New Roman"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="ru-RU" w:eastAsia="en-US" w:bidi="ar-SA"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="200" w:line="276" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/><w:uiPriority w:val="1"/><w:semiHidden/><w:unhideWhenUsed/></w:style></w:styles>"#;

const APP_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>targetsheet</Application><DocSecurity>0</DocSecurity><ScaleCrop>false</ScaleCrop><LinksUpToDate>false</LinksUpToDate><SharedDoc>false</SharedDoc><HyperlinksChanged>false</HyperlinksChanged><AppVersion>0.1</AppVersion></Properties>"#;

/// `w:sectPr` を書き込む
pub fn write_section_properties<W: Write>(writer: &mut Writer<W>) -> quick_xml::Result<()> {
    writer.create_element("w:sectPr").write_inner_content(|w| {
        w.create_element("w:pgSz")
            .with_attributes([("w:w", PAGE_WIDTH), ("w:h", PAGE_HEIGHT)])
            .write_empty()?;
        w.create_element("w:pgMar")
            .with_attributes([
                ("w:top", MARGIN_TOP_BOTTOM),
                ("w:right", MARGIN_LEFT_RIGHT),
                ("w:bottom", MARGIN_TOP_BOTTOM),
                ("w:left", MARGIN_LEFT_RIGHT),
                ("w:header", MARGIN_HEADER_FOOTER),
                ("w:footer", MARGIN_HEADER_FOOTER),
                ("w:gutter", "0"),
            ])
            .write_empty()?;
        w.create_element("w:cols")
            .with_attribute(("w:space", "720"))
            .write_empty()?;
        Ok::<(), quick_xml::Error>(())
    })?;
    Ok(())
}

fn new_xml_writer() -> quick_xml::Result<Writer<Vec<u8>>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn content_types_xml(images: &ImagePartRegistry) -> quick_xml::Result<Vec<u8>> {
    let mut defaults = BTreeMap::new();
    defaults.insert("rels", CT_RELS);
    defaults.insert("xml", CT_XML);
    for (_, part) in images.parts() {
        defaults.insert(part.extension, part.content_type);
    }

    let overrides = [
        ("/word/document.xml", CT_DOCUMENT),
        ("/word/styles.xml", CT_STYLES),
        ("/docProps/core.xml", CT_CORE),
        ("/docProps/app.xml", CT_APP),
    ];

    let mut writer = new_xml_writer()?;
    writer
        .create_element("Types")
        .with_attribute(("xmlns", NS_CONTENT_TYPES))
        .write_inner_content(|w| {
            for (extension, content_type) in &defaults {
                w.create_element("Default")
                    .with_attributes([("Extension", *extension), ("ContentType", *content_type)])
                    .write_empty()?;
            }
            for (partname, content_type) in overrides {
                w.create_element("Override")
                    .with_attributes([("PartName", partname), ("ContentType", content_type)])
                    .write_empty()?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(writer.into_inner())
}

fn relationships_xml(relationships: &[(String, &str, String)]) -> quick_xml::Result<Vec<u8>> {
    let mut writer = new_xml_writer()?;
    writer
        .create_element("Relationships")
        .with_attribute(("xmlns", NS_PACKAGE_RELS))
        .write_inner_content(|w| {
            for (id, rel_type, target) in relationships {
                w.create_element("Relationship")
                    .with_attributes([
                        ("Id", id.as_str()),
                        ("Type", *rel_type),
                        ("Target", target.as_str()),
                    ])
                    .write_empty()?;
            }
            Ok::<(), quick_xml::Error>(())
        })?;
    Ok(writer.into_inner())
}

fn core_xml(core: &CoreProperties) -> String {
    let created = core.created.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>{creator}</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified>"#,
            "</cp:coreProperties>"
        ),
        title = escape(&core.title),
        creator = escape(&core.creator),
        created = created,
    )
}

/// パッケージ全体をメモリ上の zip として生成
pub fn write_package(
    document_xml: &str,
    images: &ImagePartRegistry,
    core: &CoreProperties,
) -> Result<Vec<u8>, DocxError> {
    let package_rels = vec![
        ("rId1".to_string(), RT_OFFICE_DOCUMENT, "word/document.xml".to_string()),
        ("rId2".to_string(), RT_CORE, "docProps/core.xml".to_string()),
        ("rId3".to_string(), RT_APP, "docProps/app.xml".to_string()),
    ];

    let mut document_rels = vec![("rId1".to_string(), RT_STYLES, "styles.xml".to_string())];
    for (id, part) in images.parts() {
        document_rels.push((id, RT_IMAGE, part.partname.clone()));
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(&content_types_xml(images)?)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(&relationships_xml(&package_rels)?)?;

    zip.start_file("docProps/core.xml", options)?;
    zip.write_all(core_xml(core).as_bytes())?;

    zip.start_file("docProps/app.xml", options)?;
    zip.write_all(APP_XML.as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(STYLES_XML.as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(&relationships_xml(&document_rels)?)?;

    for (_, part) in images.parts() {
        zip.start_file(format!("word/{}", part.partname), options)?;
        zip.write_all(&part.blob)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// 既存パッケージから本文 (`word/document.xml`) を読み出す
pub fn read_document_xml<P: AsRef<Path>>(path: P) -> Result<String, DocxError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive.by_name("word/document.xml")?.read_to_string(&mut xml)?;
    Ok(xml)
}

/// 既存パッケージに含まれる浮動画像をすべて読み出す
pub fn read_anchors<P: AsRef<Path>>(path: P) -> Result<Vec<AnchorSpec>, DocxError> {
    find_anchors(&read_document_xml(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::image_part::tests::png_bytes;

    #[test]
    fn test_content_types_include_image_extension_once() {
        let mut images = ImagePartRegistry::new(2);
        images.get_or_add_blob("a.png", png_bytes(2, 2, 0)).unwrap();
        images.get_or_add_blob("b.png", png_bytes(2, 2, 99)).unwrap();

        let xml = String::from_utf8(content_types_xml(&images).unwrap()).unwrap();
        assert_eq!(xml.matches("Extension=\"png\"").count(), 1);
        assert!(xml.contains("PartName=\"/word/document.xml\""));
    }

    #[test]
    fn test_core_xml_escapes_text() {
        let core = CoreProperties {
            title: "ВП40 <test>".to_string(),
            ..CoreProperties::default()
        };
        let xml = core_xml(&core);
        assert!(xml.contains("<dc:title>ВП40 &lt;test&gt;</dc:title>"));
        assert!(xml.contains("<dc:creator>targetsheet</dc:creator>"));
    }

    #[test]
    fn test_read_anchors_from_package() {
        use crate::docx::document::Document;
        use crate::models::Emu;

        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("target.png");
        std::fs::write(&image, png_bytes(20, 10, 5)).unwrap();

        let mut document = Document::new();
        document.add_paragraph("");
        document
            .add_float_picture(&image, Some(Emu::from_cm(8.0)), None, Emu::from_pt(71.0), Emu::from_pt(56.0))
            .unwrap();
        document
            .add_float_picture(&image, Some(Emu::from_cm(8.0)), None, Emu::from_pt(297.5), Emu::from_pt(56.0))
            .unwrap();

        let path = dir.path().join("sheet.docx");
        document.save(&path).unwrap();

        let anchors = read_anchors(&path).unwrap();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].shape_id, 1);
        assert_eq!(anchors[1].shape_id, 2);
        assert_eq!(anchors[1].pos_x, Emu::from_pt(297.5));
        assert_eq!(anchors[0].relationship_id, anchors[1].relationship_id);
    }

    #[test]
    fn test_read_anchors_missing_file() {
        assert!(matches!(read_anchors("no/such/sheet.docx"), Err(DocxError::Io(_))));
    }

    #[test]
    fn test_styles_use_main_namespace() {
        assert!(STYLES_XML.contains(crate::docx::NS_W));
    }
}
