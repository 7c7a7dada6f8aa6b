//! PDF encoding of laid-out receipt pages.
//!
//! One page per chunk of lines, 80 mm wide (thermal roll), Courier 8pt so
//! the fixed-width layout survives. No compression, no timestamps: the same
//! pages always produce the same bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::ReceiptError;

const PAGE_WIDTH: f32 = 226.0;
const MARGIN: f32 = 12.0;
const FONT_SIZE: f32 = 8.0;
const LEADING: f32 = 10.0;

/// WinAnsi covers Latin-1; anything outside it prints as `?`.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

fn page_height(lines_per_page: usize) -> f32 {
    MARGIN * 2.0 + LEADING * lines_per_page as f32
}

fn page_content(lines: &[String], height: f32) -> Result<Vec<u8>, ReceiptError> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), (height - MARGIN - FONT_SIZE).into()]),
    ];

    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| ReceiptError::Render(e.to_string()))
}

/// Writes `pages` as a PDF document. Every page gets the same height,
/// sized for `lines_per_page`.
pub fn render(pages: &[Vec<String>], lines_per_page: usize, title: &str) -> Result<Vec<u8>, ReceiptError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let height = page_height(lines_per_page);
    let mut kids: Vec<ObjectId> = Vec::with_capacity(pages.len());
    for lines in pages {
        let content = page_content(lines, height)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id);
    }

    let count = i64::try_from(kids.len()).map_err(|e| ReceiptError::Render(e.to_string()))?;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.into_iter().map(Object::from).collect::<Vec<Object>>(),
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::from(0_i64),
                Object::from(0_i64),
                Object::from(PAGE_WIDTH),
                Object::from(height),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_text(title), StringFormat::Literal),
        "Producer" => Object::string_literal("tally-receipt"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| ReceiptError::Render(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_text_maps_outside_latin1() {
        assert_eq!(encode_text("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_text("€5"), b"?5".to_vec());
    }

    #[test]
    fn test_render_page_count() {
        let pages = vec![
            vec!["first".to_string()],
            vec!["second".to_string()],
        ];
        let bytes = render(&pages, 20, "test").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }
}
