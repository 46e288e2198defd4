//! hOCR parsing.
//!
//! Only the layout classes are interpreted: `ocr_carea` (block), `ocr_par`,
//! the line family (`ocr_line`, `ocr_header`, `ocr_caption`, `ocr_textfloat`)
//! and `ocrx_word`. Properties come from the `title` attribute.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::OcrWord;
use crate::error::Result;
use crate::model::{Rect, UnitOrdinal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Element {
    Block,
    Paragraph,
    Line,
    Word,
    Other,
}

fn classify(start: &BytesStart<'_>) -> (Element, Option<String>) {
    let mut element = Element::Other;
    let mut title = None;
    for attr in start.attributes().flatten() {
        match attr.key.as_ref() {
            b"class" => {
                element = match attr.value.as_ref() {
                    b"ocr_carea" => Element::Block,
                    b"ocr_par" => Element::Paragraph,
                    b"ocr_line" | b"ocr_header" | b"ocr_caption" | b"ocr_textfloat" => {
                        Element::Line
                    }
                    b"ocrx_word" => Element::Word,
                    _ => Element::Other,
                };
            }
            b"title" => {
                title = attr.unescape_value().ok().map(|v| v.into_owned());
            }
            _ => {}
        }
    }
    (element, title)
}

/// Value of property `key` in an hOCR title, e.g. `bbox 1 2 3 4; x_wconf 95`.
fn property<'a>(title: &'a str, key: &str) -> Option<Vec<&'a str>> {
    title.split(';').find_map(|prop| {
        let mut parts = prop.split_whitespace();
        (parts.next() == Some(key)).then(|| parts.collect())
    })
}

fn parse_bbox(title: &str) -> Option<Rect> {
    let values: Vec<f32> = property(title, "bbox")?
        .iter()
        .filter_map(|v| v.parse().ok())
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => Some(Rect::new(*x0, *y0, *x1, *y1)),
        _ => None,
    }
}

fn parse_number(title: &str, key: &str) -> Option<f32> {
    property(title, key)?.first()?.parse().ok()
}

struct PendingWord {
    rect: Rect,
    font_size: Option<f32>,
    confidence: Option<f32>,
    ordinal: UnitOrdinal,
    text: String,
}

/// Parse an hOCR document into words in document order.
///
/// Words without a bounding box or with blank text are skipped.
pub fn parse_hocr(hocr: &str) -> Result<Vec<OcrWord>> {
    let mut reader = Reader::from_str(hocr);
    reader.trim_text(true);

    let mut words = Vec::new();
    let mut open: Vec<Element> = Vec::new();
    let mut pending: Option<PendingWord> = None;
    // counters are -1 until the first element of their kind
    let (mut block, mut par, mut line, mut word) = (-1i64, -1i64, -1i64, -1i64);

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let (element, title) = classify(&start);
                match element {
                    Element::Block => {
                        block += 1;
                        (par, line, word) = (-1, -1, -1);
                    }
                    Element::Paragraph => {
                        par += 1;
                        (line, word) = (-1, -1);
                    }
                    Element::Line => {
                        line += 1;
                        word = -1;
                    }
                    Element::Word => {
                        word += 1;
                        let title = title.unwrap_or_default();
                        pending = parse_bbox(&title).map(|rect| PendingWord {
                            rect,
                            font_size: parse_number(&title, "x_fsize"),
                            confidence: parse_number(&title, "x_wconf"),
                            ordinal: UnitOrdinal::new(
                                block.max(0) as u32,
                                par.max(0) as u32,
                                line.max(0) as u32,
                                word as u32,
                            ),
                            text: String::new(),
                        });
                    }
                    Element::Other => {}
                }
                open.push(element);
            }
            Event::Text(text) => {
                if let Some(p) = pending.as_mut() {
                    if open.contains(&Element::Word) {
                        p.text.push_str(&text.unescape()?);
                    }
                }
            }
            Event::End(_) => {
                if open.pop() == Some(Element::Word) {
                    if let Some(p) = pending.take() {
                        let text = p.text.trim();
                        if !text.is_empty() {
                            words.push(OcrWord {
                                text: text.to_string(),
                                rect: p.rect,
                                font_size: p.font_size.filter(|s| *s > 0.0),
                                confidence: p.confidence,
                                ordinal: p.ordinal,
                            });
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN"
    "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
 <head><title></title></head>
 <body>
  <div class='ocr_page' id='page_1' title='image "page.png"; bbox 0 0 2448 3168; ppageno 0'>
   <div class='ocr_carea' id='block_1_1' title="bbox 288 300 1200 420">
    <p class='ocr_par' id='par_1_1' lang='eng' title="bbox 288 300 1200 420">
     <span class='ocr_line' id='line_1_1' title="bbox 288 300 1200 360; baseline 0 -10; x_size 60">
      <span class='ocrx_word' id='word_1_1' title='bbox 288 300 700 360; x_wconf 96; x_font Times; x_fsize 18'><strong>Chapter</strong></span>
      <span class='ocrx_word' id='word_1_2' title='bbox 740 300 800 360; x_wconf 91'>1</span>
     </span>
     <span class='ocr_line' id='line_1_2' title="bbox 288 370 1200 420">
      <span class='ocrx_word' id='word_1_3' title='bbox 288 370 400 420; x_wconf 90'>Tom &amp; Jerry</span>
      <span class='ocrx_word' id='word_1_4' title='bbox 420 370 500 420; x_wconf 10'> </span>
     </span>
    </p>
   </div>
   <div class='ocr_carea' id='block_1_2' title="bbox 288 500 1200 560">
    <p class='ocr_par' id='par_1_2' lang='eng' title="bbox 288 500 1200 560">
     <span class='ocr_caption' id='line_1_3' title="bbox 288 500 1200 560">
      <span class='ocrx_word' id='word_1_5' title='bbox 288 500 600 560; x_wconf 88'>Figure</span>
     </span>
    </p>
   </div>
  </div>
 </body>
</html>"#;

    #[test]
    fn test_parse_words_and_ordinals() {
        let words = parse_hocr(SAMPLE).unwrap();
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Chapter", "1", "Tom & Jerry", "Figure"]);

        assert_eq!(words[0].rect, Rect::new(288.0, 300.0, 700.0, 360.0));
        assert_eq!(words[0].font_size, Some(18.0));
        assert_eq!(words[0].confidence, Some(96.0));
        assert_eq!(words[0].ordinal, UnitOrdinal::new(0, 0, 0, 0));
        assert_eq!(words[1].font_size, None);
        assert_eq!(words[1].ordinal, UnitOrdinal::new(0, 0, 0, 1));
        assert_eq!(words[2].ordinal, UnitOrdinal::new(0, 0, 1, 0));
        assert_eq!(words[3].ordinal, UnitOrdinal::new(1, 0, 0, 0));
    }

    #[test]
    fn test_property_lookup() {
        let title = "bbox 1 2 3 4; x_wconf 95; x_fsize 10.5";
        assert_eq!(parse_bbox(title), Some(Rect::new(1.0, 2.0, 3.0, 4.0)));
        assert_eq!(parse_number(title, "x_fsize"), Some(10.5));
        assert_eq!(parse_number(title, "x_size"), None);
        assert_eq!(parse_bbox("bbox 1 2"), None);
    }

    #[test]
    fn test_empty_document() {
        assert!(parse_hocr("<html><body></body></html>").unwrap().is_empty());
    }
}
