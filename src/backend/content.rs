//! Content-stream interpretation.
//!
//! Walks the operators of a page (and the form XObjects it paints), tracking
//! the graphics and text state, and records every text-showing operator as a
//! positioned span and every image XObject as a placed rectangle.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use super::{decode_text_simple, is_spaceless_script_char, RawSpan};
use crate::error::{Error, Result};
use crate::model::{FontStyle, Rect, UnitOrdinal};

/// Glyph ascent above the baseline, as a fraction of the font size.
const ASCENT: f32 = 0.8;
/// Glyph descent below the baseline, as a fraction of the font size.
const DESCENT: f32 = 0.2;
/// Advance used when a font carries no usable widths (fraction of an em).
const DEFAULT_GLYPH_WIDTH: f32 = 0.5;
/// TJ adjustment (thousandths of an em) treated as a word break.
const TJ_SPACE_THRESHOLD: f32 = 200.0;
const MAX_FORM_DEPTH: usize = 8;

/// PDF transformation matrix `[a b c d e f]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn translation(tx: f32, ty: f32) -> Self {
        Matrix {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        let v: Vec<f32> = operands.iter().filter_map(number).collect();
        match v.as_slice() {
            [a, b, c, d, e, f] => Some(Matrix {
                a: *a,
                b: *b,
                c: *c,
                d: *d,
                e: *e,
                f: *f,
            }),
            _ => None,
        }
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed y unit vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

/// An image XObject painted by a `Do` operator.
pub(crate) struct ImagePlacement<'a> {
    pub name: String,
    pub stream: &'a Stream,
    /// Placement on the page, origin top-left
    pub rect: Rect,
}

/// Everything recorded while interpreting one page.
pub(crate) struct PageContent<'a> {
    pub spans: Vec<RawSpan>,
    pub images: Vec<ImagePlacement<'a>>,
}

/// Interpret `content` against `resources`.
///
/// `media_box` is the page box in PDF user space; output rectangles are
/// relative to its top-left corner.
pub(crate) fn interpret<'a>(
    doc: &'a LopdfDocument,
    content: &[u8],
    resources: Option<&'a Dictionary>,
    media_box: Rect,
) -> Result<PageContent<'a>> {
    let mut interpreter = Interpreter {
        doc,
        origin_x: media_box.x0,
        origin_top: media_box.y1,
        spans: Vec::new(),
        images: Vec::new(),
        bt_count: 0,
        block: 0,
        line: 0,
        index: 0,
    };
    interpreter.run(content, resources, Matrix::IDENTITY, 0)?;
    Ok(PageContent {
        spans: interpreter.spans,
        images: interpreter.images,
    })
}

/// Resolve an indirect reference, returning the object itself otherwise.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Look up `key` in `dict` and resolve it to a dictionary.
pub(crate) fn sub_dict<'a>(
    doc: &'a LopdfDocument,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    dict.get(key)
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
}

/// Name value of `key` as a string.
pub(crate) fn name_of<'a>(dict: &'a Dictionary, key: &[u8]) -> Option<&'a str> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_name().ok())
        .and_then(|n| std::str::from_utf8(n).ok())
}

/// Stream payload, decompressed when a filter is declared.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.get(b"Filter").is_ok() {
        stream
            .decompressed_content()
            .map_err(|e| Error::PdfParse(format!("failed to decompress stream: {e}")))
    } else {
        Ok(stream.content.clone())
    }
}

/// Helper to extract a number from a PDF object.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Font resources needed for decoding and measuring text.
struct LoadedFont<'a> {
    dict: &'a Dictionary,
    family: String,
    flags: u32,
    first_char: i64,
    widths: Vec<f32>,
    default_width: f32,
    two_byte: bool,
}

impl<'a> LoadedFont<'a> {
    fn load(doc: &'a LopdfDocument, dict: &'a Dictionary) -> Self {
        let base_font = name_of(dict, b"BaseFont").unwrap_or("Unknown");
        let family = strip_subset_prefix(base_font).to_string();
        let two_byte = name_of(dict, b"Subtype") == Some("Type0");

        let descendant = if two_byte {
            dict.get(b"DescendantFonts")
                .ok()
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_array().ok())
                .and_then(|arr| arr.first())
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_dict().ok())
        } else {
            None
        };

        let descriptor = sub_dict(doc, descendant.unwrap_or(dict), b"FontDescriptor");
        let descriptor_flags = descriptor
            .and_then(|d| d.get(b"Flags").ok())
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let weight = descriptor
            .and_then(|d| d.get(b"FontWeight").ok())
            .and_then(number);

        let first_char = dict
            .get(b"FirstChar")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(0);
        let widths = dict
            .get(b"Widths")
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|o| number(resolve(doc, o)).unwrap_or(0.0) / 1000.0)
                    .collect()
            })
            .unwrap_or_default();
        let default_width = descendant
            .and_then(|d| d.get(b"DW").ok())
            .and_then(number)
            .map(|w| w / 1000.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);

        Self {
            dict,
            flags: style_flags(&family, descriptor_flags, weight),
            family,
            first_char,
            widths,
            default_width,
            two_byte,
        }
    }

    fn decode(&self, doc: &LopdfDocument, bytes: &[u8]) -> String {
        self.dict
            .get_font_encoding(doc)
            .ok()
            .and_then(|enc| LopdfDocument::decode_text(&enc, bytes).ok())
            .unwrap_or_else(|| decode_text_simple(bytes))
    }

    /// Advance (fraction of an em) and word-space eligibility of each code.
    fn code_widths(&self, bytes: &[u8]) -> Vec<(f32, bool)> {
        if self.two_byte {
            return bytes
                .chunks(2)
                .map(|_| (self.default_width, false))
                .collect();
        }
        bytes
            .iter()
            .map(|&code| {
                let width = usize::try_from(code as i64 - self.first_char)
                    .ok()
                    .and_then(|i| self.widths.get(i))
                    .copied()
                    .filter(|w| *w > 0.0)
                    .unwrap_or(DEFAULT_GLYPH_WIDTH);
                (width, code == b' ')
            })
            .collect()
    }
}

/// Remove a `ABCDEF+` subset tag from a base font name.
pub(crate) fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Derive span style flags from the font descriptor and the font name.
pub(crate) fn style_flags(name: &str, descriptor_flags: i64, weight: Option<f32>) -> u32 {
    const FIXED_PITCH: i64 = 1;
    const SERIF: i64 = 1 << 1;
    const ITALIC: i64 = 1 << 6;
    const FORCE_BOLD: i64 = 1 << 18;

    let lower = name.to_lowercase();
    let mut flags = 0;
    if descriptor_flags & ITALIC != 0 || lower.contains("italic") || lower.contains("oblique") {
        flags |= FontStyle::FLAG_ITALIC;
    }
    if descriptor_flags & FORCE_BOLD != 0
        || weight.is_some_and(|w| w >= 700.0)
        || lower.contains("bold")
        || lower.contains("black")
        || lower.contains("heavy")
    {
        flags |= FontStyle::FLAG_BOLD;
    }
    if descriptor_flags & SERIF != 0 {
        flags |= FontStyle::FLAG_SERIFED;
    }
    if descriptor_flags & FIXED_PITCH != 0 {
        flags |= FontStyle::FLAG_MONOSPACED;
    }
    flags
}

fn load_fonts<'a>(
    doc: &'a LopdfDocument,
    resources: Option<&'a Dictionary>,
) -> BTreeMap<Vec<u8>, LoadedFont<'a>> {
    let mut fonts = BTreeMap::new();
    let Some(font_dict) = resources.and_then(|r| sub_dict(doc, r, b"Font")) else {
        return fonts;
    };
    for (name, obj) in font_dict.iter() {
        if let Ok(dict) = resolve(doc, obj).as_dict() {
            fonts.insert(name.clone(), LoadedFont::load(doc, dict));
        }
    }
    fonts
}

fn rgb_color(r: f32, g: f32, b: f32) -> u32 {
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
    (c(r) << 16) | (c(g) << 8) | c(b)
}

fn fill_color(operands: &[Object]) -> Option<u32> {
    let v: Vec<f32> = operands.iter().filter_map(number).collect();
    match v.as_slice() {
        [g] => Some(rgb_color(*g, *g, *g)),
        [r, g, b] => Some(rgb_color(*r, *g, *b)),
        [c, m, y, k] => Some(rgb_color(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    fill: Option<u32>,
    font: Option<Vec<u8>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            fill: Some(0),
            font: None,
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct Interpreter<'a> {
    doc: &'a LopdfDocument,
    origin_x: f32,
    origin_top: f32,
    spans: Vec<RawSpan>,
    images: Vec<ImagePlacement<'a>>,
    bt_count: u32,
    block: u32,
    line: u32,
    index: u32,
}

impl<'a> Interpreter<'a> {
    fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;
        let fonts = load_fonts(self.doc, resources);

        let mut gs = GraphicsState::new(ctm);
        let mut saved = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut in_text_block = false;

        for op in &content.operations {
            let operands = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => saved.push(gs.clone()),
                "Q" => {
                    if let Some(state) = saved.pop() {
                        gs = state;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }
                "g" | "rg" | "k" | "sc" | "scn" => {
                    if let Some(color) = fill_color(operands) {
                        gs.fill = Some(color);
                    }
                }
                "BT" => {
                    in_text_block = true;
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                    self.block = self.bt_count;
                    self.bt_count += 1;
                    self.line = 0;
                    self.index = 0;
                }
                "ET" => in_text_block = false,
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        gs.font = Some(name.clone());
                    }
                    if let Some(size) = operands.get(1).and_then(number) {
                        gs.size = size;
                    }
                }
                "Tc" => gs.char_spacing = operands.first().and_then(number).unwrap_or(0.0),
                "Tw" => gs.word_spacing = operands.first().and_then(number).unwrap_or(0.0),
                "Tz" => gs.h_scale = operands.first().and_then(number).unwrap_or(100.0) / 100.0,
                "TL" => gs.leading = operands.first().and_then(number).unwrap_or(0.0),
                "Ts" => gs.rise = operands.first().and_then(number).unwrap_or(0.0),
                "Td" | "TD" => {
                    let tx = operands.first().and_then(number).unwrap_or(0.0);
                    let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                    if op.operator == "TD" {
                        gs.leading = -ty;
                    }
                    tlm = Matrix::translation(tx, ty).then(&tlm);
                    tm = tlm;
                    if ty != 0.0 {
                        self.new_line();
                    }
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        if m.f != tlm.f {
                            self.new_line();
                        }
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    self.new_line();
                }
                "Tj" | "TJ" => {
                    let items = match operands.first() {
                        Some(Object::Array(arr)) => arr.as_slice(),
                        Some(obj) => std::slice::from_ref(obj),
                        None => &[],
                    };
                    let font = gs.font.as_ref().and_then(|n| fonts.get(n));
                    self.show(items, font, &gs, &mut tm, in_text_block);
                }
                "'" | "\"" => {
                    if op.operator == "\"" {
                        gs.word_spacing = operands.first().and_then(number).unwrap_or(0.0);
                        gs.char_spacing = operands.get(1).and_then(number).unwrap_or(0.0);
                    }
                    tlm = Matrix::translation(0.0, -gs.leading).then(&tlm);
                    tm = tlm;
                    self.new_line();
                    let text_idx = if op.operator == "\"" { 2 } else { 0 };
                    let items = operands
                        .get(text_idx)
                        .map(std::slice::from_ref)
                        .unwrap_or(&[]);
                    let font = gs.font.as_ref().and_then(|n| fonts.get(n));
                    self.show(items, font, &gs, &mut tm, in_text_block);
                }
                "Do" => {
                    if let (Some(Object::Name(name)), Some(res)) = (operands.first(), resources) {
                        self.paint_xobject(res, name, gs.ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.index = 0;
    }

    /// Show strings and TJ adjustments, emit one span and advance the text matrix.
    fn show(
        &mut self,
        items: &[Object],
        font: Option<&LoadedFont<'a>>,
        gs: &GraphicsState,
        tm: &mut Matrix,
        in_text_block: bool,
    ) {
        let size = gs.size;
        let mut text = String::new();
        let mut glyph_extents: Vec<(f32, f32)> = Vec::new();
        let mut x = 0.0f32;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = match font {
                        Some(f) => f.decode(self.doc, bytes),
                        None => decode_text_simple(bytes),
                    };
                    let advances = char_advances(font, bytes, &decoded, gs);
                    for (ch, advance) in decoded.chars().zip(advances) {
                        if !ch.is_whitespace() {
                            glyph_extents.push((x, x + advance));
                        }
                        x += advance;
                    }
                    text.push_str(&decoded);
                }
                Object::Integer(_) | Object::Real(_) => {
                    let adjustment = -number(item).unwrap_or(0.0);
                    x += adjustment / 1000.0 * size * gs.h_scale;
                    if adjustment > TJ_SPACE_THRESHOLD
                        && text
                            .chars()
                            .last()
                            .is_some_and(|c| !c.is_whitespace() && !is_spaceless_script_char(c))
                    {
                        text.push(' ');
                    }
                }
                _ => {}
            }
        }

        let to_user = tm.then(&gs.ctm);
        if in_text_block && !text.trim().is_empty() {
            let bottom = gs.rise - DESCENT * size;
            let top = gs.rise + ASCENT * size;
            let glyphs: Vec<Rect> = glyph_extents
                .iter()
                .map(|&(x0, x1)| self.page_rect(&to_user, x0, bottom, x1, top))
                .collect();
            if let Some(rect) = Rect::union_all(&glyphs) {
                self.spans.push(RawSpan {
                    text: text.trim_end().to_string(),
                    rect,
                    glyphs,
                    size: size * to_user.vertical_scale(),
                    flags: font.map(|f| f.flags).unwrap_or(0),
                    font: font
                        .map(|f| f.family.clone())
                        .or_else(|| gs.font.as_ref().map(|n| String::from_utf8_lossy(n).to_string()))
                        .unwrap_or_default(),
                    color: gs.fill,
                    ordinal: UnitOrdinal::new(self.block, 0, self.line, self.index),
                });
                self.index += 1;
            }
        }

        *tm = Matrix::translation(x, 0.0).then(tm);
    }

    fn paint_xobject(
        &mut self,
        resources: &'a Dictionary,
        name: &[u8],
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let stream = sub_dict(self.doc, resources, b"XObject")
            .and_then(|xobjects| xobjects.get(name).ok())
            .map(|o| resolve(self.doc, o));
        let Some(Object::Stream(stream)) = stream else {
            return Ok(());
        };

        match name_of(&stream.dict, b"Subtype") {
            Some("Image") => {
                let rect = self.page_rect(&ctm, 0.0, 0.0, 1.0, 1.0);
                self.images.push(ImagePlacement {
                    name: String::from_utf8_lossy(name).to_string(),
                    stream,
                    rect,
                });
                Ok(())
            }
            Some("Form") => {
                if depth >= MAX_FORM_DEPTH {
                    log::debug!(
                        "Form XObject {} nested too deeply, skipping",
                        String::from_utf8_lossy(name)
                    );
                    return Ok(());
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| o.as_array().ok())
                    .and_then(|arr| Matrix::from_operands(arr))
                    .unwrap_or_default();
                let form_resources = sub_dict(self.doc, &stream.dict, b"Resources").or(Some(resources));
                let bytes = stream_bytes(stream)?;
                self.run(&bytes, form_resources, matrix.then(&ctm), depth + 1)
            }
            _ => Ok(()),
        }
    }

    /// Transform a text/user-space box and convert it to top-left page coordinates.
    fn page_rect(&self, m: &Matrix, x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        let corners = [m.apply(x0, y0), m.apply(x1, y0), m.apply(x0, y1), m.apply(x1, y1)];
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for (x, y) in corners {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        Rect::new(
            min_x - self.origin_x,
            self.origin_top - max_y,
            max_x - self.origin_x,
            self.origin_top - min_y,
        )
    }
}

/// Text-space advance of every decoded character.
fn char_advances(
    font: Option<&LoadedFont<'_>>,
    bytes: &[u8],
    decoded: &str,
    gs: &GraphicsState,
) -> Vec<f32> {
    let code_widths = match font {
        Some(f) => f.code_widths(bytes),
        None => bytes
            .iter()
            .map(|&b| (DEFAULT_GLYPH_WIDTH, b == b' '))
            .collect(),
    };
    let per_code: Vec<f32> = code_widths
        .iter()
        .map(|&(width, is_space)| {
            let word = if is_space { gs.word_spacing } else { 0.0 };
            (width * gs.size + gs.char_spacing + word) * gs.h_scale
        })
        .collect();

    let n_chars = decoded.chars().count();
    if per_code.len() == n_chars {
        per_code
    } else {
        // multi-byte codes or ligatures: spread the total evenly
        let total: f32 = per_code.iter().sum();
        vec![total / n_chars.max(1) as f32; n_chars]
    }
}
