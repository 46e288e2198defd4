//! Image XObject decoding.

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use super::content::{resolve, stream_bytes};
use super::ColorSpace;
use crate::error::{Error, Result};

/// Header fields of an image XObject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub bits_per_component: u8,
}

pub(crate) fn image_info(doc: &LopdfDocument, stream: &Stream) -> ImageInfo {
    let int = |key: &[u8]| {
        stream
            .dict
            .get(key)
            .ok()
            .map(|o| resolve(doc, o))
            .and_then(|o| o.as_i64().ok())
    };
    let image_mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let color_space = if image_mask {
        ColorSpace::Gray
    } else {
        stream
            .dict
            .get(b"ColorSpace")
            .ok()
            .map(|o| color_space_of(doc, resolve(doc, o)))
            .unwrap_or(ColorSpace::Other)
    };
    ImageInfo {
        width: int(b"Width").and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        height: int(b"Height").and_then(|v| u32::try_from(v).ok()).unwrap_or(0),
        color_space,
        bits_per_component: if image_mask {
            1
        } else {
            int(b"BitsPerComponent")
                .and_then(|v| u8::try_from(v).ok())
                .unwrap_or(8)
        },
    }
}

fn color_space_of(doc: &LopdfDocument, obj: &Object) -> ColorSpace {
    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
            _ => ColorSpace::Other,
        },
        Object::Array(arr) => match arr.first() {
            Some(Object::Name(family)) => match family.as_slice() {
                b"ICCBased" => {
                    let components = arr
                        .get(1)
                        .map(|o| resolve(doc, o))
                        .and_then(|o| match o {
                            Object::Stream(s) => s.dict.get(b"N").ok().and_then(|n| n.as_i64().ok()),
                            _ => None,
                        });
                    match components {
                        Some(1) => ColorSpace::Gray,
                        Some(3) => ColorSpace::Rgb,
                        Some(4) => ColorSpace::Cmyk,
                        _ => ColorSpace::Other,
                    }
                }
                b"Indexed" | b"I" => ColorSpace::Indexed,
                b"CalRGB" => ColorSpace::Rgb,
                b"CalGray" => ColorSpace::Gray,
                _ => ColorSpace::Other,
            },
            _ => ColorSpace::Other,
        },
        _ => ColorSpace::Other,
    }
}

fn filters(stream: &Stream) -> Vec<&[u8]> {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.as_slice()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name().ok())
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode an image XObject into pixels.
pub(crate) fn decode_image(doc: &LopdfDocument, stream: &Stream) -> Result<DynamicImage> {
    let info = image_info(doc, stream);
    let filters = filters(stream);

    if filters.iter().any(|f| *f == b"DCTDecode" || *f == b"DCT") {
        let jpeg = if filters.len() == 1 {
            stream.content.clone()
        } else {
            // Flate-wrapped JPEG: strip the outer filters only
            let mut outer = stream.clone();
            outer.dict.set(
                "Filter",
                Object::Array(
                    filters
                        .iter()
                        .filter(|f| **f != b"DCTDecode" && **f != b"DCT")
                        .map(|f| Object::Name(f.to_vec()))
                        .collect(),
                ),
            );
            stream_bytes(&outer)?
        };
        return Ok(image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg)?);
    }

    if let Some(unsupported) = filters
        .iter()
        .find(|f| matches!(**f, b"JPXDecode" | b"CCITTFaxDecode" | b"CCF" | b"JBIG2Decode"))
    {
        return Err(Error::Image(format!(
            "unsupported image filter {}",
            String::from_utf8_lossy(unsupported)
        )));
    }

    let raw = stream_bytes(stream)?;
    let palette = if info.color_space == ColorSpace::Indexed {
        Some(indexed_palette(doc, &stream.dict)?)
    } else {
        None
    };
    decode_raw(&raw, info, palette.as_ref())
}

/// Palette of an `[/Indexed base hival lookup]` colour space, as (components, bytes).
fn indexed_palette(doc: &LopdfDocument, dict: &Dictionary) -> Result<(usize, Vec<u8>)> {
    let arr = dict
        .get(b"ColorSpace")
        .ok()
        .map(|o| resolve(doc, o))
        .and_then(|o| o.as_array().ok())
        .ok_or_else(|| Error::Image("malformed Indexed colour space".to_string()))?;
    let base = arr
        .get(1)
        .map(|o| color_space_of(doc, resolve(doc, o)))
        .unwrap_or(ColorSpace::Other);
    let components = match base {
        ColorSpace::Gray | ColorSpace::Rgb | ColorSpace::Cmyk => base.components().unwrap_or(3),
        _ => return Err(Error::Image("unsupported Indexed base colour space".to_string())),
    };
    let lookup = match arr.get(3).map(|o| resolve(doc, o)) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(s)) => stream_bytes(s)?,
        _ => return Err(Error::Image("missing Indexed lookup table".to_string())),
    };
    Ok((components, lookup))
}

fn decode_raw(raw: &[u8], info: ImageInfo, palette: Option<&(usize, Vec<u8>)>) -> Result<DynamicImage> {
    let (w, h) = (info.width as usize, info.height as usize);
    if w == 0 || h == 0 {
        return Err(Error::Image("image has no pixels".to_string()));
    }
    let too_short = || Error::Image(format!("image data too short for {w}x{h}"));

    match (info.color_space, info.bits_per_component) {
        (ColorSpace::Gray, 8) => {
            let data = raw.get(..w * h).ok_or_else(too_short)?.to_vec();
            GrayImage::from_raw(info.width, info.height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(too_short)
        }
        (ColorSpace::Gray, 1) => {
            let row_bytes = w.div_ceil(8);
            let packed = raw.get(..row_bytes * h).ok_or_else(too_short)?;
            let data: Vec<u8> = packed
                .chunks(row_bytes)
                .flat_map(|row| {
                    (0..w).map(move |x| {
                        if row[x / 8] & (0x80 >> (x % 8)) != 0 {
                            255
                        } else {
                            0
                        }
                    })
                })
                .collect();
            GrayImage::from_raw(info.width, info.height, data)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(too_short)
        }
        (ColorSpace::Rgb, 8) => {
            let data = raw.get(..w * h * 3).ok_or_else(too_short)?.to_vec();
            RgbImage::from_raw(info.width, info.height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(too_short)
        }
        (ColorSpace::Cmyk, 8) => {
            let data: Vec<u8> = raw
                .get(..w * h * 4)
                .ok_or_else(too_short)?
                .chunks_exact(4)
                .flat_map(|p| cmyk_to_rgb(p[0], p[1], p[2], p[3]))
                .collect();
            RgbImage::from_raw(info.width, info.height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(too_short)
        }
        (ColorSpace::Indexed, 8) => {
            let (components, lookup) =
                palette.ok_or_else(|| Error::Image("missing palette".to_string()))?;
            let indices = raw.get(..w * h).ok_or_else(too_short)?;
            let mut data = Vec::with_capacity(w * h * 3);
            for &idx in indices {
                let start = idx as usize * components;
                let entry = lookup.get(start..start + components).unwrap_or(&[]);
                let rgb = match entry {
                    [g] => [*g, *g, *g],
                    [r, g, b] => [*r, *g, *b],
                    [c, m, y, k] => cmyk_to_rgb(*c, *m, *y, *k),
                    _ => [0, 0, 0],
                };
                data.extend_from_slice(&rgb);
            }
            RgbImage::from_raw(info.width, info.height, data)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(too_short)
        }
        (cs, bits) => Err(Error::Image(format!(
            "unsupported sample layout {cs:?} at {bits} bits per component"
        ))),
    }
}

fn cmyk_to_rgb(c: u8, m: u8, y: u8, k: u8) -> [u8; 3] {
    let channel = |v: u8| ((255 - v as u16) * (255 - k as u16) / 255) as u8;
    [channel(c), channel(m), channel(y)]
}
