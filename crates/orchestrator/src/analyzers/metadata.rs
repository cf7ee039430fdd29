//! File-level metadata introspection, no model involved.
//!
//! Format and dimensions come from the `image` decoders. PNG text chunks and
//! JPEG EXIF/XMP/comment segments are walked here, since the decoders do not
//! expose them, then keys that image generators are known to write are flagged.

use std::collections::BTreeMap;
use std::io::{Cursor, ErrorKind};

use async_trait::async_trait;
use forensics_core::{StepResult, TaskInput};
use image::{ImageFormat, ImageReader};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::analyzer::Analyzer;
use crate::error::Result;

const PNG_SIGNATURE_LEN: usize = 8;
const EXIF_HEADER: &[u8] = b"Exif\0\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const MAX_VALUE_CHARS: usize = 4000;
const MAX_IFD_ENTRIES: usize = 512;

/// Text keys written by known generator front ends
const GENERATOR_KEYS: &[(&str, &str)] = &[
    ("parameters", "AUTOMATIC1111"),
    ("workflow", "ComfyUI"),
    ("prompt", "ComfyUI"),
    ("invokeai_metadata", "InvokeAI"),
    ("sd-metadata", "InvokeAI"),
    ("Dream", "InvokeAI"),
    ("fooocus_scheme", "Fooocus"),
];

/// Substrings of a `Software` value that identify a generator
const GENERATOR_SOFTWARE: &[&str] = &[
    "NovelAI",
    "Stable Diffusion",
    "Midjourney",
    "DALL-E",
    "Firefly",
    "Imagen",
    "Flux",
];

/// EXIF tags worth reporting
const EXIF_TAGS: &[(u16, &str)] = &[
    (271, "Make"),
    (272, "Model"),
    (305, "Software"),
    (306, "DateTime"),
    (315, "Artist"),
    (33432, "Copyright"),
    (36867, "DateTimeOriginal"),
    (36868, "DateTimeDigitized"),
    (37510, "UserComment"),
    (42034, "LensModel"),
];
const EXIF_IFD_POINTER: u16 = 0x8769;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// What could be read from the file container
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct FileReport {
    pub file_size_bytes: usize,
    pub image_format: Option<&'static str>,
    pub image_size: Option<ImageSize>,
    pub png_info: BTreeMap<String, String>,
    pub exif_data: BTreeMap<String, String>,
    pub xmp_present: bool,
    pub comment: Option<String>,
}

impl FileReport {
    pub fn inspect(bytes: &[u8]) -> Self {
        let format = image::guess_format(bytes).ok();
        let mut report = Self {
            file_size_bytes: bytes.len(),
            image_format: format.map(format_name),
            image_size: read_dimensions(bytes),
            ..Default::default()
        };

        match format {
            Some(ImageFormat::Png) => parse_png(bytes, &mut report),
            Some(ImageFormat::Jpeg) => parse_jpeg(bytes, &mut report),
            _ => {}
        }
        report
    }

    /// Every text entry that may carry generator metadata
    fn text_entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.png_info.iter().chain(self.exif_data.iter())
    }
}

/// Generator attribution derived from a [`FileReport`]
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct GeneratorReport {
    pub metadata_found: bool,
    pub generator: Option<String>,
    pub matched_keys: Vec<String>,
    pub raw_metadata: BTreeMap<String, String>,
}

impl GeneratorReport {
    pub fn from_file_report(report: &FileReport) -> Self {
        let mut generator = None;
        let mut matched_keys = Vec::new();
        let mut raw_metadata = BTreeMap::new();

        for (key, value) in report.text_entries() {
            let by_key = GENERATOR_KEYS
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, name)| name.to_string());
            let by_software = (key == "Software")
                .then(|| {
                    GENERATOR_SOFTWARE
                        .iter()
                        .find(|name| value.to_lowercase().contains(&name.to_lowercase()))
                        .map(|name| name.to_string())
                })
                .flatten();

            if let Some(name) = by_key.or(by_software) {
                if generator.is_none() {
                    generator = Some(name);
                }
                matched_keys.push(key.clone());
                raw_metadata.insert(key.clone(), truncate(value));
            }
        }

        Self {
            metadata_found: !matched_keys.is_empty(),
            generator,
            matched_keys,
            raw_metadata,
        }
    }
}

pub struct MetadataAnalyzer;

impl MetadataAnalyzer {
    pub const NAME: &'static str = "AIMetadataAnalyzer";
    pub const DISPLAY_NAME: &'static str = "Metadata Analysis";

    fn error_result(error_type: &str, message: String) -> StepResult {
        StepResult::new(
            Self::NAME,
            json!({
                "status": "error",
                "error_type": error_type,
                "message": message,
            }),
        )
    }
}

#[async_trait]
impl Analyzer for MetadataAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn display_name(&self) -> &str {
        Self::DISPLAY_NAME
    }

    async fn analyze(&self, input: &TaskInput) -> Result<StepResult> {
        let bytes = match tokio::fs::read(&input.image_ref).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound || input.is_remote() => {
                debug!(image = %input.image_ref, "No local file for metadata analysis");
                return Ok(Self::error_result(
                    "file_not_found",
                    format!("Image file not found: {}", input.image_ref),
                ));
            }
            Err(e) => {
                warn!(image = %input.image_ref, error = %e, "Could not read image file");
                return Ok(Self::error_result("unexpected_error", e.to_string()));
            }
        };

        let file_report = FileReport::inspect(&bytes);
        let generator_report = GeneratorReport::from_file_report(&file_report);

        info!(
            format = ?file_report.image_format,
            text_chunks = file_report.png_info.len(),
            exif_tags = file_report.exif_data.len(),
            generator = ?generator_report.generator,
            "Metadata extracted"
        );

        Ok(StepResult::new(
            Self::NAME,
            json!({
                "status": "success",
                "analysis_type": "metadata_extraction",
                "generator_report": generator_report,
                "file_system_report": file_report,
            }),
        ))
    }
}

fn format_name(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "PNG",
        ImageFormat::Jpeg => "JPEG",
        ImageFormat::Gif => "GIF",
        ImageFormat::WebP => "WEBP",
        ImageFormat::Bmp => "BMP",
        ImageFormat::Tiff => "TIFF",
        _ => "UNKNOWN",
    }
}

/// Width and height from the format's own header decoder
fn read_dimensions(bytes: &[u8]) -> Option<ImageSize> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;

    match reader.into_dimensions() {
        Ok((width, height)) => Some(ImageSize { width, height }),
        Err(e) => {
            debug!(error = %e, "Could not read image dimensions");
            None
        }
    }
}

fn parse_png(bytes: &[u8], report: &mut FileReport) {
    let mut pos = PNG_SIGNATURE_LEN;

    while let (Some(len), Some(kind)) = (be_u32(bytes, pos), bytes.get(pos + 4..pos + 8)) {
        let start = pos + 8;
        let Some(data) = start
            .checked_add(len as usize)
            .and_then(|end| bytes.get(start..end))
        else {
            debug!(offset = pos, "Truncated PNG chunk");
            break;
        };

        match kind {
            b"tEXt" => {
                if let Some((key, value)) = split_nul(data) {
                    report.png_info.insert(latin1(key), truncate(&latin1(value)));
                }
            }
            b"zTXt" => {
                if let Some((key, _)) = split_nul(data) {
                    report.png_info.insert(latin1(key), "<compressed>".to_string());
                }
            }
            b"iTXt" => {
                if let Some((key, value)) = parse_itxt(data) {
                    report.png_info.insert(key, value);
                }
            }
            b"eXIf" => parse_exif(data, report),
            b"IEND" => break,
            _ => {}
        }

        // data + CRC
        pos = start + data.len() + 4;
    }
}

/// `keyword\0 flag method language\0 translated\0 text`
fn parse_itxt(data: &[u8]) -> Option<(String, String)> {
    let (key, rest) = split_nul(data)?;
    let compressed = *rest.first()? == 1;
    let (_language, rest) = split_nul(rest.get(2..)?)?;
    let (_translated, text) = split_nul(rest)?;

    let value = if compressed {
        "<compressed>".to_string()
    } else {
        truncate(&String::from_utf8_lossy(text))
    };
    Some((latin1(key), value))
}

fn parse_jpeg(bytes: &[u8], report: &mut FileReport) {
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            break;
        }
        let marker = bytes[pos + 1];
        match marker {
            0xFF => {
                pos += 1;
                continue;
            }
            0x01 | 0xD0..=0xD8 => {
                pos += 2;
                continue;
            }
            // Start of scan or end of image: no more metadata
            0xDA | 0xD9 => break,
            _ => {}
        }

        let Some(seg_len) = be_u16(bytes, pos + 2).map(usize::from).filter(|l| *l >= 2) else {
            break;
        };
        let Some(data) = bytes.get(pos + 4..pos + 2 + seg_len) else {
            debug!(offset = pos, "Truncated JPEG segment");
            break;
        };

        match marker {
            0xE1 if data.starts_with(EXIF_HEADER) => parse_exif(&data[EXIF_HEADER.len()..], report),
            0xE1 if data.starts_with(XMP_HEADER) => report.xmp_present = true,
            0xFE => report.comment = Some(truncate(&latin1(data))),
            _ => {}
        }

        pos += 2 + seg_len;
    }
}

/// TIFF-structured EXIF block
struct Tiff<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let little_endian = match data.get(0..2)? {
            b"II" => true,
            b"MM" => false,
            _ => return None,
        };
        Some(Self {
            data,
            little_endian,
        })
    }

    fn u16(&self, at: usize) -> Option<u16> {
        if self.little_endian {
            le_u16(self.data, at)
        } else {
            be_u16(self.data, at)
        }
    }

    fn u32(&self, at: usize) -> Option<u32> {
        let b = self.data.get(at..at + 4)?;
        let b = [b[0], b[1], b[2], b[3]];
        Some(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    /// Read the ASCII/UNDEFINED tags of one IFD; returns the EXIF sub-IFD offset.
    fn read_ifd(&self, offset: usize, out: &mut BTreeMap<String, String>) -> Option<usize> {
        let count = (self.u16(offset)? as usize).min(MAX_IFD_ENTRIES);
        let mut exif_ifd = None;

        for i in 0..count {
            let entry = offset + 2 + i * 12;
            let (Some(tag), Some(kind), Some(len)) =
                (self.u16(entry), self.u16(entry + 2), self.u32(entry + 4))
            else {
                break;
            };
            let len = len as usize;

            if tag == EXIF_IFD_POINTER {
                exif_ifd = self.u32(entry + 8).map(|o| o as usize);
                continue;
            }
            let Some((_, name)) = EXIF_TAGS.iter().find(|(t, _)| *t == tag) else {
                continue;
            };
            // 2 = ASCII, 7 = UNDEFINED
            if kind != 2 && kind != 7 {
                continue;
            }

            let raw = if len <= 4 {
                self.data.get(entry + 8..entry + 8 + len)
            } else {
                self.u32(entry + 8)
                    .and_then(|o| self.data.get(o as usize..(o as usize).checked_add(len)?))
            };
            let Some(mut raw) = raw else {
                continue;
            };
            // UserComment starts with an 8 byte character code
            if kind == 7 {
                raw = raw.get(8..).unwrap_or_default();
            }

            let value = latin1(raw).trim_end_matches('\0').trim().to_string();
            if !value.is_empty() {
                out.insert(name.to_string(), truncate(&value));
            }
        }

        exif_ifd
    }
}

fn parse_exif(data: &[u8], report: &mut FileReport) {
    let Some(tiff) = Tiff::new(data) else {
        debug!("EXIF block without TIFF header");
        return;
    };
    let Some(ifd0) = tiff.u32(4) else {
        return;
    };

    if let Some(sub_ifd) = tiff.read_ifd(ifd0 as usize, &mut report.exif_data) {
        tiff.read_ifd(sub_ifd, &mut report.exif_data);
    }
}

fn split_nul(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let idx = data.iter().position(|&b| b == 0)?;
    Some((&data[..idx], &data[idx + 1..]))
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_VALUE_CHARS {
        value.to_string()
    } else {
        let mut cut: String = value.chars().take(MAX_VALUE_CHARS).collect();
        cut.push_str("...");
        cut
    }
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}
