//! The static format catalog: supported target formats, their grouping into
//! categories, and the format → MIME table.
//!
//! Everything here is defined at compile time and never mutated. The catalog
//! is intentionally closed — [`TargetFormat`] enumerates exactly what the
//! remote service is asked to produce — while the MIME lookup also accepts
//! arbitrary tokens and falls back to `application/octet-stream` so an
//! out-of-catalog token degrades to a generic binary download instead of an
//! error.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generic binary MIME type used when no specific mapping exists.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Category grouping for the format picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatCategory {
    Documents,
    Images,
    Audio,
}

impl FormatCategory {
    /// All categories, in display order.
    pub const ALL: [FormatCategory; 3] = [
        FormatCategory::Documents,
        FormatCategory::Images,
        FormatCategory::Audio,
    ];

    /// The ordered list of target formats in this category.
    pub fn formats(self) -> &'static [TargetFormat] {
        match self {
            FormatCategory::Documents => {
                &[TargetFormat::Pdf, TargetFormat::Docx, TargetFormat::Txt]
            }
            FormatCategory::Images => &[
                TargetFormat::Jpg,
                TargetFormat::Png,
                TargetFormat::Svg,
                TargetFormat::Webp,
            ],
            FormatCategory::Audio => &[TargetFormat::Mp3, TargetFormat::Wav, TargetFormat::Ogg],
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            FormatCategory::Documents => "Documents",
            FormatCategory::Images => "Images",
            FormatCategory::Audio => "Audio",
        }
    }
}

/// A target output format the remote service can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetFormat {
    Pdf,
    Docx,
    Txt,
    Jpg,
    Png,
    Svg,
    Webp,
    Mp3,
    Wav,
    Ogg,
}

impl TargetFormat {
    /// The lowercase wire token sent to the service as `outputformat`,
    /// doubling as the file extension of the converted result.
    pub fn token(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
            TargetFormat::Docx => "docx",
            TargetFormat::Txt => "txt",
            TargetFormat::Jpg => "jpg",
            TargetFormat::Png => "png",
            TargetFormat::Svg => "svg",
            TargetFormat::Webp => "webp",
            TargetFormat::Mp3 => "mp3",
            TargetFormat::Wav => "wav",
            TargetFormat::Ogg => "ogg",
        }
    }

    /// Case-insensitive parse of a format token. Accepts the `jpeg` alias.
    /// Returns `None` for tokens outside the catalog.
    pub fn from_token(token: &str) -> Option<TargetFormat> {
        match token.to_ascii_lowercase().as_str() {
            "pdf" => Some(TargetFormat::Pdf),
            "docx" => Some(TargetFormat::Docx),
            "txt" => Some(TargetFormat::Txt),
            "jpg" | "jpeg" => Some(TargetFormat::Jpg),
            "png" => Some(TargetFormat::Png),
            "svg" => Some(TargetFormat::Svg),
            "webp" => Some(TargetFormat::Webp),
            "mp3" => Some(TargetFormat::Mp3),
            "wav" => Some(TargetFormat::Wav),
            "ogg" => Some(TargetFormat::Ogg),
            _ => None,
        }
    }

    /// The MIME type of a converted file in this format. Total over the
    /// catalog — never the generic binary type.
    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            TargetFormat::Txt => "text/plain",
            TargetFormat::Jpg => "image/jpeg",
            TargetFormat::Png => "image/png",
            TargetFormat::Svg => "image/svg+xml",
            TargetFormat::Webp => "image/webp",
            TargetFormat::Mp3 => "audio/mpeg",
            TargetFormat::Wav => "audio/wav",
            TargetFormat::Ogg => "audio/ogg",
        }
    }

    /// The category this format belongs to.
    pub fn category(self) -> FormatCategory {
        match self {
            TargetFormat::Pdf | TargetFormat::Docx | TargetFormat::Txt => FormatCategory::Documents,
            TargetFormat::Jpg | TargetFormat::Png | TargetFormat::Svg | TargetFormat::Webp => {
                FormatCategory::Images
            }
            TargetFormat::Mp3 | TargetFormat::Wav | TargetFormat::Ogg => FormatCategory::Audio,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// MIME type for an arbitrary format token, case-insensitive.
///
/// Tokens in the catalog (plus the `jpeg` alias) resolve to their specific
/// type; anything else resolves to [`OCTET_STREAM`] rather than failing.
pub fn mime_for_token(token: &str) -> &'static str {
    TargetFormat::from_token(token)
        .map(TargetFormat::mime_type)
        .unwrap_or(OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_mime_map_is_total_and_specific() {
        for category in FormatCategory::ALL {
            for &format in category.formats() {
                assert_ne!(
                    format.mime_type(),
                    OCTET_STREAM,
                    "{format} must map to a specific MIME type"
                );
                assert_eq!(format.category(), category);
            }
        }
    }

    #[test]
    fn token_round_trip() {
        for category in FormatCategory::ALL {
            for &format in category.formats() {
                assert_eq!(TargetFormat::from_token(format.token()), Some(format));
            }
        }
    }

    #[test]
    fn from_token_is_case_insensitive() {
        assert_eq!(TargetFormat::from_token("PDF"), Some(TargetFormat::Pdf));
        assert_eq!(TargetFormat::from_token("WebP"), Some(TargetFormat::Webp));
        assert_eq!(TargetFormat::from_token("JPEG"), Some(TargetFormat::Jpg));
    }

    #[test]
    fn unknown_tokens_fall_back_to_octet_stream() {
        assert_eq!(mime_for_token("xyz"), OCTET_STREAM);
        assert_eq!(mime_for_token(""), OCTET_STREAM);
        assert_eq!(mime_for_token("tar.gz"), OCTET_STREAM);
    }

    #[test]
    fn known_tokens_resolve_specifically() {
        assert_eq!(mime_for_token("pdf"), "application/pdf");
        assert_eq!(mime_for_token("jpeg"), "image/jpeg");
        assert_eq!(mime_for_token("OGG"), "audio/ogg");
    }

    #[test]
    fn category_sizes_match_catalog() {
        assert_eq!(FormatCategory::Documents.formats().len(), 3);
        assert_eq!(FormatCategory::Images.formats().len(), 4);
        assert_eq!(FormatCategory::Audio.formats().len(), 3);
    }
}
