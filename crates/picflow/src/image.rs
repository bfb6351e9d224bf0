// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Encoded image payloads.

use std::fmt::{self, Display, Formatter};

use bytes::Bytes;

/// The container format of an encoded image.
///
/// Format detection happens upstream; this crate only reads the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ImageFormat {
    /// JPEG.
    Jpeg,
    /// PNG.
    Png,
    /// GIF.
    Gif,
    /// Static WebP.
    WebP,
    /// Animated WebP.
    WebPAnimated,
    /// Windows bitmap.
    Bmp,
    /// Windows icon.
    Ico,
    /// HEIF/HEIC.
    Heif,
    /// AVIF.
    Avif,
    /// Digital negative.
    Dng,
    /// The payload was not recognized as an image, e.g. an HTML error page.
    Unknown,
}

impl ImageFormat {
    /// Returns `false` only for [`ImageFormat::Unknown`].
    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Returns the short lowercase name of the format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::WebP => "webp",
            Self::WebPAnimated => "webp_animated",
            Self::Bmp => "bmp",
            Self::Ico => "ico",
            Self::Heif => "heif",
            Self::Avif => "avif",
            Self::Dng => "dng",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for ImageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The encoded bytes of an image together with their detected format.
///
/// Cloning is cheap: the bytes are reference counted.
///
/// # Examples
///
/// ```
/// use picflow::{EncodedImage, ImageFormat};
///
/// let image = EncodedImage::new(vec![0xFF, 0xD8, 0xFF], ImageFormat::Jpeg);
/// assert_eq!(image.len(), 3);
/// assert!(image.format().is_known());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedImage {
    data: Bytes,
    format: ImageFormat,
}

impl EncodedImage {
    /// Creates an encoded image from its bytes and format.
    pub fn new(data: impl Into<Bytes>, format: ImageFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }

    /// Returns the encoded bytes.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the detected image format.
    #[must_use]
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Returns the size of the encoded bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no encoded bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
