use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::Path;

/// Errors raised while accepting an uploaded image.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("file has no extension")]
    MissingExtension,

    #[error("unsupported file type: .{0} (expected jpg, jpeg or png)")]
    UnsupportedExtension(String),

    #[error("file content is not a JPEG or PNG image")]
    UnsupportedFormat,

    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("malformed image data URI")]
    InvalidDataUri,

    #[error("image is {size} bytes, over the {limit} byte upload limit")]
    TooLarge { size: usize, limit: usize },
}

/// Image encodings the uploader accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Maps a file extension (case insensitive) to a format.
    pub fn from_extension(extension: &str) -> Result<Self, ImageError> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            other => Err(ImageError::UnsupportedExtension(other.to_string())),
        }
    }

    pub fn from_mime_type(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    fn sniff(bytes: &[u8]) -> Result<Self, ImageError> {
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Jpeg) => Ok(Self::Jpeg),
            Ok(image::ImageFormat::Png) => Ok(Self::Png),
            _ => Err(ImageError::UnsupportedFormat),
        }
    }

    fn codec(&self) -> image::ImageFormat {
        match self {
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Png => image::ImageFormat::Png,
        }
    }
}

/// An uploaded picture that decoded successfully.
///
/// The original bytes are kept untouched and forwarded as-is; decoding only
/// proves they form a valid bitmap and yields its dimensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl UploadedImage {
    /// Accepts an upload named `file_name`, filtering on its extension first.
    pub fn from_upload(file_name: &str, bytes: Vec<u8>) -> Result<Self, ImageError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or(ImageError::MissingExtension)?;
        ImageFormat::from_extension(extension)?;

        Self::decode(bytes)
    }

    /// Decodes raw bytes, detecting JPEG or PNG from the content.
    pub fn decode(bytes: Vec<u8>) -> Result<Self, ImageError> {
        let format = ImageFormat::sniff(&bytes)?;
        let bitmap = image::load_from_memory_with_format(&bytes, format.codec())?;

        Ok(Self {
            width: bitmap.width(),
            height: bitmap.height(),
            bytes,
            format,
        })
    }

    /// Parses a `data:image/...;base64,` URI produced by [`Self::to_data_uri`].
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let (header, payload) = uri
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(','))
            .ok_or(ImageError::InvalidDataUri)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(ImageError::InvalidDataUri)?;
        if ImageFormat::from_mime_type(mime_type).is_none() {
            return Err(ImageError::UnsupportedFormat);
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|_| ImageError::InvalidDataUri)?;

        Self::decode(bytes)
    }

    pub fn to_data_uri(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.format.mime_type(),
            self.to_base64()
        )
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Decoded `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
