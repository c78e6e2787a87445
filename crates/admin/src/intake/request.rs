//! Catalog intake input: the three mutually exclusive ways to ask for a
//! product record.

use std::path::{Path, PathBuf};

use preco_real_core::IntakePayload;
use serde::Deserialize;

use crate::error::ConsoleError;

pub const NO_INPUT_MESSAGE: &str = "Por favor, forneça um texto, categoria ou imagem.";
pub const AMBIGUOUS_INPUT_MESSAGE: &str =
    "Por favor, forneça apenas uma entrada: texto, categoria ou imagem.";

/// Where an uploaded image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Path(PathBuf),
    Bytes { file_name: String, bytes: Vec<u8> },
}

impl ImageSource {
    #[must_use]
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            bytes,
        }
    }

    async fn read(self) -> Result<ImageFile, ConsoleError> {
        let (file_name, bytes) = match self {
            Self::Path(path) => {
                let bytes = tokio::fs::read(&path)
                    .await
                    .map_err(|e| ConsoleError::Read(format!("{}: {e}", path.display())))?;
                let file_name = path
                    .file_name()
                    .map_or_else(|| "imagem".to_string(), |n| n.to_string_lossy().into_owned());
                (file_name, bytes)
            }
            Self::Bytes { file_name, bytes } => (file_name, bytes),
        };
        if bytes.is_empty() {
            return Err(ConsoleError::Read("arquivo vazio".to_string()));
        }
        Ok(ImageFile {
            content_type: content_type(&file_name),
            file_name,
            bytes,
        })
    }
}

/// A fully read photo, ready to be sent as the multipart `file` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

fn content_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

/// What is sent to `POST /api/agents/catalog-intake`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeBody {
    /// JSON body for text and category queries
    Query(IntakePayload),
    /// Multipart body with a single `file` part
    Image(ImageFile),
}

/// A validated intake request. Exactly one input by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionRequest {
    TextQuery(String),
    CategoryQuery(String),
    ImageUpload(ImageSource),
}

impl IngestionRequest {
    /// Short label for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TextQuery(_) => "text",
            Self::CategoryQuery(_) => "category",
            Self::ImageUpload(_) => "image",
        }
    }

    /// Build the outbound body, reading the whole image if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Read`] if the image cannot be read or is empty.
    pub async fn into_body(self) -> Result<IntakeBody, ConsoleError> {
        let body = match self {
            Self::TextQuery(text) => IntakeBody::Query(IntakePayload {
                text_query: Some(text),
                ..IntakePayload::default()
            }),
            Self::CategoryQuery(category) => IntakeBody::Query(IntakePayload {
                category_query: Some(category),
                ..IntakePayload::default()
            }),
            Self::ImageUpload(source) => IntakeBody::Image(source.read().await?),
        };
        Ok(body)
    }
}

/// The intake form's inputs.
///
/// The setters keep the inputs mutually exclusive: choosing one clears the
/// other two.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IntakeFields {
    #[serde(default)]
    text_query: Option<String>,
    #[serde(default)]
    category_query: Option<String>,
    #[serde(skip)]
    image: Option<ImageSource>,
}

impl IntakeFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        *self = Self {
            text_query: Some(text.into()),
            ..Self::default()
        };
        self
    }

    pub fn set_category(&mut self, category: impl Into<String>) -> &mut Self {
        *self = Self {
            category_query: Some(category.into()),
            ..Self::default()
        };
        self
    }

    pub fn set_image(&mut self, image: ImageSource) -> &mut Self {
        *self = Self {
            image: Some(image),
            ..Self::default()
        };
        self
    }

    /// Validate into a request.
    ///
    /// Blank text counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Validation`] when no input or more than one
    /// input is populated.
    pub fn to_request(&self) -> Result<IngestionRequest, ConsoleError> {
        let text = filled(self.text_query.as_deref());
        let category = filled(self.category_query.as_deref());

        match (text, category, &self.image) {
            (Some(text), None, None) => Ok(IngestionRequest::TextQuery(text)),
            (None, Some(category), None) => Ok(IngestionRequest::CategoryQuery(category)),
            (None, None, Some(image)) => Ok(IngestionRequest::ImageUpload(image.clone())),
            (None, None, None) => Err(ConsoleError::Validation(NO_INPUT_MESSAGE.to_string())),
            _ => Err(ConsoleError::Validation(AMBIGUOUS_INPUT_MESSAGE.to_string())),
        }
    }
}

fn filled(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
