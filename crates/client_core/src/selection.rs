//! Local image selection: validation, preview derivation and reading picked
//! files from disk.

use std::{path::Path, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::{
    domain::{IMAGE_MIME_PREFIX, MAX_IMAGE_BYTES},
    error::WorkflowError,
};

const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Checks run before a file is accepted, in this order.
pub fn validate_candidate(name: &str, mime_type: &str, size: u64) -> Result<(), WorkflowError> {
    if !mime_type.starts_with(IMAGE_MIME_PREFIX) {
        return Err(WorkflowError::InvalidType {
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
    }
    if size > MAX_IMAGE_BYTES {
        return Err(WorkflowError::too_large(name, size));
    }
    Ok(())
}

/// `data:` URI rendering of a selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewData(String);

impl PreviewData {
    pub fn from_file(file: &ImageFile) -> Self {
        Self(format!(
            "data:{};base64,{}",
            file.mime_type(),
            STANDARD.encode(file.bytes())
        ))
    }

    pub fn as_data_uri(&self) -> &str {
        &self.0
    }
}

/// A validated file together with its preview; the two never exist apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    file: ImageFile,
    preview: PreviewData,
}

impl SelectedImage {
    pub fn new(file: ImageFile) -> Result<Self, WorkflowError> {
        validate_candidate(file.name(), file.mime_type(), file.size())?;
        let preview = PreviewData::from_file(&file);
        Ok(Self { file, preview })
    }

    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn preview(&self) -> &PreviewData {
        &self.preview
    }
}

pub fn guess_mime_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string())
}

/// Reads a picked file. Type and size are checked against filesystem
/// metadata before the body is read.
pub async fn read_image_file(path: &Path) -> Result<ImageFile, WorkflowError> {
    let unreadable = |err: std::io::Error| WorkflowError::Unreadable {
        path: path.display().to_string(),
        reason: err.to_string(),
    };

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = guess_mime_type(path);
    let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Err(WorkflowError::Unreadable {
            path: path.display().to_string(),
            reason: "not a regular file".into(),
        });
    }
    validate_candidate(&name, &mime_type, metadata.len())?;

    let bytes = tokio::fs::read(path).await.map_err(unreadable)?;
    Ok(ImageFile::new(name, mime_type, bytes))
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
