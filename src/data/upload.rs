//! Multipart upload spooling.
//!
//! The uploaded file is streamed into a named temporary file that lives only
//! as long as its `SpooledFile` owner. Reading it consumes the owner, so the
//! file is removed once the read finishes, on success and on error alike.

use axum::extract::Multipart;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::constants::schema::FILE_PART;
use crate::error::NormalizeError;

#[derive(Debug)]
pub struct SpooledFile {
    file: NamedTempFile,
    pub filename: Option<String>,
    pub size: usize,
}

impl SpooledFile {
    pub fn create(filename: Option<String>) -> std::io::Result<Self> {
        let file = tempfile::Builder::new().prefix("upload-").tempfile()?;
        Ok(Self {
            file,
            filename,
            size: 0,
        })
    }

    pub fn from_bytes(bytes: &[u8], filename: Option<String>) -> std::io::Result<Self> {
        let mut spooled = Self::create(filename)?;
        spooled.append(bytes)?;
        Ok(spooled)
    }

    pub fn append(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.file.write_all(chunk)?;
        self.size += chunk.len();
        Ok(())
    }

    pub fn path(&self) -> &std::path::Path {
        self.file.path()
    }

    /// Read the whole file as UTF-8 and release the temporary storage.
    pub fn read_to_string(mut self) -> Result<String, NormalizeError> {
        self.file
            .flush()
            .map_err(|e| NormalizeError::Upload(e.to_string()))?;

        let mut bytes = Vec::with_capacity(self.size);
        {
            let mut handle = self
                .file
                .reopen()
                .map_err(|e| NormalizeError::Upload(e.to_string()))?;
            handle
                .read_to_end(&mut bytes)
                .map_err(|e| NormalizeError::Upload(e.to_string()))?;
        }

        debug!("[UPLOAD] Read {} bytes from spooled upload", bytes.len());
        String::from_utf8(bytes).map_err(|_| NormalizeError::Upload("file is not valid UTF-8 text".to_string()))
        // `self` drops here and the temp file is deleted
    }
}

/// A parsed multipart form: the spooled file part plus any text parts.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<SpooledFile>,
    pub fields: BTreeMap<String, String>,
}

/// Drain a multipart stream, spooling the `file` part to temporary storage.
///
/// The first part named `file` (or, failing that, the first part carrying a
/// filename) is the upload; other parts are collected as text fields.
pub async fn spool_multipart(mut multipart: Multipart, max_upload_bytes: usize) -> Result<UploadForm, NormalizeError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| NormalizeError::Upload(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let is_file = name == FILE_PART || filename.is_some();

        if !is_file || form.file.is_some() {
            if is_file {
                warn!("[UPLOAD] Ignoring extra file part '{}'", name);
                continue;
            }
            let value = field
                .text()
                .await
                .map_err(|e| NormalizeError::Upload(e.body_text()))?;
            form.fields.insert(name, value);
            continue;
        }

        let mut spooled = SpooledFile::create(filename).map_err(|e| NormalizeError::Upload(e.to_string()))?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| NormalizeError::Upload(e.body_text()))?
        {
            if spooled.size + chunk.len() > max_upload_bytes {
                return Err(NormalizeError::Upload(format!(
                    "file exceeds the {} byte upload limit",
                    max_upload_bytes
                )));
            }
            spooled
                .append(&chunk)
                .map_err(|e| NormalizeError::Upload(e.to_string()))?;
        }

        info!(
            "📁 [UPLOAD] Spooled {} ({} bytes)",
            spooled.filename.as_deref().unwrap_or("<unnamed>"),
            spooled.size
        );
        form.file = Some(spooled);
    }

    Ok(form)
}
