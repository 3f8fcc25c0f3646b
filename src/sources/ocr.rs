//! OCR engines.

use std::io::{Cursor, Write};
use std::process::{Command, Stdio};

use image::{DynamicImage, ImageFormat};

use crate::error::OcrError;
use crate::models::OcrConfig;

/// Extracts text from a decoded image.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Recognise text in the image; may return an empty string.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// OCR via the `tesseract` command-line tool.
///
/// The image is PNG-encoded in memory and piped through `tesseract stdin stdout`.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    language: String,
}

impl TesseractOcr {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
        }
    }

    pub fn check_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    pub fn install_instructions(&self) -> &str {
        "Install tesseract: apt install tesseract-ocr (Debian/Ubuntu) or brew install tesseract (macOS)"
    }
}

impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| OcrError::EncodeError(e.to_string()))?;

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    OcrError::CommandNotFound(format!(
                        "{}. {}",
                        self.command,
                        self.install_instructions()
                    ))
                } else {
                    OcrError::ExecutionError(e.to_string())
                }
            })?;

        // stdin is dropped at the end of this block so tesseract sees EOF
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&png)
                .map_err(|e| OcrError::ExecutionError(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| OcrError::ExecutionError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ExecutionError(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
