//! Tesseract command-line engine.

use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use image::{ImageFormat, RgbImage};

use super::{parse_hocr, OcrEngine, OcrWord};
use crate::error::{Error, Result};
use crate::pipeline::OcrOptions;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// OCR through the `tesseract` executable, one process per page.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    options: OcrOptions,
}

impl TesseractEngine {
    pub fn new(options: OcrOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &OcrOptions {
        &self.options
    }

    /// Check whether the configured executable can be launched.
    pub fn is_available(&self) -> bool {
        Command::new(&self.options.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn command(&self, input: &Path, output_base: &Path, dpi: u32) -> Command {
        let mut cmd = Command::new(&self.options.binary);
        cmd.arg(input)
            .arg(output_base)
            .arg("-l")
            .arg(&self.options.language)
            .arg("--oem")
            .arg(self.options.oem.to_string())
            .arg("--psm")
            .arg(self.options.psm.to_string())
            .arg("--dpi")
            .arg(dpi.to_string())
            .arg("-c")
            .arg("hocr_font_info=1")
            .arg("hocr")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Run tesseract, killing it once the time budget is spent.
    fn run(&self, mut cmd: Command) -> Result<()> {
        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::Ocr(format!(
                "tesseract executable not found: {}",
                self.options.binary.display()
            )),
            _ => Error::Io(e),
        })?;

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                if status.success() {
                    return Ok(());
                }
                return Err(Error::Ocr(format!("tesseract exited with {}", status)));
            }
            if started.elapsed() >= self.options.timeout {
                // the process may have exited in the meantime
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::OcrTimeout(self.options.timeout.as_secs()));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage, dpi: u32) -> Result<Vec<OcrWord>> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("page.png");
        let output_base = workdir.path().join("page");
        image.save_with_format(&input, ImageFormat::Png)?;

        self.run(self.command(&input, &output_base, dpi))?;

        let hocr_path = output_base.with_extension("hocr");
        let hocr = std::fs::read_to_string(&hocr_path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::Ocr("tesseract produced no hOCR output".to_string()),
            _ => Error::Io(e),
        })?;
        let words = parse_hocr(&hocr)?;
        log::debug!("tesseract recognized {} words at {} dpi", words.len(), dpi);
        Ok(words)
    }
}
