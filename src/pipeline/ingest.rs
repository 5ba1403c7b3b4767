//! Attachment normalisation: uploaded files → uniform image payloads.
//!
//! Every accepted upload ends up as one or more [`AttachmentPayload`]s —
//! a decoded bitmap kept for preview plus lossless PNG bytes for
//! transmission. Raster images map one-to-one; PDFs are rasterised into
//! one payload per page (page identity is not preserved — every page gets
//! the same generic label, an accepted information loss).
//!
//! Unsupported or undecodable files are skipped with an
//! [`IngestionWarning`]; a bad file never aborts the batch.
//!
//! ## Why spawn_blocking?
//!
//! pdfium wraps a C++ library with thread-local state that is not safe to
//! call from async contexts. `tokio::task::spawn_blocking` moves the
//! rasterisation onto the blocking thread pool so Tokio worker threads
//! never stall on CPU-heavy rendering.

use crate::config::DiagnosisConfig;
use crate::error::IngestionWarning;
use crate::pipeline::encode;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info, warn};

/// Source label attached to every rasterised PDF page.
pub const PDF_PAGE_LABEL: &str = "pdf page";

/// One uploaded file, as received from the intake surface.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Original filename as supplied by the client.
    pub filename: String,
    /// Content type declared by the client, if any.
    pub declared_mime: Option<String>,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// A normalised attachment ready for transmission.
pub struct AttachmentPayload {
    /// Decoded bitmap, kept for preview rendering.
    pub display_image: DynamicImage,
    /// Lossless PNG re-encoding of the bitmap, sent to the model.
    pub png_bytes: Vec<u8>,
    /// Original filename, or [`PDF_PAGE_LABEL`] for PDF pages.
    pub source_label: String,
}

/// The result of normalising one batch of uploads.
pub struct IngestOutcome {
    /// Payloads in upload order (PDF pages in page order).
    pub attachments: Vec<AttachmentPayload>,
    /// One warning per skipped file.
    pub warnings: Vec<IngestionWarning>,
}

/// Resolve the effective MIME type of an upload.
///
/// The filename extension wins (it is what the user sees); the
/// client-declared content type is the fallback for extensionless names.
pub fn resolve_mime(filename: &str, declared: Option<&str>) -> Option<String> {
    mime_guess::from_path(filename)
        .first_raw()
        .map(str::to_string)
        .or_else(|| declared.map(str::to_string))
}

/// Normalise a batch of uploads into attachment payloads.
///
/// Accepted inputs: `image/png`, `image/jpeg` rasters and
/// `application/pdf` documents. Everything else is skipped with a
/// warning. After normalisation, every payload's PNG bytes are staged to
/// `config.staging_dir` for audit; staging failures are logged and
/// ignored.
pub async fn normalize_uploads(
    files: Vec<UploadedFile>,
    config: &DiagnosisConfig,
) -> IngestOutcome {
    let mut attachments = Vec::new();
    let mut warnings = Vec::new();

    for file in files {
        let mime = match resolve_mime(&file.filename, file.declared_mime.as_deref()) {
            Some(m) => m,
            None => {
                warnings.push(IngestionWarning::UnsupportedType {
                    file: file.filename.clone(),
                    mime: "unknown".into(),
                });
                continue;
            }
        };

        match mime.as_str() {
            "image/png" | "image/jpeg" | "image/jpg" => {
                match decode_raster(&file.filename, &file.bytes) {
                    Ok(payload) => attachments.push(payload),
                    Err(w) => warnings.push(w),
                }
            }
            "application/pdf" => {
                match rasterize_pdf(
                    file.bytes,
                    config.max_pdf_pages,
                    config.max_rendered_pixels,
                )
                .await
                {
                    Ok(pages) => {
                        info!("Rasterised '{}' into {} pages", file.filename, pages.len());
                        for page in pages {
                            match payload_from_bitmap(page, PDF_PAGE_LABEL) {
                                Ok(payload) => attachments.push(payload),
                                Err(detail) => warnings.push(IngestionWarning::PdfRenderFailed {
                                    file: file.filename.clone(),
                                    detail,
                                }),
                            }
                        }
                    }
                    Err(detail) => warnings.push(IngestionWarning::PdfRenderFailed {
                        file: file.filename.clone(),
                        detail,
                    }),
                }
            }
            other => warnings.push(IngestionWarning::UnsupportedType {
                file: file.filename.clone(),
                mime: other.to_string(),
            }),
        }
    }

    stage_attachments(&config.staging_dir, &attachments).await;

    IngestOutcome {
        attachments,
        warnings,
    }
}

/// Decode a raster upload and re-encode it as PNG.
fn decode_raster(filename: &str, bytes: &[u8]) -> Result<AttachmentPayload, IngestionWarning> {
    let image = image::load_from_memory(bytes).map_err(|e| IngestionWarning::Undecodable {
        file: filename.to_string(),
        detail: e.to_string(),
    })?;
    payload_from_bitmap(image, filename).map_err(|detail| IngestionWarning::Undecodable {
        file: filename.to_string(),
        detail,
    })
}

fn payload_from_bitmap(image: DynamicImage, label: &str) -> Result<AttachmentPayload, String> {
    let png = encode::png_bytes(&image).map_err(|e| e.to_string())?;
    Ok(AttachmentPayload {
        display_image: image,
        png_bytes: png,
        source_label: label.to_string(),
    })
}

/// Rasterise a PDF into one bitmap per page, capped at `max_pages`.
async fn rasterize_pdf(
    bytes: Vec<u8>,
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, String> {
    tokio::task::spawn_blocking(move || rasterize_pdf_blocking(&bytes, max_pages, max_pixels))
        .await
        .map_err(|e| format!("rasterisation task panicked: {e}"))?
}

/// Blocking implementation of PDF rasterisation.
fn rasterize_pdf_blocking(
    bytes: &[u8],
    max_pages: usize,
    max_pixels: u32,
) -> Result<Vec<DynamicImage>, String> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, None)
        .map_err(|e| format!("{e:?}"))?;

    let pages = document.pages();
    let total = pages.len() as usize;
    if total > max_pages {
        warn!("PDF has {total} pages; only the first {max_pages} are analysed");
    }

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut bitmaps = Vec::with_capacity(total.min(max_pages));
    for idx in 0..total.min(max_pages) {
        let page = pages.get(idx as u16).map_err(|e| format!("{e:?}"))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("{e:?}"))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        bitmaps.push(image);
    }

    Ok(bitmaps)
}

/// Persist every payload's transmissible bytes to the staging directory.
///
/// Audit/debug side effect only: failures are logged at WARN and do not
/// affect the request.
async fn stage_attachments(staging_dir: &Path, attachments: &[AttachmentPayload]) {
    if attachments.is_empty() {
        return;
    }
    if let Err(e) = tokio::fs::create_dir_all(staging_dir).await {
        warn!("Could not create staging dir {}: {e}", staging_dir.display());
        return;
    }

    let batch = uuid::Uuid::new_v4();
    for (idx, attachment) in attachments.iter().enumerate() {
        let name = format!(
            "{batch}-{idx:02}-{}.png",
            sanitize_label(&attachment.source_label)
        );
        let path = staging_dir.join(name);
        if let Err(e) = tokio::fs::write(&path, &attachment.png_bytes).await {
            warn!("Could not stage attachment to {}: {e}", path.display());
        }
    }
}

/// Reduce a source label to filesystem-safe characters.
fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagnosisConfig;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn test_config(staging: &Path) -> DiagnosisConfig {
        DiagnosisConfig::builder()
            .api_key("test-key")
            .staging_dir(staging)
            .build()
            .unwrap()
    }

    fn png_fixture() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([0, 128, 255, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn mime_resolution_prefers_extension() {
        assert_eq!(resolve_mime("scan.png", None).as_deref(), Some("image/png"));
        assert_eq!(
            resolve_mime("scan.jpg", None).as_deref(),
            Some("image/jpeg")
        );
        assert_eq!(
            resolve_mime("report.pdf", Some("application/octet-stream")).as_deref(),
            Some("application/pdf")
        );
        assert_eq!(
            resolve_mime("notes.txt", None).as_deref(),
            Some("text/plain")
        );
    }

    #[test]
    fn mime_resolution_falls_back_to_declared_type() {
        assert_eq!(
            resolve_mime("upload", Some("image/png")).as_deref(),
            Some("image/png")
        );
        assert_eq!(resolve_mime("upload", None), None);
    }

    #[test]
    fn labels_are_sanitized_for_staging() {
        assert_eq!(sanitize_label("pdf page"), "pdf_page");
        assert_eq!(sanitize_label("x-ray (left).png"), "x-ray__left_.png");
    }

    #[tokio::test]
    async fn valid_png_becomes_a_payload() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let outcome = normalize_uploads(
            vec![UploadedFile {
                filename: "scan.png".into(),
                declared_mime: Some("image/png".into()),
                bytes: png_fixture(),
            }],
            &config,
        )
        .await;

        assert_eq!(outcome.attachments.len(), 1);
        assert!(outcome.warnings.is_empty());
        let payload = &outcome.attachments[0];
        assert_eq!(payload.source_label, "scan.png");
        assert_eq!(payload.display_image.width(), 8);
        assert_eq!(&payload.png_bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn unsupported_type_is_skipped_without_blocking_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let outcome = normalize_uploads(
            vec![
                UploadedFile {
                    filename: "notes.txt".into(),
                    declared_mime: Some("text/plain".into()),
                    bytes: b"not an image".to_vec(),
                },
                UploadedFile {
                    filename: "scan.png".into(),
                    declared_mime: None,
                    bytes: png_fixture(),
                },
            ],
            &config,
        )
        .await;

        assert_eq!(outcome.attachments.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            IngestionWarning::UnsupportedType { .. }
        ));
    }

    #[tokio::test]
    async fn undecodable_image_is_skipped_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        let outcome = normalize_uploads(
            vec![UploadedFile {
                filename: "broken.png".into(),
                declared_mime: Some("image/png".into()),
                bytes: vec![0xDE, 0xAD, 0xBE, 0xEF],
            }],
            &config,
        )
        .await;

        assert!(outcome.attachments.is_empty());
        assert!(matches!(
            outcome.warnings[0],
            IngestionWarning::Undecodable { .. }
        ));
    }

    #[tokio::test]
    async fn payloads_are_staged_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());

        normalize_uploads(
            vec![UploadedFile {
                filename: "scan.png".into(),
                declared_mime: None,
                bytes: png_fixture(),
            }],
            &config,
        )
        .await;

        let staged: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(staged.len(), 1);
        let name = staged[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().ends_with("scan.png.png"));
    }
}
