//! PDF download and figure extraction for the Post-L3 reviewer (C8).
//!
//! Figure extraction parses the embedded raster images out of a PDF's
//! page resources and keeps only those at least `100x100` pixels, which
//! filters out icons and rule lines (§4.8, §9 open question — no
//! caption-proximity heuristic is attempted).

use crate::types::ExtractedImage;
use curator_common::errors::{PipelineError, Result};
use lopdf::{Document, Object};
use std::time::Duration;
use tracing::warn;

pub struct PdfFetcher {
    client: reqwest::Client,
}

impl PdfFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .expect("failed to build PDF fetch HTTP client");
        Self { client }
    }

    /// Up to 2 attempts with a 2s gap, per §4.8 step 1. Returns an error on
    /// exhaustion so the caller can count and skip the paper.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut last_err = None;
        for attempt in 0..2 {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            let call_start = std::time::Instant::now();
            let result = self.client.get(url).send().await;
            let ok = result.as_ref().map(|r| r.status().is_success()).unwrap_or(false);
            curator_common::metrics::record_external_call(
                "pdf_fetch",
                call_start.elapsed().as_secs_f64(),
                ok,
            );

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .bytes()
                        .await
                        .map(|b| b.to_vec())
                        .map_err(|e| PipelineError::TransientNetwork {
                            target: "pdf host".into(),
                            message: e.to_string(),
                        });
                }
                Ok(resp) => {
                    last_err = Some(PipelineError::TransientNetwork {
                        target: "pdf host".into(),
                        message: format!("status {}", resp.status()),
                    });
                }
                Err(e) => {
                    last_err = Some(PipelineError::TransientNetwork {
                        target: "pdf host".into(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Err(last_err.unwrap_or_else(|| PipelineError::fatal("pdf fetch", "no attempts made")))
    }
}

/// Extracts every embedded raster image across all pages that meets the
/// size floor, in page-then-encounter order. Runs synchronously — the
/// caller is expected to hand this to a blocking-task executor, since PDF
/// parsing is CPU-bound (§4.8, §5).
pub fn extract_images(pdf_bytes: &[u8], min_width: u32, min_height: u32) -> Vec<ExtractedImage> {
    let doc = match Document::load_mem(pdf_bytes) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "failed to parse PDF for figure extraction");
            return Vec::new();
        }
    };

    let mut images = Vec::new();
    let mut figure_index: i16 = 0;

    for (_page_num, page_id) in doc.get_pages() {
        let resources = match doc.get_page_resources(page_id) {
            (Some(dict), _) => dict.clone(),
            _ => continue,
        };
        let xobjects = match resources
            .get(b"XObject")
            .ok()
            .and_then(|o| doc.dereference(o).ok())
            .and_then(|(_, obj)| obj.as_dict().ok().cloned())
        {
            Some(d) => d,
            None => continue,
        };

        for (_name, obj_ref) in xobjects.iter() {
            let (_, obj) = match doc.dereference(obj_ref) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let stream = match obj {
                Object::Stream(s) => s,
                _ => continue,
            };

            let subtype = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| n.to_vec());
            if subtype.as_deref() != Some(b"Image") {
                continue;
            }

            let width = stream
                .dict
                .get(b"Width")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0) as u32;
            let height = stream
                .dict
                .get(b"Height")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0) as u32;

            if width < min_width || height < min_height {
                continue;
            }

            let filter = stream
                .dict
                .get(b"Filter")
                .ok()
                .and_then(|o| o.as_name().ok())
                .map(|n| n.to_vec());

            let (bytes, extension) = match filter.as_deref() {
                Some(b"DCTDecode") => (stream.content.clone(), "jpg"),
                Some(b"JPXDecode") => (stream.content.clone(), "jp2"),
                // Flate/LZW-decoded raw samples and anything else: emit as
                // a generic binary blob rather than guessing a codec.
                _ => match stream.decompressed_content() {
                    Ok(decoded) => (decoded, "png"),
                    Err(_) => (stream.content.clone(), "bin"),
                },
            };

            images.push(ExtractedImage {
                figure_index,
                bytes,
                width,
                height,
                extension,
            });
            figure_index += 1;
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_garbage_pdf_yields_no_images() {
        assert!(extract_images(b"not a pdf", 100, 100).is_empty());
        assert!(extract_images(b"", 100, 100).is_empty());
    }
}
