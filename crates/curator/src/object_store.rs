//! Figure upload to the object store (C8 dependency).
//!
//! Thin wrapper around the S3 `PutObject` call plus the public-URL
//! construction rule: serve behind the CDN domain when configured,
//! otherwise hand back the bare object key (§4.8, §6).

use curator_common::config::ObjectStoreConfig;
use curator_common::errors::{PipelineError, Result};

pub struct ObjectStore {
    client: aws_sdk_s3::Client,
    config: ObjectStoreConfig,
}

impl ObjectStore {
    pub async fn new(config: ObjectStoreConfig) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&aws_config);
        Self { client, config }
    }

    /// `figures/{arxiv_id}/fig_{index}.{ext}`, per §4.8.
    pub fn object_key(&self, arxiv_id: &str, figure_index: i16, extension: &str) -> String {
        format!(
            "{}/{}/fig_{}.{}",
            self.config.figure_s3_prefix, arxiv_id, figure_index, extension
        )
    }

    pub fn public_url(&self, key: &str) -> String {
        match &self.config.cdn_domain {
            Some(domain) => format!("https://{}/{}", domain.trim_end_matches('/'), key),
            None => key.to_string(),
        }
    }

    pub async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let bucket = self.config.bucket.as_deref().ok_or_else(|| {
            PipelineError::Configuration("FIGURE_BUCKET is not configured".into())
        })?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(aws_sdk_s3::primitives::ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| PipelineError::TransientNetwork {
                target: "object store".into(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

pub fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "jpg" | "jpeg" => "image/jpeg",
        "jp2" => "image/jp2",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_matches_known_extensions() {
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("bin"), "application/octet-stream");
    }
}
