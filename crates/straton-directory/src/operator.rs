//! OpenDAL Operator factory for the directory bucket

use anyhow::{Context, Result};
use opendal::Operator;
use straton_core::config::DirectoryConfig;

/// Build an OpenDAL Operator for the S3-compatible directory bucket.
///
/// Credentials come from the standard AWS environment variables; the bucket
/// layout is `keys/`, `messages/`, and `attachments/` prefixes managed by
/// the clients in this crate.
pub fn build_operator(
    cfg: &DirectoryConfig,
    access_key_id: &str,
    secret_access_key: &str,
) -> Result<Operator> {
    if cfg.endpoint.starts_with("http://") {
        if cfg.enforce_tls {
            anyhow::bail!(
                "directory endpoint uses plaintext HTTP ({}), but enforce_tls is enabled",
                cfg.endpoint
            );
        }
        tracing::warn!(
            endpoint = %cfg.endpoint,
            "directory endpoint uses plaintext HTTP; set directory.enforce_tls = true in production"
        );
    }

    let builder = opendal::services::S3::default()
        .endpoint(&cfg.endpoint)
        .region(&cfg.region)
        .bucket(&cfg.bucket)
        .access_key_id(access_key_id)
        .secret_access_key(secret_access_key);

    let op = Operator::new(builder)
        .context("creating directory operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(5)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}

/// In-memory operator for tests.
pub fn memory_operator() -> Operator {
    Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish()
}
