use super::models::Config;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("max_concurrent_prefetchers must be at least 1")]
    ZeroConcurrency,

    #[error("HTTP timeout must be positive: {field}")]
    ZeroTimeout { field: String },

    #[error("max_body_bytes must be positive")]
    ZeroBodyCap,

    #[error("Invalid document origin '{origin}': {reason}")]
    InvalidDocumentOrigin { origin: String, reason: String },

    #[error("Invalid proxy URL '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_scheduler(config)?;
    validate_http(config)?;
    validate_links(config)?;
    Ok(())
}

fn validate_scheduler(config: &Config) -> Result<(), ValidationError> {
    if config.scheduler.max_concurrent_prefetchers == 0 {
        return Err(ValidationError::ZeroConcurrency);
    }

    if !config.scheduler.methods.any_enabled() {
        tracing::warn!("Every hint method is disabled; admitted links will all be skipped");
    }

    Ok(())
}

fn validate_http(config: &Config) -> Result<(), ValidationError> {
    for (field, value) in [
        ("connect_timeout", config.http.connect_timeout),
        ("request_timeout", config.http.request_timeout),
    ] {
        if value.is_zero() {
            return Err(ValidationError::ZeroTimeout {
                field: field.to_string(),
            });
        }
    }

    if config.http.max_body_bytes == 0 {
        return Err(ValidationError::ZeroBodyCap);
    }

    if let Some(proxy) = &config.http.proxy {
        Url::parse(proxy).map_err(|e| ValidationError::InvalidProxy {
            proxy: proxy.clone(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}

fn validate_links(config: &Config) -> Result<(), ValidationError> {
    let origin = &config.links.document_origin;
    let url = Url::parse(origin).map_err(|e| ValidationError::InvalidDocumentOrigin {
        origin: origin.clone(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(ValidationError::InvalidDocumentOrigin {
            origin: origin.clone(),
            reason: "no host".to_string(),
        });
    }

    Ok(())
}
