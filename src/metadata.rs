//! Token metadata hosting
//!
//! pump.fun expects the create instruction's `uri` argument to point at a
//! hosted metadata JSON. This module uploads the image and text fields to
//! the pump.fun IPFS gateway and returns that URI.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::info;

use crate::config::{ImageBlob, TokenMetadata};

/// pump.fun IPFS upload endpoint
pub const IPFS_ENDPOINT: &str = "https://pump.fun/api/ipfs";

/// Metadata hosting seam; the worker only sees this trait
#[async_trait]
pub trait MetadataUploader: Send + Sync {
    /// Host the metadata and return its URI
    async fn upload(&self, metadata: &TokenMetadata, image: &ImageBlob) -> Result<String>;
}

/// Uploader backed by the pump.fun IPFS gateway
#[derive(Default)]
pub struct IpfsUploader;

#[async_trait]
impl MetadataUploader for IpfsUploader {
    async fn upload(&self, metadata: &TokenMetadata, image: &ImageBlob) -> Result<String> {
        upload_metadata(metadata, image).await
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpfsResponse {
    metadata_uri: String,
}

/// Upload image + metadata fields, returning the hosted metadata URI
pub async fn upload_metadata(metadata: &TokenMetadata, image: &ImageBlob) -> Result<String> {
    let file_part = Part::bytes(image.bytes.clone())
        .file_name("token-image")
        .mime_str(&image.mime_type)
        .context("invalid image MIME type")?;

    let mut form = Form::new()
        .part("file", file_part)
        .text("name", metadata.name.clone())
        .text("symbol", metadata.symbol.clone())
        .text("description", metadata.description.clone())
        .text("showName", "true");
    if let Some(twitter) = &metadata.twitter {
        form = form.text("twitter", twitter.clone());
    }
    if let Some(telegram) = &metadata.telegram {
        form = form.text("telegram", telegram.clone());
    }
    if let Some(website) = &metadata.website {
        form = form.text("website", website.clone());
    }

    let client = reqwest::Client::new();
    let response = client
        .post(IPFS_ENDPOINT)
        .multipart(form)
        .send()
        .await
        .context("IPFS upload request failed")?;

    if !response.status().is_success() {
        return Err(anyhow!("IPFS upload rejected: HTTP {}", response.status()));
    }

    let parsed: IpfsResponse = response
        .json()
        .await
        .context("IPFS upload response was not the expected JSON")?;
    info!(uri = %parsed.metadata_uri, "Metadata uploaded");
    Ok(parsed.metadata_uri)
}
