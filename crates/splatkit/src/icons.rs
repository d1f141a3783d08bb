//! Startup-time registration of static icon routes.

use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    http::{
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
};
use splatkit_core::api::VerbClass;

use crate::{
    api::{Api, RouteResponse},
    error::Error,
};

const CACHE_FOREVER: &str = "public, max-age=31536000, immutable";

/// An icon to serve, identified by `id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub id: String,
    pub path: PathBuf,
}

impl IconAsset {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
        }
    }

    /// Content type by file extension.
    pub fn content_type(&self) -> &'static str {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("svg") => "image/svg+xml",
            Some("png") => "image/png",
            Some("ico") => "image/x-icon",
            Some("webp") => "image/webp",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            _ => "application/octet-stream",
        }
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.id)
            .to_string()
    }

    fn headers(&self) -> Result<HeaderMap, Error> {
        let disposition = format!("attachment; filename=\"{}\"", self.file_name());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type()));
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition)
                .map_err(|e| Error::Config(format!("icon '{}': {e}", self.id)))?,
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(CACHE_FOREVER));
        Ok(headers)
    }
}

/// List the files in `dir` as icons named after their file stem.
///
/// Entries are sorted by id; subdirectories are skipped.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be read.
pub async fn scan_icon_dir(dir: impl AsRef<Path>) -> Result<Vec<IconAsset>, Error> {
    let dir = dir.as_ref();
    let io = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io)?;
    let mut icons = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io)? {
        let path = entry.path();
        if !entry.file_type().await.map_err(io)?.is_file() {
            continue;
        }
        if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
            icons.push(IconAsset::new(id, path.clone()));
        }
    }

    icons.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(icons)
}

impl Api {
    /// Read every icon once and register a loader at `icon/<id>` serving it.
    ///
    /// Returns the number of routes registered.
    ///
    /// # Errors
    ///
    /// Fails on the first icon that cannot be read.
    pub async fn register_icons(
        &mut self,
        icons: impl IntoIterator<Item = IconAsset>,
    ) -> Result<usize, Error> {
        let mut count = 0;
        for icon in icons {
            let body = Bytes::from(tokio::fs::read(&icon.path).await.map_err(|source| {
                Error::Io {
                    path: icon.path.clone(),
                    source,
                }
            })?);
            let headers = icon.headers()?;

            let route = self.route(&["icon", icon.id.as_str()]);
            self.register(&route, VerbClass::Loader, move |_| {
                let response = RouteResponse::raw(body.clone()).with_headers(headers.clone());
                async move { response }
            });
            count += 1;
        }

        tracing::info!(count, "icon routes registered");
        Ok(count)
    }
}
