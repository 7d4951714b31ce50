use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

use super::{Request, Response};

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("network unreachable: {0}")]
    Unreachable(String),
    #[error("failed to read {path}")]
    Io { path: PathBuf, source: io::Error },
}

pub trait Network {
    /// Transport failures are errors; HTTP error statuses are not.
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Serves a static site from a directory, the way a plain file server would.
#[derive(Debug, Clone)]
pub struct SiteRootNetwork {
    root: PathBuf,
}

impl SiteRootNetwork {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        if relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)))
        {
            return None;
        }
        let mut path = self.root.join(relative);
        if key.is_empty() || key.ends_with('/') || path.is_dir() {
            path.push("index.html");
        }
        Some(path)
    }
}

impl Network for SiteRootNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        if !self.root.is_dir() {
            return Err(NetworkError::Unreachable(self.root.display().to_string()));
        }
        let Some(path) = self.resolve(request.key()) else {
            return Ok(Response::not_found());
        };

        match fs::read(&path) {
            Ok(body) => Ok(Response::ok(content_type_for(&path), body)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Response::not_found()),
            Err(source) => Err(NetworkError::Io { path, source }),
        }
    }
}

/// A network that is always down.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

impl Network for OfflineNetwork {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        Err(NetworkError::Unreachable(format!(
            "offline while fetching {:?}",
            request.key()
        )))
    }
}

impl<N: Network + ?Sized> Network for &N {
    fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request)
    }
}

fn content_type_for(path: &Path) -> Option<String> {
    let content_type = match path.extension().and_then(|ext| ext.to_str())? {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "webmanifest" => "application/manifest+json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        _ => return None,
    };
    Some(content_type.to_string())
}
