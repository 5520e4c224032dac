//! Container image reference normalization
//!
//! Turns a user-supplied reference such as `registry:5000/team/app:v2` or
//! `nginx@sha256:...` into the `docker://<host>/<path>#<tag>` form the scheduler
//! expects as a root filesystem.

use crate::error::{RecipeError, Result};
use regex::Regex;
use serde::Serialize;
use std::fmt;

const SCHEME: &str = "docker";
const DIGEST_MARKER: &str = "@sha256:";
const DEFAULT_TAG: &str = "latest";
const OFFICIAL_REGISTRY: &str = "docker.io";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageReference {
    pub scheme: String,
    /// Empty when the reference names no registry
    pub host: String,
    pub path: String,
    /// Tag or bare digest
    pub tag: String,
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}#{}", self.scheme, self.host, self.path, self.tag)
    }
}

#[derive(Debug, Clone)]
pub struct ImageReferenceParser {
    path_re: Regex,
    tag_re: Regex,
}

impl Default for ImageReferenceParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageReferenceParser {
    pub fn new() -> Self {
        Self {
            path_re: Regex::new(r"^[a-z0-9_\-./]{2,255}$").expect("valid regex"),
            tag_re: Regex::new(r"^[a-zA-Z0-9_\-.@:]{1,128}$").expect("valid regex"),
        }
    }

    /// Parses `raw` into host, path and tag
    ///
    /// The first `/`-separated segment is the host. Official-registry images
    /// without a namespace get `library/`. A digest reference keeps `@sha256` on
    /// the path and only the hex digest as the tag.
    pub fn parse(&self, raw: &str) -> Result<ImageReference> {
        let raw = raw.trim();
        if raw.contains("://") {
            return Err(invalid(raw, "reference must not contain a scheme"));
        }
        if raw.is_empty() {
            return Err(invalid(raw, "reference is empty"));
        }

        let (host, remainder) = match raw.split_once('/') {
            Some((host, rest)) => (host, rest),
            None => ("", raw),
        };

        let (mut path, mut tag) = split_tag(remainder);

        if (host.is_empty() || host == OFFICIAL_REGISTRY) && !path.contains('/') {
            path = format!("library/{}", path);
        }

        if !self.path_re.is_match(&path) {
            return Err(invalid(raw, "path contains invalid characters"));
        }
        if !self.tag_re.is_match(&tag) {
            return Err(invalid(raw, "tag contains invalid characters"));
        }

        if let Some(digest) = tag.strip_prefix(DIGEST_MARKER) {
            path.push_str("@sha256");
            tag = digest.to_string();
        }

        Ok(ImageReference {
            scheme: SCHEME.to_string(),
            host: host.to_string(),
            path,
            tag,
        })
    }

    /// Parses and renders in one step
    pub fn normalize(&self, raw: &str) -> Result<String> {
        self.parse(raw).map(|reference| reference.to_string())
    }
}

fn split_tag(remainder: &str) -> (String, String) {
    if let Some((path, digest)) = remainder.split_once('@') {
        return (path.to_string(), format!("@{}", digest));
    }
    match remainder.rsplit_once(':') {
        Some((path, tag)) if !tag.contains('/') => (path.to_string(), tag.to_string()),
        _ => (remainder.to_string(), DEFAULT_TAG.to_string()),
    }
}

fn invalid(raw: &str, reason: &str) -> RecipeError {
    RecipeError::InvalidImageReference(format!("{}: {}", raw, reason))
}
