// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("URL parse error: {0:?}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP error: {0:?}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0:?}")]
    Xml(#[from] serde_xml_rs::Error),

    #[error("template error: {0:?}")]
    TemplateRender(#[from] handlebars::RenderError),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on path {0}: {1:?}")]
    IoPath(String, std::io::Error),

    #[error("could not derive version components from URL: {0}")]
    VersionExtraction(String),

    #[error("no snapshot builds found for major version {0}")]
    SnapshotNotFound(String),

    #[error("unable to resolve {0}")]
    EnvironmentResolution(&'static str),

    #[error("a spec template path requires a spec template type")]
    SpecTemplateTypeMissing,

    #[error("a spec template type requires a spec template path")]
    SpecTemplatePathMissing,

    #[error("unsupported spec template type: {0}")]
    SpecTemplateTypeUnsupported(String),

    #[error("rendered spec file lacks a parseable Version line")]
    SpecVersionMissing,

    #[error("error running {0}: exited {1}")]
    ToolFailure(&'static str, i32),

    #[error("error running {0}: {1:?}")]
    ToolIo(&'static str, std::io::Error),
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, PackagingError>;
