// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Version extraction from distribution tarball URLs. */

use {
    crate::error::{PackagingError, Result},
    once_cell::sync::Lazy,
    regex::Regex,
    serde::Serialize,
};

static VERSION_TRIPLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").unwrap());

/// Matches the timestamp and build number in a snapshot tarball file name,
/// e.g. `karaf-0.8.4-20180807.132015-123.tar.gz`.
static SNAPSHOT_BUILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-(\d{8})\.(\d{6})-(\d+)").unwrap());

static AUTORELEASE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"autorelease-(\d+)").unwrap());

/// OpenDaylight version components derived from a distribution URL.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct DistroVersion {
    pub version_major: String,
    pub version_minor: String,
    pub version_patch: String,

    /// Default package version (the RPM `Release` / deb revision component)
    /// implied by the kind of build the URL points at.
    pub pkg_version: String,
}

/// Derive version components and a default package version from the URL of a
/// distribution tarball.
///
/// Historical distributions are versioned `0.<major>.<minor>` (`karaf-0.8.4`
/// is OpenDaylight 8); those map to `<major>.<minor>.0`. Post-Sodium
/// distributions carry the real `major.minor.patch` triple and map
/// positionally.
///
/// The default package version encodes the build flavor:
///
/// * snapshot builds: `0.1.<yyyymmdd>snap<build-number>`
/// * autorelease builds: `0.1.<yyyymmdd>rel<autorelease-id>`
/// * release builds: `1`
pub fn extract_version(url: &str) -> Result<DistroVersion> {
    let file_name = url.rsplit('/').next().unwrap_or(url);

    let caps = VERSION_TRIPLE_RE
        .captures(file_name)
        .ok_or_else(|| PackagingError::VersionExtraction(url.to_string()))?;

    let (version_major, version_minor, version_patch) = if &caps[1] == "0" {
        (caps[2].to_string(), caps[3].to_string(), "0".to_string())
    } else {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    };

    let pkg_version = if url.contains("autorelease") {
        let id = AUTORELEASE_ID_RE
            .captures(url)
            .map(|c| c[1].to_string())
            .ok_or_else(|| PackagingError::VersionExtraction(url.to_string()))?;
        let date = SNAPSHOT_BUILD_RE
            .captures(file_name)
            .map(|c| c[1].to_string())
            .ok_or_else(|| PackagingError::VersionExtraction(url.to_string()))?;

        format!("0.1.{}rel{}", date, id)
    } else if url.contains("snapshot") {
        let caps = SNAPSHOT_BUILD_RE
            .captures(file_name)
            .ok_or_else(|| PackagingError::VersionExtraction(url.to_string()))?;

        format!("0.1.{}snap{}", &caps[1], &caps[3])
    } else if url.contains("public") || url.contains("opendaylight.release") {
        "1".to_string()
    } else {
        return Err(PackagingError::VersionExtraction(url.to_string()));
    };

    Ok(DistroVersion {
        version_major,
        version_minor,
        version_patch,
        pkg_version,
    })
}
