// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Latest-snapshot discovery against the OpenDaylight Nexus.

Snapshot builds of the integration distribution are published to a Maven
repository. `maven-metadata.xml` at the artifact level advertises the known
`*-SNAPSHOT` versions; `maven-metadata.xml` inside a version directory
advertises the timestamped builds within it. Walking the two is enough to
find the tarball URL of the most recent snapshot build of a given major
version.
*/

use {
    crate::{
        error::{PackagingError, Result},
        http,
    },
    serde::Deserialize,
    std::io::Read,
};

/// Base URL of the snapshot repository holding integration distributions.
pub const SNAPSHOT_REPOSITORY_URL: &str = "https://nexus.opendaylight.org/content/repositories/opendaylight.snapshot/org/opendaylight/integration";

/// A `maven-metadata.xml` file.
///
/// The same document shape is served at the artifact level (where
/// `versioning.versions` is populated) and at the version level (where
/// `version`, `versioning.snapshot`, and `versioning.snapshot_versions`
/// are).
#[derive(Clone, Debug, Deserialize)]
pub struct MavenMetadata {
    #[serde(rename = "groupId")]
    pub group_id: Option<String>,
    #[serde(rename = "artifactId")]
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    pub versioning: Versioning,
}

impl MavenMetadata {
    /// Construct an instance by parsing XML from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Ok(serde_xml_rs::from_reader(reader)?)
    }

    /// Construct an instance by parsing XML from a string.
    pub fn from_xml(s: &str) -> Result<Self> {
        Ok(serde_xml_rs::from_str(s)?)
    }
}

/// The `<versioning>` element.
#[derive(Clone, Debug, Deserialize)]
pub struct Versioning {
    pub latest: Option<String>,
    pub release: Option<String>,
    pub snapshot: Option<Snapshot>,
    pub versions: Option<Versions>,
    #[serde(rename = "snapshotVersions")]
    pub snapshot_versions: Option<SnapshotVersions>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: Option<String>,
}

/// The `<versions>` list at the artifact level.
#[derive(Clone, Debug, Deserialize)]
pub struct Versions {
    #[serde(rename = "version", default)]
    pub versions: Vec<String>,
}

/// The `<snapshot>` element naming the most recent timestamped build.
#[derive(Clone, Debug, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    #[serde(rename = "buildNumber")]
    pub build_number: String,
}

/// The `<snapshotVersions>` list at the version level.
#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotVersions {
    #[serde(rename = "snapshotVersion", default)]
    pub snapshot_versions: Vec<SnapshotVersion>,
}

/// A single `<snapshotVersion>` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct SnapshotVersion {
    pub classifier: Option<String>,
    pub extension: String,
    pub value: String,
    pub updated: Option<String>,
}

/// Parse a `*-SNAPSHOT` version string into a sort key for the given major
/// version.
///
/// Returns `None` for versions of other majors or other shapes. Handles both
/// the historical `0.<major>.<minor>` numbering and the `major.minor.patch`
/// numbering used from Sodium on.
fn snapshot_sort_key(version: &str, version_major: &str) -> Option<(u64, u64)> {
    let base = version.strip_suffix("-SNAPSHOT")?;

    let mut parts = base.split('.');
    let a = parts.next()?;
    let b = parts.next()?;
    let c = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    if a == "0" {
        if b != version_major {
            return None;
        }

        Some((c.parse().ok()?, 0))
    } else {
        if a != version_major {
            return None;
        }

        Some((b.parse().ok()?, c.parse().ok()?))
    }
}

/// Select the most recent snapshot version of a major version from an
/// artifact-level version list.
pub fn select_latest_version<'a>(
    versions: &'a [String],
    version_major: &str,
) -> Option<&'a String> {
    versions
        .iter()
        .filter_map(|v| snapshot_sort_key(v, version_major).map(|key| (key, v)))
        .max_by_key(|(key, _)| *key)
        .map(|(_, v)| v)
}

/// Derive the timestamped tarball name component for a version-level
/// metadata document.
///
/// Prefers the `<snapshotVersion>` entry for the `tar.gz` artifact and falls
/// back to combining `<snapshot>` timestamp and build number.
pub fn tarball_value(metadata: &MavenMetadata) -> Option<String> {
    if let Some(snapshot_versions) = &metadata.versioning.snapshot_versions {
        if let Some(entry) = snapshot_versions
            .snapshot_versions
            .iter()
            .find(|entry| entry.extension == "tar.gz" && entry.classifier.is_none())
        {
            return Some(entry.value.clone());
        }
    }

    let snapshot = metadata.versioning.snapshot.as_ref()?;
    let version = metadata.version.as_ref()?;

    Some(format!(
        "{}-{}-{}",
        version.trim_end_matches("-SNAPSHOT"),
        snapshot.timestamp,
        snapshot.build_number
    ))
}

/// Find the tarball URL of the latest snapshot build of the given major
/// version.
pub fn latest_snapshot_url(
    client: &reqwest::blocking::Client,
    version_major: &str,
) -> Result<String> {
    let artifact = crate::build::distro_name_prefix(version_major);
    let artifact_url = format!("{}/{}", SNAPSHOT_REPOSITORY_URL, artifact);

    let data = http::download(client, &format!("{}/maven-metadata.xml", artifact_url))?;
    let metadata = MavenMetadata::from_reader(data.as_slice())?;

    let versions = metadata
        .versioning
        .versions
        .as_ref()
        .map(|v| v.versions.as_slice())
        .unwrap_or_default();

    let version = select_latest_version(versions, version_major)
        .ok_or_else(|| PackagingError::SnapshotNotFound(version_major.to_string()))?;

    let version_url = format!("{}/{}", artifact_url, version);

    let data = http::download(client, &format!("{}/maven-metadata.xml", version_url))?;
    let metadata = MavenMetadata::from_reader(data.as_slice())?;

    let value = tarball_value(&metadata)
        .ok_or_else(|| PackagingError::SnapshotNotFound(version_major.to_string()))?;

    Ok(format!("{}/{}-{}.tar.gz", version_url, artifact, value))
}

#[cfg(test)]
mod tests {
    use {super::*, indoc::indoc};

    const ARTIFACT_METADATA: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <metadata>
          <groupId>org.opendaylight.integration</groupId>
          <artifactId>karaf</artifactId>
          <versioning>
            <versions>
              <version>0.8.4-SNAPSHOT</version>
              <version>0.9.0-SNAPSHOT</version>
              <version>0.9.1-SNAPSHOT</version>
              <version>0.10.0-SNAPSHOT</version>
            </versions>
            <lastUpdated>20180921113550</lastUpdated>
          </versioning>
        </metadata>
    "#};

    const VERSION_METADATA: &str = indoc! {r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <metadata>
          <groupId>org.opendaylight.integration</groupId>
          <artifactId>karaf</artifactId>
          <version>0.9.1-SNAPSHOT</version>
          <versioning>
            <snapshot>
              <timestamp>20180807.132015</timestamp>
              <buildNumber>123</buildNumber>
            </snapshot>
            <lastUpdated>20180807132015</lastUpdated>
            <snapshotVersions>
              <snapshotVersion>
                <extension>pom</extension>
                <value>0.9.1-20180807.132015-123</value>
                <updated>20180807132015</updated>
              </snapshotVersion>
              <snapshotVersion>
                <extension>tar.gz</extension>
                <value>0.9.1-20180807.132015-123</value>
                <updated>20180807132015</updated>
              </snapshotVersion>
            </snapshotVersions>
          </versioning>
        </metadata>
    "#};

    #[test]
    fn parse_artifact_metadata() -> Result<()> {
        let metadata = MavenMetadata::from_xml(ARTIFACT_METADATA)?;

        assert_eq!(metadata.artifact_id.as_deref(), Some("karaf"));

        let versions = metadata.versioning.versions.unwrap().versions;
        assert_eq!(versions.len(), 4);
        assert_eq!(select_latest_version(&versions, "9"), Some(&"0.9.1-SNAPSHOT".to_string()));
        assert_eq!(select_latest_version(&versions, "10"), Some(&"0.10.0-SNAPSHOT".to_string()));
        assert_eq!(select_latest_version(&versions, "11"), None);

        Ok(())
    }

    #[test]
    fn parse_version_metadata() -> Result<()> {
        let metadata = MavenMetadata::from_xml(VERSION_METADATA)?;

        assert_eq!(
            tarball_value(&metadata).as_deref(),
            Some("0.9.1-20180807.132015-123")
        );

        Ok(())
    }

    #[test]
    fn tarball_value_falls_back_to_snapshot_element() -> Result<()> {
        let metadata = MavenMetadata::from_xml(indoc! {r#"
            <metadata>
              <version>0.9.1-SNAPSHOT</version>
              <versioning>
                <snapshot>
                  <timestamp>20180807.132015</timestamp>
                  <buildNumber>123</buildNumber>
                </snapshot>
              </versioning>
            </metadata>
        "#})?;

        assert_eq!(
            tarball_value(&metadata).as_deref(),
            Some("0.9.1-20180807.132015-123")
        );

        Ok(())
    }

    #[test]
    fn new_version_scheme_sort_keys() {
        let versions = vec![
            "13.0.2-SNAPSHOT".to_string(),
            "13.1.0-SNAPSHOT".to_string(),
            "14.0.0-SNAPSHOT".to_string(),
        ];

        assert_eq!(
            select_latest_version(&versions, "13"),
            Some(&"13.1.0-SNAPSHOT".to_string())
        );
    }
}
