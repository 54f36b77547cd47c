// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Build descriptor resolution.

A packaging run is described by a [BuildDescriptor]: version components,
download URL, changelog metadata, template selection, and the flags that
steer source staging. Callers construct a [BuildRequest] from raw inputs
and [BuildRequest::resolve] fills every remaining field, so downstream
steps never have to second-guess or re-derive a value.
*/

use {
    crate::{
        error::{PackagingError, Result},
        snapshot,
        version::extract_version,
    },
    duct::cmd,
    serde::Serialize,
    std::path::PathBuf,
};

/// Git repository holding the packaging sources and the systemd unit file.
pub const PACKAGING_GIT_URL: &str =
    "https://git.opendaylight.org/gerrit/integration/packaging.git";

const DEFAULT_CHANGELOG_NAME: &str = "Jenkins";
const DEFAULT_CHANGELOG_EMAIL: &str = "jenkins-donotreply@opendaylight.org";

/// The kind of package to produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Rpm,
    Deb,
}

/// Where the distribution to package comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BuildLocation {
    /// A tarball at a known URL.
    Direct { download_url: String },
    /// The latest snapshot build of a major version, to be discovered.
    LatestSnapshot { version_major: String },
}

/// Which template renders the RPM spec file.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SpecTemplate {
    /// The template embedded in this crate.
    Builtin,
    /// A Handlebars template supplied by the caller.
    Custom { path: PathBuf },
}

/// Raw inputs for a packaging run, typically collected from the CLI.
///
/// `None` (and, for the changelog fields, empty strings as passed by shell
/// wrappers with unset variables) means "fill in the default".
#[derive(Clone, Debug)]
pub struct BuildRequest {
    pub package_type: PackageType,
    pub location: BuildLocation,
    pub changelog_name: Option<String>,
    pub changelog_email: Option<String>,
    pub sysd_commit: Option<String>,
    pub service_file_url: Option<String>,
    pub distro_name_prefix: Option<String>,
    pub keep_distro_name: bool,
    pub keep_service_file_name: bool,
    pub pkg_version: Option<String>,
    pub pkg_distro: Option<String>,
    pub spec_template_path: Option<PathBuf>,
    pub spec_template_type: Option<String>,
    pub clean_builddir: bool,
    pub extra_src_files: Vec<PathBuf>,
}

impl BuildRequest {
    /// Construct a request with defaults for everything but the essentials.
    pub fn new(package_type: PackageType, location: BuildLocation) -> Self {
        Self {
            package_type,
            location,
            changelog_name: None,
            changelog_email: None,
            sysd_commit: None,
            service_file_url: None,
            distro_name_prefix: None,
            keep_distro_name: false,
            keep_service_file_name: false,
            pkg_version: None,
            pkg_distro: None,
            spec_template_path: None,
            spec_template_type: None,
            clean_builddir: true,
            extra_src_files: vec![],
        }
    }

    /// Resolve this request into a complete [BuildDescriptor].
    ///
    /// Discovery only happens for fields the request left unset, so a fully
    /// specified request resolves without touching the network or external
    /// tools.
    pub fn resolve(self, client: &reqwest::blocking::Client) -> Result<BuildDescriptor> {
        let changelog_name = non_empty(self.changelog_name)
            .unwrap_or_else(|| DEFAULT_CHANGELOG_NAME.to_string());
        let changelog_email = non_empty(self.changelog_email)
            .unwrap_or_else(|| DEFAULT_CHANGELOG_EMAIL.to_string());
        let changelog_date = changelog_date(self.package_type);

        let sysd_commit = match non_empty(self.sysd_commit) {
            Some(commit) => commit,
            None => latest_packaging_commit()?,
        };

        let spec_template = match (self.spec_template_path, self.spec_template_type) {
            (Some(path), Some(kind)) => {
                if kind == "handlebars" {
                    SpecTemplate::Custom { path }
                } else {
                    return Err(PackagingError::SpecTemplateTypeUnsupported(kind));
                }
            }
            (Some(_), None) => return Err(PackagingError::SpecTemplateTypeMissing),
            (None, Some(_)) => return Err(PackagingError::SpecTemplatePathMissing),
            (None, None) => SpecTemplate::Builtin,
        };

        let download_url = match self.location {
            BuildLocation::Direct { download_url } => download_url,
            BuildLocation::LatestSnapshot { version_major } => {
                snapshot::latest_snapshot_url(client, &version_major)?
            }
        };

        let version = extract_version(&download_url)?;

        let pkg_version_override = non_empty(self.pkg_version);
        let pkg_distro_override = non_empty(self.pkg_distro);

        // The original Release field is only rewritten in externally
        // templated specs when the caller asked for a specific value.
        // Empty strings from shell wrappers with unset variables are not
        // asks.
        let release_override = pkg_version_override.is_some() || pkg_distro_override.is_some();

        let pkg_version = pkg_version_override.unwrap_or(version.pkg_version);

        let pkg_distro = match pkg_distro_override {
            Some(distro) => distro,
            None => match self.package_type {
                PackageType::Rpm => discover_dist_tag()?,
                PackageType::Deb => String::new(),
            },
        };

        let distro_name_prefix = non_empty(self.distro_name_prefix)
            .unwrap_or_else(|| distro_name_prefix(&version.version_major).to_string());

        let java_version = java_version(&version.version_major).to_string();

        let service_file_url =
            non_empty(self.service_file_url).unwrap_or_else(|| unit_file_url(&sysd_commit));

        Ok(BuildDescriptor {
            package_type: self.package_type,
            download_url,
            version_major: version.version_major,
            version_minor: version.version_minor,
            version_patch: version.version_patch,
            pkg_version,
            pkg_distro,
            release_override,
            distro_name_prefix,
            java_version,
            changelog_name,
            changelog_email,
            changelog_date,
            sysd_commit,
            service_file_url,
            keep_distro_name: self.keep_distro_name,
            keep_service_file_name: self.keep_service_file_name,
            spec_template,
            clean_builddir: self.clean_builddir,
            extra_src_files: self.extra_src_files,
        })
    }
}

/// A fully-resolved description of a packaging run.
///
/// Serializes to the flat mapping the manifest templates consume.
#[derive(Clone, Debug, Serialize)]
pub struct BuildDescriptor {
    pub package_type: PackageType,
    pub download_url: String,
    pub version_major: String,
    pub version_minor: String,
    pub version_patch: String,
    pub pkg_version: String,
    pub pkg_distro: String,
    /// Whether an externally templated spec should have its Release line
    /// overridden with `pkg_version.pkg_distro`.
    pub release_override: bool,
    pub distro_name_prefix: String,
    pub java_version: String,
    pub changelog_name: String,
    pub changelog_email: String,
    pub changelog_date: String,
    pub sysd_commit: String,
    pub service_file_url: String,
    pub keep_distro_name: bool,
    pub keep_service_file_name: bool,
    pub spec_template: SpecTemplate,
    pub clean_builddir: bool,
    pub extra_src_files: Vec<PathBuf>,
}

impl BuildDescriptor {
    /// The `major.minor.patch` version string.
    pub fn version_string(&self) -> String {
        format!(
            "{}.{}.{}",
            self.version_major, self.version_minor, self.version_patch
        )
    }

    /// Normalized cache name of the distribution tarball.
    pub fn distro_tar_name(&self) -> String {
        format!(
            "{}-{}-{}.tar.gz",
            self.distro_name_prefix,
            self.version_string(),
            self.pkg_version
        )
    }

    /// Cache name of the tarball wrapping the systemd unit file.
    pub fn unitfile_tar_name(&self) -> String {
        format!("opendaylight-systemd-{}.tar.gz", self.sysd_commit_short())
    }

    /// Abbreviated unit file commit, as embedded in artifact names.
    pub fn sysd_commit_short(&self) -> &str {
        if self.sysd_commit.len() > 8 {
            &self.sysd_commit[..8]
        } else {
            &self.sysd_commit
        }
    }

    /// File name of the spec file fed to rpmbuild.
    pub fn spec_file_name(&self) -> String {
        format!("opendaylight-{}-{}.spec", self.version_string(), self.pkg_version)
    }

    /// File name of the binary RPM rpmbuild will produce.
    pub fn rpm_file_name(&self) -> String {
        format!(
            "opendaylight-{}-{}.{}.noarch.rpm",
            self.version_string(),
            self.pkg_version,
            self.pkg_distro
        )
    }

    /// File name of the source RPM rpmbuild will produce.
    pub fn srpm_file_name(&self) -> String {
        format!(
            "opendaylight-{}-{}.{}.src.rpm",
            self.version_string(),
            self.pkg_version,
            self.pkg_distro
        )
    }

    /// The Debian package version (`upstream-revision`).
    pub fn deb_version(&self) -> String {
        format!("{}-{}", self.version_string(), self.pkg_version)
    }

    /// File name of the .deb dpkg-buildpackage will produce.
    pub fn deb_file_name(&self) -> String {
        format!("opendaylight_{}_all.deb", self.deb_version())
    }
}

/// The distribution tarball name prefix appropriate for a major version.
///
/// Karaf 3 based distributions (before OpenDaylight 7) shipped as
/// `distribution-karaf`, Karaf 4 based ones as `karaf`.
pub fn distro_name_prefix(version_major: &str) -> &'static str {
    if version_major.parse::<u32>().map(|v| v < 7).unwrap_or(false) {
        "distribution-karaf"
    } else {
        "karaf"
    }
}

/// The Java major version required by an OpenDaylight major version.
pub fn java_version(version_major: &str) -> &'static str {
    match version_major.parse::<u32>().unwrap_or(u32::MAX) {
        0..=4 => "7",
        5..=11 => "8",
        _ => "11",
    }
}

/// Changelog date for the current time in the format the package type wants.
pub fn changelog_date(package_type: PackageType) -> String {
    let now = chrono::Local::now();

    match package_type {
        PackageType::Rpm => now.format("%a %b %d %Y").to_string(),
        PackageType::Deb => now.format("%a, %d %b %Y %H:%M:%S %z").to_string(),
    }
}

/// The gitweb URL serving the raw systemd unit file at a commit.
pub fn unit_file_url(sysd_commit: &str) -> String {
    format!(
        "https://git.opendaylight.org/gerrit/gitweb?p=integration/packaging.git;a=blob_plain;f=packages/unitfiles/opendaylight.service;hb={}",
        sysd_commit
    )
}

/// Commit hash of `HEAD` of the packaging Git repository.
pub fn latest_packaging_commit() -> Result<String> {
    let output = cmd("git", vec!["ls-remote", PACKAGING_GIT_URL, "HEAD"])
        .read()
        .map_err(|e| PackagingError::ToolIo("git", e))?;

    output
        .split_whitespace()
        .next()
        .map(|s| s.to_string())
        .ok_or(PackagingError::EnvironmentResolution(
            "packaging repository HEAD commit",
        ))
}

/// The build host's RPM dist tag (e.g. `el7`), without the leading dot.
///
/// Hosts whose rpm carries no `%dist` macro cannot build a correctly
/// tagged package; that is an error, not a guess.
pub fn discover_dist_tag() -> Result<String> {
    let output = cmd("rpm", vec!["--eval", "%{?dist}"])
        .read()
        .map_err(|e| PackagingError::ToolIo("rpm", e))?;

    parse_dist_tag(&output)
}

fn parse_dist_tag(output: &str) -> Result<String> {
    let tag = output.trim().trim_start_matches('.');

    if tag.is_empty() {
        Err(PackagingError::EnvironmentResolution("host RPM dist tag"))
    } else {
        Ok(tag.to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use {super::*, crate::http::get_http_client};

    const RELEASE_URL: &str = "https://nexus.opendaylight.org/content/repositories/opendaylight.release/org/opendaylight/integration/karaf/0.8.4/karaf-0.8.4.tar.gz";

    fn fully_specified_request() -> BuildRequest {
        BuildRequest {
            changelog_name: Some("A Packager".to_string()),
            changelog_email: Some("packager@example.com".to_string()),
            sysd_commit: Some("86f5a44339e3d0764c218d42985409f7c71e55b5".to_string()),
            pkg_distro: Some("el7".to_string()),
            ..BuildRequest::new(
                PackageType::Rpm,
                BuildLocation::Direct {
                    download_url: RELEASE_URL.to_string(),
                },
            )
        }
    }

    #[test]
    fn resolve_fully_specified_request() -> crate::Result<()> {
        let client = get_http_client()?;
        let build = fully_specified_request().resolve(&client)?;

        assert_eq!(build.version_major, "8");
        assert_eq!(build.version_minor, "4");
        assert_eq!(build.version_patch, "0");
        assert_eq!(build.pkg_version, "1");
        assert_eq!(build.pkg_distro, "el7");
        assert_eq!(build.distro_name_prefix, "karaf");
        assert_eq!(build.java_version, "8");
        assert_eq!(build.changelog_name, "A Packager");
        assert_eq!(build.spec_template, SpecTemplate::Builtin);
        assert!(build.clean_builddir);
        // The fixture pins pkg_distro, which alone forces the Release
        // rewrite for externally templated specs.
        assert!(build.release_override);
        assert!(build.service_file_url.contains(&build.sysd_commit));

        Ok(())
    }

    #[test]
    fn empty_changelog_fields_select_defaults() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.changelog_name = Some(String::new());
        request.changelog_email = Some(String::new());

        let build = request.resolve(&client)?;

        assert_eq!(build.changelog_name, DEFAULT_CHANGELOG_NAME);
        assert_eq!(build.changelog_email, DEFAULT_CHANGELOG_EMAIL);

        Ok(())
    }

    #[test]
    fn empty_pkg_overrides_do_not_force_release_rewrite() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.package_type = PackageType::Deb;
        request.pkg_version = Some(String::new());
        request.pkg_distro = Some(String::new());

        let build = request.resolve(&client)?;

        assert!(!build.release_override);
        assert_eq!(build.pkg_version, "1");
        assert_eq!(build.pkg_distro, "");

        Ok(())
    }

    #[test]
    fn dist_tag_parsing() {
        assert_eq!(parse_dist_tag(".el7\n").unwrap(), "el7");
        assert_eq!(parse_dist_tag(".fc38").unwrap(), "fc38");
        assert!(matches!(
            parse_dist_tag("\n"),
            Err(PackagingError::EnvironmentResolution(_))
        ));
    }

    #[test]
    fn pkg_version_override_wins() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.pkg_version = Some("2".to_string());

        let build = request.resolve(&client)?;

        assert_eq!(build.pkg_version, "2");
        assert!(build.release_override);

        Ok(())
    }

    #[test]
    fn template_path_without_type_is_an_error() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.spec_template_path = Some(PathBuf::from("custom.spec.hbs"));

        assert!(matches!(
            request.resolve(&client),
            Err(PackagingError::SpecTemplateTypeMissing)
        ));

        Ok(())
    }

    #[test]
    fn template_type_without_path_is_an_error() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.spec_template_type = Some("handlebars".to_string());

        assert!(matches!(
            request.resolve(&client),
            Err(PackagingError::SpecTemplatePathMissing)
        ));

        Ok(())
    }

    #[test]
    fn unsupported_template_type_is_an_error() -> crate::Result<()> {
        let client = get_http_client()?;

        let mut request = fully_specified_request();
        request.spec_template_path = Some(PathBuf::from("custom.spec.tmpl"));
        request.spec_template_type = Some("cheetah".to_string());

        assert!(matches!(
            request.resolve(&client),
            Err(PackagingError::SpecTemplateTypeUnsupported(_))
        ));

        Ok(())
    }

    #[test]
    fn artifact_names() -> crate::Result<()> {
        let client = get_http_client()?;
        let build = fully_specified_request().resolve(&client)?;

        assert_eq!(build.distro_tar_name(), "karaf-8.4.0-1.tar.gz");
        assert_eq!(build.spec_file_name(), "opendaylight-8.4.0-1.spec");
        assert_eq!(build.rpm_file_name(), "opendaylight-8.4.0-1.el7.noarch.rpm");
        assert_eq!(build.srpm_file_name(), "opendaylight-8.4.0-1.el7.src.rpm");
        assert_eq!(build.deb_file_name(), "opendaylight_8.4.0-1_all.deb");
        assert_eq!(build.sysd_commit_short(), "86f5a443");
        assert_eq!(
            build.unitfile_tar_name(),
            "opendaylight-systemd-86f5a443.tar.gz"
        );

        Ok(())
    }

    #[test]
    fn prefix_and_java_derivation() {
        assert_eq!(distro_name_prefix("6"), "distribution-karaf");
        assert_eq!(distro_name_prefix("7"), "karaf");
        assert_eq!(distro_name_prefix("13"), "karaf");
        assert_eq!(java_version("4"), "7");
        assert_eq!(java_version("8"), "8");
        assert_eq!(java_version("13"), "11");
    }
}
