// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RPM build driver. */

use {
    crate::{
        build::BuildDescriptor,
        cache::{self, copy_into, file_name},
        error::{PackagingError, Result},
        exec::run_tool,
        templates::{render_rpm_spec, TemplateContext},
    },
    duct::cmd,
    log::warn,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
    },
};

/// Paths of the packages an RPM build produced, after being copied back
/// into the cache directory.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RpmArtifacts {
    pub rpm_path: PathBuf,
    pub srpm_path: PathBuf,
}

/// Entity used to build RPMs by calling into `rpmbuild`.
///
/// Instances are bound to a [BuildDescriptor]. When we [RpmBuilder::build],
/// we stage sources into the rpmbuild tree, render the spec file, invoke
/// `rpmbuild -ba`, and copy the resulting RPM and SRPM into the cache
/// directory.
#[derive(Clone, Debug)]
pub struct RpmBuilder {
    build: BuildDescriptor,
    rpmbuild_dir: PathBuf,
    conventional_tree: bool,
    cache_dir: PathBuf,
}

impl RpmBuilder {
    /// Create a builder targeting the conventional `~/rpmbuild` tree and the
    /// default cache directory.
    pub fn new(build: BuildDescriptor) -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or(PackagingError::EnvironmentResolution("home directory"))?;

        Ok(Self {
            build,
            rpmbuild_dir: home.join("rpmbuild"),
            conventional_tree: true,
            cache_dir: cache::default_cache_dir()?,
        })
    }

    /// Override the rpmbuild tree location.
    ///
    /// `rpmdev-setuptree` only manages `~/rpmbuild`, so an overridden tree
    /// is created directly and `_topdir` is pinned on the rpmbuild command
    /// line.
    #[must_use]
    pub fn rpmbuild_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.rpmbuild_dir = dir.as_ref().to_path_buf();
        self.conventional_tree = false;
        self
    }

    /// Override the cache directory.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Build the RPMs described by the bound build descriptor.
    pub fn build(mut self, client: &reqwest::blocking::Client) -> Result<RpmArtifacts> {
        if self.build.clean_builddir && self.rpmbuild_dir.exists() {
            warn!("purging {}", self.rpmbuild_dir.display());
            remove_dir_all::remove_dir_all(&self.rpmbuild_dir)
                .map_err(|e| PackagingError::IoPath(self.rpmbuild_dir.display().to_string(), e))?;
        }

        if self.conventional_tree {
            run_tool("rpmdev-setuptree", cmd("rpmdev-setuptree", Vec::<OsString>::new()))?;
        }

        let sources_dir = self.rpmbuild_dir.join("SOURCES");
        let specs_dir = self.rpmbuild_dir.join("SPECS");
        for name in ["BUILD", "RPMS", "SOURCES", "SPECS", "SRPMS"] {
            let dir = self.rpmbuild_dir.join(name);
            std::fs::create_dir_all(&dir)
                .map_err(|e| PackagingError::IoPath(dir.display().to_string(), e))?;
        }

        let distro_tar_path = cache::cache_distribution(client, &self.build, &self.cache_dir)?;
        let unitfile_tar_path = cache::cache_unit_file(client, &self.build, &self.cache_dir)?;

        for path in [&distro_tar_path, &unitfile_tar_path]
            .into_iter()
            .chain(self.build.extra_src_files.iter())
        {
            copy_into(path, &sources_dir)?;
        }

        let context = TemplateContext::new(
            &self.build,
            file_name(&distro_tar_path),
            file_name(&unitfile_tar_path),
        );
        let spec = render_rpm_spec(&context)?;

        // A custom template may carry its own version; artifact names must
        // agree with what rpmbuild reads from the spec.
        let (version_major, version_minor) = (spec.version_major, spec.version_minor);
        if version_major != self.build.version_major {
            self.build.version_major = version_major;
        }
        if version_minor != self.build.version_minor {
            self.build.version_minor = version_minor;
        }

        let spec_path = specs_dir.join(self.build.spec_file_name());
        std::fs::write(&spec_path, spec.content)
            .map_err(|e| PackagingError::IoPath(spec_path.display().to_string(), e))?;

        run_tool(
            "rpmbuild",
            cmd("rpmbuild", rpmbuild_args(&self.rpmbuild_dir, &spec_path)),
        )?;

        let rpm_out_path = self
            .rpmbuild_dir
            .join("RPMS")
            .join("noarch")
            .join(self.build.rpm_file_name());
        let srpm_out_path = self.rpmbuild_dir.join("SRPMS").join(self.build.srpm_file_name());

        Ok(RpmArtifacts {
            rpm_path: copy_into(&rpm_out_path, &self.cache_dir)?,
            srpm_path: copy_into(&srpm_out_path, &self.cache_dir)?,
        })
    }
}

/// Arguments for an `rpmbuild` invocation against a specific tree.
///
/// `_topdir` is always pinned so the invocation and the staged sources
/// can never disagree about the tree in use.
fn rpmbuild_args(rpmbuild_dir: &Path, spec_path: &Path) -> Vec<OsString> {
    vec![
        OsString::from("--define"),
        OsString::from(format!("_topdir {}", rpmbuild_dir.display())),
        OsString::from("-ba"),
        spec_path.as_os_str().to_os_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpmbuild_invocation_pins_topdir() {
        let args = rpmbuild_args(
            Path::new("/tmp/tree"),
            Path::new("/tmp/tree/SPECS/opendaylight-8.4.0-1.spec"),
        );

        assert_eq!(
            args,
            vec![
                OsString::from("--define"),
                OsString::from("_topdir /tmp/tree"),
                OsString::from("-ba"),
                OsString::from("/tmp/tree/SPECS/opendaylight-8.4.0-1.spec"),
            ]
        );
    }
}
