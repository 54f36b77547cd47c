// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian build driver. */

use {
    crate::{
        build::BuildDescriptor,
        cache::{self, copy_into, file_name},
        error::{PackagingError, Result},
        exec::run_tool,
        http::download,
        templates::{render_debian_dir, TemplateContext},
    },
    duct::cmd,
    log::warn,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
    },
};

/// Entity used to build .deb packages by calling into `dpkg-buildpackage`.
///
/// Instances are bound to a [BuildDescriptor]. When we [DebBuilder::build],
/// we lay out a source package directory with a rendered `debian/` tree,
/// stage the distribution tarball, invoke `dpkg-buildpackage -us -uc -b`,
/// and copy the resulting .deb into the cache directory.
#[derive(Clone, Debug)]
pub struct DebBuilder {
    build: BuildDescriptor,
    work_dir: PathBuf,
    cache_dir: PathBuf,
}

impl DebBuilder {
    /// Create a builder working under the default cache directory.
    pub fn new(build: BuildDescriptor) -> Result<Self> {
        let cache_dir = cache::default_cache_dir()?;

        Ok(Self {
            build,
            work_dir: cache_dir.join("deb"),
            cache_dir,
        })
    }

    /// Override the directory the source package is laid out in.
    #[must_use]
    pub fn work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Override the cache directory.
    #[must_use]
    pub fn cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Build the .deb described by the bound build descriptor and return
    /// its path in the cache directory.
    pub fn build(self, client: &reqwest::blocking::Client) -> Result<PathBuf> {
        let package_dir = self
            .work_dir
            .join(format!("opendaylight-{}", self.build.version_string()));

        if self.build.clean_builddir && package_dir.exists() {
            warn!("purging {}", package_dir.display());
            remove_dir_all::remove_dir_all(&package_dir)
                .map_err(|e| PackagingError::IoPath(package_dir.display().to_string(), e))?;
        }

        std::fs::create_dir_all(&package_dir)
            .map_err(|e| PackagingError::IoPath(package_dir.display().to_string(), e))?;

        let distro_tar_path = cache::cache_distribution(client, &self.build, &self.cache_dir)?;
        let staged_tar_path = copy_into(&distro_tar_path, &package_dir)?;

        for path in &self.build.extra_src_files {
            copy_into(path, &package_dir)?;
        }

        let unit_file = download(client, &self.build.service_file_url)?;

        let context = TemplateContext::new(
            &self.build,
            file_name(&staged_tar_path),
            self.build.unitfile_tar_name(),
        );
        render_debian_dir(&context, &package_dir, &unit_file)?;

        run_tool(
            "dpkg-buildpackage",
            cmd(
                "dpkg-buildpackage",
                vec![
                    OsString::from("-us"),
                    OsString::from("-uc"),
                    OsString::from("-b"),
                ],
            )
            .dir(&package_dir),
        )?;

        // dpkg-buildpackage writes artifacts to the parent of the package
        // directory.
        let deb_out_path = self.work_dir.join(self.build.deb_file_name());

        copy_into(&deb_out_path, &self.cache_dir)
    }
}
