// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Package manifest rendering.

Built-in Handlebars templates for the RPM spec file and the `debian/`
packaging directory are embedded in the crate. RPM builds can substitute a
user-supplied spec template; in that case the rendered output gets the same
post-processing the original external-template path had: the `Release:`
line is overridden when the caller pinned a package version or distro, and
the `Version:` line is parsed back so artifact names follow the spec
rather than the URL.
*/

use {
    crate::{
        build::{BuildDescriptor, SpecTemplate},
        error::{PackagingError, Result},
    },
    handlebars::Handlebars,
    once_cell::sync::Lazy,
    regex::Regex,
    serde::Serialize,
    std::path::Path,
};

pub static HANDLEBARS: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();

    // Manifests are plain text, not HTML.
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string(
            "opendaylight.spec",
            include_str!("templates/opendaylight.spec.hbs"),
        )
        .unwrap();
    handlebars
        .register_template_string(
            "debian-changelog",
            include_str!("templates/debian-changelog.hbs"),
        )
        .unwrap();
    handlebars
        .register_template_string(
            "debian-control",
            include_str!("templates/debian-control.hbs"),
        )
        .unwrap();
    handlebars
        .register_template_string("debian-rules", include_str!("templates/debian-rules.hbs"))
        .unwrap();

    handlebars
});

static RELEASE_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Release:.*$").unwrap());
static VERSION_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Version:\s*(\d+)\.(\d+)\.(\d+)").unwrap());

/// Data fed to manifest templates: the build descriptor plus the resolved
/// artifact names downstream steps staged.
#[derive(Clone, Debug, Serialize)]
pub struct TemplateContext<'a> {
    #[serde(flatten)]
    pub build: &'a BuildDescriptor,

    pub distro_tar_name: String,
    pub distro_stem: String,
    pub unitfile_tar_name: String,
    pub unitfile_stem: String,
    pub deb_version: String,
}

impl<'a> TemplateContext<'a> {
    /// Construct a context from a descriptor and the staged artifact names.
    pub fn new(
        build: &'a BuildDescriptor,
        distro_tar_name: String,
        unitfile_tar_name: String,
    ) -> Self {
        let distro_stem = stem(&distro_tar_name);
        let unitfile_stem = stem(&unitfile_tar_name);

        Self {
            build,
            distro_tar_name,
            distro_stem,
            unitfile_tar_name,
            unitfile_stem,
            deb_version: build.deb_version(),
        }
    }
}

fn stem(name: &str) -> String {
    name.trim_end_matches(".tar.gz").to_string()
}

/// A rendered RPM spec file.
pub struct RenderedSpec {
    pub content: String,

    /// Version components parsed back out of the rendered spec. A custom
    /// template may disagree with the URL-derived version and artifact
    /// names must follow the spec.
    pub version_major: String,
    pub version_minor: String,
}

/// Render the RPM spec file for a build.
pub fn render_rpm_spec(context: &TemplateContext) -> Result<RenderedSpec> {
    let content = match &context.build.spec_template {
        SpecTemplate::Builtin => HANDLEBARS.render("opendaylight.spec", context)?,
        SpecTemplate::Custom { path } => {
            let template = std::fs::read_to_string(path)
                .map_err(|e| PackagingError::IoPath(path.display().to_string(), e))?;

            let mut content = HANDLEBARS.render_template(&template, context)?;

            if context.build.release_override {
                let release = format!(
                    "Release: {}.{}",
                    context.build.pkg_version, context.build.pkg_distro
                );
                content = RELEASE_LINE_RE
                    .replace(&content, regex::NoExpand(&release))
                    .into_owned();
            }

            content
        }
    };

    let caps = VERSION_LINE_RE
        .captures(&content)
        .ok_or(PackagingError::SpecVersionMissing)?;

    Ok(RenderedSpec {
        version_major: caps[1].to_string(),
        version_minor: caps[2].to_string(),
        content,
    })
}

/// Write the `debian/` directory consumed by dpkg-buildpackage.
///
/// `package_dir` is the root of the source package; `unit_file` is the raw
/// systemd unit file content, installed as `debian/opendaylight.service`.
pub fn render_debian_dir(
    context: &TemplateContext,
    package_dir: &Path,
    unit_file: &[u8],
) -> Result<()> {
    let debian_dir = package_dir.join("debian");
    std::fs::create_dir_all(&debian_dir)
        .map_err(|e| PackagingError::IoPath(debian_dir.display().to_string(), e))?;

    write_file(
        &debian_dir.join("changelog"),
        HANDLEBARS.render("debian-changelog", context)?.as_bytes(),
    )?;
    write_file(
        &debian_dir.join("control"),
        HANDLEBARS.render("debian-control", context)?.as_bytes(),
    )?;
    write_file(&debian_dir.join("compat"), b"10\n")?;
    write_file(&debian_dir.join("opendaylight.service"), unit_file)?;

    let rules_path = debian_dir.join("rules");
    write_file(
        &rules_path,
        HANDLEBARS.render("debian-rules", context)?.as_bytes(),
    )?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(&rules_path, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| PackagingError::IoPath(rules_path.display().to_string(), e))?;
    }

    Ok(())
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).map_err(|e| PackagingError::IoPath(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            build::{PackageType, SpecTemplate},
            testutil::DEFAULT_TEMP_DIR,
        },
        indoc::indoc,
    };

    fn descriptor() -> BuildDescriptor {
        BuildDescriptor {
            package_type: PackageType::Rpm,
            download_url: "https://nexus.opendaylight.org/content/repositories/opendaylight.release/org/opendaylight/integration/karaf/0.8.4/karaf-0.8.4.tar.gz".to_string(),
            version_major: "8".to_string(),
            version_minor: "4".to_string(),
            version_patch: "0".to_string(),
            pkg_version: "1".to_string(),
            pkg_distro: "el7".to_string(),
            release_override: false,
            distro_name_prefix: "karaf".to_string(),
            java_version: "8".to_string(),
            changelog_name: "A Packager".to_string(),
            changelog_email: "packager@example.com".to_string(),
            changelog_date: "Wed Aug 26 2026".to_string(),
            sysd_commit: "86f5a44339e3d0764c218d42985409f7c71e55b5".to_string(),
            service_file_url: crate::build::unit_file_url("86f5a44339e3d0764c218d42985409f7c71e55b5"),
            keep_distro_name: false,
            keep_service_file_name: false,
            spec_template: SpecTemplate::Builtin,
            clean_builddir: true,
            extra_src_files: vec![],
        }
    }

    fn context(build: &BuildDescriptor) -> TemplateContext {
        TemplateContext::new(
            build,
            build.distro_tar_name(),
            build.unitfile_tar_name(),
        )
    }

    #[test]
    fn render_builtin_spec() -> Result<()> {
        let build = descriptor();
        let spec = render_rpm_spec(&context(&build))?;

        assert!(spec.content.contains("Name:       opendaylight"));
        assert!(spec.content.contains("Version:    8.4.0"));
        assert!(spec.content.contains("Release:    1.el7"));
        assert!(spec.content.contains("Source0:    karaf-8.4.0-1.tar.gz"));
        assert!(spec
            .content
            .contains("Source1:    opendaylight-systemd-86f5a443.tar.gz"));
        assert!(spec.content.contains("java-1.8.0"));
        assert!(spec
            .content
            .contains("* Wed Aug 26 2026 A Packager <packager@example.com> - 8.4.0-1"));

        assert_eq!(spec.version_major, "8");
        assert_eq!(spec.version_minor, "4");

        Ok(())
    }

    #[test]
    fn custom_template_release_override_and_reconciliation() -> Result<()> {
        let template_path = DEFAULT_TEMP_DIR.path().join("custom.spec.hbs");
        std::fs::write(
            &template_path,
            indoc! {"
                Name: opendaylight
                Version: 9.0.0
                Release: 0.standin
                Summary: {{changelog_name}} build
            "},
        )?;

        let mut build = descriptor();
        build.release_override = true;
        build.pkg_version = "2".to_string();
        build.spec_template = SpecTemplate::Custom {
            path: template_path,
        };

        let spec = render_rpm_spec(&context(&build))?;

        assert!(spec.content.contains("Release: 2.el7"));
        assert!(spec.content.contains("Summary: A Packager build"));

        // The template's version wins over the URL-derived one.
        assert_eq!(spec.version_major, "9");
        assert_eq!(spec.version_minor, "0");

        Ok(())
    }

    #[test]
    fn custom_template_without_version_line_is_an_error() -> Result<()> {
        let template_path = DEFAULT_TEMP_DIR.path().join("no-version.spec.hbs");
        std::fs::write(&template_path, "Name: opendaylight\n")?;

        let mut build = descriptor();
        build.spec_template = SpecTemplate::Custom {
            path: template_path,
        };

        assert!(matches!(
            render_rpm_spec(&context(&build)),
            Err(PackagingError::SpecVersionMissing)
        ));

        Ok(())
    }

    #[test]
    fn render_debian_directory() -> Result<()> {
        let mut build = descriptor();
        build.package_type = PackageType::Deb;
        build.changelog_date = "Wed, 26 Aug 2026 12:00:00 +0000".to_string();

        let package_dir = DEFAULT_TEMP_DIR.path().join("opendaylight-8.4.0");
        std::fs::create_dir_all(&package_dir)?;

        let unit = b"[Unit]\nDescription=OpenDaylight SDN Controller\n";
        render_debian_dir(&context(&build), &package_dir, unit)?;

        let changelog = std::fs::read_to_string(package_dir.join("debian/changelog"))?;
        assert!(changelog.starts_with("opendaylight (8.4.0-1) "));
        assert!(changelog.contains("A Packager <packager@example.com>"));
        assert!(changelog.contains("Wed, 26 Aug 2026 12:00:00 +0000"));

        let control = std::fs::read_to_string(package_dir.join("debian/control"))?;
        assert!(control.contains("Package: opendaylight"));
        assert!(control.contains("openjdk-8-jre-headless"));

        let rules = std::fs::read_to_string(package_dir.join("debian/rules"))?;
        assert!(rules.starts_with("#!/usr/bin/make -f"));
        assert!(rules.contains("karaf-8.4.0-1.tar.gz"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = std::fs::metadata(package_dir.join("debian/rules"))?
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        assert_eq!(
            std::fs::read(package_dir.join("debian/opendaylight.service"))?,
            unit
        );
        assert_eq!(std::fs::read_to_string(package_dir.join("debian/compat"))?, "10\n");

        Ok(())
    }
}
