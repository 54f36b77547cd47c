// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    anyhow::{anyhow, Result},
    clap::{Arg, ArgGroup, ArgMatches, Command},
    log::LevelFilter,
    opendaylight_packaging::{
        build::{BuildLocation, BuildRequest, PackageType},
        deb::DebBuilder,
        http::get_http_client,
        rpm::RpmBuilder,
    },
    std::path::PathBuf,
};

const ABOUT: &str = "\
Package OpenDaylight builds as RPM/deb.

Given a prebuilt OpenDaylight distribution tarball and a systemd unit
file, this tool renders the platform package manifest and drives the
native packaging toolchain (rpmbuild or dpkg-buildpackage) to produce
installable packages.

Every invocation names a package type (--rpm or --deb) and a build
location: `direct` packages the archive at a given URL, `latest-snap`
discovers and packages the most recent snapshot build of a given major
version.
";

const DIRECT_ABOUT: &str = "\
Package the build archive at a URL.

The download URL must point at a distribution tarball whose file name
carries the version, e.g.
karaf-0.8.4.tar.gz or karaf-0.9.0-20180807.132015-123.tar.gz. Version
components and the default package version are derived from it.

Artifacts are staged under their normalized names unless
--keep-distro-name / --keep-service-file-name ask for the original
names to be preserved.
";

const LATEST_SNAP_ABOUT: &str = "\
Package the latest snapshot build of a given major version.

The OpenDaylight Nexus snapshot repository is walked to find the most
recent snapshot build of the major version, and that tarball is
packaged as if its URL had been passed to `direct`.
";

pub fn run_cli() -> Result<()> {
    let app = Command::new("OpenDaylight Package Tool")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Daniel Farrell <dfarrell07@gmail.com>")
        .about("Package OpenDaylight builds as RPM/deb")
        .long_about(ABOUT)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(Arg::new("rpm").long("rpm").help("Package build as RPM"))
        .arg(Arg::new("deb").long("deb").help("Package build as deb"))
        .group(
            ArgGroup::new("package_type")
                .args(&["rpm", "deb"])
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("sysd_commit")
                .long("sysd-commit")
                .takes_value(true)
                .help("Commit of the systemd unit file to package"),
        )
        .arg(
            Arg::new("changelog_name")
                .long("changelog-name")
                .takes_value(true)
                .help("Name of person who defined package"),
        )
        .arg(
            Arg::new("changelog_email")
                .long("changelog-email")
                .takes_value(true)
                .help("Email of person who defined package"),
        )
        .subcommand(
            Command::new("direct")
                .about("Package build at URL")
                .long_about(DIRECT_ABOUT)
                .arg(
                    Arg::new("download_url")
                        .long("download-url")
                        .required(true)
                        .takes_value(true)
                        .value_name("URL")
                        .help("URL to tarball build archive to package"),
                )
                .arg(
                    Arg::new("service_file_url")
                        .long("service-file-url")
                        .takes_value(true)
                        .value_name("URL")
                        .help("URL to .service file"),
                )
                .arg(
                    Arg::new("distro_name_prefix")
                        .long("distro-name-prefix")
                        .takes_value(true)
                        .help("Distribution name prefix (default derived from major version)"),
                )
                .arg(
                    Arg::new("keep_distro_name")
                        .long("keep-distro-name")
                        .help("Keep the original distribution archive name when staging sources"),
                )
                .arg(
                    Arg::new("keep_service_file_name")
                        .long("keep-service-file-name")
                        .help("Keep the original service file name/format"),
                )
                .arg(
                    Arg::new("pkg_version")
                        .long("pkg-version")
                        .takes_value(true)
                        .help("Version of the package to build (default derived from URL)"),
                )
                .arg(
                    Arg::new("pkg_distro")
                        .long("pkg-distro")
                        .takes_value(true)
                        .help("Distro tag of the package to build (default discovered)"),
                )
                .arg(
                    Arg::new("spec_template_path")
                        .long("spec-template-path")
                        .takes_value(true)
                        .value_name("PATH")
                        .help("Path to spec template used in RPM packaging"),
                )
                .arg(
                    Arg::new("spec_template_type")
                        .long("spec-template-type")
                        .takes_value(true)
                        .help("Templating engine the spec template is written in"),
                )
                .arg(
                    Arg::new("no_clean_builddir")
                        .long("no-clean-builddir")
                        .help("Do not clean the build directory before building"),
                )
                .arg(
                    Arg::new("extra_src_files")
                        .long("extra-src-files")
                        .takes_value(true)
                        .help("Comma-delimited paths of extra files to stage as sources"),
                ),
        )
        .subcommand(
            Command::new("latest-snap")
                .about("Package latest snapshot build of given major version")
                .long_about(LATEST_SNAP_ABOUT)
                .arg(
                    Arg::new("major")
                        .long("major")
                        .required(true)
                        .takes_value(true)
                        .help("Major version to package latest snapshot of"),
                ),
        );

    let matches = app.get_matches();

    let log_level = if matches.is_present("verbose") {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );
    builder
        .format_timestamp(None)
        .format_level(false)
        .format_target(false);
    builder.init();

    let package_type = if matches.is_present("rpm") {
        PackageType::Rpm
    } else {
        PackageType::Deb
    };

    match matches.subcommand() {
        Some(("direct", args)) => {
            let mut request = BuildRequest::new(
                package_type,
                BuildLocation::Direct {
                    download_url: args.value_of("download_url").unwrap().to_string(),
                },
            );
            apply_common_args(&mut request, &matches);

            request.service_file_url = args.value_of("service_file_url").map(String::from);
            request.distro_name_prefix = args.value_of("distro_name_prefix").map(String::from);
            request.keep_distro_name = args.is_present("keep_distro_name");
            request.keep_service_file_name = args.is_present("keep_service_file_name");
            request.pkg_version = args.value_of("pkg_version").map(String::from);
            request.pkg_distro = args.value_of("pkg_distro").map(String::from);
            request.spec_template_path = args.value_of("spec_template_path").map(PathBuf::from);
            request.spec_template_type = args.value_of("spec_template_type").map(String::from);
            request.clean_builddir = !args.is_present("no_clean_builddir");
            request.extra_src_files = args
                .value_of("extra_src_files")
                .map(|v| v.split(',').map(PathBuf::from).collect())
                .unwrap_or_default();

            run_build(request)
        }

        Some(("latest-snap", args)) => {
            let mut request = BuildRequest::new(
                package_type,
                BuildLocation::LatestSnapshot {
                    version_major: args.value_of("major").unwrap().to_string(),
                },
            );
            apply_common_args(&mut request, &matches);

            run_build(request)
        }

        _ => Err(anyhow!("invalid sub-command")),
    }
}

fn apply_common_args(request: &mut BuildRequest, matches: &ArgMatches) {
    request.changelog_name = matches.value_of("changelog_name").map(String::from);
    request.changelog_email = matches.value_of("changelog_email").map(String::from);
    request.sysd_commit = matches.value_of("sysd_commit").map(String::from);
}

fn run_build(request: BuildRequest) -> Result<()> {
    let client = get_http_client()?;
    let build = request.resolve(&client)?;

    match build.package_type {
        PackageType::Rpm => {
            let artifacts = RpmBuilder::new(build)?.build(&client)?;

            println!("wrote {}", artifacts.rpm_path.display());
            println!("wrote {}", artifacts.srpm_path.display());
        }
        PackageType::Deb => {
            let deb_path = DebBuilder::new(build)?.build(&client)?;

            println!("wrote {}", deb_path.display());
        }
    }

    Ok(())
}
