// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Artifact caching.

Downloaded distributions, unit files, and built packages live in a per-user
cache directory shared across invocations. Artifacts are cached under
normalized names derived from the build descriptor so repeat builds of the
same version reuse earlier downloads.
*/

use {
    crate::{
        build::BuildDescriptor,
        error::{PackagingError, Result},
        http::download,
    },
    log::warn,
    std::{
        fs::File,
        path::{Path, PathBuf},
    },
};

/// Obtain the cache directory, creating it if missing.
pub fn default_cache_dir() -> Result<PathBuf> {
    let dir = dirs::cache_dir()
        .ok_or(PackagingError::EnvironmentResolution("user cache directory"))?
        .join("opendaylight-packaging");

    std::fs::create_dir_all(&dir)
        .map_err(|e| PackagingError::IoPath(dir.display().to_string(), e))?;

    Ok(dir)
}

/// Download the distribution tarball into the cache, reusing an existing
/// copy, and return its path.
///
/// The tarball is cached under its normalized name unless the build asks to
/// keep the original archive name.
pub fn cache_distribution(
    client: &reqwest::blocking::Client,
    build: &BuildDescriptor,
    cache_dir: &Path,
) -> Result<PathBuf> {
    let name = if build.keep_distro_name {
        url_file_name(&build.download_url).unwrap_or_else(|| build.distro_tar_name())
    } else {
        build.distro_tar_name()
    };

    let dest_path = cache_dir.join(name);

    if dest_path.exists() {
        warn!("reusing cached distribution {}", dest_path.display());
        return Ok(dest_path);
    }

    let data = download(client, &build.download_url)?;
    std::fs::write(&dest_path, data)
        .map_err(|e| PackagingError::IoPath(dest_path.display().to_string(), e))?;

    Ok(dest_path)
}

/// Download the systemd unit file into the cache and return the path of the
/// cached artifact.
///
/// rpmbuild consumes the unit file as a tarball source, so by default the
/// downloaded file is wrapped in a gzipped tar archive whose single member
/// is `<name>/opendaylight.service`. When the build asks to keep the
/// original file name the download is cached as-is instead.
pub fn cache_unit_file(
    client: &reqwest::blocking::Client,
    build: &BuildDescriptor,
    cache_dir: &Path,
) -> Result<PathBuf> {
    if build.keep_service_file_name {
        let name =
            url_file_name(&build.service_file_url).unwrap_or_else(|| "opendaylight.service".to_string());
        let dest_path = cache_dir.join(name);

        if dest_path.exists() {
            warn!("reusing cached unit file {}", dest_path.display());
            return Ok(dest_path);
        }

        let data = download(client, &build.service_file_url)?;
        std::fs::write(&dest_path, data)
            .map_err(|e| PackagingError::IoPath(dest_path.display().to_string(), e))?;

        return Ok(dest_path);
    }

    let dest_path = cache_dir.join(build.unitfile_tar_name());

    if dest_path.exists() {
        warn!("reusing cached unit file archive {}", dest_path.display());
        return Ok(dest_path);
    }

    let data = download(client, &build.service_file_url)?;
    let member_dir = format!("opendaylight-systemd-{}", build.sysd_commit_short());

    write_unit_file_archive(&dest_path, &member_dir, &data)?;

    Ok(dest_path)
}

/// Write a gzipped tar archive containing a single
/// `<member_dir>/opendaylight.service` member.
pub fn write_unit_file_archive(dest_path: &Path, member_dir: &str, data: &[u8]) -> Result<()> {
    let file = File::create(dest_path)
        .map_err(|e| PackagingError::IoPath(dest_path.display().to_string(), e))?;
    let encoder = libflate::gzip::Encoder::new(file)?;
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
    );
    header.set_cksum();

    builder.append_data(
        &mut header,
        format!("{}/opendaylight.service", member_dir),
        data,
    )?;

    let encoder = builder.into_inner()?;
    encoder.finish().into_result()?;

    Ok(())
}

/// Copy a file into a directory, keeping its name, and return the new path.
pub(crate) fn copy_into(path: &Path, dir: &Path) -> Result<PathBuf> {
    let dest = dir.join(path.file_name().ok_or_else(|| {
        PackagingError::IoPath(
            path.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })?);

    std::fs::copy(path, &dest)
        .map_err(|e| PackagingError::IoPath(path.display().to_string(), e))?;

    Ok(dest)
}

/// The file name component of a path, lossily decoded.
pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// The file name component of a URL, with any query string stripped.
fn url_file_name(url: &str) -> Option<String> {
    let name = url.rsplit('/').next()?.split('?').next()?;

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::testutil::DEFAULT_TEMP_DIR, std::io::Read};

    #[test]
    fn unit_file_archive_round_trips() -> Result<()> {
        let dest = DEFAULT_TEMP_DIR.path().join("unitfile.tar.gz");
        let unit = b"[Unit]\nDescription=OpenDaylight SDN Controller\n";

        write_unit_file_archive(&dest, "opendaylight-systemd-86f5a443", unit)?;

        let decoder = libflate::gzip::Decoder::new(File::open(&dest)?)?;
        let mut archive = tar::Archive::new(decoder);

        let mut entries = archive.entries()?;
        let mut entry = entries.next().expect("archive has a member")?;

        assert_eq!(
            entry.path()?.display().to_string(),
            "opendaylight-systemd-86f5a443/opendaylight.service"
        );

        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        assert_eq!(content, unit);

        assert!(entries.next().is_none());

        Ok(())
    }

    #[test]
    fn url_file_names() {
        assert_eq!(
            url_file_name("https://example.com/dir/karaf-0.8.4.tar.gz").as_deref(),
            Some("karaf-0.8.4.tar.gz")
        );
        assert_eq!(
            url_file_name("https://example.com/file.service?rev=abc").as_deref(),
            Some("file.service")
        );
        assert_eq!(url_file_name("https://example.com/dir/"), None);
    }
}
