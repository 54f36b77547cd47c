// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! OpenDaylight distribution packaging primitives.

This crate automates packaging of prebuilt OpenDaylight distributions (a
Karaf tarball plus a systemd unit file) as RPM or Debian packages. It does
not reimplement the platform packaging tools: `rpmbuild`,
`rpmdev-setuptree`, and `dpkg-buildpackage` are invoked as external
commands and their exit codes propagated.

# A Tour of Functionality

Everything downstream consumes a *build descriptor*, a fully-resolved
description of a single packaging run. [build::BuildRequest] holds the raw
inputs (typically straight from a CLI) and [build::BuildRequest::resolve]
turns them into a [build::BuildDescriptor] by filling defaults, deriving
version metadata from the distribution URL, and discovering values the
caller omitted.

The [version] module extracts OpenDaylight version components and a default
package version from a distribution tarball URL. The [snapshot] module
discovers the latest snapshot build of a given major version by walking
Maven repository metadata on the OpenDaylight Nexus.

The [cache] module maintains a per-user artifact cache and knows how to
fetch the distribution tarball and the systemd unit file into it. The
[templates] module renders the RPM spec file and the `debian/` directory
from built-in (or user-supplied) Handlebars templates.

[rpm::RpmBuilder] and [deb::DebBuilder] drive the actual package builds,
staging sources, rendering manifests, and shelling out to the native
toolchain.
*/

pub mod build;
pub mod cache;
pub mod deb;
pub mod error;
mod exec;
pub mod http;
pub mod rpm;
pub mod snapshot;
pub mod templates;
pub mod testutil;
pub mod version;

pub use crate::error::{PackagingError, Result};
