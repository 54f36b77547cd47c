// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {once_cell::sync::Lazy, tempfile::TempDir};

pub static DEFAULT_TEMP_DIR: Lazy<TempDir> = Lazy::new(|| {
    tempfile::Builder::new()
        .prefix("opendaylight-packaging-test")
        .tempdir()
        .expect("unable to create temporary directory")
});
