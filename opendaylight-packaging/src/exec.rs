// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! External tool invocation. */

use {
    crate::error::{PackagingError, Result},
    log::warn,
    std::io::{BufRead, BufReader},
};

/// Run an external tool, streaming its output through the logger.
///
/// A non-zero exit is surfaced as [PackagingError::ToolFailure]; there is
/// no retry.
pub(crate) fn run_tool(tool: &'static str, expression: duct::Expression) -> Result<()> {
    let reader = expression
        .stderr_to_stdout()
        .unchecked()
        .reader()
        .map_err(|e| PackagingError::ToolIo(tool, e))?;

    {
        let lines = BufReader::new(&reader);
        for line in lines.lines() {
            warn!("{}", line.map_err(|e| PackagingError::ToolIo(tool, e))?);
        }
    }

    let output = reader
        .try_wait()
        .map_err(|e| PackagingError::ToolIo(tool, e))?
        .ok_or_else(|| {
            PackagingError::ToolIo(
                tool,
                std::io::Error::new(std::io::ErrorKind::Other, "unable to wait on command"),
            )
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(PackagingError::ToolFailure(
            tool,
            output.status.code().unwrap_or(-1),
        ))
    }
}
