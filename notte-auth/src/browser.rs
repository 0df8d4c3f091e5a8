//! Launching the user's browser.

use tracing::{debug, warn};

/// Opens `url` in the default browser without waiting for it to exit.
///
/// Uses `open` on macOS, `xdg-open` (and friends) on Linux and the URL
/// protocol handler on Windows.
///
/// # Errors
///
/// Returns the launcher's error when no browser could be started.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    debug!(url = %url, "Opening browser");
    open::that_detached(url).inspect_err(|e| {
        warn!(url = %url, error = %e, "Failed to open browser");
    })
}
