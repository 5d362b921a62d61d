use crate::error::Result;
use crate::models::config::DatabaseConfig;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Short-lived MariaDB option file holding the `[client]` login.
///
/// The file is created owner-read/write only. On drop its contents are
/// overwritten with zeros before it is unlinked, so the password does not
/// outlive the handle on any return path.
pub struct CredentialFile {
    file: Option<NamedTempFile>,
}

impl CredentialFile {
    pub fn create(cfg: &DatabaseConfig) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("fleet-runner-")
            .suffix(".cnf")
            .tempfile()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(render_option_file(cfg).as_bytes())?;
        file.flush()?;
        debug!("🔐 Wrote client credentials to {}", file.path().display());

        Ok(Self { file: Some(file) })
    }

    pub fn path(&self) -> &Path {
        match &self.file {
            Some(file) => file.path(),
            None => Path::new(""),
        }
    }

    /// Shreds and removes the file now instead of waiting for drop.
    pub fn invalidate(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = shred(file.path()) {
                warn!("⚠️  Failed to shred {}: {}", file.path().display(), e);
            }
            if let Err(e) = file.close() {
                warn!("⚠️  Failed to remove credential file: {}", e);
            }
        }
    }
}

impl Drop for CredentialFile {
    fn drop(&mut self) {
        self.invalidate();
    }
}

fn shred(path: &Path) -> std::io::Result<()> {
    let len = std::fs::metadata(path)?.len() as usize;
    let mut f = OpenOptions::new().write(true).open(path)?;
    f.write_all(&vec![0u8; len])?;
    f.sync_all()
}

/// The `[client]` group. Values are double-quoted with `\` and `"` escaped,
/// which the option-file parser understands.
pub fn render_option_file(cfg: &DatabaseConfig) -> String {
    format!(
        "[client]\nhost=\"{}\"\nport={}\nuser=\"{}\"\npassword=\"{}\"\n",
        escape_option(&cfg.host),
        cfg.port,
        escape_option(&cfg.user),
        escape_option(&cfg.password)
    )
}

fn escape_option(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
