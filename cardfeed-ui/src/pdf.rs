//! PDF report launcher
//!
//! Fetches the generated report and hands it to a viewer. The payload lives
//! in a short-lived temporary file (the "object URL") that is deleted once
//! the viewer has had time to load it.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};
use url::Url;

use cardfeed_common::config::ClientConfig;

use crate::fetch;
use crate::sink::RenderSink;
use crate::Result;

/// Alert shown when the report could not be opened
pub const PDF_FAILURE_ALERT: &str = "Failed to generate PDF. Please try again.";

/// Something that can show a document in a new tab/window
pub trait PdfViewer {
    type Tab: ViewerTab;

    /// Open an empty tab up front, before the (possibly slow) download
    fn open_blank(&mut self) -> io::Result<Self::Tab>;
}

/// A tab returned by [`PdfViewer::open_blank`]
pub trait ViewerTab {
    fn navigate(&mut self, url: &str) -> io::Result<()>;
}

/// Opens documents with the desktop's default handler
#[derive(Debug, Default)]
pub struct SystemViewer;

/// Tab of the [`SystemViewer`]; nothing is shown until it navigates
#[derive(Debug)]
pub struct SystemTab;

impl PdfViewer for SystemViewer {
    type Tab = SystemTab;

    fn open_blank(&mut self) -> io::Result<SystemTab> {
        Ok(SystemTab)
    }
}

impl ViewerTab for SystemTab {
    fn navigate(&mut self, url: &str) -> io::Result<()> {
        let mut command = if cfg!(target_os = "macos") {
            tokio::process::Command::new("open")
        } else if cfg!(target_os = "windows") {
            let mut command = tokio::process::Command::new("cmd");
            command.args(["/C", "start", ""]);
            command
        } else {
            tokio::process::Command::new("xdg-open")
        };

        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        debug!("Opened {} with system viewer", url);
        Ok(())
    }
}

/// Transient file-backed reference to a fetched payload
#[derive(Debug)]
pub struct ObjectUrl {
    file: NamedTempFile,
    url: String,
}

impl ObjectUrl {
    /// Write `bytes` to a new temporary `.pdf` file
    pub fn create(bytes: &[u8]) -> io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("cardfeed-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let url = file_url(file.path())?.to_string();
        Ok(Self { file, url })
    }

    pub fn as_str(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the backing file
    pub fn revoke(self) -> io::Result<()> {
        self.file.close()
    }
}

/// `file://` URL for an absolute path, percent-encoded
pub fn file_url(path: &Path) -> io::Result<Url> {
    Url::from_file_path(path).map_err(|()| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Not an absolute path: {}", path.display()),
        )
    })
}

/// Fetch-and-open for the generated PDF report
pub struct PdfLauncher<V: PdfViewer> {
    http: reqwest::Client,
    url: String,
    request_timeout: Duration,
    object_url_ttl: Duration,
    viewer: V,
}

impl<V: PdfViewer> PdfLauncher<V> {
    pub fn new(http: reqwest::Client, config: &ClientConfig, viewer: V) -> Self {
        Self {
            http,
            url: config.pdf_url(),
            request_timeout: config.request_timeout(),
            object_url_ttl: config.object_url_ttl(),
            viewer,
        }
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    /// Fetch the report and open it in a new tab
    ///
    /// On failure the error is logged and an alert goes to `sink`. On
    /// success returns the path of the temporary file, which is deleted
    /// after the configured TTL.
    pub async fn generate<S: RenderSink>(&mut self, sink: &mut S) -> Option<PathBuf> {
        match self.open_report().await {
            Ok(object_url) => {
                let path = object_url.path().to_path_buf();
                info!("Opened PDF report {}", object_url.as_str());
                self.schedule_revoke(object_url);
                Some(path)
            }
            Err(e) => {
                error!("Error generating PDF: {}", e);
                sink.alert(PDF_FAILURE_ALERT);
                None
            }
        }
    }

    async fn open_report(&mut self) -> Result<ObjectUrl> {
        // A tab that fails to open only matters once there is something to show
        let tab = self.viewer.open_blank();

        let bytes = fetch::fetch_bytes(&self.http, &self.url, self.request_timeout).await?;
        let object_url = ObjectUrl::create(&bytes)?;

        let mut tab = tab?;
        tab.navigate(object_url.as_str())?;

        Ok(object_url)
    }

    fn schedule_revoke(&self, object_url: ObjectUrl) {
        let ttl = self.object_url_ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let url = object_url.as_str().to_string();
            match object_url.revoke() {
                Ok(()) => debug!("Revoked {}", url),
                Err(e) => warn!("Failed to revoke {}: {}", url, e),
            }
        });
    }
}
