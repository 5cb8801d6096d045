//! Sample source: the line stream produced by the external sampler.
//!
//! The stream comes from one of:
//! - a sampler command spawned here (its stdout)
//! - a file with previously recorded output
//! - standard input

use std::pin::Pin;
use std::process::Stdio;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

use crate::cli::SourceSpec;
use crate::domain::SourceError;

type LineReader = BufReader<Pin<Box<dyn AsyncRead + Send>>>;

/// An open line stream plus the sampler process feeding it, if any.
pub struct SampleSource {
    reader: LineReader,
    /// Bytes of the line being read; survives a cancelled read
    partial: Vec<u8>,
    child: Option<Child>,
    description: String,
}

impl SampleSource {
    /// Open the stream described by `spec`.
    ///
    /// `inherit_stderr` lets a spawned sampler write its diagnostics to our
    /// stderr; it is off while the TUI owns the terminal.
    ///
    /// # Errors
    /// Returns a [`SourceError`] if the file cannot be opened or the sampler
    /// cannot be started.
    pub async fn open(spec: &SourceSpec, inherit_stderr: bool) -> Result<Self, SourceError> {
        let description = spec.describe();
        let (reader, child): (Pin<Box<dyn AsyncRead + Send>>, Option<Child>) = match spec {
            SourceSpec::Stdin => (Box::pin(tokio::io::stdin()), None),
            SourceSpec::File(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| SourceError::Open { path: path.clone(), source })?;
                (Box::pin(file), None)
            }
            SourceSpec::Command(argv) => {
                let (program, args) = argv
                    .split_first()
                    .ok_or_else(|| SourceError::NoStdout(description.clone()))?;
                let mut child = Command::new(program)
                    .args(args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(if inherit_stderr { Stdio::inherit() } else { Stdio::null() })
                    .kill_on_drop(true)
                    .spawn()
                    .map_err(|source| SourceError::Spawn { command: description.clone(), source })?;
                let stdout =
                    child.stdout.take().ok_or_else(|| SourceError::NoStdout(description.clone()))?;
                info!("Started sampler (pid {:?}): {description}", child.id());
                (Box::pin(stdout), Some(child))
            }
        };

        Ok(Self { reader: BufReader::new(reader), partial: Vec::new(), child, description })
    }

    /// Wrap any async reader; used for tests and embedding.
    #[must_use]
    pub fn from_reader(reader: impl AsyncRead + Send + 'static, description: &str) -> Self {
        let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(reader);
        Self {
            reader: BufReader::new(reader),
            partial: Vec::new(),
            child: None,
            description: description.to_string(),
        }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Process id of the spawned sampler.
    #[must_use]
    pub fn sampler_pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Next raw line without its terminator, or `None` once the stream has
    /// ended.
    ///
    /// Bytes are returned undecoded; a line that is not UTF-8 is the
    /// caller's to reject. Bytes read before a cancelled call are kept, so
    /// this can be used as a `select!` branch.
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] when the read fails.
    pub async fn next_line(&mut self) -> Result<Option<Vec<u8>>, SourceError> {
        let read = self.reader.read_until(b'\n', &mut self.partial).await?;
        if read == 0 && self.partial.is_empty() {
            return Ok(None);
        }
        let mut line = std::mem::take(&mut self.partial);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    /// Stop the sampler (if we started it) and reap it.
    pub async fn shutdown(mut self) {
        let Some(mut child) = self.child.take() else { return };
        match child.try_wait() {
            Ok(Some(status)) => debug!("Sampler already exited: {status}"),
            Ok(None) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to stop sampler: {e}");
                } else {
                    debug!("Sampler stopped");
                }
            }
            Err(e) => warn!("Failed to query sampler status: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reader_yields_lines_then_none() {
        let mut source = SampleSource::from_reader(&b"P1;T1 5\r\n\nP1;T1 6"[..], "test");
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(&b"P1;T1 5"[..]));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(&b""[..]));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(&b"P1;T1 6"[..]));
        assert_eq!(source.next_line().await.unwrap(), None);
        assert!(source.sampler_pid().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_line_does_not_end_stream() {
        let mut source = SampleSource::from_reader(&b"P1;T1;caf\xe9.py:f:1 5\nP1;T1 6\n"[..], "test");
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(&b"P1;T1;caf\xe9.py:f:1 5"[..]));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(&b"P1;T1 6"[..]));
        assert_eq!(source.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file_is_open_error() {
        let spec = SourceSpec::File("/nonexistent/stacktop/samples.txt".into());
        let err = SampleSource::open(&spec, false).await.err().unwrap();
        assert!(matches!(err, SourceError::Open { .. }));
    }

    #[tokio::test]
    async fn test_missing_sampler_is_spawn_error() {
        let spec = SourceSpec::Command(vec!["/nonexistent/stacktop-sampler".into()]);
        let err = SampleSource::open(&spec, false).await.err().unwrap();
        assert!(matches!(err, SourceError::Spawn { .. }));
    }
}
