//! The on-the-fly transform that turns a list of sources into one minified
//! file.
//!
//! The crate never minifies anything itself. A [`Transform`] receives the
//! ordered, site-relative source paths of a group and returns the output
//! bytes. [`CommandTransform`] is the stock implementation, piping the
//! concatenated sources through `esbuild --minify`.

use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::AssetKind;
use crate::error::TransformError;

/// Everything a transform needs to build one bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    pub kind: AssetKind,
    /// Site-relative paths, in emission order.
    pub sources: Vec<String>,
}

impl TransformRequest {
    /// URL of the on-the-fly endpoint serving this request.
    ///
    /// The sources are joined with `,` into the single `f` parameter, e.g.
    /// `/min/?f=/a.js,/b.js`. Each path is percent-encoded apart from its
    /// slashes, so commas or query strings inside a path survive.
    pub fn url(&self, endpoint: &str) -> String {
        let files: Vec<_> = self
            .sources
            .iter()
            .map(|source| urlencoding::encode(source).replace("%2F", "/"))
            .collect();

        format!("{}/?f={}", endpoint.trim_end_matches('/'), files.join(","))
    }
}

/// Produces the bundled bytes for a request.
///
/// An empty result counts as a failure; the caller then serves the
/// on-the-fly URL instead of a cached file.
pub trait Transform {
    fn fetch(&self, request: &TransformRequest) -> Result<Vec<u8>, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&TransformRequest) -> Result<Vec<u8>, TransformError>,
{
    fn fetch(&self, request: &TransformRequest) -> Result<Vec<u8>, TransformError> {
        self(request)
    }
}

/// Runs an external minifier over the concatenated sources.
///
/// Sources are read relative to `root`, joined with newlines and written to
/// the child's stdin; whatever it prints to stdout is the bundle. The child
/// is killed once `timeout` elapses.
///
/// **Note:** The default program is `esbuild`, which must be available in
/// the system PATH.
#[derive(Debug, Clone)]
pub struct CommandTransform {
    root: Utf8PathBuf,
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandTransform {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            program: "esbuild".into(),
            args: vec!["--minify".into()],
            timeout: Duration::from_secs(10),
        }
    }

    /// Replace the program and its arguments. The loader flag for `esbuild`
    /// is only added while the program is `esbuild`.
    pub fn program<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn concat(&self, sources: &[String]) -> Result<Vec<u8>, TransformError> {
        let mut input = Vec::new();

        for source in sources {
            let path = resolve_local(&self.root, source);
            input.extend(std::fs::read(&path)?);
            input.push(b'\n');
        }

        Ok(input)
    }

    fn command(&self, kind: AssetKind) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if self.program == "esbuild" {
            cmd.arg(format!("--loader={}", kind.extension()));
        }

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

impl Transform for CommandTransform {
    fn fetch(&self, request: &TransformRequest) -> Result<Vec<u8>, TransformError> {
        let input = self.concat(&request.sources)?;
        let mut child = self.command(request.kind).spawn()?;

        let mut stdin = child.stdin.take().ok_or(TransformError::Pipe)?;
        let mut stdout = child.stdout.take().ok_or(TransformError::Pipe)?;

        // Both pipes are drained on their own threads so a chatty child can
        // never block on a full pipe while we wait on it.
        let writer = thread::spawn(move || stdin.write_all(&input));

        let (tx, rx) = channel();
        thread::spawn(move || {
            let mut output = Vec::new();
            let res = stdout.read_to_end(&mut output).map(|_| output);
            let _ = tx.send(res);
        });

        let deadline = Instant::now() + self.timeout;

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }

            if Instant::now() >= deadline {
                child.kill()?;
                child.wait()?;
                return Err(TransformError::Timeout(self.timeout));
            }

            thread::sleep(Duration::from_millis(10));
        };

        // A child that quits early closes stdin under the writer; its exit
        // status says more than the broken pipe.
        if !status.success() {
            return Err(TransformError::Status(status));
        }

        writer.join().map_err(|_| TransformError::Pipe)??;

        let remaining = deadline.saturating_duration_since(Instant::now());
        let output = match rx.recv_timeout(remaining.max(Duration::from_millis(100))) {
            Ok(res) => res?,
            Err(RecvTimeoutError::Timeout) => return Err(TransformError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => return Err(TransformError::Pipe),
        };

        Ok(output)
    }
}

/// Map a site-relative path onto the local document root.
fn resolve_local(root: &Utf8Path, source: &str) -> Utf8PathBuf {
    let source = source.split(['?', '#']).next().unwrap_or(source);
    root.join(source.trim_start_matches('/'))
}
