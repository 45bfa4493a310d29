use std::fmt::Display;
use std::io::Write;
use std::time::Instant;

use camino::Utf8Path;
use console::Style;
use tempfile::NamedTempFile;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Write `data` to `path` so that concurrent readers see either nothing or
/// the complete file.
///
/// The bytes go to a fresh temporary file next to the target first, which is
/// then renamed over it. Every call gets its own temporary file, so writers
/// racing on the same path, in one process or several, all succeed and leave
/// identical content behind.
pub fn write_atomic(path: &Utf8Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_str().is_empty() => dir,
        _ => Utf8Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
