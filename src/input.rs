//! Where request lines come from: a named file, or lines typed on stdin.
//!
//! When no input file is given, the first stdin line decides: if it names an
//! existing file, that file is read instead; otherwise it is the first typed
//! request. Typed input stops at EOF or at a `q`/`quit` line.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::info;

const QUIT_WORDS: [&str; 2] = ["q", "quit"];

/// Stream every request line of `path` to `on_line`.
pub fn feed_file(path: &Path, on_line: impl FnMut(&str)) -> io::Result<()> {
    let file = File::open(path)?;
    info!(path = %path.display(), "reading requests from file");
    feed_lines(BufReader::new(file), false, on_line)
}

/// Resolve the stdin convention described in the module docs.
pub fn feed_stdin_or_named_file<R: BufRead>(
    mut reader: R,
    mut on_line: impl FnMut(&str),
) -> io::Result<()> {
    let mut first = String::new();
    if reader.read_line(&mut first)? == 0 {
        return Ok(());
    }
    let candidate = first.trim();
    if !candidate.is_empty() && Path::new(candidate).is_file() {
        return feed_file(Path::new(candidate), on_line);
    }
    if is_quit(candidate) {
        return Ok(());
    }
    if !candidate.is_empty() {
        on_line(candidate);
    }
    feed_lines(reader, true, on_line)
}

/// Forward non-blank lines; in typed mode a quit word ends the stream.
pub fn feed_lines<R: BufRead>(
    reader: R,
    typed: bool,
    mut on_line: impl FnMut(&str),
) -> io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if typed && is_quit(line) {
            break;
        }
        if line.is_empty() {
            continue;
        }
        on_line(line);
    }
    Ok(())
}

fn is_quit(line: &str) -> bool {
    QUIT_WORDS.contains(&line)
}
