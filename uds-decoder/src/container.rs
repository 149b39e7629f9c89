//! Database container extraction
//!
//! Every database file is a password protected zip archive holding exactly
//! one member with the same name as the archive. The member is Windows-1252
//! text split into segments:
//!
//! ```text
//! [TXT]
//! 12,RPM
//! [/TXT]
//! ```
//!
//! Segment extraction returns the comma-split lines between the markers.

use crate::encoding::{container_password, decode_text, encode_text};
use crate::types::{Result, Row, UdsError};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use zip::unstable::write::FileOptionsExt;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Extract the rows of segment `segment_name` from each file in order
///
/// Each file toggles its own in/out-of-segment state; rows of all files are
/// appended into one list. Any unreadable file fails the whole call.
pub fn extract_file_segment<P: AsRef<Path>>(files: &[P], segment_name: &str) -> Result<Vec<Row>> {
    let segment_start = format!("[{}]", segment_name);
    let segment_end = format!("[/{}]", segment_name);

    let mut rows = Vec::new();
    for file in files {
        let path = file.as_ref();
        let text = read_container_text(path)?;
        let before = rows.len();
        scan_segment(&text, &segment_start, &segment_end, &mut rows);
        log::debug!(
            "Extracted {} rows of segment {} from {:?}",
            rows.len() - before,
            segment_name,
            path
        );
    }

    Ok(rows)
}

/// Read every line of a container as rows, without segment filtering
pub fn read_file_lines(path: &Path) -> Result<Vec<Row>> {
    let text = read_container_text(path)?;
    Ok(text.lines().map(split_line).collect())
}

/// Write `text` as a database container at `path`
///
/// The member is named after the file and encrypted with the derived
/// container password, so the result can be read back by
/// [`extract_file_segment`].
pub fn write_container(path: &Path, text: &str) -> Result<()> {
    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| UdsError::InvalidContainer {
            path: path.to_path_buf(),
            reason: "path has no file name".to_string(),
        })?;
    let password = container_password(path);

    let mut zip = ZipWriter::new(File::create(path)?);
    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .with_deprecated_encryption(password.as_bytes());
    zip.start_file(entry_name, options)?;
    zip.write_all(&encode_text(text))?;
    zip.finish()?;

    Ok(())
}

/// Open a container and decode its single member as text
fn read_container_text(path: &Path) -> Result<String> {
    let invalid = |reason: String| UdsError::InvalidContainer {
        path: path.to_path_buf(),
        reason,
    };

    let expected_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_uppercase())
        .ok_or_else(|| invalid("path has no file name".to_string()))?;

    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let entry_names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/'))
        .map(str::to_string)
        .collect();

    let entry_name = match entry_names.as_slice() {
        [name] => name,
        names => {
            return Err(invalid(format!(
                "expected exactly one member, found {}",
                names.len()
            )))
        }
    };
    if entry_name.to_uppercase() != expected_name {
        return Err(invalid(format!("unexpected member '{}'", entry_name)));
    }

    let password = container_password(path);
    let mut entry = archive.by_name_decrypt(entry_name, password.as_bytes())?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;

    Ok(decode_text(&bytes))
}

/// Collect the rows between `segment_start` and `segment_end` markers
fn scan_segment(text: &str, segment_start: &str, segment_end: &str, rows: &mut Vec<Row>) {
    let mut in_segment = false;
    for line in text.lines() {
        if line.starts_with('[') {
            if line.eq_ignore_ascii_case(segment_start) {
                in_segment = true;
            } else if line.eq_ignore_ascii_case(segment_end) {
                in_segment = false;
            }
            continue;
        }

        if in_segment {
            rows.push(split_line(line));
        }
    }
}

fn split_line(line: &str) -> Row {
    line.split(',').map(str::to_string).collect()
}
