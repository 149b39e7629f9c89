//! File resolution and chassis codes
//!
//! ECU files are addressed by base name. A name without a container of its
//! own is looked up in the redirection table, and every container may pull
//! in further containers through its `INC` segment.

use crate::config::ReaderConfig;
use crate::container::{extract_file_segment, read_file_lines};
use crate::types::{Result, Row, UdsError};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Redirection target meaning "no data for this ECU"
const REDIRECT_EMPTY: &str = "EMPTY";

/// Chassis codes known without a chassis table
const CHASSIS_FIXED: [(&str, &str); 8] = [
    ("1K", "VW36"),
    ("6R", "VW25"),
    ("3C", "VW46"),
    ("1T", "VW36"),
    ("6J", "SE25"),
    ("5N", "VW36"),
    ("AX", "VW36"),
    ("KE", "SE25"),
];

/// Maps ECU base names to the physical containers to read
#[derive(Debug)]
pub struct FileResolver {
    dir: PathBuf,
    extension: String,
    redirects: HashMap<String, String>,
}

impl FileResolver {
    /// Load the redirection table (`ReDir`, segment `DIR`) from `dir`
    pub fn load(dir: &Path, config: &ReaderConfig) -> Result<Self> {
        let file = dir.join("ReDir").with_extension(config.extension());
        log::info!("Loading redirection table: {:?}", file);
        let rows = extract_file_segment(&[&file], "DIR")?;
        Self::from_rows(dir, config, rows)
    }

    /// Build from `DIR` rows of the form `id, name, target`
    pub fn from_rows(dir: &Path, config: &ReaderConfig, rows: Vec<Row>) -> Result<Self> {
        let mut redirects = HashMap::with_capacity(rows.len());
        for row in rows {
            let [_, name, target]: [String; 3] = row.try_into().map_err(|row: Row| UdsError::MalformedRow {
                segment: "DIR".to_string(),
                reason: format!("expected 3 fields, got {}", row.len()),
            })?;

            let key = name.to_uppercase();
            if redirects.contains_key(&key) {
                return Err(UdsError::MalformedRow {
                    segment: "DIR".to_string(),
                    reason: format!("duplicate redirection for '{}'", key),
                });
            }
            redirects.insert(key, target);
        }
        log::debug!("Loaded {} redirections", redirects.len());

        Ok(Self {
            dir: dir.to_path_buf(),
            extension: config.extension().to_string(),
            redirects,
        })
    }

    /// Redirection target of a base name, matched ignoring case
    pub fn redirect(&self, name: &str) -> Option<&str> {
        self.redirects.get(&name.to_uppercase()).map(String::as_str)
    }

    pub fn redirect_count(&self) -> usize {
        self.redirects.len()
    }

    /// Containers making up the ECU file `name`, main file first
    ///
    /// Includes are appended depth first; a container is never listed
    /// twice and missing include targets are skipped.
    pub fn file_list(&self, name: &str) -> Result<Vec<PathBuf>> {
        let mut path = self.container_path(name);
        if !path.is_file() {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let target = self
                .redirect(&stem)
                .ok_or_else(|| UdsError::FileNotFound(path.display().to_string()))?;
            if target.eq_ignore_ascii_case(REDIRECT_EMPTY) {
                return Err(UdsError::FileNotFound(format!("{} (no data)", name)));
            }

            log::debug!("Redirecting {} to {}", name, target);
            path = self.container_path(target);
            if !path.is_file() {
                return Err(UdsError::FileNotFound(path.display().to_string()));
            }
        }

        let mut files = vec![path.clone()];
        self.collect_includes(&path, &mut files)?;
        Ok(files)
    }

    fn collect_includes(&self, file: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for row in extract_file_segment(&[file], "INC")? {
            let Some(include) = row.get(1).filter(|name| !name.trim().is_empty()) else {
                continue;
            };

            let path = self.container_path(include);
            if path.is_file() && !files.contains(&path) {
                log::debug!("Including {:?} from {:?}", path, file);
                files.push(path.clone());
                self.collect_includes(&path, files)?;
            }
        }
        Ok(())
    }

    fn container_path(&self, name: &str) -> PathBuf {
        self.dir.join(name).with_extension(&self.extension)
    }
}

/// Chassis code → platform, the built-in codes extended by the chassis file
///
/// Only rows of exactly two fields with a two character code are used.
/// Codes already known keep their platform.
pub fn load_chassis_map(path: &Path) -> Result<HashMap<String, String>> {
    let rows = read_file_lines(path)?;
    Ok(chassis_map_from_rows(rows))
}

fn chassis_map_from_rows(rows: Vec<Row>) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = CHASSIS_FIXED
        .iter()
        .map(|(code, platform)| (code.to_string(), platform.to_string()))
        .collect();

    for row in rows {
        let Ok([code, platform]) = <[String; 2]>::try_from(row) else {
            continue;
        };
        if code.chars().count() != 2 {
            continue;
        }

        match map.entry(code) {
            Entry::Occupied(known) => {
                if *known.get() != platform {
                    log::warn!(
                        "Ignoring chassis entry {} -> {}, already mapped to {}",
                        known.key(),
                        platform,
                        known.get()
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(platform);
            }
        }
    }
    map
}
