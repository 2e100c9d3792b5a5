//! Players file loading
//!
//! The file is comma separated with a header row, then one
//! `player, angel, mortal` row per player. Any malformed row aborts the load.

use super::PlayerDirectory;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

const COLUMNS: [&str; 3] = ["player", "angel", "mortal"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read players file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Line {line}: expected player, angel and mortal fields, found {fields} field(s)")]
    MalformedRow { line: usize, fields: usize },
    #[error("Line {line}: empty {column} field")]
    EmptyField { line: usize, column: &'static str },
}

struct Row<'a> {
    player: &'a str,
    angel: &'a str,
    mortal: &'a str,
}

fn parse_row(text: &str, line: usize) -> Result<Row<'_>, LoadError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() < COLUMNS.len() {
        return Err(LoadError::MalformedRow {
            line,
            fields: fields.len(),
        });
    }
    if let Some((&column, _)) = COLUMNS.iter().zip(&fields).find(|(_, f)| f.is_empty()) {
        return Err(LoadError::EmptyField { line, column });
    }
    Ok(Row {
        player: fields[0],
        angel: fields[1],
        mortal: fields[2],
    })
}

impl PlayerDirectory {
    /// Load the directory from a players file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let directory = Self::from_reader(BufReader::new(file))?;
        tracing::info!(path = %path.display(), players = directory.len(), "Loaded player directory");
        Ok(directory)
    }

    /// Build a directory from players-file content. The first non-blank
    /// line is the header.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, LoadError> {
        let mut directory = Self::default();
        let mut header_seen = false;
        let mut rows = 0usize;

        for (idx, text) in reader.lines().enumerate() {
            let text = text?;
            if text.trim().is_empty() {
                continue;
            }
            if !header_seen {
                header_seen = true;
                let columns: Vec<&str> = text.split(',').map(str::trim).collect();
                tracing::debug!(?columns, "Players file header");
                continue;
            }

            let row = parse_row(&text, idx + 1)?;
            tracing::debug!(
                player = row.player,
                angel = row.angel,
                mortal = row.mortal,
                "Loaded player row"
            );
            directory.link(row.player, row.angel, row.mortal);
            rows += 1;
        }

        tracing::info!(rows, players = directory.len(), "Processed players file");
        Ok(directory)
    }
}
