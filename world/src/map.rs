//! Grid map model and the line-oriented map file format.
//!
//! A map file starts with `width height`, followed by `height` rows of
//! `width` terrain codes. Every following line describes one tank as
//! `x y heading` (heading in degrees) until a line with exactly two numbers
//! gives the flag position. Anything after the flag line is ignored.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use ctf_core::{CellCoord, GridView, Pose, Terrain};
use glam::Vec2;
use thiserror::Error;

/// Errors produced while loading a map. All of them are fatal for the round.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map file could not be read.
    #[error("failed to read map file {path}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The input did not contain a header line.
    #[error("map is empty, expected a `width height` header")]
    MissingHeader,
    /// The header line was not two positive integers.
    #[error("line {line}: invalid map header `{content}`")]
    InvalidHeader {
        /// 1-based line number.
        line: usize,
        /// Offending line.
        content: String,
    },
    /// The input ended before all grid rows were read.
    #[error("map ended after {found} of {expected} grid rows")]
    TruncatedGrid {
        /// Rows declared by the header.
        expected: u32,
        /// Rows actually present.
        found: u32,
    },
    /// A grid row did not have `width` entries.
    #[error("line {line}: expected {expected} terrain codes, found {found}")]
    RowWidth {
        /// 1-based line number.
        line: usize,
        /// Width declared by the header.
        expected: u32,
        /// Codes present on the line.
        found: usize,
    },
    /// A grid entry was not a known terrain code.
    #[error("line {line}: `{value}` is not a terrain code")]
    InvalidCode {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        value: String,
    },
    /// A tank or flag coordinate was not a number.
    #[error("line {line}: `{value}` is not a number")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending token.
        value: String,
    },
    /// A line after the grid was neither a tank triple nor the flag pair.
    #[error("line {line}: expected `x y heading` or flag `x y`, found {fields} fields")]
    UnexpectedArity {
        /// 1-based line number.
        line: usize,
        /// Number of whitespace-separated fields found.
        fields: usize,
    },
    /// The input ended without a flag line.
    #[error("map is missing the flag position line")]
    MissingFlag,
    /// The map did not declare any tank.
    #[error("map does not declare any tank start position")]
    NoTanks,
    /// The cell buffer does not match the declared dimensions.
    #[error("expected {expected} cells for the declared dimensions, found {found}")]
    CellCount {
        /// Cells implied by width times height.
        expected: usize,
        /// Cells provided.
        found: usize,
    },
    /// The requested dimensions cannot host a playable map.
    #[error("a {width}x{height} map is too small")]
    TooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// The requested dimensions exceed the largest supported map.
    #[error("a {width}x{height} map is too large")]
    TooLarge {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}

/// Static description of a round: terrain template, tank starts and flag start.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMap {
    width: u32,
    height: u32,
    cells: Vec<Terrain>,
    tank_starts: Vec<Pose>,
    flag_start: Vec2,
}

impl GridMap {
    /// Assembles a map from already decoded parts.
    pub fn new(
        width: u32,
        height: u32,
        cells: Vec<Terrain>,
        tank_starts: Vec<Pose>,
        flag_start: Vec2,
    ) -> Result<Self, MapError> {
        let expected = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(usize::MAX);
        if cells.len() != expected {
            return Err(MapError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        if tank_starts.is_empty() {
            return Err(MapError::NoTanks);
        }

        Ok(Self {
            width,
            height,
            cells,
            tank_starts,
            flag_start,
        })
    }

    /// Reads and parses the map file at the provided path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    /// Parses a map from its textual representation.
    pub fn parse(contents: &str) -> Result<Self, MapError> {
        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line));

        let (header_line, header) = lines.next().ok_or(MapError::MissingHeader)?;
        let (width, height) = parse_header(header_line, header)?;

        let mut cells = Vec::new();
        for row in 0..height {
            let (line, content) = lines.next().ok_or(MapError::TruncatedGrid {
                expected: height,
                found: row,
            })?;
            parse_row(line, content, width, &mut cells)?;
        }

        let mut tank_starts = Vec::new();
        let mut flag_start = None;
        for (line, content) in lines {
            let fields: Vec<&str> = content.split_whitespace().collect();
            match fields.as_slice() {
                [] => continue,
                [x, y] => {
                    flag_start = Some(Vec2::new(parse_float(line, x)?, parse_float(line, y)?));
                    break;
                }
                [x, y, heading] => {
                    let position = Vec2::new(parse_float(line, x)?, parse_float(line, y)?);
                    let heading = parse_float(line, heading)?.to_radians();
                    tank_starts.push(Pose::new(position, heading));
                }
                other => {
                    return Err(MapError::UnexpectedArity {
                        line,
                        fields: other.len(),
                    })
                }
            }
        }

        let flag_start = flag_start.ok_or(MapError::MissingFlag)?;
        Self::new(width, height, cells, tank_starts, flag_start)
    }

    /// Number of columns in the map.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the map.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Terrain template in row-major order.
    #[must_use]
    pub fn cells(&self) -> &[Terrain] {
        &self.cells
    }

    /// Template terrain at the provided cell.
    #[must_use]
    pub fn terrain_at(&self, cell: CellCoord) -> Option<Terrain> {
        self.view().terrain_at(cell)
    }

    /// Start pose of every tank, in declaration order.
    #[must_use]
    pub fn tank_starts(&self) -> &[Pose] {
        &self.tank_starts
    }

    /// Position the flag starts at and returns to after a capture.
    #[must_use]
    pub const fn flag_start(&self) -> Vec2 {
        self.flag_start
    }

    /// Read-only view over the terrain template.
    #[must_use]
    pub fn view(&self) -> GridView<'_> {
        GridView::new(&self.cells, self.width, self.height)
    }
}

fn parse_header(line: usize, content: &str) -> Result<(u32, u32), MapError> {
    let invalid = || MapError::InvalidHeader {
        line,
        content: content.to_owned(),
    };

    let mut fields = content.split_whitespace();
    let width = fields.next().ok_or_else(invalid)?;
    let height = fields.next().ok_or_else(invalid)?;
    if fields.next().is_some() {
        return Err(invalid());
    }

    let width = width.parse::<u32>().map_err(|_| invalid())?;
    let height = height.parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}

fn parse_row(
    line: usize,
    content: &str,
    width: u32,
    cells: &mut Vec<Terrain>,
) -> Result<(), MapError> {
    let mut found = 0;
    for token in content.split_whitespace() {
        let terrain = token
            .parse::<u8>()
            .ok()
            .and_then(Terrain::from_code)
            .ok_or_else(|| MapError::InvalidCode {
                line,
                value: token.to_owned(),
            })?;
        cells.push(terrain);
        found += 1;
    }

    if u32::try_from(found).ok() != Some(width) {
        return Err(MapError::RowWidth {
            line,
            expected: width,
            found,
        });
    }

    Ok(())
}

fn parse_float(line: usize, token: &str) -> Result<f32, MapError> {
    token.parse::<f32>().map_err(|_| MapError::InvalidNumber {
        line,
        value: token.to_owned(),
    })
}
