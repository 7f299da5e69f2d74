//! PCD (Point Cloud Data) v0.7 file format.
//!
//! Format:
//! - ASCII header, one `KEY values...` line each, `#` comments allowed:
//!   - `FIELDS` names, `SIZE` bytes per element, `TYPE` I/U/F, `COUNT`
//!   - `WIDTH`, `HEIGHT`, `POINTS`, `VIEWPOINT`, `VERSION`
//!   - `DATA ascii | binary | binary_compressed` (last header line)
//! - Point data: whitespace-separated rows (ascii) or packed little-endian
//!   records (binary)
//!
//! Only `x y z` are read (F4 or F8); any other fields are skipped.
//! Non-finite points are dropped on load. `binary_compressed` is rejected.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::core::types::{Point3D, PointCloud3D};

/// Upper bound on points reserved up front; larger clouds grow as read.
const PREALLOC_POINTS: usize = 1 << 20;

/// Largest binary record accepted, in bytes.
const MAX_RECORD_BYTES: usize = 1 << 20;

/// Error type for PCD reading and writing
#[derive(Debug, thiserror::Error)]
pub enum PcdError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header is missing a key or has inconsistent values
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// One of x, y, z is absent
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    /// x, y or z stored with a type other than F4/F8
    #[error("Unsupported type for field '{field}': {kind}{size}")]
    UnsupportedFieldType {
        /// Field name
        field: String,
        /// Type letter (I, U, F)
        kind: char,
        /// Element size in bytes
        size: usize,
    },

    /// `DATA` encoding not supported
    #[error("Unsupported DATA encoding '{0}'")]
    UnsupportedEncoding(String),

    /// Point data is truncated or unparsable
    #[error("Malformed point data at point {index}: {reason}")]
    MalformedData {
        /// 0-based point index
        index: usize,
        /// What went wrong
        reason: String,
    },
}

/// Output encoding for [`write_pcd`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PcdEncoding {
    #[default]
    Ascii,
    Binary,
}

#[derive(Debug, Clone)]
struct Field {
    name: String,
    size: usize,
    kind: char,
    count: usize,
}

/// Parsed PCD header.
#[derive(Debug, Clone)]
pub struct PcdHeader {
    fields: Vec<Field>,
    /// Values per ascii row
    tokens_per_point: usize,
    /// Bytes per binary record
    record_size: usize,
    /// Declared point count
    pub points: usize,
    /// Raw `DATA` value
    pub encoding: String,
}

/// Where one coordinate lives inside a point record.
#[derive(Debug, Clone, Copy)]
struct Slot {
    /// Token offset in an ascii row
    token: usize,
    /// Byte offset in a binary record
    byte: usize,
    /// 4 or 8
    size: usize,
}

impl PcdHeader {
    fn slot(&self, name: &'static str) -> Result<Slot, PcdError> {
        let mut token = 0;
        let mut byte = 0;
        for f in &self.fields {
            if f.name == name {
                if f.kind != 'F' || !(f.size == 4 || f.size == 8) {
                    return Err(PcdError::UnsupportedFieldType {
                        field: f.name.clone(),
                        kind: f.kind,
                        size: f.size,
                    });
                }
                return Ok(Slot {
                    token,
                    byte,
                    size: f.size,
                });
            }
            token += f.count;
            byte += f.size * f.count;
        }
        Err(PcdError::MissingField(name))
    }

    fn xyz_slots(&self) -> Result<[Slot; 3], PcdError> {
        Ok([self.slot("x")?, self.slot("y")?, self.slot("z")?])
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, PcdError> {
    value
        .parse()
        .map_err(|_| PcdError::InvalidHeader(format!("{} value '{}' is not a count", key, value)))
}

/// `(tokens, bytes)` per point, or `None` on overflow.
fn point_layout(fields: &[Field]) -> Option<(usize, usize)> {
    fields.iter().try_fold((0usize, 0usize), |(tokens, bytes), f| {
        let field_bytes = f.size.checked_mul(f.count)?;
        Some((tokens.checked_add(f.count)?, bytes.checked_add(field_bytes)?))
    })
}

/// Read header lines up to and including `DATA`.
pub fn read_header<R: BufRead>(reader: &mut R) -> Result<PcdHeader, PcdError> {
    let mut names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut kinds: Vec<char> = Vec::new();
    let mut counts: Option<Vec<usize>> = None;
    let mut width: Option<usize> = None;
    let mut height: usize = 1;
    let mut points: Option<usize> = None;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::InvalidHeader("missing DATA line".to_string()));
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut parts = trimmed.split_whitespace();
        let key = parts.next().unwrap_or_default().to_ascii_uppercase();
        let values: Vec<&str> = parts.collect();

        match key.as_str() {
            "FIELDS" => names = values.iter().map(|s| s.to_string()).collect(),
            "SIZE" => {
                sizes = values
                    .iter()
                    .map(|v| parse_usize("SIZE", v))
                    .collect::<Result<_, _>>()?
            }
            "TYPE" => {
                kinds = values
                    .iter()
                    .map(|v| v.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('?'))
                    .collect()
            }
            "COUNT" => {
                counts = Some(
                    values
                        .iter()
                        .map(|v| parse_usize("COUNT", v))
                        .collect::<Result<_, _>>()?,
                )
            }
            "WIDTH" => width = Some(parse_usize("WIDTH", values.first().unwrap_or(&""))?),
            "HEIGHT" => height = parse_usize("HEIGHT", values.first().unwrap_or(&""))?,
            "POINTS" => points = Some(parse_usize("POINTS", values.first().unwrap_or(&""))?),
            "DATA" => {
                let encoding = values.first().unwrap_or(&"").to_ascii_lowercase();
                let counts = counts.unwrap_or_else(|| vec![1; names.len()]);
                if names.is_empty() || sizes.len() != names.len() || kinds.len() != names.len()
                {
                    return Err(PcdError::InvalidHeader(
                        "FIELDS, SIZE and TYPE lengths differ".to_string(),
                    ));
                }
                if counts.len() != names.len() {
                    return Err(PcdError::InvalidHeader(
                        "COUNT length differs from FIELDS".to_string(),
                    ));
                }
                let points = match (points, width) {
                    (Some(p), _) => p,
                    (None, Some(w)) => w.checked_mul(height).ok_or_else(|| {
                        PcdError::InvalidHeader(format!("WIDTH {} x HEIGHT {} overflows", w, height))
                    })?,
                    (None, None) => {
                        return Err(PcdError::InvalidHeader("missing POINTS/WIDTH".to_string()));
                    }
                };
                let fields = names
                    .into_iter()
                    .zip(sizes)
                    .zip(kinds)
                    .zip(counts)
                    .map(|(((name, size), kind), count)| Field {
                        name,
                        size,
                        kind,
                        count,
                    })
                    .collect::<Vec<_>>();
                let (tokens_per_point, record_size) = point_layout(&fields)
                    .filter(|&(_, bytes)| bytes <= MAX_RECORD_BYTES)
                    .ok_or_else(|| {
                        PcdError::InvalidHeader("point record size out of range".to_string())
                    })?;
                return Ok(PcdHeader {
                    fields,
                    tokens_per_point,
                    record_size,
                    points,
                    encoding,
                });
            }
            // VERSION, VIEWPOINT and unknown keys carry nothing we use
            _ => {}
        }
    }
}

fn push_finite(cloud: &mut PointCloud3D, p: Point3D, dropped: &mut usize) {
    if p.is_finite() {
        cloud.push(p);
    } else {
        *dropped += 1;
    }
}

fn read_ascii<R: BufRead>(reader: &mut R, header: &PcdHeader) -> Result<PointCloud3D, PcdError> {
    let slots = header.xyz_slots()?;
    let per_point = header.tokens_per_point;
    let mut cloud = PointCloud3D::with_capacity(header.points.min(PREALLOC_POINTS));
    let mut dropped = 0usize;

    let mut index = 0usize;
    let mut line = String::new();
    while index < header.points {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedData {
                index,
                reason: format!("expected {} points, file ended", header.points),
            });
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if tokens.len() < per_point {
            return Err(PcdError::MalformedData {
                index,
                reason: format!("{} values, expected {}", tokens.len(), per_point),
            });
        }
        let mut xyz = [0.0f32; 3];
        for (value, slot) in xyz.iter_mut().zip(slots) {
            let token = tokens[slot.token];
            *value = token.parse::<f32>().map_err(|_| PcdError::MalformedData {
                index,
                reason: format!("'{}' is not a number", token),
            })?;
        }
        push_finite(&mut cloud, Point3D::new(xyz[0], xyz[1], xyz[2]), &mut dropped);
        index += 1;
    }

    if dropped > 0 {
        log::debug!("Dropped {} non-finite points", dropped);
    }
    Ok(cloud)
}

fn read_binary<R: Read>(reader: &mut R, header: &PcdHeader) -> Result<PointCloud3D, PcdError> {
    let slots = header.xyz_slots()?;
    let stride = header.record_size;
    let mut cloud = PointCloud3D::with_capacity(header.points.min(PREALLOC_POINTS));
    let mut dropped = 0usize;
    let mut record = vec![0u8; stride];

    for index in 0..header.points {
        reader.read_exact(&mut record).map_err(|e| PcdError::MalformedData {
            index,
            reason: e.to_string(),
        })?;
        let mut xyz = [0.0f32; 3];
        for (value, slot) in xyz.iter_mut().zip(slots) {
            let bytes = &record[slot.byte..slot.byte + slot.size];
            *value = match bytes.try_into() {
                Ok(b4) => f32::from_le_bytes(b4),
                Err(_) => {
                    let mut b8 = [0u8; 8];
                    b8.copy_from_slice(bytes);
                    f64::from_le_bytes(b8) as f32
                }
            };
        }
        push_finite(&mut cloud, Point3D::new(xyz[0], xyz[1], xyz[2]), &mut dropped);
    }

    if dropped > 0 {
        log::debug!("Dropped {} non-finite points", dropped);
    }
    Ok(cloud)
}

/// Read a cloud from a reader in PCD format
pub fn read_pcd<R: BufRead>(reader: &mut R) -> Result<PointCloud3D, PcdError> {
    let header = read_header(reader)?;
    match header.encoding.as_str() {
        "ascii" => read_ascii(reader, &header),
        "binary" => read_binary(reader, &header),
        other => Err(PcdError::UnsupportedEncoding(other.to_string())),
    }
}

/// Load a cloud from a PCD file
pub fn load_pcd(path: &Path) -> Result<PointCloud3D, PcdError> {
    let file = File::open(path)?;
    read_pcd(&mut BufReader::new(file))
}

/// Write a cloud to a writer in PCD format (`x y z`, F4)
pub fn write_pcd<W: Write>(
    cloud: &PointCloud3D,
    writer: &mut W,
    encoding: PcdEncoding,
) -> Result<(), PcdError> {
    let n = cloud.len();
    writeln!(writer, "# .PCD v0.7 - Point Cloud Data file format")?;
    writeln!(writer, "VERSION 0.7")?;
    writeln!(writer, "FIELDS x y z")?;
    writeln!(writer, "SIZE 4 4 4")?;
    writeln!(writer, "TYPE F F F")?;
    writeln!(writer, "COUNT 1 1 1")?;
    writeln!(writer, "WIDTH {}", n)?;
    writeln!(writer, "HEIGHT 1")?;
    writeln!(writer, "VIEWPOINT 0 0 0 1 0 0 0")?;
    writeln!(writer, "POINTS {}", n)?;

    match encoding {
        PcdEncoding::Ascii => {
            writeln!(writer, "DATA ascii")?;
            for p in cloud {
                writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
            }
        }
        PcdEncoding::Binary => {
            writeln!(writer, "DATA binary")?;
            let mut data = Vec::with_capacity(n * 12);
            for p in cloud {
                data.extend_from_slice(&p.x.to_le_bytes());
                data.extend_from_slice(&p.y.to_le_bytes());
                data.extend_from_slice(&p.z.to_le_bytes());
            }
            writer.write_all(&data)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Save a cloud to a PCD file
pub fn save_pcd(cloud: &PointCloud3D, path: &Path, encoding: PcdEncoding) -> Result<(), PcdError> {
    let file = File::create(path)?;
    write_pcd(cloud, &mut BufWriter::new(file), encoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_cloud() -> PointCloud3D {
        PointCloud3D::from_points(vec![
            Point3D::new(0.1, -0.25, -1.5),
            Point3D::new(1.0e-3, 2.5, -4.75),
            Point3D::new(-3.125, 0.0, 0.0),
        ])
    }

    #[test]
    fn test_ascii_file_loads_written_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan1.pcd");
        let cloud = sample_cloud();

        save_pcd(&cloud, &path, PcdEncoding::Ascii).unwrap();
        let loaded = load_pcd(&path).unwrap();

        assert_eq!(loaded, cloud);
    }

    #[test]
    fn test_binary_file_loads_written_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan2.pcd");
        let cloud = sample_cloud();

        save_pcd(&cloud, &path, PcdEncoding::Binary).unwrap();
        let loaded = load_pcd(&path).unwrap();

        assert_eq!(loaded, cloud);
    }

    #[test]
    fn test_extra_fields_and_nan_points() {
        let text = "\
# .PCD v0.7
VERSION 0.7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii
1 2 3 4278190080
nan nan nan 0
-1 -2 -3 255
";
        let cloud = read_pcd(&mut Cursor::new(text)).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[1], Point3D::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn test_binary_double_precision_with_padding_field() {
        let header = "\
VERSION 0.7
FIELDS intensity x y z
SIZE 2 8 8 8
TYPE U F F F
COUNT 1 1 1 1
WIDTH 2
HEIGHT 1
DATA binary
";
        let mut data = header.as_bytes().to_vec();
        for (i, xyz) in [[1.5f64, -2.0, 0.25], [4.0, 5.0, -6.0]].iter().enumerate() {
            data.extend_from_slice(&(i as u16).to_le_bytes());
            for v in xyz {
                data.extend_from_slice(&v.to_le_bytes());
            }
        }

        let cloud = read_pcd(&mut Cursor::new(data)).unwrap();
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0], Point3D::new(1.5, -2.0, 0.25));
        assert_eq!(cloud.points[1], Point3D::new(4.0, 5.0, -6.0));
    }

    #[test]
    fn test_rejects_compressed_and_missing_fields() {
        let compressed = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH 1\nDATA binary_compressed\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(compressed)),
            Err(PcdError::UnsupportedEncoding(_))
        ));

        let no_z = "FIELDS x y\nSIZE 4 4\nTYPE F F\nWIDTH 1\nDATA ascii\n1 2\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(no_z)),
            Err(PcdError::MissingField("z"))
        ));
    }

    #[test]
    fn test_truncated_data() {
        let text = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 2\nDATA ascii\n1 2 3\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(text)),
            Err(PcdError::MalformedData { index: 1, .. })
        ));
    }

    #[test]
    fn test_integer_coordinates_rejected() {
        let text = "FIELDS x y z\nSIZE 4 4 4\nTYPE I I I\nPOINTS 1\nDATA ascii\n1 2 3\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(text)),
            Err(PcdError::UnsupportedFieldType { kind: 'I', .. })
        ));
    }

    #[test]
    fn test_huge_point_count_is_malformed_not_fatal() {
        let ascii = "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 100000000000000000\nDATA ascii\n1 2 3\n";
        assert!(matches!(
            read_pcd(&mut Cursor::new(ascii)),
            Err(PcdError::MalformedData { index: 1, .. })
        ));

        let mut binary =
            b"FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 100000000000000000\nDATA binary\n"
                .to_vec();
        for v in [1.0f32, 2.0, 3.0] {
            binary.extend_from_slice(&v.to_le_bytes());
        }
        assert!(matches!(
            read_pcd(&mut Cursor::new(binary)),
            Err(PcdError::MalformedData { index: 1, .. })
        ));
    }

    #[test]
    fn test_overflowing_header_sizes_rejected() {
        let width = format!(
            "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nWIDTH {}\nHEIGHT 2\nDATA ascii\n",
            usize::MAX
        );
        assert!(matches!(
            read_pcd(&mut Cursor::new(width)),
            Err(PcdError::InvalidHeader(_))
        ));

        let count = format!(
            "FIELDS x y z pad\nSIZE 4 4 4 8\nTYPE F F F F\nCOUNT 1 1 1 {}\nPOINTS 1\nDATA binary\n",
            usize::MAX / 4
        );
        assert!(matches!(
            read_pcd(&mut Cursor::new(count)),
            Err(PcdError::InvalidHeader(_))
        ));
    }
}
