use byteorder::{BigEndian, ByteOrder};

use super::TerrainError;
use crate::geo::LatLon;

pub const UHL_LEN: usize = 80;
pub const DSI_LEN: usize = 648;
pub const ACC_LEN: usize = 2700;
pub const DATA_OFFSET: usize = UHL_LEN + DSI_LEN + ACC_LEN;

pub const RECORD_SENTINEL: u8 = 0xAA;
/// Void post value after signed-magnitude decoding.
pub const NO_DATA: i16 = -32767;

/// Bytes in a data record apart from the posts: sentinel, block count,
/// longitude and latitude counts, checksum.
const RECORD_OVERHEAD: usize = 8 + 4;

/// One DTED cell: a one-degree (or wider, at high latitude) grid of posts.
#[derive(Debug, Clone)]
pub struct DtedFrame {
    /// South-west corner.
    pub origin: LatLon,
    pub lon_spacing_deg: f64,
    pub lat_spacing_deg: f64,
    pub lon_lines: usize,
    pub lat_points: usize,
    /// Column-major: `lon_lines` columns west to east, each `lat_points` posts south to north.
    pub posts: Vec<i16>,
}

impl DtedFrame {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TerrainError> {
        if bytes.len() < DATA_OFFSET {
            return Err(TerrainError::Malformed(format!(
                "{} bytes is shorter than the DTED headers",
                bytes.len()
            )));
        }
        let uhl = &bytes[..UHL_LEN];
        if &uhl[..3] != b"UHL" {
            return Err(TerrainError::Malformed("missing UHL sentinel".into()));
        }

        let lon = parse_angle(&uhl[4..12])?;
        let lat = parse_angle(&uhl[12..20])?;
        let lon_interval = parse_number(&uhl[20..24])?;
        let lat_interval = parse_number(&uhl[24..28])?;
        let lon_lines = parse_number(&uhl[47..51])? as usize;
        let lat_points = parse_number(&uhl[51..55])? as usize;

        if lon_interval == 0 || lat_interval == 0 || lon_lines < 2 || lat_points < 2 {
            return Err(TerrainError::Malformed(format!(
                "bad grid: {lon_lines}x{lat_points} posts, intervals {lon_interval}/{lat_interval}"
            )));
        }

        let record_len = RECORD_OVERHEAD + 2 * lat_points;
        let needed = DATA_OFFSET + record_len * lon_lines;
        if bytes.len() < needed {
            return Err(TerrainError::Malformed(format!(
                "expected {needed} bytes of data, found {}",
                bytes.len()
            )));
        }

        let mut posts = Vec::with_capacity(lon_lines * lat_points);
        for (column, record) in bytes[DATA_OFFSET..needed].chunks_exact(record_len).enumerate() {
            if record[0] != RECORD_SENTINEL {
                return Err(TerrainError::Malformed(format!(
                    "record {column} starts with {:#04x}",
                    record[0]
                )));
            }
            let body = &record[..record_len - 4];
            let stored = BigEndian::read_u32(&record[record_len - 4..]);
            let computed = body.iter().map(|b| *b as u32).sum::<u32>();
            if stored != computed {
                return Err(TerrainError::Checksum {
                    record: column,
                    stored,
                    computed,
                });
            }
            posts.extend(body[8..].chunks_exact(2).map(|c| decode_post(BigEndian::read_u16(c))));
        }

        Ok(Self {
            origin: LatLon::new(lat, lon),
            lon_spacing_deg: lon_interval as f64 / 36000.0,
            lat_spacing_deg: lat_interval as f64 / 36000.0,
            lon_lines,
            lat_points,
            posts,
        })
    }

    #[inline(always)]
    pub fn post(&self, column: usize, row: usize) -> i16 {
        self.posts[column * self.lat_points + row]
    }

    /// Height of the post nearest to `point`; `None` outside the frame or on voids.
    pub fn elevation_at(&self, point: LatLon) -> Option<i32> {
        let column = ((point.longitude - self.origin.longitude) / self.lon_spacing_deg).round();
        let row = ((point.latitude - self.origin.latitude) / self.lat_spacing_deg).round();
        if column < 0.0 || row < 0.0 {
            return None;
        }
        let (column, row) = (column as usize, row as usize);
        if column >= self.lon_lines || row >= self.lat_points {
            return None;
        }
        match self.post(column, row) {
            NO_DATA => None,
            h => Some(h as i32),
        }
    }
}

/// Signed-magnitude 16-bit value as used by DTED posts.
fn decode_post(raw: u16) -> i16 {
    let magnitude = (raw & 0x7FFF) as i16;
    if raw & 0x8000 != 0 { -magnitude } else { magnitude }
}

fn ascii(field: &[u8]) -> Result<&str, TerrainError> {
    if !field.is_ascii() {
        return Err(TerrainError::Malformed(format!("non-ASCII header field {field:?}")));
    }
    std::str::from_utf8(field).map_err(|_| TerrainError::Malformed("non-ASCII header field".into()))
}

fn parse_number(field: &[u8]) -> Result<u32, TerrainError> {
    let text = ascii(field)?;
    text.trim()
        .parse()
        .map_err(|_| TerrainError::Malformed(format!("bad number {text:?}")))
}

/// `DDDMMSSH` to signed decimal degrees.
fn parse_angle(field: &[u8]) -> Result<f64, TerrainError> {
    let text = ascii(field)?;
    let bad = || TerrainError::Malformed(format!("bad angle {text:?}"));
    if text.len() != 8 {
        return Err(bad());
    }
    let degrees: f64 = text[0..3].parse().map_err(|_| bad())?;
    let minutes: f64 = text[3..5].parse().map_err(|_| bad())?;
    let seconds: f64 = text[5..7].parse().map_err(|_| bad())?;
    let value = degrees + minutes / 60.0 + seconds / 3600.0;
    match &text[7..8] {
        "N" | "E" => Ok(value),
        "S" | "W" => Ok(-value),
        _ => Err(bad()),
    }
}

/// Builds a DTED file image for tests. `columns[c][r]` is the post at
/// longitude line `c`, latitude point `r`; `None` is a void.
#[cfg(test)]
pub(crate) fn encode_frame(
    lat: i32,
    lon: i32,
    interval_tenths: u32,
    columns: &[Vec<Option<i16>>],
) -> Vec<u8> {
    use byteorder::WriteBytesExt;

    assert!(
        (1..=9999).contains(&interval_tenths),
        "UHL intervals are four digits, got {interval_tenths}"
    );
    assert!(columns.len() <= 9999, "too many longitude lines");

    fn angle(value: i32, pos: char, neg: char) -> String {
        format!("{:03}0000{}", value.abs(), if value >= 0 { pos } else { neg })
    }

    let lat_points = columns.first().map_or(0, |c| c.len());
    let mut out = Vec::new();
    out.extend_from_slice(b"UHL1");
    out.extend_from_slice(angle(lon, 'E', 'W').as_bytes());
    out.extend_from_slice(angle(lat, 'N', 'S').as_bytes());
    out.extend_from_slice(format!("{interval_tenths:04}{interval_tenths:04}").as_bytes());
    out.extend_from_slice(b"NA  U  ");
    out.extend_from_slice(&[b' '; 12]);
    out.extend_from_slice(format!("{:04}{:04}", columns.len(), lat_points).as_bytes());
    out.resize(UHL_LEN, b' ');
    out.resize(DATA_OFFSET, b' ');

    for (c, posts) in columns.iter().enumerate() {
        let mut record = vec![RECORD_SENTINEL];
        record.write_u24::<BigEndian>(c as u32).unwrap();
        record.write_u16::<BigEndian>(c as u16).unwrap();
        record.write_u16::<BigEndian>(0).unwrap();
        for post in posts {
            let raw = match post {
                None => 0xFFFF,
                Some(h) if *h < 0 => 0x8000 | h.unsigned_abs(),
                Some(h) => *h as u16,
            };
            record.write_u16::<BigEndian>(raw).unwrap();
        }
        let sum = record.iter().map(|b| *b as u32).sum::<u32>();
        record.write_u32::<BigEndian>(sum).unwrap();
        out.extend_from_slice(&record);
    }
    out
}
