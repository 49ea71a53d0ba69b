//! Reader and writer for MetaImage files.
//!
//! A MetaImage is a plain-text `Key = Value` header followed by raw samples.
//! `.mha` files carry the samples in the same file (`ElementDataFile = LOCAL`),
//! `.mhd` files point to a separate raw file next to the header. Payloads
//! marked `CompressedData = True` are zlib streams.

use crate::volume::Volume;

use flate2::read::ZlibDecoder;
use log::debug;
use ndarray::Array3;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetaImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing header field {0}")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Unsupported MetaImage feature: {0}")]
    Unsupported(String),

    #[error("Expected {expected} bytes of pixel data, found {found}")]
    Truncated { expected: usize, found: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ElementType {
    UChar,
    Char,
    UShort,
    Short,
    UInt,
    Int,
    Float,
    Double,
}

impl ElementType {
    fn parse(value: &str) -> Result<Self, MetaImageError> {
        Ok(match value {
            "MET_UCHAR" => Self::UChar,
            "MET_CHAR" => Self::Char,
            "MET_USHORT" => Self::UShort,
            "MET_SHORT" => Self::Short,
            "MET_UINT" => Self::UInt,
            "MET_INT" => Self::Int,
            "MET_FLOAT" => Self::Float,
            "MET_DOUBLE" => Self::Double,
            other => return Err(MetaImageError::Unsupported(format!("ElementType {other}"))),
        })
    }

    fn size(self) -> usize {
        match self {
            Self::UChar | Self::Char => 1,
            Self::UShort | Self::Short => 2,
            Self::UInt | Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    fn decode(self, bytes: &[u8], big_endian: bool) -> f64 {
        macro_rules! read {
            ($t:ty) => {{
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                if big_endian {
                    <$t>::from_be_bytes(raw) as f64
                } else {
                    <$t>::from_le_bytes(raw) as f64
                }
            }};
        }
        match self {
            Self::UChar => read!(u8),
            Self::Char => read!(i8),
            Self::UShort => read!(u16),
            Self::Short => read!(i16),
            Self::UInt => read!(u32),
            Self::Int => read!(i32),
            Self::Float => read!(f32),
            Self::Double => read!(f64),
        }
    }
}

/// Sample types that can be written as MetaImage pixel data.
pub trait MetaElement: Copy {
    const TYPE_NAME: &'static str;

    fn write_le(self, out: &mut impl Write) -> std::io::Result<()>;
}

impl MetaElement for u8 {
    const TYPE_NAME: &'static str = "MET_UCHAR";

    fn write_le(self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&[self])
    }
}

impl MetaElement for u16 {
    const TYPE_NAME: &'static str = "MET_USHORT";

    fn write_le(self, out: &mut impl Write) -> std::io::Result<()> {
        out.write_all(&self.to_le_bytes())
    }
}

struct Header {
    fields: HashMap<String, String>,
    data_offset: usize,
}

impl Header {
    fn parse(bytes: &[u8]) -> Result<Self, MetaImageError> {
        let mut fields = HashMap::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let end = bytes[offset..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(bytes.len(), |p| offset + p);
            let line = String::from_utf8_lossy(&bytes[offset..end]);
            offset = (end + 1).min(bytes.len());

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            let is_last = key == "ElementDataFile";
            fields.insert(key, value);
            if is_last {
                return Ok(Self {
                    fields,
                    data_offset: offset,
                });
            }
        }

        Err(MetaImageError::MissingField("ElementDataFile"))
    }

    fn get(&self, field: &'static str) -> Result<&str, MetaImageError> {
        self.fields
            .get(field)
            .map(String::as_str)
            .ok_or(MetaImageError::MissingField(field))
    }

    fn flag(&self, field: &str) -> bool {
        self.fields
            .get(field)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    fn numbers<T: std::str::FromStr>(&self, field: &'static str) -> Result<Vec<T>, MetaImageError> {
        let value = self.get(field)?;
        value
            .split_whitespace()
            .map(|n| {
                n.parse().map_err(|_| MetaImageError::InvalidField {
                    field,
                    value: value.to_string(),
                })
            })
            .collect()
    }
}

/// Read a 2D or 3D single-channel MetaImage as a `u16` volume.
///
/// Types with negative samples are shifted so the minimum becomes zero; all
/// samples are then rounded and clamped to the `u16` range.
pub fn read_metaimage(path: impl AsRef<Path>) -> Result<Volume, MetaImageError> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let header = Header::parse(&bytes)?;

    if let Some(channels) = header.fields.get("ElementNumberOfChannels")
        && channels != "1"
    {
        return Err(MetaImageError::Unsupported(format!(
            "ElementNumberOfChannels {channels}"
        )));
    }

    let ndims: usize = header
        .get("NDims")?
        .parse()
        .map_err(|_| MetaImageError::InvalidField {
            field: "NDims",
            value: header.fields["NDims"].clone(),
        })?;
    if !(2..=3).contains(&ndims) {
        return Err(MetaImageError::Unsupported(format!("NDims {ndims}")));
    }

    let dim_size: Vec<usize> = header.numbers("DimSize")?;
    if dim_size.len() != ndims {
        return Err(MetaImageError::InvalidField {
            field: "DimSize",
            value: header.fields["DimSize"].clone(),
        });
    }
    let width = dim_size[0];
    let height = dim_size[1];
    let depth = dim_size.get(2).copied().unwrap_or(1);

    let spacing: Vec<f32> = if header.fields.contains_key("ElementSpacing") {
        header.numbers("ElementSpacing")?
    } else if header.fields.contains_key("ElementSize") {
        header.numbers("ElementSize")?
    } else {
        vec![1.0; ndims]
    };
    let spacing = (
        spacing.first().copied().unwrap_or(1.0),
        spacing.get(1).copied().unwrap_or(1.0),
        spacing.get(2).copied().unwrap_or(1.0),
    );

    let element_type = ElementType::parse(header.get("ElementType")?)?;
    let big_endian = header.flag("BinaryDataByteOrderMSB") || header.flag("ElementByteOrderMSB");

    let expected = width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(depth))
        .and_then(|v| v.checked_mul(element_type.size()))
        .ok_or_else(|| MetaImageError::InvalidField {
            field: "DimSize",
            value: header.fields["DimSize"].clone(),
        })?;

    let data_file = header.get("ElementDataFile")?;
    let external;
    let stored: &[u8] = match data_file {
        "LOCAL" => &bytes[header.data_offset..],
        "LIST" => return Err(MetaImageError::Unsupported("ElementDataFile LIST".into())),
        file => {
            let raw_path = path.parent().unwrap_or(Path::new("")).join(file);
            external = fs::read(raw_path)?;
            &external
        }
    };

    let inflated;
    let raw: &[u8] = if header.flag("CompressedData") {
        let size = if header.fields.contains_key("CompressedDataSize") {
            header.numbers::<usize>("CompressedDataSize")?.first().copied()
        } else {
            None
        };
        let compressed = &stored[..size.map_or(stored.len(), |n| n.min(stored.len()))];
        inflated = inflate(compressed, expected)?;
        &inflated
    } else {
        stored
    };

    if raw.len() < expected {
        return Err(MetaImageError::Truncated {
            expected,
            found: raw.len(),
        });
    }

    let samples: Vec<f64> = raw[..expected]
        .chunks_exact(element_type.size())
        .map(|chunk| element_type.decode(chunk, big_endian))
        .collect();
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = if min < 0.0 { -min } else { 0.0 };
    let converted: Vec<u16> = samples
        .iter()
        .map(|&v| (v + shift).round().clamp(0.0, f64::from(u16::MAX)) as u16)
        .collect();

    let data = Array3::from_shape_vec((depth, height, width), converted).map_err(|_| {
        MetaImageError::InvalidField {
            field: "DimSize",
            value: header.fields["DimSize"].clone(),
        }
    })?;

    debug!(
        "read {} ({width}x{height}x{depth}, {element_type:?}, spacing {spacing:?})",
        path.display()
    );

    Ok(Volume::new(data, spacing))
}

/// Inflate a zlib stream, reading at most `limit` bytes of output.
fn inflate(compressed: &[u8], limit: usize) -> Result<Vec<u8>, MetaImageError> {
    let mut out = Vec::with_capacity(limit.min(compressed.len().saturating_mul(4)));
    ZlibDecoder::new(compressed)
        .take(limit as u64)
        .read_to_end(&mut out)?;
    debug!("inflated {} bytes to {}", compressed.len(), out.len());
    Ok(out)
}

/// Write a volume indexed `(z, y, x)` as a little-endian, uncompressed `.mha`.
pub fn write_metaimage<T: MetaElement>(
    path: impl AsRef<Path>,
    data: &Array3<T>,
    spacing: (f32, f32, f32),
) -> Result<(), MetaImageError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let (depth, height, width) = data.dim();
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "ObjectType = Image")?;
    writeln!(out, "NDims = 3")?;
    writeln!(out, "BinaryData = True")?;
    writeln!(out, "BinaryDataByteOrderMSB = False")?;
    writeln!(out, "CompressedData = False")?;
    writeln!(out, "DimSize = {width} {height} {depth}")?;
    writeln!(
        out,
        "ElementSpacing = {} {} {}",
        spacing.0, spacing.1, spacing.2
    )?;
    writeln!(out, "ElementNumberOfChannels = 1")?;
    writeln!(out, "ElementType = {}", T::TYPE_NAME)?;
    writeln!(out, "ElementDataFile = LOCAL")?;

    // Logical iteration order is x fastest, then y, then z.
    for &value in data.iter() {
        value.write_le(&mut out)?;
    }
    out.flush()?;

    debug!("wrote {} ({width}x{height}x{depth})", path.display());
    Ok(())
}
