//! Minimal NumPy `.npy` codec for complex 4-D tensors

use crate::types::{PolComplex, PolSarError, PolSarResult};
use ndarray::Array4;
use regex::Regex;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const MAGIC: &[u8] = b"\x93NUMPY";
const HEADER_ALIGN: usize = 64;

/// Write a complex tensor as `<c16` in C order.
///
/// Data goes to a temporary file in the destination directory that is then
/// renamed over `path`, so readers never observe a partial file.
pub fn write_complex4<P: AsRef<Path>>(path: P, array: &Array4<PolComplex>) -> PolSarResult<()> {
    let path = path.as_ref();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        write_header(&mut writer, "<c16", array.shape())?;

        let standard = array.as_standard_layout();
        for z in standard.iter() {
            writer.write_all(&z.re.to_le_bytes())?;
            writer.write_all(&z.im.to_le_bytes())?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|e| e.error)?;

    log::debug!("Wrote {:?} tensor to {}", array.shape(), path.display());
    Ok(())
}

/// Read a 4-D `<c16` or `<c8` tensor
pub fn read_complex4<P: AsRef<Path>>(path: P) -> PolSarResult<Array4<PolComplex>> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);
    let header = read_header(&mut reader)?;

    if header.fortran_order {
        return Err(PolSarError::InvalidFormat(format!(
            "{}: Fortran-ordered arrays are not supported",
            path.display()
        )));
    }
    let shape: [usize; 4] = header.shape.as_slice().try_into().map_err(|_| {
        PolSarError::Shape(format!(
            "{}: expected a 4-D array, got shape {:?}",
            path.display(),
            header.shape
        ))
    })?;
    let count: usize = shape.iter().product();

    let values = match header.descr.as_str() {
        "<c16" => {
            let mut buf = vec![0u8; count * 16];
            reader.read_exact(&mut buf)?;
            buf.chunks_exact(16)
                .map(|c| PolComplex::new(le_f64(&c[..8]), le_f64(&c[8..])))
                .collect::<Vec<_>>()
        }
        "<c8" => {
            let mut buf = vec![0u8; count * 8];
            reader.read_exact(&mut buf)?;
            buf.chunks_exact(8)
                .map(|c| PolComplex::new(le_f32(&c[..4]) as f64, le_f32(&c[4..]) as f64))
                .collect::<Vec<_>>()
        }
        other => {
            return Err(PolSarError::InvalidFormat(format!(
                "{}: unsupported dtype {}",
                path.display(),
                other
            )))
        }
    };

    Array4::from_shape_vec(shape, values)
        .map_err(|e| PolSarError::Shape(format!("{}: {}", path.display(), e)))
}

#[derive(Debug)]
struct NpyHeader {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

fn write_header<W: Write>(writer: &mut W, descr: &str, shape: &[usize]) -> PolSarResult<()> {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    let shape_str = if dims.len() == 1 {
        format!("({},)", dims[0])
    } else {
        format!("({})", dims.join(", "))
    };
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr, shape_str
    );

    // magic (6) + version (2) + length (2) + dict + newline, padded to the alignment
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let pad = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header = format!("{}{}\n", dict, " ".repeat(pad));
    let header_len = u16::try_from(header.len())
        .map_err(|_| PolSarError::InvalidFormat("npy header too long".to_string()))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_all(&header_len.to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    Ok(())
}

fn read_header<R: Read>(reader: &mut R) -> PolSarResult<NpyHeader> {
    let mut preamble = [0u8; 8];
    reader.read_exact(&mut preamble)?;
    if &preamble[..6] != MAGIC {
        return Err(PolSarError::InvalidFormat("missing npy magic string".to_string()));
    }

    let header_len = match preamble[6] {
        1 => {
            let mut len = [0u8; 2];
            reader.read_exact(&mut len)?;
            u16::from_le_bytes(len) as usize
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader.read_exact(&mut len)?;
            u32::from_le_bytes(len) as usize
        }
        major => {
            return Err(PolSarError::InvalidFormat(format!(
                "unsupported npy version {}.{}",
                major, preamble[7]
            )))
        }
    };

    let mut raw = vec![0u8; header_len];
    reader.read_exact(&mut raw)?;
    let text = String::from_utf8(raw)
        .map_err(|e| PolSarError::InvalidFormat(format!("npy header is not UTF-8: {}", e)))?;
    parse_header_dict(&text)
}

fn parse_header_dict(text: &str) -> PolSarResult<NpyHeader> {
    let regex = |pattern: &str| {
        Regex::new(pattern).map_err(|e| PolSarError::InvalidFormat(format!("Regex error: {}", e)))
    };
    let missing = |key: &str| PolSarError::InvalidFormat(format!("npy header lacks '{}': {}", key, text.trim()));

    let descr = regex(r"'descr'\s*:\s*'([^']+)'")?
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| missing("descr"))?;
    let fortran_order = regex(r"'fortran_order'\s*:\s*(True|False)")?
        .captures(text)
        .map(|c| &c[1] == "True")
        .ok_or_else(|| missing("fortran_order"))?;
    let shape_text = regex(r"'shape'\s*:\s*\(([^)]*)\)")?
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| missing("shape"))?;

    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| PolSarError::InvalidFormat(format!("bad npy dimension {}: {}", s, e)))
        })
        .collect::<PolSarResult<Vec<_>>>()?;

    Ok(NpyHeader {
        descr,
        fortran_order,
        shape,
    })
}

fn le_f64(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    f64::from_le_bytes(buf)
}

fn le_f32(bytes: &[u8]) -> f32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    f32::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_is_aligned_and_parsable() {
        let mut bytes = Vec::new();
        write_header(&mut bytes, "<c16", &[2, 2, 3, 5]).unwrap();
        assert_eq!(bytes.len() % HEADER_ALIGN, 0);
        assert_eq!(*bytes.last().unwrap(), b'\n');

        let header = read_header(&mut bytes.as_slice()).unwrap();
        assert_eq!(header.descr, "<c16");
        assert!(!header.fortran_order);
        assert_eq!(header.shape, vec![2, 2, 3, 5]);
    }

    #[test]
    fn test_non_contiguous_tensor_is_written_in_c_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.npy");
        let base = Array4::from_shape_fn((2, 2, 3, 3), |(a, b, r, c)| {
            PolComplex::new((a * 1000 + b * 100 + r * 10 + c) as f64, -1.0)
        });
        let transposed = base.clone().reversed_axes();

        write_complex4(&path, &transposed).unwrap();
        assert_eq!(read_complex4(&path).unwrap(), transposed);
    }

    #[test]
    fn test_reads_complex64_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("c8.npy");
        let mut bytes = Vec::new();
        write_header(&mut bytes, "<c8", &[1, 1, 1, 2]).unwrap();
        for v in [1.5f32, -2.0, 0.25, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&path, bytes).unwrap();

        let array = read_complex4(&path).unwrap();
        assert_eq!(array[[0, 0, 0, 0]], PolComplex::new(1.5, -2.0));
        assert_eq!(array[[0, 0, 0, 1]], PolComplex::new(0.25, 4.0));
    }

    #[test]
    fn test_rejects_wrong_rank_and_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        let mut bytes = Vec::new();
        write_header(&mut bytes, "<c16", &[4]).unwrap();
        bytes.extend_from_slice(&[0u8; 64]);
        std::fs::write(&path, &bytes).unwrap();
        assert!(matches!(read_complex4(&path), Err(PolSarError::Shape(_))));

        std::fs::write(&path, b"not a numpy file").unwrap();
        assert!(matches!(read_complex4(&path), Err(PolSarError::InvalidFormat(_))));
    }
}
