//! Compression envelope (zlib stream, default level).

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Header bytes of a zlib stream written at the default level.
pub const ZLIB_MAGIC: [u8; 2] = [0x78, 0x9C];

pub fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn inflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Returns true if `head` starts with the zlib magic bytes.
pub fn has_zlib_magic(head: &[u8]) -> bool {
    head.starts_with(&ZLIB_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_writes_magic() {
        let packed = deflate(b"s:5:\"hello\";").unwrap();
        assert!(has_zlib_magic(&packed));
        assert_eq!(inflate(&packed).unwrap(), b"s:5:\"hello\";");
    }

    #[test]
    fn test_inflate_rejects_garbage() {
        assert!(inflate(b"not a zlib stream").is_err());
        assert!(!has_zlib_magic(b"no"));
        assert!(!has_zlib_magic(b"x"));
    }
}
