//! Image header sniffing.
//!
//! Reads intrinsic image properties (dimensions, format) straight from the
//! file header without decoding pixel data. Only the formats the content
//! layer classifies as `image` attachments and can cheaply introspect are
//! covered; anything else yields `None` and the record reports the
//! dimensions as undefined.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Recognized image container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Gif,
    Jpeg,
}

impl ImageFormat {
    /// Short lowercase format name.
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// Human-readable format description.
    pub fn description(&self) -> &'static str {
        match self {
            ImageFormat::Png => "Portable Network Graphics",
            ImageFormat::Gif => "Graphics Interchange Format",
            ImageFormat::Jpeg => "JPEG (ISO 10918)",
        }
    }
}

/// Intrinsic image properties read from a file header.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub format: ImageFormat,
    /// `None` when the header did not allow determining the dimension.
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Read image info from a file. `Ok(None)` means the file is not a
/// recognized image; I/O errors other than a short/unreadable header
/// propagate.
pub fn read_image_info(path: &Path) -> io::Result<Option<ImageInfo>> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 10];
    if file.read(&mut header)? < 10 {
        return Ok(None);
    }

    if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
        return Ok(Some(read_png_info(&mut file)?));
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        // Logical screen size sits right after the 6-byte signature.
        let width = u16::from_le_bytes([header[6], header[7]]) as u32;
        let height = u16::from_le_bytes([header[8], header[9]]) as u32;
        return Ok(Some(ImageInfo {
            format: ImageFormat::Gif,
            width: Some(width),
            height: Some(height),
        }));
    }
    if header.starts_with(&[0xff, 0xd8]) {
        file.seek(SeekFrom::Start(2))?;
        return Ok(Some(read_jpeg_info(&mut file)?));
    }
    Ok(None)
}

fn read_png_info(file: &mut File) -> io::Result<ImageInfo> {
    // Signature (8) + IHDR length/type (8), then width and height.
    file.seek(SeekFrom::Start(16))?;
    let mut buf = [0u8; 8];
    let (width, height) = if file.read(&mut buf)? == 8 {
        (
            Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]])),
            Some(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])),
        )
    } else {
        (None, None)
    };
    Ok(ImageInfo {
        format: ImageFormat::Png,
        width,
        height,
    })
}

fn read_jpeg_info(file: &mut File) -> io::Result<ImageInfo> {
    // Walk the marker segments until a start-of-frame carries the size.
    let mut info = ImageInfo {
        format: ImageFormat::Jpeg,
        width: None,
        height: None,
    };
    loop {
        let mut marker = [0u8; 2];
        if file.read(&mut marker)? < 2 || marker[0] != 0xff {
            return Ok(info);
        }
        // Skip fill bytes.
        let mut code = marker[1];
        while code == 0xff {
            let mut next = [0u8; 1];
            if file.read(&mut next)? < 1 {
                return Ok(info);
            }
            code = next[0];
        }
        match code {
            // SOF0..SOF15, except the non-frame markers in that range.
            0xc0..=0xcf if !matches!(code, 0xc4 | 0xc8 | 0xcc) => {
                let mut seg = [0u8; 7];
                if file.read(&mut seg)? == 7 {
                    info.height = Some(u16::from_be_bytes([seg[3], seg[4]]) as u32);
                    info.width = Some(u16::from_be_bytes([seg[5], seg[6]]) as u32);
                }
                return Ok(info);
            }
            // Standalone markers without a length word.
            0xd0..=0xd9 | 0x01 => continue,
            _ => {
                let mut len = [0u8; 2];
                if file.read(&mut len)? < 2 {
                    return Ok(info);
                }
                let len = u16::from_be_bytes(len);
                if len < 2 {
                    return Ok(info);
                }
                file.seek(SeekFrom::Current(i64::from(len) - 2))?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(bytes).unwrap();
        f.flush().unwrap();
        f
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
        bytes.extend_from_slice(&13u32.to_be_bytes());
        bytes.extend_from_slice(b"IHDR");
        bytes.extend_from_slice(&width.to_be_bytes());
        bytes.extend_from_slice(&height.to_be_bytes());
        bytes.extend_from_slice(&[8, 2, 0, 0, 0]);
        bytes
    }

    #[test]
    fn test_png() {
        let f = write_temp(&png_bytes(640, 480));
        let info = read_image_info(f.path()).unwrap().unwrap();
        assert_eq!(info.format, ImageFormat::Png);
        assert_eq!(info.width, Some(640));
        assert_eq!(info.height, Some(480));
    }

    #[test]
    fn test_gif() {
        let mut bytes = b"GIF89a".to_vec();
        bytes.extend_from_slice(&320u16.to_le_bytes());
        bytes.extend_from_slice(&200u16.to_le_bytes());
        bytes.extend_from_slice(&[0, 0, 0]);
        let f = write_temp(&bytes);
        let info = read_image_info(f.path()).unwrap().unwrap();
        assert_eq!(info.format, ImageFormat::Gif);
        assert_eq!(info.width, Some(320));
        assert_eq!(info.height, Some(200));
    }

    #[test]
    fn test_jpeg() {
        // SOI, APP0 stub, SOF0 with 100x50.
        let mut bytes = vec![0xff, 0xd8];
        bytes.extend_from_slice(&[0xff, 0xe0, 0x00, 0x04, 0x00, 0x00]);
        bytes.extend_from_slice(&[0xff, 0xc0, 0x00, 0x11, 0x08]);
        bytes.extend_from_slice(&50u16.to_be_bytes());
        bytes.extend_from_slice(&100u16.to_be_bytes());
        bytes.push(0x03);
        let f = write_temp(&bytes);
        let info = read_image_info(f.path()).unwrap().unwrap();
        assert_eq!(info.format, ImageFormat::Jpeg);
        assert_eq!(info.width, Some(100));
        assert_eq!(info.height, Some(50));
    }

    #[test]
    fn test_unrecognized() {
        let f = write_temp(b"this is not an image at all");
        assert!(read_image_info(f.path()).unwrap().is_none());
    }
}
