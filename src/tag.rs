//! ID3v2 cover-art extraction.
//!
//! Walks the frames of an ID3v2.2/2.3/2.4 tag looking for the attached
//! picture frame (`APIC`, or `PIC` in v2.2). The walk is best-effort:
//! any truncation or inconsistency in the tag simply means "no cover".

use std::io::Read;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

const TAG_MAGIC: &[u8; 3] = b"ID3";
const TAG_HEADER_LEN: usize = 10;
const FLAG_EXTENDED_HEADER: u8 = 0x40;

/// An embedded cover image. The caller owns it and decides how to display it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverImage {
    pub mime_type: String,
    #[serde(with = "serde_bytes_as_vec")]
    pub bytes: Vec<u8>,
}

impl CoverImage {
    /// `data:` URL suitable for an `<img src>`.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}

mod serde_bytes_as_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(d)
    }
}

/// Frame header layout, selected by the tag's major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameHeaderKind {
    /// 3-byte id, 3-byte big-endian size, no flags.
    V2,
    /// 4-byte id, 4-byte big-endian size, 2 flag bytes.
    V3,
    /// 4-byte id, 4-byte syncsafe size, 2 flag bytes.
    V4,
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader<'a> {
    pub id: &'a [u8],
    pub size: usize,
    pub header_len: usize,
}

impl FrameHeaderKind {
    pub fn from_major_version(major: u8) -> Option<Self> {
        match major {
            2 => Some(FrameHeaderKind::V2),
            3 => Some(FrameHeaderKind::V3),
            4 => Some(FrameHeaderKind::V4),
            _ => None,
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            FrameHeaderKind::V2 => 6,
            FrameHeaderKind::V3 | FrameHeaderKind::V4 => 10,
        }
    }

    /// Id of the attached-picture frame in this version.
    pub fn picture_id(self) -> &'static [u8] {
        match self {
            FrameHeaderKind::V2 => b"PIC",
            FrameHeaderKind::V3 | FrameHeaderKind::V4 => b"APIC",
        }
    }

    /// Parse the header at the start of `bytes`, if a whole one is there.
    pub fn parse(self, bytes: &[u8]) -> Option<FrameHeader<'_>> {
        match self {
            FrameHeaderKind::V2 => parse_v2(bytes),
            FrameHeaderKind::V3 => parse_v3(bytes),
            FrameHeaderKind::V4 => parse_v4(bytes),
        }
    }
}

fn parse_v2(bytes: &[u8]) -> Option<FrameHeader<'_>> {
    let h = bytes.get(..6)?;
    let size = u32::from_be_bytes([0, h[3], h[4], h[5]]) as usize;
    Some(FrameHeader {
        id: &h[..3],
        size,
        header_len: 6,
    })
}

fn parse_v3(bytes: &[u8]) -> Option<FrameHeader<'_>> {
    let h = bytes.get(..10)?;
    let size = u32::from_be_bytes([h[4], h[5], h[6], h[7]]) as usize;
    Some(FrameHeader {
        id: &h[..4],
        size,
        header_len: 10,
    })
}

fn parse_v4(bytes: &[u8]) -> Option<FrameHeader<'_>> {
    let h = bytes.get(..10)?;
    Some(FrameHeader {
        id: &h[..4],
        size: syncsafe(&h[4..8]),
        header_len: 10,
    })
}

/// Decode a 4-byte syncsafe integer (7 significant bits per byte).
pub fn syncsafe(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .take(4)
        .fold(0usize, |acc, &b| (acc << 7) | (b & 0x7f) as usize)
}

/// Look for cover art in an in-memory file, with default limits.
pub fn extract_cover_image(file: &[u8]) -> Option<CoverImage> {
    extract_cover_image_with(file, &EngineConfig::default())
}

/// Look for cover art in an in-memory file.
///
/// Only the first `max_tag_bytes` of the tag body are scanned.
pub fn extract_cover_image_with(file: &[u8], config: &EngineConfig) -> Option<CoverImage> {
    let header = file.get(..TAG_HEADER_LEN)?;
    let tag_size = parse_tag_header(header)?;
    let body_end = TAG_HEADER_LEN + tag_size.min(config.max_tag_bytes);
    let body = &file[TAG_HEADER_LEN..body_end.min(file.len())];
    walk_frames(header, body, config)
}

/// Look for cover art in a stream, reading only the tag prefix.
///
/// At most `10 + max_tag_bytes` bytes are pulled from `reader`. I/O
/// failures count as "no cover".
pub fn read_cover_image<R: Read>(mut reader: R, config: &EngineConfig) -> Option<CoverImage> {
    let mut header = [0u8; TAG_HEADER_LEN];
    if let Err(e) = reader.read_exact(&mut header) {
        log::trace!("cover scan: short read on tag header: {e}");
        return None;
    }
    let tag_size = parse_tag_header(&header)?;
    let want = tag_size.min(config.max_tag_bytes);
    if want < tag_size {
        log::debug!("cover scan: tag declares {tag_size} bytes, scanning first {want}");
    }

    let mut body = Vec::with_capacity(want);
    if let Err(e) = reader.by_ref().take(want as u64).read_to_end(&mut body) {
        log::debug!("cover scan: read failed after {} bytes: {e}", body.len());
        return None;
    }
    walk_frames(&header, &body, config)
}

/// Validate the 10-byte tag header and return the declared body size.
fn parse_tag_header(header: &[u8]) -> Option<usize> {
    if &header[..3] != TAG_MAGIC {
        return None;
    }
    if FrameHeaderKind::from_major_version(header[3]).is_none() {
        log::debug!("cover scan: unsupported ID3v2 major version {}", header[3]);
        return None;
    }
    Some(syncsafe(&header[6..10]))
}

/// Walk the frames in `body` (the tag minus its 10-byte header).
fn walk_frames(header: &[u8], body: &[u8], config: &EngineConfig) -> Option<CoverImage> {
    let kind = FrameHeaderKind::from_major_version(header[3])?;
    let mut pos = extended_header_len(kind, header[5], body)?;

    while pos < body.len() {
        let Some(frame) = kind.parse(&body[pos..]) else {
            log::trace!("cover scan: truncated frame header at offset {pos}");
            return None;
        };
        if frame.id[0] == 0 {
            // Padding
            return None;
        }
        let payload_start = pos + frame.header_len;
        let payload_end = payload_start.checked_add(frame.size)?;
        if frame.size == 0 || payload_end > body.len() {
            log::debug!(
                "cover scan: frame {:?} declares {} bytes with {} left, stopping",
                String::from_utf8_lossy(frame.id),
                frame.size,
                body.len() - payload_start.min(body.len())
            );
            return None;
        }

        if frame.id == kind.picture_id() {
            return parse_picture(kind, &body[payload_start..payload_end], config);
        }
        pos = payload_end;
    }
    None
}

/// Bytes to skip before the first frame.
///
/// v2.3 stores the extended header size excluding its own 4-byte size
/// field; v2.4 stores it syncsafe and inclusive, so anything under 4 is
/// malformed.
fn extended_header_len(kind: FrameHeaderKind, flags: u8, body: &[u8]) -> Option<usize> {
    if flags & FLAG_EXTENDED_HEADER == 0 {
        return Some(0);
    }
    let size_bytes = body.get(..4)?;
    let len = match kind {
        FrameHeaderKind::V2 => 0,
        FrameHeaderKind::V3 => {
            4 + u32::from_be_bytes([size_bytes[0], size_bytes[1], size_bytes[2], size_bytes[3]])
                as usize
        }
        FrameHeaderKind::V4 => {
            let len = syncsafe(size_bytes);
            if len < 4 {
                log::debug!("cover scan: v2.4 extended header declares {len} bytes");
                return None;
            }
            len
        }
    };
    (len <= body.len()).then_some(len)
}

/// Parse an attached-picture payload.
///
/// Layout: encoding byte, MIME (null-terminated, or a 3-byte format code
/// in v2.2), picture type byte, description terminated per the encoding,
/// then the image data.
fn parse_picture(kind: FrameHeaderKind, payload: &[u8], config: &EngineConfig) -> Option<CoverImage> {
    let encoding = *payload.first()?;
    let mut pos = 1;

    let declared_mime = match kind {
        FrameHeaderKind::V2 => {
            let code = payload.get(pos..pos + 3)?;
            pos += 3;
            legacy_format_mime(code)
        }
        FrameHeaderKind::V3 | FrameHeaderKind::V4 => {
            let len = payload[pos..].iter().position(|&b| b == 0)?;
            let raw = String::from_utf8_lossy(&payload[pos..pos + len]).trim().to_ascii_lowercase();
            pos += len + 1;
            normalize_mime(&raw)
        }
    };

    // Picture type.
    pos += 1;
    let description = payload.get(pos..)?;
    pos += description_len(encoding, description)?;

    let image = payload.get(pos..)?;
    if image.len() < config.min_image_bytes {
        log::debug!("cover scan: picture payload only {} bytes, ignoring", image.len());
        return None;
    }

    let mime_type = declared_mime.unwrap_or_else(|| sniff_mime(image).to_string());
    log::debug!("cover scan: found {} bytes of {mime_type}", image.len());
    Some(CoverImage {
        mime_type,
        bytes: image.to_vec(),
    })
}

/// Length of a terminated description, including the terminator.
fn description_len(encoding: u8, bytes: &[u8]) -> Option<usize> {
    match encoding {
        1 | 2 => bytes
            .chunks_exact(2)
            .position(|pair| pair == [0, 0])
            .map(|i| i * 2 + 2),
        _ => bytes.iter().position(|&b| b == 0).map(|i| i + 1),
    }
}

fn legacy_format_mime(code: &[u8]) -> Option<String> {
    let code = String::from_utf8_lossy(code).trim_end_matches('\0').to_ascii_uppercase();
    let mime = match code.as_str() {
        "" => return None,
        "JPG" | "JPEG" => "image/jpeg".to_string(),
        "PNG" => "image/png".to_string(),
        "GIF" => "image/gif".to_string(),
        "BMP" => "image/bmp".to_string(),
        other => format!("image/{}", other.to_ascii_lowercase()),
    };
    Some(mime)
}

fn normalize_mime(raw: &str) -> Option<String> {
    match raw {
        "" => None,
        "jpg" | "jpeg" | "image/jpg" => Some("image/jpeg".to_string()),
        m if m.contains('/') => Some(m.to_string()),
        m => Some(format!("image/{m}")),
    }
}

fn sniff_mime(image: &[u8]) -> &'static str {
    if image.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if image.starts_with(b"GIF8") {
        "image/gif"
    } else if image.starts_with(b"RIFF") && image.get(8..12) == Some(b"WEBP".as_slice()) {
        "image/webp"
    } else if image.starts_with(b"BM") {
        "image/bmp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\n0123456789abcdefghij";

    fn syncsafe_bytes(n: usize) -> [u8; 4] {
        [
            ((n >> 21) & 0x7f) as u8,
            ((n >> 14) & 0x7f) as u8,
            ((n >> 7) & 0x7f) as u8,
            (n & 0x7f) as u8,
        ]
    }

    fn tag(major: u8, flags: u8, body: &[u8]) -> Vec<u8> {
        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[major, 0, flags]);
        out.extend_from_slice(&syncsafe_bytes(body.len()));
        out.extend_from_slice(body);
        out
    }

    fn frame_v3(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
        out
    }

    fn frame_v4(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&syncsafe_bytes(payload.len()));
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(payload);
        out
    }

    fn frame_v2(id: &[u8; 3], payload: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(payload);
        out
    }

    fn apic_payload(mime: &str, image: &[u8]) -> Vec<u8> {
        let mut p = vec![0u8];
        p.extend_from_slice(mime.as_bytes());
        p.push(0);
        p.push(3); // front cover
        p.extend_from_slice(b"cover\0");
        p.extend_from_slice(image);
        p
    }

    #[test]
    fn no_magic_means_no_cover() {
        assert_eq!(extract_cover_image(b"RIFF\0\0\0\0WAVEfmt "), None);
        assert_eq!(extract_cover_image(b""), None);
        assert_eq!(extract_cover_image(b"ID3"), None);
    }

    #[test]
    fn finds_v3_picture_after_other_frames() {
        let mut body = frame_v3(b"TIT2", b"\0Song title");
        body.extend(frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG)));
        let mut file = tag(3, 0, &body);
        file.extend_from_slice(b"\xff\xfb audio frames follow");

        let cover = extract_cover_image(&file).expect("cover should be found");
        assert_eq!(cover.mime_type, "image/png");
        assert_eq!(cover.bytes, FAKE_PNG);
    }

    #[test]
    fn finds_v4_picture_with_syncsafe_sizes() {
        let image = vec![0xAB; 300];
        let body = frame_v4(b"APIC", &apic_payload("image/jpeg", &image));
        let cover = extract_cover_image(&tag(4, 0, &body)).unwrap();
        assert_eq!(cover.mime_type, "image/jpeg");
        assert_eq!(cover.bytes.len(), 300);
    }

    #[test]
    fn finds_v2_picture_with_format_code() {
        let mut payload = vec![0u8];
        payload.extend_from_slice(b"PNG");
        payload.push(3);
        payload.push(0); // empty description
        payload.extend_from_slice(FAKE_PNG);
        let mut body = frame_v2(b"TT2", b"\0Title");
        body.extend(frame_v2(b"PIC", &payload));

        let cover = extract_cover_image(&tag(2, 0, &body)).unwrap();
        assert_eq!(cover.mime_type, "image/png");
        assert_eq!(cover.bytes, FAKE_PNG);
    }

    #[test]
    fn oversized_frame_stops_the_walk() {
        let mut body = b"APIC".to_vec();
        body.extend_from_slice(&10_000u32.to_be_bytes());
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&apic_payload("image/png", FAKE_PNG));
        assert_eq!(extract_cover_image(&tag(3, 0, &body)), None);
    }

    #[test]
    fn zero_size_frame_stops_the_walk() {
        let mut body = frame_v3(b"TIT2", b"");
        body.extend(frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG)));
        assert_eq!(extract_cover_image(&tag(3, 0, &body)), None);
    }

    #[test]
    fn padding_ends_the_walk() {
        let mut body = frame_v3(b"TIT2", b"\0Title");
        body.extend_from_slice(&[0u8; 64]);
        assert_eq!(extract_cover_image(&tag(3, 0, &body)), None);
    }

    #[test]
    fn truncated_file_is_not_a_crash() {
        let body = frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG));
        let file = tag(3, 0, &body);
        for cut in 0..file.len() {
            assert_eq!(extract_cover_image(&file[..cut]), None, "cut at {cut}");
        }
    }

    #[test]
    fn tiny_image_is_ignored() {
        let body = frame_v3(b"APIC", &apic_payload("image/png", b"tiny"));
        assert_eq!(extract_cover_image(&tag(3, 0, &body)), None);
    }

    #[test]
    fn utf16_description_is_skipped_on_aligned_terminator() {
        let mut payload = vec![1u8];
        payload.extend_from_slice(b"image/png\0");
        payload.push(3);
        // BOM + "a" in UTF-16LE, then a double-zero terminator.
        payload.extend_from_slice(&[0xFF, 0xFE, b'a', 0x00, 0x00, 0x00]);
        payload.extend_from_slice(FAKE_PNG);
        let body = frame_v3(b"APIC", &payload);

        let cover = extract_cover_image(&tag(3, 0, &body)).unwrap();
        assert_eq!(cover.bytes, FAKE_PNG);
    }

    #[test]
    fn empty_mime_is_sniffed() {
        let body = frame_v3(b"APIC", &apic_payload("", FAKE_PNG));
        let cover = extract_cover_image(&tag(3, 0, &body)).unwrap();
        assert_eq!(cover.mime_type, "image/png");
    }

    #[test]
    fn bare_jpg_mime_is_normalized() {
        let body = frame_v3(b"APIC", &apic_payload("JPG", &[0xFF; 32]));
        let cover = extract_cover_image(&tag(3, 0, &body)).unwrap();
        assert_eq!(cover.mime_type, "image/jpeg");
    }

    #[test]
    fn v3_extended_header_is_skipped() {
        let mut body = 6u32.to_be_bytes().to_vec();
        body.extend_from_slice(&[0u8; 6]);
        body.extend(frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG)));
        let cover = extract_cover_image(&tag(3, FLAG_EXTENDED_HEADER, &body)).unwrap();
        assert_eq!(cover.bytes, FAKE_PNG);
    }

    #[test]
    fn v4_extended_header_is_syncsafe_and_inclusive() {
        // 130 bytes including the size field, written syncsafe as 0x01 0x02.
        let mut body = vec![0, 0, 0x01, 0x02];
        body.extend_from_slice(&[0u8; 126]);
        body.extend(frame_v4(b"APIC", &apic_payload("image/png", FAKE_PNG)));
        let cover = extract_cover_image(&tag(4, FLAG_EXTENDED_HEADER, &body)).unwrap();
        assert_eq!(cover.bytes, FAKE_PNG);
    }

    #[test]
    fn v4_extended_header_shorter_than_its_size_field_is_rejected() {
        for declared in 0..4u8 {
            let mut body = vec![0, 0, 0, declared];
            body.extend(frame_v4(b"APIC", &apic_payload("image/png", FAKE_PNG)));
            assert_eq!(
                extract_cover_image(&tag(4, FLAG_EXTENDED_HEADER, &body)),
                None,
                "declared {declared}"
            );
        }
    }

    #[test]
    fn scan_is_capped() {
        let mut body = frame_v3(b"TXXX", &vec![b'x'; 4096]);
        body.extend(frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG)));
        let file = tag(3, 0, &body);

        let capped = EngineConfig {
            max_tag_bytes: 1024,
            ..EngineConfig::default()
        };
        assert_eq!(extract_cover_image_with(&file, &capped), None);
        assert!(extract_cover_image(&file).is_some());
    }

    #[test]
    fn reader_reads_only_the_tag() {
        let body = frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG));
        let mut file = tag(3, 0, &body);
        let tag_len = file.len();
        file.extend_from_slice(&[0x55; 10_000]);

        let mut cursor = std::io::Cursor::new(&file);
        let cover = read_cover_image(&mut cursor, &EngineConfig::default()).unwrap();
        assert_eq!(cover.bytes, FAKE_PNG);
        assert_eq!(cursor.position() as usize, tag_len);
    }

    #[test]
    fn unsupported_version_is_ignored() {
        let body = frame_v3(b"APIC", &apic_payload("image/png", FAKE_PNG));
        assert_eq!(extract_cover_image(&tag(5, 0, &body)), None);
    }

    #[test]
    fn syncsafe_decodes() {
        assert_eq!(syncsafe(&[0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(syncsafe(&[0x7f, 0x7f, 0x7f, 0x7f]), 0x0fff_ffff);
    }

    #[test]
    fn data_url_is_base64() {
        let cover = CoverImage {
            mime_type: "image/png".into(),
            bytes: b"hi!".to_vec(),
        };
        assert_eq!(cover.to_data_url(), "data:image/png;base64,aGkh");
    }
}
