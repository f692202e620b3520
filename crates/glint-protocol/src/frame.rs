use crate::cipher::StreamCipher;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use glint_common::{GlintError, Result};
use std::io::{Read, Write};
use tokio_util::codec::{Decoder, Encoder};

/// Largest frame a three byte VarInt length prefix can describe.
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// Largest payload a compressed frame may inflate to.
pub const MAX_UNCOMPRESSED_LENGTH: usize = 8_388_608;

/// Compression threshold value meaning compression is off.
pub const COMPRESSION_DISABLED: i32 = -1;

/// Reads a VarInt from the front of `buf` without consuming it.
/// Returns `None` when more bytes are needed, otherwise the value and its encoded size.
pub fn peek_varint(buf: &[u8], max_bytes: usize) -> Result<Option<(i32, usize)>> {
    let mut result: u32 = 0;
    for (index, &byte) in buf.iter().take(max_bytes).enumerate() {
        result |= ((byte & 0x7F) as u32) << (7 * index);
        if byte & 0x80 == 0 {
            return Ok(Some((result as i32, index + 1)));
        }
    }
    if buf.len() >= max_bytes {
        return Err(GlintError::decode(format!(
            "VarInt longer than {} bytes",
            max_bytes
        )));
    }
    Ok(None)
}

pub fn put_varint(dst: &mut BytesMut, value: i32) {
    let mut value = value as u32;
    while (value & !0x7F) != 0 {
        dst.put_u8(((value & 0x7F) as u8) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// The wire frame layer: VarInt length prefix, optional zlib compression and an
/// optional stream cipher over everything. Items are raw packets (`[VarInt id][payload]`).
#[derive(Debug)]
pub struct FrameCodec {
    compression_threshold: i32,
    cipher: Option<StreamCipher>,
    /// How many bytes at the front of the read buffer are already decrypted.
    decrypted: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        Self {
            compression_threshold: COMPRESSION_DISABLED,
            cipher: None,
            decrypted: 0,
        }
    }

    pub fn compression_threshold(&self) -> i32 {
        self.compression_threshold
    }

    /// Sets the compression threshold. Any negative value disables compression.
    pub fn set_compression(&mut self, threshold: i32) {
        self.compression_threshold = threshold.max(COMPRESSION_DISABLED);
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Installs the cipher for both directions. Bytes already buffered but not yet
    /// decoded are treated as ciphertext. A cipher can only be installed once.
    pub fn enable_encryption(&mut self, shared_secret: &[u8]) -> Result<()> {
        if self.cipher.is_some() {
            return Err(GlintError::Authentication(
                "encryption is already enabled".to_owned(),
            ));
        }
        self.cipher = Some(StreamCipher::new(shared_secret)?);
        self.decrypted = 0;
        Ok(())
    }

    fn inflate(&self, mut frame: BytesMut) -> Result<BytesMut> {
        let (data_length, header) = peek_varint(&frame, 5)?
            .ok_or_else(|| GlintError::decode("truncated data length"))?;
        frame.advance(header);

        if data_length == 0 {
            return Ok(frame);
        }
        if data_length < 0 || (data_length as usize) > MAX_UNCOMPRESSED_LENGTH {
            return Err(GlintError::decode(format!(
                "invalid uncompressed length {}",
                data_length
            )));
        }
        if data_length < self.compression_threshold {
            return Err(GlintError::decode(format!(
                "badly compressed packet: size {} is below threshold {}",
                data_length, self.compression_threshold
            )));
        }

        let expected = data_length as usize;
        let mut inflated = Vec::with_capacity(expected);
        ZlibDecoder::new(&frame[..])
            .take(expected as u64 + 1)
            .read_to_end(&mut inflated)
            .map_err(|e| GlintError::decode(format!("inflate failed: {}", e)))?;

        if inflated.len() != expected {
            return Err(GlintError::decode(format!(
                "compressed length mismatch: expected {}, got {}",
                expected,
                inflated.len()
            )));
        }
        Ok(BytesMut::from(&inflated[..]))
    }

    fn deflate(&self, payload: &[u8]) -> Result<BytesMut> {
        let mut body = BytesMut::with_capacity(payload.len() + 5);
        if payload.len() >= self.compression_threshold as usize {
            put_varint(&mut body, payload.len() as i32);
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder
                .write_all(payload)
                .map_err(|e| GlintError::encode(format!("deflate failed: {}", e)))?;
            let compressed = encoder
                .finish()
                .map_err(|e| GlintError::encode(format!("deflate failed: {}", e)))?;
            body.extend_from_slice(&compressed);
        } else {
            put_varint(&mut body, 0);
            body.extend_from_slice(payload);
        }
        Ok(body)
    }
}

impl Decoder for FrameCodec {
    type Item = BytesMut;
    type Error = GlintError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>> {
        if let Some(cipher) = self.cipher.as_mut() {
            if self.decrypted < src.len() {
                cipher.decrypt(&mut src[self.decrypted..]);
                self.decrypted = src.len();
            }
        }

        let (length, header) = match peek_varint(src, 3)? {
            Some(prefix) => prefix,
            None => return Ok(None),
        };
        if length < 0 || length as usize > MAX_FRAME_LENGTH {
            return Err(GlintError::decode(format!("invalid frame length {}", length)));
        }

        let total = header + length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(header);
        let frame = src.split_to(length as usize);
        self.decrypted = self.decrypted.saturating_sub(total);

        let frame = if self.compression_threshold >= 0 {
            self.inflate(frame)?
        } else {
            frame
        };
        if frame.is_empty() {
            return Err(GlintError::decode("empty frame"));
        }
        Ok(Some(frame))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = GlintError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<()> {
        let body = if self.compression_threshold >= 0 {
            self.deflate(&item)?
        } else {
            BytesMut::from(&item[..])
        };
        if body.len() > MAX_FRAME_LENGTH {
            return Err(GlintError::encode(format!(
                "frame of {} bytes exceeds the maximum of {}",
                body.len(),
                MAX_FRAME_LENGTH
            )));
        }

        let start = dst.len();
        put_varint(dst, body.len() as i32);
        dst.extend_from_slice(&body);

        if let Some(cipher) = self.cipher.as_mut() {
            cipher.encrypt(&mut dst[start..]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: [u8; 16] = [7; 16];

    fn payload(len: usize) -> Bytes {
        // Starts with a packet id so the frame is never empty.
        (0..len).map(|i| (i % 251) as u8).collect::<Vec<_>>().into()
    }

    fn pair(threshold: i32, encrypted: bool) -> (FrameCodec, FrameCodec) {
        let mut writer = FrameCodec::new();
        let mut reader = FrameCodec::new();
        writer.set_compression(threshold);
        reader.set_compression(threshold);
        if encrypted {
            writer.enable_encryption(&SECRET).unwrap();
            reader.enable_encryption(&SECRET).unwrap();
        }
        (writer, reader)
    }

    #[test]
    fn test_round_trip_all_modes() {
        for threshold in [COMPRESSION_DISABLED, 64] {
            for encrypted in [false, true] {
                let (mut writer, mut reader) = pair(threshold, encrypted);
                let mut wire = BytesMut::new();
                let sizes = [1, 10, 63, 64, 65, 1000, 70_000];
                for size in sizes {
                    writer.encode(payload(size), &mut wire).unwrap();
                }
                for size in sizes {
                    let frame = reader.decode(&mut wire).unwrap().unwrap();
                    assert_eq!(&frame[..], &payload(size)[..], "threshold {} encrypted {}", threshold, encrypted);
                }
                assert!(wire.is_empty());
                assert!(reader.decode(&mut wire).unwrap().is_none());
            }
        }
    }

    #[test]
    fn test_small_payloads_sent_raw() {
        let (mut writer, _) = pair(64, false);
        let mut wire = BytesMut::new();
        writer.encode(payload(10), &mut wire).unwrap();

        // [frame length 11][data length 0][10 raw bytes]
        assert_eq!(wire[0], 11);
        assert_eq!(wire[1], 0);
        assert_eq!(&wire[2..], &payload(10)[..]);
    }

    #[test]
    fn test_large_payloads_compressed() {
        let (mut writer, _) = pair(64, false);
        let mut wire = BytesMut::new();
        let original = Bytes::from(vec![42u8; 4096]);
        writer.encode(original.clone(), &mut wire).unwrap();

        let (frame_length, header) = peek_varint(&wire, 3).unwrap().unwrap();
        assert_eq!(frame_length as usize, wire.len() - header);
        let (data_length, data_header) = peek_varint(&wire[header..], 5).unwrap().unwrap();
        assert_eq!(data_length, 4096);

        let mut inflated = Vec::new();
        ZlibDecoder::new(&wire[header + data_header..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, original.to_vec());
        assert!(wire.len() < 4096);
    }

    #[test]
    fn test_partial_frames_wait_for_more() {
        let (mut writer, mut reader) = pair(COMPRESSION_DISABLED, true);
        let mut wire = BytesMut::new();
        writer.encode(payload(300), &mut wire).unwrap();

        let mut partial = wire.split_to(100);
        assert!(reader.decode(&mut partial).unwrap().is_none());
        partial.unsplit(wire);
        let frame = reader.decode(&mut partial).unwrap().unwrap();
        assert_eq!(&frame[..], &payload(300)[..]);
    }

    #[test]
    fn test_encryption_covers_already_buffered_bytes() {
        let mut writer = FrameCodec::new();
        let mut reader = FrameCodec::new();
        let mut wire = BytesMut::new();

        writer.encode(payload(5), &mut wire).unwrap();
        writer.enable_encryption(&SECRET).unwrap();
        writer.encode(payload(9), &mut wire).unwrap();

        // Both frames arrive in one read before the reader learns about the cipher.
        assert_eq!(&reader.decode(&mut wire).unwrap().unwrap()[..], &payload(5)[..]);
        reader.enable_encryption(&SECRET).unwrap();
        assert_eq!(&reader.decode(&mut wire).unwrap().unwrap()[..], &payload(9)[..]);
    }

    #[test]
    fn test_cipher_is_write_once() {
        let mut codec = FrameCodec::new();
        codec.enable_encryption(&SECRET).unwrap();
        assert_matches!(codec.enable_encryption(&SECRET), Err(GlintError::Authentication(_)));
    }

    #[test]
    fn test_length_mismatch_is_fatal() {
        let mut reader = FrameCodec::new();
        reader.set_compression(16);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[1u8; 100]).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut body = BytesMut::new();
        put_varint(&mut body, 120);
        body.extend_from_slice(&compressed);
        let mut wire = BytesMut::new();
        put_varint(&mut wire, body.len() as i32);
        wire.extend_from_slice(&body);

        assert_matches!(reader.decode(&mut wire), Err(GlintError::Decode(_)));
    }

    #[test]
    fn test_compressed_below_threshold_rejected() {
        let mut reader = FrameCodec::new();
        reader.set_compression(256);
        let mut wire = BytesMut::new();
        // data length 10 claims compression below the threshold
        wire.extend_from_slice(&[3, 10, 0, 0]);
        assert_matches!(reader.decode(&mut wire), Err(GlintError::Decode(_)));
    }

    #[test]
    fn test_oversized_length_prefix() {
        let mut reader = FrameCodec::new();
        let mut wire = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0x01][..]);
        assert_matches!(reader.decode(&mut wire), Err(GlintError::Decode(_)));
    }

    #[test]
    fn test_peek_varint_needs_more() {
        assert_eq!(peek_varint(&[0x80], 3).unwrap(), None);
        assert_eq!(peek_varint(&[0xAC, 0x02], 3).unwrap(), Some((300, 2)));
    }
}
