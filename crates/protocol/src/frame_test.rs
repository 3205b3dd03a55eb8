//! Tests for the framing codec

use super::*;

// ============================================================================
// Header encoding
// ============================================================================

#[test]
fn test_header_starts_with_magic() {
    let header = encode_header(42).unwrap();
    assert_eq!(&header[..4], b"o`P%");
}

#[test]
fn test_header_length_is_base64_le() {
    // 5 = [0x05, 0x00, 0x00] -> "BQAA"
    let header = encode_header(5).unwrap();
    assert_eq!(&header[4..], b"BQAA");

    // 0x010203 -> [0x03, 0x02, 0x01] -> "AwIB"
    let header = encode_header(0x01_02_03).unwrap();
    assert_eq!(&header[4..], b"AwIB");
}

#[test]
fn test_header_zero_length() {
    let header = encode_header(0).unwrap();
    assert_eq!(decode_header(&header, 16).unwrap(), 0);
}

#[test]
fn test_header_rejects_unencodable_length() {
    let err = encode_header(MAX_ENCODABLE_SIZE).unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    assert!(encode_header(MAX_ENCODABLE_SIZE - 1).is_ok());
}

// ============================================================================
// Header decoding
// ============================================================================

#[test]
fn test_decode_roundtrip_lengths() {
    for len in [1usize, 255, 256, 65_535, 65_536, DEFAULT_MAX_MESSAGE_SIZE - 1] {
        let header = encode_header(len).unwrap();
        assert_eq!(decode_header(&header, DEFAULT_MAX_MESSAGE_SIZE).unwrap(), len);
    }
}

#[test]
fn test_decode_bad_magic() {
    let mut header = encode_header(10).unwrap();
    header[0] = b'x';

    let err = decode_header(&header, 1024).unwrap_err();
    assert!(matches!(err, ProtocolError::BadMagic { found } if found == *b"x`P%"));
    assert!(err.is_fatal());
}

#[test]
fn test_decode_each_magic_byte_checked() {
    for i in 0..4 {
        let mut header = encode_header(10).unwrap();
        header[i] ^= 0xff;
        assert!(matches!(
            decode_header(&header, 1024),
            Err(ProtocolError::BadMagic { .. })
        ));
    }
}

#[test]
fn test_decode_malformed_length() {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&MAGIC);
    header[4..].copy_from_slice(b"!!!!");

    let err = decode_header(&header, 1024).unwrap_err();
    assert!(matches!(err, ProtocolError::MalformedLength(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_decode_padded_short_width() {
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&MAGIC);
    header[4..].copy_from_slice(b"BQ==");

    assert_eq!(decode_header(&header, 1024).unwrap(), 5);
}

#[test]
fn test_decode_length_at_ceiling_rejected() {
    let header = encode_header(1024).unwrap();
    let err = decode_header(&header, 1024).unwrap_err();
    assert!(matches!(
        err,
        ProtocolError::FrameTooLarge {
            size: 1024,
            limit: 1024
        }
    ));

    let header = encode_header(1023).unwrap();
    assert_eq!(decode_header(&header, 1024).unwrap(), 1023);
}

// ============================================================================
// Frames
// ============================================================================

#[test]
fn test_encode_frame_layout() {
    let frame = encode_frame(b"hello").unwrap();
    assert_eq!(frame.len(), HEADER_SIZE + 5);
    assert_eq!(&frame[HEADER_SIZE..], b"hello");

    let mut header = [0u8; HEADER_SIZE];
    header.copy_from_slice(&frame[..HEADER_SIZE]);
    assert_eq!(decode_header(&header, 1024).unwrap(), 5);
}

#[tokio::test]
async fn test_read_write_frame_over_duplex() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_frame(&mut client, b"first").await.unwrap();
    write_frame(&mut client, b"second").await.unwrap();

    let a = read_frame(&mut server, 1024).await.unwrap();
    let b = read_frame(&mut server, 1024).await.unwrap();
    assert_eq!(&a[..], b"first");
    assert_eq!(&b[..], b"second");
}

#[tokio::test]
async fn test_read_frame_oversize_does_not_read_body() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_frame(&mut client, &[7u8; 64]).await.unwrap();
    let err = read_frame(&mut server, 32).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge { size: 64, .. }));
}
