use std::io::Cursor;

use easy::{Archive, CodecRegistry, CompressionKind, EasyError, OpenMode};

fn one_entry(kind: CompressionKind) -> Vec<u8> {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive
        .create_entry("file.txt", kind)
        .unwrap()
        .set_payload(b"hello hello hello".to_vec());
    archive.finalize().unwrap();
    archive.into_inner().into_inner()
}

/// Byte offset of the first record's compression tag.
const TAG_AT: usize = 12;
/// Byte offset of the first record's payload offset for an 8-byte name.
const OFFSET_AT: usize = TAG_AT + 2 + 4 + 8;
/// Byte offset of the first record's uncompressed length.
const LENGTH_AT: usize = OFFSET_AT + 8 + 8;

#[test]
fn bad_magic_is_rejected() {
    let mut bytes = one_entry(CompressionKind::None);
    bytes[..4].copy_from_slice(b"ZZZZ");
    match Archive::open(Cursor::new(bytes), OpenMode::Read) {
        Err(EasyError::BadMagic { expected, found }) => {
            assert_eq!(&expected, b"ESAR");
            assert_eq!(&found, b"ZZZZ");
        }
        other => panic!("unexpected {:?}", other.err()),
    }
}

#[test]
fn truncated_directory_is_reported() {
    let bytes = one_entry(CompressionKind::None);
    for cut in [0, 3, 4, 11, 12, 20, OFFSET_AT + 3] {
        let result = Archive::open(Cursor::new(bytes[..cut].to_vec()), OpenMode::Read);
        assert!(
            matches!(result, Err(EasyError::TruncatedInput { .. })),
            "cut at {cut}"
        );
    }
}

#[test]
fn payload_past_end_is_out_of_bounds() {
    let mut bytes = one_entry(CompressionKind::None);
    let len = bytes.len();
    bytes.truncate(len - 1);
    assert!(matches!(
        Archive::open(Cursor::new(bytes), OpenMode::Read),
        Err(EasyError::EntryOutOfBounds { name }) if name == "file.txt"
    ));

    let mut bytes = one_entry(CompressionKind::None);
    bytes[OFFSET_AT..OFFSET_AT + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        Archive::open(Cursor::new(bytes), OpenMode::Read),
        Err(EasyError::EntryOutOfBounds { .. })
    ));
}

#[test]
fn huge_entry_count_does_not_preallocate() {
    let mut bytes = b"ESAR".to_vec();
    bytes.extend_from_slice(&u64::MAX.to_le_bytes());
    assert!(matches!(
        Archive::open(Cursor::new(bytes), OpenMode::Read),
        Err(EasyError::TruncatedInput { .. })
    ));
}

#[test]
fn understated_length_stops_deflate_early() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive
        .create_entry("bomb.bin", CompressionKind::Deflate)
        .unwrap()
        .set_payload(vec![0u8; 16 << 20]);
    archive.finalize().unwrap();
    let mut bytes = archive.into_inner().into_inner();
    bytes[LENGTH_AT..LENGTH_AT + 8].copy_from_slice(&16u64.to_le_bytes());

    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Read).unwrap();
    assert_eq!(archive.entry(0).unwrap().uncompressed_len(), 16);
    assert!(matches!(
        archive.read_payload(0),
        Err(EasyError::SizeMismatch { declared: 16, actual: 17 })
    ));
}

#[test]
fn invalid_utf8_name_is_rejected() {
    let mut bytes = one_entry(CompressionKind::None);
    bytes[TAG_AT + 6] = 0xFF;
    assert!(matches!(
        Archive::open(Cursor::new(bytes), OpenMode::Read),
        Err(EasyError::InvalidEntryName(_))
    ));
}

#[test]
fn read_only_archive_rejects_edits() {
    let bytes = one_entry(CompressionKind::None);
    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Read).unwrap();
    assert_eq!(archive.mode(), OpenMode::Read);
    assert!(!archive.is_finalized());
    assert!(matches!(
        archive.create_entry("x", CompressionKind::None),
        Err(EasyError::ReadOnly)
    ));
    assert!(matches!(archive.remove_entry(0), Err(EasyError::ReadOnly)));
    assert!(matches!(archive.entry_mut(0), Err(EasyError::ReadOnly)));
    assert!(matches!(archive.finalize(), Err(EasyError::ReadOnly)));
}

#[test]
fn missing_index_is_reported() {
    let bytes = one_entry(CompressionKind::None);
    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Update).unwrap();
    assert!(matches!(archive.entry(3), Err(EasyError::EntryNotFound(3))));
    assert!(matches!(archive.read_payload(3), Err(EasyError::EntryNotFound(3))));
    assert!(matches!(archive.remove_entry(1), Err(EasyError::EntryNotFound(1))));
}

#[test]
fn unknown_tag_fails_only_on_read() {
    let mut bytes = one_entry(CompressionKind::None);
    bytes[TAG_AT..TAG_AT + 2].copy_from_slice(&77u16.to_le_bytes());
    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Read).unwrap();
    assert_eq!(archive.entry(0).unwrap().compression_tag(), 77);
    assert_eq!(archive.entry(0).unwrap().compression_kind(), None);
    assert!(matches!(
        archive.read_payload(0),
        Err(EasyError::UnsupportedCompressionKind(77))
    ));
}

#[test]
fn missing_codec_is_rejected_at_creation() {
    let mut archive = Archive::open_with_registry(
        Cursor::new(Vec::new()),
        OpenMode::Create,
        CodecRegistry::empty(),
    )
    .unwrap();
    assert!(matches!(
        archive.create_entry("x", CompressionKind::Deflate),
        Err(EasyError::UnsupportedCompressionKind(1))
    ));
}

#[test]
fn corrupt_payload_fails_without_poisoning_others() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive
        .create_entry("bad", CompressionKind::EasyLz)
        .unwrap()
        .set_payload(b"aaaaaaaaaaa".to_vec());
    archive
        .create_entry("good", CompressionKind::None)
        .unwrap()
        .set_payload(b"fine".to_vec());
    archive.finalize().unwrap();
    let bad_offset = archive.entry(0).unwrap().offset() as usize;
    let mut bytes = archive.into_inner().into_inner();
    // replace the length-bits byte of the raw frame
    bytes[bad_offset] = 0;

    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Read).unwrap();
    assert!(matches!(archive.read_payload(0), Err(EasyError::CorruptFrame(_))));
    assert!(!archive.entry(0).unwrap().is_loaded());
    assert_eq!(archive.read_payload(1).unwrap(), b"fine");
}
