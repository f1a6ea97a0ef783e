use std::fs::{self, File};
use std::io::Cursor;
use std::time::{Duration, UNIX_EPOCH};

use easy::{Archive, CompressionKind, EasyError, OpenMode};

#[test]
fn directory_roundtrip_through_disk() {
    let src = tempfile::tempdir().unwrap();
    fs::create_dir_all(src.path().join("nested/deeper")).unwrap();
    fs::write(src.path().join("b.txt"), b"bravo").unwrap();
    fs::write(src.path().join("a.txt"), b"alpha").unwrap();
    fs::write(src.path().join("nested/deeper/c.bin"), vec![3u8; 500]).unwrap();

    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    let added = archive.add_dir(src.path(), CompressionKind::EasyLz).unwrap();
    assert_eq!(added, 3);
    let names: Vec<&str> = archive.entries().iter().map(|e| e.name()).collect();
    assert_eq!(names, ["a.txt", "b.txt", "nested/deeper/c.bin"]);
    assert_eq!(archive.entry(2).unwrap().file_name(), "c.bin");
    archive.finalize().unwrap();

    let bytes = archive.into_inner().into_inner();
    let dst = tempfile::tempdir().unwrap();
    let mut archive = Archive::open(Cursor::new(bytes), OpenMode::Read).unwrap();
    assert_eq!(archive.extract_all(dst.path()).unwrap(), 3);
    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"alpha");
    assert_eq!(fs::read(dst.path().join("b.txt")).unwrap(), b"bravo");
    assert_eq!(
        fs::read(dst.path().join("nested/deeper/c.bin")).unwrap(),
        vec![3u8; 500]
    );
}

#[test]
fn add_file_keeps_modification_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stamp.txt");
    fs::write(&path, b"stamped").unwrap();
    let when = UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(when)
        .unwrap();

    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    let index = archive
        .add_file(&path, "renamed.txt", CompressionKind::Deflate)
        .unwrap();
    let entry = archive.entry(index).unwrap();
    assert_eq!(entry.name(), "renamed.txt");
    assert_eq!(entry.modified(), 1_600_000_000);
    assert_eq!(entry.uncompressed_len(), 7);
    archive.finalize().unwrap();

    let out = tempfile::tempdir().unwrap();
    let mut archive =
        Archive::open(Cursor::new(archive.into_inner().into_inner()), OpenMode::Read).unwrap();
    archive.extract_all(out.path()).unwrap();
    let restored = fs::metadata(out.path().join("renamed.txt"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(restored, when);
}

#[test]
fn extraction_refuses_escaping_names() {
    let mut archive = Archive::create(Cursor::new(Vec::new())).unwrap();
    archive
        .create_entry("../evil", CompressionKind::None)
        .unwrap()
        .set_payload(b"x".to_vec());
    archive.finalize().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("inside");
    let mut archive =
        Archive::open(Cursor::new(archive.into_inner().into_inner()), OpenMode::Read).unwrap();
    assert!(matches!(
        archive.extract_all(&target),
        Err(EasyError::UnsafePath(name)) if name == "../evil"
    ));
    assert!(!dir.path().join("evil").exists());
}
