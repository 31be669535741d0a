use std::io::Read;
use std::io::Write;

use super::*;
use crate::test_utils::enable_logger;
use crate::Error;
use crate::StorageError;
use crate::SystemError;

fn read_all(mut reader: Box<dyn Read + Send>) -> Vec<u8> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).unwrap();
    buf
}

#[test]
fn test_write_and_read_uncompressed() {
    enable_logger();
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();
    let path = temp_dir.path().join("app_1/shuffle_0/partition_3.data");

    let mut stream = storage.create_writer_stream(&path, "").unwrap();
    stream.write_all(b"k1v1").unwrap();
    stream.write_all(b"k2v2").unwrap();
    assert_eq!(stream.written_bytes(), 8);
    stream.close().unwrap();

    assert!(storage.exists(&path));
    assert_eq!(storage.size(&path).unwrap(), 8);
    assert_eq!(read_all(storage.create_reader_stream(&path).unwrap()), b"k1v1k2v2");
}

#[test]
fn test_writer_appends_to_existing_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::new(4096);
    let path = temp_dir.path().join("partition_0.data");

    for chunk in [&b"first-"[..], &b"second"[..]] {
        let mut stream = storage.create_writer_stream(&path, "none").unwrap();
        stream.write_all(chunk).unwrap();
        stream.close().unwrap();
    }

    assert_eq!(read_all(storage.create_reader_stream(&path).unwrap()), b"first-second");
}

#[test]
fn test_zlib_stream_is_compressed_on_disk() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();
    let path = temp_dir.path().join("partition_1.data");
    let payload = vec![b'a'; 64 * 1024];

    let mut stream = storage.create_writer_stream(&path, "ZLIB").unwrap();
    assert_eq!(stream.codec(), CompressionCodec::Zlib);
    stream.write_all(&payload).unwrap();
    stream.close().unwrap();

    assert!(storage.size(&path).unwrap() < payload.len() as u64);
    let raw = storage.create_reader_stream(&path).unwrap();
    assert_eq!(read_all(CompressionCodec::Zlib.wrap_reader(raw)), payload);
}

#[test]
fn test_gzip_appended_members_decode_in_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::new(1024);
    let path = temp_dir.path().join("partition_2.data");

    for chunk in [&b"hello "[..], &b"world"[..]] {
        let mut stream = storage.create_writer_stream(&path, "gzip").unwrap();
        stream.write_all(chunk).unwrap();
        stream.close().unwrap();
    }

    let raw = storage.create_reader_stream(&path).unwrap();
    assert_eq!(read_all(CompressionCodec::Gzip.wrap_reader(raw)), b"hello world");
}

#[test]
fn test_unknown_codec_is_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();

    let e = storage
        .create_writer_stream(&temp_dir.path().join("x.data"), "snappy-v9")
        .unwrap_err();
    assert!(matches!(
        e,
        Error::System(SystemError::Storage(StorageError::UnsupportedCodec(_)))
    ));
}

#[test]
fn test_block_codecs_are_rejected_by_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();

    for name in ["lz4", "zstd", "ZSTD"] {
        let path = temp_dir.path().join(format!("{name}.data"));
        let e = storage.create_writer_stream(&path, name).unwrap_err();
        assert!(
            e.to_string().contains(name),
            "codec name missing from error: {e}"
        );
        assert!(!storage.exists(&path));
    }
}

#[test]
fn test_write_after_close_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();
    let mut stream = storage
        .create_writer_stream(&temp_dir.path().join("closed.data"), "")
        .unwrap();

    stream.close().unwrap();
    stream.close().unwrap();
    assert!(stream.write_all(b"late").is_err());
}

#[test]
fn test_list_create_and_delete() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();
    let root = temp_dir.path().join("app_1");

    storage.create_directories(&root.join("shuffle_0")).unwrap();
    storage.create_directories(&root.join("shuffle_1/nested")).unwrap();
    std::fs::write(root.join("shuffle_0/p0.data"), b"0").unwrap();
    std::fs::write(root.join("shuffle_1/nested/p1.data"), b"1").unwrap();

    let files = storage.list_all_files(&root).unwrap();
    assert_eq!(
        files,
        vec![root.join("shuffle_0/p0.data"), root.join("shuffle_1/nested/p1.data")]
    );

    storage.delete_file(&root.join("shuffle_0/p0.data"));
    assert!(!storage.exists(&root.join("shuffle_0/p0.data")));
    // best effort: deleting again is silent
    storage.delete_file(&root.join("shuffle_0/p0.data"));

    storage.delete_directory(&root).unwrap();
    assert!(!storage.exists(&root));
    storage.delete_directory(&root).unwrap();
}

#[test]
fn test_missing_paths_report_storage_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    let storage = ShuffleFileStorage::default();
    let missing = temp_dir.path().join("missing");

    for e in [
        storage.list_all_files(&missing).unwrap_err(),
        storage.size(&missing).unwrap_err(),
        storage.create_reader_stream(&missing).map(|_| ()).unwrap_err(),
    ] {
        assert!(matches!(
            e,
            Error::System(SystemError::Storage(StorageError::PathError { .. }))
        ));
    }
}

#[test]
fn test_display_and_locality() {
    let storage = ShuffleFileStorage::from_config(&crate::StorageConfig {
        buffer_size: 8192,
        ..Default::default()
    });
    assert!(storage.is_local_storage());
    assert_eq!(storage.to_string(), "ShuffleFileStorage{bufferSize=8192}");
}
