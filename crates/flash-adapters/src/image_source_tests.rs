use super::*;
use std::io::Write as _;

async fn drain(mut rx: mpsc::Receiver<Chunk>) -> Result<Vec<u8>, ImageSourceError> {
    let mut out = Vec::new();
    while let Some(chunk) = rx.recv().await {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[tokio::test]
async fn open_streams_plain_image_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("os.img");
    std::fs::write(&path, b"hello plain world").unwrap();

    let image = Image {
        name: "os.img".into(),
        path,
        compressed: false,
        uncompressed_bytes: Some(18),
        digest: None,
    };
    let rx = open(&image, 4);
    let out = drain(rx).await.unwrap();
    assert_eq!(out, b"hello plain world");
}

#[tokio::test]
async fn open_decodes_gzip_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("os.img.gz");
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"decompressed payload").unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let image = Image {
        name: "os.img.gz".into(),
        path,
        compressed: true,
        uncompressed_bytes: None,
        digest: None,
    };
    let rx = open(&image, 8);
    let out = drain(rx).await.unwrap();
    assert_eq!(out, b"decompressed payload");
}

#[tokio::test]
async fn open_decodes_zstd_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("os.img.zst");
    let encoded = zstd::stream::encode_all(&b"zstd payload"[..], 0).unwrap();
    std::fs::write(&path, encoded).unwrap();

    let image = Image {
        name: "os.img.zst".into(),
        path,
        compressed: true,
        uncompressed_bytes: None,
        digest: None,
    };
    let rx = open(&image, 8);
    let out = drain(rx).await.unwrap();
    assert_eq!(out, b"zstd payload");
}

#[test]
fn resolve_plain_image_uses_file_size() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("os.img"), b"0123456789").unwrap();

    let image = resolve("os.img", dir.path()).unwrap();
    assert_eq!(image.uncompressed_bytes, Some(10));
    assert!(!image.compressed);
}

#[test]
fn resolve_gzip_image_has_no_known_length() {
    let dir = tempfile::tempdir().unwrap();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"payload").unwrap();
    std::fs::write(dir.path().join("os.img.gz"), encoder.finish().unwrap()).unwrap();

    let image = resolve("os.img.gz", dir.path()).unwrap();
    assert_eq!(image.uncompressed_bytes, None);
    assert!(image.compressed);
}

#[test]
fn resolve_zstd_image_recovers_embedded_content_size() {
    let dir = tempfile::tempdir().unwrap();
    let payload = vec![7u8; 9_000];
    let encoded = zstd::stream::encode_all(&payload[..], 0).unwrap();
    std::fs::write(dir.path().join("os.img.zst"), encoded).unwrap();

    let image = resolve("os.img.zst", dir.path()).unwrap();
    assert_eq!(image.uncompressed_bytes, Some(9_000));
}

#[test]
fn resolve_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = resolve("missing.img", dir.path()).unwrap_err();
    assert!(matches!(err, ImageSourceError::NotFound(_)));
}

#[tokio::test]
async fn open_reports_not_found() {
    let image = Image {
        name: "missing.img".into(),
        path: "/no/such/path/missing.img".into(),
        compressed: false,
        uncompressed_bytes: None,
        digest: None,
    };
    let rx = open(&image, 8);
    let err = drain(rx).await.unwrap_err();
    assert!(matches!(err, ImageSourceError::NotFound(_)));
}
