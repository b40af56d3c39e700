use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bitpreview_core::{
    Bitstream, BitstreamId, PreviewConfig, PreviewError, PreviewNode, PreviewNodeId, StoreError,
    TRUNCATION_MARKER, ViewNode,
};
use bitpreview_extract::ArchiveExtractor;
use bitpreview_extract::TempScratch;
use bitpreview_service::{
    AccessPolicy, ContentSource, DirectorySource, InsertOutcome, MemoryStore, OpenAccess,
    PreviewOutcome, PreviewService, PreviewStore, PreviewSweeper, ReadAccess, to_persisted,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// In-memory content keyed by bitstream id; counts opens.
#[derive(Default)]
struct Blobs {
    data: HashMap<String, Vec<u8>>,
    opens: AtomicUsize,
}

impl Blobs {
    fn with(mut self, id: &str, data: impl Into<Vec<u8>>) -> Self {
        self.data.insert(id.to_string(), data.into());
        self
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ContentSource for Blobs {
    fn open(&self, bitstream: &Bitstream) -> io::Result<Box<dyn Read + '_>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        match self.data.get(bitstream.id.as_str()) {
            Some(bytes) => Ok(Box::new(&bytes[..])),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such blob")),
        }
    }
}

/// Grants everything except the listed bitstreams.
struct DenyList {
    denied: Vec<&'static str>,
    license: Vec<&'static str>,
    admin: bool,
}

impl DenyList {
    fn none() -> Self {
        Self {
            denied: Vec::new(),
            license: Vec::new(),
            admin: false,
        }
    }
}

impl AccessPolicy for DenyList {
    fn read_access(&self, bitstream: &Bitstream) -> ReadAccess {
        let id = bitstream.id.as_str();
        if self.denied.iter().any(|d| *d == id) {
            ReadAccess::Denied
        } else if self.license.iter().any(|l| *l == id) {
            ReadAccess::LicenseRequired
        } else {
            ReadAccess::Granted
        }
    }

    fn is_admin(&self) -> bool {
        self.admin
    }
}

/// Store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    ids: AtomicUsize,
}

impl PreviewStore for BrokenStore {
    fn next_id(&self) -> Result<PreviewNodeId, StoreError> {
        Ok(PreviewNodeId::new(self.ids.fetch_add(1, Ordering::SeqCst) as u64))
    }

    fn insert_tree(&self, _: &BitstreamId, _: Vec<PreviewNode>) -> Result<InsertOutcome, StoreError> {
        Err(StoreError::with_source(
            "insert failed",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        ))
    }

    fn has_preview(&self, _: &BitstreamId) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn find_roots(&self, _: &BitstreamId) -> Result<Vec<PreviewNode>, StoreError> {
        Ok(Vec::new())
    }

    fn find_node(&self, _: PreviewNodeId) -> Result<Option<PreviewNode>, StoreError> {
        Ok(None)
    }

    fn bitstreams(&self) -> Result<Vec<BitstreamId>, StoreError> {
        Ok(Vec::new())
    }

    fn delete_tree(&self, _: &BitstreamId) -> Result<usize, StoreError> {
        Err(StoreError::new("delete failed"))
    }
}

/// Never reports a stored preview, as if another writer always lands
/// between the existence check and the insert.
struct LateWriterStore(MemoryStore);

impl PreviewStore for LateWriterStore {
    fn next_id(&self) -> Result<PreviewNodeId, StoreError> {
        self.0.next_id()
    }

    fn insert_tree(
        &self,
        bitstream: &BitstreamId,
        roots: Vec<PreviewNode>,
    ) -> Result<InsertOutcome, StoreError> {
        self.0.insert_tree(bitstream, roots)
    }

    fn has_preview(&self, _: &BitstreamId) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn find_roots(&self, bitstream: &BitstreamId) -> Result<Vec<PreviewNode>, StoreError> {
        self.0.find_roots(bitstream)
    }

    fn find_node(&self, id: PreviewNodeId) -> Result<Option<PreviewNode>, StoreError> {
        self.0.find_node(id)
    }

    fn bitstreams(&self) -> Result<Vec<BitstreamId>, StoreError> {
        self.0.bitstreams()
    }

    fn delete_tree(&self, bitstream: &BitstreamId) -> Result<usize, StoreError> {
        self.0.delete_tree(bitstream)
    }
}

fn on_load() -> PreviewConfig {
    PreviewConfig::builder()
        .generate_on_page_load(true)
        .build()
        .unwrap()
}

fn service<P: AccessPolicy>(config: PreviewConfig, policy: P) -> PreviewService<MemoryStore, P> {
    PreviewService::new(config, MemoryStore::new(), policy).unwrap()
}

#[test]
fn test_zip_preview_is_generated_and_stored() {
    let zip = build_zip(&[("a.txt", "aaaaaaaaaa"), ("dir/b.txt", "bbbbbbbbbbbbbbbbbbbb")]);
    let blobs = Blobs::default().with("z1", zip);
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("z1", Some("data.zip"), "application/zip", 1);

    let roots = svc.get_or_generate(&bitstream, &blobs).unwrap();

    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0], ViewNode::file("a.txt", 10));
    assert_eq!(roots[1].child("b.txt"), Some(&ViewNode::file("b.txt", 20)));
    assert!(svc.store().has_preview(&bitstream.id).unwrap());
    assert_eq!(svc.store().node_count(), 3);
}

#[test]
fn test_stored_preview_is_served_without_reading_content() {
    let zip = build_zip(&[("a.txt", "abc")]);
    let blobs = Blobs::default().with("z1", zip);
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("z1", Some("data.zip"), "application/zip", 1);

    let first = svc.get_or_generate(&bitstream, &blobs).unwrap();
    let second = svc.get_or_generate(&bitstream, &blobs).unwrap();

    assert_eq!(first, second);
    assert_eq!(blobs.opens(), 1);
}

#[test]
fn test_no_generation_when_page_load_generation_disabled() {
    let blobs = Blobs::default().with("t1", "hello");
    let svc = service(PreviewConfig::default(), OpenAccess);
    let bitstream = Bitstream::new("t1", Some("notes.txt"), "text/plain", 1);

    assert!(svc.get_or_generate(&bitstream, &blobs).unwrap().is_empty());
    assert_eq!(blobs.opens(), 0);
    assert!(svc.store().is_empty());
}

#[test]
fn test_gate_blocks_before_any_work() {
    let blobs = Blobs::default().with("t1", "hello").with("t2", "hello");
    let policy = DenyList {
        denied: vec!["t1"],
        license: vec!["t2"],
        admin: false,
    };
    let svc = service(on_load(), policy);

    for id in ["t1", "t2"] {
        let bitstream = Bitstream::new(id, Some("notes.txt"), "text/plain", 1);
        assert!(!svc.can_preview(&bitstream));
        assert!(svc.get_or_generate(&bitstream, &blobs).unwrap().is_empty());
    }
    assert_eq!(blobs.opens(), 0);
}

#[test]
fn test_disabled_feature_blocks_everything() {
    let config = PreviewConfig::builder()
        .preview_enabled(false)
        .generate_on_page_load(true)
        .build()
        .unwrap();
    let svc = service(config, OpenAccess);
    let bitstream = Bitstream::new("t1", Some("notes.txt"), "text/plain", 1);

    assert!(!svc.can_preview(&bitstream));
    assert!(svc.get_or_generate(&bitstream, &Blobs::default()).unwrap().is_empty());
}

#[test]
fn test_plain_text_with_archive_name_is_rejected() {
    let blobs = Blobs::default().with("t1", "PK not text");
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("t1", Some("archive.zip"), "text/plain", 1);

    let err = svc.get_or_generate(&bitstream, &blobs).unwrap_err();
    assert!(matches!(err, PreviewError::Validation { .. }));
    assert!(svc.store().is_empty());
}

#[test]
fn test_long_text_truncated_to_limit() {
    let text = "y".repeat(5000);
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("t1", Some("long.txt"), "text/plain", 1);

    let roots = svc.generate(&bitstream, text.as_bytes()).unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].name, "long.txt");
    assert_eq!(roots[0].content.chars().count(), 2000);
    assert!(roots[0].content.ends_with(TRUNCATION_MARKER));
}

#[test]
fn test_short_text_unchanged_and_stored() {
    let text = "z".repeat(1000);
    let blobs = Blobs::default().with("t1", text.clone());
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("t1", Some("short.txt"), "text/plain; charset=utf-8", 1);

    let roots = svc.get_or_generate(&bitstream, &blobs).unwrap();

    assert_eq!(roots, vec![ViewNode::text("short.txt", text.clone())]);
    let stored = svc.stored_preview(&bitstream.id).unwrap();
    assert_eq!(stored[0].content, text);
}

#[test]
fn test_html_is_returned_in_full_but_not_stored() {
    let body = format!("<html><body>{}</body></html>", "p".repeat(5000));
    let blobs = Blobs::default().with("h1", body.clone());
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("h1", Some("index.html"), "text/html", 1);

    let roots = svc.get_or_generate(&bitstream, &blobs).unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].content, body);
    assert!(!svc.store().has_preview(&bitstream.id).unwrap());
}

#[test]
fn test_batch_path_skips_reading_unstored_kinds() {
    let blobs = Blobs::default().with("h1", "<p>hi</p>");
    let svc = service(PreviewConfig::default(), OpenAccess);
    let bitstream = Bitstream::new("h1", Some("index.html"), "text/html", 1);

    assert_eq!(svc.ensure_preview(&bitstream, &blobs).unwrap(), PreviewOutcome::Transient);
    assert_eq!(blobs.opens(), 0);
    assert!(!svc.store().has_preview(&bitstream.id).unwrap());
}

#[test]
fn test_ids_outside_directory_root_give_empty_preview() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("assets");
    std::fs::create_dir(&root).unwrap();
    let secret = temp.path().join("secret.txt");
    std::fs::write(&secret, "SECRET").unwrap();

    let source = DirectorySource::new(&root);
    let svc = service(on_load(), OpenAccess);

    for id in [secret.to_string_lossy().into_owned(), "../secret.txt".to_string()] {
        let bitstream = Bitstream::new(id, Some("secret.txt"), "text/plain", 1);
        assert!(svc.get_or_generate(&bitstream, &source).unwrap().is_empty());
        assert!(!svc.store().has_preview(&bitstream.id).unwrap());
    }
}

#[test]
fn test_corrupt_archive_gives_empty_preview() {
    let blobs = Blobs::default().with("z1", b"not a zip at all".to_vec());
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("z1", Some("broken.zip"), "application/zip", 1);

    assert!(svc.get_or_generate(&bitstream, &blobs).unwrap().is_empty());
    assert!(svc.store().is_empty());
}

#[test]
fn test_missing_content_gives_empty_preview() {
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("gone", Some("gone.zip"), "application/zip", 1);

    assert!(svc.get_or_generate(&bitstream, &Blobs::default()).unwrap().is_empty());
}

#[test]
fn test_unsupported_kind_gives_empty_preview() {
    let blobs = Blobs::default().with("p1", vec![0u8; 16]);
    let svc = service(on_load(), OpenAccess);
    let bitstream = Bitstream::new("p1", Some("photo.png"), "image/png", 1);

    assert!(svc.get_or_generate(&bitstream, &blobs).unwrap().is_empty());
    assert_eq!(blobs.opens(), 0);
}

#[test]
fn test_concurrent_writer_wins_and_its_tree_is_returned() {
    let zip = build_zip(&[("mine.txt", "1")]);
    let blobs = Blobs::default().with("z1", zip);
    let svc = PreviewService::new(on_load(), LateWriterStore(MemoryStore::new()), OpenAccess).unwrap();
    let bitstream = Bitstream::new("z1", Some("data.zip"), "application/zip", 1);

    let theirs = ViewNode::file("theirs.txt", 2);
    let persisted = to_persisted(&svc.store().0, &bitstream.id, &theirs).unwrap();
    svc.store().0.insert_tree(&bitstream.id, vec![persisted]).unwrap();

    assert_eq!(svc.get_or_generate(&bitstream, &blobs).unwrap(), vec![theirs]);
    assert_eq!(
        svc.ensure_preview(&bitstream, &blobs).unwrap(),
        PreviewOutcome::Existing
    );
    assert_eq!(blobs.opens(), 2);
    assert_eq!(svc.store().0.len(), 1);
    assert_eq!(svc.store().0.node_count(), 1);
}

#[test]
fn test_racing_inserts_keep_one_tree() {
    let store = Arc::new(MemoryStore::new());
    let bitstream = BitstreamId::new("z1");

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            let bitstream = bitstream.clone();
            std::thread::spawn(move || {
                let view = ViewNode::file(format!("writer{i}.txt"), i);
                let root = to_persisted(store.as_ref(), &bitstream, &view).unwrap();
                store.insert_tree(&bitstream, vec![root]).unwrap()
            })
        })
        .collect();

    let inserted = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|outcome| *outcome == InsertOutcome::Inserted)
        .count();

    assert_eq!(inserted, 1);
    assert_eq!(store.find_roots(&bitstream).unwrap().len(), 1);
}

#[test]
fn test_persistence_failure_is_surfaced() {
    let blobs = Blobs::default().with("t1", "hello");
    let svc = PreviewService::new(on_load(), BrokenStore::default(), OpenAccess).unwrap();
    let bitstream = Bitstream::new("t1", Some("notes.txt"), "text/plain", 1);

    let err = svc.get_or_generate(&bitstream, &blobs).unwrap_err();
    assert!(err.is_persistence());
}

#[test]
fn test_delete_requires_admin() {
    let zip = build_zip(&[("a.txt", "abc")]);
    let blobs = Blobs::default().with("z1", zip);
    let bitstream = Bitstream::new("z1", Some("data.zip"), "application/zip", 1);

    let svc = service(on_load(), DenyList::none());
    svc.get_or_generate(&bitstream, &blobs).unwrap();
    let err = svc.delete_preview(&bitstream.id).unwrap_err();
    assert!(matches!(err, PreviewError::Forbidden { .. }));
    assert!(svc.store().has_preview(&bitstream.id).unwrap());

    let admin = service(on_load(), OpenAccess);
    admin.get_or_generate(&bitstream, &blobs).unwrap();
    assert_eq!(admin.delete_preview(&bitstream.id).unwrap(), 1);
    assert!(!admin.store().has_preview(&bitstream.id).unwrap());
}

#[test]
fn test_preview_url_reflects_live_permission() {
    let policy = DenyList {
        denied: vec!["b2"],
        license: Vec::new(),
        admin: false,
    };
    let svc = service(PreviewConfig::default(), policy);

    let open = Bitstream::new("b1", Some("a b.zip"), "application/zip", 3);
    let closed = Bitstream::new("b2", Some("c.zip"), "application/zip", 4);

    assert_eq!(
        svc.preview_url(None, &open, "/server"),
        "/server/api/core/bitstreams/id/b1/a%20b.zip?sequence=3&isAllowed=y"
    );
    assert!(svc.preview_url(None, &closed, "/server").ends_with("&isAllowed=n"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = PreviewConfig {
        max_leaf_count: 0,
        ..PreviewConfig::default()
    };
    let result = PreviewService::new(config, MemoryStore::new(), OpenAccess);
    assert!(matches!(result, Err(PreviewError::InvalidConfig { .. })));
}

#[test]
fn test_custom_scratch_dir_left_empty() {
    let temp = TempDir::new().unwrap();
    let zip = build_zip(&[("a.txt", "abc")]);
    let blobs = Blobs::default().with("z1", zip);
    let svc = service(on_load(), OpenAccess)
        .with_extractor(ArchiveExtractor::with_scratch(TempScratch::in_dir(temp.path())));
    let bitstream = Bitstream::new("z1", Some("data.zip"), "application/zip", 1);

    assert_eq!(svc.get_or_generate(&bitstream, &blobs).unwrap().len(), 1);
    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn test_sweep_continues_past_failures() {
    let blobs = Blobs::default()
        .with("ok1", build_zip(&[("a.txt", "a")]))
        .with("bad", "PK")
        .with("ok2", "plain words")
        .with("html", "<p>hi</p>");
    let policy = DenyList {
        denied: vec!["secret"],
        license: Vec::new(),
        admin: false,
    };
    let svc = service(PreviewConfig::default(), policy);

    let bitstreams = vec![
        Bitstream::new("ok1", Some("one.zip"), "application/zip", 1),
        Bitstream::new("bad", Some("mislabelled.zip"), "text/plain", 2),
        Bitstream::new("ok2", Some("two.txt"), "text/plain", 3),
        Bitstream::new("secret", Some("s.txt"), "text/plain", 4),
        Bitstream::new("html", Some("p.html"), "text/html", 5),
        Bitstream::new("missing", Some("m.zip"), "application/zip", 6),
    ];

    let sweeper = PreviewSweeper::new();
    let report = sweeper.run(&svc, &blobs, bitstreams.clone());

    assert_eq!(report.processed, 6);
    assert_eq!(report.generated, 2);
    assert_eq!(report.denied, 1);
    assert_eq!(report.transient, 1);
    assert_eq!(report.empty, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].bitstream, BitstreamId::new("bad"));
    assert!(svc.store().has_preview(&BitstreamId::new("ok2")).unwrap());

    let again = sweeper.run(&svc, &blobs, bitstreams);
    assert_eq!(again.generated, 0);
    assert_eq!(again.existing, 2);
}

#[test]
fn test_sweep_reports_progress() {
    let blobs = Blobs::default().with("t", "x");
    let svc = service(PreviewConfig::default(), OpenAccess);
    let sweeper = PreviewSweeper::new();
    let mut progress = sweeper.subscribe();

    let bitstreams = (0..250).map(|i| Bitstream::new(format!("n{i}"), Some("x.bin"), "image/png", i));
    let report = sweeper.run(&svc, &blobs, bitstreams);

    assert_eq!(report.processed, 250);
    assert_eq!(progress.try_recv().unwrap().processed, 100);
    assert_eq!(progress.try_recv().unwrap().processed, 200);
    assert!(progress.try_recv().is_err());
}
