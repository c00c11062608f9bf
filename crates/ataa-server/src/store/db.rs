use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::model::ContentDocument;

// ── Backend ──────────────────────────────────────────────────────────────────

/// Raw storage for the serialized content document. Production uses
/// [`FileBackend`]; tests swap in [`MemoryBackend`].
pub trait Backend: Send + Sync {
    /// Read the current serialized document, or `None` if nothing was ever
    /// written.
    fn read(&self) -> Result<Option<String>>;
    /// Overwrite the serialized document wholesale.
    fn write(&self, contents: &str) -> Result<()>;
}

/// File-backed storage. Writes go to a temp file in the same directory and
/// are renamed into place, so a crash mid-write never truncates the document.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for FileBackend {
    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("read content file: {}", self.path.display()))
            }
        }
    }

    fn write(&self, contents: &str) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).context("create temp content file")?;
        tmp.write_all(contents.as_bytes())
            .context("write temp content file")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("replace content file: {}", self.path.display()))?;
        Ok(())
    }
}

/// In-memory storage for tests.
#[derive(Default)]
pub struct MemoryBackend {
    cell: Mutex<Option<String>>,
}

impl Backend for MemoryBackend {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.cell.lock().expect("content lock poisoned").clone())
    }

    fn write(&self, contents: &str) -> Result<()> {
        *self.cell.lock().expect("content lock poisoned") = Some(contents.to_owned());
        Ok(())
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Thread-safe handle to the content document. Every load→mutate→save cycle
/// runs under one mutex, so concurrent admin edits cannot drop each other's
/// writes.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Box<dyn Backend>,
    lock: Mutex<()>,
    default_password: String,
}

impl Store {
    /// Open (or create) the content file at `path`. The document is loaded
    /// and healed immediately, so the administrator credential exists from
    /// the first start.
    pub fn open(path: &Path, default_password: impl Into<String>) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("create content dir")?;
        }
        let store = Self::with_backend(FileBackend::new(path), default_password)?;
        info!(path = %path.display(), "content store ready");
        Ok(store)
    }

    /// Build a store over any backend, loading and healing once up front.
    pub fn with_backend(
        backend: impl Backend + 'static,
        default_password: impl Into<String>,
    ) -> Result<Self> {
        let store = Self {
            inner: Arc::new(StoreInner {
                backend: Box::new(backend),
                lock: Mutex::new(()),
                default_password: default_password.into(),
            }),
        };
        store.load()?;
        Ok(store)
    }

    /// Read the document, healing shape and credential as needed. A missing
    /// or unparsable backing file falls back to defaults rather than failing;
    /// whenever healing changed anything, the result is persisted so the
    /// on-disk shape converges to the current schema.
    pub fn load(&self) -> Result<ContentDocument> {
        let _guard = self.inner.lock.lock().expect("content lock poisoned");
        self.load_unlocked()
    }

    /// Serialize the full document and overwrite the backing storage.
    pub fn save(&self, doc: &ContentDocument) -> Result<()> {
        let _guard = self.inner.lock.lock().expect("content lock poisoned");
        self.save_unlocked(doc)
    }

    /// Apply a mutation atomically: load, run `f`, save, all under one lock
    /// acquisition. Returns whatever `f` returns.
    pub fn update<R>(&self, f: impl FnOnce(&mut ContentDocument) -> R) -> Result<R> {
        let _guard = self.inner.lock.lock().expect("content lock poisoned");
        let mut doc = self.load_unlocked()?;
        let result = f(&mut doc);
        self.save_unlocked(&doc)?;
        Ok(result)
    }

    fn load_unlocked(&self) -> Result<ContentDocument> {
        let raw = self.inner.backend.read()?;

        let (mut doc, raw) = match raw {
            Some(raw) => match ContentDocument::from_json(&raw) {
                Some(doc) => (doc, Some(raw)),
                None => {
                    warn!("content file is unparsable, regenerating from defaults");
                    (ContentDocument::default(), None)
                }
            },
            None => {
                info!("no content file found, seeding defaults");
                (ContentDocument::default(), None)
            }
        };

        doc.heal_credential(&self.inner.default_password);

        // Persist only when the healed form differs from what is on disk.
        let serialized = to_pretty_json(&doc)?;
        if raw.as_deref() != Some(serialized.as_str()) {
            self.inner.backend.write(&serialized)?;
        }
        Ok(doc)
    }

    fn save_unlocked(&self, doc: &ContentDocument) -> Result<()> {
        self.inner.backend.write(&to_pretty_json(doc)?)
    }
}

fn to_pretty_json(doc: &ContentDocument) -> Result<String> {
    serde_json::to_string_pretty(doc).context("serialize content document")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_store() -> (Store, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.json");
        let store = Store::open(&path, "changeme").unwrap();
        (store, dir)
    }

    fn memory_store(seed: Option<&str>) -> Store {
        let backend = MemoryBackend::default();
        if let Some(raw) = seed {
            backend.write(raw).unwrap();
        }
        Store::with_backend(backend, "changeme").unwrap()
    }

    #[test]
    fn missing_file_seeds_complete_defaults() {
        let (store, dir) = make_store();
        let doc = store.load().unwrap();

        assert_eq!(doc.credential.username, "admin");
        assert!(!doc.credential.password_hash.is_empty());
        assert!(doc.hero_slides.is_empty());
        assert_eq!(doc.about.title, "");

        // The seeded document was persisted, camelCase and all.
        let on_disk = std::fs::read_to_string(dir.path().join("content.json")).unwrap();
        assert!(on_disk.contains("heroSlides"));
        assert!(on_disk.contains("\"username\": \"admin\""));
    }

    #[test]
    fn corrupt_file_recovers_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("content.json");
        std::fs::write(&path, "{{{{ not json").unwrap();

        let store = Store::open(&path, "changeme").unwrap();
        let doc = store.load().unwrap();
        assert_eq!(doc.credential.username, "admin");

        // The bad file was replaced with a parsable one.
        let healed = std::fs::read_to_string(&path).unwrap();
        assert!(ContentDocument::from_json(&healed).is_some());
    }

    #[test]
    fn partial_file_is_healed_and_converges_on_disk() {
        let store = memory_store(Some(r#"{"about":{"title":"X"}}"#));
        let doc = store.load().unwrap();

        assert_eq!(doc.about.title, "X");
        assert_eq!(doc.about.description, "");
        assert_eq!(doc.credential.username, "admin");

        // The healed shape is what storage holds now.
        let raw = store.inner.backend.read().unwrap().unwrap();
        assert!(raw.contains("volunteer"));
        assert!(raw.contains("passwordHash"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let (store, _dir) = make_store();
        let mut doc = store.load().unwrap();
        doc.about.title = "عنوان".to_owned();
        doc.volunteer.steps = vec!["أ".into(), "ب".into()];
        store.save(&doc).unwrap();

        assert_eq!(store.load().unwrap(), doc);
    }

    #[test]
    fn load_is_idempotent() {
        let (store, _dir) = make_store();
        let first = store.load().unwrap();
        store.save(&first).unwrap();
        assert_eq!(store.load().unwrap(), first);
    }

    #[test]
    fn sequential_updates_compose() {
        let store = memory_store(None);
        store
            .update(|doc| doc.about.title = "one".into())
            .unwrap();
        store
            .update(|doc| doc.contact.email = "a@b.c".into())
            .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.about.title, "one");
        assert_eq!(doc.contact.email, "a@b.c");
    }

    #[test]
    fn update_returns_the_closure_result() {
        let store = memory_store(None);
        let id = store
            .update(|doc| {
                let id = crate::store::model::allocate_id(doc.programs.iter().map(|p| p.id));
                doc.programs.push(crate::store::model::Program {
                    id,
                    title: "برنامج".into(),
                    ..Default::default()
                });
                id
            })
            .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.programs.len(), 1);
        assert_eq!(doc.programs[0].id, id);
    }

    #[test]
    fn existing_credential_survives_reload() {
        let store = memory_store(None);
        let doc = store.load().unwrap();
        let hash = doc.credential.password_hash.clone();

        // A second load must not regenerate the hash.
        assert_eq!(store.load().unwrap().credential.password_hash, hash);
    }
}
