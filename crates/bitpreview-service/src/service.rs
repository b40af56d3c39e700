//! Preview orchestration.

use std::io::{self, Read};

use bitpreview_core::{
    Bitstream, BitstreamId, ContentKind, ItemRef, PreviewConfig, PreviewError, ViewNode,
    has_archive_extension,
};
use bitpreview_extract::{
    ArchiveExtractor, ArchiveFormat, ScratchSpace, TempScratch, TreeMaterializer, TruncationPolicy,
};

use crate::access::{AccessPolicy, PreviewGate};
use crate::convert::{to_persisted, to_view};
use crate::source::ContentSource;
use crate::store::{InsertOutcome, PreviewStore};
use crate::url::compose_preview_url;

/// Worst-case UTF-8 width; bounds the bytes read for plain text.
const MAX_UTF8_BYTES: u64 = 4;

/// What [`PreviewService::ensure_preview`] did for one bitstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Previews are off or the caller cannot read the bitstream.
    Denied,
    /// A preview was already stored.
    Existing,
    /// A new preview was generated and stored.
    Stored {
        /// Number of nodes written.
        nodes: usize,
    },
    /// A preview was generated but its kind is never stored.
    Transient,
    /// Nothing to show.
    Empty,
}

/// Ties together the gate, extraction, truncation and the store.
pub struct PreviewService<S, P, X = TempScratch> {
    config: PreviewConfig,
    store: S,
    gate: PreviewGate<P>,
    extractor: ArchiveExtractor<X>,
    materializer: TreeMaterializer,
    truncation: TruncationPolicy,
}

impl<S: PreviewStore, P: AccessPolicy> PreviewService<S, P> {
    /// Create a service with the default scratch space.
    pub fn new(config: PreviewConfig, store: S, policy: P) -> Result<Self, PreviewError> {
        config
            .validate()
            .map_err(|message| PreviewError::InvalidConfig { message })?;

        Ok(Self {
            gate: PreviewGate::new(config.preview_enabled, policy),
            truncation: TruncationPolicy::from_config(&config),
            extractor: ArchiveExtractor::new(),
            materializer: TreeMaterializer::new(),
            store,
            config,
        })
    }
}

impl<S, P, X> PreviewService<S, P, X>
where
    S: PreviewStore,
    P: AccessPolicy,
    X: ScratchSpace,
{
    /// Replace the archive extractor.
    pub fn with_extractor<Y: ScratchSpace>(
        self,
        extractor: ArchiveExtractor<Y>,
    ) -> PreviewService<S, P, Y> {
        PreviewService {
            config: self.config,
            store: self.store,
            gate: self.gate,
            extractor,
            materializer: self.materializer,
            truncation: self.truncation,
        }
    }

    /// Get the active configuration.
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Get the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the authorization gate.
    pub fn gate(&self) -> &PreviewGate<P> {
        &self.gate
    }

    /// Whether the bitstream may be previewed by the current caller.
    pub fn can_preview(&self, bitstream: &Bitstream) -> bool {
        self.gate.can_preview(bitstream)
    }

    /// Build the preview URL, flagging whether the caller may read it now.
    pub fn preview_url(&self, item: Option<&ItemRef>, bitstream: &Bitstream, base_path: &str) -> String {
        compose_preview_url(item, bitstream, base_path, self.gate.has_read_access(bitstream))
    }

    /// Generate a preview from a content stream without touching the store.
    ///
    /// Archive and read failures give an empty preview. The only error is a
    /// plain-text bitstream whose filename carries an archive extension.
    pub fn generate<R: Read>(
        &self,
        bitstream: &Bitstream,
        reader: R,
    ) -> Result<Vec<ViewNode>, PreviewError> {
        let kind = bitstream.kind();

        if let Some(format) = ArchiveFormat::from_kind(kind) {
            let records = self.extractor.extract(reader, format);
            let records = self.truncation.limit_leaves(records);
            return Ok(self.materializer.materialize(&records));
        }

        match kind {
            ContentKind::PlainText => {
                let name = bitstream.name_or_empty();
                if has_archive_extension(name) {
                    return Err(PreviewError::validation(name, bitstream.mime_type.clone()));
                }
                Ok(self.text_preview(bitstream, reader, true))
            }
            ContentKind::Html => Ok(self.text_preview(bitstream, reader, false)),
            _ => {
                tracing::debug!(bitstream = %bitstream.id, mime = %bitstream.mime_type, "no preview for content kind");
                Ok(Vec::new())
            }
        }
    }

    /// Return the stored preview, or generate one when allowed.
    ///
    /// Generation only happens when `generate_on_page_load` is set. Freshly
    /// generated archive and text previews are stored; HTML is returned but
    /// never stored. If another writer stored a preview first, that one is
    /// returned.
    pub fn get_or_generate<C: ContentSource + ?Sized>(
        &self,
        bitstream: &Bitstream,
        source: &C,
    ) -> Result<Vec<ViewNode>, PreviewError> {
        if !self.can_preview(bitstream) {
            return Ok(Vec::new());
        }
        if self.store.has_preview(&bitstream.id)? {
            return self.stored_preview(&bitstream.id);
        }
        if !self.config.generate_on_page_load {
            tracing::debug!(bitstream = %bitstream.id, "no stored preview, generation on page load disabled");
            return Ok(Vec::new());
        }

        let roots = self.generate_from(bitstream, source)?;
        if roots.is_empty() || !bitstream.kind().is_persistable() {
            return Ok(roots);
        }

        match self.persist(&bitstream.id, &roots)? {
            InsertOutcome::Inserted => Ok(roots),
            InsertOutcome::AlreadyPresent(existing) => Ok(existing.iter().map(to_view).collect()),
        }
    }

    /// Make sure a preview is stored, generating it if missing.
    ///
    /// Ignores `generate_on_page_load`; this is the batch path. Kinds that are
    /// never stored report [`PreviewOutcome::Transient`] without reading content.
    pub fn ensure_preview<C: ContentSource + ?Sized>(
        &self,
        bitstream: &Bitstream,
        source: &C,
    ) -> Result<PreviewOutcome, PreviewError> {
        if !self.can_preview(bitstream) {
            return Ok(PreviewOutcome::Denied);
        }
        if self.store.has_preview(&bitstream.id)? {
            return Ok(PreviewOutcome::Existing);
        }

        let kind = bitstream.kind();
        if kind == ContentKind::Unsupported {
            return Ok(PreviewOutcome::Empty);
        }
        if !kind.is_persistable() {
            tracing::debug!(bitstream = %bitstream.id, %kind, "preview is never stored, skipping read");
            return Ok(PreviewOutcome::Transient);
        }

        let roots = self.generate_from(bitstream, source)?;
        if roots.is_empty() {
            return Ok(PreviewOutcome::Empty);
        }

        Ok(match self.persist(&bitstream.id, &roots)? {
            InsertOutcome::Inserted => PreviewOutcome::Stored {
                nodes: roots.iter().map(ViewNode::node_count).sum(),
            },
            InsertOutcome::AlreadyPresent(_) => PreviewOutcome::Existing,
        })
    }

    /// Load the stored preview of a bitstream as view nodes.
    pub fn stored_preview(&self, bitstream: &BitstreamId) -> Result<Vec<ViewNode>, PreviewError> {
        Ok(self
            .store
            .find_roots(bitstream)?
            .iter()
            .map(to_view)
            .collect())
    }

    /// Delete the stored preview of a bitstream. Administrators only.
    pub fn delete_preview(&self, bitstream: &BitstreamId) -> Result<usize, PreviewError> {
        if !self.gate.is_admin() {
            return Err(PreviewError::Forbidden {
                bitstream: bitstream.clone(),
            });
        }
        let removed = self.store.delete_tree(bitstream)?;
        tracing::info!(%bitstream, removed, "deleted stored preview");
        Ok(removed)
    }

    /// Open the content and generate; an unopenable stream gives an empty preview.
    fn generate_from<C: ContentSource + ?Sized>(
        &self,
        bitstream: &Bitstream,
        source: &C,
    ) -> Result<Vec<ViewNode>, PreviewError> {
        if bitstream.kind() == ContentKind::Unsupported {
            return Ok(Vec::new());
        }
        match source.open(bitstream) {
            Ok(reader) => self.generate(bitstream, reader),
            Err(err) => {
                tracing::warn!(bitstream = %bitstream.id, error = %err, "cannot open bitstream content");
                Ok(Vec::new())
            }
        }
    }

    fn persist(&self, bitstream: &BitstreamId, roots: &[ViewNode]) -> Result<InsertOutcome, PreviewError> {
        let persisted = roots
            .iter()
            .map(|root| to_persisted(&self.store, bitstream, root))
            .collect::<Result<Vec<_>, _>>()?;
        let nodes: usize = persisted.iter().map(|root| root.node_count()).sum();

        let outcome = self.store.insert_tree(bitstream, persisted)?;
        if outcome == InsertOutcome::Inserted {
            tracing::info!(%bitstream, nodes, "stored preview");
        }
        Ok(outcome)
    }

    fn text_preview<R: Read>(&self, bitstream: &Bitstream, reader: R, bounded: bool) -> Vec<ViewNode> {
        let byte_limit = bounded.then(|| {
            (self.config.max_content_length as u64 + 1).saturating_mul(MAX_UTF8_BYTES)
        });

        match read_text(reader, byte_limit) {
            Ok(text) => {
                let content = if bounded {
                    self.truncation.truncate_content(&text).into_owned()
                } else {
                    text
                };
                vec![ViewNode::text(bitstream.name_or_empty(), content)]
            }
            Err(err) => {
                tracing::warn!(bitstream = %bitstream.id, error = %err, "failed to read text content");
                Vec::new()
            }
        }
    }
}

/// Read a stream as text, replacing invalid UTF-8.
fn read_text<R: Read>(reader: R, byte_limit: Option<u64>) -> io::Result<String> {
    let mut buf = Vec::new();
    match byte_limit {
        Some(limit) => reader.take(limit).read_to_end(&mut buf)?,
        None => {
            let mut reader = reader;
            reader.read_to_end(&mut buf)?
        }
    };
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
