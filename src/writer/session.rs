//! Session lifecycle and write routing.
//!
//! One session owns one output file through the state machine
//! `Closed -> Opening -> Open -> Closing -> Closed`. Open builds the whole
//! skeleton, flushes the deferred text entries, patches the preamble and
//! freezes the chunk plan; each write call routes its batches to the
//! pre-sized datasets; close flushes and releases the file. The caller
//! serializes open/write/close against one session, so no internal locking
//! is needed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, info, trace};

use crate::catalog::{CatalogItem, WriteRequest};
use crate::layout::chunk::{self, ChunkPlan};
use crate::layout::name;
use crate::store::{ContainerStore, MemStore, NodeId};
use crate::util::{Error, Result};

use super::config::WriterConfig;
use super::preamble;
use super::skeleton::{self, DatasetKey, Skeleton};
use super::text::TextBlockRegistry;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opening,
    Open,
    Closing,
}

/// Per-write-call progress receiver. Reports arrive once per processed
/// catalog group as (requests completed so far, total requests in the call),
/// in batch insertion order.
pub trait ProgressSink {
    fn report(&mut self, completed: usize, total: usize);
}

impl<F: FnMut(usize, usize)> ProgressSink for F {
    fn report(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Shared cancellation flag, checked between catalog groups and between
/// items, never mid-hyperslab. Cancelling aborts the call without rolling
/// back groups already written.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Open-file state, immutable after the open transition completes.
struct OpenFile<S> {
    store: S,
    path: PathBuf,
    sample_period: Duration,
    total_len: u64,
    plan: ChunkPlan,
    datasets: HashMap<DatasetKey, NodeId>,
}

/// Writer session: one complete open -> write* -> close pass per output
/// file, generic over the storage substrate.
pub struct Session<S: ContainerStore = MemStore> {
    config: WriterConfig,
    state: SessionState,
    open_file: Option<OpenFile<S>>,
}

impl<S: ContainerStore> Session<S> {
    /// Create a session bound to the host-supplied configuration.
    pub fn new(config: WriterConfig) -> Self {
        Self {
            config,
            state: SessionState::Closed,
            open_file: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Substrate handle, available once open has completed. Kept after
    /// close for inspection.
    pub fn store(&self) -> Option<&S> {
        self.open_file.as_ref().map(|f| &f.store)
    }

    /// Consume the session and hand back the substrate.
    pub fn into_store(self) -> Option<S> {
        self.open_file.map(|f| f.store)
    }

    /// Path of the output file, once opened.
    pub fn path(&self) -> Option<&PathBuf> {
        self.open_file.as_ref().map(|f| &f.path)
    }

    /// Open a new output file and build the complete skeleton for `items`.
    ///
    /// The total length, derived from `file_period / sample_period`, and the
    /// chunk plan become immutable here. Fails without touching the target
    /// path when no legal chunk length exists; fails without mutating an
    /// already-existing target file.
    pub fn open(
        &mut self,
        begin: OffsetDateTime,
        file_period: Duration,
        sample_period: Duration,
        items: &[CatalogItem],
    ) -> Result<()> {
        if self.state != SessionState::Closed {
            return Err(Error::State("open requires a closed session"));
        }
        self.state = SessionState::Opening;
        match self.try_open(begin, file_period, sample_period, items) {
            Ok(open_file) => {
                self.open_file = Some(open_file);
                self.state = SessionState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Closed;
                Err(e)
            }
        }
    }

    fn try_open(
        &mut self,
        begin: OffsetDateTime,
        file_period: Duration,
        sample_period: Duration,
        items: &[CatalogItem],
    ) -> Result<OpenFile<S>> {
        let total_len = derive_total_len(file_period, sample_period)?;
        let plan = chunk::plan(total_len, self.config.max_chunk_len);
        if !plan.is_valid() {
            return Err(Error::Capacity {
                total_len,
                max_chunk_len: self.config.max_chunk_len,
            });
        }

        // Validate every physical name before the file exists, so a
        // sanitizer failure never leaves a junk file behind.
        for item in items {
            Skeleton::key_for(item)?;
        }

        let path = self
            .config
            .target_dir
            .join(name::file_name(begin, sample_period)?);
        if path.exists() {
            return Err(Error::TargetExists(path));
        }

        debug!(
            path = %path.display(),
            total_len,
            chunk_len = plan.chunk_len,
            chunk_count = plan.chunk_count,
            items = items.len(),
            "opening write session"
        );

        let mut store = S::create(&path)?;
        let mut registry = TextBlockRegistry::new();
        let skeleton = skeleton::build(&mut store, &mut registry, begin, sample_period, plan, items)?;
        registry.flush(&mut store)?;
        store.flush()?;
        preamble::write(&path, OffsetDateTime::now_utc())?;

        info!(
            path = %path.display(),
            datasets = skeleton.datasets.len(),
            text_entries = registry.len(),
            "session open"
        );

        Ok(OpenFile {
            store,
            path,
            sample_period,
            total_len,
            plan,
            datasets: skeleton.datasets,
        })
    }

    /// Apply one batch of write requests at the given time offset.
    ///
    /// Requests are grouped by catalog in insertion order; each sample slice
    /// lands as one contiguous hyperslab at `offset / sample_period`.
    /// Cancellation leaves earlier groups of this call applied.
    pub fn write(
        &mut self,
        offset: Duration,
        requests: &[WriteRequest],
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(Error::State("write requires an open session"));
        }
        let open = self
            .open_file
            .as_mut()
            .ok_or(Error::State("write requires an open session"))?;

        let sample_offset = derive_sample_offset(offset, open.sample_period)?;
        let groups = group_by_catalog(requests);
        let total = requests.len();
        let mut completed = 0usize;

        for (catalog, indices) in groups {
            cancel.check()?;
            trace!(catalog = %catalog, requests = indices.len(), "routing catalog group");
            for index in indices {
                cancel.check()?;
                let request = &requests[index];
                let key = Skeleton::key_for(&request.item)?;
                let dataset = *open.datasets.get(&key).ok_or_else(|| {
                    Error::config(format!(
                        "catalog item not part of this session: {}/{}/{}",
                        key.0, key.1, key.2
                    ))
                })?;

                let len = request.samples.len() as u64;
                let in_bounds = sample_offset
                    .checked_add(len)
                    .is_some_and(|end| end <= open.total_len);
                if !in_bounds {
                    return Err(Error::Bounds {
                        dataset: key.2,
                        offset: sample_offset,
                        len,
                        extent: open.total_len,
                    });
                }
                open.store
                    .write_f64_slab(dataset, sample_offset, &request.samples)?;
                completed += 1;
            }
            progress.report(completed, total);
        }

        debug!(
            offset_samples = sample_offset,
            requests = total,
            "write call applied"
        );
        Ok(())
    }

    /// Flush and release the output file. Safe with zero writes: every
    /// write was applied synchronously, so nothing is buffered here beyond
    /// the substrate's own tree.
    pub fn close(&mut self) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(Error::State("close requires an open session"));
        }
        self.state = SessionState::Closing;
        let result = match self.open_file.as_mut() {
            Some(open) => open.store.flush(),
            None => Err(Error::State("close requires an open session")),
        };
        self.state = SessionState::Closed;
        if result.is_ok() {
            if let Some(open) = &self.open_file {
                info!(path = %open.path.display(), "session closed");
            }
        }
        result
    }

    /// Fixed per-dataset extent of this session, once open.
    pub fn total_len(&self) -> Option<u64> {
        self.open_file.as_ref().map(|f| f.total_len)
    }

    /// Chunk plan of this session, once open.
    pub fn chunk_plan(&self) -> Option<ChunkPlan> {
        self.open_file.as_ref().map(|f| f.plan)
    }
}

/// Total session length in samples; the file period must be an exact
/// nonzero multiple of the sample period.
fn derive_total_len(file_period: Duration, sample_period: Duration) -> Result<u64> {
    let sp = sample_period.as_nanos();
    if sp == 0 {
        return Err(Error::config("sample period must be nonzero"));
    }
    let fp = file_period.as_nanos();
    if fp % sp != 0 {
        return Err(Error::config(format!(
            "file period {fp}ns is not a multiple of sample period {sp}ns"
        )));
    }
    u64::try_from(fp / sp)
        .map_err(|_| Error::config(format!("total length {} overflows u64", fp / sp)))
}

/// Absolute sample offset for a write call's time offset.
fn derive_sample_offset(offset: Duration, sample_period: Duration) -> Result<u64> {
    let sp = sample_period.as_nanos();
    let off = offset.as_nanos();
    if off % sp != 0 {
        return Err(Error::config(format!(
            "write offset {off}ns is not aligned to sample period {sp}ns"
        )));
    }
    u64::try_from(off / sp)
        .map_err(|_| Error::config(format!("sample offset {} overflows u64", off / sp)))
}

/// Group request indices by catalog path, preserving batch insertion order
/// of the catalogs.
fn group_by_catalog(requests: &[WriteRequest]) -> Vec<(String, Vec<usize>)> {
    let mut order: Vec<(String, Vec<usize>)> = Vec::new();
    let mut index_of: HashMap<String, usize> = HashMap::new();
    for (i, request) in requests.iter().enumerate() {
        let path = &request.item.catalog.path;
        match index_of.get(path) {
            Some(&slot) => order[slot].1.push(i),
            None => {
                index_of.insert(path.clone(), order.len());
                order.push((path.clone(), vec![i]));
            }
        }
    }
    order
}
