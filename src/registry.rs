//! Sound registry: one engine handle per sound id, created on first use.
//!
//! Handles outlive scans. A link that disappears and comes back with the same
//! sound id finds its old handle, buffered data and position included.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use tracing::{debug, info};

use crate::engine::{HandleKey, SoundCallbacks, SoundEngine, SoundEvent, SoundId, SoundSpec};
use crate::error::EngineError;
use crate::scanner::TrackDescriptor;
use crate::surface::LinkState;

/// Player-side data kept next to an engine handle.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundRecord {
    /// Descriptor the handle was last bound to.
    pub descriptor: TrackDescriptor,
    /// State tag last projected onto the sound's links.
    pub state_tag: Option<LinkState>,
    /// The sound is missing from the latest scan.
    pub orphaned: bool,
    /// Loading failed; the links carry the error tag.
    pub error: bool,
    pub buffering: bool,
}

impl SoundRecord {
    pub fn new(descriptor: TrackDescriptor) -> Self {
        Self {
            descriptor,
            state_tag: None,
            orphaned: false,
            error: false,
            buffering: false,
        }
    }
}

#[derive(Debug)]
pub struct SoundHandle {
    key: HandleKey,
    /// Bumped on every activation; shared with the engine's callbacks.
    run: Arc<AtomicU64>,
    id: SoundId,
    /// Whether the engine accepted the sound.
    created: bool,
    pub record: SoundRecord,
}

impl SoundHandle {
    pub fn key(&self) -> HandleKey {
        self.key
    }

    /// Current activation. Events stamped with an older run are stale.
    pub fn run(&self) -> u64 {
        self.run.load(Ordering::Acquire)
    }

    /// Whether `event` was emitted by this handle during its current activation.
    pub fn owns(&self, event: &SoundEvent) -> bool {
        event.handle == self.key && event.run == self.run()
    }

    pub fn id(&self) -> &SoundId {
        &self.id
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

#[derive(Debug)]
pub struct SoundRegistry {
    handles: HashMap<SoundId, SoundHandle>,
    next_key: u64,
    tx: Sender<SoundEvent>,
}

impl SoundRegistry {
    /// Every handle's callbacks send into `tx`.
    pub fn new(tx: Sender<SoundEvent>) -> Self {
        Self {
            handles: HashMap::new(),
            next_key: 0,
            tx,
        }
    }

    /// Return the handle for `descriptor.sound`, creating it through the
    /// engine if needed. An existing handle is returned untouched.
    ///
    /// When the engine refuses the sound, the handle is still registered
    /// (uncreated) so it can carry the error tag; the next call retries the
    /// creation.
    pub fn get_or_create<E>(
        &mut self,
        engine: &mut E,
        descriptor: &TrackDescriptor,
    ) -> Result<HandleKey, EngineError>
    where
        E: SoundEngine + ?Sized,
    {
        if let Some(handle) = self.handles.get(&descriptor.sound)
            && handle.created
        {
            return Ok(handle.key);
        }

        let (key, run) = match self.handles.get(&descriptor.sound) {
            Some(handle) => (handle.key, Arc::clone(&handle.run)),
            None => {
                let key = HandleKey(self.next_key);
                self.next_key += 1;
                let run = Arc::new(AtomicU64::new(0));
                self.handles.insert(
                    descriptor.sound.clone(),
                    SoundHandle {
                        key,
                        run: Arc::clone(&run),
                        id: descriptor.sound.clone(),
                        created: false,
                        record: SoundRecord::new(descriptor.clone()),
                    },
                );
                (key, run)
            }
        };

        let spec = SoundSpec {
            id: descriptor.sound.clone(),
            url: descriptor.url.clone(),
            mime_type: descriptor.mime_type.clone(),
        };
        engine.create_sound(spec, SoundCallbacks::new(key, run, self.tx.clone()))?;
        debug!(sound = %descriptor.sound, key = key.0, "created sound");
        if let Some(handle) = self.handles.get_mut(&descriptor.sound) {
            handle.created = true;
        }
        Ok(key)
    }

    pub fn get(&self, id: &SoundId) -> Option<&SoundHandle> {
        self.handles.get(id)
    }

    pub fn get_mut(&mut self, id: &SoundId) -> Option<&mut SoundHandle> {
        self.handles.get_mut(id)
    }

    /// Start a new activation of `id`. Events still queued from earlier
    /// activations no longer match the handle.
    pub fn begin_run(&mut self, id: &SoundId) -> Option<u64> {
        let handle = self.handles.get(id)?;
        let run = handle.run.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(sound = %id, run, "new activation");
        Some(run)
    }

    pub fn by_key(&self, key: HandleKey) -> Option<&SoundHandle> {
        self.handles.values().find(|h| h.key == key)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Sounds whose records carry the error flag.
    pub fn errored(&self) -> Vec<SoundId> {
        let mut ids: Vec<_> = self
            .handles
            .values()
            .filter(|h| h.record.error)
            .map(|h| h.id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drop every handle and make the engine forget its sounds, callbacks
    /// included. Keys keep counting up so late events stay unmatched.
    pub fn reset<E: SoundEngine + ?Sized>(&mut self, engine: &mut E) {
        info!(handles = self.handles.len(), "resetting sound registry");
        self.handles.clear();
        engine.reset();
    }
}
