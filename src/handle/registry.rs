//! Opaque handles over in-memory records.
//!
//! `HandleRegistry` is a slot arena: records live in slots, callers get
//! back a small `Handle` value carrying the slot index, the slot's
//! generation counter, and a kind tag. The generation counter is bumped
//! whenever a slot is emptied, so a handle held across a dispose or a
//! consume can never resolve again (ABA protection). Raw references
//! never leave the registry — resolution is closure-scoped under the
//! registry lock, so a resolve racing a dispose either runs entirely
//! before it or observes a stale handle, never freed memory.
//!
//! Handles are process-lifetime identifiers. They are never persisted
//! and never reused after disposal.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use zeroize::Zeroize;

use crate::errors::{HandleError, Result};

/// What kind of record a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Secret,
    Session,
    MasterKey,
}

impl HandleKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            HandleKind::Secret => "secret",
            HandleKind::Session => "session",
            HandleKind::MasterKey => "masterkey",
        }
    }
}

/// An opaque reference to a record owned by a `HandleRegistry`.
///
/// Cheap to copy; copying never duplicates the record. Only the
/// registry that issued a handle can resolve it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
    kind: HandleKind,
}

impl Handle {
    /// The kind tag this handle was issued with.
    pub fn kind(&self) -> HandleKind {
        self.kind
    }
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Handle({}:{}#{})",
            self.kind.name(),
            self.index,
            self.generation
        )
    }
}

struct Slot<T> {
    generation: u32,
    created_at: DateTime<Utc>,
    record: Option<T>,
}

/// Issues and tracks handles for records of one kind.
///
/// All access is serialized per registry: no concurrent resolve+mutate
/// can overlap on the same record, and dispose is safe from any thread.
pub struct HandleRegistry<T: Zeroize> {
    kind: HandleKind,
    slots: Mutex<Vec<Slot<T>>>,
}

impl<T: Zeroize> HandleRegistry<T> {
    pub fn new(kind: HandleKind) -> Self {
        Self {
            kind,
            slots: Mutex::new(Vec::new()),
        }
    }

    // Dispose must stay callable from any context, including a panic
    // unwind on another thread, so a poisoned lock is recovered rather
    // than propagated.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Slot<T>>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store a record and issue a handle for it.
    ///
    /// Freed slots are reused; their generation counter was bumped at
    /// dispose time, so handles into the previous occupant stay dead.
    pub fn issue(&self, record: T) -> Handle {
        let mut slots = self.lock();

        if let Some(index) = slots.iter().position(|s| s.record.is_none()) {
            let slot = &mut slots[index];
            slot.record = Some(record);
            slot.created_at = Utc::now();
            return Handle {
                index: index as u32,
                generation: slot.generation,
                kind: self.kind,
            };
        }

        let index = slots.len() as u32;
        slots.push(Slot {
            generation: 0,
            created_at: Utc::now(),
            record: Some(record),
        });
        Handle {
            index,
            generation: 0,
            kind: self.kind,
        }
    }

    fn check<'a>(&self, slots: &'a mut [Slot<T>], handle: Handle) -> Result<&'a mut Slot<T>> {
        if handle.kind != self.kind {
            return Err(HandleError::WrongKind {
                expected: self.kind.name(),
                got: handle.kind.name(),
            }
            .into());
        }
        let slot = slots
            .get_mut(handle.index as usize)
            .ok_or(HandleError::NotFound)?;
        if slot.generation != handle.generation {
            return Err(HandleError::Stale.into());
        }
        if slot.record.is_none() {
            return Err(HandleError::NotFound.into());
        }
        Ok(slot)
    }

    /// Run `f` against the record behind `handle`.
    ///
    /// The closure runs under the registry lock; the reference cannot
    /// escape it.
    pub fn with_record<R>(&self, handle: Handle, f: impl FnOnce(&T) -> R) -> Result<R> {
        let mut slots = self.lock();
        let slot = self.check(&mut slots, handle)?;
        let record = slot.record.as_ref().ok_or(HandleError::NotFound)?;
        Ok(f(record))
    }

    /// Run `f` against the record behind `handle`, mutably.
    pub fn with_record_mut<R>(&self, handle: Handle, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut slots = self.lock();
        let slot = self.check(&mut slots, handle)?;
        let record = slot.record.as_mut().ok_or(HandleError::NotFound)?;
        Ok(f(record))
    }

    /// Remove and return the record, invalidating the handle.
    ///
    /// This is the one-shot consume transition: the slot's generation is
    /// bumped, so the handle (and any copy of it) is dead afterwards.
    pub fn take(&self, handle: Handle) -> Result<T> {
        let mut slots = self.lock();
        let slot = self.check(&mut slots, handle)?;
        let record = slot.record.take().ok_or(HandleError::NotFound)?;
        slot.generation = slot.generation.wrapping_add(1);
        Ok(record)
    }

    /// Zeroize and drop the record behind `handle`.
    ///
    /// Idempotent: disposing a stale, consumed, or already-disposed
    /// handle is a defined no-op. A kind mismatch is still surfaced —
    /// that is a caller bug, not a lifecycle race.
    pub fn dispose(&self, handle: Handle) -> Result<()> {
        match self.take(handle) {
            Ok(mut record) => {
                record.zeroize();
                Ok(())
            }
            Err(e @ crate::errors::CoreError::Handle(HandleError::WrongKind { .. })) => Err(e),
            Err(_) => Ok(()),
        }
    }

    /// Zeroize and drop every live record (process teardown, app lock).
    pub fn dispose_all(&self) {
        let mut slots = self.lock();
        for slot in slots.iter_mut() {
            if let Some(mut record) = slot.record.take() {
                record.zeroize();
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
    }

    /// Zeroize and drop every record matching `predicate`. Returns the
    /// number of records disposed.
    pub fn dispose_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let mut slots = self.lock();
        let mut disposed = 0;
        for slot in slots.iter_mut() {
            if slot.record.as_ref().is_some_and(&mut predicate) {
                if let Some(mut record) = slot.record.take() {
                    record.zeroize();
                    slot.generation = slot.generation.wrapping_add(1);
                    disposed += 1;
                }
            }
        }
        disposed
    }

    /// When the record behind `handle` was stored.
    pub fn created_at(&self, handle: Handle) -> Result<DateTime<Utc>> {
        let mut slots = self.lock();
        let slot = self.check(&mut slots, handle)?;
        Ok(slot.created_at)
    }

    /// Whether `handle` still resolves.
    pub fn is_live(&self, handle: Handle) -> bool {
        let mut slots = self.lock();
        self.check(&mut slots, handle).is_ok()
    }

    /// Number of live records.
    pub fn live_count(&self) -> usize {
        self.lock().iter().filter(|s| s.record.is_some()).count()
    }
}
