use std::sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};

/// A thread-safe, reference-counted resource container with read-write locking.
///
/// `MtResource` provides synchronized access to a value of type `T` that can be shared
/// across threads. It uses an `Arc<RwLock<T>>` internally. Chunks and the spatial
/// index are both held this way: mesh workers take shared guards to inspect block
/// data while the edit path takes the exclusive guard.
///
/// # Examples
///
/// ```
/// use voxel_streamer::core::MtResource;
///
/// let counter = MtResource::new(0);
/// *counter.get_mut() += 1;
/// assert_eq!(*counter.get(), 1);
///
/// // A try-lock never blocks; it fails while a writer holds the lock.
/// let writer = counter.get_mut();
/// assert!(counter.try_get().is_none());
/// drop(writer);
/// assert_eq!(*counter.try_get().unwrap(), 1);
/// ```
///
/// # Poisoning
/// A panic while a guard is held poisons the lock. Every accessor recovers the
/// inner value instead of propagating the panic, so one failed worker cannot wedge
/// the rest of the engine.
pub struct MtResource<T: Send + Sync> {
    pub resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync + 'static> MtResource<T> {
    /// Creates a new `MtResource` containing the given value.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read-only guard, blocking until no writer holds the lock.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap_or_else(|poisoned| {
            log::warn!("Recovered a poisoned read lock");
            poisoned.into_inner()
        })
    }

    /// Returns a mutable guard, blocking until every other guard is released.
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap_or_else(|poisoned| {
            log::warn!("Recovered a poisoned write lock");
            poisoned.into_inner()
        })
    }

    /// Attempts to take a read-only guard without blocking.
    ///
    /// # Returns
    /// `None` if a writer currently holds the lock
    pub fn try_get(&self) -> Option<RwLockReadGuard<'_, T>> {
        match self.resource.try_read() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(PoisonError::into_inner(poisoned)),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Attempts to take a mutable guard without blocking.
    ///
    /// # Returns
    /// `None` if any other guard is currently held
    pub fn try_get_mut(&self) -> Option<RwLockWriteGuard<'_, T>> {
        match self.resource.try_write() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(PoisonError::into_inner(poisoned)),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Returns `true` if both handles point at the same underlying resource.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}
