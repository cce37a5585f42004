//! Named memories: the places buffers live.
//!
//! A [`Memory`] holds no buffers itself. Ownership is recorded in the
//! [`BufferPool`], which every operation here takes explicitly.

use std::error::Error;
use std::fmt;

use archsim_core::{BufferId, ErrorClass, MemoryId, PoolError};
use archsim_pool::BufferPool;
use tracing::debug;

/// Memory configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Maximum bytes the memory may hold through `alloc`. `None` is
    /// unbounded.
    pub capacity_bytes: Option<u64>,
}

/// Errors from memory operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryError {
    /// The allocation would exceed the memory's capacity.
    CapacityExceeded {
        /// The memory.
        memory: MemoryId,
        /// Bytes requested.
        requested: u64,
        /// Bytes still free.
        available: u64,
    },
    /// The buffer is not held by this memory.
    NotOwner {
        /// The memory.
        memory: MemoryId,
        /// The buffer.
        buffer: BufferId,
    },
    /// The pool rejected the operation.
    Pool(PoolError),
}

impl MemoryError {
    /// The error's classification.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CapacityExceeded { .. } => ErrorClass::Configuration,
            Self::NotOwner { .. } => ErrorClass::Ownership,
            Self::Pool(e) => e.class(),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded {
                memory,
                requested,
                available,
            } => write!(
                f,
                "memory '{memory}' cannot hold {requested} more bytes ({available} free)"
            ),
            Self::NotOwner { memory, buffer } => {
                write!(f, "{buffer} is not held by memory '{memory}'")
            }
            Self::Pool(e) => write!(f, "pool: {e}"),
        }
    }
}

impl Error for MemoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PoolError> for MemoryError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

/// A named memory.
#[derive(Clone, Debug)]
pub struct Memory {
    id: MemoryId,
    config: MemoryConfig,
}

impl Memory {
    /// Create a memory.
    pub fn new(id: impl Into<MemoryId>, config: MemoryConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    /// The memory's name.
    pub fn id(&self) -> &MemoryId {
        &self.id
    }

    /// Configured capacity, if bounded.
    pub fn capacity(&self) -> Option<u64> {
        self.config.capacity_bytes
    }

    /// Bytes currently held, per the pool.
    pub fn used(&self, pool: &BufferPool) -> u64 {
        pool.total_allocated_bytes(&self.id)
    }

    /// Bytes still free, or `None` when unbounded.
    pub fn available(&self, pool: &BufferPool) -> Option<u64> {
        self.config
            .capacity_bytes
            .map(|cap| cap.saturating_sub(self.used(pool)))
    }

    /// Create a buffer owned by this memory.
    pub fn alloc(
        &self,
        pool: &mut BufferPool,
        size: u64,
        content: Option<Vec<u8>>,
    ) -> Result<BufferId, MemoryError> {
        if let Some(available) = self.available(pool) {
            if size > available {
                return Err(MemoryError::CapacityExceeded {
                    memory: self.id.clone(),
                    requested: size,
                    available,
                });
            }
        }
        let id = pool.create(size, content, Some(self.id.clone()))?;
        debug!(memory = %self.id, buffer = %id, size, "alloc");
        Ok(id)
    }

    /// Deallocate a buffer this memory holds.
    pub fn dealloc(&self, pool: &mut BufferPool, buffer: BufferId) -> Result<(), MemoryError> {
        self.check_owner(pool, buffer)?;
        pool.consume(buffer)?;
        debug!(memory = %self.id, buffer = %buffer, "dealloc");
        Ok(())
    }

    /// Hand a held buffer to a compute resource (`inuse`).
    pub fn begin_use(&self, pool: &mut BufferPool, buffer: BufferId) -> Result<(), MemoryError> {
        self.check_owner(pool, buffer)?;
        pool.begin_use(buffer)?;
        Ok(())
    }

    fn check_owner(&self, pool: &BufferPool, buffer: BufferId) -> Result<(), MemoryError> {
        let buf = pool.get(buffer)?;
        if !buf.state().is_live() {
            return Err(PoolError::AlreadyDeallocated { id: buffer }.into());
        }
        if buf.owner() != Some(&self.id) {
            return Err(MemoryError::NotOwner {
                memory: self.id.clone(),
                buffer,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archsim_core::BufferState;

    #[test]
    fn alloc_respects_capacity() {
        let mut pool = BufferPool::default();
        let m = Memory::new(
            "sram",
            MemoryConfig {
                capacity_bytes: Some(100),
            },
        );
        m.alloc(&mut pool, 60, None).unwrap();
        assert_eq!(m.available(&pool), Some(40));
        let err = m.alloc(&mut pool, 41, None).unwrap_err();
        assert_eq!(
            err,
            MemoryError::CapacityExceeded {
                memory: "sram".into(),
                requested: 41,
                available: 40
            }
        );
        assert_eq!(err.class(), ErrorClass::Configuration);
    }

    #[test]
    fn dealloc_requires_ownership() {
        let mut pool = BufferPool::default();
        let a = Memory::new("a", MemoryConfig::default());
        let b = Memory::new("b", MemoryConfig::default());
        let id = a.alloc(&mut pool, 8, None).unwrap();
        let err = b.dealloc(&mut pool, id).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Ownership);

        a.dealloc(&mut pool, id).unwrap();
        assert_eq!(pool.state(id).unwrap(), BufferState::Deallocated);
        let err = a.dealloc(&mut pool, id).unwrap_err();
        assert_eq!(err, MemoryError::Pool(PoolError::AlreadyDeallocated { id }));
        assert!(err.source().is_some());
    }

    #[test]
    fn begin_use_after_arrival() {
        let mut pool = BufferPool::default();
        let a = Memory::new("a", MemoryConfig::default());
        let b = Memory::new("b", MemoryConfig::default());
        let id = a.alloc(&mut pool, 8, None).unwrap();
        pool.transfer(id, b.id().clone()).unwrap();
        assert_eq!(b.used(&pool), 8);
        b.begin_use(&mut pool, id).unwrap();
        assert_eq!(pool.state(id).unwrap(), BufferState::InUse);
    }
}
