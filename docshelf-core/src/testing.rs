//! Fixtures shared by the unit tests of this crate.

use async_trait::async_trait;
use docshelf_macros::Document;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

use crate::{
    adapter::Adapter,
    error::{ShelfError, ShelfResult},
};

pub(crate) fn init_logging() {
    let _ = colog::basic_builder().try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Document)]
pub(crate) struct Task {
    pub id: u64,
    pub status: String,
    pub owner: Option<String>,
    #[document(skip)]
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Task {
    pub fn new(id: u64, status: &str) -> Self {
        Self {
            id,
            status: status.to_string(),
            owner: None,
            notes: Vec::new(),
        }
    }

    pub fn owned_by(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }
}

struct Script<T> {
    value: Option<T>,
    writes: usize,
    fail_reads: bool,
    fail_writes: usize,
}

/// In-test adapter that counts writes and can be told to fail.
pub(crate) struct ScriptedAdapter<T> {
    script: Arc<Mutex<Script<T>>>,
}

impl<T> Clone for ScriptedAdapter<T> {
    fn clone(&self) -> Self {
        Self {
            script: self.script.clone(),
        }
    }
}

impl<T> fmt::Debug for ScriptedAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedAdapter")
            .field("writes", &self.script.lock().writes)
            .finish_non_exhaustive()
    }
}

impl<T> ScriptedAdapter<T> {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                value: None,
                writes: 0,
                fail_reads: false,
                fail_writes: 0,
            })),
        }
    }

    pub fn with_value(value: T) -> Self {
        let adapter = Self::new();
        adapter.script.lock().value = Some(value);
        adapter
    }

    pub fn writes(&self) -> usize {
        self.script.lock().writes
    }

    pub fn stored(&self) -> Option<T>
    where
        T: Clone,
    {
        self.script.lock().value.clone()
    }

    pub fn fail_reads(&self) {
        self.script.lock().fail_reads = true;
    }

    /// Makes the next `count` writes fail without storing anything.
    pub fn fail_writes(&self, count: usize) {
        self.script.lock().fail_writes = count;
    }
}

#[async_trait]
impl<T> Adapter<T> for ScriptedAdapter<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn read(&self) -> ShelfResult<Option<T>> {
        let script = self.script.lock();

        if script.fail_reads {
            return Err(ShelfError::Adapter("scripted read failure".to_string()));
        }

        Ok(script.value.clone())
    }

    async fn write(&self, value: T) -> ShelfResult<()> {
        let mut script = self.script.lock();
        script.writes += 1;

        if script.fail_writes > 0 {
            script.fail_writes -= 1;
            return Err(ShelfError::Adapter("scripted write failure".to_string()));
        }

        script.value = Some(value);
        Ok(())
    }
}
