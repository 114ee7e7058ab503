//! Transactions and an in-memory JSON document store
//!
//! The [`Atomic`] trait is the interface bulk edits use to group the effect of every action into
//! a single all-or-nothing unit. [`Store`] is a reference implementation keeping a JSON document in
//! memory, modified through [JSON patches](https://datatracker.ietf.org/doc/html/rfc6902).
use json_patch::{patch, Patch};
use jsonptr::PointerBuf;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use thiserror::Error;
use tracing::{trace, warn};

use crate::error::{Error, ErrorKind};
use crate::result::Result;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to apply changes: {0}")]
    Patch(#[from] json_patch::PatchError),

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("no transaction in progress")]
    NoTransaction,
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoTransaction => Error::new(ErrorKind::Transaction, err),
            _ => Error::internal(err),
        }
    }
}

/// A transaction layer
///
/// Transactions may nest, every call to `begin` must be matched by a call to `commit` or
/// `rollback`, which only affect the innermost transaction.
pub trait Atomic: Send + Sync + 'static {
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

/// An open transaction
///
/// The transaction is rolled back on drop unless [`Transaction::commit`] was called.
#[must_use = "the transaction is rolled back as soon as it is dropped"]
pub struct Transaction<'a> {
    layer: &'a dyn Atomic,
    open: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(layer: &'a dyn Atomic) -> Result<Self> {
        layer.begin()?;
        Ok(Self { layer, open: true })
    }

    /// Commit the transaction
    ///
    /// If the layer fails to commit, the transaction is rolled back when dropped.
    pub fn commit(mut self) -> Result<()> {
        self.layer.commit()?;
        self.open = false;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.layer.rollback()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.layer.rollback() {
                warn!("failed to roll back transaction: {e}");
            }
        }
    }
}

/// Run `f` inside a transaction
///
/// The transaction is committed if `f` succeeds and rolled back if it fails (or panics).
pub fn atomic<T, F>(layer: &dyn Atomic, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let tx = Transaction::begin(layer)?;
    match f() {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = tx.rollback() {
                warn!("failed to roll back transaction: {e}");
            }
            Err(err)
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: Value,
    // State snapshots taken at the start of every open transaction
    savepoints: Vec<Value>,
    // Thread holding the open transactions, if any
    owner: Option<ThreadId>,
}

impl Inner {
    fn is_owned_by_other(&self, id: ThreadId) -> bool {
        self.owner.is_some_and(|owner| owner != id)
    }

    // The document as seen from the given thread. Changes of a transaction are only visible to
    // the thread that opened it until commit
    fn visible(&self, id: ThreadId) -> &Value {
        match self.savepoints.first() {
            Some(committed) if self.is_owned_by_other(id) => committed,
            _ => &self.state,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    released: Condvar,
}

/// In-memory JSON document store
///
/// `Store` is a handle, clones refer to the same document.
///
/// Only one thread at a time may have transactions open on the store. A thread calling
/// [`Atomic::begin`] or modifying the document while another thread holds a transaction blocks
/// until that transaction is committed or rolled back. Reads do not block, they see the document
/// as it was before the transaction began.
#[derive(Debug, Clone, Default)]
pub struct Store {
    shared: Arc<Shared>,
}

fn pointer(path: &str) -> Result<PointerBuf> {
    PointerBuf::parse(path).map_err(|_| StoreError::InvalidPath(path.to_string()).into())
}

impl Store {
    /// Create a store from a serializable initial state
    pub fn new<S: Serialize>(state: S) -> Result<Self> {
        let state = serde_json::to_value(state)?;
        Ok(Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state,
                    ..Inner::default()
                }),
                released: Condvar::new(),
            }),
        })
    }

    // A poisoned lock only means a thread panicked while holding it,
    // every change to the document is applied in a single step
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // Lock the document, waiting for transactions held by other threads to finish
    fn lock_for_write(&self) -> MutexGuard<'_, Inner> {
        let id = thread::current().id();
        let mut inner = self.lock();
        while inner.is_owned_by_other(id) {
            trace!("waiting for transaction of another thread");
            inner = self
                .shared
                .released
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        inner
    }

    /// Read the value at the given path, if it exists
    pub fn get(&self, path: &str) -> Result<Option<Value>> {
        let ptr = pointer(path)?;
        let inner = self.lock();
        Ok(inner
            .visible(thread::current().id())
            .pointer(ptr.as_str())
            .cloned())
    }

    /// Read the value at the given path as type `T`
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.get(path)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Error::from)
    }

    pub fn contains(&self, path: &str) -> Result<bool> {
        self.get(path).map(|v| v.is_some())
    }

    /// Apply a list of changes to the document
    ///
    /// Changes are applied atomically, if one operation fails the document is left unchanged.
    pub fn patch(&self, changes: &Patch) -> Result<()> {
        let mut inner = self.lock_for_write();
        patch(&mut inner.state, changes).map_err(StoreError::from)?;
        trace!(changes = ?changes, "store updated");
        Ok(())
    }

    /// Add or replace the value at the given path
    pub fn insert<S: Serialize>(&self, path: &str, value: S) -> Result<()> {
        let ptr = pointer(path)?;
        let value = serde_json::to_value(value)?;
        let changes: Patch = serde_json::from_value(json!([
            { "op": "add", "path": ptr.as_str(), "value": value }
        ]))?;
        self.patch(&changes)
    }

    /// Remove the value at the given path, returning true if it existed
    pub fn remove(&self, path: &str) -> Result<bool> {
        if !self.contains(path)? {
            return Ok(false);
        }
        let ptr = pointer(path)?;
        let changes: Patch = serde_json::from_value(json!([
            { "op": "remove", "path": ptr.as_str() }
        ]))?;
        self.patch(&changes)?;
        Ok(true)
    }

    /// Get a copy of the full document as type `T`
    pub fn state<T: DeserializeOwned>(&self) -> Result<T> {
        let state = self.lock().visible(thread::current().id()).clone();
        serde_json::from_value(state).map_err(Error::from)
    }

    /// Number of transactions currently open on the store
    pub fn depth(&self) -> usize {
        self.lock().savepoints.len()
    }

    // Close the innermost transaction of the calling thread, returning its snapshot
    fn close<'a>(
        &'a self,
        mut inner: MutexGuard<'a, Inner>,
    ) -> Result<(Value, MutexGuard<'a, Inner>)> {
        if inner.owner != Some(thread::current().id()) {
            return Err(StoreError::NoTransaction.into());
        }
        let snapshot = inner.savepoints.pop().ok_or(StoreError::NoTransaction)?;
        if inner.savepoints.is_empty() {
            inner.owner = None;
            self.shared.released.notify_all();
        }
        Ok((snapshot, inner))
    }
}

impl Atomic for Store {
    fn begin(&self) -> Result<()> {
        let mut inner = self.lock_for_write();
        let snapshot = inner.state.clone();
        inner.savepoints.push(snapshot);
        inner.owner = Some(thread::current().id());
        trace!(depth = inner.savepoints.len(), "transaction started");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let (_, inner) = self.close(self.lock())?;
        trace!(depth = inner.savepoints.len(), "transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let (snapshot, mut inner) = self.close(self.lock())?;
        inner.state = snapshot;
        trace!(depth = inner.savepoints.len(), "transaction rolled back");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::time::Duration;

    fn store() -> Store {
        Store::new(json!({ "flobbits": { "1": { "flerbies": 1 } } })).unwrap()
    }

    #[test]
    fn it_reads_and_writes_values() {
        let store = store();
        store.insert("/flobbits/2", json!({ "flerbies": 2 })).unwrap();

        assert_eq!(
            store.get_as::<u32>("/flobbits/2/flerbies").unwrap(),
            Some(2)
        );
        assert!(store.remove("/flobbits/1").unwrap());
        assert!(!store.remove("/flobbits/1").unwrap());
        assert_eq!(
            store.state::<Value>().unwrap(),
            json!({ "flobbits": { "2": { "flerbies": 2 } } })
        );
    }

    #[test]
    fn it_fails_on_invalid_paths() {
        let store = store();
        let err = store.get("flobbits").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        // the parent does not exist
        let err = store.insert("/other/1", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn it_commits_successful_transactions() {
        let store = store();
        let res = atomic(&store, || {
            store.insert("/flobbits/2", json!({ "flerbies": 2 }))?;
            Ok(())
        });

        assert!(res.is_ok());
        assert!(store.contains("/flobbits/2").unwrap());
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn it_rolls_back_failed_transactions() {
        let store = store();
        let res: Result<()> = atomic(&store, || {
            store.insert("/flobbits/2", json!({ "flerbies": 2 }))?;
            Err(Error::internal("boom"))
        });

        assert!(res.is_err());
        assert!(!store.contains("/flobbits/2").unwrap());
        assert_eq!(store.depth(), 0);
    }

    #[test]
    fn it_rolls_back_dropped_transactions() {
        let store = store();
        {
            let _tx = Transaction::begin(&store).unwrap();
            store.remove("/flobbits/1").unwrap();
        }
        assert!(store.contains("/flobbits/1").unwrap());
    }

    #[test]
    fn nested_transactions_roll_back_independently() {
        let store = store();
        atomic(&store, || {
            store.insert("/flobbits/2", 2)?;
            let inner: Result<()> = atomic(&store, || {
                store.insert("/flobbits/3", 3)?;
                Err(Error::internal("boom"))
            });
            assert!(inner.is_err());
            Ok(())
        })
        .unwrap();

        assert!(store.contains("/flobbits/2").unwrap());
        assert!(!store.contains("/flobbits/3").unwrap());
    }

    #[test]
    fn it_fails_to_commit_without_a_transaction() {
        let err = store().commit().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transaction);
    }

    #[test]
    fn transactions_of_other_threads_are_isolated() {
        let store = store();
        let opened = Arc::new(Barrier::new(2));

        let failing = {
            let store = store.clone();
            let opened = Arc::clone(&opened);
            thread::spawn(move || {
                let tx = Transaction::begin(&store).unwrap();
                store.insert("/flobbits/a", 1).unwrap();
                opened.wait();

                // the other thread cannot write while the transaction is open
                thread::sleep(Duration::from_millis(50));
                assert!(!store.contains("/flobbits/b").unwrap());
                tx.rollback().unwrap();
            })
        };

        let succeeding = {
            let store = store.clone();
            let opened = Arc::clone(&opened);
            thread::spawn(move || {
                opened.wait();
                assert!(!store.contains("/flobbits/a").unwrap());
                atomic(&store, || store.insert("/flobbits/b", 2)).unwrap();
            })
        };

        failing.join().unwrap();
        succeeding.join().unwrap();

        // the rollback of the first thread does not undo the second one
        assert!(store.contains("/flobbits/b").unwrap());
        assert!(!store.contains("/flobbits/a").unwrap());
        assert_eq!(store.depth(), 0);
    }

    #[derive(Default)]
    struct FailingCommit {
        rollbacks: AtomicUsize,
    }

    impl Atomic for FailingCommit {
        fn begin(&self) -> Result<()> {
            Ok(())
        }

        fn commit(&self) -> Result<()> {
            Err(Error::new(ErrorKind::Transaction, "commit failed"))
        }

        fn rollback(&self) -> Result<()> {
            self.rollbacks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn it_rolls_back_if_commit_fails() {
        let layer = FailingCommit::default();
        let err = atomic(&layer, || Ok(())).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transaction);
        assert_eq!(layer.rollbacks.load(Ordering::SeqCst), 1);
    }
}
