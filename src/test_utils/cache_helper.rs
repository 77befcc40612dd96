use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::CacheHelper;
use crate::cache::CacheListener;
use crate::cache::SingleCacheHelper;
use crate::cache::SingleCacheListener;
use crate::Result;
use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TestValue {
    pub key: String,
    pub version: u64,
}

pub(crate) type TestItem = Arc<TestValue>;

pub(crate) fn item(
    key: &str,
    version: u64,
) -> TestItem {
    Arc::new(TestValue {
        key: key.to_string(),
        version,
    })
}

type UpdateHook = Box<dyn FnOnce() + Send>;

/// Helper that counts every call and returns whatever the test queued.
#[derive(Default)]
pub(crate) struct CountingHelper {
    pub opened: AtomicUsize,
    pub updated: AtomicUsize,
    disposed: Mutex<Vec<TestItem>>,
    /// Next value `update_item` returns per key; the old item otherwise
    replacements: Mutex<HashMap<String, TestItem>>,
    fail_open: AtomicBool,
    fail_update: AtomicBool,
    on_update: Mutex<Option<UpdateHook>>,
    pub wrapped: AtomicUsize,
}

impl CountingHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_next(
        &self,
        key: &str,
        value: TestItem,
    ) {
        self.replacements.lock().insert(key.to_string(), value);
    }

    pub fn fail_open(
        &self,
        fail: bool,
    ) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update(
        &self,
        fail: bool,
    ) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Runs once, inside the next `update_item`, after the new value was chosen
    pub fn on_next_update<F>(
        &self,
        hook: F,
    ) where
        F: FnOnce() + Send + 'static,
    {
        *self.on_update.lock() = Some(Box::new(hook));
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> Vec<TestItem> {
        self.disposed.lock().clone()
    }

    pub fn disposed_count(&self) -> usize {
        self.disposed.lock().len()
    }

    fn open_value(
        &self,
        key: &str,
    ) -> Result<TestItem> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("open {}", key)).into());
        }
        Ok(item(key, 0))
    }

    fn update_value(
        &self,
        key: &str,
        current: &TestItem,
    ) -> Result<TestItem> {
        self.updated.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("update {}", key)).into());
        }

        let next = self.replacements.lock().remove(key).unwrap_or_else(|| current.clone());

        let hook = self.on_update.lock().take();
        if let Some(hook) = hook {
            hook();
        }

        Ok(next)
    }
}

impl CacheHelper<String> for CountingHelper {
    type Internal = TestItem;
    type External = TestItem;

    fn open_item(
        &self,
        key: &String,
    ) -> Result<TestItem> {
        self.open_value(key)
    }

    fn update_item(
        &self,
        key: &String,
        item: &TestItem,
    ) -> Result<TestItem> {
        self.update_value(key, item)
    }

    fn dispose_item(
        &self,
        _key: &String,
        item: TestItem,
    ) -> Result<()> {
        self.disposed.lock().push(item);
        Ok(())
    }

    fn prepare_for_user(
        &self,
        item: &TestItem,
    ) -> TestItem {
        item.clone()
    }

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        self.wrapped.fetch_add(1, Ordering::SeqCst);
        block()
    }
}

pub(crate) const SINGLE_KEY: &str = "single";

impl SingleCacheHelper for CountingHelper {
    type Internal = TestItem;
    type External = TestItem;

    fn open_item(&self) -> Result<TestItem> {
        self.open_value(SINGLE_KEY)
    }

    fn update_item(
        &self,
        item: &TestItem,
    ) -> Result<TestItem> {
        self.update_value(SINGLE_KEY, item)
    }

    fn dispose_item(
        &self,
        item: TestItem,
    ) -> Result<()> {
        self.disposed.lock().push(item);
        Ok(())
    }

    fn prepare_for_user(
        &self,
        item: &TestItem,
    ) -> TestItem {
        item.clone()
    }
}

/// Collects every notification in arrival order
#[derive(Default)]
pub(crate) struct RecordingListener {
    pub events: Mutex<Vec<(String, TestItem, TestItem)>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl CacheListener<String, TestItem> for RecordingListener {
    fn on_element_updated(
        &self,
        key: &String,
        old_value: &TestItem,
        new_value: &TestItem,
    ) {
        self.events.lock().push((key.clone(), old_value.clone(), new_value.clone()));
    }
}

impl SingleCacheListener<TestItem> for RecordingListener {
    fn on_element_updated(
        &self,
        old_value: &TestItem,
        new_value: &TestItem,
    ) {
        self.events
            .lock()
            .push((SINGLE_KEY.to_string(), old_value.clone(), new_value.clone()));
    }
}
