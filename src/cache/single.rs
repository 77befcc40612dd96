use super::CacheHelper;
use super::CacheOwner;
use super::KeyedCache;
use super::SingleCacheConsumer;
use super::SingleCacheHelper;
use super::SingleCacheListener;
use super::SingleListenerRef;
use crate::config::GateConfig;
use crate::Result;

/// Presents a [`SingleCacheHelper`] as a helper keyed by `()`
struct SingleKey<H>(H);

impl<H: SingleCacheHelper> CacheHelper<()> for SingleKey<H> {
    type Internal = H::Internal;
    type External = H::External;

    fn open_item(
        &self,
        _key: &(),
    ) -> Result<Self::Internal> {
        self.0.open_item()
    }

    fn update_item(
        &self,
        _key: &(),
        item: &Self::Internal,
    ) -> Result<Self::Internal> {
        self.0.update_item(item)
    }

    fn dispose_item(
        &self,
        _key: &(),
        item: Self::Internal,
    ) -> Result<()> {
        self.0.dispose_item(item)
    }

    fn prepare_for_user(
        &self,
        item: &Self::Internal,
    ) -> Self::External {
        self.0.prepare_for_user(item)
    }

    fn wrap_open_or_update<R, F>(
        &self,
        block: F,
    ) -> R
    where
        F: FnOnce() -> R,
    {
        self.0.wrap_open_or_update(block)
    }
}

type SingleEngine<H> =
    KeyedCache<(), SingleKey<H>, dyn SingleCacheListener<<H as SingleCacheHelper>::External>>;

/// [`KeyedCache`] collapsed to one implicit key.
pub struct SingleItemCache<H: SingleCacheHelper> {
    engine: SingleEngine<H>,
}

impl<H: SingleCacheHelper> Clone for SingleItemCache<H> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<H: SingleCacheHelper> SingleItemCache<H> {
    pub fn new(
        name: &'static str,
        helper: H,
        gate: &GateConfig,
    ) -> Self {
        Self {
            engine: SingleEngine::<H>::build(name, SingleKey(helper), gate),
        }
    }

    pub fn with_defaults(
        name: &'static str,
        helper: H,
    ) -> Self {
        Self::new(name, helper, &GateConfig::default())
    }

    pub fn name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn helper(&self) -> &H {
        &self.engine.helper().0
    }

    pub fn is_live(&self) -> bool {
        !self.engine.is_empty()
    }

    pub fn users(&self) -> usize {
        self.engine.users(&())
    }

    pub fn listener_count(&self) -> usize {
        self.engine.listener_count(&())
    }
}

impl<H: SingleCacheHelper> SingleCacheConsumer<H::External> for SingleItemCache<H> {
    fn open(
        &self,
        listener: Option<SingleListenerRef<H::External>>,
    ) -> Result<H::External> {
        self.engine.open_with(&(), listener)
    }

    fn close(
        &self,
        listener: Option<&SingleListenerRef<H::External>>,
    ) -> Result<()> {
        self.engine.close_with(&(), listener)
    }
}

impl<H: SingleCacheHelper> CacheOwner for SingleItemCache<H> {
    fn refresh_all(&self) -> Result<()> {
        self.engine.refresh_all()
    }
}
