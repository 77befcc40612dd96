//! Helpers shared by the unit tests of every module
mod cache_helper;
mod store_fixture;

pub(crate) use cache_helper::*;
pub(crate) use store_fixture::*;
