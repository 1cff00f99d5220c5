//! Core services bridging the HTTP layer and the object store.

pub mod storage_service;
