pub mod core;
pub mod storage;
pub mod analysis;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod backing;

pub use crate::backing::{
    BackingStore, CacheBackingStore, FileBackingStore, InMemoryObjectStorage, NoOpBackingStore,
    ObjectStorageClient, RemoteObjectStore, StoreKey,
};
pub use crate::core::codec::{BincodeCodec, Codec};
pub use crate::core::config::Config;
pub use crate::core::database::{Core, QueryResults, Resolved, StoreOptions};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::record::{Field, FieldType, FieldValue, Record, RecordDescriptor, StoreMode};
pub use crate::query::types::{FieldQuery, Query};

/*
┌────────────────────────────────────────────────────────────────────────────────────────────┐
│                              KIRADB STRUCT ARCHITECTURE                                     │
└────────────────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────────── CORE LAYER ─────────────────────────────────────────┐
│                                                                                             │
│  ┌───────────────────────────────────────────────────────────────────────────────────┐    │
│  │                               struct Core<C: Codec>                                │    │
│  │  config: Config                          // paths, retry bounds, defaults         │    │
│  │  index: IndexAdapter                     // upsert / lookup / search / related    │    │
│  │  codec: C                                // payload freeze/thaw (bincode)         │    │
│  │  backing: Option<Box<dyn BackingStore>>  // authoritative payloads (BACKING)      │    │
│  │  cache: Option<Box<dyn BackingStore>>    // read-through layer                    │    │
│  │  cursor: Mutex<Option<Cursor>>           // first_object / next_object            │    │
│  └───────────────────────────────────────────────────────────────────────────────────┘    │
│                                                                                             │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌─────────────────────────────┐      │
│  │ RecordDescriptor     │  │ Field                │  │ StoreMode (bitmask)          │      │
│  │ • record_name        │  │ • name               │  │ • NONE    = 0                │      │
│  │ • primary_key        │  │ • field_type         │  │ • INDEX   = 1                │      │
│  │ • fields             │  │ • value              │  │ • BACKING = 2                │      │
│  │ • store_mode         │  └──────────────────────┘  └─────────────────────────────┘      │
│  └──────────────────────┘                                                                  │
└─────────────────────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────────── BACKING LAYER ────────────────────────────────────────┐
│  trait BackingStore: store / retrieve / remove / keys                                       │
│   ├─ NoOpBackingStore                                                                       │
│   ├─ CacheBackingStore      global lru region, init() / shutdown()                          │
│   ├─ FileBackingStore       {root}/{record}/{key}, MarkerLock + FileLock                    │
│   └─ RemoteObjectStore      {record}/{key} in a bucket, over ObjectStorageClient            │
└─────────────────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────────── INDEX LAYER ─────────────────────────────────────────┐
│  IndexAdapter ──► IndexWriter (write.lock, upsert, delete, optimize, close = publish)       │
│                   └─ TieredMergePolicy (merge smallest / dead segments on each commit)      │
│              └──► Searcher    (checkpoint snapshot → InvertedIndex → BM25 / field sort)     │
│                                                                                             │
│  {root}/segments/{uuid}.seg   header + CRC32 + length-prefixed bincode documents            │
│  {root}/meta/checkpoint.bin   generation, segments, tombstones (tmp + rename)               │
└─────────────────────────────────────────────────────────────────────────────────────────────┘
*/
