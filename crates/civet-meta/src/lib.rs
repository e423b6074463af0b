// lib.rs
//! Type sets, scopes, and the process-wide metadata store populated
//! during indexing and read during analysis.

pub mod cache;
pub mod entities;
pub mod scope;
pub mod store;
pub mod types;

pub use cache::{decode_file_meta, encode_file_meta, CacheError, CACHE_VERSION};
pub use entities::{
    AccessLevel, ClassInfo, ConstInfo, ConstantInfo, ExitFlags, FileMeta, FuncDoc, FuncInfo,
    FuncOverride, OverrideKind, ParamInfo, PropertyInfo,
};
pub use scope::{Scope, VarInfo};
pub use store::{MetadataStore, StoreStats};
pub use types::{parse_type_string, Type, TypeSet};
