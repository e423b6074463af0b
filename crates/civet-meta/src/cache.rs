// cache.rs
//
// Per-file metadata cache codec. The payload is preceded by a cache
// version integer; readers reject mismatched versions so stale caches
// degrade to a reparse instead of feeding wrong data into the store.
//
// Version log:
//     1 - initial format
//     2 - properties keyed with `$` prefix for statics
//     3 - added function_overrides to FileMeta

use crate::entities::FileMeta;
use thiserror::Error;

pub const CACHE_VERSION: u32 = 3;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("wrong cache version (expected {CACHE_VERSION}, found {found})")]
    WrongVersion { found: u32 },

    #[error("cache payload truncated")]
    Truncated,

    #[error("cache payload corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub fn encode_file_meta(meta: &FileMeta) -> Result<Vec<u8>, CacheError> {
    let mut out = CACHE_VERSION.to_le_bytes().to_vec();
    serde_json::to_writer(&mut out, meta)?;
    Ok(out)
}

pub fn decode_file_meta(bytes: &[u8]) -> Result<FileMeta, CacheError> {
    let Some((header, payload)) = bytes.split_first_chunk::<4>() else {
        return Err(CacheError::Truncated);
    };
    let found = u32::from_le_bytes(*header);
    if found != CACHE_VERSION {
        return Err(CacheError::WrongVersion { found });
    }
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ClassInfo, FuncInfo};

    #[test]
    fn roundtrip() {
        let mut meta = FileMeta::default();
        meta.classes.insert("\\A".into(), ClassInfo::default());
        meta.functions.insert("\\f".into(), FuncInfo::default());
        let bytes = encode_file_meta(&meta).unwrap();
        let back = decode_file_meta(&bytes).unwrap();
        assert!(back.classes.contains_key("\\A"));
        assert!(back.functions.contains_key("\\f"));
    }

    #[test]
    fn wrong_version_is_a_distinct_error() {
        let mut meta_bytes = encode_file_meta(&FileMeta::default()).unwrap();
        meta_bytes[0] = meta_bytes[0].wrapping_add(1);
        match decode_file_meta(&meta_bytes) {
            Err(CacheError::WrongVersion { .. }) => {}
            other => panic!("expected WrongVersion, got {other:?}"),
        }
    }

    #[test]
    fn truncated_input() {
        assert!(matches!(
            decode_file_meta(&[1, 2]),
            Err(CacheError::Truncated)
        ));
    }
}
