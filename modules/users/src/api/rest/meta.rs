//! Offset/limit paging metadata returned alongside list results.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("default page size must be positive")]
    InvalidDefaultLimit,
    #[error("max page size ({max}) is below the default page size ({default})")]
    InvalidMaxLimit { default: u64, max: u64 },
}

/// Paging envelope: echoes the effective offset/limit and the total match count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    pub offset: u64,
    pub limit: u64,
    pub total: u64,
}

impl Meta {
    /// Normalizes the requested window:
    /// - `limit <= 0` falls back to `default_limit`; larger than `max_limit` is clamped;
    /// - `offset < 0` becomes 0.
    pub fn new(
        offset: i64,
        limit: i64,
        total: u64,
        default_limit: u64,
        max_limit: u64,
    ) -> Result<Self, MetaError> {
        if default_limit == 0 {
            return Err(MetaError::InvalidDefaultLimit);
        }
        if max_limit < default_limit {
            return Err(MetaError::InvalidMaxLimit {
                default: default_limit,
                max: max_limit,
            });
        }

        let limit = u64::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .map_or(default_limit, |l| l.min(max_limit));
        let offset = u64::try_from(offset).unwrap_or(0);

        Ok(Self {
            offset,
            limit,
            total,
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}
