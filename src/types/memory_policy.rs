//! Caching policy for a node's output tables.

use std::fmt;
use std::str::FromStr;

/// How a node's output tables are held. An enum rather than a boolean since
/// further options may be added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryPolicy {
  /// Hold output rows in memory.
  CacheInMemory,
  /// Keep only small tables in memory, spill larger ones to disc.
  #[default]
  CacheSmallInMemory,
  /// Buffer all output rows on disc.
  CacheOnDisc,
}

impl fmt::Display for MemoryPolicy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      MemoryPolicy::CacheInMemory => "CacheInMemory",
      MemoryPolicy::CacheSmallInMemory => "CacheSmallInMemory",
      MemoryPolicy::CacheOnDisc => "CacheOnDisc",
    };
    write!(f, "{s}")
  }
}

impl FromStr for MemoryPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "CacheInMemory" => Ok(MemoryPolicy::CacheInMemory),
      "CacheSmallInMemory" => Ok(MemoryPolicy::CacheSmallInMemory),
      "CacheOnDisc" => Ok(MemoryPolicy::CacheOnDisc),
      other => Err(format!("unknown memory policy: {other}")),
    }
  }
}
