// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration

use crate::cache::DEFAULT_CACHE_SIZE;
use crate::mutator::WritePolicy;
use serde::{Deserialize, Serialize};

/// Options controlling how mapping results are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Omit target keys whose value resolved to null
    pub skip_null: bool,
    /// Compact wildcard-bound numeric keys to `0..n-1`
    pub reindex_wildcard: bool,
    /// Trim string values before they are written
    pub trim_values: bool,
}

impl MapperConfig {
    /// Write everything exactly as evaluated
    pub fn verbatim() -> Self {
        Self {
            skip_null: false,
            reindex_wildcard: false,
            trim_values: false,
        }
    }

    /// Write policy handed to the mutator
    pub fn write_policy(&self) -> WritePolicy {
        WritePolicy {
            reindex_wildcard: self.reindex_wildcard,
        }
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            skip_null: true,
            reindex_wildcard: false,
            trim_values: true,
        }
    }
}

/// Configuration of a [`DataEngine`](crate::engine::DataEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the parsed path cache, 0 disables it
    pub path_cache_size: usize,
    /// Capacity of the parsed expression cache, 0 disables it
    pub expression_cache_size: usize,
    /// Mapping behaviour
    pub mapper: MapperConfig,
}

impl EngineConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Large caches for long-running processes mapping many templates
    pub fn high_performance() -> Self {
        Self {
            path_cache_size: 10_000,
            expression_cache_size: 10_000,
            mapper: MapperConfig::default(),
        }
    }

    /// Small caches
    pub fn low_memory() -> Self {
        Self {
            path_cache_size: 100,
            expression_cache_size: 100,
            mapper: MapperConfig::default(),
        }
    }

    /// Every parse is fresh
    pub fn disabled() -> Self {
        Self {
            path_cache_size: 0,
            expression_cache_size: 0,
            mapper: MapperConfig::default(),
        }
    }

    /// Small caches for tests
    pub fn testing() -> Self {
        Self {
            path_cache_size: 16,
            expression_cache_size: 16,
            mapper: MapperConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path_cache_size: DEFAULT_CACHE_SIZE,
            expression_cache_size: DEFAULT_CACHE_SIZE,
            mapper: MapperConfig::default(),
        }
    }
}
