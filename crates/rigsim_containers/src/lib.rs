//! Containers and data structures.

mod history_buffer;
mod key_index_mapper;

pub use history_buffer::HistoryBuffer;
pub use key_index_mapper::KeyIndexMapper;

pub type HashMap<K, V> = hashbrown::HashMap<K, V, rustc_hash::FxBuildHasher>;
