pub mod local;

pub use local::{cosine_similarity, LocalCollection};
