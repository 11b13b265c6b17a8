pub mod artifacts;
pub mod cluster;
pub mod encoder;
pub mod normalizer;
pub mod pipeline;
pub mod providers;
pub mod ranker;
pub mod recommender;

pub use artifacts::ModelBundle;
pub use pipeline::Preprocessor;
pub use recommender::{Recommender, RecommenderSettings};
