mod handlers;
mod routes;
mod state;

pub use handlers::{PreprocessResponse, RecommendationQuery, RecommendationRequest};
pub use routes::create_router;
pub use state::AppState;
