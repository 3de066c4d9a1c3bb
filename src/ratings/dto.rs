use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct RateMovieRequest {
    pub tmdb_id: i64,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}
