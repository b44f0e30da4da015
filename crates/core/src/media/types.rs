//! TMDB data model.
//!
//! Field names follow TMDB's JSON so responses pass through to the web client
//! unchanged. Fields absent from search results default to empty.

use serde::{Deserialize, Serialize};

/// The two kinds of media a user can watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of TMDB search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

fn first_page() -> u32 {
    1
}

impl<T> SearchPage<T> {
    pub fn single(results: Vec<T>) -> Self {
        let total = results.len() as u32;
        Self {
            page: 1,
            total_pages: 1,
            total_results: total,
            results,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbGenre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    /// Only present in detail responses.
    #[serde(default)]
    pub runtime: Option<u32>,
}

impl TmdbMovie {
    /// Release year parsed from `release_date`.
    pub fn year(&self) -> Option<u32> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .and_then(|y| y.parse().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbSeries {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
    #[serde(default)]
    pub genres: Vec<TmdbGenre>,
    #[serde(default)]
    pub vote_average: Option<f32>,
}

/// Season entry embedded in a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbSeasonSummary {
    #[serde(default)]
    pub id: Option<i64>,
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    /// Filled in by the media detail lookup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episodes: Option<Vec<TmdbEpisode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbSeason {
    #[serde(default)]
    pub id: Option<i64>,
    pub season_number: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub episodes: Vec<TmdbEpisode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TmdbEpisode {
    pub id: i64,
    pub episode_number: u32,
    #[serde(default)]
    pub season_number: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub air_date: Option<String>,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f32>,
    #[serde(default)]
    pub runtime: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_parse() {
        assert_eq!("movie".parse::<MediaType>().unwrap(), MediaType::Movie);
        assert_eq!("tv".parse::<MediaType>().unwrap(), MediaType::Tv);
        assert!("music".parse::<MediaType>().is_err());
        assert_eq!(serde_json::to_string(&MediaType::Tv).unwrap(), "\"tv\"");
    }

    #[test]
    fn test_movie_year() {
        let movie: TmdbMovie = serde_json::from_value(serde_json::json!({
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "genre_ids": [28, 878]
        }))
        .unwrap();
        assert_eq!(movie.year(), Some(1999));
        assert!(movie.genres.is_empty());
        assert!(movie.runtime.is_none());
    }

    #[test]
    fn test_search_page_deserializes_tmdb_shape() {
        let page: SearchPage<TmdbSeries> = serde_json::from_value(serde_json::json!({
            "page": 1,
            "total_pages": 3,
            "total_results": 41,
            "results": [{"id": 1399, "name": "Game of Thrones", "first_air_date": "2011-04-17"}]
        }))
        .unwrap();
        assert_eq!(page.total_results, 41);
        assert_eq!(page.results[0].name, "Game of Thrones");
        assert!(page.results[0].seasons.is_empty());
    }

    #[test]
    fn test_season_summary_omits_missing_episodes() {
        let summary = TmdbSeasonSummary {
            id: Some(1),
            season_number: 1,
            name: None,
            episode_count: Some(10),
            air_date: None,
            poster_path: None,
            episodes: None,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json.get("episodes").is_none());
    }
}
