use std::collections::{BTreeMap, HashSet};

use time::{Date, Month};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    logs::{
        dto::LogView,
        repo_types::{LogFilter, LogSort, WatchMethod},
        services::list_joined,
    },
    state::AppState,
    stats::dto::{Distribution, Pace, StatsQuery, StatsResponse, Summary},
};

/// Reduces joined log rows to summary counts and distributions.
pub fn compute_stats(rows: &[LogView]) -> StatsResponse {
    let total_watches = rows.len() as u64;
    let unique_titles = rows
        .iter()
        .map(|r| r.movie_id)
        .collect::<HashSet<_>>()
        .len() as u64;
    let total_minutes = rows
        .iter()
        .filter_map(|r| r.movie.as_ref())
        .map(|m| m.runtime_minutes())
        .sum();

    let ratings: Vec<i32> = rows
        .iter()
        .filter_map(|r| r.movie_rating.as_ref().map(|mr| mr.rating))
        .collect();
    let vote_average = (!ratings.is_empty())
        .then(|| ratings.iter().map(|r| *r as f64).sum::<f64>() / ratings.len() as f64);

    let mut by_method: BTreeMap<WatchMethod, u64> =
        WatchMethod::ALL.iter().map(|m| (*m, 0)).collect();
    for r in rows {
        *by_method.entry(r.watched_where).or_insert(0) += 1;
    }

    StatsResponse {
        summary: Summary {
            total_watches,
            unique_titles,
            total_rewatches: total_watches.saturating_sub(unique_titles),
            total_minutes,
            vote_average,
        },
        distribution: Distribution { by_method },
        pace: Pace::placeholder(),
    }
}

/// Jan 1 of `year_from` to Dec 31 of `year_to`; a missing bound stays open.
pub fn year_filter(q: &StatsQuery) -> AppResult<LogFilter> {
    if let (Some(from), Some(to)) = (q.year_from, q.year_to) {
        if from > to {
            return Err(AppError::invalid("yearFrom", "must not be after yearTo"));
        }
    }
    let from = q
        .year_from
        .map(|y| {
            Date::from_calendar_date(y, Month::January, 1)
                .map_err(|_| AppError::invalid("yearFrom", "is not a valid year"))
        })
        .transpose()?;
    let to = q
        .year_to
        .map(|y| {
            Date::from_calendar_date(y, Month::December, 31)
                .map_err(|_| AppError::invalid("yearTo", "is not a valid year"))
        })
        .transpose()?;
    Ok(LogFilter::between_days(from, to))
}

pub async fn stats_for_user(
    state: &AppState,
    user_id: Uuid,
    q: &StatsQuery,
) -> AppResult<StatsResponse> {
    let filter = year_filter(q)?;
    let rows = list_joined(state, user_id, &filter, LogSort::default()).await?;
    Ok(compute_stats(&rows))
}
