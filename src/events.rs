//! # Filtro de Eventos e Dimensões de Uso
//!
//! Apenas eventos com `page == "NextSong"` representam reproduções; todo o
//! restante (login, logout, home, ...) é descartado antes de qualquer derivação.

use polars::prelude::*;

use crate::dedup::deduplicate;
use crate::errors::PipelineError;
use crate::models::DedupStrategy;
use crate::schema::{self, TIME, USERS};
use crate::source;
use crate::timestamps::{calendar_exprs, with_event_time};

/// Lê e normaliza os eventos de log do localizador.
pub fn read_events(locator: &str) -> Result<DataFrame, PipelineError> {
    let raw = source::read_json_records(locator)?;
    source::normalize(raw, &schema::log_fields())
}

/// Mantém apenas as reproduções e adiciona as colunas `timestamp` e `start_time`.
pub fn filter_plays(events: DataFrame, play_page: &str) -> Result<DataFrame, PipelineError> {
    let plays = events
        .lazy()
        .filter(col("page").eq(lit(play_page)))
        .collect()?;

    with_event_time(plays)
}

/// `users`: colunas de identidade renomeadas + deduplicação.
///
/// Com `DedupStrategy::Row`, um usuário que trocou de `level` no meio do log
/// aparece uma vez por nível.
pub fn users_table(plays: &DataFrame, strategy: DedupStrategy) -> Result<DataFrame, PipelineError> {
    let projected = plays
        .clone()
        .lazy()
        .select([
            col("userId").alias("user_id"),
            col("firstName").alias("first_name"),
            col("lastName").alias("last_name"),
            col("gender"),
            col("level"),
        ])
        .collect()?;

    deduplicate(projected, &USERS, strategy)
}

/// `time`: `start_time` e seus componentes de calendário, uma linha por evento.
///
/// Com `distinct` ligado, instantes repetidos viram uma única linha.
pub fn time_table(plays: &DataFrame, distinct: bool) -> Result<DataFrame, PipelineError> {
    let mut exprs = vec![col("start_time")];
    exprs.extend(calendar_exprs());

    let table = plays.clone().lazy().select(exprs).collect()?;
    if !distinct {
        return Ok(table);
    }

    let key: Vec<String> = TIME.key.iter().map(|c| c.to_string()).collect();
    Ok(table.unique_stable(Some(key.as_slice()), UniqueKeepStrategy::First, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_543_449_657_796;

    fn events() -> DataFrame {
        let raw = df!(
            "userId" => ["39", "39", "8", "8", ""],
            "firstName" => ["Walter", "Walter", "Kaylee", "Kaylee", ""],
            "lastName" => ["Frye", "Frye", "Summers", "Summers", ""],
            "gender" => ["M", "M", "F", "F", ""],
            "level" => ["free", "free", "free", "paid", "free"],
            "page" => ["NextSong", "Home", "NextSong", "NextSong", "Logout"],
            "ts" => [TS, TS + 1, TS, TS + 60_000, TS + 2],
            "song" => [Some("Setanta matilda"), None, Some("Sehr kosmisch"), Some("You Gotta Be"), None],
            "sessionId" => [38i64, 38, 139, 139, 7],
            "location" => ["San Francisco", "San Francisco", "Phoenix", "Phoenix", ""],
            "userAgent" => ["Mozilla/5.0", "Mozilla/5.0", "Mozilla/5.0", "Mozilla/5.0", ""]
        )
        .unwrap();
        source::normalize(raw, &schema::log_fields()).unwrap()
    }

    #[test]
    fn only_next_song_events_survive() {
        let plays = filter_plays(events(), "NextSong").unwrap();
        assert_eq!(plays.height(), 3);

        let pages = plays.column("page").unwrap().as_materialized_series().str().unwrap().clone();
        assert!(pages.into_iter().all(|p| p == Some("NextSong")));
    }

    #[test]
    fn users_are_renamed_and_keyed() {
        let plays = filter_plays(events(), "NextSong").unwrap();

        let users = users_table(&plays, DedupStrategy::Key).unwrap();
        assert_eq!(
            users.get_column_names_str(),
            vec!["user_id", "first_name", "last_name", "gender", "level"]
        );
        assert_eq!(users.height(), 2);

        let by_row = users_table(&plays, DedupStrategy::Row).unwrap();
        assert_eq!(by_row.height(), 3);
    }

    #[test]
    fn logged_out_users_never_reach_users_table() {
        let plays = filter_plays(events(), "NextSong").unwrap();
        let users = users_table(&plays, DedupStrategy::Row).unwrap();
        let ids = users.column("user_id").unwrap().as_materialized_series().str().unwrap().clone();
        assert!(ids.into_iter().all(|id| id != Some("")));
    }

    #[test]
    fn time_table_has_one_row_per_event_by_default() {
        let plays = filter_plays(events(), "NextSong").unwrap();

        let time = time_table(&plays, false).unwrap();
        assert_eq!(
            time.get_column_names_str(),
            vec!["start_time", "hour", "day", "week", "month", "year", "weekday"]
        );
        assert_eq!(time.height(), 3);

        let distinct = time_table(&plays, true).unwrap();
        assert_eq!(distinct.height(), 2);
    }
}
