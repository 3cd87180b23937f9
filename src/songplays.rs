//! # Tabela Fato `songplays`
//!
//! Liga cada reprodução ao catálogo por igualdade exata entre `song` (evento)
//! e `title` (catálogo). O join é interno: eventos sem título correspondente
//! são descartados sem erro. A comparação diferencia maiúsculas e espaços.
//!
//! ## Chave substituta
//! `songplay_id` é o índice da linha após ordenar o resultado do join por
//! (`ts`, `sessionId`, `itemInSession`, `song_id`). É único na execução e
//! repetível para as mesmas entradas, mas não é um identificador durável.
//!
//! ## Partições
//! `year` e `month` saem de `start_time`, ou seja, do ano do evento e não do ano
//! de lançamento da música no catálogo. Por isso o layout `year=/month=` pode
//! diferir do de cargas anteriores que particionavam pelo `year` do catálogo.

use polars::prelude::*;
use tracing::warn;

use crate::errors::PipelineError;
use crate::schema::SONGPLAYS;
use crate::timestamps::CalendarField;

pub const SONGPLAY_COLUMNS: [&str; 11] = [
    "songplay_id",
    "start_time",
    "user_id",
    "level",
    "song_id",
    "artist_id",
    "session_id",
    "location",
    "user_agent",
    "year",
    "month",
];

/// Monta `songplays` a partir das reproduções filtradas e do catálogo normalizado.
pub fn songplays_table(plays: &DataFrame, catalog: &DataFrame) -> Result<DataFrame, PipelineError> {
    let songs = catalog
        .clone()
        .lazy()
        .select([col("title"), col("song_id"), col("artist_id")]);

    let ordering = SortMultipleOptions::default()
        .with_nulls_last(true)
        .with_maintain_order(true);

    let table = plays
        .clone()
        .lazy()
        .join(
            songs,
            [col("song")],
            [col("title")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort_by_exprs(
            [col("ts"), col("sessionId"), col("itemInSession"), col("song_id")],
            ordering,
        )
        .with_row_index(SONGPLAYS.key[0], None)
        .select([
            col(SONGPLAYS.key[0]).cast(DataType::Int64),
            col("start_time"),
            col("userId").alias("user_id"),
            col("level"),
            col("song_id"),
            col("artist_id"),
            col("sessionId").alias("session_id"),
            col("location"),
            col("userAgent").alias("user_agent"),
            CalendarField::Year.expr(),
            CalendarField::Month.expr(),
        ])
        .collect()?;

    if table.height() == 0 {
        warn!("nenhuma reprodução corresponde a um título do catálogo; songplays vazia");
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::filter_plays;
    use crate::schema;
    use crate::source::normalize;

    const TS: i64 = 1_543_449_657_796;

    fn catalog(titles: &[&str]) -> DataFrame {
        let ids: Vec<String> = (0..titles.len()).map(|i| format!("SO{:04}", i)).collect();
        let artists: Vec<String> = (0..titles.len()).map(|i| format!("AR{:04}", i)).collect();
        let raw = df!(
            "song_id" => ids,
            "title" => titles.to_vec(),
            "artist_id" => artists
        )
        .unwrap();
        normalize(raw, &schema::song_fields()).unwrap()
    }

    fn plays(songs: &[&str]) -> DataFrame {
        let n = songs.len();
        let raw = df!(
            "userId" => vec!["39"; n],
            "level" => vec!["free"; n],
            "page" => vec!["NextSong"; n],
            "ts" => (0..n as i64).map(|i| TS + i).collect::<Vec<_>>(),
            "song" => songs.to_vec(),
            "sessionId" => vec![38i64; n],
            "location" => vec!["San Francisco-Oakland-Hayward, CA"; n],
            "userAgent" => vec!["Mozilla/5.0"; n]
        )
        .unwrap();
        filter_plays(normalize(raw, &schema::log_fields()).unwrap(), "NextSong").unwrap()
    }

    #[test]
    fn exact_title_match_carries_catalog_keys() {
        let table = songplays_table(
            &plays(&["Setanta matilda"]),
            &catalog(&["Setanta matilda", "Intro"]),
        )
        .unwrap();

        assert_eq!(table.get_column_names_str(), SONGPLAY_COLUMNS.to_vec());
        assert_eq!(table.height(), 1);

        let song_id = table.column("song_id").unwrap().as_materialized_series().str().unwrap().get(0).map(str::to_string);
        let artist_id = table.column("artist_id").unwrap().as_materialized_series().str().unwrap().get(0).map(str::to_string);
        assert_eq!(song_id.as_deref(), Some("SO0000"));
        assert_eq!(artist_id.as_deref(), Some("AR0000"));

        let year = table.column("year").unwrap().as_materialized_series().i32().unwrap().get(0);
        let month = table.column("month").unwrap().as_materialized_series().i32().unwrap().get(0);
        assert_eq!((year, month), (Some(2018), Some(11)));
    }

    #[test]
    fn partition_year_comes_from_event_not_catalog() {
        let mut catalog = catalog(&["Setanta matilda"]);
        catalog.with_column(Column::new("year".into(), [1997i64])).unwrap();

        let table = songplays_table(&plays(&["Setanta matilda"]), &catalog).unwrap();
        let year = table.column("year").unwrap().as_materialized_series().i32().unwrap().get(0);
        assert_eq!(year, Some(2018));
    }

    #[test]
    fn surrogate_key_column_matches_table_key() {
        let table = songplays_table(&plays(&["A"]), &catalog(&["A"])).unwrap();
        assert_eq!(table.get_column_names_str()[0], SONGPLAYS.key[0]);
        assert_eq!(table.column(SONGPLAYS.key[0]).unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn title_match_is_case_and_whitespace_sensitive() {
        let table = songplays_table(
            &plays(&["setanta matilda", "Setanta matilda "]),
            &catalog(&["Setanta matilda"]),
        )
        .unwrap();
        assert_eq!(table.height(), 0);
    }

    #[test]
    fn disjoint_titles_yield_empty_table() {
        let table = songplays_table(&plays(&["Sehr kosmisch"]), &catalog(&["Intro"])).unwrap();
        assert_eq!(table.height(), 0);
        assert_eq!(table.get_column_names_str(), SONGPLAY_COLUMNS.to_vec());
    }

    #[test]
    fn surrogate_keys_are_distinct_and_repeatable() {
        let plays = plays(&["A", "B", "A", "C", "B"]);
        let catalog = catalog(&["A", "B", "C"]);

        let first = songplays_table(&plays, &catalog).unwrap();
        assert_eq!(first.height(), 5);
        let ids = first.column("songplay_id").unwrap().as_materialized_series();
        assert_eq!(ids.n_unique().unwrap(), first.height());

        let second = songplays_table(&plays, &catalog).unwrap();
        assert!(first.equals_missing(&second));
    }
}
