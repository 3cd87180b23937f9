//! # Extração do Catálogo
//!
//! Deriva as dimensões `songs` e `artists` a partir dos registros de catálogo.

use polars::prelude::*;

use crate::dedup::deduplicate;
use crate::errors::PipelineError;
use crate::models::DedupStrategy;
use crate::schema::{self, ARTISTS, SONGS};
use crate::source;

const SONG_COLUMNS: [&str; 5] = ["song_id", "title", "artist_id", "year", "duration"];

/// Campos de artista renomeados removendo o prefixo `artist_`.
const ARTIST_FIELDS: [&str; 4] = [
    "artist_name",
    "artist_location",
    "artist_latitude",
    "artist_longitude",
];

/// Dimensões derivadas de um snapshot do catálogo.
#[derive(Debug, Clone)]
pub struct CatalogTables {
    pub songs: DataFrame,
    pub artists: DataFrame,
}

/// Lê e normaliza os registros de catálogo do localizador.
pub fn read_catalog(locator: &str) -> Result<DataFrame, PipelineError> {
    let raw = source::read_json_records(locator)?;
    source::normalize(raw, &schema::song_fields())
}

/// `songs`: projeção das cinco colunas de música + deduplicação.
pub fn songs_table(catalog: &DataFrame, strategy: DedupStrategy) -> Result<DataFrame, PipelineError> {
    let projected = catalog.select(SONG_COLUMNS)?;
    deduplicate(projected, &SONGS, strategy)
}

/// `artists`: `artist_id` + campos `artist_*` renomeados + deduplicação.
pub fn artists_table(catalog: &DataFrame, strategy: DedupStrategy) -> Result<DataFrame, PipelineError> {
    let mut exprs = vec![col("artist_id")];
    exprs.extend(
        ARTIST_FIELDS
            .iter()
            .map(|field| col(*field).alias(field.trim_start_matches("artist_"))),
    );

    let projected = catalog.clone().lazy().select(exprs).collect()?;
    deduplicate(projected, &ARTISTS, strategy)
}

pub fn extract_catalog(catalog: &DataFrame, strategy: DedupStrategy) -> Result<CatalogTables, PipelineError> {
    Ok(CatalogTables {
        songs: songs_table(catalog, strategy)?,
        artists: artists_table(catalog, strategy)?,
    })
}
