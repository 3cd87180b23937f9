//! # Orquestração
//!
//! Executa, em sequência, o pipeline de catálogo (`songs`, `artists`) e o de
//! eventos (`users`, `time`, `songplays`). Toda falha é fatal; tabelas já
//! publicadas na mesma execução não são revertidas.
//!
//! Em cada pipeline, todas as fontes são lidas antes da primeira escrita, de modo
//! que uma fonte ausente nunca deixa o pipeline com tabelas parcialmente publicadas.

use polars::prelude::DataFrame;
use serde::Serialize;
use std::time::Instant;
use tracing::info;

use crate::catalog::{extract_catalog, read_catalog};
use crate::errors::PipelineError;
use crate::events::{filter_plays, read_events, time_table, users_table};
use crate::models::{CatalogMode, Config};
use crate::schema::{ARTISTS, SONGPLAYS, SONGS, TIME, USERS};
use crate::sink::{ParquetSink, TableReport};
use crate::songplays::songplays_table;

/// Resultado de uma execução completa.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub tables: Vec<TableReport>,
}

impl RunSummary {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// Pipeline de catálogo: lê os registros de música e publica `songs` e `artists`.
///
/// Retorna também o catálogo normalizado, para reuso opcional no pipeline de eventos.
pub fn process_song_data(
    config: &Config,
    sink: &ParquetSink,
) -> Result<(DataFrame, Vec<TableReport>), PipelineError> {
    let catalog = read_catalog(&config.input.song_data)?;
    info!(records = catalog.height(), "catálogo carregado");

    let tables = extract_catalog(&catalog, config.transform.dedup)?;

    let reports = vec![
        sink.write_table(&SONGS, &tables.songs)?,
        sink.write_table(&ARTISTS, &tables.artists)?,
    ];
    Ok((catalog, reports))
}

/// Pipeline de eventos: filtra reproduções e publica `users`, `time` e `songplays`.
///
/// `catalog` só é usado com `CatalogMode::Reuse`; nos demais casos (ou se ausente)
/// a fonte de músicas é relida.
pub fn process_log_data(
    config: &Config,
    sink: &ParquetSink,
    catalog: Option<&DataFrame>,
) -> Result<Vec<TableReport>, PipelineError> {
    let events = read_events(&config.input.log_data)?;
    info!(records = events.height(), "eventos carregados");

    let reread;
    let catalog = match (config.transform.catalog, catalog) {
        (CatalogMode::Reuse, Some(catalog)) => catalog,
        _ => {
            reread = read_catalog(&config.input.song_data)?;
            &reread
        }
    };

    let plays = filter_plays(events, &config.transform.play_page)?;
    info!(plays = plays.height(), "reproduções filtradas");

    let users = users_table(&plays, config.transform.dedup)?;
    let time = time_table(&plays, config.transform.distinct_time)?;
    let songplays = songplays_table(&plays, catalog)?;

    Ok(vec![
        sink.write_table(&USERS, &users)?,
        sink.write_table(&TIME, &time)?,
        sink.write_table(&SONGPLAYS, &songplays)?,
    ])
}

/// Executa os dois pipelines com a configuração resolvida.
pub fn run(config: &Config) -> Result<RunSummary, PipelineError> {
    config.validate()?;
    let timer = Instant::now();
    let sink = ParquetSink::from_config(&config.output);

    let (catalog, mut tables) = process_song_data(config, &sink)?;
    tables.extend(process_log_data(config, &sink, Some(&catalog))?);

    info!(
        tables = tables.len(),
        elapsed = ?timer.elapsed(),
        "execução concluída"
    );
    Ok(RunSummary { tables })
}
