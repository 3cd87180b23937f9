//! # Escrita Particionada em Parquet
//!
//! Cada tabela é gravada em layout Hive (`<raiz>/<tabela>/<col>=<valor>/part-00000.parquet`)
//! com semântica de sobrescrita total.
//!
//! ## Publicação
//! A tabela é montada em `<raiz>/.<tabela>.staging` e só substitui a versão anterior
//! depois que todas as partições e o marcador `_SUCCESS` foram gravados. A versão
//! anterior é afastada para `<raiz>/.<tabela>.previous` durante a troca e restaurada
//! se o staging não puder ocupar o seu lugar. Qualquer falha remove o staging e
//! preserva a tabela anterior.

use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::PipelineError;
use crate::models::OutputConfig;
use crate::schema::TableSpec;

/// Valor de diretório para chaves de partição nulas ou vazias.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

pub const SUCCESS_MARKER: &str = "_SUCCESS";

const PART_FILE: &str = "part-00000.parquet";

/// Resumo de uma tabela publicada, também gravado como conteúdo de `_SUCCESS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub rows: usize,
    pub partitions: usize,
    pub partition_by: Vec<String>,
    pub columns: Vec<String>,
}

/// Fatia de uma tabela destinada a um único diretório de partição.
#[derive(Debug, Clone)]
pub struct Partition {
    /// Caminho relativo à raiz da tabela (vazio para tabelas sem partição).
    pub path: PathBuf,
    /// Linhas da partição, ainda com as colunas de partição.
    pub frame: DataFrame,
}

/// Divide o DataFrame pelos valores literais das colunas `keys`.
///
/// Sem chaves, a tabela inteira vira uma única partição na raiz; uma tabela
/// particionada vazia não gera partição alguma.
pub fn split_partitions(dataframe: &DataFrame, keys: &[&str]) -> Result<Vec<Partition>, PipelineError> {
    if keys.is_empty() {
        return Ok(vec![Partition {
            path: PathBuf::new(),
            frame: dataframe.clone(),
        }]);
    }

    if dataframe.height() == 0 {
        return Ok(Vec::new());
    }

    let frames = dataframe.partition_by_stable(keys.iter().copied(), true)?;

    let mut partitions = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut path = PathBuf::new();
        for key in keys {
            let value = frame.column(key)?.get(0)?;
            path.push(format!("{}={}", key, partition_value(&value)));
        }
        partitions.push(Partition { path, frame });
    }
    Ok(partitions)
}

fn partition_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => HIVE_DEFAULT_PARTITION.to_string(),
        AnyValue::String(s) if s.is_empty() => HIVE_DEFAULT_PARTITION.to_string(),
        AnyValue::String(s) => escape_path_name(s),
        AnyValue::StringOwned(s) if s.is_empty() => HIVE_DEFAULT_PARTITION.to_string(),
        AnyValue::StringOwned(s) => escape_path_name(s.as_str()),
        other => escape_path_name(&other.to_string()),
    }
}

/// Codifica em `%XX` os caracteres que não podem aparecer num nome de diretório Hive.
pub fn escape_path_name(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        let unsafe_char = c.is_control()
            || matches!(
                c,
                '"' | '#' | '%' | '\'' | '*' | '/' | ':' | '=' | '?' | '\\' | '{' | '[' | ']' | '^'
            );
        if unsafe_char {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                escaped.push_str(&format!("%{:02X}", byte));
            }
        } else {
            escaped.push(c);
        }
    }
    escaped
}

/// Destino das tabelas do modelo estrela.
#[derive(Debug, Clone)]
pub struct ParquetSink {
    root: PathBuf,
    compression: ParquetCompression,
}

impl ParquetSink {
    pub fn new(root: impl Into<PathBuf>, compression: ParquetCompression) -> Self {
        Self {
            root: root.into(),
            compression,
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(output.root.clone(), output.compression.to_parquet())
    }

    pub fn table_path(&self, spec: &TableSpec) -> PathBuf {
        self.root.join(spec.name)
    }

    /// Sobrescreve a tabela `spec.name` com o conteúdo de `dataframe`.
    ///
    /// # Errors
    ///
    /// Qualquer falha vira `PipelineError::Write`; a versão anterior da tabela
    /// permanece intacta.
    pub fn write_table(&self, spec: &TableSpec, dataframe: &DataFrame) -> Result<TableReport, PipelineError> {
        let timer = Instant::now();
        let staging = self.root.join(format!(".{}.staging", spec.name));

        let published = self
            .stage(spec, dataframe, &staging)
            .and_then(|report| self.publish(spec, &staging).map(|()| report));

        let report = match published {
            Ok(report) => report,
            Err(e) => {
                let _ = remove_path(&staging);
                return Err(PipelineError::write(spec.name, e));
            }
        };

        info!(
            table = spec.name,
            rows = report.rows,
            partitions = report.partitions,
            elapsed = ?timer.elapsed(),
            "tabela publicada"
        );
        Ok(report)
    }

    fn stage(&self, spec: &TableSpec, dataframe: &DataFrame, staging: &Path) -> Result<TableReport, PipelineError> {
        remove_path(staging)?;
        fs::create_dir_all(staging)?;

        let partitions = split_partitions(dataframe, spec.partition_by)?;

        let pb = ProgressBar::new(partitions.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| PipelineError::Engine(e.to_string()))?
                .progress_chars("#>-"),
        );
        pb.set_message(spec.name.to_string());

        for partition in &partitions {
            let dir = staging.join(&partition.path);
            fs::create_dir_all(&dir)?;
            let data_columns: Vec<&str> = partition
                .frame
                .get_column_names_str()
                .into_iter()
                .filter(|name| !spec.partition_by.iter().any(|key| key == name))
                .collect();
            let mut frame = partition.frame.select(data_columns)?;
            self.write_file(&dir.join(PART_FILE), &mut frame)?;
            debug!(table = spec.name, partition = %partition.path.display(), rows = frame.height(), "partição gravada");
            pb.inc(1);
        }
        pb.finish_and_clear();

        let report = TableReport {
            table: spec.name.to_string(),
            rows: dataframe.height(),
            partitions: partitions.len(),
            partition_by: spec.partition_by.iter().map(|c| c.to_string()).collect(),
            columns: dataframe
                .get_column_names_str()
                .into_iter()
                .map(str::to_string)
                .collect(),
        };

        let marker = File::create(staging.join(SUCCESS_MARKER))?;
        serde_json::to_writer_pretty(marker, &report)?;
        Ok(report)
    }

    fn write_file(&self, path: &Path, frame: &mut DataFrame) -> Result<(), PipelineError> {
        let file_out = File::create(path)?;

        let stats_options = StatisticsOptions {
            min_value: true,
            max_value: true,
            null_count: true,
            distinct_count: false,
        };

        ParquetWriter::new(file_out)
            .with_compression(self.compression)
            .with_statistics(stats_options)
            .finish(frame)?;
        Ok(())
    }

    /// Troca a tabela publicada pelo staging.
    ///
    /// A versão anterior é renomeada para `.<tabela>.previous` e só é apagada
    /// depois que o staging ocupa o seu lugar; se essa troca falhar, ela volta.
    fn publish(&self, spec: &TableSpec, staging: &Path) -> Result<(), PipelineError> {
        let target = self.table_path(spec);
        let backup = self.root.join(format!(".{}.previous", spec.name));

        remove_path(&backup)?;
        let had_previous = fs::symlink_metadata(&target).is_ok();
        if had_previous {
            fs::rename(&target, &backup)?;
        }

        if let Err(e) = fs::rename(staging, &target) {
            if had_previous {
                let _ = fs::rename(&backup, &target);
            }
            return Err(e.into());
        }

        if had_previous {
            if let Err(e) = remove_path(&backup) {
                warn!(table = spec.name, error = %e, "versão anterior não removida");
            }
        }
        Ok(())
    }
}

/// Remove um arquivo ou diretório; caminho inexistente não é erro.
fn remove_path(path: &Path) -> Result<(), PipelineError> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path)?,
        Ok(_) => fs::remove_file(path)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ARTISTS, SONGS};
    use polars::io::SerReader;
    use tempfile::tempdir;

    fn songs() -> DataFrame {
        df!(
            "song_id" => ["S1", "S2", "S3"],
            "title" => ["a", "b", "c"],
            "artist_id" => [Some("AR1"), Some("AR1"), None],
            "year" => [2004i64, 2004, 0],
            "duration" => [1.0, 2.0, 3.0]
        )
        .unwrap()
    }

    #[test]
    fn partition_paths_match_row_values() {
        let partitions = split_partitions(&songs(), SONGS.partition_by).unwrap();
        assert_eq!(partitions.len(), 2);

        for partition in &partitions {
            let year = partition.frame.column("year").unwrap().as_materialized_series().i64().unwrap().clone();
            let artist = partition.frame.column("artist_id").unwrap().as_materialized_series().str().unwrap().clone();
            let year0 = year.get(0).unwrap();
            assert!(year.into_iter().all(|y| y == Some(year0)));

            let expected = match artist.get(0) {
                Some(id) => format!("year={}/artist_id={}", year0, id),
                None => format!("year={}/artist_id={}", year0, HIVE_DEFAULT_PARTITION),
            };
            assert_eq!(partition.path, PathBuf::from(expected));
        }
    }

    #[test]
    fn unpartitioned_table_is_a_single_root_partition() {
        let partitions = split_partitions(&songs(), &[]).unwrap();
        assert_eq!(partitions.len(), 1);
        assert_eq!(partitions[0].path, PathBuf::new());
        assert_eq!(partitions[0].frame.height(), 3);
    }

    #[test]
    fn escapes_unsafe_characters() {
        assert_eq!(escape_path_name("AC/DC"), "AC%2FDC");
        assert_eq!(escape_path_name("a=b"), "a%3Db");
        assert_eq!(escape_path_name("Line Renaud"), "Line Renaud");
    }

    #[test]
    fn write_table_publishes_partitions_without_key_columns() {
        let dir = tempdir().unwrap();
        let sink = ParquetSink::new(dir.path(), ParquetCompression::Snappy);

        let report = sink.write_table(&SONGS, &songs()).unwrap();
        assert_eq!(report.rows, 3);
        assert_eq!(report.partitions, 2);

        let table = sink.table_path(&SONGS);
        assert!(table.join(SUCCESS_MARKER).is_file());
        assert!(!dir.path().join(".songs.staging").exists());

        let file = File::open(table.join("year=2004").join("artist_id=AR1").join(PART_FILE)).unwrap();
        let part = ParquetReader::new(file).finish().unwrap();
        assert_eq!(part.height(), 2);
        assert_eq!(part.get_column_names_str(), vec!["song_id", "title", "duration"]);
    }

    #[test]
    fn rewrite_replaces_previous_content() {
        let dir = tempdir().unwrap();
        let sink = ParquetSink::new(dir.path(), ParquetCompression::Uncompressed);

        sink.write_table(&SONGS, &songs()).unwrap();
        let smaller = songs().head(Some(1));
        sink.write_table(&SONGS, &smaller).unwrap();

        let table = sink.table_path(&SONGS);
        assert!(table.join("year=2004").join("artist_id=AR1").exists());
        assert!(!table.join("year=0").exists());

        let marker = File::open(table.join(SUCCESS_MARKER)).unwrap();
        let report: TableReport = serde_json::from_reader(marker).unwrap();
        assert_eq!(report.rows, 1);
    }

    #[test]
    fn empty_unpartitioned_table_still_publishes() {
        let dir = tempdir().unwrap();
        let sink = ParquetSink::new(dir.path(), ParquetCompression::Snappy);
        let empty = songs().head(Some(0));

        let report = sink.write_table(&ARTISTS, &empty).unwrap();
        assert_eq!(report.rows, 0);
        assert!(sink.table_path(&ARTISTS).join(PART_FILE).is_file());
    }

    #[test]
    fn failed_rewrite_keeps_previous_table() {
        let dir = tempdir().unwrap();
        let sink = ParquetSink::new(dir.path(), ParquetCompression::Snappy);
        sink.write_table(&SONGS, &songs()).unwrap();

        // sem a coluna de partição o staging falha depois da primeira escrita
        let broken = songs().drop("artist_id").unwrap();
        let err = sink.write_table(&SONGS, &broken).unwrap_err();
        assert!(matches!(err, PipelineError::Write { .. }));

        let table = sink.table_path(&SONGS);
        let marker = File::open(table.join(SUCCESS_MARKER)).unwrap();
        let report: TableReport = serde_json::from_reader(marker).unwrap();
        assert_eq!(report.rows, 3);
        assert!(table.join("year=2004").join("artist_id=AR1").join(PART_FILE).is_file());
        assert!(!dir.path().join(".songs.staging").exists());
        assert!(!dir.path().join(".songs.previous").exists());
    }

    #[test]
    fn publish_replaces_file_at_table_path() {
        let dir = tempdir().unwrap();
        let sink = ParquetSink::new(dir.path(), ParquetCompression::Snappy);
        fs::write(sink.table_path(&ARTISTS), b"stale").unwrap();

        sink.write_table(&ARTISTS, &songs()).unwrap();
        assert!(sink.table_path(&ARTISTS).join(PART_FILE).is_file());
        assert!(!dir.path().join(".artists.previous").exists());
    }
}
