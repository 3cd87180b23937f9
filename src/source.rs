//! # Leitura das Fontes Brutas
//!
//! Resolve um localizador (arquivo, diretório ou glob) para a lista de arquivos
//! JSON line-delimited e carrega todos eles em um único DataFrame do Polars.
//!
//! Localizadores `s3://` e `s3a://` (inclusive com glob) são lidos pelo scanner
//! NDJSON do Polars; credenciais e região vêm da cadeia padrão da AWS
//! (variáveis de ambiente, perfil, metadata da instância).
//!
//! Campos obrigatórios ausentes não abortam a execução: viram colunas nulas
//! tipadas, de modo que o esquema de saída é estável entre snapshots.

use polars::io::SerReader;
use polars::prelude::*;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::PipelineError;

const GLOB_CHARS: [char; 3] = ['*', '?', '['];

/// Esquemas lidos via object storage.
const OBJECT_STORE_SCHEMES: [&str; 2] = ["s3://", "s3a://"];

/// Esquemas reconhecidos, mas sem backend habilitado nesta build.
const UNSUPPORTED_SCHEMES: [&str; 5] = ["s3n://", "gs://", "gcs://", "az://", "abfs://"];

/// Onde um localizador aponta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Local,
    ObjectStore,
    Unsupported,
}

impl Location {
    pub fn of(locator: &str) -> Self {
        let lower = locator.trim_start().to_ascii_lowercase();
        if OBJECT_STORE_SCHEMES.iter().any(|s| lower.starts_with(s)) {
            Location::ObjectStore
        } else if UNSUPPORTED_SCHEMES.iter().any(|s| lower.starts_with(s)) || lower.contains("://") {
            Location::Unsupported
        } else {
            Location::Local
        }
    }
}

/// Lista os arquivos correspondentes a um localizador, em ordem determinística.
///
/// # Errors
///
/// `PipelineError::SourceNotFound` se nenhum arquivo corresponder.
pub fn resolve_locator(locator: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let mut files = Vec::new();

    if locator.contains(GLOB_CHARS) {
        for entry in glob::glob(locator)? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
    } else {
        let path = Path::new(locator);
        if path.is_file() {
            files.push(path.to_path_buf());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && is_json(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        }
    }

    if files.is_empty() {
        return Err(PipelineError::SourceNotFound {
            locator: locator.to_string(),
        });
    }

    files.sort();
    debug!(locator, files = files.len(), "fonte resolvida");
    Ok(files)
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Lê todos os registros JSON do localizador em um DataFrame.
///
/// Os arquivos são concatenados antes do parsing para que a inferência de
/// tipos enxergue todos os registros de uma vez.
pub fn read_json_records(locator: &str) -> Result<DataFrame, PipelineError> {
    match Location::of(locator) {
        Location::Local => read_local(locator),
        Location::ObjectStore => read_object_store(locator),
        Location::Unsupported => Err(PipelineError::UnsupportedLocation {
            locator: locator.to_string(),
        }),
    }
}

fn read_object_store(locator: &str) -> Result<DataFrame, PipelineError> {
    // s3a:// é o alias do Hadoop; o object_store só conhece s3://
    let url = match locator.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("s3a://") => format!("s3://{}", &locator[6..]),
        _ => locator.to_string(),
    };
    debug!(locator, url = %url, "lendo fonte remota");

    let dataframe = LazyJsonLineReader::new(url.as_str())
        .with_infer_schema_length(None)
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| match e {
            PolarsError::IO { .. } => PipelineError::SourceNotFound {
                locator: locator.to_string(),
            },
            other => PipelineError::Engine(format!("Falha na leitura de '{}': {}", locator, other)),
        })?;

    if dataframe.height() == 0 {
        return Err(PipelineError::SourceNotFound {
            locator: locator.to_string(),
        });
    }
    Ok(dataframe)
}

fn read_local(locator: &str) -> Result<DataFrame, PipelineError> {
    let files = resolve_locator(locator)?;

    let mut buffer: Vec<u8> = Vec::new();
    for file in &files {
        let bytes = fs::read(file)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        buffer.extend_from_slice(&bytes);
        if !buffer.ends_with(b"\n") {
            buffer.push(b'\n');
        }
    }

    if buffer.is_empty() {
        return Err(PipelineError::SourceNotFound {
            locator: locator.to_string(),
        });
    }

    let dataframe = JsonReader::new(Cursor::new(buffer))
        .with_json_format(JsonFormat::JsonLines)
        // None = inferência sobre todos os registros
        .infer_schema_len(None)
        .finish()
        .map_err(|e| PipelineError::Engine(format!("Falha no parsing JSON de '{}': {}", locator, e)))?;

    if dataframe.height() == 0 {
        return Err(PipelineError::SourceNotFound {
            locator: locator.to_string(),
        });
    }

    Ok(dataframe)
}

/// Projeta o DataFrame bruto nos campos declarados, na ordem declarada.
///
/// Colunas presentes são convertidas (cast não estrito) para o tipo esperado;
/// colunas ausentes são criadas inteiramente nulas.
pub fn normalize(dataframe: DataFrame, fields: &[(&str, DataType)]) -> Result<DataFrame, PipelineError> {
    let exprs: Vec<Expr> = fields
        .iter()
        .map(|(name, dtype)| {
            if dataframe.column(name).is_ok() {
                col(*name).cast(dtype.clone())
            } else {
                lit(NULL).cast(dtype.clone()).alias(*name)
            }
        })
        .collect();

    Ok(dataframe.lazy().select(exprs).collect()?)
}
