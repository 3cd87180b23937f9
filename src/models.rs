//! Metadata-Driven Configuration Models
//!
//! ## Visão Geral
//! Este módulo define as estruturas de configuração do pipeline ETL.
//! A configuração é resolvida uma única vez no início do processo e passada
//! explicitamente para cada pipeline; o núcleo nunca lê variáveis de ambiente.
//!
//! ## Boas Práticas
//! - **Encapsulamento**: Validações de integridade ocorrem no momento da carga.
//! - **Defaults**: Toda a seção `[transform]` é opcional.

use crate::errors::PipelineError;
use crate::source::Location;
use polars::prelude::ParquetCompression;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuração completa de uma execução.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

/// Localizadores das fontes brutas.
///
/// Cada localizador pode ser um arquivo, um diretório (varrido recursivamente
/// por `*.json`), um padrão glob (ex: `data/song_data/*/*/*/*.json`) ou uma URI
/// `s3://`/`s3a://`.
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub song_data: String,
    pub log_data: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Diretório raiz onde cada tabela é publicada.
    pub root: PathBuf,

    #[serde(default)]
    pub compression: Compression,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Snappy,
    Zstd,
    Uncompressed,
}

impl Compression {
    pub fn to_parquet(self) -> ParquetCompression {
        match self {
            Compression::Snappy => ParquetCompression::Snappy,
            Compression::Zstd => ParquetCompression::Zstd(None),
            Compression::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Como registros repetidos das dimensões são colapsados.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DedupStrategy {
    /// Uma linha por chave declarada; vence o último registro por ordem de chegada.
    #[default]
    Key,
    /// Igualdade de linha inteira. Chaves repetidas sobrevivem se outra coluna divergir.
    Row,
}

/// Origem do catálogo usado no join da tabela fato.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogMode {
    /// Relê a fonte de músicas no pipeline de eventos.
    #[default]
    Reread,
    /// Reaproveita o DataFrame já extraído pelo pipeline de catálogo.
    Reuse,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransformConfig {
    #[serde(default)]
    pub dedup: DedupStrategy,

    #[serde(default)]
    pub catalog: CatalogMode,

    /// Valor de `page` que representa uma reprodução.
    #[serde(default = "default_play_page")]
    pub play_page: String,

    /// Colapsa linhas repetidas de `start_time` na tabela `time`.
    #[serde(default)]
    pub distinct_time: bool,
}

fn default_play_page() -> String {
    "NextSong".to_string()
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            dedup: DedupStrategy::default(),
            catalog: CatalogMode::default(),
            play_page: default_play_page(),
            distinct_time: false,
        }
    }
}

impl Config {
    /// Monta uma configuração com transformações padrão.
    pub fn new(song_data: impl Into<String>, log_data: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            input: InputConfig {
                song_data: song_data.into(),
                log_data: log_data.into(),
            },
            output: OutputConfig {
                root: root.into(),
                compression: Compression::default(),
            },
            transform: TransformConfig::default(),
        }
    }

    /// Carrega e valida o ficheiro de configuração TOML.
    ///
    /// # Erros
    /// Retorna `PipelineError::Io` se o ficheiro não for encontrado ou
    /// `PipelineError::Config` se a estrutura for inválida.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;

        config.validate()?;
        Ok(config)
    }

    /// Validação pós-carga (Fail-Fast).
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, locator) in [
            ("input.song_data", &self.input.song_data),
            ("input.log_data", &self.input.log_data),
        ] {
            if locator.trim().is_empty() {
                return Err(PipelineError::Config(format!("'{}' vazio", name)));
            }
            if Location::of(locator) == Location::Unsupported {
                return Err(PipelineError::UnsupportedLocation {
                    locator: locator.clone(),
                });
            }
        }

        if self.output.root.as_os_str().is_empty() {
            return Err(PipelineError::Config("'output.root' vazio".to_string()));
        }
        // a publicação via staging + rename só existe em disco local
        if Location::of(&self.output.root.to_string_lossy()) != Location::Local {
            return Err(PipelineError::UnsupportedLocation {
                locator: self.output.root.display().to_string(),
            });
        }

        if self.transform.play_page.is_empty() {
            return Err(PipelineError::Config("'transform.play_page' vazio".to_string()));
        }
        Ok(())
    }
}
