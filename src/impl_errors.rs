//! Conversões de erros externos para `PipelineError`.
//!
//! Este módulo existe exclusivamente para desacoplar:
//! - definição de erros (enums, em `errors`)
//! - classificação dos erros da engine e das bibliotecas auxiliares

use polars::prelude::PolarsError;

use crate::errors::PipelineError;

/* ========================================================================== */
/* Polars                                                                     */
/* ========================================================================== */

impl From<PolarsError> for PipelineError {
    fn from(err: PolarsError) -> Self {
        match err {
            PolarsError::ColumnNotFound(msg)
            | PolarsError::SchemaMismatch(msg)
            | PolarsError::SchemaFieldNotFound(msg)
            | PolarsError::InvalidOperation(msg) => PipelineError::Schema(msg.to_string()),
            PolarsError::IO { error, .. } => match std::sync::Arc::try_unwrap(error) {
                Ok(io) => PipelineError::Io(io),
                Err(shared) => PipelineError::Engine(shared.to_string()),
            },
            other => PipelineError::Engine(other.to_string()),
        }
    }
}

/* ========================================================================== */
/* Descoberta de arquivos                                                     */
/* ========================================================================== */

impl From<glob::PatternError> for PipelineError {
    fn from(err: glob::PatternError) -> Self {
        PipelineError::Pattern(err.to_string())
    }
}

impl From<glob::GlobError> for PipelineError {
    fn from(err: glob::GlobError) -> Self {
        PipelineError::Io(err.into_error())
    }
}

impl From<walkdir::Error> for PipelineError {
    fn from(err: walkdir::Error) -> Self {
        let message = err.to_string();
        match err.into_io_error() {
            Some(io) => PipelineError::Io(io),
            None => PipelineError::Engine(message),
        }
    }
}

/* ========================================================================== */
/* Configuração                                                               */
/* ========================================================================== */

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(format!("Erro no TOML: {}", err))
    }
}
