//! # Definição de Erros do Pipeline
//!
//! Este módulo centraliza as falhas possíveis durante a extração, transformação
//! e escrita das tabelas do modelo estrela.
//!
//! # Error Handling Strategy
//! - **Tipagem:** Enums para tratamento exaustivo.
//! - **Fatalidade:** Toda falha aborta o pipeline corrente; não existe retry.
//! - **Extensibilidade:** Marcado como `non_exhaustive` para permitir evolução sem quebra de contrato.

use thiserror::Error;

/// Enumeração central de falhas do pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// O localizador configurado não corresponde a nenhum arquivo (ou a nenhum registro).
    #[error("[Source] nenhum registro encontrado em '{locator}'")]
    SourceNotFound { locator: String },

    /// Esquema de object storage sem backend habilitado (gs://, az://, ...).
    #[error("[Source] localizador não suportado: '{locator}'")]
    UnsupportedLocation { locator: String },

    /// Padrão glob inválido.
    #[error("[Source] padrão inválido: {0}")]
    Pattern(String),

    /// Falhas no sistema de arquivos (permissão, disco cheio, arquivo inexistente).
    #[error("[I/O] {0}")]
    Io(#[from] std::io::Error),

    #[error("[JSON] {0}")]
    Json(#[from] serde_json::Error),

    /// Erros originados na engine.
    /// Armazenados como `String` para reduzir acoplamento direto.
    #[error("[Engine] {0}")]
    Engine(String),

    /// Inconsistência de colunas ou tipos nos dados.
    #[error("[Schema] {0}")]
    Schema(String),

    /// Falha ao materializar uma tabela de saída.
    #[error("[Write] tabela '{table}': {message}")]
    Write { table: String, message: String },

    /// Configuração ausente ou inválida.
    #[error("[Config] {0}")]
    Config(String),
}

impl PipelineError {
    /// Reclassifica qualquer erro como falha de escrita da tabela informada.
    pub fn write(table: &str, err: impl std::fmt::Display) -> Self {
        PipelineError::Write {
            table: table.to_string(),
            message: err.to_string(),
        }
    }
}
