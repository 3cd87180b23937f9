//! # Sparkify Star Schema ETL
//!
//! ## Visão Geral
//! Transforma duas fontes JSON append-only (catálogo de músicas e logs de uso)
//! em um modelo estrela gravado como Parquet particionado:
//! - dimensões `songs`, `artists`, `users`, `time`;
//! - fato `songplays`.
//!
//! ## Princípios de Engenharia
//! - **Fail-Fast**: qualquer falha aborta o pipeline corrente.
//! - **Sobrescrita Total**: cada execução substitui as tabelas anteriores.
//! - **Publicação Atômica**: tabelas são montadas em staging antes de serem publicadas.

pub mod catalog;
pub mod dedup;
pub mod errors;
mod impl_errors;
pub mod events;
pub mod models;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod songplays;
pub mod source;
pub mod timestamps;

pub use errors::PipelineError;
pub use models::Config;
pub use pipeline::{RunSummary, run};
