//! Deduplicação das tabelas de dimensão.

use polars::prelude::*;
use tracing::warn;

use crate::errors::PipelineError;
use crate::models::DedupStrategy;
use crate::schema::TableSpec;

/// Remove linhas repetidas de uma dimensão preservando a ordem de chegada.
///
/// - `Key`: uma linha por chave de `spec`; vence a última ocorrência.
/// - `Row`: apenas linhas idênticas em todas as colunas são colapsadas.
pub fn deduplicate(
    dataframe: DataFrame,
    spec: &TableSpec,
    strategy: DedupStrategy,
) -> Result<DataFrame, PipelineError> {
    let distinct_rows = dataframe.unique_stable(None, UniqueKeepStrategy::First, None)?;

    match strategy {
        DedupStrategy::Row => Ok(distinct_rows),
        DedupStrategy::Key => {
            let key: Vec<String> = spec.key.iter().map(|c| c.to_string()).collect();
            let by_key = dataframe.unique_stable(Some(key.as_slice()), UniqueKeepStrategy::Last, None)?;

            let conflicting = distinct_rows.height().saturating_sub(by_key.height());
            if conflicting > 0 {
                warn!(
                    table = spec.name,
                    conflicting,
                    "registros com a mesma chave e colunas divergentes; mantido o último"
                );
            }
            Ok(by_key)
        }
    }
}
