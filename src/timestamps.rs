//! # Derivação Temporal
//!
//! O campo `ts` dos eventos é o instante em milissegundos desde a época Unix.
//! Este módulo converte `ts` em:
//! - `timestamp`: segundos inteiros (`ts // 1000`) armazenados como string;
//! - `start_time`: datetime UTC sem fuso, com precisão de microssegundos.
//!
//! Os componentes de calendário são expressões únicas, usadas tanto pela tabela
//! `time` quanto pela `songplays`.

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;

use crate::errors::PipelineError;

/// Instante de um evento já decomposto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTime {
    pub datetime: NaiveDateTime,
    /// Segundos inteiros desde a época, como string.
    pub timestamp: String,
}

/// Converte milissegundos desde a época em datetime UTC e segundos inteiros.
///
/// Usa divisão com piso (`div_euclid`), então instantes anteriores a 1970
/// mantêm o resto de milissegundos não negativo.
///
/// Retorna `None` se o instante estiver fora do intervalo representável.
pub fn epoch_millis_to_datetime(ms: i64) -> Option<EventTime> {
    let seconds = ms.div_euclid(1000);
    let micros = ms.rem_euclid(1000) * 1000;
    let datetime = DateTime::from_timestamp(seconds, (micros * 1000) as u32)?.naive_utc();

    Some(EventTime {
        datetime,
        timestamp: seconds.to_string(),
    })
}

/// Adiciona `timestamp` e `start_time` ao DataFrame a partir da coluna `ts`.
///
/// Cada valor de `ts` passa por [`epoch_millis_to_datetime`]; `ts` nulo gera nulos.
pub fn with_event_time(mut dataframe: DataFrame) -> Result<DataFrame, PipelineError> {
    let ts = dataframe.column("ts")?.as_materialized_series().i64()?.clone();

    let mut start_micros: Vec<Option<i64>> = Vec::with_capacity(ts.len());
    let mut timestamps: Vec<Option<String>> = Vec::with_capacity(ts.len());

    for value in ts.into_iter() {
        match value.and_then(epoch_millis_to_datetime) {
            Some(event) => {
                start_micros.push(Some(event.datetime.and_utc().timestamp_micros()));
                timestamps.push(Some(event.timestamp));
            }
            None => {
                start_micros.push(None);
                timestamps.push(None);
            }
        }
    }

    let start_time = Series::new("start_time".into(), start_micros)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;
    let timestamp = Series::new("timestamp".into(), timestamps);

    dataframe.with_column(timestamp)?;
    dataframe.with_column(start_time)?;
    Ok(dataframe)
}

/// Componente de calendário derivado de `start_time`.
///
/// Numeração: `Week` é a semana ISO; `Weekday` segue a ISO (1 = segunda ... 7 = domingo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarField {
    Hour,
    Day,
    Week,
    Month,
    Year,
    Weekday,
}

impl CalendarField {
    pub const ALL: [CalendarField; 6] = [
        CalendarField::Hour,
        CalendarField::Day,
        CalendarField::Week,
        CalendarField::Month,
        CalendarField::Year,
        CalendarField::Weekday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CalendarField::Hour => "hour",
            CalendarField::Day => "day",
            CalendarField::Week => "week",
            CalendarField::Month => "month",
            CalendarField::Year => "year",
            CalendarField::Weekday => "weekday",
        }
    }

    /// Expressão Int32 nomeada com [`CalendarField::name`].
    pub fn expr(self) -> Expr {
        let start = col("start_time").dt();
        let component = match self {
            CalendarField::Hour => start.hour(),
            CalendarField::Day => start.day(),
            CalendarField::Week => start.week(),
            CalendarField::Month => start.month(),
            CalendarField::Year => start.year(),
            CalendarField::Weekday => start.weekday(),
        };
        component.cast(DataType::Int32).alias(self.name())
    }
}

/// Todos os componentes de calendário, na ordem das colunas da tabela `time`.
pub fn calendar_exprs() -> Vec<Expr> {
    CalendarField::ALL.iter().map(|field| field.expr()).collect()
}
