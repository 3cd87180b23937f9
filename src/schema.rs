//! Nomes de colunas, tipos esperados das fontes brutas e o contrato de
//! particionamento de cada tabela de saída.

use polars::prelude::DataType;

/// Campos de um registro de catálogo e seus tipos após normalização.
pub fn song_fields() -> Vec<(&'static str, DataType)> {
    vec![
        ("song_id", DataType::String),
        ("title", DataType::String),
        ("artist_id", DataType::String),
        ("year", DataType::Int64),
        ("duration", DataType::Float64),
        ("artist_name", DataType::String),
        ("artist_location", DataType::String),
        ("artist_latitude", DataType::Float64),
        ("artist_longitude", DataType::Float64),
    ]
}

/// Campos de um evento de log e seus tipos após normalização.
///
/// `userId` chega como string na fonte (vazio para sessões deslogadas).
pub fn log_fields() -> Vec<(&'static str, DataType)> {
    vec![
        ("userId", DataType::String),
        ("firstName", DataType::String),
        ("lastName", DataType::String),
        ("gender", DataType::String),
        ("level", DataType::String),
        ("page", DataType::String),
        ("ts", DataType::Int64),
        ("song", DataType::String),
        ("sessionId", DataType::Int64),
        ("itemInSession", DataType::Int64),
        ("location", DataType::String),
        ("userAgent", DataType::String),
    ]
}

/// Descrição de uma tabela do modelo estrela.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub name: &'static str,
    /// Colunas únicas da tabela (usadas na deduplicação por chave).
    pub key: &'static [&'static str],
    pub partition_by: &'static [&'static str],
}

pub const SONGS: TableSpec = TableSpec {
    name: "songs",
    key: &["song_id"],
    partition_by: &["year", "artist_id"],
};

pub const ARTISTS: TableSpec = TableSpec {
    name: "artists",
    key: &["artist_id"],
    partition_by: &[],
};

pub const USERS: TableSpec = TableSpec {
    name: "users",
    key: &["user_id"],
    partition_by: &[],
};

pub const TIME: TableSpec = TableSpec {
    name: "time",
    key: &["start_time"],
    partition_by: &["year", "month"],
};

pub const SONGPLAYS: TableSpec = TableSpec {
    name: "songplays",
    key: &["songplay_id"],
    partition_by: &["year", "month"],
};
