//! # Sparkify ETL
//!
//! Ponto de entrada: resolve a configuração uma única vez e executa os pipelines
//! de catálogo e de eventos.
//!
//! Sem `--config`, as três flags `--song-data`, `--log-data` e `--output` bastam;
//! faltando alguma, `sparkify.toml` é carregado e as flags presentes o sobrescrevem.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use sparkify_etl::{Config, PipelineError, pipeline};

const DEFAULT_CONFIG: &str = "sparkify.toml";

#[derive(Debug, Parser)]
#[command(name = "sparkify-etl", about = "Gera o modelo estrela Sparkify em Parquet")]
struct Cli {
    /// Arquivo TOML de configuração (padrão: `sparkify.toml`).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sobrescreve `input.song_data`.
    #[arg(long)]
    song_data: Option<String>,

    /// Sobrescreve `input.log_data`.
    #[arg(long)]
    log_data: Option<String>,

    /// Sobrescreve `output.root`.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Imprime o resumo da execução em JSON.
    #[arg(long)]
    summary: bool,
}

/// Monta a configuração a partir do arquivo e das flags de linha de comando.
fn resolve_config(cli: &Cli) -> Result<Config, PipelineError> {
    let mut config = match (&cli.config, &cli.song_data, &cli.log_data, &cli.output) {
        (Some(path), ..) => load(path)?,
        (None, Some(song_data), Some(log_data), Some(output)) => {
            Config::new(song_data.as_str(), log_data.as_str(), output.as_path())
        }
        (None, ..) => load(Path::new(DEFAULT_CONFIG))?,
    };

    if let Some(song_data) = &cli.song_data {
        config.input.song_data = song_data.clone();
    }
    if let Some(log_data) = &cli.log_data {
        config.input.log_data = log_data.clone();
    }
    if let Some(output) = &cli.output {
        config.output.root = output.clone();
    }

    config.validate()?;
    Ok(config)
}

fn load(path: &Path) -> Result<Config, PipelineError> {
    Config::load_from_file(path)
        .map_err(|e| PipelineError::Config(format!("'{}': {}", path.display(), e)))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            error!("Erro na carga de configuração: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("--- INICIANDO ETL PIPELINE ---");

    match pipeline::run(&config) {
        Ok(summary) => {
            if cli.summary {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("Falha ao serializar resumo: {}", e),
                }
            }
            info!("Fim da extração e conversão de dados");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Falha no pipeline: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn overrides_alone_need_no_config_file() {
        let cli = Cli::try_parse_from([
            "sparkify-etl",
            "--song-data",
            "data/song_data",
            "--log-data",
            "data/log_data",
            "--output",
            "out",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.input.song_data, "data/song_data");
        assert_eq!(config.input.log_data, "data/log_data");
        assert_eq!(config.output.root, PathBuf::from("out"));
    }

    #[test]
    fn flags_override_explicit_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("etl.toml");
        fs::write(
            &path,
            "[input]\nsong_data = \"a\"\nlog_data = \"b\"\n[output]\nroot = \"out\"\n[transform]\ndedup = \"row\"\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "sparkify-etl",
            "--config",
            path.to_str().unwrap(),
            "--log-data",
            "logs",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.input.song_data, "a");
        assert_eq!(config.input.log_data, "logs");
        assert_eq!(config.transform.dedup, sparkify_etl::models::DedupStrategy::Row);
    }

    #[test]
    fn missing_explicit_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cli = Cli::try_parse_from(["sparkify-etl", "--config", path.to_str().unwrap()]).unwrap();
        assert!(matches!(resolve_config(&cli), Err(PipelineError::Config(_))));
    }
}
