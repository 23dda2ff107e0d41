//! Interface de linha de comando do execwatch baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (list, status,
//! confirm, cancel, watch) e flags globais (--config, --max-concurrency,
//! --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// execwatch: acompanha, aprova e cancela execuções remotas.
#[derive(Debug, Parser)]
#[command(name = "execwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./execwatch.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Máximo de chamadas remotas simultâneas em operações em lote.
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Critérios de listagem remota compartilhados por `list` e `watch`.
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Status a incluir; pode ser repetido.
    #[arg(long = "status")]
    pub statuses: Vec<String>,

    /// Chave da ferramenta, por exemplo `deeporigin.docking`.
    #[arg(long)]
    pub tool: Option<String>,

    /// Apenas execuções que possuem metadados.
    #[arg(long, default_value_t = false)]
    pub with_metadata: bool,

    #[arg(long, default_value_t = 1000)]
    pub page_size: u32,

    /// Para após este número de páginas.
    #[arg(long)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lista execuções remotas que atendem aos critérios.
    List {
        #[command(flatten)]
        criteria: ListArgs,

        /// Emite linhas em JSON em vez de tabela.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Sincroniza e mostra o status atual das execuções.
    Status {
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Aprova execuções em estado `Quoted`.
    Confirm {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Cancela execuções em `Quoted` ou `Running`.
    Cancel {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Acompanha execuções até que todas terminem.
    ///
    /// Sem ids, acompanha o resultado da listagem remota.
    Watch {
        ids: Vec<String>,

        #[command(flatten)]
        criteria: ListArgs,

        /// Segundos entre ciclos de polling (padrão: da configuração).
        #[arg(long)]
        interval: Option<u64>,
    },
}
