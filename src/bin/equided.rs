use std::sync::Arc;

use arrrg::CommandLine;
use arrrg_derive::CommandLine;
use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use equide::{
    DataStoreError, HorseStore, InMemoryHorseStore, ParticipationRecord, PedigreeRecord,
    PgHorseStore, PgStoreOptions, Race, create_genealogy_router, create_horse_router,
    create_stats_router, logging,
};

#[derive(CommandLine, Default, PartialEq, Eq)]
struct Args {
    #[arrrg(optional, "PostgreSQL database URL (falls back to $DATABASE_URL)")]
    database_url: Option<String>,
    #[arrrg(optional, "Host to bind the HTTP server")]
    host: Option<String>,
    #[arrrg(optional, "Port to bind the HTTP server")]
    port: Option<u16>,
    #[arrrg(optional, "Maximum pooled database connections")]
    max_connections: Option<u32>,
    #[arrrg(flag, "Serve a small built-in data set instead of PostgreSQL")]
    in_memory: bool,
    #[arrrg(flag, "Enable verbose logging")]
    verbose: bool,
}

const NO_DATABASE: &str =
    "no database configured: pass --database-url, set DATABASE_URL, or use --in-memory";

const HELP_TEXT: &str = r#"equided - equide daemon

USAGE:
    equided [OPTIONS]

OPTIONS:
    --database-url <URL>      PostgreSQL database URL [default: $DATABASE_URL]
    --host <HOST>             Host to bind the HTTP server [default: 127.0.0.1]
    --port <PORT>             Port to bind the HTTP server [default: 8080]
    --max-connections <N>     Maximum pooled database connections [default: 10]
    --in-memory               Serve a small built-in data set instead of PostgreSQL
    --verbose                 Enable verbose logging

DESCRIPTION:
    Serves trotter pedigrees and race statistics under /api/v1/

    The server supports graceful shutdown via Ctrl+C.

API ENDPOINTS:
    GET /api/v1/genealogy/{name}?depth=N&id=N&mode=lenient|age-window&breed=B
    GET /api/v1/horse/{id}
    GET /api/v1/stats/{name}
    GET /api/v1/availability/{name}"#;

enum Backend {
    Postgres(String),
    InMemory,
}

struct ServerConfig {
    backend: Backend,
    host: String,
    port: u16,
    options: PgStoreOptions,
    verbose: bool,
}

impl ServerConfig {
    fn from_args(args: Args) -> Result<Self, String> {
        let backend = if args.in_memory {
            Backend::InMemory
        } else {
            match args
                .database_url
                .or_else(|| std::env::var("DATABASE_URL").ok())
            {
                Some(url) if !url.trim().is_empty() => Backend::Postgres(url),
                _ => {
                    return Err(NO_DATABASE.to_string());
                }
            }
        };
        let mut options = PgStoreOptions::default();
        if let Some(max_connections) = args.max_connections {
            options.max_connections = max_connections;
        }
        Ok(Self {
            backend,
            host: args.host.unwrap_or_else(|| "127.0.0.1".to_string()),
            port: args.port.unwrap_or(8080),
            options,
            verbose: args.verbose,
        })
    }

    fn backend_label(&self) -> &'static str {
        match self.backend {
            Backend::Postgres(_) => "postgres",
            Backend::InMemory => "in-memory",
        }
    }
}

fn demo_store() -> Result<InMemoryHorseStore, DataStoreError> {
    let store = InMemoryHorseStore::new();
    let horses = [
        (1, "READY CASH", "M", 2005, "INDY DE VIVE", "KIDEA"),
        (2, "BOLD EAGLE", "M", 2011, "READY CASH", "FLOWER OF BLOOD"),
        (3, "FLOWER OF BLOOD", "F", 2004, "LOVE YOU", "ETOILE DE BLOOD"),
        (4, "FACE TIME BOURBON", "M", 2015, "READY CASH", "VIRGINIA DE BOURBON"),
    ];
    for (id, name, sex, year, father, mother) in horses {
        store.insert_pedigree(PedigreeRecord {
            id,
            name: name.to_string(),
            sex: Some(sex.to_string()),
            color: Some("BAI".to_string()),
            birth_year: Some(year),
            father: Some(father.to_string()),
            mother: Some(mother.to_string()),
            death_date: None,
            breeder: None,
            reference_link: None,
        })?;
    }
    store.insert_race(Race {
        id: 1,
        label: Some("PRIX D'AMERIQUE".to_string()),
        distance: Some(2700),
        prizes: [Some(450000), Some(250000), Some(140000), Some(80000), Some(50000)],
    })?;
    store.insert_participation(ParticipationRecord {
        participation_id: 1,
        race_id: 1,
        name: "FACE TIME BOURBON".to_string(),
        sex: Some("M".to_string()),
        breed: Some("TROTTEUR FRANCAIS".to_string()),
        coat: Some("BAI".to_string()),
        race_count: Some(30),
        father: Some("READY CASH".to_string()),
        mother: Some("VIRGINIA DE BOURBON".to_string()),
        place: Some(1),
        finish_time: Some("3m 15s".to_string()),
    })?;
    store.insert_participation(ParticipationRecord {
        participation_id: 2,
        race_id: 1,
        name: "VIRGINIA DE BOURBON".to_string(),
        sex: Some("F".to_string()),
        breed: Some("TROTTEUR FRANCAIS".to_string()),
        coat: Some("BAI".to_string()),
        race_count: Some(12),
        father: Some("ROCKLYN".to_string()),
        mother: None,
        place: None,
        finish_time: Some("0m 0s".to_string()),
    })?;
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = Args::from_command_line("USAGE: equided [OPTIONS]");

    if !free.is_empty() && free[0] == "help" {
        println!("{}", HELP_TEXT);
        return Ok(());
    }

    let config = ServerConfig::from_args(args).map_err(|e| {
        eprintln!("Error: {}", e);
        e
    })?;
    logging::init_logging(config.verbose);

    let store: Arc<dyn HorseStore> = match &config.backend {
        Backend::Postgres(url) => {
            info!(max_connections = config.options.max_connections, "connecting to PostgreSQL");
            Arc::new(PgHorseStore::connect(url, &config.options).await?)
        }
        Backend::InMemory => {
            warn!("serving the built-in demo data set");
            Arc::new(demo_store()?)
        }
    };

    let app = Router::new()
        .nest("/api/v1", create_genealogy_router(store.clone()))
        .nest("/api/v1", create_stats_router(store.clone()))
        .nest("/api/v1", create_horse_router(store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    info!(%addr, backend = config.backend_label(), "equided listening");
    println!("Server listening on: http://{}", addr);
    println!("Use Ctrl+C for graceful shutdown");

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        () = shutdown_signal => {
            info!("shutdown signal received, stopping server");
        }
    }

    Ok(())
}
