use crate::cli::FetchArgs;
use crate::config::{Config, PipelineConfig};
use crate::lectures::{Aggregator, LectureParams, LectureQuery, SystemClock, group_by_day};
use crate::lms::HttpSource;
use crate::scraper::TokioPause;
use crate::state::AppState;
use crate::utils::fmt_duration;
use crate::web::create_router;
use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Main application struct containing all necessary components
pub struct App {
    config: Config,
    pipeline: PipelineConfig,
    aggregator: Arc<Aggregator>,
}

impl App {
    /// Build the aggregation pipeline against the real upstream.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let pipeline = config.pipeline().context("Failed to load pipeline config")?;
        let source =
            HttpSource::new(pipeline.request_timeout).context("Failed to build HTTP client")?;

        let aggregator = Aggregator::new(
            &pipeline,
            Arc::new(source),
            Arc::new(TokioPause),
            Arc::new(SystemClock),
        );

        info!(
            upstream = pipeline.upstream_url.as_str(),
            concurrency_limit = pipeline.concurrency_limit,
            slice_delay = fmt_duration(pipeline.slice_delay),
            max_attempts = pipeline.retry.max_attempts(),
            request_timeout = fmt_duration(pipeline.request_timeout),
            cache_ttl = fmt_duration(pipeline.cache_ttl),
            "Lecture pipeline configured"
        );

        Ok(App {
            config,
            pipeline,
            aggregator: Arc::new(aggregator),
        })
    }

    /// Serve the HTTP API until a shutdown signal arrives.
    pub async fn serve(self) -> ExitCode {
        let cancel = CancellationToken::new();
        let sweeper = self.aggregator.cache().spawn_sweeper(cancel.clone());

        let state = AppState::new(self.aggregator.clone(), self.pipeline.limits);
        let router = create_router(state);
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));

        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(address = %addr, error = ?e, "Failed to bind web server");
                cancel.cancel();
                return ExitCode::FAILURE;
            }
        };
        info!(address = %addr, "Web server listening");

        let server = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(async move { cancel.cancelled().await })
                    .await
            }
        });

        shutdown_signal(cancel.clone()).await;
        cancel.cancel();

        let timeout = self.config.shutdown_timeout();
        let exit = match tokio::time::timeout(timeout, server).await {
            Ok(Ok(Ok(()))) => {
                info!("Web server stopped");
                ExitCode::SUCCESS
            }
            Ok(Ok(Err(e))) => {
                error!(error = ?e, "Web server failed");
                ExitCode::FAILURE
            }
            Ok(Err(e)) => {
                error!(error = ?e, "Web server task panicked");
                ExitCode::FAILURE
            }
            Err(_) => {
                warn!(
                    timeout = fmt_duration(timeout),
                    "Graceful shutdown timed out, abandoning in-flight requests"
                );
                ExitCode::FAILURE
            }
        };

        if let Err(e) = sweeper.await {
            warn!(error = ?e, "Cache sweeper task failed");
        }
        exit
    }

    /// Run one query and print the records to stdout as JSON.
    pub async fn fetch(self, args: FetchArgs) -> Result<(), anyhow::Error> {
        let params = LectureParams {
            date: Some(args.date),
            limit: args.limit,
            batch: args.batch,
            branch: args.branch,
        };
        let query = LectureQuery::from_params(&params, self.pipeline.limits)?;
        let response = self.aggregator.handle(&query).await;

        info!(
            cache = response.cache_status.as_str(),
            count = response.count,
            failed_targets = response.failed_targets,
            duration = fmt_duration(response.duration),
            "Lecture query complete"
        );

        let output = if args.by_day {
            serde_json::to_string_pretty(&group_by_day(&query, response.records))?
        } else {
            serde_json::to_string_pretty(&response.records)?
        };
        println!("{output}");
        Ok(())
    }
}

/// Resolve on Ctrl-C, SIGTERM, or cancellation from elsewhere.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = ?e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = ?e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
        _ = cancel.cancelled() => {}
    }
}
