//! Pi Lottery Service
//!
//! Opens one drawing period per configured lottery, logs prize previews
//! and rolls periods over when their draw time passes.

use anyhow::{anyhow, Context};
use chrono::Utc;
use pi_lottery::display::{abbreviate, format_pi, time_remaining};
use pi_lottery::{AppConfig, AppState};
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("pi_lottery={}", config.log_level).into());

    if config.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(|e| anyhow!(e))
        .context("Configuration error")?;

    init_tracing(&config);

    info!("Pi Lottery service starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!(
        "Pi sandbox: {}, ad watch: {}s, tick: {}s",
        config.pi.sandbox, config.ads.watch_seconds, config.tick_seconds
    );
    if !config.features.realtime {
        warn!("Realtime notifications disabled");
    }

    let state = AppState::new(config);
    let service = state.lottery_service.clone();

    let instances = service
        .open_all(Utc::now())
        .await
        .context("Failed to open lottery instances")?;

    for instance in &instances {
        let lottery_type = state.repo.lottery_type(&instance.lottery_type_id)?;
        info!(
            "✓ {} open until {}",
            lottery_type.name, instance.scheduled_draw_time
        );

        // Preview what the pool would look like at each bracket edge
        for participants in [50u64, 200, 1_000] {
            let preview = service
                .preview_with_additional(&lottery_type.id, participants)
                .await?;
            let tiers: Vec<String> = preview
                .tiers
                .iter()
                .map(|t| format!("#{} {}", t.rank, format_pi(t.amount, 3)))
                .collect();
            info!(
                "  {} entries → pool {} π: {}",
                participants,
                abbreviate(preview.total_pool),
                tiers.join(", ")
            );
        }
    }

    info!("Press Ctrl+C to shutdown gracefully");

    let mut ticker = tokio::time::interval(state.config.tick_interval());
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, shutting down gracefully...");
                break;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                match service.roll_over_due(now).await {
                    Ok(opened) if !opened.is_empty() => {
                        info!("Rolled over {} lottery instance(s)", opened.len());
                    }
                    Ok(_) => {}
                    Err(e) => error!("Failed to roll over instances: {}", e),
                }
                service.expire_ad_sessions(now).await;

                for lottery_type in state.repo.lottery_types() {
                    if let Ok(Some(instance)) = state.repo.current_instance(&lottery_type.id).await {
                        info!(
                            "{}: {} participants, draw in {}",
                            lottery_type.id,
                            instance.participants(),
                            time_remaining(instance.scheduled_draw_time, now)
                        );
                    }
                }
            }
        }
    }

    info!("Pi Lottery service shutdown complete");
    Ok(())
}
