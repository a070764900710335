use pairs_monitor::{
    config::MonitorConfig,
    pipeline::{CycleAnalytics, CycleReport, evaluate},
    session::Session,
};
use std::error::Error;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_logging();

    // WSS connections need a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = MonitorConfig::from_env()?;
    info!(
        x = %config.x,
        y = %config.y,
        timeframe = %config.granularity,
        window = config.window,
        z_threshold = config.z_threshold,
        feed = %config.feed.base_url,
        "starting pairs monitor"
    );

    let pipeline = config.pipeline();
    let mut session = Session::new(
        config.feed.clone(),
        config.buffer_capacity,
        [config.x.clone(), config.y.clone()],
    );
    session.start()?;

    let mut refresh = interval(config.refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last_progress = None;

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(error) = result {
                    warn!(%error, "failed to listen for Ctrl-C, stopping");
                }
                break;
            }
            _ = refresh.tick() => {
                let accepted = session.ingest();
                if accepted > 0 {
                    debug!(accepted, total = session.store().len(), "ingested ticks");
                }

                match evaluate(session.store(), &pipeline) {
                    Ok(CycleReport::Ready(cycle)) => {
                        last_progress = None;
                        log_cycle(&cycle);
                    }
                    Ok(report) => {
                        if last_progress.as_ref() != Some(&report) {
                            log_progress(&report);
                            last_progress = Some(report);
                        }
                    }
                    Err(error) => warn!(%error, "analytics cycle failed"),
                }
            }
        }
    }

    info!("shutting down");
    session.stop().await;

    let stats = session.feed().stats();
    info!(
        trades = stats.trades,
        ignored = stats.ignored,
        rejected = stats.rejected,
        reconnects = stats.reconnects,
        evicted = session.buffer().evicted(),
        stored = session.store().len(),
        "pairs monitor stopped"
    );

    Ok(())
}

fn log_progress(report: &CycleReport) {
    match report {
        CycleReport::WaitingForBars { x_bars, y_bars } => {
            info!(x_bars, y_bars, "waiting for bars on both instruments");
        }
        CycleReport::Collecting { have, need } => {
            info!(have, need, "collecting data");
        }
        CycleReport::Ready(_) => {}
    }
}

fn log_cycle(cycle: &CycleAnalytics) {
    let (adf_statistic, adf_p_value, stationary) = match &cycle.stationarity {
        Some(report) => (
            report.test_statistic,
            report.p_value,
            Some(report.is_stationary(0.05)),
        ),
        None => (f64::NAN, f64::NAN, None),
    };

    info!(
        bar = %cycle.last_bar,
        observations = cycle.observations,
        hedge_ratio = cycle.analytics.hedge_ratio,
        spread = cycle.latest_spread(),
        spread_mean = cycle.spread_rolling_mean,
        zscore = cycle.latest_zscore(),
        correlation = cycle.latest_correlation(),
        adf_statistic,
        adf_p_value,
        ?stationary,
        "cycle"
    );

    if let Some(alert) = &cycle.alert {
        warn!(
            zscore = alert.zscore,
            threshold = alert.threshold,
            upper = alert.is_upper(),
            "{alert}"
        );
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        // Filter messages based on the INFO level
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .compact()
        .init()
}
