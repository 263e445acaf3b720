use actix_cors::Cors;
use actix_web::{App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solartrust::app::{self, AppServices, AuthSettings, Collaborators};
use solartrust::config::{Config, PaymentEngineMode, ProcessorMode, StoreMode};
use solartrust::core::SystemClock;
use solartrust::middleware::{ErrorLogger, RateLimiter, RequestId};
use solartrust::modules::gateways::{
    HttpNotificationGateway, HttpPaymentProcessor, HttpQuoteGateway, HttpUserCreditGateway,
    MockPaymentProcessor, PaymentProcessor,
};
use solartrust::modules::installations::{OtpPolicy, RandomOtpGenerator};
use solartrust::modules::payments::RemotePaymentEngine;
use solartrust::modules::projects::{InMemoryProjectStore, MySqlProjectStore, ProjectStore};

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("solartrust={},actix_web=info", config.app.log_level).into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.app.log_format.eq_ignore_ascii_case("json") {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn ProjectStore>> {
    match config.app.store_mode {
        StoreMode::Memory => {
            tracing::warn!("Using the in-memory project store; data is lost on restart");
            Ok(Arc::new(InMemoryProjectStore::new()))
        }
        StoreMode::MySql => {
            let pool = config
                .database
                .create_pool()
                .await
                .context("Failed to create database pool")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;

            tracing::info!(
                max_connections = config.database.max_connections,
                "Database pool initialized"
            );

            Ok(Arc::new(MySqlProjectStore::new(pool)))
        }
    }
}

fn build_processor(config: &Config) -> anyhow::Result<Arc<dyn PaymentProcessor>> {
    match (config.payment.processor_mode, &config.payment.processor_url) {
        (ProcessorMode::Mock, _) => {
            tracing::warn!("Using the mock payment processor; every charge is approved");
            Ok(Arc::new(MockPaymentProcessor))
        }
        (ProcessorMode::Http, Some(url)) => Ok(Arc::new(HttpPaymentProcessor::new(
            url.clone(),
            config.gateways.timeout,
        )?)),
        (ProcessorMode::Http, None) => anyhow::bail!("PAYMENT_PROCESSOR_URL not set"),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    init_tracing(&config);

    tracing::info!(
        env = %config.app.env,
        bind = %config.server.bind_address(),
        store = ?config.app.store_mode,
        payment_engine = ?config.payment.engine_mode,
        "Starting SolarTrust orchestrator"
    );

    let timeout = config.gateways.timeout;
    let deps = Collaborators {
        store: build_store(&config).await?,
        quotes: Arc::new(HttpQuoteGateway::new(
            config.gateways.quote_service_url.clone(),
            timeout,
        )?),
        users: Arc::new(HttpUserCreditGateway::new(
            config.gateways.user_service_url.clone(),
            timeout,
        )?),
        processor: build_processor(&config)?,
        notifier: Arc::new(HttpNotificationGateway::new(
            config.gateways.notification_service_url.clone(),
            timeout,
        )?),
        otp: Arc::new(RandomOtpGenerator),
        clock: Arc::new(SystemClock),
        otp_policy: OtpPolicy {
            ttl: chrono::Duration::minutes(config.otp.ttl_minutes),
            max_attempts: config.otp.max_attempts,
        },
        currency: config.payment.currency.clone(),
    };

    let services = match (config.payment.engine_mode, &config.payment.service_url) {
        (PaymentEngineMode::Remote, Some(url)) => {
            tracing::info!(url = %url, "Payment operations are delegated to the payment service");
            let engine = RemotePaymentEngine::new(
                url.clone(),
                config.security.identity_secret.as_bytes().to_vec(),
                timeout,
            )?;
            AppServices::with_payment_engine(deps, Arc::new(engine))
        }
        _ => AppServices::build(deps),
    };

    let auth = AuthSettings {
        identity_secret: config.security.identity_secret.as_bytes().to_vec(),
        internal_api_key_hash: config.security.internal_api_key_hash.clone(),
    };
    let rate_limit = config.security.rate_limit_per_minute;
    let is_production = config.is_production();

    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        let cors = if is_production {
            Cors::default()
        } else {
            Cors::permissive()
        };

        App::new()
            .wrap(ErrorLogger)
            .wrap(RateLimiter::new(rate_limit))
            .wrap(cors)
            .wrap(RequestId)
            .wrap(TracingLogger::default())
            .configure(|cfg| app::configure(cfg, &services, &auth))
    })
    .workers(config.server.workers)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await?;
    Ok(())
}
