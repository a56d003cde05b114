use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use fetch_xhs::client::ReqwestClient;
use fetch_xhs::crawler::Crawler;
use fetch_xhs::settings::Settings;
use fetch_xhs::sink::{DatasetSink, LogFailureReporter};
use fetch_xhs::spiders::notes::NotesSearchSpider;

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

async fn try_main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    // construct a subscriber that prints formatted traces to stdout
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fetch_xhs=debug,warn"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    // use that subscriber to process traces emitted after this point
    if settings.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }

    let http_client = Arc::new(ReqwestClient::new(settings.user_agent.as_deref())?);
    let sink = Arc::new(DatasetSink::new(settings.dataset.clone())?);
    let crawler = Crawler::new(
        settings.crawler_options()?,
        http_client,
        sink,
        Arc::new(LogFailureReporter),
    )?;
    let spider = Arc::new(NotesSearchSpider::new(settings.spider.clone()));

    let token = CancellationToken::new();
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("received ctrl-c, finishing in-flight requests");
            ctrl_c_token.cancel();
        }
    });

    let summary = crawler.run(spider, token).await;
    tracing::info!(?summary, "run summary");

    Ok(())
}
