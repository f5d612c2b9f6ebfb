use std::{
    future::IntoFuture,
    io::{self, Write},
    pin::pin,
    process,
    sync::Arc,
};

use prerender::{
    application::{
        error::AppError, post_page::PostPageService, repos::PostsRepo,
        sitemap::SitemapService,
    },
    config,
    infra::{
        error::InfraError,
        firestore,
        http::{self, HttpState},
        telemetry,
    },
    presentation::views::render_post_page,
};
use time::OffsetDateTime;
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Sitemap(args) => run_sitemap(settings, args).await,
    }
}

fn posts_repo(settings: &config::Settings) -> Result<Arc<dyn PostsRepo>, AppError> {
    let repo: Arc<dyn PostsRepo> = firestore::initialize(&settings.store)?;
    Ok(repo)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let posts = posts_repo(&settings)?;
    let state = HttpState {
        posts: Arc::new(PostPageService::new(posts.clone())),
        sitemap: Arc::new(SitemapService::new(posts, settings.store.page_size.get())),
        settings: Arc::new(settings.http.clone()),
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "prerender::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let shutdown = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let shutdown = shutdown.clone();
            async move { shutdown.notified().await }
        })
        .into_future();
    let mut server = pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        () = shutdown_signal() => {}
    }

    info!(
        target = "prerender::serve",
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "shutdown requested, draining connections"
    );
    shutdown.notify_one();

    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!(
                target = "prerender::serve",
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "prerender::serve", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target = "prerender::serve", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    let id = args.id.trim();
    if id.is_empty() {
        return Err(AppError::validation("post identifier must not be blank"));
    }

    let service = PostPageService::new(posts_repo(&settings)?);
    let page = service
        .load(id, &args.origin, OffsetDateTime::now_utc())
        .await?;
    let html = render_post_page(&page).map_err(|err| AppError::unexpected(err.to_string()))?;

    info!(target = "prerender::render", post_id = id, "post rendered");
    write_stdout(&html)
}

async fn run_sitemap(settings: config::Settings, args: config::SitemapArgs) -> Result<(), AppError> {
    let service = SitemapService::new(posts_repo(&settings)?, settings.store.page_size.get());
    let xml = service
        .sitemap_xml(&args.origin, OffsetDateTime::now_utc())
        .await?;

    info!(target = "prerender::sitemap", origin = %args.origin, "sitemap rendered");
    write_stdout(&xml)
}

fn write_stdout(body: &str) -> Result<(), AppError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{body}")
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}
