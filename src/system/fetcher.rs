use super::navigation::{FetchOutcome, FetchRequest};
use crate::api_client::{level_url, LevelResponse};
use crate::config::config::ServerConfig;
use crate::error::ApiError;
use crate::system::row::Row;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Transport seam used by the navigation controller.
///
/// `submit` must not block: the outcome is delivered later and handed back
/// to `NavigationController::resolve`.
pub trait DataFetcher {
    fn submit(&mut self, request: FetchRequest);
}

impl<T: DataFetcher + ?Sized> DataFetcher for Box<T> {
    fn submit(&mut self, request: FetchRequest) {
        (**self).submit(request)
    }
}

/// Receiving end for outcomes produced by `HttpFetcher`.
pub struct FetchInbox {
    rx: UnboundedReceiver<FetchOutcome>,
}

impl FetchInbox {
    /// Next completed fetch, without waiting.
    pub fn try_next(&mut self) -> Option<FetchOutcome> {
        self.rx.try_recv().ok()
    }

    /// Drain everything that has completed so far.
    pub fn drain(&mut self) -> Vec<FetchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.try_next() {
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Fetches levels over HTTP on its own tokio runtime.
pub struct HttpFetcher {
    runtime: Runtime,
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    tx: UnboundedSender<FetchOutcome>,
}

impl HttpFetcher {
    pub fn new(server: &ServerConfig) -> anyhow::Result<(Self, FetchInbox)> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("level-fetch")
            .enable_all()
            .build()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(server.timeout_secs))
            .build()?;
        let (tx, rx) = unbounded_channel();

        Ok((
            Self {
                runtime,
                client,
                base_url: server.base_url.trim_end_matches('/').to_string(),
                token: server.token.clone(),
                tx,
            },
            FetchInbox { rx },
        ))
    }
}

impl DataFetcher for HttpFetcher {
    fn submit(&mut self, request: FetchRequest) {
        let client = self.client.clone();
        let url = level_url(&self.base_url, &request.frame.function_name);
        let token = self.token.clone();
        let tx = self.tx.clone();

        debug!(target: "fetch", "#{} GET {}", request.ticket, request.frame.full_path());
        self.runtime.spawn(async move {
            let result = fetch_level(
                &client,
                &url,
                request.frame.nested_path.as_deref(),
                token.as_deref(),
            )
            .await;
            if tx.send(FetchOutcome { request, result }).is_err() {
                warn!(target: "fetch", "fetch inbox closed, dropping outcome");
            }
        });
    }
}

async fn fetch_level(
    client: &reqwest::Client,
    url: &str,
    nested_path: Option<&str>,
    token: Option<&str>,
) -> Result<Vec<Row>, ApiError> {
    let mut builder = client.get(url);
    if let Some(path) = nested_path {
        builder = builder.query(&[("path", path)]);
    }
    if let Some(token) = token {
        builder = builder.bearer_auth(token);
    }

    let response = builder.send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::from_response(status.as_u16(), &body));
    }

    let level: LevelResponse = response.json().await?;
    Ok(level.data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::navigation::NavigationFrame;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Shared(Rc<RefCell<Vec<FetchRequest>>>);

    impl DataFetcher for Shared {
        fn submit(&mut self, request: FetchRequest) {
            self.0.borrow_mut().push(request);
        }
    }

    #[test]
    fn test_boxed_fetcher_forwards() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut boxed: Box<dyn DataFetcher> = Box::new(Shared(log.clone()));
        boxed.submit(FetchRequest {
            ticket: 7,
            frame: NavigationFrame::root("dbs"),
        });
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(log.borrow()[0].ticket, 7);
    }

    #[test]
    fn test_unreachable_server_reports_transport_error() {
        let server = ServerConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            token: None,
            timeout_secs: 2,
        };
        let (mut fetcher, mut inbox) = HttpFetcher::new(&server).unwrap();
        let request = FetchRequest {
            ticket: 1,
            frame: NavigationFrame::root("transactions"),
        };
        fetcher.submit(request.clone());

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let outcome = loop {
            if let Some(outcome) = inbox.try_next() {
                break outcome;
            }
            assert!(std::time::Instant::now() < deadline, "fetch never completed");
            std::thread::sleep(Duration::from_millis(20));
        };

        assert_eq!(outcome.request, request);
        assert!(matches!(outcome.result, Err(ApiError::Transport(_))));
    }
}
