use bookshelf_service::configuration::get_configuration;
use bookshelf_service::startup::Application;
use bookshelf_service::telemetry::{get_tracing_subscriber, init_tracing_subscriber};
use once_cell::sync::Lazy;
use std::path::PathBuf;
use tempfile::TempDir;

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // We cannot assign the output of `get_tracing_subscriber` to a variable based on the value of `TEST_LOG`
    // because the sink is part of the type returned by `get_tracing_subscriber`, therefore they are not the
    // same type. We could work around it, but this is the most straight-forward way of moving forward.
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Path of the JSON file backing the collection, used to assert
    /// persistence and to restart an application against the same state
    pub db_path: PathBuf,
    pub api_client: reqwest::Client,
    // Keeps the temp directory (and so the backing file) alive for the
    // duration of the test
    _db_dir: Option<TempDir>,
}

/// A test API client / test suite
impl TestApp {
    pub async fn list_books(&self) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/books", &self.address))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get_book(&self, id: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/books/{}", &self.address, id))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_book(&self, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/books", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn put_book(&self, id: &str, body: &serde_json::Value) -> reqwest::Response {
        self.api_client
            .put(&format!("{}/books/{}", &self.address, id))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_book(&self, id: &str) -> reqwest::Response {
        self.api_client
            .delete(&format!("{}/books/{}", &self.address, id))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Launches the server as a background task, backed by a fresh temporary
/// JSON file to ensure test isolation.
///
/// When a tokio runtime is shut down all tasks spawned on it are dropped.
/// tokio::test spins up a new runtime at the beginning of each test case and they shut down at the end of each test case.
/// Therefore no need to implement any clean up logic to avoid leaking resources between test runs
pub async fn spawn_app() -> TestApp {
    let db_dir = TempDir::new().expect("Failed to create a temp directory");
    let db_path = db_dir.path().join("db.json");
    spawn_app_inner(db_path, Some(db_dir)).await
}

/// Launches another server instance over an existing backing file,
/// simulating a process restart against the same persisted state.
pub async fn spawn_app_against(db_path: PathBuf) -> TestApp {
    spawn_app_inner(db_path, None).await
}

async fn spawn_app_inner(db_path: PathBuf, db_dir: Option<TempDir>) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    // Randomizes configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Uses a random OS port: port 0 is special-cased at the OS level:
        // trying to bind port 0 will trigger an OS scan for an available port which will then be bound to the application.
        c.application.port = 0;
        c.store.db_path = db_path.clone();
        c
    };

    let application = Application::build(configuration).expect("Failed to build application.");

    // Gets the port before spawning the application
    let application_port = application.port();

    // Launches the application as a background task
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_path,
        api_client: reqwest::Client::new(),
        _db_dir: db_dir,
    }
}
