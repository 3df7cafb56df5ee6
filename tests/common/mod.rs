/// Common test utilities and helpers for githubrepos tests
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Scratch directory holding a config file and state files
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.path("config.yml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let file_path = self.path(name);
        std::fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// The githubrepos binary with a clean GitHub environment
    pub fn command(&self) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_githubrepos"));
        command
            .env_remove("GITHUB_TOKEN")
            .env_remove("GITHUB_OWNER")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.temp_dir.path())
            .env("HOME", self.temp_dir.path());
        command
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command()
            .args(args)
            .output()
            .expect("Failed to execute githubrepos")
    }
}

/// JSON body for one listing page of `count` repositories starting at `start`
pub fn repo_page_json(start: i64, count: i64) -> Value {
    let repos: Vec<Value> = (start..start + count)
        .map(|i| json!({"id": i, "name": format!("repo-{:04}", i)}))
        .collect();
    Value::Array(repos)
}

/// Serve `owner`'s repositories split into pages of the given sizes
pub async fn mount_listing(server: &MockServer, owner: &str, page_sizes: &[i64]) {
    let route = format!("/orgs/{}/repos", owner);
    let mut start = 0;

    let mut pages = Vec::new();
    for (index, size) in page_sizes.iter().enumerate() {
        pages.push((index as u32 + 1, start, *size));
        start += size;
    }

    // Later pages are mounted first so the unnumbered first-page request
    // only matches the last, catch-all mock.
    for (page, start, size) in pages.iter().rev() {
        let mut response = ResponseTemplate::new(200).set_body_json(repo_page_json(*start, *size));
        if (*page as usize) < page_sizes.len() {
            response = response.insert_header(
                "link",
                format!(
                    "<{}{}?sort=full_name&per_page=100&page={}>; rel=\"next\"",
                    server.uri(),
                    route,
                    page + 1
                )
                .as_str(),
            );
        }

        let mock = Mock::given(method("GET")).and(path(route.as_str()));
        let mock = if *page == 1 {
            mock
        } else {
            mock.and(query_param("page", page.to_string()))
        };
        mock.respond_with(response).mount(server).await;
    }
}

/// Assertion helpers for test validation
#[allow(dead_code)]
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
