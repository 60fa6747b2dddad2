//! Scripted borg and recording pusher for unit tests

use async_trait::async_trait;
use metrics::{MetricFamily, MetricsError, MetricsPusher, MetricsResult};
use runner::CheckRunner;
use shared::{RepositoryTarget, ToolError};
use std::collections::HashMap;
use std::sync::Mutex;

pub const INFO_WITH_CACHE: &str = r#"{
    "cache": {
        "path": "/root/.cache/borg/0123",
        "stats": {
            "total_chunks": 10,
            "total_size": 4000,
            "total_csize": 3000,
            "total_unique_chunks": 5,
            "unique_size": 2000,
            "unique_csize": 1000
        }
    },
    "repository": {"id": "0123", "location": "/srv/repo"}
}"#;

pub const INFO_WITHOUT_CACHE: &str = r#"{"repository": {"id": "0123", "location": "/srv/repo"}}"#;

pub const LIST_TWO_ARCHIVES: &str = r#"{
    "archives": [
        {"archive": "host-2023-04-01", "id": "aaaa", "name": "host-2023-04-01", "start": "2023-04-01T12:00:00.000000"},
        {"archive": "host-2023-04-02", "id": "bbbb", "name": "host-2023-04-02", "start": "2023-04-02T12:00:00.531000"}
    ]
}"#;

#[derive(Debug, Clone)]
pub enum Response {
    Stdout(String),
    Exit(i32),
    SpawnError,
    Panic,
}

/// Answers `(repository, verb)` pairs from a fixed script
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: HashMap<(String, String), Response>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository that passes its check with cache stats and two archives
    pub fn healthy(repo: &str) -> Self {
        Self::new().with_healthy(repo)
    }

    pub fn with_healthy(self, repo: &str) -> Self {
        self.stdout(repo, "check", "")
            .stdout(repo, "info", INFO_WITH_CACHE)
            .stdout(repo, "list", LIST_TWO_ARCHIVES)
    }

    pub fn stdout(self, repo: &str, verb: &str, stdout: &str) -> Self {
        self.respond(repo, verb, Response::Stdout(stdout.to_string()))
    }

    pub fn fail(self, repo: &str, verb: &str, code: i32) -> Self {
        self.respond(repo, verb, Response::Exit(code))
    }

    pub fn spawn_error(self, repo: &str, verb: &str) -> Self {
        self.respond(repo, verb, Response::SpawnError)
    }

    pub fn panic(self, repo: &str, verb: &str) -> Self {
        self.respond(repo, verb, Response::Panic)
    }

    fn respond(mut self, repo: &str, verb: &str, response: Response) -> Self {
        self.responses
            .insert((repo.to_string(), verb.to_string()), response);
        self
    }

    /// Argument lists seen for `repo`, in call order
    pub fn calls_for(&self, repo: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| r == repo)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl CheckRunner for ScriptedRunner {
    async fn invoke(&self, target: &RepositoryTarget, args: &[&str]) -> Result<Vec<u8>, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((target.to_string(), args.join(" ")));

        let verb = args.first().copied().unwrap_or_default();
        let response = self
            .responses
            .get(&(target.to_string(), verb.to_string()))
            .cloned()
            .unwrap_or_else(|| panic!("no scripted response for {target} {verb}"));

        match response {
            Response::Stdout(stdout) => Ok(stdout.into_bytes()),
            Response::Exit(code) => Err(ToolError::Execution {
                target: target.to_string(),
                verb: verb.to_string(),
                code: Some(code),
            }),
            Response::SpawnError => Err(ToolError::Invocation {
                target: target.to_string(),
                message: "No such file or directory (os error 2)".to_string(),
            }),
            Response::Panic => panic!("scripted panic for {target} {verb}"),
        }
    }
}

/// Records every push; optionally refuses them
#[derive(Debug, Default)]
pub struct RecordingPusher {
    pub pushes: Mutex<Vec<(String, HashMap<String, String>, Vec<MetricFamily>)>>,
    pub refuse: bool,
}

impl RecordingPusher {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }
}

impl MetricsPusher for RecordingPusher {
    fn push(
        &self,
        job: &str,
        grouping: &HashMap<String, String>,
        families: Vec<MetricFamily>,
    ) -> MetricsResult<()> {
        self.pushes
            .lock()
            .unwrap()
            .push((job.to_string(), grouping.clone(), families));

        if self.refuse {
            return Err(MetricsError::Encoding("gateway unavailable".to_string()));
        }
        Ok(())
    }
}
