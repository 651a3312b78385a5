//! In-memory `Engine` for unit tests.
//!
//! Holds a list of containers and enforces the one rule of the real daemon
//! that matters here: a name belongs to at most one container. Every call is
//! appended to `calls()` so tests can assert ordering.

use super::engine::{
    BuildEvent, BuildSpec, ContainerHandle, ContainerRecord, Engine, PushEvent, RunSpec,
};
use crate::core::error::Result;
use anyhow::{anyhow, bail};
use futures_util::stream::{self, LocalBoxStream, StreamExt};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct FakeContainer {
    pub id: String,
    pub name: String,
    pub created: i64,
    pub running: bool,
}

#[derive(Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    containers: Vec<FakeContainer>,
    calls: Vec<String>,
    next_id: u32,
    build_log: Vec<BuildEvent>,
    build_transport_error: Option<String>,
    tag_result: Option<bool>,
    push_log: Vec<PushEvent>,
    push_transport_error: Option<String>,
    /// Running-only listings answered before launched containers exit.
    survives_polls: Option<usize>,
    polls: usize,
    attached_exit_code: i64,
    fail_op: Option<&'static str>,
    created_at: i64,
}

impl FakeEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        {
            let mut state = engine.lock();
            state.tag_result = Some(true);
            state.created_at = 1_700_000_000;
        }
        engine
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_container(self, name: &str, created: i64, running: bool) -> Self {
        {
            let mut state = self.lock();
            state.next_id += 1;
            let id = format!("c{}", state.next_id);
            state.containers.push(FakeContainer {
                id,
                name: name.to_string(),
                created,
                running,
            });
        }
        self
    }

    pub fn with_build_log(self, lines: &[&str]) -> Self {
        self.lock().build_log = lines
            .iter()
            .map(|line| BuildEvent {
                stream: Some(line.to_string()),
                ..Default::default()
            })
            .collect();
        self
    }

    pub fn with_build_event(self, event: BuildEvent) -> Self {
        self.lock().build_log.push(event);
        self
    }

    pub fn with_build_transport_error(self, msg: &str) -> Self {
        self.lock().build_transport_error = Some(msg.to_string());
        self
    }

    pub fn with_tag_result(self, ok: bool) -> Self {
        self.lock().tag_result = Some(ok);
        self
    }

    pub fn with_push_event(self, event: PushEvent) -> Self {
        self.lock().push_log.push(event);
        self
    }

    pub fn with_push_transport_error(self, msg: &str) -> Self {
        self.lock().push_transport_error = Some(msg.to_string());
        self
    }

    /// Launched containers stop after answering `n` liveness polls.
    pub fn dies_after_polls(self, n: usize) -> Self {
        self.lock().survives_polls = Some(n);
        self
    }

    pub fn with_attached_exit_code(self, code: i64) -> Self {
        self.lock().attached_exit_code = code;
        self
    }

    /// Makes every call of the named operation fail.
    pub fn failing(self, op: &'static str) -> Self {
        self.lock().fail_op = Some(op);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn containers(&self) -> Vec<FakeContainer> {
        self.lock().containers.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.containers().into_iter().map(|c| c.name).collect()
    }

    pub fn polls(&self) -> usize {
        self.lock().polls
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl FakeState {
    fn check(&mut self, op: &'static str, call: String) -> Result<()> {
        self.calls.push(call);
        if self.fail_op == Some(op) {
            bail!("fake daemon refused {}", op);
        }
        Ok(())
    }
}

impl Engine for FakeEngine {
    fn build<'a>(&'a self, spec: &BuildSpec) -> LocalBoxStream<'a, Result<BuildEvent>> {
        let mut state = self.lock();
        if let Err(e) = state.check("build", format!("build {}", spec.tag)) {
            return stream::once(async move { Err(e) }).boxed_local();
        }
        let mut items: Vec<Result<BuildEvent>> = state.build_log.iter().cloned().map(Ok).collect();
        if let Some(msg) = &state.build_transport_error {
            items.push(Err(anyhow!(msg.clone())));
        }
        stream::iter(items).boxed_local()
    }

    async fn list_containers(&self, name: &str, all: bool) -> Result<Vec<ContainerRecord>> {
        let mut state = self.lock();
        let scope = if all { "all" } else { "running" };
        state.check("list", format!("list {} {}", name, scope))?;
        if !all {
            state.polls += 1;
            let polls = state.polls;
            if let Some(limit) = state.survives_polls {
                if polls > limit {
                    for c in state.containers.iter_mut().filter(|c| c.name == name) {
                        c.running = false;
                    }
                }
            }
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| c.name == name && (all || c.running))
            .map(|c| ContainerRecord {
                id: c.id.clone(),
                names: vec![c.name.clone()],
                created: c.created,
                state: if c.running { "running" } else { "exited" }.to_string(),
            })
            .collect())
    }

    async fn stop(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.check("stop", format!("stop {}", id))?;
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.running = false;
                Ok(())
            }
            None => bail!("no such container: {}", id),
        }
    }

    async fn rename(&self, id: &str, new_name: &str) -> Result<()> {
        let mut state = self.lock();
        state.check("rename", format!("rename {} {}", id, new_name))?;
        if state.containers.iter().any(|c| c.name == new_name) {
            bail!("Conflict. The container name \"/{}\" is already in use", new_name);
        }
        match state.containers.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.name = new_name.to_string();
                Ok(())
            }
            None => bail!("no such container: {}", id),
        }
    }

    async fn run(&self, spec: &RunSpec) -> Result<ContainerHandle> {
        let mut state = self.lock();
        state.check("run", format!("run {}", spec.name))?;
        if state.containers.iter().any(|c| c.name == spec.name) {
            bail!("Conflict. The container name \"/{}\" is already in use", spec.name);
        }
        state.next_id += 1;
        let id = format!("c{}", state.next_id);
        let created = state.created_at;
        state.containers.push(FakeContainer {
            id: id.clone(),
            name: spec.name.clone(),
            created,
            running: spec.detach,
        });
        let exit_code = (!spec.detach).then_some(state.attached_exit_code);
        Ok(ContainerHandle { id, exit_code })
    }

    async fn tag(&self, source: &str, repo: &str, tag: &str) -> Result<bool> {
        let mut state = self.lock();
        state.check("tag", format!("tag {} {}:{}", source, repo, tag))?;
        Ok(state.tag_result.unwrap_or(true))
    }

    fn push<'a>(&'a self, repo: &str, tag: &str) -> LocalBoxStream<'a, Result<PushEvent>> {
        let mut state = self.lock();
        if let Err(e) = state.check("push", format!("push {}:{}", repo, tag)) {
            return stream::once(async move { Err(e) }).boxed_local();
        }
        let mut items: Vec<Result<PushEvent>> = state.push_log.iter().cloned().map(Ok).collect();
        if let Some(msg) = &state.push_transport_error {
            items.push(Err(anyhow!(msg.clone())));
        }
        stream::iter(items).boxed_local()
    }
}
