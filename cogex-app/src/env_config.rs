//! Environment configuration for the battery runner.
//!
//! Reads `COGEX_PARTICIPANT`, `COGEX_SEED`, `COGEX_OUT_DIR`, `COGEX_TASKS`,
//! `COGEX_REALTIME` and `COGEX_CONFIG`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use cogex_core::TaskId;
use cogex_tasks::{Battery, DEFAULT_ORDER};

#[derive(Debug, Clone)]
pub struct Settings {
    pub participant: String,
    pub seed: u64,
    pub out_dir: PathBuf,
    pub tasks: Vec<TaskId>,
    pub realtime: bool,
    pub battery: Battery,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            participant: participant(),
            seed: seed()?,
            out_dir: out_dir(),
            tasks: task_order()?,
            realtime: realtime(),
            battery: battery()?,
        })
    }
}

/// Read `COGEX_PARTICIPANT` (default `"anonymous"`).
pub fn participant() -> String {
    std::env::var("COGEX_PARTICIPANT")
        .ok()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Read `COGEX_SEED`. A fresh seed is drawn when unset.
pub fn seed() -> Result<u64> {
    match std::env::var("COGEX_SEED") {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("COGEX_SEED is not a u64: {raw:?}")),
        Err(_) => Ok(rand::random()),
    }
}

/// Read `COGEX_OUT_DIR` (default `"."`).
pub fn out_dir() -> PathBuf {
    std::env::var("COGEX_OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Read `COGEX_TASKS`, a comma-separated list of task ids. Defaults to [`DEFAULT_ORDER`].
pub fn task_order() -> Result<Vec<TaskId>> {
    match std::env::var("COGEX_TASKS") {
        Ok(raw) => parse_task_list(&raw),
        Err(_) => Ok(DEFAULT_ORDER.to_vec()),
    }
}

pub fn parse_task_list(raw: &str) -> Result<Vec<TaskId>> {
    let mut tasks = Vec::new();
    for id in raw.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let Some(task) = TaskId::parse(id) else {
            let known: Vec<_> = TaskId::ALL.iter().map(TaskId::as_str).collect();
            bail!("unknown task {id:?}, expected one of {}", known.join(", "));
        };
        if !tasks.contains(&task) {
            tasks.push(task);
        }
    }
    if tasks.is_empty() {
        bail!("COGEX_TASKS names no tasks");
    }
    Ok(tasks)
}

/// `COGEX_REALTIME=1` drives the system clock instead of virtual time.
pub fn realtime() -> bool {
    matches!(
        std::env::var("COGEX_REALTIME").as_deref().map(str::trim),
        Ok("1" | "true" | "yes")
    )
}

/// Read the JSON file named by `COGEX_CONFIG`, if any. Missing tasks keep their defaults.
pub fn battery() -> Result<Battery> {
    let Ok(path) = std::env::var("COGEX_CONFIG") else {
        return Ok(Battery::default());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading task config {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing task config {path}"))
}
