//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Runtime helpers for running federate loops."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::{anyhow, Context};
use tokio::task::JoinHandle;
use tracing::info;

/// Runs blocking federate loops side by side and joins them in spawn order.
///
/// Each loop owns one thread from the tokio blocking pool for its whole
/// lifetime since `request_time` blocks.
#[derive(Debug)]
pub struct FederateExecutor<T> {
    tasks: Vec<(String, JoinHandle<crate::Result<T>>)>,
}

impl<T> Default for FederateExecutor<T> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<T: Send + 'static> FederateExecutor<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, federate_loop: F)
    where
        F: FnOnce() -> crate::Result<T> + Send + 'static,
    {
        let name = name.into();
        info!(federate = %name, "spawning federate loop");
        let handle = tokio::task::spawn_blocking(federate_loop);
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every loop; the first failure in spawn order is returned.
    pub async fn join(self) -> anyhow::Result<Vec<(String, T)>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        for (name, task) in self.tasks {
            let output = task
                .await
                .map_err(|err| anyhow!("federate {} join failure: {}", name, err))?
                .with_context(|| format!("federate {} failed", name))?;
            info!(federate = %name, "federate loop finished");
            results.push((name, output));
        }
        Ok(results)
    }
}
