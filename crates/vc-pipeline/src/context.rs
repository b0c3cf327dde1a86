//! Shared handle to the tools, probe, worker pool and cancellation token.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use vc_av::{CommandBuilder, MediaTool, ProbeFacade, ProcessTool, ToolRegistry};
use vc_core::config::Config;
use vc_core::Result;

use crate::pool::WorkerPool;

/// Everything a [`Compressor`](crate::Compressor) needs to run commands.
///
/// One toolkit is usually shared (behind an `Arc`) by every compressor in a
/// process, so the worker pool bounds the process-wide number of concurrent
/// tool invocations.
pub struct Toolkit {
    config: Config,
    registry: ToolRegistry,
    commands: Arc<CommandBuilder>,
    tool: Arc<dyn MediaTool>,
    probe: ProbeFacade,
    pool: WorkerPool,
    cancellation: CancellationToken,
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("registry", &self.registry)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Toolkit {
    /// Discover tools from `config` and run them as child processes.
    ///
    /// # Errors
    ///
    /// [`vc_core::Error::MissingTool`] if ffmpeg or ffprobe cannot be found.
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let registry = ToolRegistry::discover(&config.tools);
        Self::with_tool(config, registry, Arc::new(ProcessTool))
    }

    /// Build a toolkit over an explicit registry and [`MediaTool`].
    pub fn with_tool(
        config: Config,
        registry: ToolRegistry,
        tool: Arc<dyn MediaTool>,
    ) -> Result<Arc<Self>> {
        for warning in config.validate() {
            tracing::warn!("Config: {warning}");
        }

        let commands = Arc::new(CommandBuilder::new(
            &registry,
            &config.tools,
            &config.execution,
        )?);
        let cancellation = CancellationToken::new();
        let probe = ProbeFacade::new(tool.clone(), commands.clone(), cancellation.clone());
        let pool = WorkerPool::new(config.execution.workers());

        tracing::debug!("Toolkit ready with {} workers", pool.size());

        Ok(Arc::new(Self {
            config,
            registry,
            commands,
            tool,
            probe,
            pool,
            cancellation,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn commands(&self) -> &CommandBuilder {
        &self.commands
    }

    pub fn tool(&self) -> &dyn MediaTool {
        self.tool.as_ref()
    }

    pub fn probe(&self) -> &ProbeFacade {
        &self.probe
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Abort every running and future invocation made through this toolkit.
    pub fn cancel(&self) {
        tracing::info!("Cancelling all tool invocations");
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
