//! ironpyc 子命令表：compile / detect / analyze 各自按名字登记一个处理器。
//!
//! 子命令名来自 [`Commands::name`]，与 clap 解析出的子命令一一对应；
//! dispatch 模块负责登记，run_cli 只按名字查表执行。

use anyhow::Result;
use std::collections::BTreeMap;

use crate::cli::Commands;

/// 处理器拿到已解析的子命令；变体不符时返回 None
pub type CommandHandler = Box<dyn Fn(&Commands) -> Option<Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct CommandRegistry {
    handlers: BTreeMap<&'static str, CommandHandler>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `handler`. A second binding for the same name replaces the first.
    pub fn register<F>(&mut self, name: &'static str, handler: F)
    where
        F: Fn(&Commands) -> Option<Result<()>> + Send + Sync + 'static,
    {
        if self.handlers.insert(name, Box::new(handler)).is_some() {
            tracing::debug!(command = name, "command handler replaced");
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    pub fn dispatch(&self, cmd: &Commands) -> Result<()> {
        let name = cmd.name();
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("no handler registered for `{}`", name))?;
        tracing::debug!(command = name, "dispatching");
        handler(cmd).unwrap_or_else(|| {
            Err(anyhow::anyhow!(
                "handler registered for `{}` did not accept the parsed command",
                name
            ))
        })
    }
}
