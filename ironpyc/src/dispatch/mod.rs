//! 命令分发：把 compile / detect / analyze 按子命令名登记到 CommandRegistry。

use crate::cli::Commands;
use crate::command_registry::CommandRegistry;
use crate::commands::{analyze, compile, detect};

/// 注册所有命令处理器
pub fn register_all(reg: &mut CommandRegistry) {
    register_compile(reg);
    register_detect(reg);
    register_analyze(reg);
}

fn register_compile(reg: &mut CommandRegistry) {
    reg.register("compile", |cmd| {
        if let Commands::Compile {
            scripts,
            out,
            target,
            main,
            platform,
            embed,
            standalone,
            mta,
            keep_response_file,
            ipy_dir,
            pyc_path,
            module_dirs,
            copy_runtime_libs,
            host_version,
            timeout,
        } = cmd
        {
            Some(compile::cmd_compile(compile::CompileArgs {
                scripts,
                out: out.as_deref(),
                target: *target,
                main: main.as_deref(),
                platform: *platform,
                embed: *embed,
                standalone: *standalone,
                mta: *mta,
                keep_response_file: *keep_response_file,
                ipy_dir: ipy_dir.as_deref(),
                pyc_path: pyc_path.as_deref(),
                module_dirs,
                copy_runtime_libs: *copy_runtime_libs,
                host_version: host_version.as_deref(),
                timeout: *timeout,
            }))
        } else {
            None
        }
    });
}

fn register_detect(reg: &mut CommandRegistry) {
    reg.register("detect", |cmd| {
        if let Commands::Detect {
            ipy_dir,
            host_version,
            json,
        } = cmd
        {
            Some(detect::cmd_detect(
                ipy_dir.as_deref(),
                host_version.as_deref(),
                *json,
            ))
        } else {
            None
        }
    });
}

fn register_analyze(reg: &mut CommandRegistry) {
    reg.register("analyze", |cmd| {
        if let Commands::Analyze {
            scripts,
            ipy_dir,
            module_dirs,
            host_version,
            json,
        } = cmd
        {
            Some(analyze::cmd_analyze(
                scripts,
                ipy_dir.as_deref(),
                module_dirs,
                host_version.as_deref(),
                *json,
            ))
        } else {
            None
        }
    });
}
