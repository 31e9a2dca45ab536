//! Serve command - run the execution service

use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::error::{PackError, PackResult};
use crate::processor::PackerTool;
use crate::server::{self, ExecutionService};
use crate::ui::{self, UiContext};
use tokio::net::TcpListener;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .map_err(|e| PackError::io(format!("binding {}", bind), e))?;

    let scratch_dir = args.scratch_dir.or_else(|| config.server.scratch_dir.clone());
    let service = ExecutionService::new(PackerTool::new(config.packer.program.clone()), scratch_dir);

    ui::intro(&ctx, "sheetpack execution service");
    ui::key_value(&ctx, "Listening", &bind);
    ui::key_value(&ctx, "Packer", &config.packer.program);
    ui::remark(&ctx, "Press Ctrl-C to stop");

    server::serve(listener, service, body_limit_bytes(config.server.body_limit_mb)).await
}

fn body_limit_bytes(megabytes: usize) -> usize {
    megabytes.saturating_mul(1024 * 1024)
}
